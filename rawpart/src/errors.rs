// SPDX-License-Identifier: MIT

use core::fmt;

use rawio::errors::*;

/// Unified error type for partition tools (GPT, MBR, etc.)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartError {
    IO(BlockIOError),
    /// Input buffer shorter than the structure being decoded.
    BufferTooSmall { needed: usize, got: usize },
    Mbr(MbrError),
    Gpt(GptError),
    NotFound,
    Invalid(&'static str),
    Other(&'static str),
}

impl PartError {
    pub fn msg(&self) -> &'static str {
        match self {
            PartError::IO(e) => e.msg(),
            PartError::BufferTooSmall { .. } => "Buffer too small",
            PartError::Mbr(e) => e.msg(),
            PartError::Gpt(e) => e.msg(),
            PartError::NotFound => "No partition table found",
            PartError::Invalid(msg) => msg,
            PartError::Other(msg) => msg,
        }
    }
}

impl From<&'static str> for PartError {
    fn from(s: &'static str) -> Self {
        PartError::Other(s)
    }
}

impl From<BlockIOError> for PartError {
    fn from(e: BlockIOError) -> Self {
        PartError::IO(e)
    }
}

impl From<MbrError> for PartError {
    fn from(e: MbrError) -> Self {
        PartError::Mbr(e)
    }
}

impl From<GptError> for PartError {
    fn from(e: GptError) -> Self {
        PartError::Gpt(e)
    }
}

impl fmt::Display for PartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartError::IO(e) => write!(f, "{e}"),
            PartError::BufferTooSmall { needed, got } => {
                write!(f, "{}: needed {needed} bytes, got {got}", self.msg())
            }
            PartError::Mbr(e) => write!(f, "{e}"),
            PartError::Gpt(e) => write!(f, "{e}"),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for PartError {}

pub type PartResult<T = ()> = Result<T, PartError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbrError {
    InvalidSignature { expected: u16, found: u16 },
    InvalidBootFlag { got: u8 },
    ZeroSectors,
}

impl MbrError {
    pub fn msg(&self) -> &'static str {
        match self {
            MbrError::InvalidSignature { .. } => "MBR: invalid boot signature",
            MbrError::InvalidBootFlag { .. } => "MBR: invalid boot flag",
            MbrError::ZeroSectors => "MBR: partition entry with zero sectors",
        }
    }
}

impl fmt::Display for MbrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MbrError::InvalidSignature { expected, found } => {
                write!(f, "{} (expected {expected:#06X}, found {found:#06X})", self.msg())
            }
            MbrError::InvalidBootFlag { got } => write!(f, "{} {got:#04X}", self.msg()),
            MbrError::ZeroSectors => write!(f, "{}", self.msg()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GptError {
    InvalidSignature,
    InvalidHeaderSize { got: u32 },
    /// Entry size or count that no sane table uses.
    InvalidEntryGeometry { count: u32, size: u32 },
    HeaderCrcMismatch { stored: u32, computed: u32 },
    EntriesCrcMismatch { stored: u32, computed: u32 },
    DiskTooSmall { total_lba: u64 },
    MirrorMismatch(&'static str),
    Entry(&'static str),
}

impl GptError {
    pub fn msg(&self) -> &'static str {
        match self {
            GptError::InvalidSignature => "GPT: invalid signature",
            GptError::InvalidHeaderSize { .. } => "GPT: invalid header size",
            GptError::InvalidEntryGeometry { .. } => "GPT: invalid entry geometry",
            GptError::HeaderCrcMismatch { .. } => "GPT: header CRC mismatch",
            GptError::EntriesCrcMismatch { .. } => "GPT: entries CRC mismatch",
            GptError::DiskTooSmall { .. } => "GPT: disk too small",
            GptError::MirrorMismatch(msg) => msg,
            GptError::Entry(msg) => msg,
        }
    }
}

impl fmt::Display for GptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GptError::InvalidHeaderSize { got } => write!(f, "{} ({got})", self.msg()),
            GptError::InvalidEntryGeometry { count, size } => {
                write!(f, "{} ({count} entries of {size} bytes)", self.msg())
            }
            GptError::HeaderCrcMismatch { stored, computed }
            | GptError::EntriesCrcMismatch { stored, computed } => {
                write!(f, "{} (stored {stored:#010X}, computed {computed:#010X})", self.msg())
            }
            GptError::DiskTooSmall { total_lba } => {
                write!(f, "{} ({total_lba} sectors)", self.msg())
            }
            _ => write!(f, "{}", self.msg()),
        }
    }
}
