// SPDX-License-Identifier: MIT

use core::fmt;
use std::io::ErrorKind;

/// Result type for BlockIO operations.
pub type BlockIOResult<T = ()> = core::result::Result<T, BlockIOError>;

/// Error type for BlockIO operations and byte-level field access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIOError {
    Other(&'static str),
    /// Attempted to read or write past the end of a buffer or device.
    OutOfBounds,
    Unsupported,
    /// Underlying OS-level I/O failure.
    Io(ErrorKind),
}

impl BlockIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            BlockIOError::Other(msg) => msg,
            BlockIOError::OutOfBounds => "Out of bounds",
            BlockIOError::Unsupported => "Unsupported operation",
            BlockIOError::Io(_) => "I/O error",
        }
    }
}

impl From<&'static str> for BlockIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        BlockIOError::Other(msg)
    }
}

impl From<std::io::Error> for BlockIOError {
    #[cold]
    #[inline(never)]
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof => BlockIOError::OutOfBounds,
            kind => BlockIOError::Io(kind),
        }
    }
}

impl From<BlockIOError> for std::io::Error {
    fn from(e: BlockIOError) -> Self {
        match e {
            BlockIOError::Io(kind) => kind.into(),
            BlockIOError::OutOfBounds => std::io::Error::new(ErrorKind::UnexpectedEof, e.msg()),
            BlockIOError::Unsupported => std::io::Error::new(ErrorKind::Unsupported, e.msg()),
            BlockIOError::Other(msg) => std::io::Error::other(msg),
        }
    }
}

impl fmt::Display for BlockIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockIOError::Io(kind) => write!(f, "{}: {kind}", self.msg()),
            _ => write!(f, "{}", self.msg()),
        }
    }
}

impl std::error::Error for BlockIOError {}

/// Result type for chunked transfers.
pub type TransferResult<T = ()> = core::result::Result<T, TransferError>;

/// Error type for the chunked transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// Rejected before any byte moved (zero size, chunk below one sector...).
    InvalidConfig(&'static str),
    Io(ErrorKind),
    /// The source ran dry before the requested chunk was filled.
    ShortRead { expected: u64, actual: u64 },
    /// The sink stopped accepting bytes before the chunk was written.
    ShortWrite { expected: u64, actual: u64 },
}

impl TransferError {
    pub fn msg(&self) -> &'static str {
        match self {
            TransferError::InvalidConfig(msg) => msg,
            TransferError::Io(_) => "I/O error",
            TransferError::ShortRead { .. } => "Short read from source",
            TransferError::ShortWrite { .. } => "Short write to sink",
        }
    }
}

impl From<std::io::Error> for TransferError {
    #[cold]
    fn from(e: std::io::Error) -> Self {
        TransferError::Io(e.kind())
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Io(kind) => write!(f, "{}: {kind}", self.msg()),
            TransferError::ShortRead { expected, actual }
            | TransferError::ShortWrite { expected, actual } => {
                write!(f, "{} (expected {expected} bytes, got {actual})", self.msg())
            }
            TransferError::InvalidConfig(msg) => write!(f, "Invalid transfer configuration: {msg}"),
        }
    }
}

impl std::error::Error for TransferError {}
