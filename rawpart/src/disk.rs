// SPDX-License-Identifier: MIT

//! Partition-table reads and writes against a block device.
//!
//! The disk size and logical sector size come from the caller; nothing here
//! queries the platform.

use rawio::prelude::*;

use crate::errors::*;
use crate::gpt::{GPT_PRIMARY_HEADER_LBA, GPT_SIGNATURE, GptCodec, GptMirror, GptTable};
use crate::io_ext::BlockIOLbaExt;
use crate::mbr::{MBR_SIZE, MbrKind, MbrRecord};

/// Which checks run while reading tables back from a disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskReadOptions {
    pub validate_mbr: bool,
    /// Signature, header size and both CRCs.
    pub validate_gpt: bool,
    pub validate_mirror: bool,
}

impl Default for DiskReadOptions {
    fn default() -> Self {
        Self {
            validate_mbr: true,
            validate_gpt: true,
            validate_mirror: true,
        }
    }
}

impl DiskReadOptions {
    /// Decode whatever is there without rejecting it.
    pub fn lenient() -> Self {
        Self {
            validate_mbr: false,
            validate_gpt: false,
            validate_mirror: false,
        }
    }

    pub fn with_validate_mbr(mut self, yes: bool) -> Self {
        self.validate_mbr = yes;
        self
    }

    pub fn with_validate_gpt(mut self, yes: bool) -> Self {
        self.validate_gpt = yes;
        self
    }

    pub fn with_validate_mirror(mut self, yes: bool) -> Self {
        self.validate_mirror = yes;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartitionStyle {
    Raw,
    Mbr,
    Gpt,
}

impl core::fmt::Display for PartitionStyle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PartitionStyle::Raw => write!(f, "RAW"),
            PartitionStyle::Mbr => write!(f, "MBR"),
            PartitionStyle::Gpt => write!(f, "GPT"),
        }
    }
}

/// Reads sector 0, returning the raw bytes alongside the decoded record.
pub fn read_mbr<IO: BlockIO + ?Sized>(
    io: &mut IO,
    opts: DiskReadOptions,
) -> PartResult<(Vec<u8>, MbrRecord)> {
    let mut raw = vec![0u8; MBR_SIZE];
    io.read_at(0, &mut raw)?;
    let mbr = MbrRecord::parse(&raw)?;
    if opts.validate_mbr {
        mbr.validate()?;
    }
    Ok((raw, mbr))
}

/// Two-phase read of the GPT whose header sits at `header_lba`.
///
/// The returned buffer is the header sector followed by the entry array.
pub fn read_gpt_table<IO: BlockIO + ?Sized>(
    io: &mut IO,
    sector_size: u64,
    header_lba: u64,
    opts: DiskReadOptions,
) -> PartResult<(Vec<u8>, GptTable)> {
    let codec = GptCodec::new(sector_size)?;

    let mut raw = io.read_sectors(header_lba, sector_size, 1)?;
    let location = codec.locate_entry_array(&raw)?;

    let header_len = raw.len();
    raw.resize(header_len + location.byte_length as usize, 0);
    io.read_at(location.byte_offset, &mut raw[header_len..])?;

    let table = codec.parse(&raw)?;
    if opts.validate_gpt {
        codec.validate(&raw)?;
    }
    log::debug!(
        "gpt: read table at LBA {header_lba}, {} entries, array at {:#x}",
        table.header.num_entries,
        location.byte_offset
    );
    Ok((raw, table))
}

/// Reads the primary GPT at LBA 1 and the backup at the last LBA.
pub fn read_gpt_mirror<IO: BlockIO + ?Sized>(
    io: &mut IO,
    sector_size: u64,
    disk_size: u64,
    opts: DiskReadOptions,
) -> PartResult<GptMirror> {
    let last_lba = (disk_size / sector_size)
        .checked_sub(1)
        .ok_or(GptError::DiskTooSmall { total_lba: 0 })?;

    let (primary_raw, primary) = read_gpt_table(io, sector_size, GPT_PRIMARY_HEADER_LBA, opts)?;
    let (backup_raw, backup) = read_gpt_table(io, sector_size, last_lba, opts)?;

    let mirror = GptMirror {
        primary,
        primary_raw,
        backup,
        backup_raw,
    };

    match mirror.validate_mirror() {
        Ok(()) => {}
        Err(e) if opts.validate_mirror => return Err(e),
        Err(e) => log::warn!("gpt: {e}"),
    }
    Ok(mirror)
}

/// Tells raw disks, legacy MBR disks and GPT disks apart.
pub fn detect_partition_style<IO: BlockIO + ?Sized>(
    io: &mut IO,
    sector_size: u64,
) -> PartResult<PartitionStyle> {
    let (_, mbr) = read_mbr(io, DiskReadOptions::lenient())?;

    let mut signature = [0u8; 8];
    let has_gpt = match io.read_at_lba(GPT_PRIMARY_HEADER_LBA, sector_size, &mut signature) {
        Ok(()) => &signature == GPT_SIGNATURE,
        Err(BlockIOError::OutOfBounds) => false,
        Err(e) => return Err(e.into()),
    };

    let style = if has_gpt || (mbr.has_valid_signature() && mbr.kind() == MbrKind::Protective) {
        PartitionStyle::Gpt
    } else if mbr.has_valid_signature() {
        PartitionStyle::Mbr
    } else {
        PartitionStyle::Raw
    };
    Ok(style)
}

pub fn write_mbr<IO: BlockIO + ?Sized>(io: &mut IO, mbr: &MbrRecord) -> PartResult<()> {
    io.write_at(0, &mbr.to_bytes())?;
    io.flush()?;
    Ok(())
}

/// Writes both copies where their headers say they live.
pub fn write_gpt_mirror<IO: BlockIO + ?Sized>(io: &mut IO, mirror: &GptMirror) -> PartResult<()> {
    for (table, raw) in [
        (&mirror.primary, &mirror.primary_raw),
        (&mirror.backup, &mirror.backup_raw),
    ] {
        let ss = table.sector_size;
        let (header_sector, array) = raw.split_at(ss as usize);
        io.write_at_lba(table.header.entries_lba, ss, array)?;
        io.write_at_lba(table.header.current_lba, ss, header_sector)?;
    }
    io.flush()?;
    log::debug!(
        "gpt: wrote primary at LBA {}, backup at LBA {}",
        mirror.primary.header.current_lba,
        mirror.backup.header.current_lba
    );
    Ok(())
}
