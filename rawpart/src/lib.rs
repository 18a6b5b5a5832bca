// SPDX-License-Identifier: MIT

#[macro_use]
mod macros;
mod io_ext;

/// Table-driven CRC-32 used by GPT checksums.
pub mod crc32;
/// Disk-level reads and writes of partition tables over any `BlockIO`.
pub mod disk;
pub mod errors;
/// GUID Partition Table (GPT) codec, relocation and mirror handling.
pub mod gpt;
/// Common Partition Type GUIDs.
pub mod guids;
/// Master Boot Record (MBR) codec.
pub mod mbr;
pub mod utils;

pub use disk::{DiskReadOptions, PartitionStyle, detect_partition_style};
pub use io_ext::BlockIOLbaExt;
pub use utils::{BackupExtent, BackupReason, PartitionExtent, format_size, plan_backup_extent};

pub const DEFAULT_SECTOR_SIZE: u64 = 512;
pub const MIN_SECTOR_SIZE: u64 = 512;
