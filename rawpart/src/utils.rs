// SPDX-License-Identifier: MIT

use core::fmt;

/// Byte range occupied by a partition on its disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionExtent {
    pub offset: u64,
    pub length: u64,
}

impl PartitionExtent {
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }
}

/// Human-readable size with integer division (`1536` -> `"1 KB"`).
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    match size {
        s if s >= GB => format!("{} GB", s / GB),
        s if s >= MB => format!("{} MB", s / MB),
        s if s >= KB => format!("{} KB", s / KB),
        s => format!("{s} B"),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackupReason {
    /// Caller asked for every sector.
    SectorBySector,
    /// No partition, or partitions reach the end of the disk.
    WholeDisk,
    /// Trailing unpartitioned space is not read.
    SkipsTrailingFreeSpace { skipped: u64 },
}

/// How many leading bytes of a disk a backup has to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackupExtent {
    pub length: u64,
    pub reason: BackupReason,
}

impl fmt::Display for BackupExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            BackupReason::SectorBySector => {
                write!(f, "Sector by sector backup: all sectors will be read.")
            }
            BackupReason::WholeDisk => write!(f, "Reading whole disk"),
            BackupReason::SkipsTrailingFreeSpace { skipped } => write!(
                f,
                "Free space at the end of the disk: {} will be skipped.",
                format_size(skipped)
            ),
        }
    }
}

/// Plans a backup up to the end of the furthest partition.
pub fn plan_backup_extent(
    disk_size: u64,
    extents: &[PartitionExtent],
    sector_by_sector: bool,
) -> BackupExtent {
    if sector_by_sector {
        return BackupExtent {
            length: disk_size,
            reason: BackupReason::SectorBySector,
        };
    }

    match extents.iter().map(PartitionExtent::end).max() {
        Some(end) if end < disk_size => BackupExtent {
            length: end,
            reason: BackupReason::SkipsTrailingFreeSpace {
                skipped: disk_size - end,
            },
        },
        _ => BackupExtent {
            length: disk_size,
            reason: BackupReason::WholeDisk,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 1), "5 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn backup_plans() {
        let disk = 100 * 1024 * 1024;
        let extents = [
            PartitionExtent {
                offset: 1024 * 1024,
                length: 10 * 1024 * 1024,
            },
            PartitionExtent {
                offset: 20 * 1024 * 1024,
                length: 10 * 1024 * 1024,
            },
        ];

        let plan = plan_backup_extent(disk, &extents, false);
        assert_eq!(plan.length, 30 * 1024 * 1024);
        assert_eq!(
            plan.reason,
            BackupReason::SkipsTrailingFreeSpace {
                skipped: 70 * 1024 * 1024
            }
        );
        assert_eq!(
            plan.to_string(),
            "Free space at the end of the disk: 70 MB will be skipped."
        );

        assert_eq!(plan_backup_extent(disk, &extents, true).length, disk);
        assert_eq!(plan_backup_extent(disk, &[], false).reason, BackupReason::WholeDisk);

        let full = [PartitionExtent {
            offset: 0,
            length: disk,
        }];
        assert_eq!(plan_backup_extent(disk, &full, false).reason, BackupReason::WholeDisk);
    }
}
