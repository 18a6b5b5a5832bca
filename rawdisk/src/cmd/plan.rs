// SPDX-License-Identifier: MIT

use std::path::Path;

use rawpart::disk::{self, DiskReadOptions, PartitionStyle};
use rawpart::{BackupExtent, PartitionExtent, plan_backup_extent};

use crate::config::Config;
use crate::device::Disk;
use crate::utils;

/// Byte extents of every partition the disk's table describes.
pub fn partition_extents(dev: &mut Disk, sector_size: u64) -> anyhow::Result<Vec<PartitionExtent>> {
    let size = dev.size;
    let mut io = dev.io();
    let extents = match disk::detect_partition_style(&mut io, sector_size)? {
        PartitionStyle::Raw => Vec::new(),
        PartitionStyle::Mbr => {
            let (_, mbr) = disk::read_mbr(&mut io, DiskReadOptions::default())?;
            mbr.partition_extents(sector_size)
        }
        PartitionStyle::Gpt => {
            let mirror = disk::read_gpt_mirror(
                &mut io,
                sector_size,
                size,
                DiskReadOptions::default().with_validate_mirror(false),
            )?;
            mirror.primary.partition_extents()
        }
    };
    Ok(extents)
}

pub fn plan(path: &Path, sector_by_sector: bool, config: &Config) -> anyhow::Result<BackupExtent> {
    let mut dev = Disk::open_read(path)?;
    let extents = partition_extents(&mut dev, config.disk.sector_size)?;
    Ok(plan_backup_extent(dev.size, &extents, sector_by_sector))
}

pub fn run(path: &Path, sector_by_sector: bool, config: &Config) -> anyhow::Result<()> {
    let extent = plan(path, sector_by_sector, config)?;
    crate::log_normal!("{extent}");
    crate::log_normal!(
        "Backup of {} reads {} ({} bytes)",
        path.display(),
        utils::pretty_bytes(extent.length),
        utils::sep_u64(extent.length)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawio::prelude::*;
    use rawpart::BackupReason;
    use rawpart::mbr::MbrRecord;

    #[test]
    fn mbr_disk_skips_free_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mbr.img");

        let mut buf = vec![0u8; 1024 * 1024];
        let mut mbr = MbrRecord::new_protective(2048);
        mbr.entries[0].kind = 0x83;
        mbr.entries[0].first_lba = 64;
        mbr.entries[0].sector_count = 960;
        MemBlockIO::new(&mut buf).write_at(0, &mbr.to_bytes()).unwrap();
        std::fs::write(&path, &buf).unwrap();

        let extent = plan(&path, false, &Config::default()).unwrap();
        assert_eq!(extent.length, 1024 * 512);
        assert_eq!(
            extent.reason,
            BackupReason::SkipsTrailingFreeSpace { skipped: 512 * 1024 }
        );
        assert_eq!(plan(&path, true, &Config::default()).unwrap().length, 1024 * 1024);
    }
}
