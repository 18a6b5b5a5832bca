// SPDX-License-Identifier: MIT

use std::fs;
use std::path::Path;

use anyhow::Context;
use rawio::prelude::*;
use rawpart::disk::{self, DiskReadOptions, PartitionStyle};
use rawpart::gpt::{GPT_PRIMARY_HEADER_LBA, GptCodec};
use rawpart::mbr::{self, MbrRecord};

use crate::config::Config;
use crate::device::Disk;

pub const MBR_FILE: &str = "mbr.bin";
pub const GPT_PRIMARY_FILE: &str = "gpt1.bin";
pub const GPT_BACKUP_FILE: &str = "gpt2.bin";

/// Saves sector 0 and, on GPT disks, both tables (header sector + entry array).
pub fn dump(path: &Path, out_dir: &Path, lenient: bool, config: &Config) -> anyhow::Result<()> {
    let ss = config.disk.sector_size;
    let opts = if lenient {
        DiskReadOptions::lenient()
    } else {
        DiskReadOptions::default()
    };

    let mut dev = Disk::open_read(path)?;
    let size = dev.size;
    let mut io = dev.io();

    let style = disk::detect_partition_style(&mut io, ss)?;
    if style == PartitionStyle::Raw && !lenient {
        anyhow::bail!("{}: no partition table", path.display());
    }

    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let (mbr_raw, _) = disk::read_mbr(&mut io, opts)?;
    write_file(&out_dir.join(MBR_FILE), &mbr_raw)?;

    if style == PartitionStyle::Gpt {
        let mirror = disk::read_gpt_mirror(&mut io, ss, size, opts)?;
        write_file(&out_dir.join(GPT_PRIMARY_FILE), &mirror.primary_raw)?;
        write_file(&out_dir.join(GPT_BACKUP_FILE), &mirror.backup_raw)?;
        crate::log_info!(
            "Dumped {} GPT partitions from {}",
            mirror.primary.used_entries().count(),
            path.display()
        );
    }
    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    crate::log_verbose!("Wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RestoreArgs {
    pub keep_signature: bool,
    pub dry_run: bool,
    /// Write even when a partition no longer fits the target.
    pub force: bool,
}

/// Writes dumped tables to `target`, relocating the GPT pair to its size.
pub fn restore(dir: &Path, target: &Path, args: RestoreArgs, config: &Config) -> anyhow::Result<()> {
    let ss = config.disk.sector_size;
    let mut mbr_raw =
        fs::read(dir.join(MBR_FILE)).with_context(|| format!("reading {MBR_FILE} in {}", dir.display()))?;
    if !args.keep_signature {
        let fresh = mbr::regenerate_disk_signature(&mut mbr_raw)?;
        crate::log_verbose!("New disk signature {:02X?}", &fresh[..4]);
    }
    let mut record = MbrRecord::parse(&mbr_raw)?;
    record.validate()?;

    let primary = dir.join(GPT_PRIMARY_FILE);
    let backup = dir.join(GPT_BACKUP_FILE);
    let has_gpt = primary.is_file() && backup.is_file();

    let mut dev = Disk::open_rw(target)?;
    let size = dev.size;

    let mirror = if has_gpt {
        let primary_raw = fs::read(&primary)?;
        let backup_raw = fs::read(&backup)?;
        if record.fit_protective(size / ss) {
            let sectors = (size / ss).saturating_sub(1);
            crate::log_verbose!("Protective MBR resized to {sectors} sectors");
        }
        Some(GptCodec::new(ss)?.relocate_pair(&primary_raw, &backup_raw, size)?)
    } else {
        None
    };

    if let Some(m) = &mirror {
        if let Err(e) = m.primary.validate_entries() {
            if !args.force {
                anyhow::bail!(
                    "{}: {e} on a {} target (use --force to write anyway)",
                    target.display(),
                    crate::utils::pretty_bytes(size)
                );
            }
            log::warn!("{}: {e}, writing anyway", target.display());
        }
        crate::log_info!(
            "GPT for {} sectors: usable {}..={}, backup header at LBA {}",
            size / ss,
            m.primary.header.first_usable_lba,
            m.primary.header.last_usable_lba,
            m.backup.header.current_lba
        );
    }
    if args.dry_run {
        crate::log_info!("Dry run: nothing written to {}", target.display());
        return Ok(());
    }

    let mut io = dev.io();
    wipe_stale_gpt(&mut io, ss, size)?;
    disk::write_mbr(&mut io, &record)?;
    if let Some(m) = &mirror {
        disk::write_gpt_mirror(&mut io, m)?;
        disk::read_gpt_mirror(&mut io, ss, size, DiskReadOptions::default())
            .context("restored GPT does not read back cleanly")?;
    }
    drop(io);
    dev.file.sync_all()?;
    crate::log_info!("Partition tables restored to {}", target.display());
    Ok(())
}

/// Zeroes every GPT header and entry array already on the target.
///
/// Leftovers would otherwise make an MBR-only restore look like GPT, or leave
/// a second backup copy behind when the array size changes.
fn wipe_stale_gpt<IO: BlockIO + ?Sized>(io: &mut IO, ss: u64, size: u64) -> anyhow::Result<usize> {
    let Some(last_lba) = (size / ss).checked_sub(1) else {
        return Ok(0);
    };
    let mut wiped = 0;
    for header_lba in [GPT_PRIMARY_HEADER_LBA, last_lba] {
        let Ok((_, table)) = disk::read_gpt_table(io, ss, header_lba, DiskReadOptions::lenient())
        else {
            continue;
        };
        if !table.header.has_valid_signature() {
            continue;
        }
        // The array was just read in full, so it lies inside the device.
        let array_len = table.array_length();
        io.zero_fill(table.header.entries_lba * ss, array_len as usize)?;
        io.zero_fill(header_lba * ss, ss as usize)?;
        crate::log_verbose!(
            "Wiped old GPT header at LBA {header_lba} and its {} byte entry array",
            array_len
        );
        wiped += 1;
    }
    io.flush()?;
    Ok(wiped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawpart::gpt::GptPartitionEntry;
    use rawpart::guids::GPT_PARTITION_TYPE_LINUX_FS;
    use uuid::Uuid;

    const MIB: u64 = 1024 * 1024;

    fn gpt_image(path: &Path, size: u64) {
        gpt_image_with(path, size, 4095);
    }

    fn gpt_image_with(path: &Path, size: u64, root_last_lba: u64) {
        let mut buf = vec![0u8; size as usize];
        let mut io = MemBlockIO::new(&mut buf);
        let parts = [GptPartitionEntry::new(
            GPT_PARTITION_TYPE_LINUX_FS,
            2048,
            root_last_lba,
            "root",
        )];
        let mirror = GptCodec::new(512)
            .unwrap()
            .create_mirror(size, Uuid::new_v4(), &parts)
            .unwrap();
        disk::write_mbr(&mut io, &MbrRecord::new_protective(size / 512)).unwrap();
        disk::write_gpt_mirror(&mut io, &mirror).unwrap();
        fs::write(path, &buf).unwrap();
    }

    #[test]
    fn dump_then_restore_to_bigger_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.img");
        let target = dir.path().join("dst.img");
        let tables = dir.path().join("tables");
        gpt_image(&source, 4 * MIB);
        fs::write(&target, vec![0u8; (6 * MIB) as usize]).unwrap();

        let config = Config::default();
        dump(&source, &tables, false, &config).unwrap();
        assert_eq!(fs::read(tables.join(MBR_FILE)).unwrap().len(), 512);
        assert_eq!(fs::read(tables.join(GPT_PRIMARY_FILE)).unwrap().len(), 512 + 128 * 128);

        let dry = RestoreArgs {
            dry_run: true,
            ..RestoreArgs::default()
        };
        restore(&tables, &target, dry, &config).unwrap();
        assert!(fs::read(&target).unwrap().iter().all(|&b| b == 0));

        restore(&tables, &target, RestoreArgs::default(), &config).unwrap();

        let mut dev = Disk::open_read(&target).unwrap();
        let mut io = dev.io();
        let mirror = disk::read_gpt_mirror(&mut io, 512, 6 * MIB, DiskReadOptions::default()).unwrap();
        assert_eq!(mirror.backup.header.current_lba, 6 * MIB / 512 - 1);
        assert_eq!(mirror.primary.used_entries().count(), 1);

        let (_, mbr) = disk::read_mbr(&mut io, DiskReadOptions::default()).unwrap();
        assert_eq!(mbr.entries[0].sector_count as u64, 6 * MIB / 512 - 1);
    }

    #[test]
    fn shrinking_restore_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.img");
        let target = dir.path().join("dst.img");
        let tables = dir.path().join("tables");
        // root runs to LBA 8191, past the last usable LBA of a 4 MiB disk
        gpt_image_with(&source, 10 * MIB, 8191);
        fs::write(&target, vec![0u8; (4 * MIB) as usize]).unwrap();

        let config = Config::default();
        dump(&source, &tables, false, &config).unwrap();

        let err = restore(&tables, &target, RestoreArgs::default(), &config).unwrap_err();
        assert!(err.to_string().contains("last usable LBA"));
        assert!(fs::read(&target).unwrap().iter().all(|&b| b == 0));

        let forced = RestoreArgs {
            force: true,
            ..RestoreArgs::default()
        };
        restore(&tables, &target, forced, &config).unwrap();

        let mut dev = Disk::open_read(&target).unwrap();
        let mut io = dev.io();
        let mirror = disk::read_gpt_mirror(&mut io, 512, 4 * MIB, DiskReadOptions::default()).unwrap();
        assert_eq!(mirror.primary.header.last_usable_lba, 8158);
        assert_eq!(mirror.primary.entries[0].last_lba, 8191);
        assert!(mirror.primary.validate_entries().is_err());
    }

    #[test]
    fn mbr_restore_wipes_old_gpt() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("mbr.img");
        let target = dir.path().join("dst.img");
        let tables = dir.path().join("tables");

        let mut buf = vec![0u8; MIB as usize];
        let mut mbr = MbrRecord::new_protective(2048);
        mbr.entries[0].kind = 0x83;
        mbr.entries[0].first_lba = 64;
        mbr.entries[0].sector_count = 960;
        MemBlockIO::new(&mut buf).write_at(0, &mbr.to_bytes()).unwrap();
        fs::write(&source, &buf).unwrap();
        gpt_image(&target, 6 * MIB);

        let config = Config::default();
        dump(&source, &tables, false, &config).unwrap();
        assert!(!tables.join(GPT_PRIMARY_FILE).exists());
        restore(&tables, &target, RestoreArgs::default(), &config).unwrap();

        let mut dev = Disk::open_read(&target).unwrap();
        let mut io = dev.io();
        assert_eq!(
            disk::detect_partition_style(&mut io, 512).unwrap(),
            PartitionStyle::Mbr
        );
        let img = fs::read(&target).unwrap();
        assert!(img[512..34 * 512].iter().all(|&b| b == 0));
        assert!(img[img.len() - 33 * 512..].iter().all(|&b| b == 0));
    }

    #[test]
    fn restore_to_sub_sector_target_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.img");
        let target = dir.path().join("tiny.img");
        let tables = dir.path().join("tables");
        gpt_image(&source, 4 * MIB);
        fs::write(&target, vec![0u8; 256]).unwrap();

        let config = Config::default();
        dump(&source, &tables, false, &config).unwrap();
        let err = restore(&tables, &target, RestoreArgs::default(), &config).unwrap_err();
        assert!(err.to_string().contains("too small"));
        assert_eq!(fs::read(&target).unwrap(), vec![0u8; 256]);
    }

    #[test]
    fn wiping_a_blank_disk_is_a_no_op() {
        let mut buf = vec![0u8; MIB as usize];
        let mut io = MemBlockIO::new(&mut buf);
        assert_eq!(wipe_stale_gpt(&mut io, 512, MIB).unwrap(), 0);
        assert_eq!(wipe_stale_gpt(&mut io, 512, 0).unwrap(), 0);
    }

    #[test]
    fn raw_disk_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("blank.img");
        fs::write(&source, vec![0u8; 64 * 1024]).unwrap();
        assert!(dump(&source, &dir.path().join("out"), false, &Config::default()).is_err());
    }
}
