// SPDX-License-Identifier: MIT

use std::io::Cursor;

use rawio::prelude::*;
use rawio::transfer::copy_range;
use rawpart::disk::{self, DiskReadOptions, PartitionStyle};
use rawpart::gpt::{GptCodec, GptPartitionEntry};
use rawpart::guids::{GPT_PARTITION_TYPE_BASIC_DATA, GPT_PARTITION_TYPE_EFI};
use rawpart::mbr::{self, MbrKind, MbrRecord};
use rawpart::plan_backup_extent;
use uuid::Uuid;

const SECTOR: u64 = 512;
const MIB: u64 = 1024 * 1024;
const SOURCE_SIZE: u64 = 8 * MIB;
const TARGET_SIZE: u64 = 12 * MIB;

fn build_source(buf: &mut [u8]) {
    let mut io = MemBlockIO::new(buf);
    let parts = [
        GptPartitionEntry::new(GPT_PARTITION_TYPE_EFI, 2048, 4095, "EFI"),
        GptPartitionEntry::new(GPT_PARTITION_TYPE_BASIC_DATA, 4096, 10239, "Data"),
    ];
    let mirror = GptCodec::new(SECTOR)
        .unwrap()
        .create_mirror(SOURCE_SIZE, Uuid::new_v4(), &parts)
        .unwrap();
    let mut protective = MbrRecord::new_protective(SOURCE_SIZE / SECTOR);
    protective.bootstrap_code_1[..4].copy_from_slice(&[0xEB, 0x63, 0x90, 0x10]);

    disk::write_mbr(&mut io, &protective).unwrap();
    disk::write_gpt_mirror(&mut io, &mirror).unwrap();

    for (i, byte) in buf[(2048 * SECTOR) as usize..(10240 * SECTOR) as usize]
        .iter_mut()
        .enumerate()
    {
        *byte = (i % 241) as u8;
    }
}

#[test]
fn backup_relocate_restore_cycle() {
    let mut source = vec![0u8; SOURCE_SIZE as usize];
    build_source(&mut source);

    // Backup: tables plus the used part of the disk.
    let mut src_io = MemBlockIO::new(&mut source);
    assert_eq!(disk::detect_partition_style(&mut src_io, SECTOR).unwrap(), PartitionStyle::Gpt);

    let (mbr_raw, _) = disk::read_mbr(&mut src_io, DiskReadOptions::default()).unwrap();
    let tables = disk::read_gpt_mirror(&mut src_io, SECTOR, SOURCE_SIZE, DiskReadOptions::default())
        .unwrap();
    let plan = plan_backup_extent(SOURCE_SIZE, &tables.primary.partition_extents(), false);
    assert_eq!(plan.length, 10240 * SECTOR);

    let mut image = Cursor::new(Vec::new());
    {
        let mut stream = BlockIOStream::new(&mut src_io, SOURCE_SIZE);
        let done = copy_range(
            &mut stream,
            &mut image,
            TransferRange::new(plan.length),
            64 * 1024,
            |_| {},
            &CancelToken::new(),
        )
        .unwrap();
        assert!(done.is_complete());
    }

    // Restore onto a larger disk.
    let mut target = vec![0u8; TARGET_SIZE as usize];
    let mut dst_io = MemBlockIO::new(&mut target);
    {
        image.set_position(0);
        let mut stream = BlockIOStream::new(&mut dst_io, TARGET_SIZE);
        copy_range(
            &mut image,
            &mut stream,
            TransferRange::new(plan.length),
            64 * 1024,
            |_| {},
            &CancelToken::new(),
        )
        .unwrap();
    }

    let mut fresh_mbr = mbr_raw.clone();
    mbr::regenerate_disk_signature(&mut fresh_mbr).unwrap();
    let mut record = MbrRecord::parse(&fresh_mbr).unwrap();
    assert!(record.fit_protective(TARGET_SIZE / SECTOR));
    disk::write_mbr(&mut dst_io, &record).unwrap();

    let relocated = GptCodec::new(SECTOR)
        .unwrap()
        .relocate_pair(&tables.primary_raw, &tables.backup_raw, TARGET_SIZE)
        .unwrap();
    disk::write_gpt_mirror(&mut dst_io, &relocated).unwrap();

    // The target must read back as a valid, self-consistent GPT disk.
    let restored =
        disk::read_gpt_mirror(&mut dst_io, SECTOR, TARGET_SIZE, DiskReadOptions::default())
            .unwrap();
    assert_eq!(restored.backup.header.current_lba, TARGET_SIZE / SECTOR - 1);
    assert_eq!(restored.primary.header.backup_lba, TARGET_SIZE / SECTOR - 1);
    assert_eq!(restored.primary.header.last_usable_lba, TARGET_SIZE / SECTOR - 34);

    let (_, restored_mbr) = disk::read_mbr(&mut dst_io, DiskReadOptions::default()).unwrap();
    assert_eq!(restored_mbr.kind(), MbrKind::Protective);
    assert_eq!(restored_mbr.entries[0].sector_count as u64, TARGET_SIZE / SECTOR - 1);
    assert_eq!(restored_mbr.bootstrap_code_1[..4], [0xEB, 0x63, 0x90, 0x10]);

    for (old, new) in tables.primary.used_entries().zip(restored.primary.used_entries()) {
        assert_eq!(old.type_guid, new.type_guid);
        assert_eq!(old.name, new.name);
        assert_eq!(old.total_bytes(), new.total_bytes());
        assert_ne!(old.unique_guid, new.unique_guid);
    }

    let range = rawio::utils::DiffRange::new(2048 * SECTOR, 2048 * SECTOR, 8192 * SECTOR, 4096);
    let mut src_io = MemBlockIO::new(&mut source);
    assert!(rawio::utils::compare_streamed_bytes(&mut src_io, &mut dst_io, range).unwrap());
}
