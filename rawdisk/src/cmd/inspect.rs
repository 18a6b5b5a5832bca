// SPDX-License-Identifier: MIT

use std::path::Path;

use colored::Colorize;
use rawpart::disk::{self, DiskReadOptions, PartitionStyle};
use rawpart::gpt::{GptCodec, GptMirror, GptTable};
use rawpart::mbr::MbrRecord;

use crate::config::Config;
use crate::device::Disk;
use crate::utils;

fn status(result: rawpart::errors::PartResult<()>) -> String {
    match result {
        Ok(()) => "ok".green().to_string(),
        Err(e) => e.to_string().red().to_string(),
    }
}

pub fn run(path: &Path, config: &Config) -> anyhow::Result<()> {
    let ss = config.disk.sector_size;
    let mut dev = Disk::open_read(path)?;
    let size = dev.size;
    let mut io = dev.io();

    let style = disk::detect_partition_style(&mut io, ss)?;
    crate::log_normal!(
        "{}: {} ({}, {} sectors of {} bytes), {}",
        path.display(),
        utils::pretty_bytes(size),
        utils::sep_u64(size),
        size / ss,
        ss,
        style
    );

    if style == PartitionStyle::Raw {
        crate::log_info!("No partition table found.");
        return Ok(());
    }

    let (_, mbr) = disk::read_mbr(&mut io, DiskReadOptions::lenient())?;
    print_mbr(&mbr);

    if style == PartitionStyle::Gpt {
        let mirror = disk::read_gpt_mirror(&mut io, ss, size, DiskReadOptions::lenient())?;
        let codec = GptCodec::new(ss)?;
        print_gpt(&mirror, &codec);
    }
    Ok(())
}

fn print_mbr(mbr: &MbrRecord) {
    crate::log_normal!(
        "MBR: {:?}, disk signature {}, boot signature {:#06X} [{}]",
        mbr.kind(),
        mbr.disk_signature
            .map(|s| format!("{s:08X}"))
            .unwrap_or_else(|| "none".into()),
        mbr.boot_signature,
        status(mbr.validate())
    );
    for (i, e) in mbr.entries.iter().enumerate().filter(|(_, e)| !e.is_empty()) {
        crate::log_normal!(
            "  #{i} {:<24} {} LBA {:>10} +{:>10} sectors  [{} .. {}]",
            e.partition_kind().to_string(),
            if e.is_bootable() { "*" } else { " " },
            e.first_lba,
            e.sector_count,
            e.first_chs,
            e.last_chs
        );
    }
    let ts = &mbr.timestamp;
    crate::log_verbose!(
        "  timestamp {:02}:{:02}:{:02}, drive {:#04X}",
        ts.hours(),
        ts.minutes(),
        ts.seconds(),
        ts.original_drive()
    );
}

fn print_table(label: &str, raw: &[u8], table: &GptTable, codec: &GptCodec) {
    let h = &table.header;
    crate::log_normal!(
        "{label} GPT at LBA {} -> backup {}, usable {}..={}, array at LBA {} ({} x {} bytes) [{}]",
        h.current_lba,
        h.backup_lba,
        h.first_usable_lba,
        h.last_usable_lba,
        h.entries_lba,
        h.num_entries,
        h.entry_size,
        status(codec.validate(raw))
    );
    crate::log_verbose!(
        "  disk GUID {}, header CRC {:08X}, entries CRC {:08X}",
        h.disk_guid,
        h.header_crc32,
        h.entries_crc32
    );
}

fn print_gpt(mirror: &GptMirror, codec: &GptCodec) {
    print_table("Primary", &mirror.primary_raw, &mirror.primary, codec);
    print_table("Backup ", &mirror.backup_raw, &mirror.backup, codec);
    crate::log_normal!("Mirror: [{}]", status(mirror.validate_mirror()));
    crate::log_normal!("Entries: [{}]", status(mirror.primary.validate_entries()));

    for (i, e) in mirror.primary.entries.iter().enumerate().filter(|(_, e)| e.has_data()) {
        crate::log_normal!(
            "  #{i:<3} {:<36} {:<28} {:>10}..={:<10} {:>10}",
            utils::truncate(&e.name, 36),
            e.kind().to_string(),
            e.first_lba,
            e.last_lba,
            utils::pretty_bytes(e.total_bytes())
        );
        crate::log_verbose!("       unique {} attrs {:#018X}", e.unique_guid, e.attributes);
    }
}
