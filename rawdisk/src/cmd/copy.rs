// SPDX-License-Identifier: MIT

use std::path::Path;
use std::time::Instant;

use rawio::prelude::*;
use rawio::utils::{DiffRange, first_diff_bytes};

use crate::config::Config;
use crate::device::Disk;
use crate::utils::{self, progress};

#[derive(Debug, Clone, Copy, Default)]
pub struct CopyArgs {
    pub source_offset: u64,
    pub dest_offset: u64,
    /// Defaults to everything after `source_offset`.
    pub length: Option<u64>,
}

pub fn run(source: &Path, dest: &Path, args: CopyArgs, config: &Config) -> anyhow::Result<()> {
    let t0 = Instant::now();
    let mut src = Disk::open_read(source)?;
    let mut dst = Disk::open_or_create(dest)?;

    let available = src.size.saturating_sub(args.source_offset);
    let length = args.length.unwrap_or(available);
    if length == 0 {
        anyhow::bail!("nothing to copy from {}", source.display());
    }
    if length > available {
        anyhow::bail!(
            "{} has only {} bytes after offset {} ({} requested)",
            source.display(),
            available,
            args.source_offset,
            length
        );
    }

    crate::log_info!(
        "Copying {} from {}@{:#x} to {}@{:#x}",
        utils::pretty_bytes(length),
        source.display(),
        args.source_offset,
        dest.display(),
        args.dest_offset
    );

    let range = TransferRange::new(length)
        .with_source_offset(args.source_offset)
        .with_dest_offset(args.dest_offset);
    let mut engine = TransferEngine::new(config.transfer.chunk_size)?;
    let pb = progress::transfer_bar(length, "copy");
    let done = engine.copy(
        &mut src.file,
        &mut dst.file,
        range,
        |p| progress::update_bar(&pb, p),
        &CancelToken::new(),
    )?;
    if done.cancelled {
        anyhow::bail!("copy cancelled after {} bytes", done.completed_bytes);
    }
    dst.file.sync_all()?;

    crate::log_info!(
        "Copied {} in {:.2?}",
        utils::pretty_bytes(done.completed_bytes),
        t0.elapsed()
    );

    if config.transfer.verify {
        verify(&mut src, &mut dst, args.source_offset, args.dest_offset, length, config)?;
    }
    Ok(())
}

/// Compares both ranges and returns the read counters of (source, destination).
fn verify(
    src: &mut Disk,
    dst: &mut Disk,
    source_offset: u64,
    dest_offset: u64,
    length: u64,
    config: &Config,
) -> anyhow::Result<(IoStats, IoStats)> {
    let range = DiffRange::new(source_offset, dest_offset, length, config.transfer.chunk_size);
    let ss = config.disk.sector_size;
    let mut src_io = src.io();
    let mut dst_io = dst.io();
    let mut src_count = IOCounter::with_align(&mut src_io, ss);
    let mut dst_count = IOCounter::with_align(&mut dst_io, ss);

    let diff = first_diff_bytes(&mut src_count, &mut dst_count, range)?;
    let stats = (src_count.snapshot(), dst_count.snapshot());
    for (side, s) in [("source", &stats.0), ("destination", &stats.1)] {
        crate::log_verbose!(
            "Verify {side}: {} reads, {} bytes, {} unaligned, largest {}",
            s.reads,
            utils::sep_u64(s.read_bytes),
            s.unaligned_reads,
            utils::pretty_bytes(s.max_read)
        );
    }

    match diff {
        None => {
            crate::log_info!("Verify: {} identical", utils::pretty_bytes(length));
            Ok(stats)
        }
        Some((off, left, right)) => anyhow::bail!(
            "verify failed at +{off:#x}: source {left:#04X}, destination {right:#04X}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_with_offsets_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.img");
        let dest = dir.path().join("dst.img");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 253) as u8).collect();
        std::fs::write(&source, &data).unwrap();

        let mut config = Config::default();
        config.transfer.chunk_size = 4096;
        config.transfer.verify = true;

        let args = CopyArgs {
            source_offset: 1000,
            dest_offset: 512,
            length: Some(150_000),
        };
        run(&source, &dest, args, &config).unwrap();

        let out = std::fs::read(&dest).unwrap();
        assert_eq!(out.len(), 512 + 150_000);
        assert_eq!(&out[512..], &data[1000..151_000]);

        let too_long = CopyArgs {
            length: Some(300_000),
            ..CopyArgs::default()
        };
        assert!(run(&source, &dest, too_long, &config).is_err());
    }

    #[test]
    fn verify_reads_in_chunks_and_finds_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src.img");
        let dest = dir.path().join("dst.img");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
        std::fs::write(&source, &data).unwrap();
        std::fs::write(&dest, &data).unwrap();

        let mut config = Config::default();
        config.transfer.chunk_size = 4096;

        let mut src = Disk::open_read(&source).unwrap();
        let mut dst = Disk::open_read(&dest).unwrap();
        let (s, d) = verify(&mut src, &mut dst, 0, 0, 10_000, &config).unwrap();
        assert_eq!(s.reads, 3);
        assert_eq!(s.read_bytes, 10_000);
        assert_eq!(s.max_read, 4096);
        assert_eq!(s.unaligned_reads, 1);
        assert_eq!(s.writes, 0);
        assert_eq!(d, s);

        let mut bad = data.clone();
        bad[5000] ^= 0xFF;
        std::fs::write(&dest, &bad).unwrap();
        let mut dst = Disk::open_read(&dest).unwrap();
        let err = verify(&mut src, &mut dst, 0, 0, 10_000, &config).unwrap_err();
        assert!(err.to_string().contains("+0x1388"));
    }
}
