// SPDX-License-Identifier: MIT

mod cmd;
mod config;
mod device;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::cmd::copy::CopyArgs;
use crate::cmd::tables::RestoreArgs;
use crate::config::Config;
use crate::utils::LogLevel;

#[derive(Parser)]
#[command(name = "rawdisk", version, about = "Raw disk backup and partition-table tool", long_about = None)]
struct Cli {
    /// Config file (defaults to ./rawdisk.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Logical sector size in bytes
    #[arg(long, global = true)]
    sector_size: Option<u64>,

    /// Show library diagnostics
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors and requested output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the partition style, MBR entries and both GPT copies
    Inspect {
        /// Image file or device node
        path: PathBuf,
    },
    /// Copy a raw byte range between images or devices
    Copy {
        source: PathBuf,
        dest: PathBuf,
        #[arg(long, default_value_t = 0)]
        source_offset: u64,
        #[arg(long, default_value_t = 0)]
        dest_offset: u64,
        /// Bytes to copy (default: rest of the source)
        #[arg(long)]
        length: Option<u64>,
        /// Transfer chunk size in bytes
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Compare source and destination after the copy
        #[arg(long)]
        verify: bool,
    },
    /// Save mbr.bin, gpt1.bin and gpt2.bin
    DumpTables {
        path: PathBuf,
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
        /// Dump tables that fail validation
        #[arg(long)]
        lenient: bool,
    },
    /// Write dumped tables to a disk, relocating the GPT to its size
    RestoreTables {
        /// Directory holding mbr.bin and optionally gpt1.bin/gpt2.bin
        dir: PathBuf,
        target: PathBuf,
        /// Keep the original MBR disk signature
        #[arg(long)]
        keep_signature: bool,
        /// Only print what would be done
        #[arg(long)]
        dry_run: bool,
        /// Restore even if a partition ends past the target's last usable LBA
        #[arg(long)]
        force: bool,
    },
    /// Print how much of the disk a backup must read
    Plan {
        path: PathBuf,
        /// Read every sector, partitioned or not
        #[arg(long)]
        sector_by_sector: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    utils::log::init(if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    });

    let (chunk_size, verify) = match &cli.command {
        Commands::Copy {
            chunk_size, verify, ..
        } => (*chunk_size, *verify),
        _ => (None, false),
    };
    let config = Config::load(cli.config.as_deref())?.with_overrides(
        cli.sector_size,
        chunk_size,
        verify,
    )?;
    log_verbose!("{config:?}");

    match cli.command {
        Commands::Inspect { path } => cmd::inspect::run(&path, &config)?,
        Commands::Copy {
            source,
            dest,
            source_offset,
            dest_offset,
            length,
            ..
        } => {
            let args = CopyArgs {
                source_offset,
                dest_offset,
                length,
            };
            cmd::copy::run(&source, &dest, args, &config)?
        }
        Commands::DumpTables {
            path,
            out_dir,
            lenient,
        } => cmd::tables::dump(&path, &out_dir, lenient, &config)?,
        Commands::RestoreTables {
            dir,
            target,
            keep_signature,
            dry_run,
            force,
        } => {
            let args = RestoreArgs {
                keep_signature,
                dry_run,
                force,
            };
            cmd::tables::restore(&dir, &target, args, &config)?
        }
        Commands::Plan {
            path,
            sector_by_sector,
        } => cmd::plan::run(&path, sector_by_sector, &config)?,
    }

    Ok(())
}
