// SPDX-License-Identifier: MIT

use indicatif::{ProgressBar, ProgressStyle};
use rawio::prelude::*;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.white}] {bytes}/{total_bytes} (ETA {eta_precise}) {msg}";

pub fn transfer_bar(total_size: u64, message: &str) -> ProgressBar {
    if crate::utils::log_level() == crate::utils::LogLevel::Quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total_size);
    let style = ProgressStyle::default_bar()
        .template(TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░░");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Mirrors an engine progress report onto the bar.
pub fn update_bar(pb: &ProgressBar, progress: &TransferProgress) {
    pb.set_position(progress.completed_bytes);
    if progress.cancelled {
        pb.abandon_with_message("cancelled");
    } else if progress.end {
        pb.finish_and_clear();
    }
}
