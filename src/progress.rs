use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Set up the per-date progress bar, or `None` in quiet mode
pub fn setup_progress_bar(total: u64, quiet: bool) -> Result<Option<ProgressBar>> {
    if quiet {
        return Ok(None);
    }

    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] Dates: {pos}/{len} ({msg}) {eta}")?
            .progress_chars("#>-"),
    );
    pb.set_message("starting");
    Ok(Some(pb))
}
