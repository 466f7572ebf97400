use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::follower::shape_follower;
use crate::pagination::{FollowerBatches, StreamEnd};
use crate::sink::{FollowerSink, OutputTarget};
use crate::twitter::{AccountSummary, FollowerSource};

/// Whether to draw a progress bar while streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Bar,
    Hidden,
}

impl Progress {
    fn bar(self, declared: u64) -> Result<ProgressBar> {
        if self == Progress::Hidden {
            return Ok(ProgressBar::hidden());
        }

        let pb = ProgressBar::new(declared);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} followers ({eta})")
                .context("Invalid progress bar template")?
                .progress_chars("#>-"),
        );
        Ok(pb)
    }
}

/// Outcome of a completed export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Resolved account; `followers_count` is the count the profile advertised
    pub account: AccountSummary,
    /// Records written to the output file
    pub written: u64,
    pub path: PathBuf,
    pub end: StreamEnd,
    pub pages: u64,
}

/// Export every follower of `username` to `<data_dir>/<username>_followers.jsonl`
///
/// # Arguments
/// * `source` - Upstream used to resolve the user and page through followers
/// * `username` - Twitter username (without the @ symbol)
/// * `data_dir` - Directory the export file is written to
/// * `progress` - Whether to draw a progress bar
pub async fn execute<S: FollowerSource + ?Sized>(
    source: &S,
    username: &str,
    data_dir: &Path,
    progress: Progress,
) -> Result<ExportSummary> {
    info!("Looking up user @{username}");

    let account = source
        .lookup_user(username)
        .await
        .with_context(|| format!("Error fetching user data for @{username}"))?;

    info!(
        "Resolved @{username} to account {id} with {count} followers",
        id = account.id,
        count = account.followers_count
    );

    // Only create the output file once the user is known to exist
    let target = OutputTarget::for_user(data_dir, username);
    let mut sink = target.open()?;
    let pb = progress.bar(account.followers_count)?;

    let mut batches = FollowerBatches::new(source, &account.id);
    if let Err(e) = stream_followers(&mut batches, &mut sink, &pb).await {
        pb.abandon();
        return Err(e).with_context(|| {
            format!(
                "Error during scraping; {written} followers were saved to {path} before the failure",
                written = sink.lines(),
                path = target.path.display()
            )
        });
    }

    let written = sink.finish()?;
    pb.finish();

    let end = batches.end().unwrap_or(StreamEnd::Exhausted);
    debug!(
        "Follower stream ended after {pages} pages: {end:?}",
        pages = batches.pages()
    );

    info!(
        "Completed! Saved {written} followers to {path}",
        path = target.path.display()
    );
    info!("Note: Actual count may differ due to private/suspended accounts");

    Ok(ExportSummary {
        account,
        written,
        path: target.path,
        end,
        pages: batches.pages(),
    })
}

async fn stream_followers<S: FollowerSource + ?Sized>(
    batches: &mut FollowerBatches<'_, S>,
    sink: &mut FollowerSink<BufWriter<File>>,
    pb: &ProgressBar,
) -> Result<()> {
    while let Some(batch) = batches.next_batch().await? {
        for user in &batch {
            sink.write(&shape_follower(user))?;
        }

        let batch_len = batch.len() as u64;
        if sink.lines() > pb.length().unwrap_or_default() {
            pb.set_length(sink.lines());
        }
        pb.inc(batch_len);
        debug!(
            "Wrote batch of {batch_len} followers ({total} total)",
            total = sink.lines()
        );
    }

    Ok(())
}
