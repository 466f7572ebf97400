use crate::follower::ShapedFollower;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Line-delimited JSON writer for shaped followers.
///
/// Dropping the sink without calling [`FollowerSink::finish`] still closes the
/// underlying writer; whatever was written so far stays on disk.
pub struct FollowerSink<W: Write> {
    writer: W,
    lines: u64,
}

impl FollowerSink<BufWriter<File>> {
    /// Creates (or truncates) the export file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).with_context(|| {
            format!("Failed to create output file {path}", path = path.display())
        })?;
        debug!("Opened output file {path}", path = path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> FollowerSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    /// Appends one record as a single JSON line
    pub fn write(&mut self, follower: &ShapedFollower) -> Result<()> {
        serde_json::to_writer(&mut self.writer, follower).with_context(|| {
            format!("Failed to write follower {id}", id = follower.id_str)
        })?;
        self.writer
            .write_all(b"\n")
            .context("Failed to write line terminator")?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Flushes buffered output and returns the number of lines written
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush().context("Failed to flush output file")?;
        Ok(self.lines)
    }
}

/// Where a run writes its export, resolved before any record is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub path: PathBuf,
}

impl OutputTarget {
    pub fn for_user(data_dir: &Path, username: &str) -> Self {
        Self {
            path: crate::filename_utils::followers_file_path(data_dir, username),
        }
    }

    pub fn open(&self) -> Result<FollowerSink<BufWriter<File>>> {
        FollowerSink::create(&self.path)
    }
}
