//! JSONL feeds
//!
//! Hands the assembled streams to downstream ingestion as a sequence of
//! numbered JSON-lines files (`0.jsonl`, `1.jsonl`, ...) in one directory per
//! feed. Each file is written under a temporary name in the same directory and
//! renamed into place, so a watcher never sees a partial file.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use crate::config::FeedSettings;
use crate::error::SimResult;
use crate::simulation::SimulationOutput;

pub const DEVICE_FEED: &str = "device_feed";
pub const METRIC_FEED: &str = "metric_feed";

/// Cursor over one stream plus the next file sequence number
#[derive(Debug, Clone)]
pub struct FeedWriter {
    dir: PathBuf,
    batch_size: usize,
    position: usize,
    next_file_seq: u64,
}

impl FeedWriter {
    /// Feed rooted at `output_dir/feed_name`; the directory is created if missing.
    pub fn create(output_dir: &Path, feed_name: &str, batch_size: usize) -> SimResult<Self> {
        let dir = output_dir.join(feed_name);
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), batch_size = batch_size, "Feed directory ready");

        Ok(Self {
            dir,
            batch_size: batch_size.max(1),
            position: 0,
            next_file_seq: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn next_file_seq(&self) -> u64 {
        self.next_file_seq
    }

    pub fn is_exhausted<T>(&self, records: &[T]) -> bool {
        self.position >= records.len()
    }

    /// Write the next batch of `records` starting at the cursor.
    ///
    /// Returns the written file, or `None` once the stream is exhausted.
    pub fn write_next_batch<T: Serialize>(&mut self, records: &[T]) -> SimResult<Option<PathBuf>> {
        if self.is_exhausted(records) {
            debug!(dir = %self.dir.display(), "No more records to write");
            return Ok(None);
        }

        let end = (self.position + self.batch_size).min(records.len());
        let batch = &records[self.position..end];

        let file_name = format!("{}.jsonl", self.next_file_seq);
        let tmp_path = self.dir.join(format!(".{}.tmp", file_name));
        let final_path = self.dir.join(&file_name);

        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            for record in batch {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &final_path)?;

        debug!(
            file = %final_path.display(),
            records = batch.len(),
            position = end,
            "Wrote feed batch"
        );

        self.position = end;
        self.next_file_seq += 1;
        Ok(Some(final_path))
    }
}

/// Files written per feed by [`publish`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub device_files: u64,
    pub metric_files: u64,
}

/// Drip both streams of a run into their feeds, one batch each per tick.
pub async fn publish(output: &SimulationOutput, settings: &FeedSettings) -> SimResult<PublishSummary> {
    let mut device_feed = FeedWriter::create(&settings.output_dir, DEVICE_FEED, settings.device_batch_size)?;
    let mut metric_feed = FeedWriter::create(&settings.output_dir, METRIC_FEED, settings.metric_batch_size)?;

    info!(
        run_id = %output.run_id,
        device_records = output.device_records.len(),
        metric_records = output.metric_records.len(),
        interval_ms = settings.interval_ms,
        "Publishing feeds"
    );

    let mut tick_interval = interval(Duration::from_millis(settings.interval_ms.max(1)));
    let mut tick_count: u64 = 0;

    loop {
        tick_interval.tick().await;
        tick_count += 1;

        let device_file = device_feed.write_next_batch(&output.device_records)?;
        let metric_file = metric_feed.write_next_batch(&output.metric_records)?;

        if device_file.is_none() && metric_file.is_none() {
            break;
        }

        if tick_count % 100 == 0 {
            info!(
                tick = tick_count,
                device_position = device_feed.position(),
                metric_position = metric_feed.position(),
                "Feed progress"
            );
        }
    }

    let summary = PublishSummary {
        device_files: device_feed.next_file_seq(),
        metric_files: metric_feed.next_file_seq(),
    };
    info!(
        run_id = %output.run_id,
        device_files = summary.device_files,
        metric_files = summary.metric_files,
        "Feeds exhausted"
    );
    Ok(summary)
}
