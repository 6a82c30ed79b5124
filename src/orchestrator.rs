//! # Shuffle Run
//!
//! One run is a single linear pass:
//!
//! ```text
//! AuthReady → BaselineLoaded → SourcesReconciled → Shuffled → Replaced → Verified
//! ```
//!
//! - **BaselineLoaded**: the current members of the shuffle playlist seed the
//!   aggregation set, so a run that fails later never loses them.
//! - **SourcesReconciled**: every source runs in turn. A failing source is
//!   recorded in the report and the run moves on.
//! - **Shuffled**: the set is drained in uniformly random order.
//! - **Replaced**: the playlist is cleared and refilled. Failures here stop
//!   the run.
//! - **Verified**: the playlist size is read back and compared. A mismatch
//!   is reported, never corrected.
//!
//! There are no retries at this level; every remote call already goes
//! through the engine's retry policy.

use chrono::{DateTime, Utc};

use crate::{
    config,
    engine::{AggregationSet, BatchWriter, Remote},
    error::RunError,
    info,
    reconcile::{ItemSource, fetch_playlist_items},
    success, utils, warning,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    AuthReady,
    BaselineLoaded,
    SourcesReconciled,
    Shuffled,
    Replaced,
    Verified,
}

/// What one source did during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub name: String,
    /// Tracks the source returned, duplicates included.
    pub contributed: usize,
    /// Tracks that were not in the set yet.
    pub added: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Last phase the run reached.
    pub phase: RunPhase,
    pub started_at: DateTime<Utc>,
    /// Distinct tracks already in the shuffle playlist.
    pub baseline: usize,
    pub sources: Vec<SourceOutcome>,
    /// Size of the aggregation set after all sources ran.
    pub aggregated: usize,
    /// Tracks written back. Zero on a dry run.
    pub written: usize,
    /// Playlist size read back after the write, if that read succeeded.
    pub verified: Option<usize>,
    pub cover_uploaded: bool,
}

impl RunReport {
    fn new() -> Self {
        Self {
            phase: RunPhase::AuthReady,
            started_at: Utc::now(),
            baseline: 0,
            sources: Vec::new(),
            aggregated: 0,
            written: 0,
            verified: None,
            cover_uploaded: false,
        }
    }

    /// Whether the read-back size matched what was written.
    pub fn is_consistent(&self) -> bool {
        self.verified == Some(self.written)
    }

    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.sources.iter().filter(|s| s.error.is_some())
    }
}

pub struct Orchestrator {
    remote: Remote,
    target: String,
    sources: Vec<Box<dyn ItemSource>>,
    chunk_size: usize,
    dry_run: bool,
    cover: Option<String>,
}

impl Orchestrator {
    pub fn new(remote: Remote, target: impl Into<String>) -> Self {
        Self {
            remote,
            target: target.into(),
            sources: Vec::new(),
            chunk_size: config::WRITE_CHUNK_SIZE,
            dry_run: false,
            cover: None,
        }
    }

    /// Adds a source. Sources run in the order they were added.
    pub fn with_source(mut self, source: Box<dyn ItemSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Stop after shuffling; nothing is written.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Base64 encoded JPEG uploaded as cover after a successful write.
    pub fn with_cover(mut self, jpeg_base64: Option<String>) -> Self {
        self.cover = jpeg_base64;
        self
    }

    /// Executes one run.
    ///
    /// # Errors
    ///
    /// - [`RunError::Baseline`] when the shuffle playlist cannot be read.
    /// - [`RunError::Write`] when clearing or refilling it fails. The playlist
    ///   may be left partially filled; running again rebuilds it.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let mut report = RunReport::new();
        let set = AggregationSet::new();

        let pb = utils::spinner("Loading the shuffle playlist...");
        let baseline = fetch_playlist_items(&self.remote, &self.target).await;
        pb.finish_and_clear();
        let baseline = baseline.map_err(RunError::Baseline)?;

        report.baseline = set.insert_all(baseline).await;
        report.phase = RunPhase::BaselineLoaded;
        success!("Shuffle playlist holds {} tracks.", report.baseline);

        for source in &self.sources {
            report.sources.push(self.reconcile(source.as_ref(), &set).await);
        }
        report.aggregated = set.len().await;
        report.phase = RunPhase::SourcesReconciled;
        success!("Collected {} distinct tracks.", report.aggregated);

        let shuffled = set.drain_shuffled().await;
        report.phase = RunPhase::Shuffled;

        if self.dry_run {
            info!("Dry run: {} tracks would be written.", shuffled.len());
            return Ok(report);
        }

        report.written = BatchWriter::new(self.remote.clone(), self.target.as_str())
            .with_chunk_size(self.chunk_size)
            .replace_all(&shuffled)
            .await?;
        report.phase = RunPhase::Replaced;

        if let Some(cover) = &self.cover {
            report.cover_uploaded = self.upload_cover(cover).await;
        }

        self.verify(&mut report).await;
        Ok(report)
    }

    async fn reconcile(&self, source: &dyn ItemSource, set: &AggregationSet) -> SourceOutcome {
        info!("Collecting tracks from {}...", source.name());

        match source.collect().await {
            Ok(items) => {
                let contributed = items.len();
                let added = set.insert_all(items).await;
                success!(
                    "{}: {} tracks, {} new.",
                    source.name(),
                    contributed,
                    added
                );
                SourceOutcome {
                    name: source.name().to_string(),
                    contributed,
                    added,
                    error: None,
                }
            }
            Err(e) => {
                warning!("Skipping {}: {}", source.name(), e);
                SourceOutcome {
                    name: source.name().to_string(),
                    contributed: 0,
                    added: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn upload_cover(&self, jpeg_base64: &str) -> bool {
        let target = self.target.as_str();
        match self
            .remote
            .call("upload playlist cover", |c| {
                c.upload_playlist_cover(target, jpeg_base64)
            })
            .await
        {
            Ok(()) => {
                success!("Cover image uploaded.");
                true
            }
            Err(e) => {
                warning!("Failed to upload cover image: {}", e);
                false
            }
        }
    }

    async fn verify(&self, report: &mut RunReport) {
        let target = self.target.as_str();
        let pb = utils::spinner("Verifying the shuffle playlist...");
        let total = self
            .remote
            .call("get playlist", |c| c.playlist_total(target))
            .await;
        pb.finish_and_clear();

        match total {
            Ok(total) => {
                let total = total as usize;
                report.verified = Some(total);
                report.phase = RunPhase::Verified;
                if total == report.written {
                    success!("Shuffle playlist now holds {} tracks.", total);
                } else {
                    warning!(
                        "Shuffle playlist holds {} tracks but {} were written.",
                        total,
                        report.written
                    );
                }
            }
            Err(e) => warning!("Could not verify the shuffle playlist: {}", e),
        }
    }
}
