use indicatif::{ProgressBar, ProgressStyle};

use crate::{config, error::RunError, info, success, types::ItemRef};

use super::Remote;

/// Writes a track list to the target playlist in API-sized chunks.
///
/// Chunks are sent one after the other, in list order, so the playlist ends
/// up in exactly the order given. A chunk that still fails after retries
/// stops the write: the playlist must never be silently under-filled.
pub struct BatchWriter {
    remote: Remote,
    playlist_id: String,
    chunk_size: usize,
}

impl BatchWriter {
    pub fn new(remote: Remote, playlist_id: impl Into<String>) -> Self {
        Self {
            remote,
            playlist_id: playlist_id.into(),
            chunk_size: config::WRITE_CHUNK_SIZE,
        }
    }

    /// Overrides the chunk size. Values above the API maximum are a caller bug.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        debug_assert!(
            chunk_size <= config::WRITE_CHUNK_SIZE,
            "chunk size above the API maximum"
        );
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Clears the playlist, then appends `items` in chunks.
    ///
    /// Returns the number of tracks written.
    ///
    /// # Errors
    ///
    /// [`RunError::Write`] when the clear or any chunk fails. The playlist is
    /// left as it is; re-running rebuilds it.
    pub async fn replace_all(&self, items: &[ItemRef]) -> Result<usize, RunError> {
        let playlist_id = self.playlist_id.as_str();
        self.remote
            .call("clear shuffle playlist", |c| {
                c.replace_playlist_items(playlist_id, &[])
            })
            .await
            .map_err(|source| RunError::Write {
                written: 0,
                total: items.len(),
                source,
            })?;

        self.append_chunks(items).await
    }

    /// Appends `items` in consecutive chunks of at most `chunk_size`.
    ///
    /// Issues exactly `ceil(len / chunk_size)` calls.
    ///
    /// # Errors
    ///
    /// [`RunError::Write`] with the number of tracks written before the
    /// failing chunk.
    pub async fn append_chunks(&self, items: &[ItemRef]) -> Result<usize, RunError> {
        let batches = items.len().div_ceil(self.chunk_size);
        info!("Adding {} tracks in {} batch(es)...", items.len(), batches);

        let pb = ProgressBar::new(batches as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.blue} {pos}/{len} {msg}") {
            pb.set_style(style);
        }

        let playlist_id = self.playlist_id.as_str();
        let mut written = 0;
        for chunk in items.chunks(self.chunk_size) {
            if let Err(source) = self
                .remote
                .call("add tracks to shuffle playlist", |c| {
                    c.add_playlist_items(playlist_id, chunk)
                })
                .await
            {
                pb.finish_and_clear();
                return Err(RunError::Write {
                    written,
                    total: items.len(),
                    source,
                });
            }
            written += chunk.len();
            pb.inc(1);
        }

        pb.finish_and_clear();
        success!("All {} tracks added.", written);
        Ok(written)
    }
}
