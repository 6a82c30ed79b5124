//! # Sources
//!
//! Each source produces the track refs it wants in the shuffle playlist.
//! Sources that depend on operator choices (playlists, followed artists)
//! first run [`triage`]: every remote playlist or artist that has never been
//! asked about is put to the operator once, and the answer is stored.
//!
//! Triage is one routine parameterized by a [`TriageSource`]; the playlist
//! and artist variants only differ in how they list remote entities and
//! which preference list they read and write.

mod albums;
mod artists;
mod playlists;

use std::collections::HashSet;

use async_trait::async_trait;

pub use albums::SavedAlbumSource;
pub use artists::{ArtistSource, ArtistTriage, artist_top_tracks};
pub use playlists::{PlaylistSource, PlaylistTriage, fetch_playlist_items};

use crate::{
    error::{PreferenceError, RemoteError, SourceError},
    info,
    prompt::Prompt,
    types::{ItemRef, RemoteEntity, TriageRecord},
};

/// A producer of tracks for the shuffle playlist.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Name used in progress output and the run report.
    fn name(&self) -> &str;

    /// Collects this source's tracks. Duplicates are fine.
    async fn collect(&self) -> Result<Vec<ItemRef>, SourceError>;
}

/// What triage needs to know about one kind of remote entity.
#[async_trait]
pub trait TriageSource: Send + Sync {
    /// Singular noun used in questions, e.g. `playlist`.
    fn kind(&self) -> &'static str;

    async fn fetch_remote(&self) -> Result<Vec<RemoteEntity>, RemoteError>;

    async fn load_triaged(&self) -> Result<Vec<TriageRecord>, PreferenceError>;

    async fn save_triaged(&self, records: &[TriageRecord]) -> Result<(), PreferenceError>;

    /// Entities that may never be offered, such as the shuffle playlist itself.
    fn is_candidate(&self, entity: &RemoteEntity) -> bool;
}

/// Asks about every new remote entity and returns the included ones.
///
/// Entities already in the stored list are never asked about again, so a
/// second run against an unchanged remote list asks nothing. New decisions
/// are saved in one go after the pass. Included records that no longer
/// exist remotely are kept in storage but not returned.
///
/// # Errors
///
/// Listing, loading, saving or prompting failures. Nothing is saved when
/// the pass fails midway.
pub async fn triage(
    source: &dyn TriageSource,
    prompt: &dyn Prompt,
) -> Result<Vec<TriageRecord>, SourceError> {
    let mut records = source.load_triaged().await?;
    let remote = source.fetch_remote().await?;

    let mut known: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
    let mut asked = 0;

    for entity in &remote {
        if known.contains(&entity.id) || !source.is_candidate(entity) {
            continue;
        }

        let question = match entity.track_total {
            Some(total) => format!(
                "Add {} '{}' ({} tracks) to shuffle?",
                source.kind(),
                entity.name,
                total
            ),
            None => format!("Add {} '{}' to shuffle?", source.kind(), entity.name),
        };
        let include = prompt.ask(&question).await?;

        known.insert(entity.id.clone());
        records.push(TriageRecord {
            id: entity.id.clone(),
            name: entity.name.clone(),
            include_in_shuffle: include,
        });
        asked += 1;
    }

    if asked > 0 {
        source.save_triaged(&records).await?;
        info!("Saved {} new {} decision(s).", asked, source.kind());
    }

    let present: HashSet<&str> = remote.iter().map(|e| e.id.as_str()).collect();
    Ok(records
        .into_iter()
        .filter(|r| r.include_in_shuffle && present.contains(r.id.as_str()))
        .collect())
}
