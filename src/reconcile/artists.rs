use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config,
    engine::{
        Remote,
        pagination::{fan_out, fetch_cursor_pages},
    },
    error::{PreferenceError, RemoteError, SourceError},
    management::PreferenceStore,
    prompt::Prompt,
    success,
    types::{AlbumRef, ItemRef, RemoteEntity, TrackDetail, TriageRecord},
    utils, warning,
};

use super::{ItemSource, TriageSource, albums::fetch_album_tracks, triage};

/// The `limit` most popular tracks across an artist's albums and singles.
///
/// 1. Walks the artist's album listing page by page.
/// 2. Fetches the tracks of all albums concurrently.
/// 3. Fetches full track objects in batches, concurrently, for popularity.
/// 4. Sorts by popularity, ties keeping discovery order (album listing
///    order, then track number).
///
/// Albums or batches that fail are skipped with a warning.
///
/// # Errors
///
/// Only when the album listing cannot be read at all.
pub async fn artist_top_tracks(
    remote: &Remote,
    artist_id: &str,
    limit: usize,
) -> Result<Vec<ItemRef>, RemoteError> {
    let albums: Vec<AlbumRef> = fetch_cursor_pages(remote, "get artist albums", |cursor| {
        async move {
            remote
                .client()
                .artist_albums(artist_id, cursor.as_deref(), config::LIBRARY_PAGE_SIZE)
                .await
        }
    })
    .await?;

    let max_in_flight = remote.fetch_options().max_in_flight;

    let task_remote = remote.clone();
    let album_results = fan_out(albums.clone(), max_in_flight, move |album: AlbumRef| {
        let remote = task_remote.clone();
        async move { fetch_album_tracks(&remote, &album.id).await }
    })
    .await;

    let mut discovered = Vec::new();
    for (album, result) in albums.iter().zip(album_results) {
        match result {
            Ok(tracks) => discovered.extend(tracks),
            Err(e) => warning!("Error fetching tracks from album {}: {}", album.name, e),
        }
    }
    let discovered = utils::dedup_preserving_order(discovered);

    let batches: Vec<Vec<ItemRef>> = discovered
        .chunks(config::TRACK_DETAIL_BATCH_SIZE)
        .map(<[ItemRef]>::to_vec)
        .collect();

    let task_remote = remote.clone();
    let detail_results = fan_out(batches, max_in_flight, move |batch: Vec<ItemRef>| {
        let remote = task_remote.clone();
        async move {
            remote
                .call("get several tracks", |c| c.tracks(&batch))
                .await
        }
    })
    .await;

    let mut details: Vec<TrackDetail> = Vec::with_capacity(discovered.len());
    for result in detail_results {
        match result {
            Ok(batch) => details.extend(batch),
            Err(e) => warning!("Error fetching track details: {}", e),
        }
    }

    Ok(utils::top_by_popularity(details, limit))
}

/// Triage over the followed artists.
pub struct ArtistTriage {
    remote: Remote,
    store: Arc<dyn PreferenceStore>,
    target: String,
}

impl ArtistTriage {
    pub fn new(remote: Remote, store: Arc<dyn PreferenceStore>, target: impl Into<String>) -> Self {
        Self {
            remote,
            store,
            target: target.into(),
        }
    }
}

#[async_trait]
impl TriageSource for ArtistTriage {
    fn kind(&self) -> &'static str {
        "artist"
    }

    async fn fetch_remote(&self) -> Result<Vec<RemoteEntity>, RemoteError> {
        let remote = &self.remote;
        fetch_cursor_pages(remote, "get followed artists", |cursor| async move {
            remote
                .client()
                .followed_artists(cursor.as_deref(), config::LIBRARY_PAGE_SIZE)
                .await
        })
        .await
    }

    async fn load_triaged(&self) -> Result<Vec<TriageRecord>, PreferenceError> {
        self.store.load_creators().await
    }

    async fn save_triaged(&self, records: &[TriageRecord]) -> Result<(), PreferenceError> {
        self.store.save_creators(records).await
    }

    fn is_candidate(&self, entity: &RemoteEntity) -> bool {
        entity.id != self.target
    }
}

/// Top tracks of every included followed artist.
pub struct ArtistSource {
    remote: Remote,
    triage: ArtistTriage,
    prompt: Arc<dyn Prompt>,
}

impl ArtistSource {
    pub fn new(
        remote: Remote,
        store: Arc<dyn PreferenceStore>,
        prompt: Arc<dyn Prompt>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            triage: ArtistTriage::new(remote.clone(), store, target),
            remote,
            prompt,
        }
    }
}

#[async_trait]
impl ItemSource for ArtistSource {
    fn name(&self) -> &str {
        "artists"
    }

    async fn collect(&self) -> Result<Vec<ItemRef>, SourceError> {
        let mut items = Vec::new();

        for artist in triage(&self.triage, self.prompt.as_ref()).await? {
            let top = artist_top_tracks(&self.remote, &artist.id, config::TOP_TRACKS_PER_ARTIST);
            match top.await {
                Ok(tracks) => {
                    success!("Added {} tracks from artist: {}", tracks.len(), artist.name);
                    items.extend(tracks);
                }
                Err(e) => warning!("Skipping artist {}: {}", artist.name, e),
            }
        }

        Ok(items)
    }
}
