use async_trait::async_trait;

use crate::{
    config,
    engine::{
        Remote,
        pagination::{fan_out, fetch_offset_pages_discovering, fetch_offset_pages_sequential},
    },
    error::{RemoteError, SourceError},
    success,
    types::{AlbumRef, ItemRef},
    warning,
};

use super::ItemSource;

/// Every track of one album, in track order.
///
/// Pages are requested one after the other: callers already fan out across
/// albums.
pub(crate) async fn fetch_album_tracks(
    remote: &Remote,
    album_id: &str,
) -> Result<Vec<ItemRef>, RemoteError> {
    fetch_offset_pages_sequential(
        remote,
        "get album tracks",
        config::LIBRARY_PAGE_SIZE,
        |offset, limit| async move { remote.client().album_tracks(album_id, offset, limit).await },
    )
    .await
}

/// Tracks of every album saved in the user's library.
///
/// Album track listings may hand out bare ids; every ref is normalized to a
/// full track URI so it deduplicates against the other sources.
pub struct SavedAlbumSource {
    remote: Remote,
}

impl SavedAlbumSource {
    pub fn new(remote: Remote) -> Self {
        Self { remote }
    }

    async fn saved_albums(&self) -> Result<Vec<AlbumRef>, RemoteError> {
        fetch_offset_pages_discovering(
            &self.remote,
            "get saved albums",
            config::LIBRARY_PAGE_SIZE,
            |remote, offset, limit| async move { remote.client().saved_albums(offset, limit).await },
        )
        .await
    }
}

#[async_trait]
impl ItemSource for SavedAlbumSource {
    fn name(&self) -> &str {
        "albums"
    }

    async fn collect(&self) -> Result<Vec<ItemRef>, SourceError> {
        let albums = self.saved_albums().await?;

        let task_remote = self.remote.clone();
        let results = fan_out(
            albums.clone(),
            self.remote.fetch_options().max_in_flight,
            move |album: AlbumRef| {
                let remote = task_remote.clone();
                async move { fetch_album_tracks(&remote, &album.id).await }
            },
        )
        .await;

        let mut items = Vec::new();
        for (album, result) in albums.iter().zip(results) {
            match result {
                Ok(tracks) => items.extend(
                    tracks
                        .iter()
                        .map(|track| ItemRef::from_track_id(track.uri())),
                ),
                Err(e) => warning!("Skipping album {}: {}", album.name, e),
            }
        }

        success!("Added {} tracks from {} saved albums.", items.len(), albums.len());
        Ok(items)
    }
}
