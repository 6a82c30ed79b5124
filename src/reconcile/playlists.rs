use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config,
    engine::{
        Remote,
        pagination::{fetch_offset_pages, fetch_offset_pages_discovering},
    },
    error::{PreferenceError, RemoteError, SourceError},
    management::PreferenceStore,
    prompt::Prompt,
    success,
    types::{ItemRef, RemoteEntity, TriageRecord},
    warning,
};

use super::{ItemSource, TriageSource, triage};

/// Every item of a playlist. The total is read first, then all pages are
/// fetched concurrently.
///
/// # Errors
///
/// Fails when the playlist itself cannot be read. Failed pages follow the
/// remote's page failure policy.
pub async fn fetch_playlist_items(
    remote: &Remote,
    playlist_id: &str,
) -> Result<Vec<ItemRef>, RemoteError> {
    let total = remote
        .call("get playlist", |c| c.playlist_total(playlist_id))
        .await?;

    let id = playlist_id.to_string();
    fetch_offset_pages(
        remote,
        "get playlist items",
        total,
        config::PLAYLIST_PAGE_SIZE,
        move |remote, offset, limit| {
            let id = id.clone();
            async move { remote.client().playlist_items(&id, offset, limit).await }
        },
    )
    .await
}

/// Triage over the user's playlists.
pub struct PlaylistTriage {
    remote: Remote,
    store: Arc<dyn PreferenceStore>,
    target: String,
}

impl PlaylistTriage {
    pub fn new(remote: Remote, store: Arc<dyn PreferenceStore>, target: impl Into<String>) -> Self {
        Self {
            remote,
            store,
            target: target.into(),
        }
    }
}

#[async_trait]
impl TriageSource for PlaylistTriage {
    fn kind(&self) -> &'static str {
        "playlist"
    }

    async fn fetch_remote(&self) -> Result<Vec<RemoteEntity>, RemoteError> {
        fetch_offset_pages_discovering(
            &self.remote,
            "get playlists",
            config::LIBRARY_PAGE_SIZE,
            |remote, offset, limit| async move {
                remote.client().current_user_playlists(offset, limit).await
            },
        )
        .await
    }

    async fn load_triaged(&self) -> Result<Vec<TriageRecord>, PreferenceError> {
        self.store.load_collections().await
    }

    async fn save_triaged(&self, records: &[TriageRecord]) -> Result<(), PreferenceError> {
        self.store.save_collections(records).await
    }

    fn is_candidate(&self, entity: &RemoteEntity) -> bool {
        entity.id != self.target
    }
}

/// Tracks of every included playlist plus, unless disabled, all liked songs.
pub struct PlaylistSource {
    remote: Remote,
    triage: PlaylistTriage,
    prompt: Arc<dyn Prompt>,
    include_playlists: bool,
    include_liked: bool,
}

impl PlaylistSource {
    pub fn new(
        remote: Remote,
        store: Arc<dyn PreferenceStore>,
        prompt: Arc<dyn Prompt>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            triage: PlaylistTriage::new(remote.clone(), store, target),
            remote,
            prompt,
            include_playlists: true,
            include_liked: true,
        }
    }

    pub fn with_playlists(mut self, include: bool) -> Self {
        self.include_playlists = include;
        self
    }

    pub fn with_liked_songs(mut self, include: bool) -> Self {
        self.include_liked = include;
        self
    }

    async fn liked_songs(&self) -> Result<Vec<ItemRef>, RemoteError> {
        fetch_offset_pages_discovering(
            &self.remote,
            "get liked songs",
            config::LIBRARY_PAGE_SIZE,
            |remote, offset, limit| async move {
                remote.client().saved_tracks(offset, limit).await
            },
        )
        .await
    }
}

#[async_trait]
impl ItemSource for PlaylistSource {
    fn name(&self) -> &str {
        "playlists"
    }

    async fn collect(&self) -> Result<Vec<ItemRef>, SourceError> {
        let mut items = Vec::new();

        if self.include_playlists {
            for playlist in triage(&self.triage, self.prompt.as_ref()).await? {
                match fetch_playlist_items(&self.remote, &playlist.id).await {
                    Ok(tracks) => {
                        success!("Added {} tracks from playlist: {}", tracks.len(), playlist.name);
                        items.extend(tracks);
                    }
                    Err(e) => warning!("Skipping playlist {}: {}", playlist.name, e),
                }
            }
        }

        if self.include_liked {
            let liked = self.liked_songs().await?;
            success!("Added {} tracks from liked songs.", liked.len());
            items.extend(liked);
        }

        Ok(items)
    }
}
