use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;

use crate::{
    config,
    engine::retry::parse_retry_after,
    error::RemoteError,
    types::{
        AlbumRef, AlbumSimplified, FollowedArtistsResponse, ItemRef, Page, Paging,
        PlaylistItemsRequest, PlaylistResponse, PlaylistSimplified, PlaylistTrack, RemoteEntity,
        SavedAlbum, SavedTrack, SeveralTracksResponse, SnapshotResponse, TrackDetail,
        TrackObject, TrackSimplified,
    },
};

use super::Catalog;

/// Spotify Web API client bound to one access token.
///
/// The token is refreshed before the client is built and never changes
/// while a run is in progress.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    base_url: String,
    token: String,
}

impl SpotifyClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, config::spotify_apiurl())
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = request.bearer_auth(&self.token).send().await?;
        check_status(operation, response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, RemoteError> {
        let response = self.send(operation, request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| RemoteError::Decode {
            operation: operation.to_string(),
            source,
        })
    }

    async fn write_items(
        &self,
        operation: &str,
        request: RequestBuilder,
        items: &[ItemRef],
    ) -> Result<(), RemoteError> {
        let body = PlaylistItemsRequest {
            uris: items.iter().map(ItemRef::uri).collect(),
        };
        let _: SnapshotResponse = self.get_json(operation, request.json(&body)).await?;
        Ok(())
    }
}

/// Maps a response onto the engine's error vocabulary.
///
/// 429 becomes [`RemoteError::RateLimited`] with the `Retry-After` delay so
/// the retry executor can wait it out.
async fn check_status(operation: &str, response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        return Err(RemoteError::RateLimited {
            retry_after: parse_retry_after(retry_after),
        });
    }

    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(RemoteError::Unauthorized(format!(
            "{} was rejected, run shufflecli auth ({})",
            operation, message
        )));
    }

    Err(RemoteError::Status {
        operation: operation.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// Keeps tracks and episodes that can be added to a playlist.
fn playable(track: TrackObject) -> Option<ItemRef> {
    if track.is_local || track.uri.is_empty() {
        return None;
    }
    Some(ItemRef::new(track.uri))
}

fn album_ref(album: AlbumSimplified) -> AlbumRef {
    AlbumRef {
        artist: album.artists.into_iter().next().map(|a| a.name),
        id: album.id,
        name: album.name,
    }
}

fn track_ref(track: TrackSimplified) -> Option<ItemRef> {
    match track.id {
        Some(id) if track.uri.is_empty() => Some(ItemRef::from_track_id(&id)),
        Some(_) => Some(ItemRef::new(track.uri)),
        None => None,
    }
}

fn offset_query(offset: u32, limit: u32) -> [(&'static str, String); 2] {
    [("offset", offset.to_string()), ("limit", limit.to_string())]
}

#[async_trait]
impl Catalog for SpotifyClient {
    async fn playlist_total(&self, playlist_id: &str) -> Result<u32, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/playlists/{}", playlist_id)))
            .query(&[("fields", "id,name,tracks.total")]);
        let playlist: PlaylistResponse = self.get_json("get playlist", request).await?;
        Ok(playlist.tracks.total)
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ItemRef>, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/playlists/{}/tracks", playlist_id)))
            .query(&offset_query(offset, limit))
            .query(&[("fields", "items(track(uri,is_local)),total,next")]);
        let paging: Paging<PlaylistTrack> = self.get_json("get playlist items", request).await?;
        Ok(Page::new(
            paging
                .items
                .into_iter()
                .filter_map(|item| item.track.and_then(playable))
                .collect(),
            paging.total,
            paging.next,
        ))
    }

    async fn current_user_playlists(
        &self,
        offset: u32,
        limit: u32,
    ) -> Result<Page<RemoteEntity>, RemoteError> {
        let request = self
            .http
            .get(self.url("/me/playlists"))
            .query(&offset_query(offset, limit));
        let paging: Paging<PlaylistSimplified> = self.get_json("get playlists", request).await?;
        Ok(Page::new(paging.items, paging.total, paging.next).map(|p| RemoteEntity {
            id: p.id,
            name: p.name,
            track_total: p.tracks.map(|t| t.total),
        }))
    }

    async fn saved_tracks(&self, offset: u32, limit: u32) -> Result<Page<ItemRef>, RemoteError> {
        let request = self
            .http
            .get(self.url("/me/tracks"))
            .query(&offset_query(offset, limit));
        let paging: Paging<SavedTrack> = self.get_json("get liked songs", request).await?;
        Ok(Page::new(
            paging
                .items
                .into_iter()
                .filter_map(|saved| playable(saved.track))
                .collect(),
            paging.total,
            paging.next,
        ))
    }

    async fn saved_albums(&self, offset: u32, limit: u32) -> Result<Page<AlbumRef>, RemoteError> {
        let request = self
            .http
            .get(self.url("/me/albums"))
            .query(&offset_query(offset, limit));
        let paging: Paging<SavedAlbum> = self.get_json("get saved albums", request).await?;
        Ok(Page::new(paging.items, paging.total, paging.next).map(|saved| album_ref(saved.album)))
    }

    async fn followed_artists(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<RemoteEntity>, RemoteError> {
        let request = match cursor {
            Some(next) => self.http.get(next),
            None => self
                .http
                .get(self.url("/me/following"))
                .query(&[("type", "artist".to_string()), ("limit", limit.to_string())]),
        };
        let res: FollowedArtistsResponse = self.get_json("get followed artists", request).await?;
        let artists = res.artists;
        Ok(Page::new(artists.items, artists.total, artists.next).map(|a| RemoteEntity {
            id: a.id,
            name: a.name,
            track_total: None,
        }))
    }

    async fn artist_albums(
        &self,
        artist_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<AlbumRef>, RemoteError> {
        let request = match cursor {
            Some(next) => self.http.get(next),
            None => self
                .http
                .get(self.url(&format!("/artists/{}/albums", artist_id)))
                .query(&[
                    ("include_groups", "album,single".to_string()),
                    ("limit", limit.to_string()),
                ]),
        };
        let paging: Paging<AlbumSimplified> = self.get_json("get artist albums", request).await?;
        Ok(Page::new(paging.items, paging.total, paging.next).map(album_ref))
    }

    async fn album_tracks(
        &self,
        album_id: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<ItemRef>, RemoteError> {
        let request = self
            .http
            .get(self.url(&format!("/albums/{}/tracks", album_id)))
            .query(&offset_query(offset, limit));
        let paging: Paging<TrackSimplified> = self.get_json("get album tracks", request).await?;
        Ok(Page::new(
            paging.items.into_iter().filter_map(track_ref).collect(),
            paging.total,
            paging.next,
        ))
    }

    async fn tracks(&self, items: &[ItemRef]) -> Result<Vec<TrackDetail>, RemoteError> {
        let ids = items.iter().map(ItemRef::id).collect::<Vec<_>>().join(",");
        let request = self.http.get(self.url("/tracks")).query(&[("ids", ids)]);
        let res: SeveralTracksResponse = self.get_json("get several tracks", request).await?;
        Ok(res
            .tracks
            .into_iter()
            .flatten()
            .filter(|t| t.id.is_some())
            .map(|t| TrackDetail {
                item: ItemRef::new(t.uri),
                popularity: t.popularity,
            })
            .collect())
    }

    async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        items: &[ItemRef],
    ) -> Result<(), RemoteError> {
        let request = self
            .http
            .put(self.url(&format!("/playlists/{}/tracks", playlist_id)));
        self.write_items("replace playlist items", request, items).await
    }

    async fn add_playlist_items(
        &self,
        playlist_id: &str,
        items: &[ItemRef],
    ) -> Result<(), RemoteError> {
        let request = self
            .http
            .post(self.url(&format!("/playlists/{}/tracks", playlist_id)));
        self.write_items("add playlist items", request, items).await
    }

    async fn upload_playlist_cover(
        &self,
        playlist_id: &str,
        jpeg_base64: &str,
    ) -> Result<(), RemoteError> {
        let request = self
            .http
            .put(self.url(&format!("/playlists/{}/images", playlist_id)))
            .header(header::CONTENT_TYPE, "image/jpeg")
            .body(jpeg_base64.to_string());
        self.send("upload playlist cover", request).await?;
        Ok(())
    }
}
