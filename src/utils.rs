use std::{collections::HashSet, path::Path, time::Duration};

use base64::{
    Engine,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::{
    Res,
    types::{ItemRef, TrackDetail},
};

/// Maximum cover size accepted by the playlist image endpoint.
const MAX_COVER_BYTES: usize = 256 * 1024;

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Extracts the playlist id from a bare id, a `spotify:playlist:<id>` URI or
/// an `https://open.spotify.com/playlist/<id>?si=...` link.
pub fn normalize_playlist_id(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(id) = raw.strip_prefix("spotify:playlist:") {
        return id.to_string();
    }

    const SEGMENT: &str = "/playlist/";
    if let Some(start) = raw.find(SEGMENT) {
        let rest = &raw[start + SEGMENT.len()..];
        return rest
            .split(['?', '/', '#'])
            .next()
            .unwrap_or(rest)
            .to_string();
    }

    raw.to_string()
}

/// Drops repeated refs, keeping the first occurrence.
pub fn dedup_preserving_order(items: Vec<ItemRef>) -> Vec<ItemRef> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// The `limit` most popular tracks, most popular first.
///
/// The sort is stable: tracks with equal popularity keep the order they
/// were discovered in.
pub fn top_by_popularity(mut details: Vec<TrackDetail>, limit: usize) -> Vec<ItemRef> {
    details.sort_by(|a, b| b.popularity.cmp(&a.popularity));
    details
        .into_iter()
        .take(limit)
        .map(|detail| detail.item)
        .collect()
}

/// Reads a JPEG and returns it base64 encoded, as the cover endpoint wants it.
///
/// # Errors
///
/// Fails if the file cannot be read or the encoded image exceeds 256 KB.
pub async fn encode_cover_image(path: &Path) -> Res<String> {
    let bytes = async_fs::read(path)
        .await
        .map_err(|e| format!("cannot read cover image {}: {}", path.display(), e))?;

    let encoded = STANDARD.encode(bytes);
    if encoded.len() > MAX_COVER_BYTES {
        return Err(format!(
            "cover image {} is {} KB encoded, at most 256 KB are accepted",
            path.display(),
            encoded.len() / 1024
        )
        .into());
    }
    Ok(encoded)
}

pub fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
