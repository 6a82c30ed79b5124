use std::sync::Arc;

use chrono::Utc;
use tabled::Table;

use crate::{
    config,
    engine::{FetchOptions, Remote},
    error,
    management::{PreferenceManager, PreferenceStore, TokenManager},
    orchestrator::{Orchestrator, RunPhase, RunReport},
    prompt::{Prompt, StdinPrompt},
    reconcile::{ArtistSource, PlaylistSource, SavedAlbumSource},
    spotify::SpotifyClient,
    success,
    types::SourceTableRow,
    utils, warning,
};

/// Which sources a run uses and whether it writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShuffleSettings {
    pub skip_playlists: bool,
    pub skip_liked: bool,
    pub skip_artists: bool,
    pub skip_albums: bool,
    pub dry_run: bool,
}

pub async fn shuffle(settings: ShuffleSettings) {
    let target = match config::shuffle_playlist_id() {
        Ok(id) => id,
        Err(e) => error!("Cannot determine the shuffle playlist. Err: {}", e),
    };

    // the token is refreshed here, before any request runs concurrently
    let mut token_mgr = match TokenManager::load().await {
        Ok(t) => t,
        Err(e) => error!("No cached token, run `shufflecli auth` first. Err: {}", e),
    };
    let token = match token_mgr.get_valid_token().await {
        Ok(token) => token,
        Err(e) => error!("{}", e),
    };

    let remote = Remote::new(Arc::new(SpotifyClient::new(token))).with_fetch_options(FetchOptions {
        max_in_flight: config::max_in_flight(),
        on_page_failure: config::page_failure_policy(),
    });
    let store: Arc<dyn PreferenceStore> = Arc::new(PreferenceManager::from_config());
    let prompt: Arc<dyn Prompt> = Arc::new(StdinPrompt::new());

    let mut orchestrator =
        Orchestrator::new(remote.clone(), target.as_str()).with_dry_run(settings.dry_run);

    if !(settings.skip_playlists && settings.skip_liked) {
        orchestrator = orchestrator.with_source(Box::new(
            PlaylistSource::new(
                remote.clone(),
                Arc::clone(&store),
                Arc::clone(&prompt),
                target.as_str(),
            )
            .with_playlists(!settings.skip_playlists)
            .with_liked_songs(!settings.skip_liked),
        ));
    }
    if !settings.skip_artists {
        orchestrator = orchestrator.with_source(Box::new(ArtistSource::new(
            remote.clone(),
            Arc::clone(&store),
            Arc::clone(&prompt),
            target.as_str(),
        )));
    }
    if !settings.skip_albums {
        orchestrator = orchestrator.with_source(Box::new(SavedAlbumSource::new(remote.clone())));
    }

    if let Some(path) = config::cover_image_path() {
        match utils::encode_cover_image(&path).await {
            Ok(cover) => orchestrator = orchestrator.with_cover(Some(cover)),
            Err(e) => warning!("Skipping cover upload: {}", e),
        }
    }

    match orchestrator.run().await {
        Ok(report) => print_report(&report),
        Err(e) => error!("Shuffle run failed: {}\nRe-run `shufflecli shuffle` to rebuild the playlist.", e),
    }
}

fn print_report(report: &RunReport) {
    let rows: Vec<SourceTableRow> = report
        .sources
        .iter()
        .map(|s| SourceTableRow {
            source: s.name.clone(),
            tracks: s.contributed,
            new: s.added,
            status: match &s.error {
                Some(e) => format!("failed: {}", e),
                None => "ok".to_string(),
            },
        })
        .collect();

    if !rows.is_empty() {
        println!("{}", Table::new(rows));
    }

    let elapsed = Utc::now() - report.started_at;
    match report.phase {
        RunPhase::Shuffled => success!(
            "Dry run finished in {}s: {} tracks ({} already in the playlist).",
            elapsed.num_seconds(),
            report.aggregated,
            report.baseline
        ),
        RunPhase::Verified if report.is_consistent() => success!(
            "Shuffled {} tracks in {}s.",
            report.written,
            elapsed.num_seconds()
        ),
        _ => warning!(
            "Wrote {} tracks in {}s, but the playlist could not be confirmed to hold all of them.",
            report.written,
            elapsed.num_seconds()
        ),
    }

    let failed = report.failed_sources().count();
    if failed > 0 {
        warning!("{} source(s) failed; re-run to pick up their tracks.", failed);
    }
}
