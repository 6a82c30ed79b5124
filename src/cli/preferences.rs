use tabled::Table;

use crate::{
    error, info,
    management::{PreferenceManager, PreferenceStore},
    success,
    types::{TriageRecord, TriageTableRow},
};

/// Prints stored triage decisions. Without a filter both lists are shown.
pub async fn preferences(playlists: bool, artists: bool) {
    let manager = PreferenceManager::from_config();
    let prefs = match manager.load().await {
        Ok(prefs) => prefs,
        Err(e) => error!("Cannot load preferences. Err: {}", e),
    };

    let show_all = !playlists && !artists;
    if playlists || show_all {
        print_records("playlists", prefs.playlists);
    }
    if artists || show_all {
        print_records("artists", prefs.artists);
    }
}

/// Forgets the decisions for one or both lists so they are asked again.
pub async fn reset_preferences(playlists: bool, artists: bool) {
    if !playlists && !artists {
        error!("Nothing to reset, pass --playlists and/or --artists.");
    }

    let manager = PreferenceManager::from_config();
    if playlists {
        if let Err(e) = manager.save_collections(&[]).await {
            error!("Cannot reset playlist preferences. Err: {}", e);
        }
        success!("Playlist preferences reset.");
    }
    if artists {
        if let Err(e) = manager.save_creators(&[]).await {
            error!("Cannot reset artist preferences. Err: {}", e);
        }
        success!("Artist preferences reset.");
    }
}

fn print_records(label: &str, mut records: Vec<TriageRecord>) {
    if records.is_empty() {
        info!("No {} triaged yet.", label);
        return;
    }

    records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    let total = records.len();
    let included = records.iter().filter(|r| r.include_in_shuffle).count();

    let rows: Vec<TriageTableRow> = records
        .into_iter()
        .map(|r| TriageTableRow {
            name: r.name,
            id: r.id,
            shuffle: if r.include_in_shuffle { "yes" } else { "no" }.to_string(),
        })
        .collect();

    println!("{}", Table::new(rows));
    info!("{} of {} {} included in the shuffle.", included, total, label);
}
