use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{info, spotify, types::PkceToken};

/// Runs the PKCE authorization flow and caches the resulting token.
pub async fn auth() {
    let oauth_state: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));

    info!("Waiting for Spotify authorization (2 minutes)...");
    spotify::auth::auth(oauth_state).await;
    info!("Run `shufflecli shuffle` to rebuild the shuffle playlist.");
}
