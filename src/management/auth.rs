use std::path::PathBuf;

use chrono::Utc;

use crate::{Res, config, spotify, types::Token};

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_MARGIN_SECS: u64 = 240;

pub struct TokenManager {
    token: Token,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager { token }
    }

    pub async fn load() -> Res<Self> {
        let path = Self::token_path();
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let token: Token = serde_json::from_str(&content)?;
        Ok(Self { token })
    }

    pub async fn persist(&self) -> Res<()> {
        let path = Self::token_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.token)?;
        async_fs::write(&path, json).await?;
        Ok(())
    }

    /// Returns an access token that is valid for at least a few minutes.
    ///
    /// Refreshes and persists the token when it is about to expire. Called
    /// once before a run starts; nothing refreshes while requests are in
    /// flight.
    ///
    /// # Errors
    ///
    /// Fails when the token is expired and cannot be refreshed.
    pub async fn get_valid_token(&mut self) -> Res<String> {
        if self.is_expired() {
            self.token = spotify::auth::refresh_token(&self.token.refresh_token)
                .await
                .map_err(|e| format!("token refresh failed, run shufflecli auth: {}", e))?;
            self.persist().await?;
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + EXPIRY_MARGIN_SECS >= self.token.obtained_at + self.token.expires_in
    }

    fn token_path() -> PathBuf {
        config::data_dir().join("cache/token.json")
    }
}
