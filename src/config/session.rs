//! Session and token refresh configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Token refresh behaviour of the signed-in session
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How often the auto-refresh task checks token expiry, in seconds
    #[serde(default = "default_auto_refresh_tick")]
    pub auto_refresh_tick_secs: u64,

    /// Tokens expiring within this many seconds are refreshed
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,

    /// Persist the refresh token so the session survives restarts
    #[serde(default = "default_persist_session")]
    pub persist_session: bool,
}

impl SessionConfig {
    pub fn auto_refresh_tick(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_tick_secs)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.auto_refresh_tick_secs == 0 {
            return Err(ValidationError::InvalidRefreshInterval);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_refresh_tick_secs: default_auto_refresh_tick(),
            refresh_margin_secs: default_refresh_margin(),
            persist_session: default_persist_session(),
        }
    }
}

fn default_auto_refresh_tick() -> u64 {
    30
}

fn default_refresh_margin() -> u64 {
    60
}

fn default_persist_session() -> bool {
    true
}
