//! Session timing and fallback settings.

use std::time::Duration;

use tgmenu_core::{MenuError, Result};

/// Interval between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10;
/// How long a poll stays open.
pub const DEFAULT_POLL_WINDOW_SECS: u64 = 10;
/// Extra time after the poll window before the poll is removed.
pub const DEFAULT_POLL_GRACE_SECS: u64 = 1;
/// Delay between a poll answer and deletion of the poll message.
pub const DEFAULT_POLL_DELETE_DELAY_SECS: u64 = 1;
/// Sent when a picture callback returns something that is not an image.
pub const DEFAULT_PICTURE: &str = "resources/stats_default.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub sweep_interval: Duration,
    pub poll_window: Duration,
    pub poll_grace: Duration,
    pub poll_delete_delay: Duration,
    pub default_picture: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            poll_window: Duration::from_secs(DEFAULT_POLL_WINDOW_SECS),
            poll_grace: Duration::from_secs(DEFAULT_POLL_GRACE_SECS),
            poll_delete_delay: Duration::from_secs(DEFAULT_POLL_DELETE_DELAY_SECS),
            default_picture: DEFAULT_PICTURE.to_string(),
        }
    }
}

impl SessionConfig {
    /// Rejects zero intervals and an empty default picture.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(MenuError::Config("sweep interval must be positive".into()));
        }
        if self.poll_window.is_zero() {
            return Err(MenuError::Config("poll window must be positive".into()));
        }
        if self.default_picture.trim().is_empty() {
            return Err(MenuError::Config("default picture must be set".into()));
        }
        Ok(())
    }

    /// Time after which an unanswered poll is removed.
    pub fn poll_timeout(&self) -> Duration {
        self.poll_window + self.poll_grace
    }
}
