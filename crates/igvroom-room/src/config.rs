//! Room configuration.

use std::time::Duration;

use igvroom_session::MAX_NAME_LEN;
use serde::{Deserialize, Serialize};

/// Configuration shared by every room a registry spawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Longest accepted display name, in UTF-16 code units.
    pub max_name_len: usize,

    /// Cursor entries older than this are stale: hidden from snapshots
    /// and purged by the reaper.
    pub cursor_ttl: Duration,

    /// How many cursor entries the reaper inspects per join.
    pub cursor_backlog_limit: usize,

    /// A room actor with no sessions stops after this long. The next
    /// connection spawns a fresh one, which reloads settings from the store.
    pub idle_timeout: Duration,

    /// Capacity of each room actor's command channel. Connection drivers
    /// wait when it is full.
    pub command_channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_name_len: MAX_NAME_LEN,
            cursor_ttl: Duration::from_secs(100),
            cursor_backlog_limit: 20,
            idle_timeout: Duration::from_secs(30),
            command_channel_size: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RoomConfig::default();
        assert_eq!(config.max_name_len, 64);
        assert_eq!(config.cursor_ttl, Duration::from_secs(100));
        assert_eq!(config.cursor_backlog_limit, 20);
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
    }
}
