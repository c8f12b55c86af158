//! Room configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings shared by every room a [`RoomStore`](crate::RoomStore) creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// How long a dropped player's seat is held before it is vacated.
    pub reconnect_grace: Duration,

    /// How long a room may sit with nobody seated, nobody in grace and
    /// nobody watching before the sweep removes it.
    pub idle_timeout: Duration,

    /// Display names are cut to this many characters.
    pub max_name_len: usize,

    /// Capacity of each room actor's command channel. A full channel makes
    /// senders wait.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            max_name_len: lcr_engine::DEFAULT_MAX_NAME_LEN,
            channel_size: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.reconnect_grace, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.max_name_len, 16);
        assert_eq!(config.channel_size, 64);
    }

    #[test]
    fn test_room_config_override_one_field() {
        let config = RoomConfig {
            reconnect_grace: Duration::from_millis(50),
            ..RoomConfig::default()
        };
        assert_eq!(config.channel_size, 64);
        assert_eq!(config.reconnect_grace, Duration::from_millis(50));
    }
}
