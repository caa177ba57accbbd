use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PlayerConfig {
    /// Delay between `stop` and tearing the session down.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

impl PlayerConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

fn default_stop_grace_ms() -> u64 {
    5000
}
