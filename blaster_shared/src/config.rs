//! Configuration system.
//!
//! Loads game configuration from JSON strings or files. Gameplay constants
//! are not configurable here; every replica must agree on them.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration for a game host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlasterConfig {
    /// Fixed simulation step in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Seed for the world's random stream.
    #[serde(default)]
    pub seed: u64,
    /// Where highscores are persisted.
    #[serde(default = "default_highscores_path")]
    pub highscores_path: String,
    /// Longest accepted initials, in characters.
    #[serde(default = "default_max_initials_len")]
    pub max_initials_len: usize,
}

fn default_tick_ms() -> u64 {
    50
}

fn default_highscores_path() -> String {
    "highscores.json".to_string()
}

fn default_max_initials_len() -> usize {
    3
}

impl Default for BlasterConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            seed: 0,
            highscores_path: default_highscores_path(),
            max_initials_len: default_max_initials_len(),
        }
    }
}

impl BlasterConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Step length as a `Duration`.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_ms.max(1))
    }
}
