//! Live game-server status.

use serde::{Deserialize, Serialize};

/// Mission name the status page reports when nothing is loaded.
pub const NO_MISSION: &str = "None";

/// Snapshot of the game server as scraped from its status page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerStatus {
    pub mission_name: String,
    #[serde(default)]
    pub description: String,
    pub player_count: u32,
    #[serde(default)]
    pub max_players: u32,
    #[serde(default)]
    pub island: String,
    #[serde(default)]
    pub author: String,
}

impl ServerStatus {
    pub fn new(mission_name: impl Into<String>, player_count: u32) -> Self {
        Self {
            mission_name: mission_name.into(),
            description: String::new(),
            player_count,
            max_players: 0,
            island: String::new(),
            author: String::new(),
        }
    }

    /// Placeholder used when the status page is unreachable or empty.
    pub fn no_mission() -> Self {
        Self::new(NO_MISSION, 0)
    }

    pub fn is_no_mission(&self) -> bool {
        self.mission_name == NO_MISSION
    }

    /// Parse a "current/max" player string. A bare number is accepted with max 0.
    pub fn parse_players(raw: &str) -> Option<(u32, u32)> {
        let mut parts = raw.split('/');
        let current = parts.next()?.trim().parse().ok()?;
        let max = match parts.next() {
            Some(max) => max.trim().parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() {
            return None;
        }
        Some((current, max))
    }
}

impl Default for ServerStatus {
    fn default() -> Self {
        Self::no_mission()
    }
}
