//! Mission change detector.
//!
//! Scrapes the game-server status page and announces a mission once, when it
//! first shows up with enough players. The last announced status is retained
//! in memory; the "no mission" placeholder never replaces it.

use herald_core::traits::StatusSource;
use herald_core::types::ServerStatus;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::notify::{Notifier, NotifyRouter, Topic};
use crate::templates;

/// Outcome of one mission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionDecision {
    /// New mission with enough players; announced.
    Announce,
    /// Server reports no mission, or the page could not be read.
    NoMission,
    /// Same mission as the last announcement.
    Unchanged,
    /// New mission, but fewer players than the alert threshold.
    BelowThreshold,
}

/// Decide whether `fetched` warrants an announcement.
pub fn evaluate(retained: Option<&ServerStatus>, fetched: &ServerStatus, min_players: u32) -> MissionDecision {
    if fetched.is_no_mission() {
        return MissionDecision::NoMission;
    }
    if retained.is_some_and(|r| r.mission_name == fetched.mission_name) {
        return MissionDecision::Unchanged;
    }
    if fetched.player_count < min_players {
        return MissionDecision::BelowThreshold;
    }
    MissionDecision::Announce
}

pub struct MissionDetector {
    source: Arc<dyn StatusSource>,
    notifier: Notifier,
    router: NotifyRouter,
    min_players: u32,
    retained: Mutex<Option<ServerStatus>>,
}

impl MissionDetector {
    pub fn new(
        source: Arc<dyn StatusSource>,
        notifier: Notifier,
        router: NotifyRouter,
        min_players: u32,
    ) -> Self {
        Self {
            source,
            notifier,
            router,
            min_players,
            retained: Mutex::new(None),
        }
    }

    /// Start from a known status instead of an empty slate.
    pub fn with_retained(mut self, status: ServerStatus) -> Self {
        self.retained = Mutex::new(Some(status));
        self
    }

    pub fn min_players(&self) -> u32 {
        self.min_players
    }

    /// Last announced status, if any.
    pub async fn retained(&self) -> Option<ServerStatus> {
        self.retained.lock().await.clone()
    }

    /// Fetch the status page and announce a new mission if warranted.
    pub async fn check_mission(&self, url: &str) -> MissionDecision {
        let fetched = match self.source.fetch_server_status(url).await {
            Ok(Some(status)) => status,
            Ok(None) => ServerStatus::no_mission(),
            Err(e) => {
                tracing::warn!("Status fetch from {url} failed: {e}");
                ServerStatus::no_mission()
            }
        };

        let decision = {
            let mut retained = self.retained.lock().await;
            let decision = evaluate(retained.as_ref(), &fetched, self.min_players);
            if decision == MissionDecision::Announce {
                *retained = Some(fetched.clone());
            }
            decision
        };

        match decision {
            MissionDecision::Announce => {
                let audience = self.router.resolve(Topic::Mission);
                let message = templates::mission_message(&fetched);
                match self.notifier.deliver(&audience, message).await {
                    Ok(_) => tracing::info!(
                        "New mission announced: {} ({} players)",
                        fetched.mission_name,
                        fetched.player_count
                    ),
                    Err(e) => tracing::error!(
                        "Mission announcement for '{}' dropped: {e}",
                        fetched.mission_name
                    ),
                }
            }
            MissionDecision::BelowThreshold => tracing::debug!(
                "Mission '{}' has {} players, waiting for {}",
                fetched.mission_name,
                fetched.player_count,
                self.min_players
            ),
            MissionDecision::Unchanged | MissionDecision::NoMission => {
                tracing::trace!("Mission check: {decision:?}")
            }
        }
        decision
    }
}
