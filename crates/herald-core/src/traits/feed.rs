//! Feed collaborator traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EventRecord, ServerStatus};

/// Source of calendar events.
#[async_trait]
pub trait EventFeed: Send + Sync {
    /// Pull the full current set of calendar entries.
    async fn fetch_events(&self) -> Result<Vec<EventRecord>>;
}

/// Source of live game-server status.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the status page at `url`. `Ok(None)` when the page shows no server data.
    async fn fetch_server_status(&self, url: &str) -> Result<Option<ServerStatus>>;
}
