//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use herald_core::error::{HeraldError, Result};
use herald_core::traits::{ChatClient, EventFeed, StatusSource};
use herald_core::types::{ChannelInfo, EventRecord, OutgoingMessage, RoleInfo, SendResult, ServerStatus};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct MockChat {
    channels: Mutex<HashSet<String>>,
    roles: Mutex<HashMap<String, String>>,
    fail_when_contains: Mutex<Option<String>>,
    sent: tokio::sync::Mutex<Vec<(String, OutgoingMessage)>>,
}

impl MockChat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_channel(self: Arc<Self>, id: &str) -> Arc<Self> {
        self.channels.lock().unwrap().insert(id.to_string());
        self
    }

    pub fn with_role(self: Arc<Self>, name: &str, id: &str) -> Arc<Self> {
        self.roles.lock().unwrap().insert(name.to_string(), id.to_string());
        self
    }

    /// Reject any send whose content contains `needle`.
    pub fn failing_on(self: Arc<Self>, needle: &str) -> Arc<Self> {
        *self.fail_when_contains.lock().unwrap() = Some(needle.to_string());
        self
    }

    pub async fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl ChatClient for MockChat {
    fn name(&self) -> &str { "mock" }

    async fn send_message(&self, channel_id: &str, message: OutgoingMessage) -> Result<SendResult> {
        let fail = self.fail_when_contains.lock().unwrap().clone();
        if let Some(needle) = fail {
            if message.content.contains(&needle) {
                return Err(HeraldError::channel("rejected by mock"));
            }
        }
        let mut sent = self.sent.lock().await;
        sent.push((channel_id.to_string(), message));
        Ok(SendResult { message_id: sent.len().to_string() })
    }

    async fn find_role(&self, name: &str) -> Result<Option<RoleInfo>> {
        Ok(self.roles.lock().unwrap().get(name).map(|id| RoleInfo {
            id: id.clone(),
            name: name.to_string(),
        }))
    }

    async fn find_channel(&self, id: &str) -> Result<Option<ChannelInfo>> {
        Ok(self.channels.lock().unwrap().contains(id).then(|| ChannelInfo {
            id: id.to_string(),
            name: None,
        }))
    }

    async fn add_member_role(&self, _user_id: &str, _role_id: &str) -> Result<()> {
        Ok(())
    }

    async fn remove_member_role(&self, _user_id: &str, _role_id: &str) -> Result<()> {
        Ok(())
    }

    async fn count_role_members(&self, _role_id: &str) -> Result<usize> {
        Ok(0)
    }
}

/// Status source that replays scripted results, then reports no data.
#[derive(Default)]
pub struct ScriptedStatus {
    script: Mutex<VecDeque<Result<Option<ServerStatus>>>>,
}

impl ScriptedStatus {
    pub fn new(script: Vec<Result<Option<ServerStatus>>>) -> Arc<Self> {
        Arc::new(Self { script: Mutex::new(script.into()) })
    }
}

#[async_trait]
impl StatusSource for ScriptedStatus {
    async fn fetch_server_status(&self, _url: &str) -> Result<Option<ServerStatus>> {
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Event feed that replays scripted pulls, then returns an empty set.
#[derive(Default)]
pub struct ScriptedFeed {
    pulls: Mutex<VecDeque<Result<Vec<EventRecord>>>>,
}

impl ScriptedFeed {
    pub fn new(pulls: Vec<Result<Vec<EventRecord>>>) -> Arc<Self> {
        Arc::new(Self { pulls: Mutex::new(pulls.into()) })
    }
}

#[async_trait]
impl EventFeed for ScriptedFeed {
    async fn fetch_events(&self) -> Result<Vec<EventRecord>> {
        self.pulls.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}
