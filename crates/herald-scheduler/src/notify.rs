//! Notification routing and delivery.
//!
//! `NotifyRouter` is a pure lookup from a topic to an `Audience`.
//! `Notifier` turns an audience into a concrete send on the chat client,
//! resolving the role mention along the way.

use herald_core::config::HeraldConfig;
use herald_core::error::{HeraldError, Result};
use herald_core::traits::ChatClient;
use herald_core::types::{Audience, EventGroup, OutgoingMessage, SendResult};
use std::collections::HashMap;
use std::sync::Arc;

/// Logical audience of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Event(EventGroup),
    Mission,
}

impl Topic {
    /// "mission" selects the mission topic; anything else is an event group tag.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("mission") {
            Topic::Mission
        } else {
            Topic::Event(EventGroup::parse(tag))
        }
    }
}

/// Fixed topic → (channel, role) table.
#[derive(Debug, Clone)]
pub struct NotifyRouter {
    routes: HashMap<EventGroup, Audience>,
    mission: Audience,
    fallback: Audience,
}

impl NotifyRouter {
    pub fn new(fallback: Audience, mission: Audience) -> Self {
        Self {
            routes: HashMap::new(),
            mission,
            fallback,
        }
    }

    pub fn route(mut self, group: EventGroup, audience: Audience) -> Self {
        self.routes.insert(group, audience);
        self
    }

    /// Build the table from configuration. A group whose channel is unset
    /// posts to the main channel but keeps its role mention.
    pub fn from_config(config: &HeraldConfig) -> Self {
        let main = config.channels.main.clone();
        let channel_or_main = |id: &str| {
            if id.is_empty() { main.clone() } else { id.to_string() }
        };

        let mut router = Self::new(
            Audience::new(main.clone(), None),
            Audience::new(channel_or_main(config.mission_channel()), config.roles.mission.clone()),
        );
        for group in EventGroup::ALL {
            let channel = match group {
                EventGroup::Uoa3 | EventGroup::Uotc => channel_or_main(&config.channels.arma),
                EventGroup::Uoaf => channel_or_main(&config.channels.falcon),
                EventGroup::Other => continue,
            };
            let role = config.group_role(group).map(String::from);
            router = router.route(group, Audience::new(channel, role));
        }
        router
    }

    pub fn resolve(&self, topic: Topic) -> Audience {
        match topic {
            Topic::Mission => self.mission.clone(),
            Topic::Event(group) => self
                .routes
                .get(&group)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
        }
    }

    pub fn resolve_tag(&self, tag: &str) -> Audience {
        self.resolve(Topic::from_tag(tag))
    }
}

/// Sends messages to resolved audiences.
#[derive(Clone)]
pub struct Notifier {
    chat: Arc<dyn ChatClient>,
}

impl Notifier {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    pub fn chat(&self) -> &Arc<dyn ChatClient> {
        &self.chat
    }

    /// Deliver `message` to `audience`. A channel that no longer resolves is an
    /// error; a role that no longer resolves only drops the mention.
    pub async fn deliver(&self, audience: &Audience, message: OutgoingMessage) -> Result<SendResult> {
        if self.chat.find_channel(&audience.channel_id).await?.is_none() {
            return Err(HeraldError::not_found(format!(
                "channel {} does not resolve",
                audience.channel_id
            )));
        }

        let message = match &audience.role {
            None => message,
            Some(name) => match self.chat.find_role(name).await {
                Ok(Some(role)) => message.mentioning(&role.mention()),
                Ok(None) => {
                    tracing::warn!("Role '{name}' not found, sending without mention");
                    message
                }
                Err(e) => {
                    tracing::warn!("Role lookup for '{name}' failed: {e}, sending without mention");
                    message
                }
            },
        };

        self.chat.send_message(&audience.channel_id, message).await
    }
}
