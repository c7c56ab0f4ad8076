//! Chat message types exchanged with the chat platform.

use serde::{Deserialize, Serialize};

/// Incoming text message from a guild channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub message_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub author_name: Option<String>,
    pub content: String,
    /// Role ids held by the author in the guild (empty in direct messages).
    #[serde(default)]
    pub member_roles: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Outgoing message: plain content with an optional rich embed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingMessage {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

impl OutgoingMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embed: None,
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    /// Prefix the content with a mention, e.g. `<@&1234>`.
    pub fn mentioning(mut self, mention: &str) -> Self {
        self.content = if self.content.is_empty() {
            mention.to_string()
        } else {
            format!("{mention} {}", self.content)
        };
        self
    }
}

/// Rich content block attached to a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

impl Embed {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Result of a successful send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendResult {
    pub message_id: String,
}

/// Guild role as returned by a lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
}

impl RoleInfo {
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

/// Guild channel as returned by a lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Resolved destination of a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Audience {
    pub channel_id: String,
    /// Role name to mention; `None` sends without a mention.
    pub role: Option<String>,
}

impl Audience {
    pub fn new(channel_id: impl Into<String>, role: Option<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            role,
        }
    }
}

/// Event delivered by the chat platform's realtime connection.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Message(IncomingMessage),
    MemberJoined {
        guild_id: String,
        user_id: String,
        username: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mentioning_prefixes_content() {
        let msg = OutgoingMessage::text("Ops start in 1 hour").mentioning("<@&42>");
        assert_eq!(msg.content, "<@&42> Ops start in 1 hour");

        let empty = OutgoingMessage::text("").mentioning("<@&42>");
        assert_eq!(empty.content, "<@&42>");
    }

    #[test]
    fn test_role_mention() {
        let role = RoleInfo {
            id: "42".into(),
            name: "ArmA Player".into(),
        };
        assert_eq!(role.mention(), "<@&42>");
    }

    #[test]
    fn test_embed_skips_empty_fields_in_json() {
        let msg = OutgoingMessage::text("hi").with_embed(Embed::titled("Alpha"));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["embed"]["title"], "Alpha");
        assert!(json["embed"].get("fields").is_none());
        assert!(json["embed"].get("color").is_none());
    }

    #[test]
    fn test_embed_builder() {
        let embed = Embed::titled("Mission")
            .field("Island", "Altis", true)
            .field("Players", "12/40", true);
        assert_eq!(embed.fields.len(), 2);
        assert_eq!(embed.fields[0].name, "Island");
        assert!(embed.fields[1].inline);
    }
}
