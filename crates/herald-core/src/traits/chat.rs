//! Chat platform client trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelInfo, OutgoingMessage, RoleInfo, SendResult};

/// Operations the engine and command layer need from the chat platform.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Platform name (e.g. "discord").
    fn name(&self) -> &str;

    /// Post a message to a channel.
    async fn send_message(&self, channel_id: &str, message: OutgoingMessage) -> Result<SendResult>;

    /// Look up a guild role by name. `Ok(None)` when no role has that name.
    async fn find_role(&self, name: &str) -> Result<Option<RoleInfo>>;

    /// Look up a channel by id. `Ok(None)` when the id no longer resolves.
    async fn find_channel(&self, id: &str) -> Result<Option<ChannelInfo>>;

    /// Grant a role to a guild member.
    async fn add_member_role(&self, user_id: &str, role_id: &str) -> Result<()>;

    /// Revoke a role from a guild member.
    async fn remove_member_role(&self, user_id: &str, role_id: &str) -> Result<()>;

    /// Number of guild members holding a role.
    async fn count_role_members(&self, role_id: &str) -> Result<usize>;
}
