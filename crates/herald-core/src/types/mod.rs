//! Domain types shared by the feeds, the scheduling engine and the chat client.

pub mod event;
pub mod message;
pub mod status;

pub use event::{EventGroup, EventKey, EventRecord};
pub use message::{
    Audience, ChannelInfo, Embed, EmbedField, GatewayEvent, IncomingMessage, OutgoingMessage,
    RoleInfo, SendResult,
};
pub use status::{NO_MISSION, ServerStatus};
