//! Collaborator traits consumed by the scheduling engine and the command layer.

pub mod chat;
pub mod feed;

pub use chat::ChatClient;
pub use feed::{EventFeed, StatusSource};
