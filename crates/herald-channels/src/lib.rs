//! # Herald Channels
//! Chat platform clients. Discord is the only platform the bot runs on.

pub mod discord;

pub use discord::{DiscordChannel, DiscordGatewayStream};
