//! # Herald Core
//! Shared error type, configuration, domain types and the collaborator traits
//! that the scheduling engine depends on.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
