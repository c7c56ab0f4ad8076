//! # Herald Agent
//! Reacts to what happens in the guild — prefix commands from members and
//! member joins — on top of the reminder engine and mission detector.

pub mod command;
pub mod dispatcher;

pub use command::Command;
pub use dispatcher::CommandDispatcher;
