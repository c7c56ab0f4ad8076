//! # Herald Scheduler
//!
//! Periodic tasks and the notification engine.
//!
//! ## Architecture
//! ```text
//! PeriodicScheduler (tokio interval, one loop per task)
//!   ├── "refresh-events"  → ReminderEngine::refresh      (calendar feed)
//!   ├── "check-reminders" → ReminderEngine::check_reminders(now)
//!   └── "check-mission"   → MissionDetector::check_mission(url)
//!                              └── on trigger → NotifyRouter → Notifier → ChatClient
//! ```
//!
//! Dedup state (reminder flags, last announced mission) lives in memory only
//! and resets when the process restarts.

pub mod engine;
pub mod humanize;
pub mod mission;
pub mod notify;
pub mod reminders;
pub mod templates;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{PeriodicScheduler, TaskHandle};
pub use mission::{MissionDecision, MissionDetector};
pub use notify::{NotifyRouter, Notifier, Topic};
pub use reminders::{DueReminder, ReminderEngine};
