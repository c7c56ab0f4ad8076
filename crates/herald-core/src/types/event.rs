//! Calendar event records pulled from the community calendar feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Community group an event belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventGroup {
    Uoa3,
    Uoaf,
    Uotc,
    Other,
}

impl EventGroup {
    pub const ALL: [EventGroup; 4] = [
        EventGroup::Uoa3,
        EventGroup::Uoaf,
        EventGroup::Uotc,
        EventGroup::Other,
    ];

    /// Parse a group tag. Anything unrecognised maps to `Other`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "UOA3" => EventGroup::Uoa3,
            "UOAF" => EventGroup::Uoaf,
            "UOTC" => EventGroup::Uotc,
            _ => EventGroup::Other,
        }
    }

    /// Find a group tag anywhere in free text, e.g. "[UOAF] Red Flag".
    pub fn detect(text: &str) -> Option<Self> {
        let upper = text.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .filter(|g| *g != EventGroup::Other)
            .find(|g| upper.contains(g.as_str()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventGroup::Uoa3 => "UOA3",
            EventGroup::Uoaf => "UOAF",
            EventGroup::Uotc => "UOTC",
            EventGroup::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for EventGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stable identity of a calendar entry across feed pulls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub title: String,
    pub date: DateTime<Utc>,
}

/// One calendar entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub date: DateTime<Utc>,
    pub group: EventGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Reminder labels already fired for this entry.
    #[serde(default)]
    pub reminders_sent: HashMap<String, bool>,
}

impl EventRecord {
    pub fn new(title: impl Into<String>, date: DateTime<Utc>, group: EventGroup) -> Self {
        Self {
            title: title.into(),
            date,
            group,
            link: None,
            reminders_sent: HashMap::new(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            title: self.title.clone(),
            date: self.date,
        }
    }

    /// Strictly after `now`; an event starting right now is already past.
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.date > now
    }

    pub fn reminder_sent(&self, label: &str) -> bool {
        self.reminders_sent.get(label).copied().unwrap_or(false)
    }

    pub fn mark_reminder_sent(&mut self, label: &str) {
        self.reminders_sent.insert(label.to_string(), true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_group_parse() {
        assert_eq!(EventGroup::parse("UOA3"), EventGroup::Uoa3);
        assert_eq!(EventGroup::parse(" uoaf "), EventGroup::Uoaf);
        assert_eq!(EventGroup::parse("UOTC"), EventGroup::Uotc);
        assert_eq!(EventGroup::parse("unknown-group"), EventGroup::Other);
        assert_eq!(EventGroup::parse(""), EventGroup::Other);
    }

    #[test]
    fn test_group_detect_in_title() {
        assert_eq!(EventGroup::detect("[UOAF] Red Flag"), Some(EventGroup::Uoaf));
        assert_eq!(EventGroup::detect("uoa3 sunday session"), Some(EventGroup::Uoa3));
        assert_eq!(EventGroup::detect("Community meeting"), None);
    }

    #[test]
    fn test_group_display() {
        assert_eq!(EventGroup::Uoa3.to_string(), "UOA3");
        assert_eq!(EventGroup::Other.to_string(), "OTHER");
    }

    #[test]
    fn test_reminder_flags() {
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let mut event = EventRecord::new("Sunday Ops", date, EventGroup::Uoa3);
        assert!(!event.reminder_sent("1 hour"));
        event.mark_reminder_sent("1 hour");
        assert!(event.reminder_sent("1 hour"));
        assert!(!event.reminder_sent("1 day"));
    }

    #[test]
    fn test_is_upcoming_is_strict() {
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let event = EventRecord::new("Sunday Ops", date, EventGroup::Uoa3);
        assert!(event.is_upcoming(date - Duration::seconds(1)));
        assert!(!event.is_upcoming(date));
        assert!(!event.is_upcoming(date + Duration::seconds(1)));
    }

    #[test]
    fn test_key_ignores_flags_and_link() {
        let date = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        let mut a = EventRecord::new("Sunday Ops", date, EventGroup::Uoa3);
        a.mark_reminder_sent("1 day");
        let b = EventRecord::new("Sunday Ops", date, EventGroup::Uoa3).with_link("https://x");
        assert_eq!(a.key(), b.key());
    }
}
