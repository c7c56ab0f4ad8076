//! Event reminder engine.
//!
//! Holds the current calendar entries and, on every check, posts a reminder
//! for each entry whose humanized lead time equals a configured label. Each
//! (entry, label) pair fires at most once: the claim is recorded before the
//! send is attempted and is never cleared, so a failed send is not retried.
//! Claims are kept per (title, date) in a ledger that outlives feed pulls, and
//! are only forgotten once the event has started.

use chrono::{DateTime, Utc};
use herald_core::error::Result;
use herald_core::traits::EventFeed;
use herald_core::types::{EventKey, EventRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::humanize::{humanize, is_label, normalize_label};
use crate::notify::{Notifier, NotifyRouter, Topic};
use crate::templates;

/// A reminder that has been claimed and must now be delivered.
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub event: EventRecord,
    pub label: String,
}

/// Mark and return every reminder due at `now`. `labels` must be normalized.
pub fn collect_due(events: &mut [EventRecord], now: DateTime<Utc>, labels: &[String]) -> Vec<DueReminder> {
    let mut due = Vec::new();
    for event in events.iter_mut() {
        if !event.is_upcoming(now) {
            continue;
        }
        let label = humanize(event.date - now);
        if !labels.contains(&label) || event.reminder_sent(&label) {
            continue;
        }
        event.mark_reminder_sent(&label);
        due.push(DueReminder {
            event: event.clone(),
            label,
        });
    }
    due
}

/// Claimed reminder labels by entry identity, independent of pull cycles.
#[derive(Debug, Default)]
pub struct SentLedger {
    sent: HashMap<EventKey, HashSet<String>>,
}

impl SentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, key: EventKey, label: &str) {
        self.sent.entry(key).or_default().insert(label.to_string());
    }

    /// Take over every flag already set on `events`.
    pub fn absorb(&mut self, events: &[EventRecord]) {
        for event in events {
            for (label, fired) in &event.reminders_sent {
                if *fired {
                    self.mark(event.key(), label);
                }
            }
        }
    }

    /// Set the recorded flags on entries of `fresh` with the same title and date.
    pub fn apply(&self, fresh: &mut [EventRecord]) {
        for event in fresh {
            if let Some(labels) = self.sent.get(&event.key()) {
                for label in labels {
                    event.mark_reminder_sent(label);
                }
            }
        }
    }

    /// Forget entries that have started; they can never be due again.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        self.sent.retain(|key, _| key.date > now);
    }

    pub fn len(&self) -> usize {
        self.sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty()
    }
}

#[derive(Default)]
struct State {
    events: Vec<EventRecord>,
    ledger: SentLedger,
}

pub struct ReminderEngine {
    feed: Arc<dyn EventFeed>,
    notifier: Notifier,
    router: NotifyRouter,
    labels: Vec<String>,
    state: Mutex<State>,
}

impl ReminderEngine {
    /// Labels are normalized ("1 Hour" matches "1 hour"); a label the
    /// humanizer can never produce is logged and kept.
    pub fn new(
        feed: Arc<dyn EventFeed>,
        notifier: Notifier,
        router: NotifyRouter,
        labels: Vec<String>,
    ) -> Self {
        let labels: Vec<String> = labels
            .iter()
            .map(|l| normalize_label(l))
            .filter(|l| !l.is_empty())
            .collect();
        for label in labels.iter().filter(|l| !is_label(l)) {
            tracing::warn!("Reminder label '{label}' can never match a lead time");
        }
        Self {
            feed,
            notifier,
            router,
            labels,
            state: Mutex::new(State::default()),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Pull the calendar feed and replace the working set. On failure the
    /// previous set is kept.
    pub async fn refresh(&self) -> Result<usize> {
        let fresh = self.feed.fetch_events().await?;
        Ok(self.replace_events(fresh).await)
    }

    /// Replace the working set. Flags recorded for any earlier pull are
    /// restored on matching entries.
    pub async fn replace_events(&self, mut fresh: Vec<EventRecord>) -> usize {
        let mut state = self.state.lock().await;
        let State { events, ledger } = &mut *state;
        ledger.absorb(events);
        ledger.apply(&mut fresh);
        *events = fresh;
        let count = events.len();
        tracing::debug!("Calendar refreshed: {count} events");
        count
    }

    /// Send every reminder due at `now`. Returns how many were delivered.
    pub async fn check_reminders(&self, now: DateTime<Utc>) -> usize {
        let due = {
            let mut state = self.state.lock().await;
            let State { events, ledger } = &mut *state;
            let due = collect_due(events, now, &self.labels);
            for reminder in &due {
                ledger.mark(reminder.event.key(), &reminder.label);
            }
            ledger.prune(now);
            due
        };

        let mut delivered = 0;
        for reminder in due {
            let audience = self.router.resolve(Topic::Event(reminder.event.group));
            let message = templates::reminder_message(&reminder.event, &reminder.label);
            match self.notifier.deliver(&audience, message).await {
                Ok(_) => {
                    delivered += 1;
                    tracing::info!(
                        "Reminder sent: '{}' in {} → {}",
                        reminder.event.title,
                        reminder.label,
                        audience.channel_id
                    );
                }
                Err(e) => tracing::error!(
                    "Reminder for '{}' ({}) dropped: {e}",
                    reminder.event.title,
                    reminder.label
                ),
            }
        }
        delivered
    }

    /// Upcoming events ordered by date.
    pub async fn upcoming(&self, now: DateTime<Utc>, limit: usize) -> Vec<EventRecord> {
        let state = self.state.lock().await;
        let mut upcoming: Vec<EventRecord> =
            state.events.iter().filter(|e| e.is_upcoming(now)).cloned().collect();
        upcoming.sort_by_key(|e| e.date);
        upcoming.truncate(limit);
        upcoming
    }

    pub async fn events(&self) -> Vec<EventRecord> {
        self.state.lock().await.events.clone()
    }

    /// Number of entries with at least one claimed reminder.
    pub async fn claimed(&self) -> usize {
        self.state.lock().await.ledger.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChat, ScriptedFeed};
    use chrono::{Duration, TimeZone};
    use herald_core::config::HeraldConfig;
    use herald_core::error::HeraldError;
    use herald_core::types::EventGroup;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0).unwrap()
    }

    fn labels() -> Vec<String> {
        vec!["1 day".into(), "1 hour".into()]
    }

    fn router() -> NotifyRouter {
        let mut config = HeraldConfig::default();
        config.channels.main = "main".into();
        config.channels.arma = "arma".into();
        config.channels.falcon = "falcon".into();
        NotifyRouter::from_config(&config)
    }

    fn chat() -> Arc<MockChat> {
        MockChat::new()
            .with_channel("main")
            .with_channel("arma")
            .with_channel("falcon")
            .with_role("ArmA Player", "1")
            .with_role("Falcon Player", "2")
    }

    fn engine(chat: Arc<MockChat>) -> ReminderEngine {
        ReminderEngine::new(ScriptedFeed::new(vec![]), Notifier::new(chat), router(), labels())
    }

    #[test]
    fn test_collect_due_marks_once() {
        let mut events = vec![EventRecord::new("Ops", now() + Duration::hours(1), EventGroup::Uoa3)];

        let due = collect_due(&mut events, now(), &labels());
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].label, "1 hour");
        assert!(events[0].reminder_sent("1 hour"));

        let again = collect_due(&mut events, now() + Duration::seconds(1), &labels());
        assert!(again.is_empty());
    }

    #[test]
    fn test_collect_due_ignores_unconfigured_labels() {
        let mut events = vec![EventRecord::new("Ops", now() + Duration::hours(3), EventGroup::Uoa3)];
        assert!(collect_due(&mut events, now(), &labels()).is_empty());
        assert!(events[0].reminders_sent.is_empty());
    }

    #[test]
    fn test_collect_due_skips_past_events_without_marking() {
        // one hour in the past humanizes to "1 hour" but must not fire
        let mut events = vec![
            EventRecord::new("Done", now() - Duration::hours(1), EventGroup::Uoa3),
            EventRecord::new("Now", now(), EventGroup::Uoa3),
        ];
        assert!(collect_due(&mut events, now(), &labels()).is_empty());
        assert!(events.iter().all(|e| e.reminders_sent.is_empty()));
    }

    #[test]
    fn test_collect_due_fires_each_label_once() {
        let date = now() + Duration::days(1);
        let mut events = vec![EventRecord::new("Ops", date, EventGroup::Uoa3)];

        let mut fired = Vec::new();
        let mut t = now();
        while t < date {
            fired.extend(collect_due(&mut events, t, &labels()).into_iter().map(|d| d.label));
            t += Duration::minutes(1);
        }
        assert_eq!(fired, vec!["1 day".to_string(), "1 hour".to_string()]);
    }

    #[test]
    fn test_ledger_restores_by_identity() {
        let date = now() + Duration::hours(1);
        let mut old = EventRecord::new("Ops", date, EventGroup::Uoa3);
        old.mark_reminder_sent("1 day");

        let mut ledger = SentLedger::new();
        ledger.absorb(&[old, EventRecord::new("Ops", date + Duration::hours(1), EventGroup::Uoa3)]);
        assert_eq!(ledger.len(), 1);

        let mut fresh = vec![
            EventRecord::new("Ops", date, EventGroup::Uoa3),
            EventRecord::new("Ops", date + Duration::hours(1), EventGroup::Uoa3),
        ];
        ledger.apply(&mut fresh);
        assert!(fresh[0].reminder_sent("1 day"));
        assert!(fresh[1].reminders_sent.is_empty());

        ledger.prune(date);
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_entry_missing_from_one_pull_is_not_reminded_twice() {
        let chat = chat();
        let engine = engine(chat.clone());
        let ops = || EventRecord::new("Ops", now() + Duration::hours(1), EventGroup::Uoa3);

        engine.replace_events(vec![ops()]).await;
        assert_eq!(engine.check_reminders(now()).await, 1);

        // a truncated pull drops the entry, the next one brings it back
        engine.replace_events(vec![]).await;
        engine.replace_events(vec![ops()]).await;
        assert_eq!(engine.check_reminders(now() + Duration::minutes(1)).await, 0);
        assert_eq!(chat.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_claims_are_forgotten_after_the_event() {
        let engine = engine(chat());
        let date = now() + Duration::hours(1);
        engine.replace_events(vec![EventRecord::new("Ops", date, EventGroup::Uoa3)]).await;

        engine.check_reminders(now()).await;
        assert_eq!(engine.claimed().await, 1);

        engine.check_reminders(date + Duration::minutes(1)).await;
        assert_eq!(engine.claimed().await, 0);
    }

    #[tokio::test]
    async fn test_labels_are_normalized() {
        let chat = chat();
        let engine = ReminderEngine::new(
            ScriptedFeed::new(vec![]),
            Notifier::new(chat.clone()),
            router(),
            vec![" 1  Hour".into(), "".into(), "1 fortnight".into()],
        );
        assert_eq!(engine.labels(), ["1 hour".to_string(), "1 fortnight".to_string()]);

        engine
            .replace_events(vec![EventRecord::new("Ops", now() + Duration::hours(1), EventGroup::Uoa3)])
            .await;
        assert_eq!(engine.check_reminders(now()).await, 1);
    }

    #[tokio::test]
    async fn test_check_reminders_sends_to_group_audience_once() {
        let chat = chat();
        let engine = engine(chat.clone());
        engine
            .replace_events(vec![EventRecord::new("Sunday Ops", now() + Duration::hours(1), EventGroup::Uoa3)])
            .await;

        assert_eq!(engine.check_reminders(now()).await, 1);
        assert_eq!(engine.check_reminders(now() + Duration::seconds(1)).await, 0);

        let sent = chat.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "arma");
        assert_eq!(sent[0].1.content, "<@&1> **Sunday Ops** starts in 1 hour!");
        assert!(engine.events().await[0].reminder_sent("1 hour"));
    }

    #[tokio::test]
    async fn test_unknown_group_goes_to_main_without_mention() {
        let chat = chat();
        let engine = engine(chat.clone());
        engine
            .replace_events(vec![EventRecord::new("Town Hall", now() + Duration::days(1), EventGroup::Other)])
            .await;

        engine.check_reminders(now()).await;
        let sent = chat.sent().await;
        assert_eq!(sent[0].0, "main");
        assert_eq!(sent[0].1.content, "**Town Hall** starts in 1 day!");
    }

    #[tokio::test]
    async fn test_failed_send_is_isolated_and_not_retried() {
        let chat = chat().failing_on("Broken");
        let engine = engine(chat.clone());
        engine
            .replace_events(vec![
                EventRecord::new("Broken Op", now() + Duration::hours(1), EventGroup::Uoa3),
                EventRecord::new("Red Flag", now() + Duration::hours(1), EventGroup::Uoaf),
            ])
            .await;

        assert_eq!(engine.check_reminders(now()).await, 1);
        let sent = chat.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "falcon");

        // the failed reminder stays claimed
        assert_eq!(engine.check_reminders(now() + Duration::minutes(1)).await, 0);
        assert!(engine.events().await.iter().all(|e| e.reminder_sent("1 hour")));
    }

    #[tokio::test]
    async fn test_missing_channel_is_reported_not_fatal() {
        let chat = MockChat::new().with_channel("falcon");
        let engine = engine(chat.clone());
        engine
            .replace_events(vec![
                EventRecord::new("Ops", now() + Duration::hours(1), EventGroup::Uoa3),
                EventRecord::new("Red Flag", now() + Duration::hours(1), EventGroup::Uoaf),
            ])
            .await;

        assert_eq!(engine.check_reminders(now()).await, 1);
        assert_eq!(chat.sent().await[0].0, "falcon");
    }

    #[tokio::test]
    async fn test_refresh_keeps_flags_and_survives_feed_failure() {
        let date = now() + Duration::hours(1);
        let chat = chat();
        let feed = ScriptedFeed::new(vec![
            Ok(vec![EventRecord::new("Ops", date, EventGroup::Uoa3)]),
            Ok(vec![EventRecord::new("Ops", date, EventGroup::Uoa3)]),
            Err(HeraldError::feed("offline")),
        ]);
        let engine = ReminderEngine::new(feed, Notifier::new(chat.clone()), router(), labels());

        assert_eq!(engine.refresh().await.unwrap(), 1);
        assert_eq!(engine.check_reminders(now()).await, 1);

        // a fresh pull of the same entry must not re-arm the reminder
        assert_eq!(engine.refresh().await.unwrap(), 1);
        assert_eq!(engine.check_reminders(now() + Duration::minutes(1)).await, 0);

        assert!(engine.refresh().await.is_err());
        assert_eq!(engine.events().await.len(), 1);
        assert_eq!(chat.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_upcoming_sorted_and_limited() {
        let engine = engine(chat());
        engine
            .replace_events(vec![
                EventRecord::new("Later", now() + Duration::days(2), EventGroup::Uoa3),
                EventRecord::new("Past", now() - Duration::days(1), EventGroup::Uoa3),
                EventRecord::new("Soon", now() + Duration::hours(2), EventGroup::Uoaf),
                EventRecord::new("Last", now() + Duration::days(5), EventGroup::Uotc),
            ])
            .await;

        let upcoming = engine.upcoming(now(), 2).await;
        let titles: Vec<_> = upcoming.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Soon", "Later"]);
    }
}
