//! Community calendar feed (RSS or Atom).
//!
//! Each feed entry is one scheduled event. The entry's publish date is the
//! event start; the group comes from the entry categories or a tag in the
//! title such as "[UOAF]".

use async_trait::async_trait;
use herald_core::error::{HeraldError, Result};
use herald_core::traits::EventFeed;
use herald_core::types::{EventGroup, EventRecord};
use std::time::Duration;

pub struct CalendarFeed {
    url: String,
    client: reqwest::Client,
}

impl CalendarFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: crate::http_client(timeout)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Parse a feed document into event records. Entries without a date are skipped.
    pub fn parse(document: &[u8]) -> Result<Vec<EventRecord>> {
        let feed = feed_rs::parser::parse(document)
            .map_err(|e| HeraldError::feed(format!("Invalid calendar feed: {e}")))?;

        let mut events = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            let title = entry
                .title
                .as_ref()
                .map(|t| t.content.trim().to_string())
                .unwrap_or_default();
            let Some(date) = entry.published.or(entry.updated) else {
                tracing::debug!("Skipping calendar entry without a date: '{title}'");
                continue;
            };

            let group = entry
                .categories
                .iter()
                .map(|c| EventGroup::parse(&c.term))
                .find(|g| *g != EventGroup::Other)
                .or_else(|| EventGroup::detect(&title))
                .unwrap_or(EventGroup::Other);

            let mut event = EventRecord::new(title, date, group);
            event.link = entry.links.first().map(|l| l.href.clone());
            events.push(event);
        }
        Ok(events)
    }
}

#[async_trait]
impl EventFeed for CalendarFeed {
    async fn fetch_events(&self) -> Result<Vec<EventRecord>> {
        let body = crate::fetch_body(&self.client, &self.url).await?;
        let events = Self::parse(body.as_bytes())?;
        tracing::debug!("Calendar feed returned {} events", events.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Community Calendar</title>
    <link>https://forum.example/calendar</link>
    <description>Upcoming events</description>
    <item>
      <title>Sunday Ops</title>
      <link>https://forum.example/calendar/event/1</link>
      <category>UOA3</category>
      <pubDate>Sun, 01 Mar 2026 20:00:00 +0000</pubDate>
      <guid>event-1</guid>
    </item>
    <item>
      <title>[UOAF] Red Flag</title>
      <link>https://forum.example/calendar/event/2</link>
      <pubDate>Tue, 03 Mar 2026 19:30:00 +0000</pubDate>
      <guid>event-2</guid>
    </item>
    <item>
      <title>  Town Hall  </title>
      <category>Community</category>
      <pubDate>Wed, 04 Mar 2026 18:00:00 +0000</pubDate>
      <guid isPermaLink="false">event-3</guid>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_rss_entries() {
        let events = CalendarFeed::parse(FEED.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].title, "Sunday Ops");
        assert_eq!(events[0].group, EventGroup::Uoa3);
        assert_eq!(events[0].date, Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap());
        assert_eq!(events[0].link.as_deref(), Some("https://forum.example/calendar/event/1"));

        assert_eq!(events[1].group, EventGroup::Uoaf);

        assert_eq!(events[2].title, "Town Hall");
        assert_eq!(events[2].group, EventGroup::Other);
        assert!(events[2].link.is_none());
        assert!(events.iter().all(|e| e.reminders_sent.is_empty()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = CalendarFeed::parse(b"this is not a feed").unwrap_err();
        assert!(matches!(err, HeraldError::Feed(_)));
    }

    #[tokio::test]
    async fn test_fetch_events_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let feed = CalendarFeed::new(format!("{}/calendar.xml", server.uri()), Duration::from_secs(5)).unwrap();
        let events = feed.fetch_events().await.unwrap();
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_events_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let feed = CalendarFeed::new(format!("{}/calendar.xml", server.uri()), Duration::from_secs(5)).unwrap();
        let err = feed.fetch_events().await.unwrap_err();
        assert!(matches!(err, HeraldError::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_events_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let feed = CalendarFeed::new(server.uri(), Duration::from_millis(200)).unwrap();
        let err = feed.fetch_events().await.unwrap_err();
        assert!(matches!(err, HeraldError::Timeout(_)));
    }
}
