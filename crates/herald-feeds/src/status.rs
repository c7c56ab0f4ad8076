//! Game-server status page scraper.
//!
//! The page lists the server details as label/value pairs, either as table
//! rows (`<tr><th>Mission</th><td>…</td></tr>`) or as a definition list
//! (`<dt>Mission</dt><dd>…</dd>`). Labels are matched case-insensitively.

use async_trait::async_trait;
use herald_core::error::{HeraldError, Result};
use herald_core::traits::StatusSource;
use herald_core::types::{NO_MISSION, ServerStatus};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

pub struct StatusPage {
    client: reqwest::Client,
}

impl StatusPage {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: crate::http_client(timeout)?,
        })
    }

    /// Extract the server status from a page. `Ok(None)` when the page has no mission row.
    pub fn parse(html: &str) -> Result<Option<ServerStatus>> {
        let document = Html::parse_document(html);
        let pairs = labeled_values(&document)?;

        let mut mission = None;
        let mut status = ServerStatus::no_mission();
        for (label, value) in pairs {
            match label.as_str() {
                "mission" | "mission name" => mission = Some(value),
                "description" | "mission description" => status.description = value,
                "players" | "player count" => match ServerStatus::parse_players(&value) {
                    Some((current, max)) => {
                        status.player_count = current;
                        status.max_players = max;
                    }
                    None => tracing::warn!("Unreadable player count '{value}'"),
                },
                "island" | "map" | "terrain" | "world" => status.island = value,
                "author" | "mission author" => status.author = value,
                _ => {}
            }
        }

        Ok(mission.map(|name| {
            status.mission_name = if name.is_empty() { NO_MISSION.to_string() } else { name };
            status
        }))
    }
}

#[async_trait]
impl StatusSource for StatusPage {
    async fn fetch_server_status(&self, url: &str) -> Result<Option<ServerStatus>> {
        let body = crate::fetch_body(&self.client, url).await?;
        Self::parse(&body)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HeraldError::scrape(format!("Bad selector '{css}': {e:?}")))
}

/// Collect (label, value) pairs from table rows and definition lists, in page order per kind.
fn labeled_values(document: &Html) -> Result<Vec<(String, String)>> {
    let rows = selector("tr")?;
    let cells = selector("th, td")?;
    let lists = selector("dl")?;

    let mut pairs = Vec::new();
    for row in document.select(&rows) {
        let texts: Vec<String> = row.select(&cells).map(text_of).collect();
        if let [label, value, ..] = texts.as_slice() {
            pairs.push((normalize_label(label), value.clone()));
        }
    }

    for list in document.select(&lists) {
        let mut pending: Option<String> = None;
        for child in list.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "dt" => pending = Some(normalize_label(&text_of(child))),
                "dd" => {
                    if let Some(label) = pending.take() {
                        pairs.push((label, text_of(child)));
                    }
                }
                _ => {}
            }
        }
    }
    Ok(pairs)
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_label(raw: &str) -> String {
    raw.trim().trim_end_matches(':').trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TABLE_PAGE: &str = r#"
<html><body>
  <h1>UO Public Server</h1>
  <table class="server">
    <tr><th>Mission:</th><td>  Operation   Bravo </td></tr>
    <tr><th>Description</th><td>Clear the <b>airfield</b></td></tr>
    <tr><th>Players</th><td>12/40</td></tr>
    <tr><th>Island</th><td>Altis</td></tr>
    <tr><th>Author</th><td>Kestrel</td></tr>
    <tr><td colspan="2">footer</td></tr>
  </table>
</body></html>"#;

    const LIST_PAGE: &str = r#"
<html><body>
  <dl>
    <dt>Mission</dt><dd>Alpha</dd>
    <dt>Players</dt><dd>20 / 64</dd>
    <dt>Map</dt><dd>Tanoa</dd>
  </dl>
</body></html>"#;

    #[test]
    fn test_parse_table_layout() {
        let status = StatusPage::parse(TABLE_PAGE).unwrap().unwrap();
        assert_eq!(status.mission_name, "Operation Bravo");
        assert_eq!(status.description, "Clear the airfield");
        assert_eq!(status.player_count, 12);
        assert_eq!(status.max_players, 40);
        assert_eq!(status.island, "Altis");
        assert_eq!(status.author, "Kestrel");
    }

    #[test]
    fn test_parse_definition_list_layout() {
        let status = StatusPage::parse(LIST_PAGE).unwrap().unwrap();
        assert_eq!(status.mission_name, "Alpha");
        assert_eq!(status.player_count, 20);
        assert_eq!(status.max_players, 64);
        assert_eq!(status.island, "Tanoa");
        assert!(status.author.is_empty());
    }

    #[test]
    fn test_parse_no_mission_row() {
        let html = "<html><body><p>Server offline</p></body></html>";
        assert_eq!(StatusPage::parse(html).unwrap(), None);
    }

    #[test]
    fn test_parse_none_mission_is_sentinel() {
        let html = "<table><tr><th>Mission</th><td>None</td></tr><tr><th>Players</th><td>0/40</td></tr></table>";
        let status = StatusPage::parse(html).unwrap().unwrap();
        assert!(status.is_no_mission());

        let empty = "<table><tr><th>Mission</th><td></td></tr></table>";
        assert!(StatusPage::parse(empty).unwrap().unwrap().is_no_mission());
    }

    #[test]
    fn test_unreadable_players_default_to_zero() {
        let html = "<table><tr><th>Mission</th><td>Alpha</td></tr><tr><th>Players</th><td>many</td></tr></table>";
        let status = StatusPage::parse(html).unwrap().unwrap();
        assert_eq!(status.player_count, 0);
    }

    #[tokio::test]
    async fn test_fetch_server_status_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TABLE_PAGE))
            .mount(&server)
            .await;

        let page = StatusPage::new(Duration::from_secs(5)).unwrap();
        let status = page.fetch_server_status(&server.uri()).await.unwrap().unwrap();
        assert_eq!(status.mission_name, "Operation Bravo");
    }

    #[tokio::test]
    async fn test_fetch_server_status_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let page = StatusPage::new(Duration::from_secs(5)).unwrap();
        assert!(page.fetch_server_status(&server.uri()).await.is_err());
    }
}
