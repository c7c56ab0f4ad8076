//! # Herald Feeds
//! Readers for the two external sources the bot watches:
//! - `calendar` — community event calendar published as RSS/Atom
//! - `status` — game-server status page, scraped from HTML

pub mod calendar;
pub mod status;

pub use calendar::CalendarFeed;
pub use status::StatusPage;

use herald_core::error::{HeraldError, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("Herald/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the feed readers; every request is bounded by `timeout`.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| HeraldError::Http(format!("HTTP client init failed: {e}")))
}

/// GET `url` and return the body, mapping timeouts and non-2xx statuses to errors.
pub(crate) async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            HeraldError::Timeout(format!("GET {url}"))
        } else {
            HeraldError::Http(format!("GET {url} failed: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HeraldError::Http(format!("GET {url} returned {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| HeraldError::Http(format!("Reading {url} failed: {e}")))
}
