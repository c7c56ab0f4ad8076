//! Discord Bot channel — REST API + Gateway WebSocket.
//!
//! REST is used for sending messages and for role/channel lookups; the
//! Gateway delivers guild messages and member joins in real time.

use async_trait::async_trait;
use futures::stream::Stream;
use herald_core::config::DiscordConfig;
use herald_core::error::{HeraldError, Result};
use herald_core::traits::ChatClient;
use herald_core::types::{
    ChannelInfo, Embed, GatewayEvent, IncomingMessage, OutgoingMessage, RoleInfo, SendResult,
};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Discord Bot channel.
#[derive(Clone)]
pub struct DiscordChannel {
    config: DiscordConfig,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(config: DiscordConfig, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bot {}", config.bot_token))
            .map_err(|_| HeraldError::AuthFailed("Bot token contains invalid characters".into()))?;
        headers.insert("Authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("Herald/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| HeraldError::Http(format!("Discord client init failed: {e}")))?;

        Ok(Self { config, client })
    }

    fn api(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }

    fn guild_id(&self) -> Result<&str> {
        if self.config.guild_id.is_empty() {
            return Err(HeraldError::config("discord.guild_id is not set"));
        }
        Ok(&self.config.guild_id)
    }

    /// Map a failed HTTP response to an error.
    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => HeraldError::RateLimited(format!("{what}: {text}")),
            StatusCode::UNAUTHORIZED => HeraldError::AuthFailed(format!("{what}: {text}")),
            StatusCode::FORBIDDEN => HeraldError::PermissionDenied(format!("{what}: {text}")),
            StatusCode::NOT_FOUND => HeraldError::NotFound(format!("{what}: {text}")),
            _ => HeraldError::Channel(format!("{what} → Discord {status}: {text}")),
        })
    }

    fn transport(what: &str) -> impl FnOnce(reqwest::Error) -> HeraldError + '_ {
        move |e| {
            if e.is_timeout() {
                HeraldError::Timeout(format!("Discord {what}"))
            } else {
                HeraldError::Channel(format!("Discord {what} failed: {e}"))
            }
        }
    }

    /// Send a message to a channel.
    pub async fn post_message(&self, channel_id: &str, message: &OutgoingMessage) -> Result<SendResult> {
        let mut body = serde_json::json!({ "content": message.content });
        if let Some(embed) = &message.embed {
            body["embeds"] = serde_json::json!([discord_embed(embed)]);
        }

        let response = self.client
            .post(self.api(&format!("/channels/{channel_id}/messages")))
            .json(&body)
            .send().await
            .map_err(Self::transport("send"))?;
        let response = Self::check(response, "send message").await?;

        let sent: DiscordMessage = response.json().await
            .map_err(|e| HeraldError::Channel(format!("Invalid send response: {e}")))?;
        Ok(SendResult { message_id: sent.id })
    }

    /// Delete a message.
    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let response = self.client
            .delete(self.api(&format!("/channels/{channel_id}/messages/{message_id}")))
            .send().await
            .map_err(Self::transport("delete"))?;
        Self::check(response, "delete message").await?;
        Ok(())
    }

    /// All roles of the configured guild.
    pub async fn guild_roles(&self) -> Result<Vec<RoleInfo>> {
        let guild = self.guild_id()?;
        let response = self.client
            .get(self.api(&format!("/guilds/{guild}/roles")))
            .send().await
            .map_err(Self::transport("roles"))?;
        let response = Self::check(response, "list roles").await?;

        let roles: Vec<DiscordRole> = response.json().await
            .map_err(|e| HeraldError::Channel(format!("Invalid roles response: {e}")))?;
        Ok(roles.into_iter().map(|r| RoleInfo { id: r.id, name: r.name }).collect())
    }

    async fn set_member_role(&self, user_id: &str, role_id: &str, grant: bool) -> Result<()> {
        let guild = self.guild_id()?;
        let url = self.api(&format!("/guilds/{guild}/members/{user_id}/roles/{role_id}"));
        let request = if grant { self.client.put(url) } else { self.client.delete(url) };
        let response = request.send().await.map_err(Self::transport("member role"))?;
        Self::check(response, "update member role").await?;
        Ok(())
    }

    /// Role id lists of every guild member, paged by user id.
    pub async fn member_roles(&self) -> Result<Vec<Vec<String>>> {
        let guild = self.guild_id()?;
        let mut all = Vec::new();
        let mut after = String::from("0");
        loop {
            let response = self.client
                .get(self.api(&format!("/guilds/{guild}/members")))
                .query(&[("limit", MEMBER_PAGE.to_string()), ("after", after.clone())])
                .send().await
                .map_err(Self::transport("members"))?;
            let response = Self::check(response, "list members").await?;
            let page: Vec<DiscordMember> = response.json().await
                .map_err(|e| HeraldError::Channel(format!("Invalid members response: {e}")))?;

            let full = page.len() == MEMBER_PAGE;
            match page.last().and_then(|m| m.user.as_ref()) {
                Some(user) => after = user.id.clone(),
                None => break,
            }
            all.extend(page.into_iter().map(|m| m.roles));
            if !full {
                break;
            }
        }
        Ok(all)
    }

    /// Get current bot info.
    pub async fn get_me(&self) -> Result<DiscordUser> {
        let response = self.client
            .get(self.api("/users/@me"))
            .send().await
            .map_err(Self::transport("getMe"))?;
        let response = Self::check(response, "getMe").await?;
        response.json().await
            .map_err(|e| HeraldError::Channel(format!("Invalid response: {e}")))
    }

    /// Get Gateway WebSocket URL.
    pub async fn get_gateway_url(&self) -> Result<String> {
        let response = self.client
            .get(self.api("/gateway/bot"))
            .send().await
            .map_err(Self::transport("gateway"))?;
        let response = Self::check(response, "gateway").await?;

        let body: serde_json::Value = response.json().await
            .map_err(|e| HeraldError::Channel(format!("Invalid gateway response: {e}")))?;

        body["url"].as_str()
            .map(|s| format!("{s}/?v=10&encoding=json"))
            .ok_or_else(|| HeraldError::Channel("No gateway URL".into()))
    }

    /// Start Gateway WebSocket connection — returns a stream of gateway events.
    /// Auto-reconnects on disconnect with exponential backoff.
    pub fn start_gateway(&self) -> DiscordGatewayStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let channel = self.clone();

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 5;

            // ═══ Reconnect loop ═══
            loop {
                tracing::info!("Discord Gateway connecting...");

                let gateway_url = match channel.get_gateway_url().await {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::error!("Failed to get gateway URL: {e}, retrying in {backoff_secs}s...");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let (mut ws, _) = match tokio_tungstenite::connect_async(&gateway_url).await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::error!("Gateway WebSocket failed: {e}, retrying in {backoff_secs}s...");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                backoff_secs = 5;
                tracing::info!("Discord Gateway connected");

                use futures::{SinkExt, StreamExt};
                use tokio_tungstenite::tungstenite::Message as WsMsg;

                let mut heartbeat = heartbeat_timer(DEFAULT_HEARTBEAT_MS);
                let mut seq: Option<u64> = None;
                let mut identified = false;

                loop {
                    tokio::select! {
                        msg = ws.next() => {
                            match msg {
                                Some(Ok(WsMsg::Text(text))) => {
                                    let payload: serde_json::Value = match serde_json::from_str(&text) {
                                        Ok(v) => v,
                                        Err(_) => continue,
                                    };

                                    let op = payload["op"].as_u64().unwrap_or(0);
                                    if let Some(s) = payload["s"].as_u64() {
                                        seq = Some(s);
                                    }

                                    match op {
                                        10 => {
                                            let interval_ms = payload["d"]["heartbeat_interval"]
                                                .as_u64().unwrap_or(DEFAULT_HEARTBEAT_MS);
                                            heartbeat = heartbeat_timer(interval_ms);
                                            tracing::debug!("Gateway Hello: heartbeat={interval_ms}ms");

                                            if !identified {
                                                let identify = identify_payload(&channel.config);
                                                if ws.send(WsMsg::Text(identify.to_string())).await.is_err() {
                                                    break;
                                                }
                                                identified = true;
                                            }
                                        }
                                        11 => { tracing::trace!("Heartbeat ACK"); }
                                        0 => {
                                            let event_name = payload["t"].as_str().unwrap_or("");
                                            if event_name == "READY" {
                                                let user = payload["d"]["user"]["username"]
                                                    .as_str().unwrap_or("unknown");
                                                tracing::info!("Discord Gateway READY as {user}");
                                                continue;
                                            }
                                            match parse_dispatch(event_name, &payload["d"]) {
                                                Some(event) => {
                                                    if tx.send(event).is_err() {
                                                        tracing::info!("Discord stream closed (receiver dropped)");
                                                        return;
                                                    }
                                                }
                                                None => tracing::trace!("Ignoring event: {event_name}"),
                                            }
                                        }
                                        7 => {
                                            tracing::warn!("Gateway requesting reconnect");
                                            break;
                                        }
                                        9 => {
                                            tracing::warn!("Invalid session, re-identifying");
                                            identified = false;
                                        }
                                        _ => {}
                                    }
                                }
                                Some(Ok(WsMsg::Close(_))) => {
                                    tracing::warn!("Discord Gateway closed by server");
                                    break;
                                }
                                Some(Err(e)) => {
                                    tracing::error!("Gateway error: {e}");
                                    break;
                                }
                                None => break,
                                _ => {}
                            }
                        }
                        _ = heartbeat.tick() => {
                            if ws.send(WsMsg::Text(heartbeat_payload(seq).to_string())).await.is_err() {
                                tracing::error!("Heartbeat send failed");
                                break;
                            }
                            tracing::trace!("Heartbeat sent (seq={:?})", seq);
                        }
                    }
                }

                if tx.is_closed() {
                    return;
                }
                tracing::info!("Discord Gateway disconnected, reconnecting in {backoff_secs}s...");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                backoff_secs = (backoff_secs * 2).min(60);
            }
        });

        DiscordGatewayStream { rx }
    }
}

const DEFAULT_HEARTBEAT_MS: u64 = 41_250;
const MEMBER_PAGE: usize = 1000;

/// Heartbeat clock for one session. It keeps its own schedule, so incoming
/// frames never push a heartbeat back; the first beat is one period out.
fn heartbeat_timer(period_ms: u64) -> tokio::time::Interval {
    let period = Duration::from_millis(period_ms.max(1));
    let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    timer
}

/// Gateway op 2 (Identify).
fn identify_payload(config: &DiscordConfig) -> serde_json::Value {
    serde_json::json!({
        "op": 2,
        "d": {
            "token": config.bot_token,
            "intents": config.intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "herald",
                "device": "herald"
            }
        }
    })
}

/// Gateway op 1 (Heartbeat) carrying the last sequence number seen.
fn heartbeat_payload(seq: Option<u64>) -> serde_json::Value {
    serde_json::json!({ "op": 1, "d": seq })
}

/// Translate a Gateway dispatch (op 0) into an event the bot cares about.
/// Messages from bots are dropped.
pub fn parse_dispatch(event_name: &str, d: &serde_json::Value) -> Option<GatewayEvent> {
    match event_name {
        "MESSAGE_CREATE" => {
            if d["author"]["bot"].as_bool().unwrap_or(false) {
                return None;
            }
            let member_roles = d["member"]["roles"]
                .as_array()
                .map(|roles| roles.iter().filter_map(|r| r.as_str().map(String::from)).collect())
                .unwrap_or_default();
            let timestamp = d["timestamp"]
                .as_str()
                .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&chrono::Utc))
                .unwrap_or_else(chrono::Utc::now);

            Some(GatewayEvent::Message(IncomingMessage {
                message_id: d["id"].as_str().unwrap_or("").into(),
                channel_id: d["channel_id"].as_str().unwrap_or("").into(),
                guild_id: d["guild_id"].as_str().map(String::from),
                author_id: d["author"]["id"].as_str().unwrap_or("").into(),
                author_name: d["author"]["username"].as_str().map(String::from),
                content: d["content"].as_str().unwrap_or("").into(),
                member_roles,
                timestamp,
            }))
        }
        "GUILD_MEMBER_ADD" => Some(GatewayEvent::MemberJoined {
            guild_id: d["guild_id"].as_str().unwrap_or("").into(),
            user_id: d["user"]["id"].as_str().unwrap_or("").into(),
            username: d["user"]["username"].as_str().unwrap_or("unknown").into(),
        }),
        _ => None,
    }
}

/// Discord's embed object shape.
fn discord_embed(embed: &Embed) -> serde_json::Value {
    let mut value = serde_json::json!({});
    if let Some(title) = &embed.title { value["title"] = title.clone().into(); }
    if let Some(description) = &embed.description { value["description"] = description.clone().into(); }
    if let Some(url) = &embed.url { value["url"] = url.clone().into(); }
    if let Some(color) = embed.color { value["color"] = color.into(); }
    if !embed.fields.is_empty() {
        value["fields"] = embed.fields.iter().map(|f| serde_json::json!({
            "name": f.name,
            "value": f.value,
            "inline": f.inline,
        })).collect();
    }
    if let Some(footer) = &embed.footer {
        value["footer"] = serde_json::json!({ "text": footer });
    }
    value
}

/// Stream of events from the Discord Gateway.
pub struct DiscordGatewayStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<GatewayEvent>,
}

impl Stream for DiscordGatewayStream {
    type Item = GatewayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl ChatClient for DiscordChannel {
    fn name(&self) -> &str { "discord" }

    async fn send_message(&self, channel_id: &str, message: OutgoingMessage) -> Result<SendResult> {
        self.post_message(channel_id, &message).await
    }

    async fn find_role(&self, name: &str) -> Result<Option<RoleInfo>> {
        let roles = self.guild_roles().await?;
        Ok(roles.into_iter().find(|r| r.name.eq_ignore_ascii_case(name)))
    }

    async fn find_channel(&self, id: &str) -> Result<Option<ChannelInfo>> {
        let response = self.client
            .get(self.api(&format!("/channels/{id}")))
            .send().await
            .map_err(Self::transport("channel lookup"))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, "channel lookup").await?;
        let channel: DiscordChannelObject = response.json().await
            .map_err(|e| HeraldError::Channel(format!("Invalid channel response: {e}")))?;
        Ok(Some(ChannelInfo { id: channel.id, name: channel.name }))
    }

    async fn add_member_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        self.set_member_role(user_id, role_id, true).await
    }

    async fn remove_member_role(&self, user_id: &str, role_id: &str) -> Result<()> {
        self.set_member_role(user_id, role_id, false).await
    }

    async fn count_role_members(&self, role_id: &str) -> Result<usize> {
        let members = self.member_roles().await?;
        Ok(members.iter().filter(|roles| roles.iter().any(|r| r == role_id)).count())
    }
}

// --- Discord API Types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub bot: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscordMember {
    #[serde(default)]
    user: Option<DiscordUser>,
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscordRole {
    id: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DiscordChannelObject {
    id: String,
    #[serde(default)]
    name: Option<String>,
}
