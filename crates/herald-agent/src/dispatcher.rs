//! Command dispatcher — executes member commands and logs guild activity.

use chrono::{DateTime, Utc};
use herald_core::config::HeraldConfig;
use herald_core::error::Result;
use herald_core::traits::ChatClient;
use herald_core::types::{GatewayEvent, IncomingMessage, OutgoingMessage};
use herald_scheduler::{MissionDetector, ReminderEngine, templates};
use std::sync::Arc;
use tokio::sync::watch;

use crate::command::Command;

const EVENTS_LISTED: usize = 10;

pub struct CommandDispatcher {
    chat: Arc<dyn ChatClient>,
    reminders: Arc<ReminderEngine>,
    mission: Arc<MissionDetector>,
    prefix: String,
    admin_roles: Vec<String>,
    allowed_groups: Vec<String>,
    arma_role: String,
    falcon_role: String,
    log_channel: String,
    shutdown: watch::Sender<bool>,
}

impl CommandDispatcher {
    pub fn new(
        config: &HeraldConfig,
        chat: Arc<dyn ChatClient>,
        reminders: Arc<ReminderEngine>,
        mission: Arc<MissionDetector>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            chat,
            reminders,
            mission,
            prefix: config.command_prefix.clone(),
            admin_roles: config.roles.admin.clone(),
            allowed_groups: config.roles.allowed_groups.clone(),
            arma_role: config.roles.arma_player.clone(),
            falcon_role: config.roles.falcon_player.clone(),
            log_channel: config.channels.log.clone(),
            shutdown,
        }
    }

    /// Flips to `true` once an admin asks the bot to stop.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub async fn handle(&self, event: &GatewayEvent, now: DateTime<Utc>) -> Result<()> {
        match event {
            GatewayEvent::Message(msg) => {
                self.handle_message(msg, now).await?;
            }
            GatewayEvent::MemberJoined { user_id, username, .. } => {
                tracing::info!("Member joined: {username} ({user_id})");
                self.log(format!("**{username}** joined the server (<@{user_id}>)")).await;
            }
        }
        Ok(())
    }

    /// Run the command in `msg`, if any. Returns the command that was run.
    pub async fn handle_message(&self, msg: &IncomingMessage, now: DateTime<Utc>) -> Result<Option<Command>> {
        let Some(command) = Command::parse(&self.prefix, &msg.content) else {
            return Ok(None);
        };
        tracing::debug!("Command '{}' from {}", command.name(), msg.author_id);

        let reply = match &command {
            Command::Help => Command::help_text(&self.prefix),
            Command::Ratio => self.ratio().await?,
            Command::Join(group) => self.set_group(msg, group, true).await?,
            Command::Leave(group) => self.set_group(msg, group, false).await?,
            Command::Events => self.list_events(now).await,
            Command::Mission => match self.mission.retained().await {
                Some(status) => templates::status_summary(&status),
                None => "No mission has been announced yet.".to_string(),
            },
            Command::Shutdown => {
                if !self.is_admin(msg).await? {
                    tracing::warn!("Shutdown refused for {}", msg.author_id);
                    "You do not have permission to do that.".to_string()
                } else {
                    self.reply(msg, "Shutting down. Bye!".to_string()).await?;
                    self.log(format!("Shutdown requested by <@{}>", msg.author_id)).await;
                    tracing::info!("Shutdown requested by {}", msg.author_id);
                    self.shutdown.send_replace(true);
                    return Ok(Some(command));
                }
            }
        };

        self.reply(msg, reply).await?;
        Ok(Some(command))
    }

    /// True when the author holds one of the admin roles.
    pub async fn is_admin(&self, msg: &IncomingMessage) -> Result<bool> {
        for name in &self.admin_roles {
            if let Some(role) = self.chat.find_role(name).await? {
                if msg.member_roles.iter().any(|id| *id == role.id) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn set_group(&self, msg: &IncomingMessage, requested: &str, join: bool) -> Result<String> {
        let verb = if join { "join" } else { "leave" };
        if requested.is_empty() {
            return Ok(format!("Usage: `{}{verb} <group>`. {}", self.prefix, self.available_groups()));
        }
        let Some(group) = self
            .allowed_groups
            .iter()
            .find(|g| g.eq_ignore_ascii_case(requested))
        else {
            return Ok(format!("Unknown group '{requested}'. {}", self.available_groups()));
        };
        let Some(role) = self.chat.find_role(group).await? else {
            tracing::warn!("Allowed group '{group}' has no matching role");
            return Ok(format!("The role for '{group}' does not exist."));
        };

        if join {
            self.chat.add_member_role(&msg.author_id, &role.id).await?;
            tracing::info!("{} joined {group}", msg.author_id);
            Ok(format!("<@{}> joined **{group}**.", msg.author_id))
        } else {
            self.chat.remove_member_role(&msg.author_id, &role.id).await?;
            tracing::info!("{} left {group}", msg.author_id);
            Ok(format!("<@{}> left **{group}**.", msg.author_id))
        }
    }

    /// "ArmA Player: 30 | Falcon Player: 10 | ratio 3.00:1"
    async fn ratio(&self) -> Result<String> {
        let mut counts = Vec::with_capacity(2);
        for name in [&self.arma_role, &self.falcon_role] {
            let Some(role) = self.chat.find_role(name).await? else {
                return Ok(format!("The role '{name}' does not exist."));
            };
            counts.push(self.chat.count_role_members(&role.id).await?);
        }
        let (arma, falcon) = (counts[0], counts[1]);
        let ratio = if falcon == 0 {
            "n/a".to_string()
        } else {
            format!("{:.2}:1", arma as f64 / falcon as f64)
        };
        Ok(format!(
            "{}: {arma} | {}: {falcon} | ratio {ratio}",
            self.arma_role, self.falcon_role
        ))
    }

    fn available_groups(&self) -> String {
        if self.allowed_groups.is_empty() {
            "No groups are open to join.".to_string()
        } else {
            format!("Available: {}", self.allowed_groups.join(", "))
        }
    }

    async fn list_events(&self, now: DateTime<Utc>) -> String {
        let upcoming = self.reminders.upcoming(now, EVENTS_LISTED).await;
        if upcoming.is_empty() {
            return "No upcoming events.".to_string();
        }
        let lines: Vec<String> = upcoming.iter().map(|e| templates::event_line(e, now)).collect();
        format!("**Upcoming events**\n{}", lines.join("\n"))
    }

    async fn reply(&self, msg: &IncomingMessage, content: String) -> Result<()> {
        self.chat
            .send_message(&msg.channel_id, OutgoingMessage::text(content))
            .await?;
        Ok(())
    }

    /// Post to the log channel. Failures are only traced.
    async fn log(&self, content: String) {
        if self.log_channel.is_empty() {
            return;
        }
        if let Err(e) = self
            .chat
            .send_message(&self.log_channel, OutgoingMessage::text(content))
            .await
        {
            tracing::warn!("Log channel post failed: {e}");
        }
    }
}
