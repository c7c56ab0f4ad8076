//! Herald configuration.
//!
//! Loaded from `~/.herald/config.toml` (or an explicit path), then patched with
//! environment variables so a deployment can keep secrets and channel ids out
//! of the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HeraldError, Result};
use crate::types::EventGroup;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeraldConfig {
    /// Prefix that marks a chat message as a command.
    #[serde(default = "default_prefix")]
    pub command_prefix: String,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub roles: RolesConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub mission: MissionConfig,
}

/// Discord bot connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub guild_id: String,
    /// Gateway intents bitmask.
    #[serde(default = "default_intents")]
    pub intents: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

/// Channel ids used as notification destinations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub log: String,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub arma: String,
    #[serde(default)]
    pub falcon: String,
    /// Mission announcements; falls back to the ArmA channel.
    #[serde(default)]
    pub mission: Option<String>,
}

/// Role names used for mentions and permission checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default = "default_arma_role")]
    pub arma_player: String,
    #[serde(default = "default_falcon_role")]
    pub falcon_player: String,
    /// Role mentioned on mission announcements.
    #[serde(default)]
    pub mission: Option<String>,
    /// Holders of any of these roles may run admin commands.
    #[serde(default = "default_admin_roles")]
    pub admin: Vec<String>,
    /// Roles members may join and leave themselves.
    #[serde(default)]
    pub allowed_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    #[serde(default)]
    pub calendar_url: String,
    #[serde(default)]
    pub status_url: String,
    /// Upper bound on every HTTP request made by the bot.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Humanized lead times that trigger a reminder, e.g. "1 hour".
    #[serde(default = "default_intervals")]
    pub intervals: Vec<String>,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionConfig {
    /// Minimum players online before a new mission is announced.
    #[serde(default = "default_min_player_alert")]
    pub min_player_alert: u32,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn default_prefix() -> String { "!".into() }
fn default_intents() -> u64 {
    // GUILDS | GUILD_MEMBERS | GUILD_MESSAGES | MESSAGE_CONTENT
    (1 << 0) | (1 << 1) | (1 << 9) | (1 << 15)
}
fn default_api_base() -> String { "https://discord.com/api/v10".into() }
fn default_arma_role() -> String { "ArmA Player".into() }
fn default_falcon_role() -> String { "Falcon Player".into() }
fn default_admin_roles() -> Vec<String> { vec!["Admin".into()] }
fn default_http_timeout() -> u64 { 20 }
fn default_intervals() -> Vec<String> { vec!["1 day".into(), "1 hour".into()] }
fn default_check_interval() -> u64 { 60 }
fn default_refresh_interval() -> u64 { 900 }
fn default_min_player_alert() -> u32 { 10 }

impl Default for HeraldConfig {
    fn default() -> Self {
        Self {
            command_prefix: default_prefix(),
            discord: DiscordConfig::default(),
            channels: ChannelsConfig::default(),
            roles: RolesConfig::default(),
            feeds: FeedsConfig::default(),
            reminders: RemindersConfig::default(),
            mission: MissionConfig::default(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            guild_id: String::new(),
            intents: default_intents(),
            api_base: default_api_base(),
        }
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            arma_player: default_arma_role(),
            falcon_player: default_falcon_role(),
            mission: None,
            admin: default_admin_roles(),
            allowed_groups: Vec::new(),
        }
    }
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            calendar_url: String::new(),
            status_url: String::new(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            intervals: default_intervals(),
            check_interval_secs: default_check_interval(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            min_player_alert: default_min_player_alert(),
            check_interval_secs: default_check_interval(),
        }
    }
}

impl HeraldConfig {
    /// Herald home directory (`~/.herald`).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".herald")
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults when absent.
    /// Environment overrides are applied either way.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from an explicit path (`~` is expanded). The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);
        if !path.exists() {
            return Err(HeraldError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let mut config = Self::read_file(&path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| HeraldError::config(format!("Serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let list = |raw: String| -> Vec<String> {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        if let Some(v) = get("HERALD_BOT_TOKEN") { self.discord.bot_token = v; }
        if let Some(v) = get("HERALD_GUILD_ID") { self.discord.guild_id = v; }
        if let Some(v) = get("LOG_CHANNEL") { self.channels.log = v; }
        if let Some(v) = get("MAIN_CHANNEL") { self.channels.main = v; }
        if let Some(v) = get("ARMA_CHANNEL") { self.channels.arma = v; }
        if let Some(v) = get("FALCON_CHANNEL") { self.channels.falcon = v; }
        if let Some(v) = get("MISSION_CHANNEL") { self.channels.mission = Some(v); }
        if let Some(v) = get("ARMA_ROLE") { self.roles.arma_player = v; }
        if let Some(v) = get("FALCON_ROLE") { self.roles.falcon_player = v; }
        if let Some(v) = get("ADMIN_ROLES") { self.roles.admin = list(v); }
        if let Some(v) = get("ALLOWED_GROUPS") { self.roles.allowed_groups = list(v); }
        if let Some(v) = get("CALENDAR_URL") { self.feeds.calendar_url = v; }
        if let Some(v) = get("STATUS_URL") { self.feeds.status_url = v; }
        if let Some(v) = get("REMINDER_INTERVALS") { self.reminders.intervals = list(v); }
        if let Some(v) = get("MIN_PLAYER_ALERT") {
            self.mission.min_player_alert = v.trim().parse().map_err(|_| {
                HeraldError::config(format!("MIN_PLAYER_ALERT must be a number, got '{v}'"))
            })?;
        }
        Ok(())
    }

    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.discord.bot_token.is_empty() {
            return Err(HeraldError::config("discord.bot_token is not set (or HERALD_BOT_TOKEN)"));
        }
        if self.command_prefix.is_empty() {
            return Err(HeraldError::config("command_prefix must not be empty"));
        }
        if self.reminders.intervals.iter().all(|l| l.trim().is_empty()) {
            return Err(HeraldError::config("reminders.intervals must name at least one label"));
        }
        if self.reminders.check_interval_secs == 0
            || self.reminders.refresh_interval_secs == 0
            || self.mission.check_interval_secs == 0
        {
            return Err(HeraldError::config("check intervals must be greater than zero"));
        }
        Ok(())
    }

    /// Channel for mission announcements.
    pub fn mission_channel(&self) -> &str {
        self.channels.mission.as_deref().unwrap_or(&self.channels.arma)
    }

    /// Player role associated with an event group, if any.
    pub fn group_role(&self, group: EventGroup) -> Option<&str> {
        match group {
            EventGroup::Uoa3 | EventGroup::Uotc => Some(&self.roles.arma_player),
            EventGroup::Uoaf => Some(&self.roles.falcon_player),
            EventGroup::Other => None,
        }
    }
}
