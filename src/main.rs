//! # Herald CLI
//!
//! Community chat agent: calendar reminders, new-mission announcements and
//! role commands on Discord.
//!
//! Usage:
//!   herald run                  # Start the bot
//!   herald events               # Print upcoming calendar events
//!   herald status               # Scrape the game server status once
//!   herald config show          # Show configuration
//!   herald config init          # Write a default config file

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use herald_agent::CommandDispatcher;
use herald_channels::DiscordChannel;
use herald_core::HeraldConfig;
use herald_core::traits::{ChatClient, EventFeed, StatusSource};
use herald_feeds::{CalendarFeed, StatusPage};
use herald_scheduler::{MissionDetector, Notifier, NotifyRouter, PeriodicScheduler, ReminderEngine, templates};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "📣 Herald — community chat agent for events and missions",
    long_about = "Posts calendar reminders and new-mission announcements to Discord,\nand lets members manage their group roles with chat commands."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Discord and run the scheduled tasks
    Run,

    /// Fetch the calendar and print upcoming events
    Events {
        /// Maximum number of events to print
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Scrape the game server status page once
    Status {
        /// Status page URL (defaults to feeds.status_url)
        #[arg(short, long)]
        url: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show system info
    Info,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "herald=debug,herald_core=debug,herald_scheduler=debug,herald_feeds=debug,herald_channels=debug,herald_agent=debug"
    } else {
        "herald=info,herald_scheduler=info,herald_channels=info,herald_agent=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref().map(PathBuf::from);

    if let Commands::Config { action: ConfigAction::Init { force } } = &cli.command {
        let path = config_path.unwrap_or_else(HeraldConfig::default_path);
        return init_config(&path, *force);
    }

    // Load config
    let config = match &config_path {
        Some(path) => HeraldConfig::load_from(path)?,
        None => HeraldConfig::load()?,
    };

    match cli.command {
        Commands::Run => run(config).await?,

        Commands::Events { limit } => {
            if config.feeds.calendar_url.is_empty() {
                anyhow::bail!("feeds.calendar_url is not set (or CALENDAR_URL)");
            }
            let feed = CalendarFeed::new(&config.feeds.calendar_url, http_timeout(&config))?;
            let now = Utc::now();
            let mut events: Vec<_> = feed
                .fetch_events()
                .await?
                .into_iter()
                .filter(|e| e.is_upcoming(now))
                .collect();
            events.sort_by_key(|e| e.date);
            events.truncate(limit);

            if events.is_empty() {
                println!("📅 No upcoming events.");
            } else {
                println!("📅 Upcoming events ({}):", events.len());
                for event in &events {
                    println!("  {}", templates::event_line(event, now));
                }
            }
        }

        Commands::Status { url } => {
            let url = url.unwrap_or_else(|| config.feeds.status_url.clone());
            if url.is_empty() {
                anyhow::bail!("No status URL: pass --url or set feeds.status_url (or STATUS_URL)");
            }
            let page = StatusPage::new(http_timeout(&config))?;
            match page.fetch_server_status(&url).await? {
                Some(status) => {
                    println!("🎮 {}", templates::status_summary(&status));
                    if !status.author.is_empty() {
                        println!("   Author: {}", status.author);
                    }
                    if !status.description.is_empty() {
                        println!("   {}", status.description);
                    }
                    let alert = status.player_count >= config.mission.min_player_alert;
                    println!(
                        "   Alert threshold: {} players ({})",
                        config.mission.min_player_alert,
                        if alert { "reached" } else { "not reached" }
                    );
                }
                None => println!("🎮 The status page does not list a mission."),
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let mut shown = config.clone();
                if !shown.discord.bot_token.is_empty() {
                    shown.discord.bot_token = "********".into();
                }
                println!("{}", toml::to_string_pretty(&shown)?);
            }
            ConfigAction::Init { .. } => {}
        },

        Commands::Info => {
            let path = config_path.unwrap_or_else(HeraldConfig::default_path);
            let set = |v: &str| if v.is_empty() { "not set".to_string() } else { v.to_string() };
            println!("📣 Herald v{}", env!("CARGO_PKG_VERSION"));
            println!("   Platform: {} / {}", std::env::consts::OS, std::env::consts::ARCH);
            println!("   Config: {}", path.display());
            println!("   Guild: {}", set(&config.discord.guild_id));
            println!("   Bot token: {}", if config.discord.bot_token.is_empty() { "missing" } else { "present" });
            println!("   Channels: main={} arma={} falcon={} log={} mission={}",
                set(&config.channels.main), set(&config.channels.arma),
                set(&config.channels.falcon), set(&config.channels.log),
                set(config.mission_channel()));
            println!("   Calendar: {}", set(&config.feeds.calendar_url));
            println!("   Status page: {}", set(&config.feeds.status_url));
            println!("   Reminders: {}", config.reminders.intervals.join(", "));
            println!("   Mission alert: {} players", config.mission.min_player_alert);
        }
    }

    Ok(())
}

fn http_timeout(config: &HeraldConfig) -> Duration {
    Duration::from_secs(config.feeds.http_timeout_secs)
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("⚠️  Config already exists: {} (use --force to overwrite)", path.display());
        return Ok(());
    }
    HeraldConfig::default()
        .save_to(path)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("✅ Config saved to: {}", path.display());
    println!("\n📋 Next steps:");
    println!("  1. Set discord.bot_token and discord.guild_id (or HERALD_BOT_TOKEN / HERALD_GUILD_ID)");
    println!("  2. Fill in the [channels] ids and feeds.calendar_url / feeds.status_url");
    println!("  3. Start the bot: herald run");
    Ok(())
}

/// Start the bot: periodic tasks plus the Gateway command loop, until an
/// admin shuts it down or Ctrl+C.
async fn run(config: HeraldConfig) -> Result<()> {
    config.validate()?;
    let timeout = http_timeout(&config);

    let discord = DiscordChannel::new(config.discord.clone(), timeout)?;
    let me = discord.get_me().await.context("Discord login failed")?;
    tracing::info!("Logged in as {}", me.username);

    let chat: Arc<dyn ChatClient> = Arc::new(discord.clone());
    let notifier = Notifier::new(chat.clone());
    let router = NotifyRouter::from_config(&config);

    let calendar: Arc<dyn EventFeed> = Arc::new(CalendarFeed::new(&config.feeds.calendar_url, timeout)?);
    let status_page: Arc<dyn StatusSource> = Arc::new(StatusPage::new(timeout)?);
    let reminders = Arc::new(ReminderEngine::new(
        calendar,
        notifier.clone(),
        router.clone(),
        config.reminders.intervals.clone(),
    ));
    let detector = Arc::new(MissionDetector::new(
        status_page,
        notifier,
        router,
        config.mission.min_player_alert,
    ));

    let mut scheduler = PeriodicScheduler::new();

    if config.feeds.calendar_url.is_empty() {
        tracing::warn!("No calendar URL configured, event reminders are disabled");
    } else {
        match reminders.refresh().await {
            Ok(count) => tracing::info!("Calendar loaded: {count} events"),
            Err(e) => tracing::warn!("Initial calendar load failed: {e}"),
        }

        let engine = reminders.clone();
        scheduler.spawn(
            "refresh-events",
            Duration::from_secs(config.reminders.refresh_interval_secs),
            move || {
                let engine = engine.clone();
                async move { engine.refresh().await.map(|_| ()) }
            },
        );

        let engine = reminders.clone();
        scheduler.spawn(
            "check-reminders",
            Duration::from_secs(config.reminders.check_interval_secs),
            move || {
                let engine = engine.clone();
                async move {
                    engine.check_reminders(Utc::now()).await;
                    Ok(())
                }
            },
        );
    }

    if config.feeds.status_url.is_empty() {
        tracing::warn!("No status URL configured, mission announcements are disabled");
    } else {
        let mission = detector.clone();
        let url = config.feeds.status_url.clone();
        scheduler.spawn(
            "check-mission",
            Duration::from_secs(config.mission.check_interval_secs),
            move || {
                let mission = mission.clone();
                let url = url.clone();
                async move {
                    mission.check_mission(&url).await;
                    Ok(())
                }
            },
        );
    }

    tracing::info!("Scheduled tasks: {}", scheduler.task_names().join(", "));

    let dispatcher = CommandDispatcher::new(&config, chat, reminders, detector);
    let mut shutdown = dispatcher.shutdown_signal();
    let mut gateway = discord.start_gateway();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    println!("📣 Herald is running. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            event = gateway.next() => {
                let Some(event) = event else {
                    tracing::warn!("Gateway stream ended");
                    break;
                };
                if let Err(e) = dispatcher.handle(&event, Utc::now()).await {
                    tracing::warn!("Event handling failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                tracing::info!("Shutdown requested from chat");
                break;
            }
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl+C received");
                break;
            }
        }
    }

    scheduler.shutdown().await;
    println!("\n👋 Herald stopped.");
    Ok(())
}
