//! Message templates for reminders, mission announcements and listings.

use chrono::{DateTime, Utc};
use herald_core::types::{Embed, EventGroup, EventRecord, OutgoingMessage, ServerStatus};

use crate::humanize::humanize;

const MISSION_COLOR: u32 = 0xC62828;

fn group_color(group: EventGroup) -> u32 {
    match group {
        EventGroup::Uoa3 => 0x2E7D32,
        EventGroup::Uoaf => 0x1565C0,
        EventGroup::Uotc => 0xF9A825,
        EventGroup::Other => 0x757575,
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%a %d %b %Y, %H:%M UTC").to_string()
}

/// "Sunday Ops starts in 1 hour!" with an event card.
pub fn reminder_message(event: &EventRecord, label: &str) -> OutgoingMessage {
    let mut embed = Embed::titled(event.title.clone())
        .field("Group", event.group.as_str(), true)
        .field("Starts", format_date(event.date), true);
    embed.url = event.link.clone();
    embed.color = Some(group_color(event.group));

    OutgoingMessage::text(format!("**{}** starts in {label}!", event.title)).with_embed(embed)
}

/// New-mission announcement with the server details.
pub fn mission_message(status: &ServerStatus) -> OutgoingMessage {
    let mut embed = Embed::titled(status.mission_name.clone())
        .field("Players", players(status), true);
    if !status.island.is_empty() {
        embed = embed.field("Island", status.island.clone(), true);
    }
    if !status.author.is_empty() {
        embed = embed.field("Author", status.author.clone(), true);
    }
    if !status.description.is_empty() {
        embed.description = Some(status.description.clone());
    }
    embed.color = Some(MISSION_COLOR);

    OutgoingMessage::text(format!(
        "New mission on the server: **{}**",
        status.mission_name
    ))
    .with_embed(embed)
}

/// One line of the upcoming-events listing.
pub fn event_line(event: &EventRecord, now: DateTime<Utc>) -> String {
    format!(
        "• **{}** ({}) in {} — {}",
        event.title,
        event.group,
        humanize(event.date - now),
        format_date(event.date)
    )
}

/// Short plain-text summary of a server status.
pub fn status_summary(status: &ServerStatus) -> String {
    if status.is_no_mission() {
        return "No mission is running.".to_string();
    }
    let mut summary = format!("**{}** with {} players", status.mission_name, players(status));
    if !status.island.is_empty() {
        summary.push_str(&format!(" on {}", status.island));
    }
    summary
}

fn players(status: &ServerStatus) -> String {
    if status.max_players > 0 {
        format!("{}/{}", status.player_count, status.max_players)
    } else {
        status.player_count.to_string()
    }
}
