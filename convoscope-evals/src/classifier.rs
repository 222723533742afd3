// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Message classifier: raw sender labels to roles

use chrono::{DateTime, NaiveDateTime, Utc};
use convoscope_core::{Message, RawMessage, Role, Session, SessionMetadata};
use std::borrow::Cow;
use tracing::debug;

const END_USER_LABELS: &[&str] = &[
    "user",
    "end_user",
    "enduser",
    "customer",
    "visitor",
    "client",
    "guest",
    "pelanggan",
    "nasabah",
    "pengguna",
];

const BOT_LABELS: &[&str] = &[
    "bot",
    "assistant",
    "ai",
    "chatbot",
    "virtual_assistant",
    "automated",
    "auto_reply",
    "system_bot",
];

const AGENT_LABELS: &[&str] = &[
    "agent",
    "human",
    "human_agent",
    "live_agent",
    "operator",
    "cs",
    "staff",
    "admin",
    "support",
    "petugas",
];

/// Map a raw sender label to a role. Unknown labels become [`Role::System`].
pub fn classify_sender(sender: &str) -> Role {
    let label = sender.trim().to_lowercase().replace(['-', ' '], "_");

    if END_USER_LABELS.contains(&label.as_str()) {
        return Role::EndUser;
    }
    if BOT_LABELS.contains(&label.as_str()) {
        return Role::Bot;
    }
    if AGENT_LABELS.contains(&label.as_str()) {
        return Role::Agent;
    }

    if label.contains("bot") || label.contains("assistant") {
        Role::Bot
    } else if label.contains("agent") || label.contains("operator") {
        Role::Agent
    } else if label.contains("user") || label.contains("customer") {
        Role::EndUser
    } else {
        Role::System
    }
}

/// Parse an ISO-8601 timestamp. Returns `None` rather than failing.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Naive timestamps are taken as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    debug!(timestamp = raw, "Ignoring unparseable timestamp");
    None
}

/// Tag each raw entry with a role and its position.
pub fn classify(raw: &[RawMessage]) -> Vec<Message> {
    raw.iter()
        .enumerate()
        .map(|(index, entry)| Message {
            index,
            role: classify_sender(&entry.sender),
            text: entry.text.clone(),
            timestamp: entry.timestamp.as_deref().and_then(parse_timestamp),
        })
        .collect()
}

pub fn build_session(raw: &[RawMessage], metadata: SessionMetadata) -> Session {
    Session::new(classify(raw), metadata)
}

/// Messages whose `index` equals their position in the slice.
///
/// Borrows when that already holds, e.g. for anything built by [`classify`];
/// a slice cut from a longer transcript is renumbered from zero.
pub fn positional(messages: &[Message]) -> Cow<'_, [Message]> {
    if messages
        .iter()
        .enumerate()
        .all(|(position, m)| m.index == position)
    {
        return Cow::Borrowed(messages);
    }
    Cow::Owned(
        messages
            .iter()
            .enumerate()
            .map(|(index, m)| Message { index, ..m.clone() })
            .collect(),
    )
}
