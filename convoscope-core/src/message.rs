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

//! Transcript messages and sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    EndUser,
    Bot,
    Agent,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::EndUser => "end_user",
            Role::Bot => "bot",
            Role::Agent => "agent",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transcript entry as supplied by the loading layer, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub text: String,
    /// ISO-8601 timestamp, if the source recorded one
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl RawMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// A classified message. `index` equals the message's position in its session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub index: usize,
    pub role: Role,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    /// 1-based turn number shown to operators
    pub fn turn(&self) -> usize {
        self.index + 1
    }
}

/// Session-level metadata supplied alongside the transcript
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub agent_type_hint: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

const HANDOFF_MARKERS: &[&str] = &[
    "escalated",
    "handoff",
    "handed_off",
    "transferred",
    "agent",
    "human",
    "live_agent",
];

impl SessionMetadata {
    /// Whether the status or agent-type hint records a handoff to a human.
    pub fn indicates_handoff(&self) -> bool {
        [self.status.as_deref(), self.agent_type_hint.as_deref()]
            .into_iter()
            .flatten()
            .map(|value| value.trim().to_lowercase().replace(['-', ' '], "_"))
            .any(|value| HANDOFF_MARKERS.iter().any(|marker| value.contains(marker)))
    }

    /// Seconds between the recorded start and end of the session window.
    pub fn window_secs(&self) -> Option<i64> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

/// An ordered, classified conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl Session {
    pub fn new(messages: Vec<Message>, metadata: SessionMetadata) -> Self {
        Self { messages, metadata }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    pub fn by_role(&self, role: Role) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(move |m| m.role == role)
    }

    pub fn first_of(&self, role: Role) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == role)
    }

    pub fn last_of(&self, role: Role) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == role)
    }

    /// Seconds between the first and last timestamped messages. Needs at
    /// least two timestamps.
    pub fn active_secs(&self) -> Option<i64> {
        let mut stamps = self.messages.iter().filter_map(|m| m.timestamp);
        let first = stamps.next()?;
        let last = stamps.last()?;
        if last >= first {
            Some((last - first).num_seconds())
        } else {
            None
        }
    }
}
