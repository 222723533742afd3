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

//! Key moments: the turns an operator should look at first

use crate::message::Role;
use serde::{Deserialize, Serialize};

/// Kinds of key moment, declared from most to least severe.
///
/// The derived `Ord` follows declaration order, so sorting by `MomentType`
/// sorts by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentType {
    FailurePoint,
    UserFrustration,
    Redirect,
    IntentMiss,
    BotLoop,
    Escalation,
    Resolution,
    Positive,
}

impl MomentType {
    /// All moment types in severity order
    pub const ALL: [MomentType; 8] = [
        MomentType::FailurePoint,
        MomentType::UserFrustration,
        MomentType::Redirect,
        MomentType::IntentMiss,
        MomentType::BotLoop,
        MomentType::Escalation,
        MomentType::Resolution,
        MomentType::Positive,
    ];

    /// 1 = most severe
    pub fn severity_rank(&self) -> u8 {
        *self as u8 + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            MomentType::FailurePoint => "Failure Point",
            MomentType::UserFrustration => "User Frustration",
            MomentType::Redirect => "Redirect",
            MomentType::IntentMiss => "Intent Miss",
            MomentType::BotLoop => "Bot Loop",
            MomentType::Escalation => "Escalation",
            MomentType::Resolution => "Resolution",
            MomentType::Positive => "Positive",
        }
    }

    pub fn sublabel(&self) -> &'static str {
        match self {
            MomentType::FailurePoint => "Bot could not help",
            MomentType::UserFrustration => "User repeated or pushed back",
            MomentType::Redirect => "Sent to another channel",
            MomentType::IntentMiss => "Generic reply to a specific question",
            MomentType::BotLoop => "Bot repeated itself",
            MomentType::Escalation => "Human agent joined",
            MomentType::Resolution => "Issue confirmed resolved",
            MomentType::Positive => "Helpful, actionable reply",
        }
    }
}

/// A message quoted inside a key moment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentExcerpt {
    pub role: Role,
    pub text: String,
}

/// A diagnostically significant turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMoment {
    #[serde(rename = "type")]
    pub moment_type: MomentType,
    pub label: String,
    pub sublabel: String,
    /// 1-based turn of the triggering message
    pub turn: usize,
    pub total_turns: usize,
    pub severity_rank: u8,
    /// At most two messages: optional context first, trigger last
    pub messages: Vec<MomentExcerpt>,
    pub explanation: String,
}

impl KeyMoment {
    pub fn new(
        moment_type: MomentType,
        turn: usize,
        total_turns: usize,
        messages: Vec<MomentExcerpt>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            moment_type,
            label: moment_type.label().to_string(),
            sublabel: moment_type.sublabel().to_string(),
            turn,
            total_turns,
            severity_rank: moment_type.severity_rank(),
            messages,
            explanation: explanation.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_declaration_order() {
        let ranks: Vec<u8> = MomentType::ALL.iter().map(|t| t.severity_rank()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(MomentType::FailurePoint < MomentType::Redirect);
    }

    #[test]
    fn test_type_serializes_as_snake_case() {
        let moment = KeyMoment::new(MomentType::BotLoop, 4, 6, Vec::new(), "loop");
        let json = serde_json::to_value(&moment).unwrap();
        assert_eq!(json["type"], "bot_loop");
        assert_eq!(json["severity_rank"], 5);
        assert_eq!(json["label"], "Bot Loop");
    }
}
