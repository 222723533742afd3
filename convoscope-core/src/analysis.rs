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

//! Single-session analysis output
//!
//! # Quality Dimensions
//!
//! - **Resolution**: Did the user's problem get solved
//! - **Effort**: How hard the user had to work
//! - **Accuracy**: Whether the bot understood and answered the question
//! - **Compliance**: Greeting, disclosure and promise hygiene
//! - **Escalation**: Quality of the bot-to-human handoff (only when one happened)

use crate::config::MAX_DIMENSION_SCORE;
use crate::moment::KeyMoment;
use serde::{Deserialize, Serialize};

/// Score for one quality dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDimension {
    /// Score within 1-10 (0 only for an empty session)
    pub score: f64,
    pub max_score: f64,
    /// Weight in the overall score, e.g. "30%"
    pub weight_label: String,
    /// Human-readable trail of the adjustments that produced the score
    pub evidence: String,
}

impl ScoreDimension {
    pub fn new(score: f64, weight: f64, evidence: impl Into<String>) -> Self {
        Self {
            score,
            max_score: MAX_DIMENSION_SCORE,
            weight_label: format!("{:.0}%", weight * 100.0),
            evidence: evidence.into(),
        }
    }

    /// Placeholder used for sessions with no messages.
    pub fn empty(weight: f64) -> Self {
        Self::new(0.0, weight, "No messages to score")
    }
}

/// All dimension scores plus the weighted overall score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityScores {
    pub resolution: ScoreDimension,
    pub effort: ScoreDimension,
    pub accuracy: ScoreDimension,
    pub compliance: ScoreDimension,
    /// `None` when no human agent took part in the session
    pub escalation: Option<ScoreDimension>,
    pub overall: f64,
}

/// Session-level outcome label, independent of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Escalated,
    Resolved,
    Unresolved,
    Abandoned,
    Contained,
    Empty,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Escalated => "escalated",
            Outcome::Resolved => "resolved",
            Outcome::Unresolved => "unresolved",
            Outcome::Abandoned => "abandoned",
            Outcome::Contained => "contained",
            Outcome::Empty => "empty",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counts and labels describing the session as a whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_turns: usize,
    pub user_turns: usize,
    pub bot_turns: usize,
    pub agent_turns: usize,
    /// Preferred duration rendering, or "N/A"
    pub duration: String,
    /// Span between the first and last timestamped messages
    pub active_duration_secs: Option<i64>,
    /// Span of the session window recorded in metadata
    pub session_window_secs: Option<i64>,
    pub outcome: Outcome,
    pub agent_type: String,
}

/// Complete result of analyzing one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub scores: QualityScores,
    pub key_moments: Vec<KeyMoment>,
    pub summary: SessionSummary,
}

/// Render a duration as "45s", "3m 12s" or "1h 04m".
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_label() {
        let dim = ScoreDimension::new(7.0, 0.3, "ok");
        assert_eq!(dim.weight_label, "30%");
        assert_eq!(dim.max_score, 10.0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(192), "3m 12s");
        assert_eq!(format_duration(3840), "1h 04m");
        assert_eq!(format_duration(-5), "0s");
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::Unresolved).unwrap();
        assert_eq!(json, "\"unresolved\"");
        assert_eq!(Outcome::Empty.to_string(), "empty");
    }
}
