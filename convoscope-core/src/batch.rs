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

//! Corpus-level (batch) records and reports

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured intent annotation attached to a corpus message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentAnnotation {
    #[serde(rename = "type", default)]
    pub intent_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub search_query: Option<String>,
}

/// A raw corpus message.
///
/// `intent` is kept as loaded: either the annotation object itself or a string
/// holding its JSON text. It is validated per message during batch analysis so
/// one bad annotation never rejects the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusMessage {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub intent: Option<serde_json::Value>,
}

impl CorpusMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            text: text.into(),
            timestamp: None,
            intent: None,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<serde_json::Value>) -> Self {
        self.intent = Some(intent.into());
        self
    }
}

/// The per-session detector flags tracked in batch mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detector {
    Failure,
    DeadEnd,
    Frustration,
    Loop,
    Escalation,
    Resolution,
    Verbose,
}

impl Detector {
    pub const ALL: [Detector; 7] = [
        Detector::Failure,
        Detector::DeadEnd,
        Detector::Frustration,
        Detector::Loop,
        Detector::Escalation,
        Detector::Resolution,
        Detector::Verbose,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Detector::Failure => "failure",
            Detector::DeadEnd => "dead_end",
            Detector::Frustration => "frustration",
            Detector::Loop => "loop",
            Detector::Escalation => "escalation",
            Detector::Resolution => "resolution",
            Detector::Verbose => "verbose",
        }
    }
}

/// Mutually exclusive label for a session, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionClassification {
    #[serde(rename = "Looped")]
    Looped,
    #[serde(rename = "Frustrated Exit")]
    FrustratedExit,
    #[serde(rename = "Escalation Request")]
    EscalationRequest,
    #[serde(rename = "Dead-End")]
    DeadEnd,
    #[serde(rename = "Resolution")]
    Resolution,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Unclassified")]
    Unclassified,
}

impl SessionClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionClassification::Looped => "Looped",
            SessionClassification::FrustratedExit => "Frustrated Exit",
            SessionClassification::EscalationRequest => "Escalation Request",
            SessionClassification::DeadEnd => "Dead-End",
            SessionClassification::Resolution => "Resolution",
            SessionClassification::Failed => "Failed",
            SessionClassification::Unclassified => "Unclassified",
        }
    }
}

impl std::fmt::Display for SessionClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One session's result from the batch pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSessionRecord {
    pub session_id: String,
    pub message_count: usize,
    pub bot_count: usize,
    pub user_count: usize,
    pub agent_count: usize,
    pub primary_intent: String,
    pub confidence: f64,
    /// Composite score within 0-10
    pub score: f64,
    pub classification: SessionClassification,
    pub has_failure: bool,
    pub has_dead_end: bool,
    pub has_frustration: bool,
    pub has_loop: bool,
    pub has_escalation: bool,
    pub has_resolution: bool,
    pub is_verbose: bool,
    /// Distinct truncated texts of failing bot replies
    #[serde(default)]
    pub failure_previews: Vec<String>,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub malformed_annotations: usize,
}

impl BatchSessionRecord {
    pub fn flag(&self, detector: Detector) -> bool {
        match detector {
            Detector::Failure => self.has_failure,
            Detector::DeadEnd => self.has_dead_end,
            Detector::Frustration => self.has_frustration,
            Detector::Loop => self.has_loop,
            Detector::Escalation => self.has_escalation,
            Detector::Resolution => self.has_resolution,
            Detector::Verbose => self.is_verbose,
        }
    }
}

/// Hit count and rate for one detector across the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorStat {
    pub detector: Detector,
    pub count: usize,
    pub rate: f64,
}

/// Detector rates for the sessions sharing one primary intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentBreakdown {
    pub intent: String,
    pub sessions: usize,
    pub rates: BTreeMap<Detector, f64>,
}

/// A text and how often it occurred
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedText {
    pub text: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
    /// Display range, e.g. "2-3"
    pub range: String,
    pub count: usize,
}

/// Corpus-wide aggregate statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusReport {
    pub total_sessions: usize,
    pub detector_stats: Vec<DetectorStat>,
    pub intent_breakdown: Vec<IntentBreakdown>,
    pub top_failure_responses: Vec<RankedText>,
    pub top_search_queries: Vec<RankedText>,
    pub score_histogram: Vec<HistogramBucket>,
    pub classification_counts: BTreeMap<SessionClassification, usize>,
    pub average_score: f64,
    pub malformed_annotations: usize,
}

/// Everything a batch run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub records: Vec<BatchSessionRecord>,
    pub report: CorpusReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_parsing() {
        let annotation: IntentAnnotation =
            serde_json::from_str(r#"{"type":"withdrawal","confidence":0.82}"#).unwrap();
        assert_eq!(annotation.intent_type.as_deref(), Some("withdrawal"));
        assert_eq!(annotation.confidence, Some(0.82));
        assert!(annotation.search_query.is_none());
    }

    #[test]
    fn test_classification_display_names() {
        let json = serde_json::to_string(&SessionClassification::FrustratedExit).unwrap();
        assert_eq!(json, "\"Frustrated Exit\"");
        assert_eq!(SessionClassification::DeadEnd.to_string(), "Dead-End");
    }
}
