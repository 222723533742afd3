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

//! Single-session analysis pipeline
//!
//! raw transcript -> classifier -> (key-moment detector, scorer) -> AnalysisResult
//!
//! This is a purely deterministic evaluator (no external calls). Any
//! well-typed transcript, including an empty one, yields a complete result.

use crate::classifier::build_session;
use crate::key_moments::KeyMomentDetector;
use crate::patterns::PatternCatalog;
use crate::scorer::QualityScorer;
use crate::{Evaluator, EvaluatorMetadata};
use convoscope_core::{
    AnalysisResult, EvalResult, MetricValue, RawMessage, Result, ScoringConfig, Session,
    SessionMetadata,
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::debug;

/// Scores sessions and picks out their key moments
#[derive(Debug, Clone, Default)]
pub struct SessionAnalyzer {
    config: ScoringConfig,
    catalog: PatternCatalog,
}

impl SessionAnalyzer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            catalog: PatternCatalog::default(),
        }
    }

    /// Use a custom pattern catalog, e.g. with site-specific phrases
    pub fn with_catalog(mut self, catalog: PatternCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn analyze(&self, session: &Session) -> AnalysisResult {
        let (scores, summary) =
            QualityScorer::new(&self.catalog, &self.config).score_session(session);
        let key_moments =
            KeyMomentDetector::new(&self.catalog, &self.config).detect(&session.messages);

        debug!(
            turns = summary.total_turns,
            outcome = %summary.outcome,
            overall = scores.overall,
            moments = key_moments.len(),
            "Analyzed session"
        );

        AnalysisResult {
            scores,
            key_moments,
            summary,
        }
    }

    /// Classify a raw transcript and analyze it
    pub fn analyze_raw(&self, raw: &[RawMessage], metadata: SessionMetadata) -> AnalysisResult {
        self.analyze(&build_session(raw, metadata))
    }
}

impl Evaluator for SessionAnalyzer {
    fn id(&self) -> &str {
        "conversation_quality_v1"
    }

    fn evaluate(&self, session: &Session) -> Result<EvalResult> {
        let start = Instant::now();
        let analysis = self.analyze(session);
        let scores = &analysis.scores;

        let mut metrics = HashMap::new();
        metrics.insert("overall".to_string(), MetricValue::Float(scores.overall));
        metrics.insert(
            "resolution".to_string(),
            MetricValue::Float(scores.resolution.score),
        );
        metrics.insert("effort".to_string(), MetricValue::Float(scores.effort.score));
        metrics.insert(
            "accuracy".to_string(),
            MetricValue::Float(scores.accuracy.score),
        );
        metrics.insert(
            "compliance".to_string(),
            MetricValue::Float(scores.compliance.score),
        );
        if let Some(escalation) = &scores.escalation {
            metrics.insert(
                "escalation".to_string(),
                MetricValue::Float(escalation.score),
            );
        }
        metrics.insert(
            "outcome".to_string(),
            MetricValue::String(analysis.summary.outcome.to_string()),
        );
        metrics.insert(
            "total_turns".to_string(),
            MetricValue::Int(analysis.summary.total_turns as i64),
        );
        metrics.insert(
            "key_moments".to_string(),
            MetricValue::Int(analysis.key_moments.len() as i64),
        );

        let passed = scores.overall >= self.config.pass_threshold;
        let explanation = format!(
            "Overall quality {:.1}/10 (threshold: {:.1}). Outcome: {}. {} key moment(s){}.",
            scores.overall,
            self.config.pass_threshold,
            analysis.summary.outcome,
            analysis.key_moments.len(),
            analysis
                .key_moments
                .first()
                .map(|m| format!(", most severe: {} at turn {}", m.label, m.turn))
                .unwrap_or_default(),
        );

        Ok(EvalResult {
            evaluator_id: self.id().to_string(),
            evaluator_type: Some("rule".to_string()),
            metrics,
            passed,
            explanation: Some(explanation),
            evidence_refs: analysis
                .key_moments
                .iter()
                .map(|m| format!("turn:{}", m.turn))
                .collect(),
            confidence: 0.90, // Deterministic heuristics
            duration_ms: Some(start.elapsed().as_millis() as u64),
        })
    }

    fn metadata(&self) -> EvaluatorMetadata {
        EvaluatorMetadata {
            name: "Conversation Quality Evaluator".to_string(),
            version: "1.0.0".to_string(),
            description: "Scores support conversations on resolution, effort, accuracy, \
                          compliance and escalation quality, and flags key moments. \
                          Purely deterministic."
                .to_string(),
            tags: vec![
                "conversation".to_string(),
                "support".to_string(),
                "deterministic".to_string(),
            ],
            author: Some("Convoscope".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoscope_core::{Message, MomentType, Outcome, Role};

    fn raw(pairs: &[(&str, &str)]) -> Vec<RawMessage> {
        pairs.iter().map(|(s, t)| RawMessage::new(*s, *t)).collect()
    }

    #[test]
    fn test_analyze_withdraw_failure() {
        let analyzer = SessionAnalyzer::default();
        let result = analyzer.analyze_raw(
            &raw(&[
                ("user", "saya mau withdraw tapi gagal terus"),
                ("bot", "Mohon maaf, tidak bisa membantu, silakan hubungi tim dukungan"),
            ]),
            SessionMetadata::default(),
        );

        assert_eq!(result.summary.outcome, Outcome::Unresolved);
        assert!(result
            .key_moments
            .iter()
            .any(|m| m.moment_type == MomentType::FailurePoint && m.turn == 2));
        assert!(result.scores.resolution.score < 5.0);
    }

    #[test]
    fn test_analyze_empty() {
        let result = SessionAnalyzer::default().analyze(&Session::default());
        assert_eq!(result.summary.outcome, Outcome::Empty);
        assert!(result.key_moments.is_empty());
        assert_eq!(result.scores.overall, 0.0);
    }

    #[test]
    fn test_evaluator_result() {
        let analyzer = SessionAnalyzer::default();
        let session = build_session(
            &raw(&[
                ("user", "cara reset pin"),
                ("bot", "Berikut langkah-langkahnya: 1. Klik menu Profil 2. Pilih Reset PIN"),
                ("user", "terima kasih, sudah selesai"),
            ]),
            SessionMetadata::default(),
        );

        let result = analyzer.evaluate(&session).unwrap();
        assert_eq!(result.evaluator_id, "conversation_quality_v1");
        assert!(result.passed);
        assert!(!result.metrics.contains_key("escalation"));
        assert_eq!(
            result.metrics.get("outcome"),
            Some(&MetricValue::String("resolved".to_string()))
        );
        assert!(result.evidence_refs.contains(&"turn:3".to_string()));
    }

    #[test]
    fn test_evaluate_batch_default() {
        let analyzer = SessionAnalyzer::default();
        let sessions = vec![Session::default(), Session::default()];
        let results = analyzer.evaluate_batch(&sessions).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.passed));
    }

    #[test]
    fn test_session_cut_from_longer_transcript() {
        let message = |index, role, text: &str| Message {
            index,
            role,
            text: text.to_string(),
            timestamp: None,
        };
        let session = Session::new(
            vec![
                message(10, Role::EndUser, "saya mau withdraw tapi gagal terus"),
                message(11, Role::Bot, "Mohon maaf, tidak bisa membantu"),
                message(12, Role::Agent, "Halo, ada yang bisa saya bantu?"),
            ],
            SessionMetadata::default(),
        );

        let analyzer = SessionAnalyzer::default();
        let result = analyzer.analyze(&session);
        assert_eq!(result.summary.total_turns, 3);
        assert!(result.scores.escalation.is_some());
        assert!(result
            .key_moments
            .iter()
            .any(|m| m.moment_type == MomentType::FailurePoint && m.turn == 2));
        assert!(result
            .key_moments
            .iter()
            .any(|m| m.moment_type == MomentType::Escalation && m.turn == 3));
        assert!(analyzer.evaluate(&session).is_ok());
    }
}
