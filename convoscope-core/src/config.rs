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

//! Configuration for Convoscope scoring behavior
//!
//! Every similarity threshold, base score and adjustment magnitude used by the
//! heuristics lives here as a named constant. The defaults are the tuned
//! values the dashboards were calibrated against; a TOML file can override any
//! subset of them:
//!
//! ```toml
//! [scoring]
//! reask_threshold = 0.6
//!
//! [scoring.weights]
//! resolution = 0.4
//!
//! [batch]
//! workers = 4
//! ```

use crate::error::{ConvoscopeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lower bound for every quality dimension
pub const MIN_DIMENSION_SCORE: f64 = 1.0;

/// Upper bound for every quality dimension
pub const MAX_DIMENSION_SCORE: f64 = 10.0;

/// Word overlap above which two successive user messages count as a re-ask
pub const DEFAULT_REASK_THRESHOLD: f64 = 0.5;

/// Word overlap above which two successive bot messages count as a loop
pub const DEFAULT_LOOP_THRESHOLD: f64 = 0.7;

/// Word overlap below which the first bot reply is considered off-topic
pub const DEFAULT_OFF_TOPIC_THRESHOLD: f64 = 0.05;

/// Maximum number of key moments returned for one session
pub const DEFAULT_MAX_KEY_MOMENTS: usize = 5;

/// Root configuration file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvoscopeConfig {
    pub scoring: ScoringConfig,
    pub batch: BatchConfig,
}

impl ConvoscopeConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        let result = self.scoring.validate().and_then(|_| self.batch.validate());
        if let Err(e) = &result {
            tracing::warn!("Rejected configuration: {}", e);
        }
        result
    }
}

/// Relative weight of each quality dimension in the overall score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    pub resolution: f64,
    pub effort: f64,
    pub accuracy: f64,
    pub compliance: f64,
    pub escalation: f64,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            resolution: 0.30,
            effort: 0.25,
            accuracy: 0.20,
            compliance: 0.15,
            escalation: 0.10,
        }
    }
}

impl DimensionWeights {
    fn all(&self) -> [f64; 5] {
        [
            self.resolution,
            self.effort,
            self.accuracy,
            self.compliance,
            self.escalation,
        ]
    }
}

/// Adjustments for the resolution dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionRules {
    pub base: f64,
    /// Per bot redirect when the user never confirmed resolution
    pub redirect_penalty: f64,
    pub final_failure_penalty: f64,
    pub user_resolution_bonus: f64,
    pub helpful_content_bonus: f64,
    pub reask_penalty: f64,
}

impl Default for ResolutionRules {
    fn default() -> Self {
        Self {
            base: 5.0,
            redirect_penalty: 3.0,
            final_failure_penalty: 2.0,
            user_resolution_bonus: 3.0,
            helpful_content_bonus: 2.0,
            reask_penalty: 1.0,
        }
    }
}

/// Adjustments for the customer-effort dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffortRules {
    pub base: f64,
    /// User messages allowed before each extra one costs a point
    pub free_user_turns: usize,
    pub extra_user_turn_penalty: f64,
    pub reask_penalty: f64,
    pub loop_penalty: f64,
    pub quick_resolution_bonus: f64,
    pub quick_resolution_max_turns: usize,
    /// Bot turns before handoff above which escalation is considered late
    pub late_escalation_bot_turns: usize,
    pub late_escalation_penalty: f64,
}

impl Default for EffortRules {
    fn default() -> Self {
        Self {
            base: 8.0,
            free_user_turns: 3,
            extra_user_turn_penalty: 1.0,
            reask_penalty: 2.0,
            loop_penalty: 1.0,
            quick_resolution_bonus: 1.0,
            quick_resolution_max_turns: 3,
            late_escalation_bot_turns: 6,
            late_escalation_penalty: 2.0,
        }
    }
}

/// Adjustments for the accuracy dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyRules {
    pub base: f64,
    pub helpful_content_bonus: f64,
    pub loop_penalty: f64,
    pub generic_penalty: f64,
    pub topic_match_bonus: f64,
    pub topic_match_min_shared: usize,
    pub off_topic_penalty: f64,
    /// The first user message must exceed this many words to judge off-topic
    pub off_topic_min_words: usize,
}

impl Default for AccuracyRules {
    fn default() -> Self {
        Self {
            base: 5.0,
            helpful_content_bonus: 2.0,
            loop_penalty: 2.0,
            generic_penalty: 1.0,
            topic_match_bonus: 2.0,
            topic_match_min_shared: 2,
            off_topic_penalty: 3.0,
            off_topic_min_words: 4,
        }
    }
}

/// Adjustments for the compliance dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceRules {
    pub base: f64,
    pub greeting_bonus: f64,
    pub disclaimer_bonus: f64,
    pub broken_promise_penalty: f64,
    pub graceful_handoff_bonus: f64,
}

impl Default for ComplianceRules {
    fn default() -> Self {
        Self {
            base: 7.0,
            greeting_bonus: 1.0,
            disclaimer_bonus: 1.0,
            broken_promise_penalty: 2.0,
            graceful_handoff_bonus: 1.0,
        }
    }
}

/// Adjustments for the escalation-quality dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationRules {
    pub base: f64,
    /// Bot turns before handoff that carry no penalty
    pub free_bot_turns: usize,
    pub excess_bot_turn_penalty: f64,
    pub context_summary_bonus: f64,
    pub context_lost_penalty: f64,
    pub requested_bonus: f64,
}

impl Default for EscalationRules {
    fn default() -> Self {
        Self {
            base: 5.0,
            free_bot_turns: 4,
            excess_bot_turn_penalty: 1.0,
            context_summary_bonus: 2.0,
            context_lost_penalty: 2.0,
            requested_bonus: 1.0,
        }
    }
}

/// Configuration for single-session analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub reask_threshold: f64,
    pub loop_threshold: f64,
    pub off_topic_threshold: f64,
    /// The earlier of two looping bot messages must exceed this many words
    pub loop_min_words: usize,
    /// A user message must exceed this many words to make an intent miss
    pub substantive_user_words: usize,
    pub max_key_moments: usize,
    /// Characters kept from each message quoted in a key moment
    pub excerpt_chars: usize,
    /// Overall score at or above which the evaluator reports a pass
    pub pass_threshold: f64,
    pub weights: DimensionWeights,
    pub resolution: ResolutionRules,
    pub effort: EffortRules,
    pub accuracy: AccuracyRules,
    pub compliance: ComplianceRules,
    pub escalation: EscalationRules,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reask_threshold: DEFAULT_REASK_THRESHOLD,
            loop_threshold: DEFAULT_LOOP_THRESHOLD,
            off_topic_threshold: DEFAULT_OFF_TOPIC_THRESHOLD,
            loop_min_words: 3,
            substantive_user_words: 3,
            max_key_moments: DEFAULT_MAX_KEY_MOMENTS,
            excerpt_chars: 200,
            pass_threshold: 6.0,
            weights: DimensionWeights::default(),
            resolution: ResolutionRules::default(),
            effort: EffortRules::default(),
            accuracy: AccuracyRules::default(),
            compliance: ComplianceRules::default(),
            escalation: EscalationRules::default(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("reask_threshold", self.reask_threshold),
            ("loop_threshold", self.loop_threshold),
            ("off_topic_threshold", self.off_topic_threshold),
        ] {
            check_ratio(name, value)?;
        }

        if self.max_key_moments == 0 {
            return Err(ConvoscopeError::Config(
                "max_key_moments must be at least 1".to_string(),
            ));
        }

        if !(0.0..=MAX_DIMENSION_SCORE).contains(&self.pass_threshold) {
            return Err(ConvoscopeError::Config(format!(
                "pass_threshold must be within 0-10, got {}",
                self.pass_threshold
            )));
        }

        let weights = self.weights.all();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConvoscopeError::Config(
                "dimension weights must be finite and non-negative".to_string(),
            ));
        }
        // Escalation may be absent, so the other four alone must carry weight
        if weights[..4].iter().sum::<f64>() <= 0.0 {
            return Err(ConvoscopeError::Config(
                "resolution, effort, accuracy and compliance weights sum to zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration for corpus-wide batch analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub failure_penalty: f64,
    pub dead_end_penalty: f64,
    pub frustration_penalty: f64,
    pub loop_penalty: f64,
    pub escalation_penalty: f64,
    pub verbose_penalty: f64,
    pub resolution_bonus: f64,
    pub reask_threshold: f64,
    pub loop_threshold: f64,
    pub loop_min_words: usize,
    /// Mean bot message length (in words) above which a session is verbose
    pub verbose_word_threshold: usize,
    /// Characters kept from a failing bot reply when clustering
    pub preview_chars: usize,
    /// Entries kept in each frequency ranking of the corpus report
    pub top_n: usize,
    /// Worker threads; `None` uses the available parallelism
    pub workers: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            failure_penalty: 3.0,
            dead_end_penalty: 2.0,
            frustration_penalty: 2.0,
            loop_penalty: 2.0,
            escalation_penalty: 1.0,
            verbose_penalty: 0.5,
            resolution_bonus: 1.0,
            reask_threshold: DEFAULT_REASK_THRESHOLD,
            loop_threshold: DEFAULT_LOOP_THRESHOLD,
            loop_min_words: 3,
            verbose_word_threshold: 80,
            preview_chars: 120,
            top_n: 10,
            workers: None,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        check_ratio("batch.reask_threshold", self.reask_threshold)?;
        check_ratio("batch.loop_threshold", self.loop_threshold)?;

        if self.workers == Some(0) {
            return Err(ConvoscopeError::Config(
                "batch.workers must be at least 1".to_string(),
            ));
        }
        if self.preview_chars == 0 {
            return Err(ConvoscopeError::Config(
                "batch.preview_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_ratio(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConvoscopeError::Config(format!(
            "{} must be within 0.0-1.0, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ScoringConfig::default();
        assert_eq!(config.reask_threshold, 0.5);
        assert_eq!(config.loop_threshold, 0.7);
        assert_eq!(config.off_topic_threshold, 0.05);
        assert_eq!(config.max_key_moments, 5);
        assert!(config.validate().is_ok());
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let config = ConvoscopeConfig::from_toml_str(
            r#"
            [scoring]
            reask_threshold = 0.6

            [scoring.weights]
            resolution = 0.4

            [batch]
            workers = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.scoring.reask_threshold, 0.6);
        assert_eq!(config.scoring.loop_threshold, 0.7);
        assert_eq!(config.scoring.weights.resolution, 0.4);
        assert_eq!(config.scoring.weights.effort, 0.25);
        assert_eq!(config.batch.workers, Some(2));
        assert_eq!(config.batch.failure_penalty, 3.0);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let err = ConvoscopeConfig::from_toml_str("[scoring]\nloop_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ConvoscopeError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_workers() {
        let err = ConvoscopeConfig::from_toml_str("[batch]\nworkers = 0\n").unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_rejects_zero_core_weights() {
        let mut config = ScoringConfig::default();
        config.weights.resolution = 0.0;
        config.weights.effort = 0.0;
        config.weights.accuracy = 0.0;
        config.weights.compliance = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scoring]\nmax_key_moments = 3").unwrap();

        let config = ConvoscopeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scoring.max_key_moments, 3);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConvoscopeConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConvoscopeError::Io(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ConvoscopeConfig::from_toml_str("[scoring\n").unwrap_err();
        assert!(matches!(err, ConvoscopeError::Toml(_)));
    }
}
