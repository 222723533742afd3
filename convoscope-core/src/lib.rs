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

//! Convoscope Core
//!
//! Data structures shared by the conversation-quality engine and its callers:
//! transcript messages, analysis results, batch records and configuration.

pub mod analysis;
pub mod batch;
pub mod config;
pub mod error;
pub mod eval_result;
pub mod message;
pub mod moment;

pub use analysis::{
    format_duration, AnalysisResult, Outcome, QualityScores, ScoreDimension, SessionSummary,
};
pub use batch::{
    BatchOutput, BatchSessionRecord, CorpusMessage, CorpusReport, Detector, DetectorStat,
    HistogramBucket, IntentAnnotation, IntentBreakdown, RankedText, SessionClassification,
};
pub use config::{
    AccuracyRules, BatchConfig, ComplianceRules, ConvoscopeConfig, DimensionWeights,
    EffortRules, EscalationRules, ResolutionRules, ScoringConfig, DEFAULT_LOOP_THRESHOLD,
    DEFAULT_MAX_KEY_MOMENTS, DEFAULT_OFF_TOPIC_THRESHOLD, DEFAULT_REASK_THRESHOLD,
    MAX_DIMENSION_SCORE, MIN_DIMENSION_SCORE,
};
pub use error::{ConvoscopeError, Result};
pub use eval_result::{EvalResult, MetricValue};
pub use message::{Message, RawMessage, Role, Session, SessionMetadata};
pub use moment::{KeyMoment, MomentExcerpt, MomentType};
