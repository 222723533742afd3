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

//! # Convoscope Evaluation Engine
//!
//! Heuristic quality scoring for Indonesian/English customer-support chats.
//!
//! ## Features
//!
//! - **Pattern catalog**: Bilingual phrase sets per conversational signal
//! - **Key moments**: Up to five ranked turning points per session
//! - **Quality scores**: Five weighted 1-10 dimensions plus an overall score
//! - **Batch analysis**: Parallel per-session scoring with corpus statistics
//!
//! ## Example
//!
//! ```rust,ignore
//! use convoscope_core::{RawMessage, SessionMetadata};
//! use convoscope_evals::SessionAnalyzer;
//!
//! let analyzer = SessionAnalyzer::default();
//! let result = analyzer.analyze_raw(
//!     &[
//!         RawMessage::new("user", "saya mau withdraw tapi gagal terus"),
//!         RawMessage::new("bot", "Mohon maaf, silakan hubungi tim dukungan"),
//!     ],
//!     SessionMetadata::default(),
//! );
//! println!("{} ({})", result.scores.overall, result.summary.outcome);
//! ```

use convoscope_core::{EvalResult, Result, Session};
use serde::{Deserialize, Serialize};

pub mod analyzer;
pub mod batch;
pub mod classifier;
pub mod key_moments;
pub mod patterns;
pub mod scorer;
pub mod similarity;

pub use analyzer::SessionAnalyzer;
pub use batch::{classify_record, BatchAnalyzer, CorpusAccumulator};
pub use classifier::{build_session, classify, classify_sender, parse_timestamp, positional};
pub use key_moments::{find_bot_loops, find_reasks, KeyMomentDetector, Repetition};
pub use patterns::{PatternCatalog, Signal};
pub use scorer::QualityScorer;
pub use similarity::{shared_significant_words, word_count, word_overlap};

/// Core trait that all session evaluators implement
pub trait Evaluator: Send + Sync {
    /// Unique identifier for this evaluator (e.g., "conversation_quality_v1")
    fn id(&self) -> &str;

    /// Evaluate a single session
    fn evaluate(&self, session: &Session) -> Result<EvalResult>;

    /// Default implementation calls evaluate() for each session
    fn evaluate_batch(&self, sessions: &[Session]) -> Result<Vec<EvalResult>> {
        sessions.iter().map(|session| self.evaluate(session)).collect()
    }

    /// Metadata about this evaluator
    fn metadata(&self) -> EvaluatorMetadata;
}

/// Metadata about an evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorMetadata {
    /// Human-readable name
    pub name: String,

    /// Version string (e.g., "1.0.0")
    pub version: String,

    pub description: String,

    /// Tags for categorization
    pub tags: Vec<String>,

    /// Author/maintainer
    pub author: Option<String>,
}
