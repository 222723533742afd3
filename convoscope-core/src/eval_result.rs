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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type-safe metric values for evaluation outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    String(String),
}

/// Generic evaluation result, so session scoring can sit beside other evaluators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    /// ID of the evaluator that produced this result
    pub evaluator_id: String,

    /// Optional evaluator type/category (rule-based, llm, hybrid)
    #[serde(default)]
    pub evaluator_type: Option<String>,

    /// Metrics computed by the evaluator
    pub metrics: HashMap<String, MetricValue>,

    /// Whether the session passed evaluation
    pub passed: bool,

    /// Human-readable explanation of the result
    pub explanation: Option<String>,

    /// Evidence references (e.g. "turn:3")
    #[serde(default)]
    pub evidence_refs: Vec<String>,

    /// Confidence score (0.0 - 1.0)
    pub confidence: f64,

    /// Duration of evaluation in milliseconds
    pub duration_ms: Option<u64>,
}
