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

//! Batch session analysis over a corpus
//!
//! Each session goes through a reduced single-pass scorer producing a
//! [`BatchSessionRecord`]. Corpus statistics are a fold over those records
//! with a [`CorpusAccumulator`] whose `merge` only sums counts and unions
//! maps, so partitions can be folded on separate threads and combined in any
//! order with the same result.

use crate::classifier::classify_sender;
use crate::key_moments::{find_bot_loops, find_reasks};
use crate::patterns::{PatternCatalog, Signal};
use crate::similarity::word_count;
use convoscope_core::{
    BatchConfig, BatchOutput, BatchSessionRecord, CorpusMessage, CorpusReport, Detector,
    DetectorStat, HistogramBucket, IntentAnnotation, IntentBreakdown, Message, RankedText, Role,
    SessionClassification,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::thread;
use tracing::{debug, info};

const UNKNOWN_INTENT: &str = "unknown";

const HISTOGRAM_RANGES: [&str; 5] = ["0-1", "2-3", "4-5", "6-7", "8-10"];

/// Runs the reduced scorer across a corpus of sessions
#[derive(Debug, Clone, Default)]
pub struct BatchAnalyzer {
    config: BatchConfig,
    catalog: PatternCatalog,
}

impl BatchAnalyzer {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            catalog: PatternCatalog::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: PatternCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Score one session in a single pass over its messages.
    pub fn analyze_session(&self, session_id: &str, raw: &[CorpusMessage]) -> BatchSessionRecord {
        let messages: Vec<Message> = raw
            .iter()
            .enumerate()
            .map(|(index, entry)| Message {
                index,
                role: classify_sender(&entry.sender),
                text: entry.text.clone(),
                timestamp: None,
            })
            .collect();

        let mut primary_intent: Option<(String, f64)> = None;
        let mut search_queries = Vec::new();
        let mut malformed_annotations = 0;

        for (index, entry) in raw.iter().enumerate() {
            let Some(raw_intent) = &entry.intent else {
                continue;
            };
            let Some(annotation) = parse_annotation(raw_intent) else {
                malformed_annotations += 1;
                debug!(session_id, index, "Skipping malformed intent annotation");
                continue;
            };

            if primary_intent.is_none() {
                if let Some(intent) = annotation.intent_type.as_deref().map(str::trim) {
                    if !intent.is_empty() {
                        primary_intent =
                            Some((intent.to_string(), annotation.confidence.unwrap_or(0.0)));
                    }
                }
            }
            if let Some(query) = annotation.search_query.as_deref().map(str::trim) {
                if !query.is_empty() {
                    search_queries.push(query.to_string());
                }
            }
        }

        let mut record = BatchSessionRecord {
            session_id: session_id.to_string(),
            message_count: messages.len(),
            bot_count: 0,
            user_count: 0,
            agent_count: 0,
            primary_intent: String::new(),
            confidence: 0.0,
            score: 0.0,
            classification: SessionClassification::Unclassified,
            has_failure: false,
            has_dead_end: false,
            has_frustration: false,
            has_loop: false,
            has_escalation: false,
            has_resolution: false,
            is_verbose: false,
            failure_previews: Vec::new(),
            search_queries,
            malformed_annotations,
        };
        let (intent, confidence) =
            primary_intent.unwrap_or_else(|| (UNKNOWN_INTENT.to_string(), 0.0));
        record.primary_intent = intent;
        record.confidence = confidence;

        let mut bot_words = 0;
        for message in &messages {
            match message.role {
                Role::EndUser => {
                    record.user_count += 1;
                    record.has_frustration |= self.matches(Signal::Frustration, message);
                    record.has_escalation |= self.matches(Signal::EscalationRequest, message);
                    record.has_resolution |= self.matches(Signal::Resolution, message);
                }
                Role::Bot => {
                    record.bot_count += 1;
                    bot_words += word_count(&message.text);
                    if self.matches(Signal::Failure, message) {
                        record.has_failure = true;
                        let preview = preview(&message.text, self.config.preview_chars);
                        if !record.failure_previews.contains(&preview) {
                            record.failure_previews.push(preview);
                        }
                    }
                    record.has_dead_end |= self.matches(Signal::Redirect, message);
                }
                Role::Agent => record.agent_count += 1,
                Role::System => {}
            }
        }

        record.has_frustration |= !find_reasks(&messages, self.config.reask_threshold).is_empty();
        record.has_loop = !find_bot_loops(
            &messages,
            self.config.loop_threshold,
            self.config.loop_min_words,
        )
        .is_empty();
        record.is_verbose = record.bot_count > 0
            && bot_words as f64 / record.bot_count as f64
                > self.config.verbose_word_threshold as f64;

        record.score = self.composite_score(&record);
        record.classification = classify_record(&record);
        record
    }

    /// Analyze every session and aggregate the corpus, in parallel.
    ///
    /// Records come back sorted by session id whatever the worker count.
    pub fn run(&self, corpus: &BTreeMap<String, Vec<CorpusMessage>>) -> BatchOutput {
        let sessions: Vec<(&String, &Vec<CorpusMessage>)> = corpus.iter().collect();
        let workers = self
            .config
            .workers
            .unwrap_or_else(|| thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
            .clamp(1, sessions.len().max(1));
        let chunk_size = sessions.len().div_ceil(workers).max(1);

        info!(sessions = sessions.len(), workers, "Starting batch analysis");

        let partials: Vec<(Vec<BatchSessionRecord>, CorpusAccumulator)> = thread::scope(|scope| {
            let handles: Vec<_> = sessions
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        let mut accumulator = CorpusAccumulator::default();
                        let mut records = Vec::with_capacity(chunk.len());
                        for (session_id, messages) in chunk {
                            let record = self.analyze_session(session_id, messages);
                            accumulator.add(&record);
                            records.push(record);
                        }
                        (records, accumulator)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect()
        });

        let mut records = Vec::with_capacity(sessions.len());
        let mut accumulator = CorpusAccumulator::default();
        for (partition, partial) in partials {
            records.extend(partition);
            accumulator.merge(partial);
        }

        let report = accumulator.finish(self.config.top_n);
        info!(
            sessions = report.total_sessions,
            average_score = report.average_score,
            malformed_annotations = report.malformed_annotations,
            "Batch analysis complete"
        );

        BatchOutput { records, report }
    }

    fn composite_score(&self, record: &BatchSessionRecord) -> f64 {
        let c = &self.config;
        let mut score = 10.0;
        for (flag, penalty) in [
            (record.has_failure, c.failure_penalty),
            (record.has_dead_end, c.dead_end_penalty),
            (record.has_frustration, c.frustration_penalty),
            (record.has_loop, c.loop_penalty),
            (record.has_escalation, c.escalation_penalty),
            (record.is_verbose, c.verbose_penalty),
        ] {
            if flag {
                score -= penalty;
            }
        }
        if record.has_resolution {
            score += c.resolution_bonus;
        }
        score.clamp(0.0, 10.0)
    }

    fn matches(&self, signal: Signal, message: &Message) -> bool {
        self.catalog.matches(signal, &message.text)
    }
}

/// Mutually exclusive label, first matching rule wins.
pub fn classify_record(record: &BatchSessionRecord) -> SessionClassification {
    if record.has_loop {
        SessionClassification::Looped
    } else if record.has_frustration && record.has_escalation {
        SessionClassification::FrustratedExit
    } else if record.has_escalation {
        SessionClassification::EscalationRequest
    } else if record.has_dead_end {
        SessionClassification::DeadEnd
    } else if record.has_resolution && !record.has_failure {
        SessionClassification::Resolution
    } else if record.has_failure {
        SessionClassification::Failed
    } else {
        SessionClassification::Unclassified
    }
}

/// Parse an intent annotation given inline or as JSON text; `None` when it
/// is not an object of the expected shape.
fn parse_annotation(raw: &Value) -> Option<IntentAnnotation> {
    let value = match raw {
        Value::Object(_) => raw.clone(),
        Value::String(text) => serde_json::from_str(text).ok()?,
        _ => return None,
    };
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

fn preview(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

fn histogram_bucket(score: f64) -> usize {
    match score.floor() as i64 {
        i64::MIN..=1 => 0,
        2 | 3 => 1,
        4 | 5 => 2,
        6 | 7 => 3,
        _ => 4,
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct IntentTally {
    sessions: usize,
    detector_counts: BTreeMap<Detector, usize>,
}

/// Commutative, associative fold over batch records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusAccumulator {
    total_sessions: usize,
    detector_counts: BTreeMap<Detector, usize>,
    intents: BTreeMap<String, IntentTally>,
    failure_texts: BTreeMap<String, usize>,
    search_queries: BTreeMap<String, usize>,
    histogram: [usize; 5],
    classifications: BTreeMap<SessionClassification, usize>,
    score_sum: f64,
    malformed_annotations: usize,
}

impl CorpusAccumulator {
    pub fn add(&mut self, record: &BatchSessionRecord) {
        self.total_sessions += 1;

        let tally = self
            .intents
            .entry(record.primary_intent.clone())
            .or_default();
        tally.sessions += 1;

        for detector in Detector::ALL {
            if record.flag(detector) {
                *self.detector_counts.entry(detector).or_insert(0) += 1;
                *tally.detector_counts.entry(detector).or_insert(0) += 1;
            }
        }

        for text in &record.failure_previews {
            *self.failure_texts.entry(text.clone()).or_insert(0) += 1;
        }
        for query in &record.search_queries {
            *self.search_queries.entry(query.clone()).or_insert(0) += 1;
        }

        self.histogram[histogram_bucket(record.score)] += 1;
        *self
            .classifications
            .entry(record.classification)
            .or_insert(0) += 1;
        self.score_sum += record.score;
        self.malformed_annotations += record.malformed_annotations;
    }

    pub fn merge(&mut self, other: CorpusAccumulator) {
        self.total_sessions += other.total_sessions;
        merge_counts(&mut self.detector_counts, other.detector_counts);
        for (intent, tally) in other.intents {
            let mine = self.intents.entry(intent).or_default();
            mine.sessions += tally.sessions;
            merge_counts(&mut mine.detector_counts, tally.detector_counts);
        }
        merge_counts(&mut self.failure_texts, other.failure_texts);
        merge_counts(&mut self.search_queries, other.search_queries);
        for (bucket, count) in self.histogram.iter_mut().zip(other.histogram) {
            *bucket += count;
        }
        merge_counts(&mut self.classifications, other.classifications);
        self.score_sum += other.score_sum;
        self.malformed_annotations += other.malformed_annotations;
    }

    pub fn finish(self, top_n: usize) -> CorpusReport {
        let total = self.total_sessions;
        let rate = |count: usize, of: usize| if of == 0 { 0.0 } else { count as f64 / of as f64 };

        let detector_stats = Detector::ALL
            .into_iter()
            .map(|detector| {
                let count = self.detector_counts.get(&detector).copied().unwrap_or(0);
                DetectorStat {
                    detector,
                    count,
                    rate: rate(count, total),
                }
            })
            .collect();

        let mut intent_breakdown: Vec<IntentBreakdown> = self
            .intents
            .into_iter()
            .map(|(intent, tally)| IntentBreakdown {
                rates: Detector::ALL
                    .into_iter()
                    .map(|detector| {
                        let count = tally.detector_counts.get(&detector).copied().unwrap_or(0);
                        (detector, rate(count, tally.sessions))
                    })
                    .collect(),
                intent,
                sessions: tally.sessions,
            })
            .collect();
        intent_breakdown
            .sort_by(|a, b| b.sessions.cmp(&a.sessions).then_with(|| a.intent.cmp(&b.intent)));

        let score_histogram = HISTOGRAM_RANGES
            .iter()
            .zip(self.histogram)
            .map(|(range, count)| HistogramBucket {
                range: range.to_string(),
                count,
            })
            .collect();

        let average_score = if total == 0 {
            0.0
        } else {
            (self.score_sum / total as f64 * 100.0).round() / 100.0
        };

        CorpusReport {
            total_sessions: total,
            detector_stats,
            intent_breakdown,
            top_failure_responses: top_ranked(self.failure_texts, top_n),
            top_search_queries: top_ranked(self.search_queries, top_n),
            score_histogram,
            classification_counts: self.classifications,
            average_score,
            malformed_annotations: self.malformed_annotations,
        }
    }
}

fn merge_counts<K: Ord>(into: &mut BTreeMap<K, usize>, from: BTreeMap<K, usize>) {
    for (key, count) in from {
        *into.entry(key).or_insert(0) += count;
    }
}

/// Most frequent first, ties broken alphabetically
fn top_ranked(counts: BTreeMap<String, usize>, top_n: usize) -> Vec<RankedText> {
    let mut ranked: Vec<RankedText> = counts
        .into_iter()
        .map(|(text, count)| RankedText { text, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.text.cmp(&b.text)));
    ranked.truncate(top_n);
    ranked
}
