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

//! Integration tests for end-to-end session analysis

use convoscope_core::{
    AnalysisResult, BatchConfig, CorpusMessage, MomentType, Outcome, RawMessage,
    SessionClassification, SessionMetadata,
};
use convoscope_evals::{BatchAnalyzer, SessionAnalyzer};
use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

fn analyze(pairs: &[(&str, &str)]) -> AnalysisResult {
    let raw: Vec<RawMessage> = pairs.iter().map(|(s, t)| RawMessage::new(*s, *t)).collect();
    SessionAnalyzer::default().analyze_raw(&raw, SessionMetadata::default())
}

/// Withdrawal attempt answered with an apology and a redirect
#[test]
fn test_withdraw_failure_scenario() {
    let result = analyze(&[
        ("user", "saya mau withdraw tapi gagal terus"),
        ("bot", "Mohon maaf, tidak bisa membantu, silakan hubungi tim dukungan"),
    ]);

    let first = &result.key_moments[0];
    assert_eq!(first.moment_type, MomentType::FailurePoint);
    assert_eq!(first.turn, 2);
    assert_eq!(first.messages.len(), 2);
    assert!(result.scores.resolution.score < 5.0);
    assert_eq!(result.summary.outcome, Outcome::Unresolved);
}

/// Step-by-step answer followed by thanks
#[test]
fn test_step_by_step_resolution_scenario() {
    let result = analyze(&[
        ("user", "cara reset pin"),
        ("bot", "Berikut langkah-langkahnya: 1. Klik menu Profil 2. Pilih Reset PIN"),
        ("user", "terima kasih, sudah selesai"),
    ]);

    assert_eq!(result.summary.outcome, Outcome::Resolved);
    assert!(result.scores.resolution.score >= 8.0);
    assert!(result
        .key_moments
        .iter()
        .any(|m| m.moment_type == MomentType::Resolution && m.turn == 3));
    assert!(result
        .key_moments
        .iter()
        .any(|m| m.moment_type == MomentType::Positive && m.turn == 2));
}

/// Bot repeats itself
#[test]
fn test_bot_loop_scenario() {
    let result = analyze(&[
        ("user", "status pesanan saya gimana"),
        ("bot", "Pesanan Anda sedang diproses oleh gudang kami hari ini"),
        ("user", "kapan dikirim"),
        ("bot", "Pesanan Anda sedang diproses oleh gudang kami"),
    ]);

    assert!(result
        .key_moments
        .iter()
        .any(|m| m.moment_type == MomentType::BotLoop && m.turn == 4));
    assert!(result.scores.effort.score < 8.0);
    assert!(result.scores.accuracy.score < 5.0);
}

/// Eight bot turns before a human joins, with no context passed
#[test]
fn test_late_handoff_scenario() {
    let mut pairs = vec![("user", "kartu saya terblokir")];
    pairs.extend(std::iter::repeat(("bot", "Sebentar ya")).take(8));
    pairs.push(("agent", "Halo, ada yang bisa saya bantu?"));

    let result = analyze(&pairs);
    let escalation = result.scores.escalation.as_ref().expect("agent joined");

    assert!(escalation.score < 5.0);
    assert_eq!(result.summary.outcome, Outcome::Escalated);
    let handoff = result
        .key_moments
        .iter()
        .find(|m| m.moment_type == MomentType::Escalation)
        .expect("escalation moment");
    assert_eq!(handoff.turn, 10);
    assert_eq!(handoff.explanation, "Human agent joined after 8 bot turns");
}

#[test]
fn test_empty_transcript() {
    let result = analyze(&[]);

    assert_eq!(result.scores.overall, 0.0);
    assert_eq!(result.scores.resolution.score, 0.0);
    assert!(result.scores.escalation.is_none());
    assert!(result.key_moments.is_empty());
    assert_eq!(result.summary.outcome, Outcome::Empty);
    assert_eq!(result.summary.duration, "N/A");
}

/// Unknown senders are kept as system messages and ignored by detectors
#[test]
fn test_unknown_sender_is_ignored() {
    let result = analyze(&[
        ("user", "cek saldo"),
        ("webhook", "Maaf, sistem error"),
        ("bot", "Saldo Anda dapat dilihat di menu Akun"),
    ]);

    assert_eq!(result.summary.total_turns, 3);
    assert!(!result
        .key_moments
        .iter()
        .any(|m| m.moment_type == MomentType::FailurePoint));
}

#[test]
fn test_batch_loop_with_escalation_is_looped() {
    let mut corpus = BTreeMap::new();
    corpus.insert(
        "loop-1".to_string(),
        vec![
            CorpusMessage::new("user", "status refund saya"),
            CorpusMessage::new("bot", "Refund Anda sedang kami proses dalam sistem"),
            CorpusMessage::new("user", "saya mau bicara dengan agen manusia"),
            CorpusMessage::new("bot", "Refund Anda sedang kami proses dalam sistem"),
        ],
    );

    let output = BatchAnalyzer::new(BatchConfig::default()).run(&corpus);
    assert_eq!(output.records.len(), 1);
    assert_eq!(output.records[0].classification, SessionClassification::Looped);
    assert_eq!(
        output.report.classification_counts.get(&SessionClassification::Looped),
        Some(&1)
    );
}

fn sender() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["user", "bot", "agent", "customer", "assistant", "system", "webhook"])
        .prop_map(str::to_string)
}

fn text() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::sample::select(vec![
            "Mohon maaf, tidak bisa membantu",
            "silakan hubungi customer service",
            "terima kasih, sudah berhasil",
            "saya mau bicara dengan agen manusia",
            "Klik menu Profil lalu pilih Reset PIN",
            "Saya mengerti, ada lagi yang bisa dibantu?",
            "Halo! Saya asisten virtual",
            "kami akan segera proses",
            "percuma, masih gagal",
            "Baca panduan di https://help.example.com",
        ])
        .prop_map(str::to_string),
        "[a-z ]{0,50}",
    ]
}

proptest! {
    #[test]
    fn prop_scores_within_bounds(messages in prop::collection::vec((sender(), text()), 1..24)) {
        let raw: Vec<RawMessage> = messages
            .iter()
            .map(|(s, t)| RawMessage::new(s.clone(), t.clone()))
            .collect();
        let result = SessionAnalyzer::default().analyze_raw(&raw, SessionMetadata::default());
        let scores = &result.scores;

        let mut dimensions = vec![
            scores.resolution.score,
            scores.effort.score,
            scores.accuracy.score,
            scores.compliance.score,
            scores.overall,
        ];
        if let Some(escalation) = &scores.escalation {
            dimensions.push(escalation.score);
        }
        for score in dimensions {
            prop_assert!((1.0..=10.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn prop_key_moments_ranked_and_unique(
        messages in prop::collection::vec((sender(), text()), 0..24)
    ) {
        let raw: Vec<RawMessage> = messages
            .iter()
            .map(|(s, t)| RawMessage::new(s.clone(), t.clone()))
            .collect();
        let result = SessionAnalyzer::default().analyze_raw(&raw, SessionMetadata::default());
        let moments = &result.key_moments;

        prop_assert!(moments.len() <= 5);
        for pair in moments.windows(2) {
            prop_assert!(pair[0].severity_rank <= pair[1].severity_rank);
        }
        let turns: HashSet<usize> = moments.iter().map(|m| m.turn).collect();
        prop_assert_eq!(turns.len(), moments.len());
        for moment in moments {
            prop_assert!(moment.turn >= 1 && moment.turn <= raw.len());
        }
    }
}
