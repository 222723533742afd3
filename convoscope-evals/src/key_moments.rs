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

//! Key-moment detection
//!
//! Eight independent detectors scan the whole transcript and each emit
//! candidates keyed by the turn of the triggering message. Candidates are then
//! deduplicated by turn (the most severe type wins), sorted by severity and
//! capped, so a dashboard shows only the handful of most diagnostic turns.

use crate::classifier::positional;
use crate::patterns::{PatternCatalog, Signal};
use crate::similarity::{word_count, word_overlap};
use convoscope_core::{KeyMoment, Message, MomentExcerpt, MomentType, Role, ScoringConfig};
use std::collections::HashSet;

/// A later message that repeats an earlier one of the same role
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repetition {
    /// Index of the repeating (later) message
    pub index: usize,
    pub overlap: f64,
}

/// Successive user messages whose overlap exceeds `threshold`.
pub fn find_reasks(messages: &[Message], threshold: f64) -> Vec<Repetition> {
    successive(messages, Role::EndUser)
        .into_iter()
        .filter_map(|(prev, cur)| {
            let overlap = word_overlap(&prev.text, &cur.text);
            (overlap > threshold).then_some(Repetition {
                index: cur.index,
                overlap,
            })
        })
        .collect()
}

/// Successive bot messages whose overlap exceeds `threshold`, where the
/// earlier one has more than `min_words` words.
pub fn find_bot_loops(
    messages: &[Message],
    threshold: f64,
    min_words: usize,
) -> Vec<Repetition> {
    successive(messages, Role::Bot)
        .into_iter()
        .filter(|(prev, _)| word_count(&prev.text) > min_words)
        .filter_map(|(prev, cur)| {
            let overlap = word_overlap(&prev.text, &cur.text);
            (overlap > threshold).then_some(Repetition {
                index: cur.index,
                overlap,
            })
        })
        .collect()
}

/// Consecutive pairs within one role's own subsequence
fn successive(messages: &[Message], role: Role) -> Vec<(&Message, &Message)> {
    let of_role: Vec<&Message> = messages.iter().filter(|m| m.role == role).collect();
    of_role.windows(2).map(|w| (w[0], w[1])).collect()
}

/// Detects and ranks key moments in a classified transcript
pub struct KeyMomentDetector<'a> {
    catalog: &'a PatternCatalog,
    config: &'a ScoringConfig,
}

impl<'a> KeyMomentDetector<'a> {
    pub fn new(catalog: &'a PatternCatalog, config: &'a ScoringConfig) -> Self {
        Self { catalog, config }
    }

    /// Run all detectors, deduplicate by turn, sort by severity and cap.
    pub fn detect(&self, messages: &[Message]) -> Vec<KeyMoment> {
        let numbered = positional(messages);
        let messages: &[Message] = &numbered;
        let mut candidates = Vec::new();
        candidates.extend(self.failure_points(messages));
        candidates.extend(self.user_frustration(messages));
        candidates.extend(self.redirects(messages));
        candidates.extend(self.intent_misses(messages));
        candidates.extend(self.bot_loops(messages));
        candidates.extend(self.escalation(messages));
        candidates.extend(self.resolution(messages));
        candidates.extend(self.positives(messages));

        rank(candidates, self.config.max_key_moments)
    }

    fn failure_points(&self, messages: &[Message]) -> Vec<KeyMoment> {
        messages
            .iter()
            .filter(|m| m.role == Role::Bot && self.matches(Signal::Failure, m))
            .map(|m| {
                self.moment(
                    MomentType::FailurePoint,
                    messages,
                    m,
                    "Bot replied with an apology or said it could not help",
                )
            })
            .collect()
    }

    fn user_frustration(&self, messages: &[Message]) -> Vec<KeyMoment> {
        let reasks = find_reasks(messages, self.config.reask_threshold);

        messages
            .iter()
            .filter(|m| m.role == Role::EndUser)
            .filter_map(|m| {
                let explanation = if let Some(reask) = reasks.iter().find(|r| r.index == m.index) {
                    format!(
                        "User repeated an earlier question ({:.0}% word overlap)",
                        reask.overlap * 100.0
                    )
                } else if self.matches(Signal::EscalationRequest, m) {
                    "User asked to speak with a human".to_string()
                } else if self.matches(Signal::Frustration, m) {
                    "User expressed frustration".to_string()
                } else {
                    return None;
                };
                Some(self.moment(MomentType::UserFrustration, messages, m, explanation))
            })
            .collect()
    }

    fn redirects(&self, messages: &[Message]) -> Vec<KeyMoment> {
        messages
            .iter()
            .filter(|m| {
                m.role == Role::Bot
                    && self.matches(Signal::Redirect, m)
                    && !self.matches(Signal::Failure, m)
            })
            .map(|m| {
                self.moment(
                    MomentType::Redirect,
                    messages,
                    m,
                    "Bot deferred the user to another channel",
                )
            })
            .collect()
    }

    fn intent_misses(&self, messages: &[Message]) -> Vec<KeyMoment> {
        messages
            .iter()
            .filter(|m| {
                m.role == Role::Bot
                    && self.matches(Signal::GenericResponse, m)
                    && !self.matches(Signal::ActionableContent, m)
                    && !self.matches(Signal::Failure, m)
                    && !self.matches(Signal::Redirect, m)
            })
            .filter(|m| {
                preceding(messages, m.index, Role::EndUser)
                    .map(|user| word_count(&user.text) > self.config.substantive_user_words)
                    .unwrap_or(false)
            })
            .map(|m| {
                self.moment(
                    MomentType::IntentMiss,
                    messages,
                    m,
                    "Bot answered a specific question with generic boilerplate",
                )
            })
            .collect()
    }

    fn bot_loops(&self, messages: &[Message]) -> Vec<KeyMoment> {
        find_bot_loops(
            messages,
            self.config.loop_threshold,
            self.config.loop_min_words,
        )
        .into_iter()
        .map(|repetition| {
            let message = &messages[repetition.index];
            self.moment(
                MomentType::BotLoop,
                messages,
                message,
                format!(
                    "Bot repeated its previous reply ({:.0}% word overlap)",
                    repetition.overlap * 100.0
                ),
            )
        })
        .collect()
    }

    fn escalation(&self, messages: &[Message]) -> Option<KeyMoment> {
        let agent = messages.iter().find(|m| m.role == Role::Agent)?;
        let bot_turns = messages[..agent.index]
            .iter()
            .filter(|m| m.role == Role::Bot)
            .count();
        Some(self.moment(
            MomentType::Escalation,
            messages,
            agent,
            format!("Human agent joined after {} bot turns", bot_turns),
        ))
    }

    fn resolution(&self, messages: &[Message]) -> Option<KeyMoment> {
        let message = messages
            .iter()
            .rev()
            .filter(|m| m.index >= 1 && m.role != Role::System)
            .find(|m| self.matches(Signal::Resolution, m))?;
        let explanation = match message.role {
            Role::EndUser => "User confirmed the issue is resolved",
            _ => "Conversation closes with a resolution message",
        };
        Some(self.moment(MomentType::Resolution, messages, message, explanation))
    }

    fn positives(&self, messages: &[Message]) -> Vec<KeyMoment> {
        messages
            .iter()
            .filter(|m| {
                m.role == Role::Bot
                    && (self.matches(Signal::KnowledgeReference, m)
                        || self.matches(Signal::ActionableContent, m))
                    && !self.matches(Signal::Failure, m)
            })
            .map(|m| {
                self.moment(
                    MomentType::Positive,
                    messages,
                    m,
                    "Bot shared actionable steps or a knowledge reference",
                )
            })
            .collect()
    }

    fn matches(&self, signal: Signal, message: &Message) -> bool {
        self.catalog.matches(signal, &message.text)
    }

    /// Build a moment quoting the trigger and, where natural, the nearest
    /// earlier message from the other side of the conversation.
    fn moment(
        &self,
        moment_type: MomentType,
        messages: &[Message],
        trigger: &Message,
        explanation: impl Into<String>,
    ) -> KeyMoment {
        let mut excerpts = Vec::with_capacity(2);
        if let Some(context) =
            counterpart(trigger.role).and_then(|role| preceding(messages, trigger.index, role))
        {
            excerpts.push(self.excerpt(context));
        }
        excerpts.push(self.excerpt(trigger));

        KeyMoment::new(
            moment_type,
            trigger.turn(),
            messages.len(),
            excerpts,
            explanation,
        )
    }

    fn excerpt(&self, message: &Message) -> MomentExcerpt {
        MomentExcerpt {
            role: message.role,
            text: truncate_chars(&message.text, self.config.excerpt_chars),
        }
    }
}

/// Deduplicate by turn keeping the most severe, sort by severity then turn, cap.
fn rank(mut candidates: Vec<KeyMoment>, cap: usize) -> Vec<KeyMoment> {
    candidates.sort_by_key(|m| (m.severity_rank, m.turn));

    let mut seen_turns = HashSet::new();
    candidates.retain(|m| seen_turns.insert(m.turn));
    candidates.truncate(cap);
    candidates
}

fn counterpart(role: Role) -> Option<Role> {
    match role {
        Role::Bot | Role::Agent => Some(Role::EndUser),
        Role::EndUser => Some(Role::Bot),
        Role::System => None,
    }
}

/// Nearest message before `index` with the given role
fn preceding(messages: &[Message], index: usize, role: Role) -> Option<&Message> {
    messages[..index.min(messages.len())]
        .iter()
        .rev()
        .find(|m| m.role == role)
}

/// Truncate on a char boundary, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}…", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify;
    use convoscope_core::RawMessage;

    fn detect(raw: &[(&str, &str)]) -> Vec<KeyMoment> {
        let raw: Vec<RawMessage> = raw.iter().map(|(s, t)| RawMessage::new(*s, *t)).collect();
        let messages = classify(&raw);
        let config = ScoringConfig::default();
        KeyMomentDetector::new(PatternCatalog::builtin(), &config).detect(&messages)
    }

    fn types(moments: &[KeyMoment]) -> Vec<MomentType> {
        moments.iter().map(|m| m.moment_type).collect()
    }

    #[test]
    fn test_failure_wins_over_redirect_on_same_turn() {
        let moments = detect(&[
            ("user", "saya mau withdraw tapi gagal terus"),
            ("bot", "Mohon maaf, tidak bisa membantu, silakan hubungi tim dukungan"),
        ]);

        let at_turn_two: Vec<_> = moments.iter().filter(|m| m.turn == 2).collect();
        assert_eq!(at_turn_two.len(), 1);
        assert_eq!(at_turn_two[0].moment_type, MomentType::FailurePoint);
        assert_eq!(at_turn_two[0].severity_rank, 1);
        assert_eq!(at_turn_two[0].total_turns, 2);
        // user context first, then the bot trigger
        assert_eq!(at_turn_two[0].messages.len(), 2);
        assert_eq!(at_turn_two[0].messages[0].role, Role::EndUser);
        assert_eq!(at_turn_two[0].messages[1].role, Role::Bot);
    }

    #[test]
    fn test_redirect_without_failure() {
        let moments = detect(&[
            ("user", "bagaimana cara ganti nomor telepon"),
            ("bot", "Untuk perubahan data silakan hubungi call center kami"),
        ]);
        assert_eq!(types(&moments), vec![MomentType::Redirect]);
    }

    #[test]
    fn test_reask_is_user_frustration() {
        let moments = detect(&[
            ("user", "kenapa saldo saya belum masuk"),
            ("bot", "Saldo biasanya masuk dalam 1x24 jam"),
            ("user", "saldo saya belum masuk sampai sekarang"),
        ]);
        let frustration = moments
            .iter()
            .find(|m| m.moment_type == MomentType::UserFrustration)
            .unwrap();
        assert_eq!(frustration.turn, 3);
        assert!(frustration.explanation.contains("repeated"));
    }

    #[test]
    fn test_escalation_request_is_user_frustration() {
        let moments = detect(&[
            ("bot", "Halo, ada yang bisa dibantu?"),
            ("user", "saya mau bicara dengan agen manusia"),
        ]);
        assert!(moments
            .iter()
            .any(|m| m.moment_type == MomentType::UserFrustration && m.turn == 2));
    }

    #[test]
    fn test_intent_miss_requires_substantive_question() {
        let moments = detect(&[
            ("user", "bagaimana cara menaikkan limit kartu kredit saya"),
            ("bot", "Saya mengerti kebutuhan Anda"),
        ]);
        assert_eq!(types(&moments), vec![MomentType::IntentMiss]);

        let moments = detect(&[("user", "limit?"), ("bot", "Saya mengerti kebutuhan Anda")]);
        assert!(moments.is_empty());
    }

    #[test]
    fn test_bot_loop() {
        let moments = detect(&[
            ("user", "status pesanan saya gimana"),
            ("bot", "Pesanan Anda sedang diproses oleh gudang kami hari ini"),
            ("user", "kapan dikirim"),
            ("bot", "Pesanan Anda sedang diproses oleh gudang kami"),
        ]);
        let bot_loop = moments
            .iter()
            .find(|m| m.moment_type == MomentType::BotLoop)
            .unwrap();
        assert_eq!(bot_loop.turn, 4);
    }

    #[test]
    fn test_only_first_agent_message_is_escalation() {
        let moments = detect(&[
            ("user", "tolong cek transaksi"),
            ("bot", "Sebentar ya"),
            ("agent", "Halo, saya Rina dari tim layanan"),
            ("agent", "Transaksi sudah saya cek"),
        ]);
        let escalations: Vec<_> = moments
            .iter()
            .filter(|m| m.moment_type == MomentType::Escalation)
            .collect();
        assert_eq!(escalations.len(), 1);
        assert_eq!(escalations[0].turn, 3);
        assert!(escalations[0].explanation.contains("1 bot turns"));
    }

    #[test]
    fn test_resolution_and_positive() {
        let moments = detect(&[
            ("user", "cara reset pin"),
            ("bot", "Berikut langkah-langkahnya: 1. Klik menu Profil 2. Pilih Reset PIN"),
            ("user", "terima kasih, sudah selesai"),
        ]);
        assert_eq!(
            types(&moments),
            vec![MomentType::Resolution, MomentType::Positive]
        );
        assert_eq!(moments[0].turn, 3);
        assert_eq!(moments[1].turn, 2);
    }

    #[test]
    fn test_system_messages_ignored() {
        let moments = detect(&[
            ("webhook", "Mohon maaf, sistem error"),
            ("webhook", "terima kasih"),
        ]);
        assert!(moments.is_empty());
    }

    #[test]
    fn test_cap_sort_and_unique_turns() {
        let mut raw = Vec::new();
        for _ in 0..6 {
            raw.push(("user", "withdraw saya gagal terus kenapa ini"));
            raw.push(("bot", "Mohon maaf, sistem sedang gangguan"));
        }
        let moments = detect(&raw);

        assert_eq!(moments.len(), 5);
        assert!(moments.windows(2).all(|w| w[0].severity_rank <= w[1].severity_rank));
        let turns: HashSet<usize> = moments.iter().map(|m| m.turn).collect();
        assert_eq!(turns.len(), moments.len());
        assert!(moments.iter().all(|m| m.moment_type == MomentType::FailurePoint));
    }

    #[test]
    fn test_empty_transcript() {
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("halo", 10), "halo");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo…");
    }
}
