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

//! Multi-dimensional conversation quality scoring
//!
//! Every dimension starts from a base score, collects additive adjustments
//! (each recorded as evidence), and is clamped to 1-10. The overall score is
//! the weighted mean of the dimensions that apply:
//!
//! overall = Σ(score_d · w_d) / Σ(w_d)
//!
//! Escalation quality only applies when a human agent took part. Dividing by
//! the present weights rather than 1.0 hands its 10% to the other four
//! dimensions in proportion, so contained sessions are not marked down for it.

use crate::classifier::positional;
use crate::key_moments::{find_bot_loops, find_reasks};
use crate::patterns::{PatternCatalog, Signal};
use crate::similarity::{shared_significant_words, word_count, word_overlap};
use convoscope_core::{
    format_duration, Message, Outcome, QualityScores, Role, ScoreDimension, ScoringConfig,
    Session, SessionSummary, MAX_DIMENSION_SCORE, MIN_DIMENSION_SCORE,
};

/// Per-session facts every dimension draws on, computed in one pass
#[derive(Debug, Clone, Default)]
struct SessionProfile {
    total_turns: usize,
    user_turns: usize,
    bot_turns: usize,
    agent_turns: usize,
    reasks: usize,
    bot_loops: usize,
    bot_redirects: usize,
    generic_without_action: usize,
    any_user_resolution: bool,
    any_helpful_bot: bool,
    final_user_resolution: bool,
    final_bot_failure: bool,
    final_bot_redirect: bool,
    first_agent_index: Option<usize>,
    bot_turns_before_agent: usize,
}

/// Running score for one dimension with its evidence trail
struct Ledger {
    base: f64,
    score: f64,
    notes: Vec<String>,
}

impl Ledger {
    fn new(base: f64) -> Self {
        Self {
            base,
            score: base,
            notes: Vec::new(),
        }
    }

    fn adjust(&mut self, delta: f64, note: impl Into<String>) {
        if delta == 0.0 {
            return;
        }
        self.score += delta;
        self.notes.push(format!("{:+} {}", delta, note.into()));
    }

    fn finish(self, weight: f64) -> ScoreDimension {
        let score = self.score.clamp(MIN_DIMENSION_SCORE, MAX_DIMENSION_SCORE);
        let evidence = if self.notes.is_empty() {
            format!("Base {}; no adjustments", self.base)
        } else {
            format!("Base {}; {}", self.base, self.notes.join("; "))
        };
        ScoreDimension::new(score, weight, evidence)
    }
}

/// Scores sessions on resolution, effort, accuracy, compliance and escalation
pub struct QualityScorer<'a> {
    catalog: &'a PatternCatalog,
    config: &'a ScoringConfig,
}

impl<'a> QualityScorer<'a> {
    pub fn new(catalog: &'a PatternCatalog, config: &'a ScoringConfig) -> Self {
        Self { catalog, config }
    }

    /// Score a session and summarize it. An empty session gets all-zero
    /// scores and the `empty` outcome.
    pub fn score_session(&self, session: &Session) -> (QualityScores, SessionSummary) {
        if session.is_empty() {
            let summary = self.summary(session, &SessionProfile::default(), Outcome::Empty);
            return (self.empty_scores(), summary);
        }

        let messages = positional(&session.messages);
        let profile = self.profile(&messages);
        let outcome = self.outcome(session, &profile);
        let weights = &self.config.weights;

        let resolution = self.score_resolution(&profile);
        let effort = self.score_effort(&profile, outcome);
        let accuracy = self.score_accuracy(&messages, &profile);
        let compliance = self.score_compliance(&messages);
        let escalation = self.score_escalation(&messages, &profile);

        let mut weighted = vec![
            (resolution.score, weights.resolution),
            (effort.score, weights.effort),
            (accuracy.score, weights.accuracy),
            (compliance.score, weights.compliance),
        ];
        if let Some(dim) = &escalation {
            weighted.push((dim.score, weights.escalation));
        }
        let overall = weighted_mean(&weighted);

        let scores = QualityScores {
            resolution,
            effort,
            accuracy,
            compliance,
            escalation,
            overall,
        };
        (scores, self.summary(session, &profile, outcome))
    }

    fn profile(&self, messages: &[Message]) -> SessionProfile {
        let mut profile = SessionProfile {
            total_turns: messages.len(),
            reasks: find_reasks(messages, self.config.reask_threshold).len(),
            bot_loops: find_bot_loops(
                messages,
                self.config.loop_threshold,
                self.config.loop_min_words,
            )
            .len(),
            ..Default::default()
        };

        for message in messages {
            match message.role {
                Role::EndUser => {
                    profile.user_turns += 1;
                    if self.matches(Signal::Resolution, message) {
                        profile.any_user_resolution = true;
                    }
                }
                Role::Bot => {
                    profile.bot_turns += 1;
                    if profile.first_agent_index.is_none() {
                        profile.bot_turns_before_agent += 1;
                    }
                    if self.is_helpful(message) {
                        profile.any_helpful_bot = true;
                    }
                    if self.matches(Signal::Redirect, message) {
                        profile.bot_redirects += 1;
                    }
                    if self.matches(Signal::GenericResponse, message)
                        && !self.matches(Signal::ActionableContent, message)
                    {
                        profile.generic_without_action += 1;
                    }
                }
                Role::Agent => {
                    profile.agent_turns += 1;
                    profile.first_agent_index.get_or_insert(message.index);
                }
                Role::System => {}
            }
        }

        if let Some(last_user) = last_of(messages, Role::EndUser) {
            profile.final_user_resolution = self.matches(Signal::Resolution, last_user);
        }
        if let Some(last_bot) = last_of(messages, Role::Bot) {
            profile.final_bot_failure = self.matches(Signal::Failure, last_bot);
            profile.final_bot_redirect = self.matches(Signal::Redirect, last_bot);
        }
        if profile.first_agent_index.is_none() {
            profile.bot_turns_before_agent = 0;
        }

        profile
    }

    fn score_resolution(&self, p: &SessionProfile) -> ScoreDimension {
        let rules = &self.config.resolution;
        let mut ledger = Ledger::new(rules.base);

        if !p.any_user_resolution && p.bot_redirects > 0 {
            ledger.adjust(
                -rules.redirect_penalty * p.bot_redirects as f64,
                format!("{} redirect(s) without resolution", p.bot_redirects),
            );
        }
        if p.final_bot_failure {
            ledger.adjust(-rules.final_failure_penalty, "final bot reply is a failure");
        }
        if p.any_user_resolution {
            ledger.adjust(rules.user_resolution_bonus, "user confirmed resolution");
        }
        if p.any_helpful_bot {
            ledger.adjust(
                rules.helpful_content_bonus,
                "bot shared actionable or reference content",
            );
        }
        ledger.adjust(
            -rules.reask_penalty * p.reasks as f64,
            format!("{} re-ask(s)", p.reasks),
        );

        ledger.finish(self.config.weights.resolution)
    }

    fn score_effort(&self, p: &SessionProfile, outcome: Outcome) -> ScoreDimension {
        let rules = &self.config.effort;
        let mut ledger = Ledger::new(rules.base);

        let extra_user_turns = p.user_turns.saturating_sub(rules.free_user_turns);
        ledger.adjust(
            -rules.extra_user_turn_penalty * extra_user_turns as f64,
            format!("{} user message(s) beyond {}", extra_user_turns, rules.free_user_turns),
        );
        ledger.adjust(
            -rules.reask_penalty * p.reasks as f64,
            format!("{} re-ask(s)", p.reasks),
        );
        ledger.adjust(
            -rules.loop_penalty * p.bot_loops as f64,
            format!("{} bot loop(s)", p.bot_loops),
        );
        if outcome == Outcome::Resolved && p.total_turns <= rules.quick_resolution_max_turns {
            ledger.adjust(
                rules.quick_resolution_bonus,
                format!("resolved within {} turns", rules.quick_resolution_max_turns),
            );
        }
        if p.first_agent_index.is_some()
            && p.bot_turns_before_agent > rules.late_escalation_bot_turns
        {
            ledger.adjust(
                -rules.late_escalation_penalty,
                format!("escalated only after {} bot turns", p.bot_turns_before_agent),
            );
        }

        ledger.finish(self.config.weights.effort)
    }

    fn score_accuracy(&self, messages: &[Message], p: &SessionProfile) -> ScoreDimension {
        let rules = &self.config.accuracy;
        let mut ledger = Ledger::new(rules.base);

        if p.any_helpful_bot {
            ledger.adjust(
                rules.helpful_content_bonus,
                "bot shared actionable or reference content",
            );
        }
        ledger.adjust(
            -rules.loop_penalty * p.bot_loops as f64,
            format!("{} bot loop(s)", p.bot_loops),
        );
        ledger.adjust(
            -rules.generic_penalty * p.generic_without_action as f64,
            format!("{} generic reply(ies) without action", p.generic_without_action),
        );

        if let Some((user, reply)) = first_exchange(messages) {
            let shared = shared_significant_words(&user.text, &reply.text);
            if shared >= rules.topic_match_min_shared {
                ledger.adjust(
                    rules.topic_match_bonus,
                    format!("first reply shares {} topic words with the question", shared),
                );
            } else if word_overlap(&user.text, &reply.text) < self.config.off_topic_threshold
                && word_count(&user.text) > rules.off_topic_min_words
            {
                ledger.adjust(-rules.off_topic_penalty, "first reply is off-topic");
            }
        }

        ledger.finish(self.config.weights.accuracy)
    }

    fn score_compliance(&self, messages: &[Message]) -> ScoreDimension {
        let rules = &self.config.compliance;
        let mut ledger = Ledger::new(rules.base);
        let bots: Vec<&Message> = messages.iter().filter(|m| m.role == Role::Bot).collect();

        if bots
            .first()
            .is_some_and(|m| self.matches(Signal::Greeting, m))
        {
            ledger.adjust(rules.greeting_bonus, "bot opened with a greeting");
        }
        if bots.iter().any(|m| self.matches(Signal::Disclaimer, m)) {
            ledger.adjust(rules.disclaimer_bonus, "bot disclosed it is an assistant");
        }

        let broken_promise = bots
            .iter()
            .position(|m| self.matches(Signal::Promise, m))
            .is_some_and(|first_promise| {
                bots[first_promise + 1..].iter().any(|m| {
                    self.matches(Signal::Failure, m) || self.matches(Signal::Redirect, m)
                })
            });
        if broken_promise {
            ledger.adjust(
                -rules.broken_promise_penalty,
                "promised a resolution, then failed or redirected",
            );
        }

        if bots
            .iter()
            .any(|m| self.matches(Signal::Redirect, m) && !self.matches(Signal::Failure, m))
        {
            ledger.adjust(
                rules.graceful_handoff_bonus,
                "redirect handled without a failure phrase",
            );
        }

        ledger.finish(self.config.weights.compliance)
    }

    fn score_escalation(&self, messages: &[Message], p: &SessionProfile) -> Option<ScoreDimension> {
        let agent_index = p.first_agent_index?;
        let rules = &self.config.escalation;
        let mut ledger = Ledger::new(rules.base);
        let before_handoff = &messages[..agent_index];

        let excess = p.bot_turns_before_agent.saturating_sub(rules.free_bot_turns);
        ledger.adjust(
            -rules.excess_bot_turn_penalty * excess as f64,
            format!(
                "{} bot turns before handoff ({} allowed)",
                p.bot_turns_before_agent, rules.free_bot_turns
            ),
        );

        if last_of(before_handoff, Role::Bot)
            .is_some_and(|m| self.matches(Signal::ContextSummary, m))
        {
            ledger.adjust(rules.context_summary_bonus, "handoff message summarized the issue");
        }
        if self.matches(Signal::AgentReask, &messages[agent_index]) {
            ledger.adjust(
                -rules.context_lost_penalty,
                "agent re-asked how to help, context not passed",
            );
        }
        if before_handoff
            .iter()
            .any(|m| m.role == Role::EndUser && self.matches(Signal::EscalationRequest, m))
        {
            ledger.adjust(rules.requested_bonus, "user explicitly asked for a human");
        }

        Some(ledger.finish(self.config.weights.escalation))
    }

    /// Session outcome, checked in priority order.
    fn outcome(&self, session: &Session, p: &SessionProfile) -> Outcome {
        if p.agent_turns > 0 || session.metadata.indicates_handoff() {
            Outcome::Escalated
        } else if p.final_user_resolution && !p.final_bot_failure {
            Outcome::Resolved
        } else if p.final_bot_failure || p.final_bot_redirect {
            Outcome::Unresolved
        } else if p.user_turns <= 1 && p.bot_turns <= 2 {
            Outcome::Abandoned
        } else {
            Outcome::Contained
        }
    }

    fn summary(&self, session: &Session, p: &SessionProfile, outcome: Outcome) -> SessionSummary {
        let active = session.active_secs();
        let window = session.metadata.window_secs();
        let duration = active
            .or(window)
            .map(format_duration)
            .unwrap_or_else(|| "N/A".to_string());

        let agent_type = session.metadata.agent_type_hint.clone().unwrap_or_else(|| {
            match (p.bot_turns > 0, p.agent_turns > 0) {
                (true, true) => "hybrid",
                (false, true) => "human",
                (true, false) => "bot",
                (false, false) => "unknown",
            }
            .to_string()
        });

        SessionSummary {
            total_turns: p.total_turns,
            user_turns: p.user_turns,
            bot_turns: p.bot_turns,
            agent_turns: p.agent_turns,
            duration,
            active_duration_secs: active,
            session_window_secs: window,
            outcome,
            agent_type,
        }
    }

    fn empty_scores(&self) -> QualityScores {
        let weights = &self.config.weights;
        QualityScores {
            resolution: ScoreDimension::empty(weights.resolution),
            effort: ScoreDimension::empty(weights.effort),
            accuracy: ScoreDimension::empty(weights.accuracy),
            compliance: ScoreDimension::empty(weights.compliance),
            escalation: None,
            overall: 0.0,
        }
    }

    fn is_helpful(&self, message: &Message) -> bool {
        self.matches(Signal::KnowledgeReference, message)
            || self.matches(Signal::ActionableContent, message)
    }

    fn matches(&self, signal: Signal, message: &Message) -> bool {
        self.catalog.matches(signal, &message.text)
    }
}

/// Weighted mean over (score, weight) pairs, rounded to one decimal.
fn weighted_mean(weighted: &[(f64, f64)]) -> f64 {
    let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let sum: f64 = weighted.iter().map(|(s, w)| s * w).sum();
    round1(sum / total_weight)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn last_of(messages: &[Message], role: Role) -> Option<&Message> {
    messages.iter().rev().find(|m| m.role == role)
}

/// The first user message and the first bot reply after it
fn first_exchange(messages: &[Message]) -> Option<(&Message, &Message)> {
    let position = messages.iter().position(|m| m.role == Role::EndUser)?;
    let reply = messages[position + 1..]
        .iter()
        .find(|m| m.role == Role::Bot)?;
    Some((&messages[position], reply))
}
