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

//! Pattern catalog for conversation signals
//!
//! Each [`Signal`] owns a case-insensitive set of Indonesian and English
//! phrase patterns. A text carries a signal when any pattern of the set
//! matches anywhere in it. The sets are deliberately broad: in a monitoring
//! tool a missed failure costs more than a false alarm.
//!
//! Matching goes through [`regex::RegexSet::is_match`], which always scans the
//! whole text from the start and keeps no cursor between calls, so a catalog
//! can be shared freely across threads.

use convoscope_core::{ConvoscopeError, Result};
use once_cell::sync::Lazy;
use regex::{RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// A named conversational signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Apology or inability to help
    Failure,
    /// Deferral to another channel
    Redirect,
    Frustration,
    /// Gratitude or confirmation that the issue is solved
    Resolution,
    /// User asks for a human
    EscalationRequest,
    /// Links, articles, guides
    KnowledgeReference,
    Greeting,
    /// AI-assistant notice
    Disclaimer,
    /// Promise that the issue will be handled
    Promise,
    /// Empathy boilerplate with no substance
    GenericResponse,
    /// Imperative steps, menu paths, links
    ActionableContent,
    /// Handoff message that restates the user's issue
    ContextSummary,
    /// Agent opening with a blank "how can I help"
    AgentReask,
}

impl Signal {
    pub const ALL: [Signal; 13] = [
        Signal::Failure,
        Signal::Redirect,
        Signal::Frustration,
        Signal::Resolution,
        Signal::EscalationRequest,
        Signal::KnowledgeReference,
        Signal::Greeting,
        Signal::Disclaimer,
        Signal::Promise,
        Signal::GenericResponse,
        Signal::ActionableContent,
        Signal::ContextSummary,
        Signal::AgentReask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Failure => "failure",
            Signal::Redirect => "redirect",
            Signal::Frustration => "frustration",
            Signal::Resolution => "resolution",
            Signal::EscalationRequest => "escalation_request",
            Signal::KnowledgeReference => "knowledge_reference",
            Signal::Greeting => "greeting",
            Signal::Disclaimer => "disclaimer",
            Signal::Promise => "promise",
            Signal::GenericResponse => "generic_response",
            Signal::ActionableContent => "actionable_content",
            Signal::ContextSummary => "context_summary",
            Signal::AgentReask => "agent_reask",
        }
    }

    fn builtin_patterns(&self) -> &'static [&'static str] {
        match self {
            Signal::Failure => FAILURE,
            Signal::Redirect => REDIRECT,
            Signal::Frustration => FRUSTRATION,
            Signal::Resolution => RESOLUTION,
            Signal::EscalationRequest => ESCALATION_REQUEST,
            Signal::KnowledgeReference => KNOWLEDGE_REFERENCE,
            Signal::Greeting => GREETING,
            Signal::Disclaimer => DISCLAIMER,
            Signal::Promise => PROMISE,
            Signal::GenericResponse => GENERIC_RESPONSE,
            Signal::ActionableContent => ACTIONABLE_CONTENT,
            Signal::ContextSummary => CONTEXT_SUMMARY,
            Signal::AgentReask => AGENT_REASK,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signal {
    type Err = ConvoscopeError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Signal::ALL
            .into_iter()
            .find(|signal| signal.as_str() == normalized)
            .ok_or_else(|| ConvoscopeError::Config(format!("Unknown signal: {}", s)))
    }
}

const FAILURE: &[&str] = &[
    r"\bmohon maaf\b",
    r"\bmaaf\b",
    r"\b(tidak|belum|gak|ga) (bisa|dapat) (membantu|menemukan|memproses|menjawab|diproses)",
    r"\b(tidak|kurang) (mengerti|paham|memahami)\b",
    r"\bterjadi (kesalahan|gangguan)\b",
    r"\bsorry\b",
    r"\bapologi[sz]e",
    r"\bunable to\b",
    r"\bnot able to\b",
    r"\bcan(not|'t) (help|find|process|answer|assist)",
    r"\bi (don't|do not) (understand|know)\b",
    r"\bsomething went wrong\b",
];

const REDIRECT: &[&str] = &[
    r"\bsilah?kan (hubungi|menghubungi|kontak|kunjungi|mengunjungi|email|telepon)",
    r"\b(dapat|bisa) (menghubungi|kontak|mengunjungi)\b",
    r"\bhubungi (kami|tim|cs|customer|call|layanan|admin|nomor)",
    r"\b(tim|layanan) (dukungan|support|pelanggan)\b",
    r"\bcall cent(er|re)\b",
    r"\bcustomer (service|care|support)\b",
    r"\bcontact (us|our|the|support|customer)\b",
    r"\breach out to\b",
    r"\bemail (us|ke|kami)\b",
    r"\bkantor cabang\b",
    r"\bvisit (our|the|a) (branch|office|store)\b",
];

const FRUSTRATION: &[&str] = &[
    r"\bgagal terus\b",
    r"\b(masih|tetap) (gagal|error|tidak bisa|belum bisa|gak bisa|ga bisa)\b",
    r"\btidak membantu\b",
    r"\b(gak|ga|nggak|ngga|enggak) (membantu|jelas|guna|nyambung)\b",
    r"\bkecewa\b",
    r"\bkesal\b",
    r"\bparah\b",
    r"\bpercuma\b",
    r"\blama (banget|sekali)\b",
    r"\bberkali[- ]kali\b",
    r"\bsudah (berulang|berkali)",
    r"\buseless\b",
    r"\bnot helpful\b",
    r"\bfrustrat",
    r"\bannoying\b",
    r"\bridiculous\b",
    r"\bstill (not|doesn't|isn't|broken|failing)\b",
    r"\?{2,}",
    r"!{2,}",
];

const RESOLUTION: &[&str] = &[
    r"\bterima ?kasih\b",
    r"\bmakasih\b",
    r"\bthanks?\b",
    r"\bthx\b",
    r"\bsudah (selesai|berhasil|bisa|beres|teratasi|masuk)\b",
    r"\bberhasil\b",
    r"\bteratasi\b",
    r"\bmantap\b",
    r"\b(problem|issue) solved\b",
    r"\bworks now\b",
    r"\b(solved|resolved|fixed)\b",
];

const ESCALATION_REQUEST: &[&str] = &[
    r"\b(bicara|ngobrol|chat|hubungkan|sambungkan|minta|mau) (dengan |ke |sama )?(agen|agent|cs|operator|admin|manusia|orang asli)\b",
    r"\b(agen|petugas|cs) (manusia|asli)\b",
    r"\blive (agent|chat|person)\b",
    r"\b(talk|speak|chat) (to|with) (a |an )?(human|agent|person|representative|someone|real)",
    r"\breal person\b",
    r"\bhuman agent\b",
    r"\b(transfer|connect) me\b",
];

const KNOWLEDGE_REFERENCE: &[&str] = &[
    r"https?://",
    r"\bwww\.",
    r"\bartikel\b",
    r"\bpanduan\b",
    r"\bfaq\b",
    r"\bpusat bantuan\b",
    r"\bhelp cent(er|re)\b",
    r"\barticle\b",
    r"\bguide\b",
    r"\bdocumentation\b",
    r"\bdokumentasi\b",
    r"\bknowledge base\b",
    r"\btutorial\b",
];

const GREETING: &[&str] = &[
    r"\b(halo|hai|hello|hi|hey)\b",
    r"\bselamat (pagi|siang|sore|malam|datang)\b",
    r"\bwelcome\b",
    r"\bgood (morning|afternoon|evening)\b",
    r"\bterima ?kasih (telah|sudah) menghubungi\b",
    r"\bthanks? (you )?for (contacting|reaching)\b",
];

const DISCLAIMER: &[&str] = &[
    r"\basisten (virtual|ai|digital)\b",
    r"\bvirtual assistant\b",
    r"\bai assistant\b",
    r"\b(saya|aku) (adalah )?(bot|chatbot)\b",
    r"\bi('m| am) (a |an )?(bot|chatbot|ai|automated)\b",
    r"\bautomated (assistant|system|response)\b",
    r"\b(jawaban|pesan|balasan) otomatis\b",
    r"\bdijawab oleh (sistem|bot)\b",
];

const PROMISE: &[&str] = &[
    r"\b(kami|saya) akan (segera )?(bantu|membantu|proses|memproses|selesaikan|menyelesaikan|cek|mengecek|periksa|memeriksa|tindak ?lanjuti)",
    r"\bakan segera (kami )?(proses|diproses|selesaikan|diselesaikan|tangani|ditangani)\b",
    r"\bpasti (bisa|kami bantu)\b",
    r"\bjangan khawatir\b",
    r"\bi('ll| will) (help|fix|resolve|sort|check|look into)\b",
    r"\bwe('ll| will) (help|fix|resolve|sort|check|look into)\b",
    r"\blet me (help|check|fix)\b",
    r"\bdon't worry\b",
];

const GENERIC_RESPONSE: &[&str] = &[
    r"\bsaya (mengerti|paham|memahami)\b",
    r"\bkami (mengerti|memahami)\b",
    r"\bmohon maaf atas ketidaknyamanan",
    r"\bterima ?kasih atas (kesabaran|pertanyaan|informasi)",
    r"\bi understand\b",
    r"\bwe understand\b",
    r"\bsorry for the inconvenience\b",
    r"\bapologi[sz]e for the inconvenience\b",
    r"\bthank you for your (patience|question|message)\b",
    r"\bterkait hal tersebut\b",
    r"\bada lagi yang bisa\b",
    r"\banything else\b",
    r"\bgreat question\b",
];

const ACTIONABLE_CONTENT: &[&str] = &[
    r"\blangkah",
    r"\bklik\b",
    r"\bpilih\b",
    r"\bbuka\b",
    r"\bmasukkan\b",
    r"\btekan\b",
    r"\bmasuk ke\b",
    r"\bcaranya\b",
    r"\bmenu\b",
    r"\bsteps?\b",
    r"\bclick\b",
    r"\bselect\b",
    r"\btap\b",
    r"\bgo to\b",
    r"\bnavigate\b",
    r"\benter your\b",
    r"\bopen the\b",
    r"https?://",
    r"(^|\s)\d+[.)]\s",
];

const CONTEXT_SUMMARY: &[&str] = &[
    r"\bregarding\b",
    r"\babout (your|the)\b",
    r"\bissue\b",
    r"\bproblem\b",
    r"\bterkait\b",
    r"\bmengenai\b",
    r"\btentang\b",
    r"\bmasalah\b",
    r"\bkendala\b",
    r"\bsummary\b",
    r"\bringkasan\b",
];

const AGENT_REASK: &[&str] = &[
    r"\bada yang bisa (saya |kami )?bantu\b",
    r"\bapa yang bisa (saya |kami )?bantu\b",
    r"\bbisa (saya|kami) bantu\b",
    r"\bhow (can|may) (i|we) (help|assist)\b",
    r"\bwhat can i (help|do for)\b",
];

static BUILTIN: Lazy<PatternCatalog> = Lazy::new(|| {
    PatternCatalog::with_overrides(&HashMap::new()).expect("built-in signal patterns compile")
});

/// Compiled pattern sets, one per [`Signal`].
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    sets: HashMap<Signal, RegexSet>,
}

impl PatternCatalog {
    /// Shared catalog compiled from the built-in patterns
    pub fn builtin() -> &'static PatternCatalog {
        &BUILTIN
    }

    /// Compile the built-in patterns plus extra patterns per signal.
    pub fn with_overrides(extra: &HashMap<Signal, Vec<String>>) -> Result<Self> {
        let mut sets = HashMap::with_capacity(Signal::ALL.len());

        for signal in Signal::ALL {
            let mut patterns: Vec<String> = signal
                .builtin_patterns()
                .iter()
                .map(|p| p.to_string())
                .collect();
            if let Some(added) = extra.get(&signal) {
                patterns.extend(added.iter().cloned());
            }

            let set = RegexSetBuilder::new(&patterns)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConvoscopeError::InvalidPattern {
                    signal: signal.to_string(),
                    message: e.to_string(),
                })?;
            sets.insert(signal, set);
        }

        Ok(Self { sets })
    }

    /// Whether `text` carries `signal`.
    pub fn matches(&self, signal: Signal, text: &str) -> bool {
        self.sets
            .get(&signal)
            .map(|set| set.is_match(text))
            .unwrap_or(false)
    }

    /// Every signal present in `text`, in [`Signal::ALL`] order.
    pub fn signals_in(&self, text: &str) -> Vec<Signal> {
        Signal::ALL
            .into_iter()
            .filter(|signal| self.matches(*signal, text))
            .collect()
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> &'static PatternCatalog {
        PatternCatalog::builtin()
    }

    #[test]
    fn test_builtin_compiles_every_signal() {
        for signal in Signal::ALL {
            assert!(catalog().sets.contains_key(&signal), "{} missing", signal);
        }
    }

    #[test]
    fn test_failure_and_redirect_bilingual() {
        let text = "Mohon maaf, tidak bisa membantu, silakan hubungi tim dukungan";
        assert!(catalog().matches(Signal::Failure, text));
        assert!(catalog().matches(Signal::Redirect, text));

        assert!(catalog().matches(Signal::Failure, "Sorry, I cannot help with that"));
        assert!(catalog().matches(Signal::Redirect, "Please contact customer service"));
        assert!(!catalog().matches(Signal::Failure, "Berikut langkahnya"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(catalog().matches(Signal::Resolution, "TERIMA KASIH, SUDAH SELESAI"));
        assert!(catalog().matches(Signal::EscalationRequest, "I want to Talk To A Human"));
    }

    #[test]
    fn test_word_boundaries() {
        // "hi" must not fire inside "hingga"
        assert!(!catalog().matches(Signal::Greeting, "tunggu hingga besok"));
        assert!(catalog().matches(Signal::Greeting, "Hi there"));
    }

    #[test]
    fn test_repeated_calls_are_independent() {
        let text = "klik menu pengaturan";
        for _ in 0..5 {
            assert!(catalog().matches(Signal::ActionableContent, text));
        }
        assert!(!catalog().matches(Signal::ActionableContent, "hmm"));
        assert!(catalog().matches(Signal::ActionableContent, text));
    }

    #[test]
    fn test_numbered_steps_are_actionable() {
        assert!(catalog().matches(Signal::ActionableContent, "Caranya: 1. Buka aplikasi 2. Login"));
        assert!(catalog().matches(Signal::ActionableContent, "first, 2) restart the app"));
    }

    #[test]
    fn test_overrides_extend_builtin() {
        let mut extra = HashMap::new();
        extra.insert(Signal::Resolution, vec![r"\bmatur nuwun\b".to_string()]);
        let custom = PatternCatalog::with_overrides(&extra).unwrap();

        assert!(custom.matches(Signal::Resolution, "matur nuwun mas"));
        assert!(custom.matches(Signal::Resolution, "terima kasih"));
        assert!(!catalog().matches(Signal::Resolution, "matur nuwun mas"));
    }

    #[test]
    fn test_invalid_override() {
        let mut extra = HashMap::new();
        extra.insert(Signal::Failure, vec!["(unclosed".to_string()]);
        let err = PatternCatalog::with_overrides(&extra).unwrap_err();
        assert!(matches!(err, ConvoscopeError::InvalidPattern { .. }));
    }

    #[test]
    fn test_signal_from_str() {
        assert_eq!("escalation-request".parse::<Signal>().unwrap(), Signal::EscalationRequest);
        assert!("nonsense".parse::<Signal>().is_err());
    }

    #[test]
    fn test_signals_in() {
        let hits = catalog()
            .signals_in("Halo! Saya asisten virtual. Baca panduan di https://help.example.com");
        assert!(hits.contains(&Signal::Greeting));
        assert!(hits.contains(&Signal::Disclaimer));
        assert!(hits.contains(&Signal::KnowledgeReference));
        assert!(hits.contains(&Signal::ActionableContent));
    }
}
