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

//! Word-overlap similarity used for re-ask, bot-loop and topic detection
//!
//! Mathematical model:
//! overlap(a, b) = |A ∩ B| / min(|A|, |B|)
//!
//! Where A and B are the sets of lowercase whitespace tokens longer than two
//! characters. The overlap is 0 when either set is empty.

use std::collections::HashSet;

/// Minimum token length (exclusive) for a token to count
const MIN_TOKEN_CHARS: usize = 2;

/// Function words ignored when looking for shared topic words
const STOPWORDS: &[&str] = &[
    // Indonesian
    "yang", "dan", "untuk", "ini", "itu", "dengan", "saya", "anda", "kami", "kak", "dari",
    "pada", "akan", "bisa", "sudah", "tidak", "apa", "ada", "mau", "juga", "atau", "karena",
    "tapi", "agar", "bagaimana", "silakan", "mohon", "terima", "kasih",
    // English
    "the", "and", "for", "you", "your", "with", "this", "that", "are", "was", "can", "have",
    "has", "not", "but", "please", "what", "how", "thanks", "thank", "will", "from",
];

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .filter(|token| token.chars().count() > MIN_TOKEN_CHARS)
        .map(str::to_string)
        .collect()
}

/// Overlap between the significant word sets of two texts, in 0.0-1.0.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let set_a = tokens(a);
    let set_b = tokens(b);
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }

    let shared = set_a.intersection(&set_b).count();
    shared as f64 / set_a.len().min(set_b.len()) as f64
}

/// Tokens with surrounding punctuation removed, stopwords dropped
fn significant_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| token.chars().count() > MIN_TOKEN_CHARS && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Number of non-stopword words the two texts share, ignoring punctuation.
pub fn shared_significant_words(a: &str, b: &str) -> usize {
    significant_tokens(a)
        .intersection(&significant_tokens(b))
        .count()
}

/// Whitespace-delimited word count
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
