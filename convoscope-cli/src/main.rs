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

//! Convoscope CLI
//!
//! Command-line interface for scoring support-chat transcripts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use convoscope_core::{ConvoscopeConfig, CorpusMessage, RawMessage, SessionMetadata};
use convoscope_evals::{BatchAnalyzer, PatternCatalog, SessionAnalyzer, Signal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "convoscope")]
#[command(about = "Convoscope - conversation quality scoring for support chats", long_about = None)]
struct Cli {
    /// Configuration file (TOML with [scoring] and [batch] tables)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one transcript and list its key moments
    Analyze {
        /// Transcript JSON: {"messages": [...], "metadata": {...}} or a bare message array
        file: PathBuf,
    },

    /// Score a corpus of sessions and aggregate statistics
    Batch {
        /// Corpus JSON: object of session id -> message array
        file: PathBuf,

        /// Worker threads (defaults to available parallelism)
        #[arg(long)]
        workers: Option<usize>,

        /// Entries per frequency ranking
        #[arg(long)]
        top: Option<usize>,
    },

    /// Show which signals a text triggers
    Patterns {
        /// Only check this signal (e.g. "failure", "escalation_request")
        #[arg(long)]
        signal: Option<String>,

        /// Text to check
        text: String,
    },
}

/// Transcript file forms accepted by `analyze`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Full {
        messages: Vec<RawMessage>,
        #[serde(default)]
        metadata: SessionMetadata,
    },
    Bare(Vec<RawMessage>),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze { file } => {
            let (messages, metadata) = read_transcript(&file)?;
            info!("Analyzing {} messages from {:?}", messages.len(), file);

            let analyzer = SessionAnalyzer::new(config.scoring);
            let result = analyzer.analyze_raw(&messages, metadata);
            print_json(&result, cli.compact)?;
        }

        Commands::Batch { file, workers, top } => {
            if workers.is_some() {
                config.batch.workers = workers;
            }
            if let Some(top) = top {
                config.batch.top_n = top;
            }
            config.validate().context("Invalid batch options")?;

            let corpus = read_corpus(&file)?;
            let output = BatchAnalyzer::new(config.batch).run(&corpus);
            print_json(&output, cli.compact)?;
        }

        Commands::Patterns { signal, text } => {
            let catalog = PatternCatalog::builtin();
            let signals = match signal {
                Some(name) => vec![name.parse::<Signal>().context("Invalid signal")?],
                None => Signal::ALL.to_vec(),
            };

            let hits = signal_hits(catalog, &signals, &text);
            if signals.len() == 1 {
                for (signal, matched) in hits {
                    println!("{} {}", if matched { "✓" } else { "✗" }, signal);
                }
            } else if hits.iter().any(|(_, matched)| *matched) {
                for (signal, _) in hits.into_iter().filter(|(_, matched)| *matched) {
                    println!("✓ {}", signal);
                }
            } else {
                println!("No signals matched");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ConvoscopeConfig> {
    match path {
        Some(path) => ConvoscopeConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path)),
        None => Ok(ConvoscopeConfig::default()),
    }
}

fn read_transcript(path: &Path) -> Result<(Vec<RawMessage>, SessionMetadata)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript {:?}", path))?;
    parse_transcript(&content)
}

fn parse_transcript(content: &str) -> Result<(Vec<RawMessage>, SessionMetadata)> {
    let file: TranscriptFile = serde_json::from_str(content).context("Invalid transcript JSON")?;
    Ok(match file {
        TranscriptFile::Full { messages, metadata } => (messages, metadata),
        TranscriptFile::Bare(messages) => (messages, SessionMetadata::default()),
    })
}

fn read_corpus(path: &Path) -> Result<BTreeMap<String, Vec<CorpusMessage>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus {:?}", path))?;
    serde_json::from_str(&content).context("Invalid corpus JSON")
}

fn signal_hits(catalog: &PatternCatalog, signals: &[Signal], text: &str) -> Vec<(Signal, bool)> {
    signals
        .iter()
        .map(|signal| (*signal, catalog.matches(*signal, text)))
        .collect()
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_transcript() {
        let (messages, metadata) = parse_transcript(
            r#"{
                "messages": [
                    {"sender": "user", "text": "halo", "timestamp": "2024-05-01T10:00:00Z"},
                    {"sender": "bot", "text": "Halo, ada yang bisa dibantu?"}
                ],
                "metadata": {"status": "escalated"}
            }"#,
        )
        .unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].timestamp.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert!(metadata.indicates_handoff());
    }

    #[test]
    fn test_parse_bare_transcript() {
        let (messages, metadata) =
            parse_transcript(r#"[{"sender": "customer", "text": "cek saldo"}]"#).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(metadata, SessionMetadata::default());
    }

    #[test]
    fn test_parse_invalid_transcript() {
        let err = parse_transcript(r#"{"nope": true}"#).unwrap_err();
        assert!(err.to_string().contains("Invalid transcript JSON"));
    }

    #[test]
    fn test_read_corpus() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "s-2": [{{"sender": "user", "text": "makasih"}}],
                "s-1": [{{"sender": "bot", "text": "Maaf", "intent": "{{\"type\":\"greeting\"}}"}}]
            }}"#
        )
        .unwrap();

        let corpus = read_corpus(file.path()).unwrap();
        let ids: Vec<&String> = corpus.keys().collect();
        assert_eq!(ids, vec!["s-1", "s-2"]);
        assert_eq!(
            corpus["s-1"][0].intent,
            Some(serde_json::Value::String(r#"{"type":"greeting"}"#.to_string()))
        );
    }

    #[test]
    fn test_load_config() {
        assert_eq!(load_config(None).unwrap().batch.top_n, 10);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[batch]\ntop_n = 3").unwrap();
        assert_eq!(load_config(Some(file.path())).unwrap().batch.top_n, 3);

        assert!(load_config(Some(Path::new("/nonexistent/convoscope.toml"))).is_err());
    }

    #[test]
    fn test_signal_hits() {
        let hits = signal_hits(
            PatternCatalog::builtin(),
            &[Signal::Failure, Signal::Resolution],
            "Mohon maaf atas kendalanya",
        );
        assert_eq!(hits, vec![(Signal::Failure, true), (Signal::Resolution, false)]);
    }
}
