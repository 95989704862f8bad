//! Chess Mistakes Core Library
//!
//! Reads annotated PGN (engine evaluations in `[%eval]` comments, glyphs and
//! variations) and reports the mistakes of one player, grouped by opening.

pub mod board;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod parser;
pub mod patterns;
pub mod players;
pub mod report;
pub mod stats;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use evaluation::Evaluation;
pub use parser::{parse_pgn_file, parse_pgn_string, GameIdentity, ParsedGame};
pub use patterns::{GameWalker, IssueKind, PlayerColor, PlayerMistake, Severity, Theme};
pub use report::{analyze_batch, analyze_files, analyze_games, AnalysisResult};
pub use stats::{base_opening_name, AnalysisSummary, MistakePattern, OpeningStats};
