//! Evaluations embedded in PGN comments
//!
//! Engine annotations arrive as `[%eval 0.35]`, `[%eval #-3]`, `[%eval 35cp]`
//! or `[%cp 35]` inside a move's comments. They are always White-relative;
//! callers convert to a player's perspective with [`for_player`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use shakmaty::Color;
use std::fmt;
use std::sync::LazyLock;

/// Magnitude of a mate score before subtracting the distance
pub const MATE_SCORE: i32 = 100_000;

/// Centipawn scores are clamped below any mate score
const CENTIPAWN_CAP: i32 = 50_000;

const MAX_MATE_DISTANCE: i32 = 400;

static EVAL_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[%(eval|cp)\s+([^\]\s,]+)").expect("valid eval tag regex")
});

/// Represents a position evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Evaluation {
    /// Centipawn score (positive = white advantage)
    Centipawns(i32),
    /// Forced mate (positive = white mates, negative = black mates)
    Mate(i32),
}

impl Evaluation {
    /// Single White-relative number; mates saturate so closer mates are larger
    pub fn score_white(&self) -> i32 {
        match *self {
            Evaluation::Centipawns(cp) => cp.clamp(-CENTIPAWN_CAP, CENTIPAWN_CAP),
            Evaluation::Mate(moves) => {
                let distance = moves.abs().min(MAX_MATE_DISTANCE);
                let magnitude = MATE_SCORE - distance * 100;
                if moves < 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
        }
    }

    /// Parses the value of an eval tag, e.g. `0.35`, `#-3`, `35cp`
    pub fn parse_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if let Some(mate) = token.strip_prefix('#') {
            return mate.parse::<i32>().ok().map(Evaluation::Mate);
        }
        if let Some(cp) = token.strip_suffix("cp") {
            return cp.trim().parse::<i32>().ok().map(Evaluation::Centipawns);
        }
        let pawns: f64 = token.parse().ok()?;
        if !pawns.is_finite() {
            return None;
        }
        Some(Evaluation::Centipawns((pawns * 100.0).round() as i32))
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "#{}", moves),
        }
    }
}

/// Returns the first evaluation found in a node's comments
pub fn extract_evaluation<S: AsRef<str>>(comments: &[S]) -> Option<Evaluation> {
    comments.iter().find_map(|comment| {
        EVAL_TAG_RE.captures_iter(comment.as_ref()).find_map(|caps| {
            let value = caps.get(2)?.as_str();
            match caps.get(1)?.as_str() {
                "cp" => value.parse::<i32>().ok().map(Evaluation::Centipawns),
                _ => Evaluation::parse_token(value),
            }
        })
    })
}

/// Converts a White-relative score to the given side's perspective
pub fn for_player(score_white: i32, color: Color) -> i32 {
    color.fold_wb(score_white, -score_white)
}

/// Formats a centipawn score the way reports show it
pub fn format_score(score: i32) -> String {
    if score.abs() >= MATE_SCORE - MAX_MATE_DISTANCE * 100 {
        let distance = (MATE_SCORE - score.abs()) / 100;
        if score < 0 {
            format!("#-{}", distance)
        } else {
            format!("#{}", distance)
        }
    } else {
        Evaluation::Centipawns(score).to_string()
    }
}
