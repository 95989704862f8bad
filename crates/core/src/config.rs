//! Tunable thresholds for mistake detection
//!
//! Every constant the classifier, walker and aggregator consult lives here so
//! a deployment can retune them from a TOML file without touching code.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Centipawn loss at or above which a move is a blunder
    pub blunder_threshold: i32,
    /// Centipawn loss at or above which a move is a mistake
    pub mistake_threshold: i32,
    /// Centipawn loss at or above which a move is an inaccuracy
    pub inaccuracy_threshold: i32,
    /// A player-relative evaluation at or below the negation of this is lost
    pub hopeless_threshold: i32,
    /// How much an alternative must beat the played move to count as an escape
    pub hopeless_margin: i32,
    /// Loss at or above which the kind is tactical rather than positional
    pub tactical_swing_threshold: i32,
    /// Gain of a same-ply alternative over the played move worth reporting
    pub alternative_gain_threshold: i32,
    /// Number of plies treated as the opening phase
    pub opening_phase_plies: u32,
    /// Undeveloped minor piece count considered high
    pub undeveloped_high: u32,
    /// Maximum sibling variations inspected per tracked-player ply
    pub max_alternatives: usize,
    /// Plies walked down an alternative's continuation looking for an evaluation
    pub alternative_lookahead: usize,
    /// Preceding mainline moves kept on each record
    pub context_window: usize,
    /// Material drop in pawn units after the reply that escalates to material loss
    pub material_loss_pawns: i32,
    /// Minimum loss for feature-driven themes
    pub theme_min_loss: i32,
    /// Recurring mistake signatures kept per bucket
    pub top_patterns: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            blunder_threshold: 250,
            mistake_threshold: 120,
            inaccuracy_threshold: 50,
            hopeless_threshold: 900,
            hopeless_margin: 50,
            tactical_swing_threshold: 200,
            alternative_gain_threshold: 60,
            opening_phase_plies: 20,
            undeveloped_high: 3,
            max_alternatives: 4,
            alternative_lookahead: 3,
            context_window: 6,
            material_loss_pawns: 2,
            theme_min_loss: 50,
            top_patterns: 5,
        }
    }
}

impl AnalysisConfig {
    /// Parses a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Severity bands must be strictly descending and positive
    pub fn validate(&self) -> Result<()> {
        if self.inaccuracy_threshold <= 0 {
            return Err(Error::Config(
                "inaccuracy_threshold must be positive".to_string(),
            ));
        }
        if !(self.blunder_threshold > self.mistake_threshold
            && self.mistake_threshold > self.inaccuracy_threshold)
        {
            return Err(Error::Config(format!(
                "severity thresholds must be strictly descending (got {}/{}/{})",
                self.blunder_threshold, self.mistake_threshold, self.inaccuracy_threshold
            )));
        }
        if self.hopeless_threshold <= 0 || self.hopeless_margin < 0 {
            return Err(Error::Config(
                "hopeless_threshold must be positive and hopeless_margin non-negative".to_string(),
            ));
        }
        if self.material_loss_pawns <= 0 {
            return Err(Error::Config(
                "material_loss_pawns must be positive".to_string(),
            ));
        }
        if self.top_patterns == 0 || self.max_alternatives == 0 || self.context_window == 0 {
            return Err(Error::Config(
                "top_patterns, max_alternatives and context_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
