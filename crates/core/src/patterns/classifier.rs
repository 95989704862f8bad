//! Mistake classification
//!
//! Pure functions over already-extracted data: evaluations, glyphs, move
//! shape, alternatives and development counts. No board access happens here.

use super::types::{IssueKind, Severity};
use crate::board::MoveShape;
use crate::config::AnalysisConfig;

/// The best same-ply alternative, reduced to what classification needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlternativeSignal {
    pub gain: Option<i32>,
    pub forcing: bool,
}

/// Everything the classifier looks at for one move
#[derive(Debug, Clone)]
pub struct ClassifierInput<'a> {
    /// Player-relative evaluation before the move
    pub eval_before: Option<i32>,
    /// Player-relative evaluation after the move
    pub eval_after: Option<i32>,
    pub negative_glyph: bool,
    pub opening_phase: bool,
    /// `None` when the move could not be replayed on the board
    pub shape: Option<MoveShape>,
    pub best_alternative: Option<AlternativeSignal>,
    /// Player-relative evaluations of every inspected alternative
    pub alternative_evals: &'a [i32],
    pub undeveloped_before: u32,
    pub undeveloped_after: u32,
}

impl ClassifierInput<'_> {
    /// Positive when the move lost ground; `None` without both evaluations
    pub fn eval_loss(&self) -> Option<i32> {
        Some(self.eval_before? - self.eval_after?)
    }

    fn alternative_gain(&self) -> Option<i32> {
        self.best_alternative.and_then(|alt| alt.gain)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: IssueKind,
    pub severity: Severity,
}

impl Classification {
    fn mild() -> Self {
        Self {
            kind: IssueKind::PositionalMisplay,
            severity: Severity::Inaccuracy,
        }
    }
}

/// Lost already, and no alternative offered a real way out
fn is_hopeless(input: &ClassifierInput<'_>, config: &AnalysisConfig) -> bool {
    let Some(before) = input.eval_before else {
        return false;
    };
    if before > -config.hopeless_threshold {
        return false;
    }

    let played = input.eval_after.unwrap_or(before);
    !input
        .alternative_evals
        .iter()
        .any(|&alt| alt > -config.hopeless_threshold && alt > played + config.hopeless_margin)
}

/// Decides whether a move is worth reporting and how
///
/// Rules are tried in order and the first match wins.
pub fn classify(input: &ClassifierInput<'_>, config: &AnalysisConfig) -> Option<Classification> {
    if is_hopeless(input, config) {
        return None;
    }

    let loss = input.eval_loss().unwrap_or(0);

    if loss < config.inaccuracy_threshold && input.negative_glyph {
        return Some(Classification::mild());
    }

    if let Some(severity) = Severity::from_eval_loss(loss, config) {
        return Some(Classification {
            kind: kind_for_loss(input, loss, severity, config),
            severity,
        });
    }

    if input
        .alternative_gain()
        .is_some_and(|gain| gain >= config.alternative_gain_threshold)
    {
        return Some(Classification::mild());
    }

    None
}

fn kind_for_loss(
    input: &ClassifierInput<'_>,
    loss: i32,
    severity: Severity,
    config: &AnalysisConfig,
) -> IssueKind {
    if loss >= config.tactical_swing_threshold {
        return IssueKind::tactical_for(severity);
    }

    let development_stalled = input.undeveloped_after >= input.undeveloped_before;
    if input.opening_phase
        && input.shape.is_some_and(|s| s.looks_like_principle_violation())
        && development_stalled
    {
        return IssueKind::OpeningPrinciple;
    }

    let non_developing = input.shape.is_some_and(|s| s.is_non_developing());
    if non_developing && input.undeveloped_after >= config.undeveloped_high {
        return IssueKind::PieceInactivity;
    }

    let missed_forcing = input.best_alternative.is_some_and(|alt| {
        alt.forcing
            && alt
                .gain
                .is_some_and(|gain| gain >= config.alternative_gain_threshold)
    });
    if missed_forcing {
        return IssueKind::TacticalInaccuracy;
    }

    IssueKind::PositionalMisplay
}

/// Outcome of re-examining a record once the opponent has replied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyAdjustment {
    pub kind: IssueKind,
    pub severity: Severity,
    pub material_escalated: bool,
}

/// Applies material-loss escalation and the positional-to-tactical upgrade
pub fn adjust_for_reply(
    classification: Classification,
    eval_loss: i32,
    reply_forcing: bool,
    material_delta: i32,
    config: &AnalysisConfig,
) -> ReplyAdjustment {
    if -material_delta >= config.material_loss_pawns {
        return ReplyAdjustment {
            kind: IssueKind::MaterialLoss,
            severity: Severity::Blunder,
            material_escalated: true,
        };
    }

    let kind = if classification.kind == IssueKind::PositionalMisplay
        && reply_forcing
        && eval_loss >= config.inaccuracy_threshold
    {
        IssueKind::tactical_for(classification.severity)
    } else {
        classification.kind
    };

    ReplyAdjustment {
        kind,
        severity: classification.severity,
        material_escalated: false,
    }
}
