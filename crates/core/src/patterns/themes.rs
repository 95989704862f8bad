//! Theme inference over finished mistake records

use super::types::{IssueKind, PlayerMistake, Theme};
use crate::board::{KingSafety, PositionalFeatures};
use crate::config::AnalysisConfig;

fn king_degraded(before: &KingSafety, after: &KingSafety) -> bool {
    after.pawn_shield < before.pawn_shield
        || (after.open_file && !before.open_file)
        || (after.heavy_xray && !before.heavy_xray)
}

fn space_lost(before: &PositionalFeatures, after: &PositionalFeatures) -> bool {
    after.space.center_occupation < before.space.center_occupation
        || after.space.space_score < before.space.space_score
}

/// Picks the recurring cause behind a record from its feature deltas
pub fn infer_theme(mistake: &PlayerMistake, config: &AnalysisConfig) -> Theme {
    let before = &mistake.features_before;
    let after = &mistake.features_after;
    let significant = mistake.eval_loss >= config.theme_min_loss;

    if mistake.kind == IssueKind::MaterialLoss || mistake.material_escalated {
        return Theme::HangingMaterial;
    }

    let reply_checked = mistake.reply.as_ref().is_some_and(|reply| reply.gives_check);
    if significant && (king_degraded(&before.king_safety, &after.king_safety) || reply_checked) {
        return Theme::KingExposed;
    }

    if significant && after.pawn_structure.worsened_from(&before.pawn_structure) {
        return Theme::PawnStructure;
    }

    if mistake.opening_phase
        && mistake.move_flags.non_developing
        && after.development.score <= before.development.score
    {
        return Theme::Development;
    }

    if space_lost(before, after) {
        return Theme::Space;
    }

    if mistake.kind.is_tactical() {
        return Theme::MissedTactic;
    }

    Theme::Plan
}
