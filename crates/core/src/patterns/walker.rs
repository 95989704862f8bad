//! Mainline traversal for one game
//!
//! The walker replays the mainline on a simulated board, evaluates every move
//! of the tracked player, compares it with the sibling variations stored at
//! the same ply and links each flagged move to the opponent's reply.

use shakmaty::Color;
use std::collections::VecDeque;
use tracing::{debug, warn};

use super::classifier::{
    adjust_for_reply, classify, AlternativeSignal, Classification, ClassifierInput,
};
use super::types::{AlternativeMove, MoveFlags, OpponentReply, PlayerMistake, Theme};
use crate::board::{extract_features, MoveShape, PositionalFeatures, Snapshot};
use crate::config::AnalysisConfig;
use crate::evaluation::{extract_evaluation, for_player};
use crate::parser::{GameTree, NodeId, ParsedGame};
use crate::players::match_player_color;

/// Alternatives kept on a record besides the best one
const MAX_OTHER_ALTERNATIVES: usize = 3;

/// What a single game contributed
#[derive(Debug, Clone, Default)]
pub struct GameWalk {
    /// Side the tracked player had, `None` when neither header matched
    pub color: Option<Color>,
    /// Tracked-player moves that were successfully replayed
    pub plies_analyzed: u32,
    pub mistakes: Vec<PlayerMistake>,
}

impl GameWalk {
    pub fn matched(&self) -> bool {
        self.color.is_some()
    }
}

/// A flagged record still waiting for the opponent's answer
#[derive(Debug, Clone, Copy)]
struct PendingReply {
    record: usize,
    /// Player material right after the flagged move
    material: i32,
}

/// Walks games with a fixed configuration
#[derive(Debug, Clone, Copy)]
pub struct GameWalker<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> GameWalker<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn walk(&self, game: &ParsedGame, player: &str) -> GameWalk {
        let identity = &game.identity;
        let Some(color) = match_player_color(player, &identity.white, &identity.black) else {
            debug!(
                game = identity.index,
                white = %identity.white,
                black = %identity.black,
                "player not in game"
            );
            return GameWalk::default();
        };

        let start = match identity.fen.as_deref() {
            Some(fen) => match Snapshot::from_fen(fen) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(game = identity.index, error = %e, "skipping game with unusable FEN");
                    return GameWalk::default();
                }
            },
            None => Snapshot::initial(),
        };
        debug!(game = identity.index, color = ?color, "tracking player");

        let mut traversal = Traversal::new(self.config, game, color, start);
        traversal.run();

        GameWalk {
            color: Some(color),
            plies_analyzed: traversal.plies_analyzed,
            mistakes: traversal.mistakes,
        }
    }
}

struct Traversal<'g> {
    config: &'g AnalysisConfig,
    game: &'g ParsedGame,
    color: Color,
    snapshot: Snapshot,
    /// Last known White-relative score
    last_eval: Option<i32>,
    window: VecDeque<String>,
    pending: Option<PendingReply>,
    failed_moves: u32,
    plies_analyzed: u32,
    mistakes: Vec<PlayerMistake>,
}

impl<'g> Traversal<'g> {
    fn new(
        config: &'g AnalysisConfig,
        game: &'g ParsedGame,
        color: Color,
        start: Snapshot,
    ) -> Self {
        let root = game.tree.root();
        Self {
            config,
            game,
            color,
            snapshot: start,
            last_eval: extract_evaluation(&game.tree.node(root).comments)
                .map(|e| e.score_white()),
            window: VecDeque::with_capacity(config.context_window + 1),
            pending: None,
            failed_moves: 0,
            plies_analyzed: 0,
            mistakes: Vec::new(),
        }
    }

    fn tree(&self) -> &'g GameTree {
        &self.game.tree
    }

    fn run(&mut self) {
        let tree = self.tree();
        let mut parent = tree.root();
        let mut ply = self.snapshot.plies_before();

        while let Some(child) = tree.mainline_child(parent) {
            ply += 1;
            let node = tree.node(child);
            let san = node.san.clone().unwrap_or_default();
            let mover = if ply % 2 == 1 { Color::White } else { Color::Black };
            self.align_turn(mover);

            let eval_before = self.last_eval;
            let eval_after = extract_evaluation(&node.comments)
                .map(|e| e.score_white())
                .or(eval_before);

            match self.snapshot.play_san(&san, ply) {
                Ok((next, shape)) => {
                    if mover == self.color {
                        self.plies_analyzed += 1;
                        self.pending = self.examine_move(
                            parent,
                            child,
                            ply,
                            &san,
                            Some((&next, shape)),
                            eval_before,
                            eval_after,
                        );
                    } else {
                        self.attach_reply(&san, &next, shape);
                    }
                    self.snapshot = next;
                }
                Err(e) => {
                    if self.failed_moves == 0 {
                        warn!(
                            game = self.game.identity.index,
                            ply,
                            san = %san,
                            error = %e,
                            "skipping unplayable move"
                        );
                    } else {
                        debug!(
                            game = self.game.identity.index,
                            ply,
                            san = %san,
                            "skipping unplayable move"
                        );
                    }
                    self.failed_moves += 1;
                    self.pending = if mover == self.color {
                        self.examine_move(parent, child, ply, &san, None, eval_before, eval_after)
                    } else {
                        None
                    };
                }
            }

            self.window.push_back(san);
            if self.window.len() > self.config.context_window {
                self.window.pop_front();
            }
            self.last_eval = eval_after;
            parent = child;
        }
    }

    /// Gives the move to `mover` after an unplayable move left the wrong side on turn
    fn align_turn(&mut self, mover: Color) {
        if self.snapshot.turn() == mover {
            return;
        }
        if let Some(next) = self.snapshot.null_move() {
            self.snapshot = next;
        }
    }

    /// Classifies a tracked-player move, returning the reply slot to fill
    ///
    /// `replayed` is `None` when the move could not be played on the board; only the
    /// evaluation-driven rules can fire then, and no reply is linked.
    #[allow(clippy::too_many_arguments)]
    fn examine_move(
        &mut self,
        parent: NodeId,
        child: NodeId,
        ply: u32,
        san: &str,
        replayed: Option<(&Snapshot, MoveShape)>,
        eval_before: Option<i32>,
        eval_after: Option<i32>,
    ) -> Option<PendingReply> {
        let config = self.config;
        let color = self.color;
        let node = self.tree().node(child);

        let before = eval_before.map(|s| for_player(s, color));
        let after = eval_after.map(|s| for_player(s, color));

        let shape = replayed.map(|(_, shape)| shape);
        let (features_before, features_after) = match replayed {
            Some((next, _)) => (
                extract_features(self.snapshot.board(), color),
                extract_features(next.board(), color),
            ),
            None => (PositionalFeatures::default(), PositionalFeatures::default()),
        };

        let alternatives = self.collect_alternatives(parent, ply, after);
        let alternative_evals: Vec<i32> = alternatives.iter().filter_map(|alt| alt.eval).collect();
        let best_index = best_alternative_index(&alternatives);
        let best_signal = best_index.map(|i| AlternativeSignal {
            gain: alternatives[i].gain,
            forcing: alternatives[i].is_forcing(),
        });

        let opening_phase = ply <= config.opening_phase_plies;
        let input = ClassifierInput {
            eval_before: before,
            eval_after: after,
            negative_glyph: node.has_negative_glyph(),
            opening_phase,
            shape,
            best_alternative: best_signal,
            alternative_evals: &alternative_evals,
            undeveloped_before: features_before.development.undeveloped_minors,
            undeveloped_after: features_after.development.undeveloped_minors,
        };

        let Classification { kind, severity } = classify(&input, config)?;

        let eval_swing = match (before, after) {
            (Some(b), Some(a)) => a - b,
            _ => 0,
        };

        let mut alternatives = alternatives;
        let best_alternative = best_index.map(|i| alternatives.remove(i));
        alternatives.truncate(MAX_OTHER_ALTERNATIVES);

        let mistake = PlayerMistake {
            game: self.game.identity.clone(),
            ply,
            move_number: ply.div_ceil(2),
            player_color: color.into(),
            san: san.to_string(),
            glyphs: node.glyphs(),
            eval_before: before,
            eval_after: after,
            eval_swing,
            eval_loss: (-eval_swing).max(0),
            kind,
            severity,
            theme: Theme::Plan,
            opening_phase,
            move_flags: shape
                .map(|shape| MoveFlags {
                    capture: shape.is_capture(),
                    check: shape.gives_check,
                    castle: shape.is_castle,
                    non_developing: shape.is_non_developing(),
                })
                .unwrap_or_default(),
            material_escalated: false,
            material_lost: 0,
            reply: None,
            features_before,
            features_after,
            best_alternative,
            other_alternatives: alternatives,
            fen_before: self.snapshot.fen().to_string(),
            fen_after: replayed
                .map_or(self.snapshot.fen(), |(next, _)| next.fen())
                .to_string(),
            context: self.window.iter().cloned().collect(),
            description: String::new(),
        };

        debug!(
            game = self.game.identity.index,
            ply,
            san = %san,
            kind = kind.as_str(),
            severity = severity.as_str(),
            loss = mistake.eval_loss,
            "flagged move"
        );

        self.mistakes.push(mistake);
        let (next, _) = replayed?;
        Some(PendingReply {
            record: self.mistakes.len() - 1,
            material: next.material(color),
        })
    }

    /// Builds one candidate per sibling of the played move
    fn collect_alternatives(
        &self,
        parent: NodeId,
        ply: u32,
        played: Option<i32>,
    ) -> Vec<AlternativeMove> {
        let tree = self.tree();

        tree.alternatives(parent)
            .iter()
            .take(self.config.max_alternatives)
            .filter_map(|&id| {
                let san = tree.node(id).san.clone()?;
                let (is_capture, gives_check) = match self.snapshot.play_san(&san, ply) {
                    Ok((_, shape)) => (shape.is_capture(), shape.gives_check),
                    Err(_) => (san.contains('x'), san.contains('+') || san.contains('#')),
                };

                let (continuation, eval_white) = self.follow_continuation(id);
                let eval = eval_white.map(|s| for_player(s, self.color));
                let gain = eval.zip(played).map(|(alt, played)| alt - played);

                Some(AlternativeMove {
                    san,
                    continuation,
                    eval,
                    gain,
                    is_capture,
                    gives_check,
                })
            })
            .collect()
    }

    /// Walks down a variation until an evaluation turns up or the lookahead runs out
    fn follow_continuation(&self, start: NodeId) -> (Vec<String>, Option<i32>) {
        let tree = self.tree();
        let mut continuation = Vec::new();
        let mut cursor = Some(start);

        while let Some(id) = cursor {
            if continuation.len() > self.config.alternative_lookahead {
                break;
            }
            let node = tree.node(id);
            if let Some(san) = &node.san {
                continuation.push(san.clone());
            }
            if let Some(eval) = extract_evaluation(&node.comments) {
                return (continuation, Some(eval.score_white()));
            }
            cursor = tree.mainline_child(id);
        }

        (continuation, None)
    }

    fn attach_reply(&mut self, san: &str, next: &Snapshot, shape: MoveShape) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let config = self.config;
        let Some(mistake) = self.mistakes.get_mut(pending.record) else {
            return;
        };

        let material_delta = next.material(self.color) - pending.material;
        let reply = OpponentReply {
            san: san.to_string(),
            is_capture: shape.is_capture(),
            gives_check: shape.gives_check,
            material_delta,
            fen_after: next.fen().to_string(),
        };

        let adjusted = adjust_for_reply(
            Classification {
                kind: mistake.kind,
                severity: mistake.severity,
            },
            mistake.eval_loss,
            reply.is_forcing(),
            material_delta,
            config,
        );
        if adjusted.kind != mistake.kind || adjusted.severity != mistake.severity {
            debug!(
                ply = mistake.ply,
                from = mistake.kind.as_str(),
                to = adjusted.kind.as_str(),
                reply = %reply.san,
                "reclassified after reply"
            );
        }

        mistake.kind = adjusted.kind;
        mistake.severity = adjusted.severity;
        mistake.material_escalated = adjusted.material_escalated;
        mistake.material_lost = (-material_delta).max(0);
        mistake.reply = Some(reply);
    }
}

/// Highest-evaluated alternative, or the first sibling when none carries an evaluation
fn best_alternative_index(alternatives: &[AlternativeMove]) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for (i, alt) in alternatives.iter().enumerate() {
        if let Some(eval) = alt.eval {
            match best {
                Some((_, top)) if top >= eval => {}
                _ => best = Some((i, eval)),
            }
        }
    }

    match best {
        Some((i, _)) => Some(i),
        None if !alternatives.is_empty() => Some(0),
        None => None,
    }
}
