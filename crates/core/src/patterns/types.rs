//! Types describing a player's flagged moves

use serde::{Deserialize, Serialize};
use shakmaty::Color;
use std::sync::Arc;

use crate::board::PositionalFeatures;
use crate::config::AnalysisConfig;
use crate::evaluation::format_score;
use crate::parser::GameIdentity;

/// Severity of a mistake
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Blunder,
    Mistake,
    Inaccuracy,
}

impl Severity {
    /// Band an evaluation loss falls into, if any
    pub fn from_eval_loss(loss: i32, config: &AnalysisConfig) -> Option<Self> {
        match loss {
            l if l >= config.blunder_threshold => Some(Severity::Blunder),
            l if l >= config.mistake_threshold => Some(Severity::Mistake),
            l if l >= config.inaccuracy_threshold => Some(Severity::Inaccuracy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Blunder => "blunder",
            Severity::Mistake => "mistake",
            Severity::Inaccuracy => "inaccuracy",
        }
    }
}

/// What went wrong with a move
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    TacticalBlunder,
    TacticalMistake,
    TacticalInaccuracy,
    MaterialLoss,
    OpeningPrinciple,
    PieceInactivity,
    PositionalMisplay,
}

impl IssueKind {
    /// Tactical kind matching a severity band
    pub fn tactical_for(severity: Severity) -> Self {
        match severity {
            Severity::Blunder => IssueKind::TacticalBlunder,
            Severity::Mistake => IssueKind::TacticalMistake,
            Severity::Inaccuracy => IssueKind::TacticalInaccuracy,
        }
    }

    pub fn is_tactical(&self) -> bool {
        matches!(
            self,
            IssueKind::TacticalBlunder | IssueKind::TacticalMistake | IssueKind::TacticalInaccuracy
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::TacticalBlunder => "tactical_blunder",
            IssueKind::TacticalMistake => "tactical_mistake",
            IssueKind::TacticalInaccuracy => "tactical_inaccuracy",
            IssueKind::MaterialLoss => "material_loss",
            IssueKind::OpeningPrinciple => "opening_principle",
            IssueKind::PieceInactivity => "piece_inactivity",
            IssueKind::PositionalMisplay => "positional_misplay",
        }
    }
}

/// Recurring cause behind a mistake
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    HangingMaterial,
    KingExposed,
    PawnStructure,
    Development,
    Space,
    MissedTactic,
    Plan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl From<Color> for PlayerColor {
    fn from(color: Color) -> Self {
        match color {
            Color::White => PlayerColor::White,
            Color::Black => PlayerColor::Black,
        }
    }
}

impl PlayerColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerColor::White => "white",
            PlayerColor::Black => "black",
        }
    }
}

/// Shape of the played move as far as themes care
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFlags {
    pub capture: bool,
    pub check: bool,
    pub castle: bool,
    pub non_developing: bool,
}

/// A same-ply alternative to the played move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeMove {
    pub san: String,
    /// The alternative followed by the start of its annotated continuation
    pub continuation: Vec<String>,
    /// Player-relative evaluation found along the continuation
    pub eval: Option<i32>,
    /// How much better than the played move, when both are known
    pub gain: Option<i32>,
    pub is_capture: bool,
    pub gives_check: bool,
}

impl AlternativeMove {
    pub fn is_forcing(&self) -> bool {
        self.is_capture || self.gives_check
    }
}

/// The opponent's mainline answer to a flagged move
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentReply {
    pub san: String,
    pub is_capture: bool,
    pub gives_check: bool,
    /// Change in the player's material, in pawn units, caused by the reply
    pub material_delta: i32,
    pub fen_after: String,
}

impl OpponentReply {
    pub fn is_forcing(&self) -> bool {
        self.is_capture || self.gives_check
    }
}

/// One flagged move of the tracked player
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMistake {
    pub game: Arc<GameIdentity>,
    pub ply: u32,
    pub move_number: u32,
    pub player_color: PlayerColor,
    pub san: String,
    pub glyphs: Vec<String>,

    /// Player-relative evaluations; `None` when the game carried none yet
    pub eval_before: Option<i32>,
    pub eval_after: Option<i32>,
    /// `eval_after - eval_before`, negative when the move lost ground
    pub eval_swing: i32,
    pub eval_loss: i32,

    pub kind: IssueKind,
    pub severity: Severity,
    pub theme: Theme,

    pub opening_phase: bool,
    pub move_flags: MoveFlags,
    /// Kind and severity were raised because material fell right after the move
    pub material_escalated: bool,
    /// Pawn units the player lost to the opponent's reply
    pub material_lost: i32,
    pub reply: Option<OpponentReply>,

    pub features_before: PositionalFeatures,
    pub features_after: PositionalFeatures,

    pub best_alternative: Option<AlternativeMove>,
    pub other_alternatives: Vec<AlternativeMove>,

    pub fen_before: String,
    pub fen_after: String,
    /// Preceding mainline moves, oldest first
    pub context: Vec<String>,
    pub description: String,
}

impl PlayerMistake {
    /// Movetext-style label, e.g. `14. Qxb7` or `14... Qxb2`
    pub fn move_label(&self) -> String {
        match self.player_color {
            PlayerColor::White => format!("{}. {}", self.move_number, self.san),
            PlayerColor::Black => format!("{}... {}", self.move_number, self.san),
        }
    }

    pub fn describe(&self) -> String {
        let mut text = format!(
            "Move {}: {} ({}",
            self.move_label(),
            self.severity.as_str(),
            self.kind.as_str()
        );
        if self.eval_loss > 0 {
            text.push_str(&format!(", -{:.2}", self.eval_loss as f32 / 100.0));
        }
        text.push(')');

        if self.material_lost > 0 {
            text.push_str(&format!("; lost {} pawn units", self.material_lost));
        }

        if let Some(alt) = &self.best_alternative {
            match alt.eval {
                Some(eval) if alt.gain.is_some() => {
                    text.push_str(&format!("; better was {} ({})", alt.san, format_score(eval)))
                }
                _ => text.push_str(&format!("; alternative {}", alt.san)),
            }
        }

        text
    }
}

#[cfg(test)]
impl PlayerMistake {
    /// Minimal record for tests that only care about a few fields
    pub(crate) fn fixture(
        game: Arc<GameIdentity>,
        ply: u32,
        san: &str,
        kind: IssueKind,
        severity: Severity,
        eval_loss: i32,
    ) -> Self {
        let player_color = if ply % 2 == 1 {
            PlayerColor::White
        } else {
            PlayerColor::Black
        };
        PlayerMistake {
            game,
            ply,
            move_number: ply.div_ceil(2),
            player_color,
            san: san.to_string(),
            glyphs: Vec::new(),
            eval_before: Some(0),
            eval_after: Some(-eval_loss),
            eval_swing: -eval_loss,
            eval_loss,
            kind,
            severity,
            theme: Theme::Plan,
            opening_phase: false,
            move_flags: MoveFlags::default(),
            material_escalated: false,
            material_lost: 0,
            reply: None,
            features_before: PositionalFeatures::default(),
            features_after: PositionalFeatures::default(),
            best_alternative: None,
            other_alternatives: Vec::new(),
            fen_before: String::new(),
            fen_after: String::new(),
            context: Vec::new(),
            description: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_bands() {
        let config = AnalysisConfig::default();
        assert_eq!(Severity::from_eval_loss(300, &config), Some(Severity::Blunder));
        assert_eq!(Severity::from_eval_loss(250, &config), Some(Severity::Blunder));
        assert_eq!(Severity::from_eval_loss(249, &config), Some(Severity::Mistake));
        assert_eq!(Severity::from_eval_loss(120, &config), Some(Severity::Mistake));
        assert_eq!(Severity::from_eval_loss(50, &config), Some(Severity::Inaccuracy));
        assert_eq!(Severity::from_eval_loss(49, &config), None);
        assert_eq!(Severity::from_eval_loss(-100, &config), None);
    }

    #[test]
    fn test_tactical_kinds() {
        assert_eq!(IssueKind::tactical_for(Severity::Mistake), IssueKind::TacticalMistake);
        assert!(IssueKind::TacticalInaccuracy.is_tactical());
        assert!(!IssueKind::MaterialLoss.is_tactical());
        assert!(!IssueKind::PositionalMisplay.is_tactical());
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&IssueKind::TacticalBlunder).unwrap(),
            "\"tactical_blunder\""
        );
        assert_eq!(serde_json::to_string(&Severity::Blunder).unwrap(), "\"blunder\"");
        assert_eq!(
            serde_json::to_string(&Theme::HangingMaterial).unwrap(),
            "\"hanging_material\""
        );
        assert_eq!(IssueKind::OpeningPrinciple.as_str(), "opening_principle");
        assert_eq!(PlayerColor::from(Color::Black).as_str(), "black");
    }

    #[test]
    fn test_describe() {
        let mut mistake = PlayerMistake::fixture(
            Arc::new(GameIdentity::default()),
            27,
            "Qxb7",
            IssueKind::TacticalBlunder,
            Severity::Blunder,
            310,
        );
        mistake.best_alternative = Some(AlternativeMove {
            san: "Nd5".to_string(),
            continuation: vec!["Nd5".to_string()],
            eval: Some(40),
            gain: Some(350),
            is_capture: false,
            gives_check: false,
        });
        assert_eq!(mistake.move_label(), "14. Qxb7");
        assert_eq!(
            mistake.describe(),
            "Move 14. Qxb7: blunder (tactical_blunder, -3.10); better was Nd5 (+0.40)"
        );

        mistake.ply = 28;
        mistake.player_color = PlayerColor::Black;
        mistake.best_alternative = None;
        mistake.material_lost = 3;
        assert_eq!(
            mistake.describe(),
            "Move 14... Qxb7: blunder (tactical_blunder, -3.10); lost 3 pawn units"
        );
    }
}
