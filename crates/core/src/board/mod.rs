//! Simulated board used to walk a game and derive positional features

pub mod features;

use shakmaty::{
    fen::Fen, san::SanPlus, Board, CastlingMode, Chess, Color, EnPassantMode, File, Position,
    Role, Square,
};

use crate::error::{Error, Result};

pub use features::{
    extract_features, Development, KingSafety, PawnStructure, PositionalFeatures, Space,
};

/// A position together with its FEN
#[derive(Debug, Clone)]
pub struct Snapshot {
    position: Chess,
    fen: String,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::initial()
    }
}

impl Snapshot {
    pub fn initial() -> Self {
        Self::from_position(Chess::default())
    }

    pub fn from_position(position: Chess) -> Self {
        let fen = Fen::from_position(&position, EnPassantMode::Legal).to_string();
        Self { position, fen }
    }

    /// Parses the position of a `[FEN]` header
    pub fn from_fen(fen: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{}", e)))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{}", e)))?;
        Ok(Self::from_position(position))
    }

    /// Ply already played before this position, counted from the initial array
    pub fn plies_before(&self) -> u32 {
        let full_moves = self.position.fullmoves().get();
        (full_moves - 1) * 2 + u32::from(self.turn() == Color::Black)
    }

    /// The same position with the other side to move
    ///
    /// `None` when the side to move is in check, since the result would be illegal.
    pub fn null_move(&self) -> Option<Snapshot> {
        self.position
            .clone()
            .swap_turn()
            .ok()
            .map(Snapshot::from_position)
    }

    pub fn board(&self) -> &Board {
        self.position.board()
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Material of `color` in pawn units (P=1, N=B=3, R=5, Q=9)
    pub fn material(&self, color: Color) -> i32 {
        let board = self.board();
        let own = board.by_color(color);
        Role::ALL
            .iter()
            .map(|&role| (board.by_role(role) & own).count() as i32 * piece_value(role))
            .sum()
    }

    /// Plays a SAN move, returning the new snapshot and the move's shape
    pub fn play_san(&self, san: &str, ply: u32) -> Result<(Snapshot, MoveShape)> {
        let illegal = |reason: String| Error::IllegalMove {
            ply,
            san: san.to_string(),
            reason,
        };

        let san_plus: SanPlus = san.parse().map_err(|e| illegal(format!("{}", e)))?;
        let mv = san_plus
            .san
            .to_move(&self.position)
            .map_err(|e| illegal(format!("{}", e)))?;

        let role = mv.role();
        let capture = mv.capture();
        let is_castle = mv.is_castle();
        let from = mv.from();
        let to = mv.to();

        let next = match self.position.clone().play(mv) {
            Ok(p) => p,
            Err(_) => return Err(illegal("move rejected by position".to_string())),
        };
        let gives_check = next.is_check();

        let shape = MoveShape {
            role,
            from,
            to,
            capture,
            is_castle,
            gives_check,
        };

        Ok((Snapshot::from_position(next), shape))
    }
}

pub fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 1,
        Role::Knight | Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

/// What kind of move was played, independent of its evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveShape {
    pub role: Role,
    pub from: Option<Square>,
    pub to: Square,
    pub capture: Option<Role>,
    pub is_castle: bool,
    pub gives_check: bool,
}

impl MoveShape {
    pub fn is_capture(&self) -> bool {
        self.capture.is_some()
    }

    pub fn is_forcing(&self) -> bool {
        self.is_capture() || self.gives_check
    }

    fn is_pawn_push(&self) -> bool {
        self.role == Role::Pawn && !self.is_capture()
    }

    pub fn is_central_pawn_push(&self) -> bool {
        self.is_pawn_push() && matches!(self.to.file(), File::D | File::E)
    }

    pub fn is_flank_pawn_push(&self) -> bool {
        self.is_pawn_push() && matches!(self.to.file(), File::A | File::B | File::G | File::H)
    }

    pub fn is_queen_move(&self) -> bool {
        self.role == Role::Queen
    }

    /// Queen, rook or (non-castling) king moves, and flank pawn pushes
    pub fn looks_like_principle_violation(&self) -> bool {
        match self.role {
            Role::Queen | Role::Rook => true,
            Role::King => !self.is_castle,
            Role::Pawn => self.is_flank_pawn_push(),
            _ => false,
        }
    }

    /// Pawn pushes off the d/e files and queen moves do not develop
    pub fn is_non_developing(&self) -> bool {
        (self.is_pawn_push() && !self.is_central_pawn_push()) || self.is_queen_move()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_snapshot() {
        let snapshot = Snapshot::initial();
        assert_eq!(
            snapshot.fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
        assert_eq!(snapshot.turn(), Color::White);
        assert_eq!(snapshot.material(Color::White), 39);
        assert_eq!(snapshot.material(Color::Black), 39);
    }

    #[test]
    fn test_play_san_shapes() {
        let start = Snapshot::initial();
        let (after, shape) = start.play_san("e4", 1).unwrap();
        assert_eq!(after.turn(), Color::Black);
        assert!(shape.is_central_pawn_push());
        assert!(!shape.is_non_developing());

        let (_, shape) = start.play_san("h4", 1).unwrap();
        assert!(shape.is_flank_pawn_push());
        assert!(shape.looks_like_principle_violation());
        assert!(shape.is_non_developing());

        let (_, shape) = start.play_san("Nf3", 1).unwrap();
        assert!(!shape.looks_like_principle_violation());
        assert!(!shape.is_non_developing());
    }

    #[test]
    fn test_capture_and_check_detection() {
        let mut snapshot = Snapshot::initial();
        for (i, san) in ["e4", "d5", "exd5", "Qxd5", "Nc3", "Qe5+"].iter().enumerate() {
            let (next, shape) = snapshot.play_san(san, i as u32 + 1).unwrap();
            match *san {
                "exd5" | "Qxd5" => assert!(shape.is_capture()),
                "Qe5+" => assert!(shape.gives_check && shape.is_forcing()),
                _ => assert!(!shape.is_forcing()),
            }
            snapshot = next;
        }
        assert_eq!(snapshot.material(Color::White), 38);
        assert_eq!(snapshot.material(Color::Black), 38);
    }

    #[test]
    fn test_from_fen() {
        let snapshot = Snapshot::from_fen("4k3/8/8/8/8/8/4P3/4K3 b - - 0 40").unwrap();
        assert_eq!(snapshot.turn(), Color::Black);
        assert_eq!(snapshot.plies_before(), 79);
        assert_eq!(snapshot.material(Color::White), 1);
        assert_eq!(Snapshot::initial().plies_before(), 0);

        let err = Snapshot::from_fen("not a fen").unwrap_err();
        assert!(matches!(err, Error::InvalidFen { .. }));
    }

    #[test]
    fn test_null_move() {
        let (after_e4, _) = Snapshot::initial().play_san("e4", 1).unwrap();
        let swapped = after_e4.null_move().unwrap();
        assert_eq!(swapped.turn(), Color::White);
        assert!(swapped.play_san("d4", 3).is_ok());

        let mut checked = Snapshot::initial();
        for (i, san) in ["e4", "f5", "Qh5+"].iter().enumerate() {
            checked = checked.play_san(san, i as u32 + 1).unwrap().0;
        }
        assert!(checked.null_move().is_none());
    }

    #[test]
    fn test_illegal_move_is_an_error() {
        let start = Snapshot::initial();
        let err = start.play_san("Ke3", 1).unwrap_err();
        assert!(matches!(err, Error::IllegalMove { ply: 1, .. }));
        assert!(start.play_san("not-a-move", 1).is_err());
    }
}
