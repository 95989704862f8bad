//! Positional features of one side of a board
//!
//! All metrics are computed for a single color. They are cheap enough to be
//! recomputed before and after every move of the tracked player.

use serde::Serialize;
use shakmaty::{attacks, Bitboard, Board, Color, File, Role, Square};

const CENTER: [Square; 4] = [Square::D4, Square::E4, Square::D5, Square::E5];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KingSafety {
    pub castled: bool,
    /// Own pawns one or two ranks in front of the king, on its file or adjacent ones
    pub pawn_shield: u32,
    /// No own pawn on the king's file
    pub open_file: bool,
    /// An enemy rook or queen shares the king's file or rank, blockers ignored
    pub heavy_xray: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PawnStructure {
    pub islands: u32,
    pub isolated: u32,
    pub doubled: u32,
    pub passed: u32,
}

impl PawnStructure {
    /// Any of islands, isolated or doubled pawns increased
    pub fn worsened_from(&self, before: &PawnStructure) -> bool {
        self.islands > before.islands
            || self.isolated > before.isolated
            || self.doubled > before.doubled
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    /// Own pieces on d4, e4, d5, e5
    pub center_occupation: u32,
    pub space_score: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Development {
    pub developed_minors: u32,
    /// Knights and bishops still on their starting squares
    pub undeveloped_minors: u32,
    pub castled: bool,
    pub queen_moved: bool,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionalFeatures {
    pub king_safety: KingSafety,
    pub pawn_structure: PawnStructure,
    pub space: Space,
    pub development: Development,
}

/// Rank index from `color`'s side of the board, 0 = own back rank
fn relative_rank(square: Square, color: Color) -> i32 {
    let rank = square.rank() as i32;
    match color {
        Color::White => rank,
        Color::Black => 7 - rank,
    }
}

fn file_index(square: Square) -> i32 {
    square.file() as i32
}

pub fn extract_features(board: &Board, color: Color) -> PositionalFeatures {
    let king_safety = king_safety(board, color);
    let development = development(board, color, king_safety.castled);

    PositionalFeatures {
        king_safety,
        pawn_structure: pawn_structure(board, color),
        space: space(board, color),
        development,
    }
}

fn king_safety(board: &Board, color: Color) -> KingSafety {
    let Some(king) = board.king_of(color) else {
        return KingSafety::default();
    };

    let own_pawns = board.by_role(Role::Pawn) & board.by_color(color);
    let king_file = file_index(king);
    let king_rank = relative_rank(king, color);

    let castled = king_rank == 0
        && matches!(king.file(), File::A | File::B | File::C | File::G | File::H);

    let pawn_shield = own_pawns
        .into_iter()
        .filter(|&pawn| {
            let ahead = relative_rank(pawn, color) - king_rank;
            (file_index(pawn) - king_file).abs() <= 1 && (1..=2).contains(&ahead)
        })
        .count() as u32;

    let open_file = (own_pawns & Bitboard::from_file(king.file())).is_empty();

    let enemy_heavy =
        (board.by_role(Role::Rook) | board.by_role(Role::Queen)) & board.by_color(!color);
    let heavy_xray = (attacks::rook_attacks(king, Bitboard::EMPTY) & enemy_heavy).any();

    KingSafety {
        castled,
        pawn_shield,
        open_file,
        heavy_xray,
    }
}

fn pawn_structure(board: &Board, color: Color) -> PawnStructure {
    let own_pawns = board.by_role(Role::Pawn) & board.by_color(color);
    let enemy_pawns = board.by_role(Role::Pawn) & board.by_color(!color);

    let mut per_file = [0u32; 8];
    for pawn in own_pawns {
        per_file[file_index(pawn) as usize] += 1;
    }

    let mut islands = 0;
    let mut in_island = false;
    for &count in &per_file {
        if count > 0 && !in_island {
            islands += 1;
        }
        in_island = count > 0;
    }

    let doubled = per_file.iter().map(|&c| c.saturating_sub(1)).sum();

    let has_neighbour = |file: i32| {
        [file - 1, file + 1]
            .iter()
            .any(|&f| (0..8).contains(&f) && per_file[f as usize] > 0)
    };

    let mut isolated = 0;
    let mut passed = 0;
    for pawn in own_pawns {
        let file = file_index(pawn);
        if !has_neighbour(file) {
            isolated += 1;
        }

        let rank = relative_rank(pawn, color);
        let blocked = enemy_pawns.into_iter().any(|enemy| {
            (file_index(enemy) - file).abs() <= 1 && relative_rank(enemy, color) > rank
        });
        if !blocked {
            passed += 1;
        }
    }

    PawnStructure {
        islands,
        isolated,
        doubled,
        passed,
    }
}

fn space(board: &Board, color: Color) -> Space {
    let own = board.by_color(color);
    let own_pawns = board.by_role(Role::Pawn) & own;

    let center_occupation = CENTER.iter().filter(|&&sq| own.contains(sq)).count() as u32;

    let mut controlled = Bitboard::EMPTY;
    for pawn in own_pawns {
        controlled |= attacks::pawn_attacks(color, pawn);
    }
    let forward_control = controlled
        .into_iter()
        .filter(|&sq| (3..=5).contains(&relative_rank(sq, color)))
        .count() as i32;
    let advanced_pawns = own_pawns
        .into_iter()
        .filter(|&sq| relative_rank(sq, color) >= 3)
        .count() as i32;

    Space {
        center_occupation,
        space_score: forward_control + advanced_pawns + center_occupation as i32,
    }
}

fn development(board: &Board, color: Color, castled: bool) -> Development {
    let own = board.by_color(color);
    let (knight_homes, bishop_homes, queen_home) = match color {
        Color::White => ([Square::B1, Square::G1], [Square::C1, Square::F1], Square::D1),
        Color::Black => ([Square::B8, Square::G8], [Square::C8, Square::F8], Square::D8),
    };

    let knights = board.by_role(Role::Knight) & own;
    let bishops = board.by_role(Role::Bishop) & own;

    let undeveloped_minors = knight_homes.iter().filter(|&&sq| knights.contains(sq)).count()
        as u32
        + bishop_homes.iter().filter(|&&sq| bishops.contains(sq)).count() as u32;
    let developed_minors = (knights.count() + bishops.count()) as u32 - undeveloped_minors;

    let queen_moved = !(board.by_role(Role::Queen) & own).contains(queen_home);

    let castle_bonus = if castled { 15 } else { 0 };
    let queen_penalty = if queen_moved { 5 } else { 0 };
    let score = developed_minors as i32 * 10 + castle_bonus - queen_penalty;

    Development {
        developed_minors,
        undeveloped_minors,
        castled,
        queen_moved,
        score,
    }
}
