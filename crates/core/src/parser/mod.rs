//! PGN parsing into arena move trees

mod pgn;
mod tree;

pub use pgn::{parse_pgn_file, parse_pgn_string, parse_pgn_string_from, GameIdentity, ParsedGame};
pub use tree::{glyph_text, GameTree, MoveNode, NodeId};
