//! PGN parsing into annotated move trees

use pgn_reader::{Nag, RawComment, RawTag, SanPlus, Skip, Visitor};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::tree::{GameTree, NodeId};
use crate::error::Result;

const PLACEHOLDER: &str = "?";

/// Header metadata of one parsed game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameIdentity {
    /// Position of the game within its batch
    pub index: usize,
    /// Where the game came from, e.g. a file path
    pub source: String,
    pub event: String,
    pub site: String,
    pub date: String,
    pub round: String,
    pub white: String,
    pub black: String,
    pub result: String,
    pub eco: Option<String>,
    pub opening: Option<String>,
    pub variation: Option<String>,
    /// Starting position when the game does not begin from the initial array
    pub fen: Option<String>,
    /// True when required headers were missing and placeholders were used
    pub synthetic_headers: bool,
}

impl GameIdentity {
    pub fn summary(&self) -> String {
        format!("{} vs {} - {}", self.white, self.black, self.result)
    }
}

/// A game ready for analysis
#[derive(Debug, Clone)]
pub struct ParsedGame {
    pub identity: Arc<GameIdentity>,
    pub tree: GameTree,
}

impl ParsedGame {
    pub fn move_count(&self) -> usize {
        self.tree.mainline_len()
    }
}

#[derive(Default)]
struct GameTags {
    seen_any: bool,
    event: Option<String>,
    site: Option<String>,
    date: Option<String>,
    round: Option<String>,
    white: Option<String>,
    black: Option<String>,
    result: Option<String>,
    eco: Option<String>,
    opening: Option<String>,
    variation: Option<String>,
    fen: Option<String>,
}

impl GameTags {
    fn missing_required(&self) -> bool {
        [
            &self.event,
            &self.site,
            &self.date,
            &self.round,
            &self.white,
            &self.black,
            &self.result,
        ]
        .iter()
        .any(|tag| tag.is_none())
    }
}

struct GameMoves {
    tags: GameTags,
    tree: GameTree,
    /// parents[i] is the parent of node i; the root is its own parent
    parents: Vec<NodeId>,
    cursor: NodeId,
    variation_stack: Vec<NodeId>,
}

impl GameMoves {
    fn new(tags: GameTags) -> Self {
        let tree = GameTree::new();
        let root = tree.root();
        Self {
            tags,
            tree,
            parents: vec![root],
            cursor: root,
            variation_stack: Vec::new(),
        }
    }

    fn parent_of(&self, id: NodeId) -> NodeId {
        self.parents[id.index()]
    }
}

struct RawGame {
    tags: GameTags,
    tree: GameTree,
}

struct TreeParser;

impl Visitor for TreeParser {
    type Tags = GameTags;
    type Movetext = GameMoves;
    type Output = RawGame;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let name_str = String::from_utf8_lossy(name);
        let value_str = value.decode_utf8_lossy().trim().to_string();
        tags.seen_any = true;

        let slot = match name_str.as_ref() {
            "Event" => &mut tags.event,
            "Site" => &mut tags.site,
            "Date" => &mut tags.date,
            "Round" => &mut tags.round,
            "White" => &mut tags.white,
            "Black" => &mut tags.black,
            "Result" => &mut tags.result,
            "ECO" => &mut tags.eco,
            "Opening" => &mut tags.opening,
            "Variation" => &mut tags.variation,
            "FEN" => &mut tags.fen,
            _ => return ControlFlow::Continue(()),
        };

        if slot.is_none() && !value_str.is_empty() {
            *slot = Some(value_str);
        }

        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(GameMoves::new(tags))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        let id = movetext.tree.add_child(movetext.cursor, san.to_string());
        movetext.parents.push(movetext.cursor);
        movetext.cursor = id;
        ControlFlow::Continue(())
    }

    fn nag(&mut self, movetext: &mut Self::Movetext, nag: Nag) -> ControlFlow<Self::Output> {
        let cursor = movetext.cursor;
        movetext.tree.node_mut(cursor).nags.push(nag.0);
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes()).trim().to_string();
        if !text.is_empty() {
            let cursor = movetext.cursor;
            movetext.tree.node_mut(cursor).comments.push(text);
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        // A variation replaces the move just played, so it hangs off that move's parent.
        movetext.variation_stack.push(movetext.cursor);
        movetext.cursor = movetext.parent_of(movetext.cursor);
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, movetext: &mut Self::Movetext) -> ControlFlow<Self::Output> {
        let root = movetext.tree.root();
        movetext.cursor = movetext.variation_stack.pop().unwrap_or(root);
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        RawGame {
            tags: movetext.tags,
            tree: movetext.tree,
        }
    }
}

fn read_raw_games(pgn: &str) -> Vec<RawGame> {
    let mut parser = TreeParser;
    let mut games = Vec::new();

    let cursor = Cursor::new(pgn.as_bytes());
    let mut reader = pgn_reader::Reader::new(cursor);

    loop {
        match reader.read_game(&mut parser) {
            Ok(Some(game)) => {
                if game.tags.seen_any || !game.tree.is_empty() {
                    games.push(game);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, games_read = games.len(), "PGN reader stopped early");
                break;
            }
        }
    }

    games
}

/// Rebuilds the text as a single game with placeholder headers
fn wrap_as_single_game(pgn: &str) -> String {
    let movetext: Vec<&str> = pgn
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('['))
        .collect();

    format!(
        "[Event \"?\"]\n[Site \"?\"]\n[Date \"????.??.??\"]\n[Round \"?\"]\n\
         [White \"?\"]\n[Black \"?\"]\n[Result \"*\"]\n\n{}\n",
        movetext.join("\n")
    )
}

fn into_parsed(raw: RawGame, index: usize, source: &str, force_synthetic: bool) -> ParsedGame {
    let synthetic_headers = force_synthetic || raw.tags.missing_required();
    let tags = raw.tags;
    let placeholder = || PLACEHOLDER.to_string();

    let identity = GameIdentity {
        index,
        source: source.to_string(),
        event: tags.event.unwrap_or_else(placeholder),
        site: tags.site.unwrap_or_else(placeholder),
        date: tags.date.unwrap_or_else(|| "????.??.??".to_string()),
        round: tags.round.unwrap_or_else(placeholder),
        white: tags.white.unwrap_or_else(placeholder),
        black: tags.black.unwrap_or_else(placeholder),
        result: tags.result.unwrap_or_else(|| "*".to_string()),
        eco: tags.eco,
        opening: tags.opening,
        variation: tags.variation,
        fen: tags.fen,
        synthetic_headers,
    };

    ParsedGame {
        identity: Arc::new(identity),
        tree: raw.tree,
    }
}

/// Parses every game in `pgn`, numbering them from `first_index`
///
/// Text that yields no games at all is retried once as a single game with
/// placeholder headers. An empty result is not an error.
pub fn parse_pgn_string_from(pgn: &str, source: &str, first_index: usize) -> Vec<ParsedGame> {
    let mut raw_games = read_raw_games(pgn);
    let mut wrapped = false;

    if raw_games.is_empty() && !pgn.trim().is_empty() {
        debug!(source, "no games found, wrapping text as a single game");
        raw_games = read_raw_games(&wrap_as_single_game(pgn))
            .into_iter()
            .filter(|game| !game.tree.is_empty())
            .collect();
        wrapped = true;
    }

    raw_games
        .into_iter()
        .enumerate()
        .map(|(offset, raw)| into_parsed(raw, first_index + offset, source, wrapped))
        .collect()
}

pub fn parse_pgn_string(pgn: &str, source: &str) -> Vec<ParsedGame> {
    parse_pgn_string_from(pgn, source, 0)
}

pub fn parse_pgn_file<P: AsRef<Path>>(path: P) -> Result<Vec<ParsedGame>> {
    let contents = fs::read_to_string(&path)?;
    let source = path.as_ref().display().to_string();
    Ok(parse_pgn_string(&contents, &source))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PGN: &str = r#"[Event "Test"]
[Site "Local"]
[Date "2024.01.01"]
[Round "1"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]
[ECO "C55"]
[Opening "Italian Game, Two Knights Defense"]

1. e4 { [%eval 0.3] } e5 2. Nf3 Nc6 (2... d6 { [%eval 0.5] } 3. d4) 3. Bc4?! Nf6 1-0
"#;

    #[test]
    fn test_parse_headers() {
        let games = parse_pgn_string(SAMPLE_PGN, "sample");
        assert_eq!(games.len(), 1);

        let game = &games[0].identity;
        assert_eq!(game.white, "Alice");
        assert_eq!(game.black, "Bob");
        assert_eq!(game.result, "1-0");
        assert_eq!(game.eco.as_deref(), Some("C55"));
        assert_eq!(game.opening.as_deref(), Some("Italian Game, Two Knights Defense"));
        assert_eq!(game.source, "sample");
        assert!(!game.synthetic_headers);
        assert!(game.fen.is_none());
        assert_eq!(game.summary(), "Alice vs Bob - 1-0");
    }

    #[test]
    fn test_variation_becomes_sibling() {
        let games = parse_pgn_string(SAMPLE_PGN, "sample");
        let tree = &games[0].tree;
        let mainline = tree.mainline();
        assert_eq!(mainline.len(), 6);

        // 2... d6 is an alternative to 2... Nc6, so both hang off 2. Nf3
        let nf3 = mainline[2];
        let alternatives = tree.alternatives(nf3);
        assert_eq!(alternatives.len(), 1);
        let d6 = tree.node(alternatives[0]);
        assert_eq!(d6.san.as_deref(), Some("d6"));
        assert_eq!(d6.comments, vec!["[%eval 0.5]".to_string()]);
        assert_eq!(d6.children.len(), 1);
        assert_eq!(tree.node(mainline[3]).san.as_deref(), Some("Nc6"));
    }

    #[test]
    fn test_glyphs_and_comments_attach_to_move() {
        let games = parse_pgn_string(SAMPLE_PGN, "sample");
        let tree = &games[0].tree;
        let mainline = tree.mainline();
        assert_eq!(tree.node(mainline[0]).comments, vec!["[%eval 0.3]".to_string()]);
        assert!(tree.node(mainline[4]).has_negative_glyph());
        assert_eq!(tree.node(mainline[4]).glyphs(), vec!["?!".to_string()]);
    }

    #[test]
    fn test_missing_headers_get_placeholders() {
        let pgn = "[White \"Alice\"]\n\n1. e4 e5 *\n";
        let games = parse_pgn_string(pgn, "sample");
        assert_eq!(games.len(), 1);
        let game = &games[0].identity;
        assert_eq!(game.white, "Alice");
        assert_eq!(game.black, "?");
        assert_eq!(game.result, "*");
        assert!(game.synthetic_headers);
        assert_eq!(games[0].move_count(), 2);
    }

    #[test]
    fn test_fen_tag_is_kept() {
        let pgn = "[White \"Alice\"]\n[SetUp \"1\"]\n\
                   [FEN \"4k3/8/8/8/8/8/4P3/4K3 b - - 0 40\"]\n\n40... Kd7 *\n";
        let games = parse_pgn_string(pgn, "sample");
        assert_eq!(games.len(), 1);
        assert_eq!(
            games[0].identity.fen.as_deref(),
            Some("4k3/8/8/8/8/8/4P3/4K3 b - - 0 40")
        );
    }

    #[test]
    fn test_multiple_games_are_indexed() {
        let pgn = format!("{}\n{}", SAMPLE_PGN, SAMPLE_PGN);
        let games = parse_pgn_string_from(&pgn, "sample", 10);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].identity.index, 10);
        assert_eq!(games[1].identity.index, 11);
    }

    #[test]
    fn test_empty_input_yields_no_games() {
        assert!(parse_pgn_string("", "empty").is_empty());
        assert!(parse_pgn_string("   \n\n", "empty").is_empty());
    }
}
