//! Batch analysis and the final report

use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::parser::{parse_pgn_file, parse_pgn_string, ParsedGame};
use crate::patterns::{infer_theme, GameWalker, PlayerMistake};
use crate::stats::{opening_stats, summarize, AnalysisSummary, GameSummary, OpeningStats};

/// Everything found for one player across a batch of games
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub player: String,
    pub total_games_parsed: u32,
    pub games_matched_player: u32,
    /// Sorted by evaluation loss, largest first
    pub mistakes: Vec<PlayerMistake>,
    pub by_opening: Vec<OpeningStats>,
    pub summary: AnalysisSummary,
}

impl AnalysisResult {
    pub fn empty(player: &str) -> Self {
        Self {
            player: player.to_string(),
            total_games_parsed: 0,
            games_matched_player: 0,
            mistakes: Vec::new(),
            by_opening: Vec::new(),
            summary: AnalysisSummary::default(),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Analyzes already-parsed games for `player`
pub fn analyze_games(
    games: &[ParsedGame],
    player: &str,
    config: &AnalysisConfig,
) -> AnalysisResult {
    let walker = GameWalker::new(config);
    let mut summaries = Vec::new();
    let mut mistakes = Vec::new();

    for game in games {
        let walk = walker.walk(game, player);
        let Some(color) = walk.color else {
            continue;
        };
        summaries.push(GameSummary {
            identity: game.identity.clone(),
            color: color.into(),
            plies_analyzed: walk.plies_analyzed,
        });
        mistakes.extend(walk.mistakes);
    }

    for mistake in &mut mistakes {
        mistake.theme = infer_theme(mistake, config);
        mistake.description = mistake.describe();
    }
    // stable, so equal losses keep input order
    mistakes.sort_by(|a, b| b.eval_loss.cmp(&a.eval_loss));

    let result = AnalysisResult {
        player: player.to_string(),
        total_games_parsed: games.len() as u32,
        games_matched_player: summaries.len() as u32,
        by_opening: opening_stats(&summaries, &mistakes, config.top_patterns),
        summary: summarize(&summaries, &mistakes, config.top_patterns),
        mistakes,
    };

    info!(
        player,
        games = result.total_games_parsed,
        matched = result.games_matched_player,
        mistakes = result.mistakes.len(),
        "analysis complete"
    );
    result
}

/// Parses and analyzes one PGN text
///
/// Never fails: unparsable text yields a report with zero games.
pub fn analyze_batch(
    pgn: &str,
    source: &str,
    player: &str,
    config: &AnalysisConfig,
) -> AnalysisResult {
    let games = parse_pgn_string(pgn, source);
    if games.is_empty() {
        warn!(source, "no games found in batch");
        return AnalysisResult::empty(player);
    }
    analyze_games(&games, player, config)
}

/// Parses every file and analyzes the games together
///
/// Game indices run across files so each game stays distinct.
pub fn analyze_files<P: AsRef<Path>>(
    paths: &[P],
    player: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisResult> {
    let mut games = Vec::new();
    for path in paths {
        let parsed = parse_pgn_file(path)?;
        if parsed.is_empty() {
            warn!(path = %path.as_ref().display(), "no games found in file");
        }
        games.extend(parsed);
    }

    for (index, game) in games.iter_mut().enumerate() {
        if game.identity.index != index {
            let mut identity = (*game.identity).clone();
            identity.index = index;
            game.identity = identity.into();
        }
    }

    Ok(analyze_games(&games, player, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{IssueKind, Severity};

    const GAME: &str = r#"[Event "Club"]
[Site "Local"]
[Date "2024.03.02"]
[Round "1"]
[White "Alice"]
[Black "Bob"]
[Result "0-1"]
[ECO "C50"]
[Opening "Italian Game: Giuoco Piano"]

1. e4 { [%eval 0.3] } e5 { [%eval 0.3] } 2. Nf3 { [%eval 0.3] } Nc6 { [%eval 0.3] }
3. Bc4 { [%eval 0.3] } Bc5 { [%eval 0.3] } 4. Ng5 { [%eval -0.4] } ( 4. c3 { [%eval 0.3] } )
4... Nh6 { [%eval -0.4] } 5. h4 { [%eval -3.5] } ( 5. d3 { [%eval -0.3] } ) 5... Qxg5 { [%eval -3.5] } 0-1
"#;

    #[test]
    fn test_analyze_batch() {
        let config = AnalysisConfig::default();
        let result = analyze_batch(GAME, "club.pgn", "alice", &config);

        assert_eq!(result.total_games_parsed, 1);
        assert_eq!(result.games_matched_player, 1);
        assert_eq!(result.mistakes.len(), 2);
        assert_eq!(result.mistakes[0].san, "h4");
        assert_eq!(result.mistakes[0].severity, Severity::Blunder);
        assert_eq!(result.mistakes[1].san, "Ng5");
        assert!(!result.mistakes[0].description.is_empty());

        assert_eq!(result.by_opening.len(), 1);
        assert_eq!(result.by_opening[0].opening, "Italian Game");
        assert_eq!(result.by_opening[0].eco.as_deref(), Some("C50"));
        assert_eq!(result.summary.games_as_white, 1);
    }

    #[test]
    fn test_material_escalation_and_sorting() {
        let config = AnalysisConfig::default();
        let result = analyze_batch(GAME, "club.pgn", "alice", &config);

        // h4 loses the knight on g5 right away
        let h4 = &result.mistakes[0];
        assert_eq!(h4.kind, IssueKind::MaterialLoss);
        assert!(h4.material_escalated);

        for pair in result.mistakes.windows(2) {
            assert!(pair[0].eval_loss >= pair[1].eval_loss);
        }
    }

    #[test]
    fn test_unmatched_and_empty_batches() {
        let config = AnalysisConfig::default();

        let result = analyze_batch(GAME, "club.pgn", "carol", &config);
        assert_eq!(result.total_games_parsed, 1);
        assert_eq!(result.games_matched_player, 0);
        assert!(result.mistakes.is_empty());
        assert!(result.by_opening.is_empty());

        let result = analyze_batch("", "empty.pgn", "alice", &config);
        assert_eq!(result.total_games_parsed, 0);
        assert!(result.mistakes.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let config = AnalysisConfig::default();
        let result = analyze_batch(GAME, "club.pgn", "alice", &config);
        let text = result.to_json(false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["totalGamesParsed"], 1);
        assert_eq!(json["gamesMatchedPlayer"], 1);
        assert_eq!(json["mistakes"][0]["kind"], "material_loss");
        assert_eq!(json["mistakes"][0]["severity"], "blunder");
        assert_eq!(json["mistakes"][0]["game"]["white"], "Alice");
        assert!(json["byOpening"][0]["issueCounts"].is_object());
        let empty = AnalysisResult::empty("alice").to_json(true).unwrap();
        assert_eq!(empty.lines().next(), Some("{"));
    }
}
