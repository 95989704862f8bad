use chess_mistakes_core::{
    analyze_batch, AnalysisConfig, AnalysisResult, IssueKind, PlayerColor, Severity,
};

fn game(white: &str, black: &str, opening: &str, movetext: &str) -> String {
    format!(
        "[Event \"Casual\"]\n[Site \"Local\"]\n[Date \"2024.05.01\"]\n[Round \"-\"]\n\
         [White \"{}\"]\n[Black \"{}\"]\n[Result \"*\"]\n[Opening \"{}\"]\n\n{} *\n\n",
        white, black, opening, movetext
    )
}

fn analyze(pgn: &str, player: &str) -> AnalysisResult {
    analyze_batch(pgn, "scenario.pgn", player, &AnalysisConfig::default())
}

fn mixed_batch() -> String {
    [
        game(
            "Dana",
            "Eve",
            "Italian Game, Two Knights",
            "1. e4 { [%eval 0.3] } e5 { [%eval 0.3] } 2. Nf3 { [%eval 0.3] } Nc6 { [%eval 0.3] } \
             3. Bc4 { [%eval 0.3] } Bc5 { [%eval 0.3] } 4. Ng5 { [%eval -0.4] } ( 4. d3 { [%eval 0.3] } ) \
             Nh6 { [%eval -0.4] } 5. h4 { [%eval -3.5] } Qxg5 { [%eval -3.5] }",
        ),
        game(
            "Eve",
            "Dana Smith",
            "Sicilian Defense: Najdorf",
            "1. e4 { [%eval 0.3] } c5 { [%eval 0.3] } 2. Nf3 { [%eval 0.3] } d6 { [%eval 0.3] } \
             3. d4 { [%eval 0.3] } cxd4 { [%eval 0.3] } 4. Nxd4 { [%eval 0.3] } Nf6 { [%eval 0.3] } \
             5. Nc3 { [%eval 0.3] } a6 { [%eval 0.3] } 6. Be2 { [%eval 0.3] } h5?! { [%eval 0.9] } \
             7. O-O { [%eval 0.9] } Qa5 { [%eval 2.4] } ( 7... e5 { [%eval 0.8] } ) 8. Nb3 { [%eval 2.4] }",
        ),
        game(
            "Dana",
            "Frank",
            "Italian Game: Giuoco Piano",
            "1. e4 { [%eval 0.3] } e5 { [%eval 0.3] } 2. Nf3 { [%eval 0.3] } Nc6 { [%eval 0.3] } \
             3. Bc4 { [%eval 0.3] } Bc5 { [%eval 0.3] } 4. Qe2 { [%eval -0.9] } ( 4. c3 { [%eval 0.4] } ) \
             Nf6 { [%eval -0.9] }",
        ),
        game("Grace", "Heidi", "Ruy Lopez", "1. e4 { [%eval 0.3] } e5 { [%eval 0.3] }"),
    ]
    .concat()
}

#[test]
fn test_large_swing_with_better_sibling_is_tactical_blunder() {
    let pgn = game(
        "Alice",
        "Bob",
        "Queen's Pawn Game",
        "1. d4 { [%eval 0.3] } d5 { [%eval 2.5] } 2. Nf3 { [%eval -0.5] } ( 2. c4 { [%eval 2.0] } ) \
         Nf6 { [%eval -0.5] }",
    );
    let result = analyze(&pgn, "Alice");

    assert_eq!(result.mistakes.len(), 1);
    let mistake = &result.mistakes[0];
    assert_eq!(mistake.san, "Nf3");
    assert_eq!(mistake.eval_loss, 300);
    assert_eq!(mistake.severity, Severity::Blunder);
    assert_eq!(mistake.kind, IssueKind::TacticalBlunder);

    let best = mistake.best_alternative.as_ref().unwrap();
    assert_eq!(best.san, "c4");
    assert_eq!(best.eval, Some(200));
    assert_eq!(best.gain, Some(250));
}

#[test]
fn test_glyph_in_hopeless_position_emits_nothing() {
    let hopeless = game(
        "Alice",
        "Bob",
        "King's Pawn Game",
        "1. e4 { [%eval 0.3] } e5 { [%eval -10.0] } 2. Nf3?? { [%eval -10.0] } ( 2. Nc3 { [%eval -10.5] } ) \
         Nc6 { [%eval -10.0] }",
    );
    assert!(analyze(&hopeless, "alice").mistakes.is_empty());

    // the same glyph in a normal position is still reported
    let playable = hopeless.replace("-10.0", "0.2").replace("-10.5", "0.3");
    let result = analyze(&playable, "alice");
    assert_eq!(result.mistakes.len(), 1);
    assert_eq!(result.mistakes[0].glyphs, vec!["??"]);
    assert_eq!(result.mistakes[0].kind, IssueKind::PositionalMisplay);
    assert_eq!(result.mistakes[0].severity, Severity::Inaccuracy);
}

#[test]
fn test_italian_variations_aggregate_into_one_bucket() {
    let result = analyze(&mixed_batch(), "dana");

    let italian: Vec<_> = result
        .by_opening
        .iter()
        .filter(|stats| stats.opening == "Italian Game")
        .collect();
    assert_eq!(italian.len(), 1);
    assert_eq!(italian[0].color, PlayerColor::White);
    assert_eq!(italian[0].games, 2);

    let sicilian = result
        .by_opening
        .iter()
        .find(|stats| stats.opening == "Sicilian Defense")
        .unwrap();
    assert_eq!(sicilian.color, PlayerColor::Black);
    assert_eq!(sicilian.games, 1);
}

#[test]
fn test_piece_lost_on_reply_escalates() {
    let pgn = game(
        "Alice",
        "Bob",
        "Scandinavian Defense",
        "1. e4 { [%eval 0.3] } d5 { [%eval 0.3] } 2. Nc3 { [%eval 0.3] } Nf6 { [%eval 0.3] } \
         3. Nb5 { [%eval 0.3] } a6 { [%eval 0.3] } 4. Nd4 { [%eval 0.3] } e5 { [%eval 0.0] } \
         5. Nf5 { [%eval -0.9] } Bxf5 { [%eval -3.0] }",
    );
    let result = analyze(&pgn, "alice");

    assert_eq!(result.mistakes.len(), 1);
    let mistake = &result.mistakes[0];
    assert_eq!(mistake.kind, IssueKind::MaterialLoss);
    assert_eq!(mistake.severity, Severity::Blunder);
    assert!(mistake.material_escalated);
    assert_eq!(mistake.reply.as_ref().unwrap().san, "Bxf5");
}

#[test]
fn test_matching_and_counts() {
    let pgn = mixed_batch();

    let dana = analyze(&pgn, "Dana");
    assert_eq!(dana.total_games_parsed, 4);
    assert_eq!(dana.games_matched_player, 3);
    assert_eq!(dana.summary.games_as_white, 2);
    assert_eq!(dana.summary.games_as_black, 1);

    let nobody = analyze(&pgn, "Mallory");
    assert_eq!(nobody.total_games_parsed, 4);
    assert_eq!(nobody.games_matched_player, 0);
    assert!(nobody.mistakes.is_empty());
    assert!(nobody.by_opening.is_empty());
}

#[test]
fn test_result_invariants() {
    let result = analyze(&mixed_batch(), "dana");
    assert!(!result.mistakes.is_empty());

    for pair in result.mistakes.windows(2) {
        assert!(pair[0].eval_loss >= pair[1].eval_loss);
    }

    for mistake in &result.mistakes {
        if matches!(mistake.severity, Severity::Blunder | Severity::Mistake) {
            assert!(mistake.eval_loss > 0 || mistake.material_escalated);
        }
        let mover = match mistake.player_color {
            PlayerColor::White => &mistake.game.white,
            PlayerColor::Black => &mistake.game.black,
        };
        assert!(mover.starts_with("Dana"));
    }

    let issues: u32 = result.by_opening.iter().flat_map(|s| s.issue_counts.values()).sum();
    let themes: u32 = result.by_opening.iter().flat_map(|s| s.theme_counts.values()).sum();
    assert_eq!(issues as usize, result.mistakes.len());
    assert_eq!(themes as usize, result.mistakes.len());
    assert_eq!(result.summary.total_mistakes as usize, result.mistakes.len());
}

#[test]
fn test_output_is_deterministic() {
    let pgn = mixed_batch();
    let first = analyze(&pgn, "dana").to_json(true).unwrap();
    let second = analyze(&pgn, "dana").to_json(true).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_empty_and_headerless_batches() {
    let empty = analyze("", "alice");
    assert_eq!(empty.total_games_parsed, 0);
    assert_eq!(empty.games_matched_player, 0);
    assert!(empty.mistakes.is_empty());

    let headerless = analyze("1. e4 { [%eval 0.3] } e5 2. Nf3 *\n", "alice");
    assert_eq!(headerless.total_games_parsed, 1);
    assert_eq!(headerless.games_matched_player, 0);
}
