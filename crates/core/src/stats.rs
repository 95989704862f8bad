//! Aggregation of flagged moves by opening and color

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::parser::GameIdentity;
use crate::patterns::{IssueKind, PlayerColor, PlayerMistake, Severity, Theme};

const UNKNOWN_OPENING: &str = "Unknown Opening";

/// A matched game as the aggregator sees it
#[derive(Debug, Clone)]
pub struct GameSummary {
    pub identity: Arc<GameIdentity>,
    pub color: PlayerColor,
    pub plies_analyzed: u32,
}

/// Opening name with variation detail removed
///
/// "Italian Game, Two Knights Defense" and "Italian Game: Giuoco Piano" both
/// become "Italian Game". Falls back to the ECO code, then to a fixed label.
pub fn base_opening_name(identity: &GameIdentity) -> String {
    let base = identity
        .opening
        .as_deref()
        .map(|name| {
            let cut = name.find([',', ':', '(']).unwrap_or(name.len());
            name[..cut].trim()
        })
        .filter(|name| !name.is_empty() && *name != "?");

    match (base, identity.eco.as_deref()) {
        (Some(name), _) => name.to_string(),
        (None, Some(eco)) if !eco.is_empty() && eco != "?" => eco.to_string(),
        _ => UNKNOWN_OPENING.to_string(),
    }
}

/// A recurring mistake: same ply, same move, same classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MistakePattern {
    pub ply: u32,
    pub move_number: u32,
    pub san: String,
    pub kind: IssueKind,
    pub theme: Theme,
    pub count: u32,
    pub average_loss: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PatternKey {
    ply: u32,
    san: String,
    kind: IssueKind,
    theme: Theme,
}

#[derive(Debug, Clone, Copy, Default)]
struct PatternTally {
    count: u32,
    total_loss: i64,
}

/// Counters shared by buckets and the global summary
#[derive(Debug, Clone, Default)]
struct Tally {
    mistakes: u32,
    severity_counts: BTreeMap<Severity, u32>,
    issue_counts: BTreeMap<IssueKind, u32>,
    theme_counts: BTreeMap<Theme, u32>,
    patterns: BTreeMap<PatternKey, PatternTally>,
}

impl Tally {
    fn record(&mut self, mistake: &PlayerMistake) {
        self.mistakes += 1;
        *self.severity_counts.entry(mistake.severity).or_default() += 1;
        *self.issue_counts.entry(mistake.kind).or_default() += 1;
        *self.theme_counts.entry(mistake.theme).or_default() += 1;

        let key = PatternKey {
            ply: mistake.ply,
            san: mistake.san.clone(),
            kind: mistake.kind,
            theme: mistake.theme,
        };
        let entry = self.patterns.entry(key).or_default();
        entry.count += 1;
        entry.total_loss += i64::from(mistake.eval_loss);
    }

    /// Most frequent signatures, ties broken by higher average loss
    fn top_patterns(&self, limit: usize) -> Vec<MistakePattern> {
        let mut ranked: Vec<(&PatternKey, &PatternTally)> = self.patterns.iter().collect();
        ranked.sort_by(|(key_a, a), (key_b, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| compare_average(b, a))
                .then_with(|| key_a.cmp(key_b))
        });

        ranked
            .into_iter()
            .take(limit)
            .map(|(key, tally)| MistakePattern {
                ply: key.ply,
                move_number: key.ply.div_ceil(2),
                san: key.san.clone(),
                kind: key.kind,
                theme: key.theme,
                count: tally.count,
                average_loss: (tally.total_loss / i64::from(tally.count.max(1))) as i32,
            })
            .collect()
    }
}

/// Orders by average loss without dividing
fn compare_average(a: &PatternTally, b: &PatternTally) -> Ordering {
    (a.total_loss * i64::from(b.count)).cmp(&(b.total_loss * i64::from(a.count)))
}

/// Statistics for one (color, base opening) bucket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningStats {
    pub color: PlayerColor,
    pub opening: String,
    /// Present only when every game in the bucket shares the same code
    pub eco: Option<String>,
    /// Distinct games, not flagged moves
    pub games: u32,
    pub plies_analyzed: u32,
    pub mistakes: u32,
    pub severity_counts: BTreeMap<Severity, u32>,
    pub issue_counts: BTreeMap<IssueKind, u32>,
    pub theme_counts: BTreeMap<Theme, u32>,
    pub top_patterns: Vec<MistakePattern>,
}

#[derive(Debug, Default)]
struct Bucket {
    games: BTreeSet<usize>,
    ecos: BTreeSet<Option<String>>,
    plies_analyzed: u32,
    tally: Tally,
}

impl Bucket {
    fn add_game(&mut self, identity: &GameIdentity, plies_analyzed: u32) {
        if self.games.insert(identity.index) {
            self.ecos.insert(identity.eco.clone());
            self.plies_analyzed += plies_analyzed;
        }
    }

    fn unique_eco(&self) -> Option<String> {
        match self.ecos.iter().collect::<Vec<_>>().as_slice() {
            [Some(eco)] => Some(eco.clone()),
            _ => None,
        }
    }
}

/// Groups matched games and their flagged moves by color and base opening
///
/// Games without any flagged move still count toward their bucket.
pub fn opening_stats(
    games: &[GameSummary],
    mistakes: &[PlayerMistake],
    top_patterns: usize,
) -> Vec<OpeningStats> {
    let mut buckets: BTreeMap<(PlayerColor, String), Bucket> = BTreeMap::new();

    for game in games {
        let key = (game.color, base_opening_name(&game.identity));
        buckets
            .entry(key)
            .or_default()
            .add_game(&game.identity, game.plies_analyzed);
    }

    for mistake in mistakes {
        let key = (mistake.player_color, base_opening_name(&mistake.game));
        let bucket = buckets.entry(key).or_default();
        bucket.add_game(&mistake.game, 0);
        bucket.tally.record(mistake);
    }

    let mut stats: Vec<OpeningStats> = buckets
        .into_iter()
        .map(|((color, opening), bucket)| OpeningStats {
            color,
            opening,
            eco: bucket.unique_eco(),
            games: bucket.games.len() as u32,
            plies_analyzed: bucket.plies_analyzed,
            mistakes: bucket.tally.mistakes,
            top_patterns: bucket.tally.top_patterns(top_patterns),
            severity_counts: bucket.tally.severity_counts,
            issue_counts: bucket.tally.issue_counts,
            theme_counts: bucket.tally.theme_counts,
        })
        .collect();

    stats.sort_by(|a, b| {
        a.color
            .cmp(&b.color)
            .then_with(|| b.games.cmp(&a.games))
            .then_with(|| a.opening.cmp(&b.opening))
    });
    stats
}

/// Batch-wide totals
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_mistakes: u32,
    pub games_as_white: u32,
    pub games_as_black: u32,
    pub plies_analyzed: u32,
    pub severity_counts: BTreeMap<Severity, u32>,
    pub issue_counts: BTreeMap<IssueKind, u32>,
    pub theme_counts: BTreeMap<Theme, u32>,
    pub top_patterns: Vec<MistakePattern>,
}

impl AnalysisSummary {
    pub fn count(&self, severity: Severity) -> u32 {
        self.severity_counts.get(&severity).copied().unwrap_or(0)
    }
}

pub fn summarize(
    games: &[GameSummary],
    mistakes: &[PlayerMistake],
    top_patterns: usize,
) -> AnalysisSummary {
    let mut tally = Tally::default();
    for mistake in mistakes {
        tally.record(mistake);
    }

    let games_with = |color: PlayerColor| games.iter().filter(|g| g.color == color).count() as u32;

    AnalysisSummary {
        total_mistakes: tally.mistakes,
        games_as_white: games_with(PlayerColor::White),
        games_as_black: games_with(PlayerColor::Black),
        plies_analyzed: games.iter().map(|g| g.plies_analyzed).sum(),
        top_patterns: tally.top_patterns(top_patterns),
        severity_counts: tally.severity_counts,
        issue_counts: tally.issue_counts,
        theme_counts: tally.theme_counts,
    }
}
