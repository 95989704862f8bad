//! Matching a player name against the White/Black headers

use shakmaty::Color;

const MIN_TOKEN_LEN: usize = 3;

/// Lowercases and turns punctuation into token boundaries
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// How closely a header names the player; higher is better
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NameMatch {
    None,
    SharedToken,
    Contains,
    Exact,
}

pub fn match_name(player: &str, header: &str) -> NameMatch {
    let player = normalize_name(player);
    let header = normalize_name(header);

    if player.is_empty() || header.is_empty() {
        return NameMatch::None;
    }
    if player == header {
        return NameMatch::Exact;
    }

    let squashed_player: String = player.split(' ').collect();
    let squashed_header: String = header.split(' ').collect();
    if squashed_player == squashed_header
        || header.contains(&player)
        || player.contains(&header)
        || squashed_header.contains(&squashed_player)
    {
        return NameMatch::Contains;
    }

    let shared = player
        .split(' ')
        .filter(|token| token.len() >= MIN_TOKEN_LEN)
        .any(|token| header.split(' ').any(|other| other == token));
    if shared {
        NameMatch::SharedToken
    } else {
        NameMatch::None
    }
}

/// Side the player had in the game, if either header plausibly names them
///
/// The closer match wins; White wins a tie.
pub fn match_player_color(player: &str, white: &str, black: &str) -> Option<Color> {
    let as_white = match_name(player, white);
    let as_black = match_name(player, black);

    match (as_white, as_black) {
        (NameMatch::None, NameMatch::None) => None,
        (w, b) if w >= b => Some(Color::White),
        _ => Some(Color::Black),
    }
}
