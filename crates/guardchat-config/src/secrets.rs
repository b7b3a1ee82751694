//! Rendering helpers that keep credential values out of logs and terminals.

/// Values at or below this length are fully hidden.
const MIN_REVEAL_LEN: usize = 12;

/// Number of characters kept at each end of a long secret.
const REVEAL_CHARS: usize = 4;

/// Mask a secret for display: `sk-p…wxyz` for long values, `****` otherwise.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= MIN_REVEAL_LEN {
        return "****".to_string();
    }
    let head: String = chars[..REVEAL_CHARS].iter().collect();
    let tail: String = chars[chars.len() - REVEAL_CHARS..].iter().collect();
    format!("{}…{}", head, tail)
}

/// Shorten a non-secret identifier (e.g. a policy id) to its first 8 characters.
pub fn preview(value: &str) -> String {
    let mut chars = value.chars();
    let head: String = chars.by_ref().take(8).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
