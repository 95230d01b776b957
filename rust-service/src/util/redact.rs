//! Helpers for keeping secrets and large bodies out of logs.

/// Mask a secret for logging, keeping the first 10 and last 4 characters.
///
/// Secrets of 14 characters or fewer are fully masked.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 14 {
        return "*".repeat(chars.len());
    }

    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Truncate text to at most `max_chars` characters for logging.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
