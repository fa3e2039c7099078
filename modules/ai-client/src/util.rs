/// Longest prefix of `s` that fits in `max_bytes` without splitting a character.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    &s[..end]
}

/// Unwrap a model reply fenced as ```` ```lang ... ``` ````. Any language tag on
/// the opening fence is dropped; unfenced replies are only trimmed.
pub fn strip_code_blocks(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) if !rest[..newline].contains('{') && !rest[..newline].contains('[') => {
            &rest[newline + 1..]
        }
        _ => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
