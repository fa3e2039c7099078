/// Greedy word wrap to `width` characters per line.
///
/// Whitespace runs collapse to single spaces. Words longer than `width`
/// are split, filling the remainder of the current line first.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        let needed = if current_len == 0 { word_len } else { current_len + 1 + word_len };

        if needed <= width {
            if current_len > 0 {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
            continue;
        }

        if word_len <= width {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
            continue;
        }

        // Long word: top up the current line, then emit full-width chunks.
        let mut chars = word.chars().peekable();
        if current_len > 0 {
            let space_left = width.saturating_sub(current_len + 1);
            if space_left > 0 {
                current.push(' ');
                current.extend(chars.by_ref().take(space_left));
            }
            lines.push(std::mem::take(&mut current));
        }
        loop {
            let chunk: String = chars.by_ref().take(width).collect();
            let chunk_len = chunk.chars().count();
            if chars.peek().is_none() {
                current = chunk;
                current_len = chunk_len;
                break;
            }
            lines.push(chunk);
        }
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}
