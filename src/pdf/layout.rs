use crate::fonts::{FontBook, FontWeight};

/// Greedy word wrap on whitespace, counting characters.
///
/// Words are accumulated while the line stays within `max_chars`; a word that
/// would overflow starts a new line. A word longer than the budget is placed
/// alone on its own line rather than hyphenated. Empty input yields a single
/// empty line so callers can always index line 0.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Keep at most `max_lines` lines, marking the last kept one with an ellipsis
/// when any were dropped.
pub(super) fn clamp_lines(mut lines: Vec<String>, max_lines: usize) -> Vec<String> {
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push_str(" …");
        }
    }
    lines
}

/// x at which `text` starts so that it ends at `anchor`.
pub(super) fn right_aligned_x(
    fonts: &FontBook,
    weight: FontWeight,
    text: &str,
    font_size: f32,
    anchor: f32,
) -> f32 {
    anchor - fonts.text_width(weight, text, font_size)
}

/// Trim `text` with an ellipsis so it fits `max_width` points.
pub(super) fn fit_width(
    fonts: &FontBook,
    weight: FontWeight,
    text: &str,
    font_size: f32,
    max_width: f32,
) -> String {
    if fonts.text_width(weight, text, font_size) <= max_width {
        return text.to_string();
    }
    let ellipsis = "…";
    let budget = max_width - fonts.text_width(weight, ellipsis, font_size);
    let mut out = String::new();
    let mut width = 0.0f32;
    for ch in text.chars() {
        let w = fonts.text_width(weight, ch.encode_utf8(&mut [0u8; 4]), font_size);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    out.truncate(out.trim_end().len());
    out.push_str(ellipsis);
    out
}
