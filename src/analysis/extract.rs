//! Locating a JSON object inside free-form model output.
//!
//! Models wrap their answer in prose, markdown fences or both. A single pass
//! over the text pairs each `}` with its open `{`, skipping braces inside
//! double-quoted strings, and keeps the longest balanced block.

/// Maximum characters of raw output kept in diagnostic log lines.
pub const LOG_EXCERPT_CHARS: usize = 500;

/// Extract the longest balanced `{ ... }` block from `text`.
///
/// When two blocks have the same length the earlier one wins. An unclosed
/// `{` is ignored, so the blocks nested inside a truncated object are still
/// found. Runs in one pass over the text. Returns `None` when the text
/// holds no balanced block.
pub fn extract_json_block(text: &str) -> Option<&str> {
    let mut best: Option<&str> = None;
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text.char_indices() {
        // Quotes in the prose around a block do not open strings.
        if open.is_empty() {
            if c == '{' {
                open.push(i);
            }
            continue;
        }

        if in_string {
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    let candidate = &text[start..=i];
                    if best.map_or(true, |b| candidate.len() > b.len()) {
                        best = Some(candidate);
                    }
                }
            }
            _ => {}
        }
    }

    best
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
