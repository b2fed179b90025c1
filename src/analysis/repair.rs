//! Deterministic repair of near-JSON produced by language models.
//!
//! The rewrites run in a fixed order and the result is parsed exactly once:
//!
//! 1. strip `//` line comments and `/* */` block comments
//! 2. single-quoted keys and values become double-quoted
//! 3. drop trailing commas before `}` or `]`
//! 4. quote bare identifier keys
//!
//! Nothing here guesses at missing structure. Text that still fails to parse
//! after the last rewrite is reported as unrepairable.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::OnceLock;

fn single_quoted_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"'([^'\n]*)'(\s*):").expect("valid regex"))
}

fn single_quoted_value() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":(\s*)'([^'\n]*)'").expect("valid regex"))
}

fn trailing_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("valid regex"))
}

fn bare_key() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)(\s*):").expect("valid regex")
    })
}

/// Whether `text` parses as strict JSON.
pub fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<Value>(text).is_ok()
}

/// Repair `candidate` into strictly parsable JSON.
///
/// Already-valid input is returned unchanged. Returns `None` if the
/// rewritten text still does not parse.
pub fn repair_json(candidate: &str) -> Option<String> {
    if is_valid_json(candidate) {
        return Some(candidate.to_string());
    }

    let text = strip_comments(candidate);
    let text = requote_single_quotes(&text);
    let text = map_outside_strings(&text, |segment| {
        trailing_comma().replace_all(segment, "$1").into_owned()
    });
    let text = map_outside_strings(&text, |segment| {
        bare_key().replace_all(segment, "$1\"$2\"$3:").into_owned()
    });

    if is_valid_json(&text) {
        Some(text)
    } else {
        None
    }
}

/// Remove `//` and `/* */` comments that sit outside double-quoted strings.
///
/// An unterminated block comment is left in place.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some((i, c)) = chars.next() {
        if in_string {
            out.push(c);
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        let lookahead = chars.peek().map(|&(_, next)| next);
        match (c, lookahead) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                // Skip to end of line; the newline itself is kept.
                while let Some(&(_, next)) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => match text[i + 2..].find("*/") {
                Some(end) => {
                    let resume = i + 2 + end + 2;
                    while chars.peek().is_some_and(|&(j, _)| j < resume) {
                        chars.next();
                    }
                }
                None => out.push(c),
            },
            _ => out.push(c),
        }
    }

    out
}

/// Turn `'key':` and `: 'value'` into their double-quoted forms.
///
/// Text inside double-quoted strings is never touched.
fn requote_single_quotes(text: &str) -> String {
    map_outside_strings(text, |segment| {
        let keyed = single_quoted_key().replace_all(segment, |caps: &Captures| {
            format!("\"{}\"{}:", escape_double_quotes(&caps[1]), &caps[2])
        });
        single_quoted_value()
            .replace_all(&keyed, |caps: &Captures| {
                format!(":{}\"{}\"", &caps[1], escape_double_quotes(&caps[2]))
            })
            .into_owned()
    })
}

fn escape_double_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

/// Apply `rewrite` to every stretch of `text` outside double-quoted strings.
///
/// A single-quoted run closed on the same line stays inside its stretch, so a
/// `"` within it does not open a string.
fn map_outside_strings<F>(text: &str, rewrite: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut out = String::with_capacity(text.len());
    let mut segment_start = 0;
    let mut in_string = false;
    let mut in_single = false;
    let mut escape_next = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if c == '\\' {
                escape_next = true;
            } else if c == '"' {
                in_string = false;
                out.push_str(&text[segment_start..=i]);
                segment_start = i + 1;
            }
        } else if in_single {
            if c == '\'' {
                in_single = false;
            }
        } else if c == '\'' {
            in_single = closes_on_same_line(&text[i + 1..]);
        } else if c == '"' {
            out.push_str(&rewrite(&text[segment_start..i]));
            segment_start = i;
            in_string = true;
        }
    }

    let tail = &text[segment_start..];
    if in_string {
        out.push_str(tail);
    } else {
        out.push_str(&rewrite(tail));
    }

    out
}

fn closes_on_same_line(rest: &str) -> bool {
    rest.find(['\'', '\n']).is_some_and(|end| rest[end..].starts_with('\''))
}
