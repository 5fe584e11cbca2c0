//! Text normalization for project names and filename slugs.
//!
//! Both transforms strip diacritics by NFKD decomposition and then drop
//! everything that is not ASCII, so `"Příliš žluťoučký"` becomes
//! `"Prilis zlutoucky"` before any further filtering.

use unicode_normalization::UnicodeNormalization;

/// Default maximum slug length in characters.
pub const DEFAULT_SLUG_LENGTH: usize = 100;

/// ASCII whitespace in the broad sense: also vertical tab and the
/// information separators `\x1c`..`\x1f`.
fn is_space(ch: char) -> bool {
    ch.is_ascii_whitespace() || matches!(ch, '\x0b' | '\x1c'..='\x1f')
}

/// Decompose and keep only ASCII characters.
fn strip_diacritics(text: &str) -> String {
    text.nfkd().filter(char::is_ascii).collect()
}

/// Normalize a free-form name into an identifier made of `[A-Za-z0-9_]`.
///
/// Whitespace, `-` and `.` runs become a single `_`, other characters are
/// dropped, repeated underscores collapse and the result is trimmed of `_`.
/// An empty result means the input carried nothing usable.
pub fn normalize_identifier(text: &str) -> String {
    let ascii = strip_diacritics(text);

    let mut out = String::with_capacity(ascii.len());
    for ch in ascii.chars() {
        let mapped = if is_space(ch) || ch == '-' || ch == '.' {
            '_'
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            ch
        } else {
            continue;
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }

    out.trim_matches('_').to_string()
}

/// Turn a subject line into a lowercase filename slug of at most `max_length` characters.
///
/// Keeps `[a-z0-9_-]`, turns whitespace and hyphen runs into one `-`, and
/// trims hyphens from both ends. Never fails; may return an empty string.
pub fn slugify(text: &str, max_length: usize) -> String {
    let lowered = strip_diacritics(text).to_ascii_lowercase();

    let mut collapsed = String::with_capacity(lowered.len());
    for ch in lowered.chars() {
        if is_space(ch) || ch == '-' {
            if !collapsed.ends_with('-') {
                collapsed.push('-');
            }
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            collapsed.push(ch);
        }
    }

    // Only ASCII remains, so byte truncation is char truncation.
    collapsed.truncate(max_length);
    collapsed.trim_matches('-').to_string()
}
