//! Text helpers used by chat input and account forms
//!
//! Everything here is pure and allocation-light; regexes are compiled once.

use once_cell::sync::Lazy;
use regex::Regex;

/// Default omission appended by [`truncate_text`]
pub const OMISSION: &str = "...";

// Any emoji-ish code point, except the keycap bases `*`, `#` and digits which
// Unicode also flags as Emoji.
static EMOJI_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[[\p{Emoji}\p{Emoji_Modifier}\p{Emoji_Component}",
        r"\p{Emoji_Modifier_Base}\p{Emoji_Presentation}]--[*#0-9]]",
    ))
    .expect("emoji regex is valid")
});

static MULTI_SPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s\s+").expect("whitespace regex is valid"));

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_.\-]+@([A-Za-z0-9_\-]+\.)+[A-Za-z0-9_\-]{2,4}$")
        .expect("email regex is valid")
});

/// Truncate `text` so the result, omission included, is at most `length`
/// characters long.
pub fn truncate_text(text: &str, length: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= length {
        return text.to_string();
    }

    let omission_len = OMISSION.chars().count();
    if length <= omission_len {
        return OMISSION.to_string();
    }

    let kept: String = text.chars().take(length - omission_len).collect();
    format!("{kept}{OMISSION}")
}

/// True when nothing but emoji and whitespace remains in `text`.
///
/// An empty string counts as emoji-only.
pub fn validate_text_contains_only_emoji(text: &str) -> bool {
    EMOJI_REGEX.replace_all(text, "").trim().is_empty()
}

/// Number of emoji code points in `text`
pub fn get_emoji_amount(text: &str) -> usize {
    EMOJI_REGEX.find_iter(text).count()
}

/// Collapse runs of whitespace into a single space and trim both ends
pub fn remove_double_spaces(text: &str) -> String {
    MULTI_SPACE_REGEX.replace_all(text, " ").trim().to_string()
}

/// True when `text` starts (after leading whitespace and an optional sign)
/// with a decimal digit, the same inputs an integer prefix parser accepts.
pub fn validate_number(text: &str) -> bool {
    let trimmed = text.trim_start();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);
    unsigned.chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// Loose e-mail shape check: `local@domain.tld` with a 2-4 char TLD
pub fn validate_email(text: &str) -> bool {
    EMAIL_REGEX.is_match(text)
}
