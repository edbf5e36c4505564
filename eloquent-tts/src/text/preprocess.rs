//! Emotion markup rewriting and pause amplification
//!
//! Rules run in this order:
//! 1. `[laughing]` becomes `hahaha! `
//! 2. `[excited]` is removed; text not ending in `!` gets `!!!` appended
//! 3. `[whisper]` / `[whispering]` are removed; text gets a `... ` prefix
//! 4. any other `[...]` tag is removed
//! 5. `...` is doubled to `... ...`, and `, ` becomes `, ... `
//!
//! Tag matching is ASCII case-insensitive. The result is trimmed.

use once_cell::sync::Lazy;
use regex::Regex;

static LAUGHING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[laughing\]").expect("valid regex"));
static EXCITED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[excited\]").expect("valid regex"));
static WHISPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[whisper(?:ing)?\]").expect("valid regex"));
/// Shortest `[...]` span on one line
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").expect("valid regex"));

/// Rewrite raw request text into text ready for segmentation
pub fn preprocess(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut text = LAUGHING.replace_all(text, "hahaha! ").into_owned();

    if EXCITED.is_match(&text) {
        text = EXCITED.replace_all(&text, "").trim().to_string();
        if !text.ends_with('!') {
            text.push_str("!!!");
        }
    }

    if WHISPER.is_match(&text) {
        text = format!("... {}", WHISPER.replace_all(&text, "").trim());
    }

    let text = ANY_TAG.replace_all(&text, "");
    let text = text.replace("...", "... ...").replace(", ", ", ... ");

    text.trim().to_string()
}
