//! Text normalization into a storage-safe character set.
//!
//! The pipeline is: drop code points outside the allow-list (noncharacters
//! included), replace mojibake emoji with ASCII tags, then normalize whitespace.
//! Every step is a pure function of its input and the whole pipeline is
//! idempotent.

use serde_json::Value;

use crate::config::WhitespaceMode;

/// UTF-8 emoji that were decoded as Windows-1252, mapped to ASCII tags.
///
/// Entries that are a prefix of another entry come after it.
const CORRUPTED_EMOJI: &[(&str, &str)] = &[
    ("\u{f0}\u{178}\u{161}\u{20ac}", "[ROCKET]"),
    ("\u{e2}\u{153}\u{2026}", "[CHECK]"),
    ("\u{e2}\u{153}\u{201d}\u{ef}\u{b8}\u{8f}", "[CHECK]"),
    ("\u{e2}\u{153}\u{201d}", "[CHECK]"),
    ("\u{e2}\u{9d}\u{152}", "[CROSS]"),
    ("\u{e2}\u{161}\u{a0}\u{ef}\u{b8}\u{8f}", "[WARNING]"),
    ("\u{e2}\u{161}\u{a0}", "[WARNING]"),
    ("\u{e2}\u{201e}\u{b9}\u{ef}\u{b8}\u{8f}", "[INFO]"),
    ("\u{f0}\u{178}\u{201c}\u{9d}", "[NOTE]"),
    ("\u{f0}\u{178}\u{2019}\u{a1}", "[IDEA]"),
    ("\u{f0}\u{178}\u{201d}\u{a5}", "[FIRE]"),
    ("\u{f0}\u{178}\u{17d}\u{af}", "[TARGET]"),
    ("\u{f0}\u{178}\u{17d}\u{2030}", "[PARTY]"),
    ("\u{f0}\u{178}\u{201c}\u{152}", "[PIN]"),
    ("\u{f0}\u{178}\u{201c}\u{161}", "[BOOKS]"),
    ("\u{f0}\u{178}\u{201c}\u{a6}", "[PACKAGE]"),
    ("\u{e2}\u{153}\u{a8}", "[SPARKLES]"),
    ("\u{f0}\u{178}\u{201d}\u{a7}", "[TOOL]"),
    ("\u{f0}\u{178}\u{201d}\u{2019}", "[LOCK]"),
    ("\u{f0}\u{178}\u{2018}\u{2030}", "[POINT]"),
    ("\u{f0}\u{178}\u{90}\u{203a}", "[BUG]"),
    ("\u{e2}\u{ad}\u{90}", "[STAR]"),
    ("\u{e2}\u{17e}\u{a1}\u{ef}\u{b8}\u{8f}", "[ARROW]"),
    ("\u{e2}\u{17e}\u{a1}", "[ARROW]"),
];

/// Unicode blocks that survive sanitization (inclusive ranges).
const ALLOWED_BLOCKS: &[(u32, u32)] = &[
    (0x0000, 0x007F), // Basic Latin
    (0x0080, 0x00FF), // Latin-1 Supplement
    (0x0100, 0x017F), // Latin Extended-A
    (0x0180, 0x024F), // Latin Extended-B
    (0x1E00, 0x1EFF), // Latin Extended Additional
    (0x2000, 0x206F), // General Punctuation
    (0x20A0, 0x20CF), // Currency Symbols
    (0x2100, 0x214F), // Letterlike Symbols
];

/// Sanitize text, collapsing all whitespace to single spaces.
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    sanitize_text_with(text, WhitespaceMode::Collapse)
}

/// Sanitize text with an explicit whitespace mode.
#[must_use]
pub fn sanitize_text_with(text: &str, mode: WhitespaceMode) -> String {
    let filtered: String = text.chars().filter(|&c| is_allowed(c)).collect();
    let replaced = replace_corrupted_emoji(filtered);

    match mode {
        WhitespaceMode::Collapse => collapse_whitespace(&replaced),
        WhitespaceMode::PreserveLines => normalize_lines(&replaced),
    }
}

/// Sanitize an arbitrary JSON value; anything but a string yields `""`.
#[must_use]
pub fn sanitize_value(value: &Value) -> String {
    match value {
        Value::String(text) => sanitize_text(text),
        _ => String::new(),
    }
}

/// Sanitize raw bytes of unknown quality.
///
/// Invalid sequences decode to U+FFFD, which lies outside the allow-list and is
/// therefore dropped.
#[must_use]
pub fn sanitize_bytes(bytes: &[u8], mode: WhitespaceMode) -> String {
    sanitize_text_with(&String::from_utf8_lossy(bytes), mode)
}

fn is_allowed(c: char) -> bool {
    let cp = u32::from(c);
    if is_surrogate(cp) || is_noncharacter(cp) {
        return false;
    }
    ALLOWED_BLOCKS
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&cp))
}

// `char` cannot hold a surrogate; kept so the rule reads the same for code points
// that arrive through a lossy UTF-16 bridge.
const fn is_surrogate(cp: u32) -> bool {
    matches!(cp, 0xD800..=0xDFFF)
}

const fn is_noncharacter(cp: u32) -> bool {
    matches!(cp, 0xFDD0..=0xFDEF) || (cp & 0xFFFE) == 0xFFFE
}

fn replace_corrupted_emoji(text: String) -> String {
    if !text.contains(['\u{f0}', '\u{e2}']) {
        return text;
    }

    CORRUPTED_EMOJI
        .iter()
        .fold(text, |acc, (corrupted, tag)| {
            if acc.contains(corrupted) {
                acc.replace(corrupted, tag)
            } else {
                acc
            }
        })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_lines(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut previous_blank = false;

    for line in unified.split('\n') {
        let line = line.trim_end();
        let blank = line.is_empty();
        if blank && previous_blank {
            continue;
        }
        if !out.is_empty() || !blank {
            out.push_str(line);
            out.push('\n');
        }
        previous_blank = blank;
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_collapses_whitespace_and_trims() {
        assert_eq!(sanitize_text("  hello \n\n\t world  "), "hello world");
    }

    #[test]
    fn test_replaces_corrupted_rocket() {
        let corrupted = "Launch \u{f0}\u{178}\u{161}\u{20ac} now";
        assert_eq!(sanitize_text(corrupted), "Launch [ROCKET] now");
    }

    #[test]
    fn test_replaces_warning_with_variation_selector() {
        let corrupted = "\u{e2}\u{161}\u{a0}\u{ef}\u{b8}\u{8f} careful";
        assert_eq!(sanitize_text(corrupted), "[WARNING] careful");
    }

    #[test]
    fn test_drops_code_points_outside_allow_list() {
        assert_eq!(sanitize_text("caf\u{e9} \u{1F680} \u{4E2D}\u{6587} ok"), "caf\u{e9} ok");
        assert_eq!(sanitize_text("price \u{20AC}5 \u{2122}"), "price \u{20AC}5 \u{2122}");
    }

    #[test]
    fn test_drops_noncharacters() {
        assert_eq!(sanitize_text("a\u{FDD0}b\u{FFFE}c\u{FFFF}"), "abc");
        assert!(is_noncharacter(0x1FFFE));
        assert!(!is_noncharacter(0xFFFD));
    }

    #[test]
    fn test_non_string_value_yields_empty() {
        assert_eq!(sanitize_value(&serde_json::json!(42)), "");
        assert_eq!(sanitize_value(&Value::Null), "");
        assert_eq!(sanitize_value(&serde_json::json!(" a  b ")), "a b");
    }

    #[test]
    fn test_lossy_bytes() {
        let bytes = b"ok \xff\xfe bytes";
        assert_eq!(sanitize_bytes(bytes, WhitespaceMode::Collapse), "ok bytes");
    }

    #[test]
    fn test_preserve_lines_mode() {
        let text = "# Title  \r\n\r\n\r\n\nBody line\n    indented\n\n";
        assert_eq!(
            sanitize_text_with(text, WhitespaceMode::PreserveLines),
            "# Title\n\nBody line\n    indented"
        );
    }

    #[test]
    fn test_idempotent_in_both_modes() {
        let samples = [
            "",
            "   ",
            "plain text",
            "  lots   of\n\n\nspace \u{a0} here ",
            "\u{e2}\u{161}\u{a0}\u{ef}\u{b8}\u{8f} mixed \u{1F680}\u{f0}\u{178}\u{161}\u{20ac}",
            "\u{f0}\u{1F600}\u{178}\u{161}\u{20ac} reassembled",
            "code:\n```rust\nfn main() {}\n```\r\n\r\nend",
        ];
        for sample in samples {
            for mode in [WhitespaceMode::Collapse, WhitespaceMode::PreserveLines] {
                let once = sanitize_text_with(sample, mode);
                let twice = sanitize_text_with(&once, mode);
                assert_eq!(once, twice, "not idempotent for {sample:?} in {mode:?}");
            }
        }
    }

    #[test]
    fn test_filtering_cannot_assemble_a_table_entry_twice() {
        // The emoji between the pieces is removed before replacement runs.
        let text = "\u{f0}\u{1F600}\u{178}\u{161}\u{20ac}";
        assert_eq!(sanitize_text(text), "[ROCKET]");
    }
}
