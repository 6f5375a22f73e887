use once_cell::sync::Lazy;
use regex::Regex;

use crate::offsets::TextIndex;

/// Chars past the window end a pattern may inspect for trailing context
/// (a capital letter, a header marker). Cuts never land there.
const LOOKAHEAD_CHARS: usize = 8;

/// Boundary kinds considered when cutting a chunk.
///
/// Each pattern has exactly one capture group; the cut goes right after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// Blank line followed by a header or a capitalized line
    SectionBreak,
    /// Line that opens a code fence
    CodeFenceStart,
    /// Bare fence line, usually the closing one
    CodeFenceEnd,
    /// Line that starts a `Step N` / `Phase N` marker
    StepBreak,
    /// Line that starts a list item
    ListStart,
    /// Sentence followed by a blank line
    ParagraphEnd,
    DoubleNewline,
    /// Terminal punctuation followed by a capitalized word
    SentenceBeforeCapital,
    SentenceEnd,
    Newline,
    Semicolon,
    Comma,
    Space,
}

/// Full priority list used by the generic splitter
pub(crate) const PRIORITY_SEPARATORS: &[Separator] = &[
    Separator::SectionBreak,
    Separator::CodeFenceStart,
    Separator::CodeFenceEnd,
    Separator::StepBreak,
    Separator::ListStart,
    Separator::ParagraphEnd,
    Separator::DoubleNewline,
    Separator::SentenceBeforeCapital,
    Separator::SentenceEnd,
    Separator::Newline,
    Separator::Semicolon,
    Separator::Comma,
    Separator::Space,
];

/// Reduced list for text between code blocks
pub(crate) const FALLBACK_SEPARATORS: &[Separator] = &[
    Separator::DoubleNewline,
    Separator::SentenceEnd,
    Separator::Newline,
];

const ALL: [Separator; 13] = [
    Separator::SectionBreak,
    Separator::CodeFenceStart,
    Separator::CodeFenceEnd,
    Separator::StepBreak,
    Separator::ListStart,
    Separator::ParagraphEnd,
    Separator::DoubleNewline,
    Separator::SentenceBeforeCapital,
    Separator::SentenceEnd,
    Separator::Newline,
    Separator::Semicolon,
    Separator::Comma,
    Separator::Space,
];

static COMPILED: Lazy<Vec<Regex>> = Lazy::new(|| {
    ALL.iter()
        .map(|sep| Regex::new(sep.pattern()).expect("separator regex"))
        .collect()
});

impl Separator {
    /// Lower is preferred; equal values form one tier
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::SectionBreak => 1,
            Self::CodeFenceStart | Self::CodeFenceEnd | Self::StepBreak => 2,
            Self::ListStart => 3,
            Self::ParagraphEnd => 4,
            Self::DoubleNewline => 5,
            Self::SentenceBeforeCapital => 6,
            Self::SentenceEnd => 7,
            Self::Newline => 8,
            Self::Semicolon => 9,
            Self::Comma => 10,
            Self::Space => 11,
        }
    }

    const fn pattern(self) -> &'static str {
        match self {
            Self::SectionBreak => r"(\n[ \t]*\n)(?:#{1,6}[ \t]|[A-Z])",
            Self::CodeFenceStart => r"(\n)[ \t]*```",
            Self::CodeFenceEnd => r"(```[ \t]*\n)",
            Self::StepBreak => r"(\n)[ \t]*(?i:step|phase)[ \t]+\d",
            Self::ListStart => r"(\n)[ \t]*(?:[-*+•]|\d+[.)])[ \t]",
            Self::ParagraphEnd => r"[.!?](\n[ \t]*\n)",
            Self::DoubleNewline => r"(\n[ \t]*\n)",
            Self::SentenceBeforeCapital => r"([.!?][ \t]+)[A-Z]",
            Self::SentenceEnd => r"([.!?][ \t])",
            Self::Newline => r"(\n)",
            Self::Semicolon => r"(;[ \t])",
            Self::Comma => r"(,[ \t])",
            Self::Space => r"( )",
        }
    }

    fn regex(self) -> &'static Regex {
        // `ALL` lists the variants in declaration order
        &COMPILED[self as usize]
    }

    /// Rightmost cut produced by this separator inside `(zone_start, zone_end]`.
    fn rightmost_cut(
        self,
        index: &TextIndex<'_>,
        zone_start: usize,
        zone_end: usize,
    ) -> Option<usize> {
        let hay_start = index.byte_of(zone_start);
        let hay_end = index.byte_of((zone_end + LOOKAHEAD_CHARS).min(index.len()));
        let haystack = &index.text()[hay_start..hay_end];

        self.regex()
            .captures_iter(haystack)
            .filter_map(|caps| caps.get(1))
            .map(|group| index.char_of(hay_start + group.end()))
            .filter(|&cut| cut > zone_start && cut <= zone_end)
            .last()
    }
}

/// Pick the best cut in `(zone_start, zone_end]`.
///
/// Separators are evaluated tier by tier; the first tier with any match wins and
/// the rightmost match within that tier is used.
pub(crate) fn find_boundary(
    index: &TextIndex<'_>,
    separators: &[Separator],
    zone_start: usize,
    zone_end: usize,
) -> Option<(Separator, usize)> {
    let mut best: Option<(Separator, usize)> = None;

    for &sep in separators {
        if let Some((found, _)) = best {
            if sep.priority() > found.priority() {
                break;
            }
        }

        if let Some(cut) = sep.rightmost_cut(index, zone_start, zone_end) {
            best = match best {
                Some((found, existing)) if existing >= cut => Some((found, existing)),
                _ => Some((sep, cut)),
            };
        }
    }

    best
}
