use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::code_block::{self, CodeBlock};
use crate::config::ChunkOptions;
use crate::error::Result;
use crate::offsets::TextIndex;
use crate::separators::{self, Separator, FALLBACK_SEPARATORS, PRIORITY_SEPARATORS};

/// How far past a cut the splitter looks for terminal punctuation
pub const SENTENCE_LOOKAHEAD_CHARS: usize = 100;

/// Share of the window (in tenths) searched for a boundary, counted from its end
const SEARCH_ZONE_TENTHS: usize = 3;

/// Share of the overlap window (in tenths) in which a paragraph break is skipped
const PARAGRAPH_SKIP_TENTHS: usize = 7;

static SECTION_STARTS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        // blank line followed by a capitalized line: the section starts at the capital
        Regex::new(r"\n[ \t]*\n([A-Z])").expect("section regex"),
        Regex::new(r"(?m)^([ \t]{0,3}#{1,6}[ \t])").expect("section header regex"),
        Regex::new(r"(?m)^([ \t]*(?i:step|phase)[ \t]+\d)").expect("section step regex"),
    ]
});

/// A chunk of text and its char span in the text that was split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpan {
    pub text: String,
    /// Char offset of the first char
    pub start: usize,
    /// Char offset past the last char (exclusive)
    pub end: usize,
}

impl ChunkSpan {
    /// Length in chars
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Splits text into size-bounded, boundary-aware, overlapping chunks.
///
/// Decision order:
///
/// 1. text that fits is returned whole
/// 2. with code-block preservation, text around fenced blocks is split with a
///    reduced separator set and every block becomes its own chunk
/// 3. with section preservation, whole sections are grouped when the groups come
///    out reasonably sized
/// 4. otherwise a cursor walks the text, cutting at the best separator found in
///    the tail of each window
///
/// The splitter is stateless; the same input always yields the same spans.
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    options: ChunkOptions,
}

impl ChunkSplitter {
    /// Create a splitter, rejecting invalid options
    pub fn new(options: ChunkOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// Get options
    #[must_use]
    pub const fn options(&self) -> &ChunkOptions {
        &self.options
    }

    /// Split text into chunk spans in document order.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<ChunkSpan> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let index = TextIndex::new(text);
        if index.len() <= self.options.chunk_size {
            return vec![ChunkSpan {
                text: text.to_string(),
                start: 0,
                end: index.len(),
            }];
        }

        if self.options.preserve_code_blocks {
            let blocks = code_block::extract_with_index(&index);
            if !blocks.is_empty() {
                log::debug!("Splitting around {} code blocks", blocks.len());
                return self.split_around_code_blocks(&index, &blocks);
            }
        }

        if self.options.preserve_sections {
            if let Some(groups) = self.split_by_sections(&index) {
                log::debug!("Kept {} section groups intact", groups.len());
                return groups;
            }
        }

        self.walk(&index, PRIORITY_SEPARATORS, &[])
    }

    /// Split text into chunk strings.
    #[must_use]
    pub fn split_texts(&self, text: &str) -> Vec<String> {
        self.split(text).into_iter().map(|span| span.text).collect()
    }

    /// Run only the priority-boundary walk over `text`.
    ///
    /// When code blocks are preserved, a block crossing a window end stretches
    /// that window to the block's close fence.
    #[must_use]
    pub fn split_with_priority(&self, text: &str) -> Vec<ChunkSpan> {
        let index = TextIndex::new(text);
        let blocks = if self.options.preserve_code_blocks {
            code_block::extract_with_index(&index)
        } else {
            Vec::new()
        };
        self.walk(&index, PRIORITY_SEPARATORS, &blocks)
    }

    fn walk(
        &self,
        index: &TextIndex<'_>,
        separators: &'static [Separator],
        blocks: &[CodeBlock],
    ) -> Vec<ChunkSpan> {
        let mut out = Vec::new();
        let walker = WindowWalker {
            index,
            separators,
            blocks,
            chunk_size: self.options.chunk_size,
            overlap: self.options.chunk_overlap,
        };
        walker.run(0, &mut out);
        out
    }

    fn split_around_code_blocks(
        &self,
        index: &TextIndex<'_>,
        blocks: &[CodeBlock],
    ) -> Vec<ChunkSpan> {
        let mut out = Vec::new();
        let mut last = 0;

        for block in blocks {
            if block.start > last {
                self.split_segment(index, last, block.start, &mut out);
            }
            out.push(ChunkSpan {
                text: block.content.clone(),
                start: block.start,
                end: block.end,
            });
            last = block.end;
        }

        if last < index.len() {
            self.split_segment(index, last, index.len(), &mut out);
        }

        out
    }

    fn split_segment(
        &self,
        index: &TextIndex<'_>,
        start: usize,
        end: usize,
        out: &mut Vec<ChunkSpan>,
    ) {
        let segment = index.slice(start, end);
        if segment.trim().is_empty() {
            return;
        }

        let segment_index = TextIndex::new(segment);
        let walker = WindowWalker {
            index: &segment_index,
            separators: FALLBACK_SEPARATORS,
            blocks: &[],
            chunk_size: self.options.chunk_size,
            overlap: self.options.chunk_overlap,
        };
        walker.run(start, out);
    }

    /// Greedily group whole sections up to the section group limit; `None` when
    /// the text has no section structure or a group falls outside the bounds.
    fn split_by_sections(&self, index: &TextIndex<'_>) -> Option<Vec<ChunkSpan>> {
        let starts = section_starts(index);
        if starts.is_empty() {
            return None;
        }

        let mut bounds = Vec::with_capacity(starts.len() + 2);
        bounds.push(0);
        bounds.extend(starts);
        bounds.push(index.len());

        let limit = self.options.section_group_limit();
        let floor = self.options.section_group_floor();

        let mut groups: Vec<(usize, usize)> = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        for pair in bounds.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            current = match current {
                Some((group_start, _)) if end - group_start <= limit => {
                    Some((group_start, end))
                }
                Some(group) => {
                    groups.push(group);
                    Some((start, end))
                }
                None => Some((start, end)),
            };
        }
        groups.extend(current);

        let mut spans = Vec::with_capacity(groups.len());

        for (start, end) in groups {
            let (start, end) = index.trim_span(start, end);
            let len = end - start;
            if len > limit || len < floor {
                log::debug!("Section group of {len} chars outside [{floor}, {limit}], falling back");
                return None;
            }
            if len > 0 {
                spans.push(ChunkSpan {
                    text: index.slice(start, end).to_string(),
                    start,
                    end,
                });
            }
        }

        Some(spans)
    }
}

/// Split text with the given options.
pub fn split_into_chunks(text: &str, options: &ChunkOptions) -> Result<Vec<String>> {
    Ok(ChunkSplitter::new(options.clone())?.split_texts(text))
}

/// Char offsets (> 0) where a new section begins.
fn section_starts(index: &TextIndex<'_>) -> Vec<usize> {
    let text = index.text();
    let mut starts: Vec<usize> = SECTION_STARTS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1))
        .map(|group| index.char_of(group.start()))
        .filter(|&pos| pos > 0 && pos < index.len())
        .collect();
    starts.sort_unstable();
    starts.dedup();
    starts
}

/// Cursor-driven window walk shared by the generic and fallback splitters.
struct WindowWalker<'t, 'i> {
    index: &'i TextIndex<'t>,
    separators: &'static [Separator],
    blocks: &'i [CodeBlock],
    chunk_size: usize,
    overlap: usize,
}

impl WindowWalker<'_, '_> {
    /// Append spans to `out`, shifting offsets by `base`.
    fn run(&self, base: usize, out: &mut Vec<ChunkSpan>) {
        let len = self.index.len();
        let mut cursor = 0;

        while cursor < len {
            let window_end = (cursor + self.chunk_size).min(len);

            let cut = match self.block_crossing(cursor, window_end) {
                Some(block) => block.end,
                None if window_end < len => {
                    let cut = self.boundary_cut(cursor, window_end);
                    let cut = self.complete_sentence(cursor, cut);
                    self.respect_code_blocks(cursor, cut)
                }
                None => window_end,
            };

            self.emit(cursor, cut, base, out);
            if cut >= len {
                break;
            }

            let next = self.next_cursor(cursor, cut);
            debug_assert!(next > cursor, "splitter must make progress");
            cursor = next;
        }
    }

    /// Code block that starts inside the window but closes past its end
    fn block_crossing(&self, cursor: usize, window_end: usize) -> Option<&CodeBlock> {
        self.blocks
            .iter()
            .find(|b| b.start >= cursor && b.start < window_end && b.end > window_end)
    }

    fn boundary_cut(&self, cursor: usize, window_end: usize) -> usize {
        let window = window_end - cursor;
        let zone = ((window * SEARCH_ZONE_TENTHS + 9) / 10).max(1);
        let zone_start = window_end - zone.min(window);

        match separators::find_boundary(self.index, self.separators, zone_start, window_end) {
            Some((_, cut)) if cut > cursor => cut,
            _ => {
                let snapped = self.index.snap_to_grapheme(window_end);
                if snapped > cursor {
                    snapped
                } else {
                    window_end
                }
            }
        }
    }

    /// Extend a cut that leaves a clause dangling up to the next terminal
    /// punctuation, if one is close.
    fn complete_sentence(&self, cursor: usize, cut: usize) -> usize {
        let chunk = self.index.slice(cursor, cut).trim_end();
        if chunk.ends_with(['.', '!', '?']) {
            return cut;
        }

        let limit = (cut + SENTENCE_LOOKAHEAD_CHARS).min(self.index.len());
        self.index
            .slice(cut, limit)
            .chars()
            .position(|c| matches!(c, '.' | '!' | '?'))
            .map_or(cut, |pos| cut + pos + 1)
    }

    /// Move a cut that landed inside a code block to one of its edges.
    fn respect_code_blocks(&self, cursor: usize, cut: usize) -> usize {
        match self.blocks.iter().find(|b| b.contains_strictly(cut)) {
            Some(block) if block.start > cursor => block.start,
            Some(block) => block.end,
            None => cut,
        }
    }

    fn next_cursor(&self, cursor: usize, cut: usize) -> usize {
        let mut next = cut.saturating_sub(self.overlap).max(cursor + 1);

        if next < cut {
            let window = self.index.slice(next, cut);
            if let Some(byte_pos) = window.find("\n\n") {
                let offset = window[..byte_pos].chars().count();
                if offset * 10 < (cut - next) * PARAGRAPH_SKIP_TENTHS {
                    next += offset + 2;
                }
            }
        }

        if let Some(block) = self.blocks.iter().find(|b| b.contains_strictly(next)) {
            next = block.end;
        }

        next
    }

    /// Push the trimmed span unless it is empty or already covered by the
    /// previous chunk.
    fn emit(&self, start: usize, end: usize, base: usize, out: &mut Vec<ChunkSpan>) {
        let (start, end) = self.index.trim_span(start, end);
        if start >= end {
            return;
        }
        if let Some(last) = out.last() {
            if base + start >= last.start && base + end <= last.end {
                return;
            }
        }
        out.push(ChunkSpan {
            text: self.index.slice(start, end).to_string(),
            start: base + start,
            end: base + end,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn splitter(chunk_size: usize, chunk_overlap: usize) -> ChunkSplitter {
        ChunkSplitter::new(ChunkOptions::with_size(chunk_size, chunk_overlap)).unwrap()
    }

    fn generic_splitter(chunk_size: usize, chunk_overlap: usize) -> ChunkSplitter {
        ChunkSplitter::new(ChunkOptions {
            preserve_sections: false,
            ..ChunkOptions::with_size(chunk_size, chunk_overlap)
        })
        .unwrap()
    }

    fn assert_spans_match(text: &str, spans: &[ChunkSpan]) {
        let index = TextIndex::new(text);
        for span in spans {
            assert_eq!(index.slice(span.start, span.end), span.text);
            assert!(!span.text.trim().is_empty());
        }
        for pair in spans.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            assert!(
                next.start <= prev.end || index.slice(prev.end, next.start).trim().is_empty(),
                "gap between {prev:?} and {next:?}"
            );
            assert!(next.start >= prev.start, "spans out of order");
            assert!(next.end > prev.end, "{next:?} adds nothing after {prev:?}");
        }
    }

    #[test]
    fn test_short_text_returned_verbatim() {
        let text = "  Short text with ```fences``` inside.\n";
        assert_eq!(splitter(100, 10).split_texts(text), vec![text.to_string()]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        assert!(splitter(10, 2).split(" \n\t ").is_empty());
        assert!(splitter(10, 2).split("").is_empty());
    }

    #[test]
    fn test_paragraph_scenario_with_sections() {
        let text = "Paragraph one.\n\nParagraph two.\n\nParagraph three.";
        let chunks = split_into_chunks(text, &ChunkOptions::with_size(20, 5)).unwrap();
        assert_eq!(chunks, vec!["Paragraph one.", "Paragraph two.", "Paragraph three."]);
    }

    #[test]
    fn test_paragraph_scenario_generic_walk() {
        let text = "Paragraph one.\n\nParagraph two.\n\nParagraph three.";
        let spans = generic_splitter(20, 5).split(text);
        let chunks: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(chunks, vec!["Paragraph one.", "Paragraph two.", "Paragraph three."]);
        assert!(spans.iter().all(|s| s.len() <= 20));
        assert_spans_match(text, &spans);
    }

    #[test]
    fn test_oversized_code_block_is_its_own_chunk() {
        let body = "let x = 1;\n".repeat(280);
        let block = format!("```rust\n{body}```");
        assert!(block.chars().count() > 3000);
        let text = format!("Intro paragraph.\n\n{block}\n\nOutro paragraph.");

        let spans = splitter(2000, 300).split(&text);
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].text, "Intro paragraph.");
        assert_eq!(spans[1].text, block);
        assert_eq!(spans[2].text, "Outro paragraph.");
        assert_spans_match(&text, &spans);
    }

    #[test]
    fn test_fences_stay_balanced() {
        let mut text = String::new();
        for i in 0..6 {
            text.push_str(&format!(
                "Section {i} explains things in prose. It keeps going for a while so the window fills up.\n\n```python\nprint({i})\nvalue = {i} * 2\n```\n\n"
            ));
        }

        let spans = splitter(80, 20).split(&text);
        assert!(spans.len() > 6);
        for span in &spans {
            assert_eq!(span.text.matches("```").count() % 2, 0, "unbalanced: {:?}", span.text);
        }
        let block_chunks = spans.iter().filter(|s| s.text.starts_with("```python")).count();
        assert_eq!(block_chunks, 6);
        assert_spans_match(&text, &spans);
    }

    #[test]
    fn test_priority_walk_stretches_window_over_code_block() {
        let text = "Intro words here and more.\n```rust\nfn main() { println!(\"hi\"); }\n```\nTail sentence here.";
        let options = ChunkOptions {
            preserve_sections: false,
            ..ChunkOptions::with_size(40, 0)
        };
        let spans = ChunkSplitter::new(options).unwrap().split_with_priority(text);

        assert_eq!(spans.len(), 2);
        assert!(spans[0].text.ends_with("```"));
        assert_eq!(spans[0].text.matches("```").count(), 2);
        assert_eq!(spans[1].text, "Tail sentence here.");
    }

    #[test]
    fn test_sentence_completion_extends_cut() {
        let text = "aaaa bbbb cccc dddd eeee ffff gggg hhhh. iiii";
        let chunks = generic_splitter(20, 0).split_texts(text);
        assert_eq!(chunks, vec!["aaaa bbbb cccc dddd eeee ffff gggg hhhh.", "iiii"]);
    }

    #[test]
    fn test_overlap_skips_dangling_paragraph() {
        let text = "Short intro line.\n\nSecond paragraph words flow on and on. Third sentence ends here. Fourth one too.";
        let chunks = generic_splitter(50, 45).split_texts(text);

        assert_eq!(chunks[0], "Short intro line.\n\nSecond paragraph words flow on and on.");
        assert!(chunks[1].starts_with("Second paragraph"));
        assert!(chunks.iter().all(|c| !c.starts_with("line.")));
    }

    #[test]
    fn test_progress_when_overlap_exceeds_size() {
        let text = "word ".repeat(40);
        let text = text.trim();
        let spans = generic_splitter(10, 50).split(text);

        assert!(!spans.is_empty());
        assert!(spans.len() <= text.chars().count());
        assert_eq!(spans.last().unwrap().end, text.chars().count());
        assert_spans_match(text, &spans);
    }

    #[test]
    fn test_multibyte_text_cuts_on_char_boundaries() {
        let text = "héllo wörld ça va. ".repeat(30);
        let spans = generic_splitter(25, 5).split(&text);

        assert!(spans.len() > 1);
        for span in &spans {
            assert!(span.len() <= 25 + SENTENCE_LOOKAHEAD_CHARS);
        }
        assert_spans_match(&text, &spans);
    }

    #[test]
    fn test_sections_kept_whole_when_well_sized() {
        let sections: Vec<String> = ["One", "Two", "Three"]
            .iter()
            .map(|name| format!("# {name}\n\n{}", "alpha ".repeat(9).trim_end()))
            .collect();
        let text = sections.join("\n\n");

        let chunks = splitter(100, 10).split_texts(&text);
        assert_eq!(
            chunks,
            vec![format!("{}\n\n{}", sections[0], sections[1]), sections[2].clone()]
        );
    }

    #[test]
    fn test_sections_merge_past_chunk_size() {
        let first = format!("# A\n\n{}", "alpha ".repeat(8).trim_end());
        let second = format!("# B\n\n{}", "gamma ".repeat(10).trim_end());
        let text = format!("{first}\n\n{second}");
        let len = text.chars().count();
        assert!(len > 100 && len <= 150);

        let spans = splitter(100, 10).split(&text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, text);
    }

    #[test]
    fn test_sections_fall_back_when_too_small_or_large() {
        let text = format!("# Intro\n\nok\n\n# Details\n\n{}", "word ".repeat(40).trim_end());
        let spans = splitter(100, 10).split(&text);

        assert!(spans.len() > 1);
        assert!(spans.iter().all(|s| s.text != "# Intro\n\nok"));
        assert!(spans.iter().all(|s| s.len() <= 100 + SENTENCE_LOOKAHEAD_CHARS));
        assert_spans_match(&text, &spans);
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha sentence here. Beta, gamma; delta.\n\nNext paragraph follows with more text. ".repeat(20);
        let a = splitter(120, 30).split(&text);
        let b = splitter(120, 30).split(&text);
        assert_eq!(a, b);
        assert_spans_match(&text, &a);
    }

    #[test]
    fn test_invalid_options_fail_fast() {
        assert!(ChunkSplitter::new(ChunkOptions::with_size(0, 0)).is_err());
        assert!(split_into_chunks("text", &ChunkOptions::with_size(0, 0)).is_err());
    }
}
