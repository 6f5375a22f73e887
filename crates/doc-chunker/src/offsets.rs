use unicode_segmentation::GraphemeCursor;

/// Char ↔ byte offset index over a string.
///
/// All public positions in this crate are char offsets; regex matching and slicing
/// work on bytes. Going through this index guarantees that no slice ever starts or
/// ends inside a multi-byte char.
pub(crate) struct TextIndex<'a> {
    text: &'a str,
    /// Byte offset of every char, followed by `text.len()`
    boundaries: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn byte_of(&self, char_idx: usize) -> usize {
        self.boundaries[char_idx.min(self.len())]
    }

    /// Char offset of a byte position; positions inside a char round down.
    pub fn char_of(&self, byte_idx: usize) -> usize {
        match self.boundaries.binary_search(&byte_idx) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    /// Slice by char offsets
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.byte_of(start)..self.byte_of(end.max(start))]
    }

    pub fn char_at(&self, char_idx: usize) -> Option<char> {
        self.slice(char_idx, char_idx + 1).chars().next()
    }

    /// Move a char offset back to the nearest grapheme cluster boundary.
    pub fn snap_to_grapheme(&self, char_idx: usize) -> usize {
        let byte = self.byte_of(char_idx);
        let mut cursor = GraphemeCursor::new(byte, self.text.len(), true);
        match cursor.is_boundary(self.text, 0) {
            Ok(true) | Err(_) => char_idx,
            Ok(false) => match cursor.prev_boundary(self.text, 0) {
                Ok(Some(prev)) => self.char_of(prev),
                _ => char_idx,
            },
        }
    }

    /// Shrink `[start, end)` to exclude leading and trailing whitespace.
    pub fn trim_span(&self, start: usize, end: usize) -> (usize, usize) {
        let raw = self.slice(start, end);
        let leading = raw.chars().take_while(|c| c.is_whitespace()).count();
        if leading == raw.chars().count() {
            return (end, end);
        }
        let trailing = raw.chars().rev().take_while(|c| c.is_whitespace()).count();
        (start + leading, end - trailing)
    }
}
