//! TextOffsetIndex - UTF-16 code unit <-> byte offset conversion
//!
//! Regex and link detectors report byte spans into the UTF-8 text; the rest of
//! the system addresses text in UTF-16 code units. The index is built once per
//! resolution and converts in O(log n) per lookup.
//!
//! Emoji such as 😊 are one grapheme, one `char`, four bytes and two code
//! units. An offset pointing between the two halves is rejected rather than
//! rounded.

use std::ops::Range;
use unicode_segmentation::UnicodeSegmentation;

use super::types::{AnnotationError, TextRange};

/// Length of `text` in UTF-16 code units
pub fn code_unit_length(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Substring of `text` addressed in code units
pub fn substring(text: &str, range: TextRange) -> Result<&str, AnnotationError> {
    TextOffsetIndex::new(text).substring(range)
}

/// Boundary table for one text
#[derive(Debug, Clone)]
pub struct TextOffsetIndex<'a> {
    text: &'a str,
    /// (code unit offset, byte offset) at every char start, plus the end
    boundaries: Vec<(usize, usize)>,
}

impl<'a> TextOffsetIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries = Vec::with_capacity(text.len() + 1);
        let mut units = 0;
        for (byte, ch) in text.char_indices() {
            boundaries.push((units, byte));
            units += ch.len_utf16();
        }
        boundaries.push((units, text.len()));

        Self { text, boundaries }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn code_unit_len(&self) -> usize {
        self.boundaries.last().map(|(units, _)| *units).unwrap_or(0)
    }

    /// Byte offset of a code unit offset
    pub fn byte_offset(&self, code_unit: usize) -> Result<usize, AnnotationError> {
        let len = self.code_unit_len();
        if code_unit > len {
            return Err(AnnotationError::OutOfBounds {
                range: TextRange::new(code_unit, 0),
                len,
            });
        }
        match self.boundaries.binary_search_by_key(&code_unit, |(units, _)| *units) {
            Ok(i) => Ok(self.boundaries[i].1),
            Err(_) => Err(AnnotationError::SplitsSurrogatePair { offset: code_unit }),
        }
    }

    /// Code unit offset of a byte offset. Bytes inside a multi-byte char map
    /// to the start of that char.
    pub fn code_unit_offset(&self, byte: usize) -> usize {
        let i = self.boundaries.partition_point(|(_, b)| *b <= byte);
        // i >= 1 always: the first boundary is byte 0
        self.boundaries[i.saturating_sub(1)].0
    }

    /// Byte range of a code unit range
    pub fn byte_range(&self, range: TextRange) -> Result<Range<usize>, AnnotationError> {
        let len = self.code_unit_len();
        let end = match range.checked_end() {
            Some(end) if end <= len => end,
            _ => return Err(AnnotationError::OutOfBounds { range, len }),
        };
        let start = self.byte_offset(range.offset)?;
        let end = self.byte_offset(end)?;
        Ok(start..end)
    }

    /// Code unit range of a byte span reported by a matcher
    pub fn range_from_bytes(&self, start: usize, end: usize) -> TextRange {
        let offset = self.code_unit_offset(start);
        let end = self.code_unit_offset(end);
        TextRange::new(offset, end.saturating_sub(offset))
    }

    pub fn substring(&self, range: TextRange) -> Result<&'a str, AnnotationError> {
        let bytes = self.byte_range(range)?;
        Ok(&self.text[bytes])
    }

    /// Index of the grapheme cluster containing `code_unit`
    pub fn grapheme_at(&self, code_unit: usize) -> Option<usize> {
        if code_unit >= self.code_unit_len() {
            return None;
        }
        let byte = self.byte_offset_floor(code_unit);
        self.text
            .grapheme_indices(true)
            .position(|(start, g)| byte >= start && byte < start + g.len())
    }

    /// Code unit range of the `index`-th grapheme cluster
    pub fn grapheme_range(&self, index: usize) -> Option<TextRange> {
        self.text
            .grapheme_indices(true)
            .nth(index)
            .map(|(start, g)| self.range_from_bytes(start, start + g.len()))
    }

    pub fn grapheme_count(&self) -> usize {
        self.text.graphemes(true).count()
    }

    fn byte_offset_floor(&self, code_unit: usize) -> usize {
        let i = self.boundaries.partition_point(|(units, _)| *units <= code_unit);
        self.boundaries[i.saturating_sub(1)].1
    }
}

// ==================== TESTS ====================
