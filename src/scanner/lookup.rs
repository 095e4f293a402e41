//! SpanLookup - hit-testing over an annotation list
//!
//! Linear scan in list order. The first annotation whose range covers the
//! offset wins, which is what lets text links (resolved first) take precedence
//! over detector hits on the same characters.

use super::types::Annotation;

pub struct SpanLookup;

impl SpanLookup {
    /// First annotation covering `offset`
    pub fn find(annotations: &[Annotation], offset: usize) -> Option<&Annotation> {
        annotations.iter().find(|a| a.range.contains(offset))
    }

    /// Index of the first annotation covering `offset`
    pub fn find_index(annotations: &[Annotation], offset: usize) -> Option<usize> {
        annotations.iter().position(|a| a.range.contains(offset))
    }

    /// Every annotation covering `offset`, in list order
    pub fn find_all(annotations: &[Annotation], offset: usize) -> Vec<&Annotation> {
        annotations.iter().filter(|a| a.range.contains(offset)).collect()
    }
}

// ==================== TESTS ====================
