//! StyleSheet - appearance of annotations, keyed by kind
//!
//! The engine only classifies and locates spans; the renderer asks the sheet
//! for colours, underline and font per annotation. Each property is one
//! resolver closure taking the annotation, with a default that dispatches on
//! `AnnotationKind`.
//!
//! `runs()` flattens an annotation list into non-overlapping style runs. Where
//! annotations overlap, the later one in the list wins, matching how a
//! renderer applying attributes in list order would paint them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::types::{Annotation, AnnotationKind, AnnotationSet, TextRange};

// =============================================================================
// Primitives
// =============================================================================

/// sRGB colour with alpha in 0.0..=1.0
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha.clamp(0.0, 1.0);
        self
    }

    /// CSS `rgba()` notation
    pub fn to_css(&self) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Thick,
    Double,
}

/// Resolved appearance of one annotation
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct AnnotationStyle {
    pub foreground: Rgba,
    pub underline: UnderlineStyle,
    /// Font family override; `None` keeps the label font
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

/// A contiguous range sharing one style. `annotation` indexes into the set
/// the runs were built from; plain text has neither annotation nor style.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct StyleRun {
    pub range: TextRange,
    pub annotation: Option<usize>,
    pub style: Option<AnnotationStyle>,
}

// =============================================================================
// Default palette
// =============================================================================

pub fn default_foreground(kind: AnnotationKind) -> Rgba {
    match kind {
        AnnotationKind::UserHandle => Rgba::rgb(71, 90, 109),
        AnnotationKind::Hashtag => Rgba::rgb(151, 154, 158),
        AnnotationKind::Url
        | AnnotationKind::Email
        | AnnotationKind::PhoneNumber
        | AnnotationKind::TextLink => Rgba::rgb(45, 113, 178),
        AnnotationKind::None => Rgba::BLACK,
    }
}

const HIGHLIGHT_ALPHA: f32 = 0.5;

// =============================================================================
// StyleSheet
// =============================================================================

pub type StyleFn<T> = Arc<dyn Fn(&Annotation) -> T + Send + Sync>;

#[derive(Clone)]
pub struct StyleSheet {
    foreground: StyleFn<Rgba>,
    /// Falls back to the foreground at half alpha
    highlighted_foreground: Option<StyleFn<Rgba>>,
    underline: StyleFn<UnderlineStyle>,
    font: StyleFn<Option<String>>,
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self {
            foreground: Arc::new(|a: &Annotation| default_foreground(a.kind)),
            highlighted_foreground: None,
            underline: Arc::new(|_: &Annotation| UnderlineStyle::None),
            font: Arc::new(|_: &Annotation| None),
        }
    }
}

impl fmt::Debug for StyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleSheet")
            .field("custom_highlight", &self.highlighted_foreground.is_some())
            .finish_non_exhaustive()
    }
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_foreground<F>(mut self, f: F) -> Self
    where
        F: Fn(&Annotation) -> Rgba + Send + Sync + 'static,
    {
        self.foreground = Arc::new(f);
        self
    }

    pub fn with_highlighted_foreground<F>(mut self, f: F) -> Self
    where
        F: Fn(&Annotation) -> Rgba + Send + Sync + 'static,
    {
        self.highlighted_foreground = Some(Arc::new(f));
        self
    }

    pub fn with_underline<F>(mut self, f: F) -> Self
    where
        F: Fn(&Annotation) -> UnderlineStyle + Send + Sync + 'static,
    {
        self.underline = Arc::new(f);
        self
    }

    pub fn with_font<F>(mut self, f: F) -> Self
    where
        F: Fn(&Annotation) -> Option<String> + Send + Sync + 'static,
    {
        self.font = Arc::new(f);
        self
    }

    pub fn foreground(&self, annotation: &Annotation) -> Rgba {
        (self.foreground)(annotation)
    }

    pub fn highlighted_foreground(&self, annotation: &Annotation) -> Rgba {
        match &self.highlighted_foreground {
            Some(f) => f(annotation),
            None => self.foreground(annotation).with_alpha(HIGHLIGHT_ALPHA),
        }
    }

    pub fn underline(&self, annotation: &Annotation) -> UnderlineStyle {
        (self.underline)(annotation)
    }

    pub fn font(&self, annotation: &Annotation) -> Option<String> {
        (self.font)(annotation)
    }

    pub fn style_for(&self, annotation: &Annotation, highlighted: bool) -> AnnotationStyle {
        AnnotationStyle {
            foreground: if highlighted {
                self.highlighted_foreground(annotation)
            } else {
                self.foreground(annotation)
            },
            underline: self.underline(annotation),
            font: self.font(annotation),
        }
    }

    /// Flatten `set` over a text of `text_len` code units.
    ///
    /// Runs cover the whole text in order. `highlighted` is the index of the
    /// annotation under an active touch, drawn with its highlighted colour.
    pub fn runs(&self, text_len: usize, set: &AnnotationSet, highlighted: Option<usize>) -> Vec<StyleRun> {
        let annotations = set.as_slice();

        let mut boundaries = Vec::with_capacity(2 + annotations.len() * 2);
        boundaries.push(0);
        boundaries.push(text_len);
        for a in annotations {
            boundaries.push(a.range.offset.min(text_len));
            boundaries.push(a.range.end().min(text_len));
        }
        boundaries.sort_unstable();
        boundaries.dedup();

        let mut runs: Vec<StyleRun> = Vec::new();
        for window in boundaries.windows(2) {
            let (start, end) = (window[0], window[1]);
            // Last covering annotation paints on top
            let owner = annotations
                .iter()
                .enumerate()
                .rev()
                .find(|(_, a)| !a.range.is_empty() && a.range.offset <= start && end <= a.range.end())
                .map(|(i, _)| i);

            if let Some(last) = runs.last_mut() {
                if last.annotation == owner {
                    last.range.length += end - start;
                    continue;
                }
            }
            runs.push(StyleRun {
                range: TextRange::new(start, end - start),
                annotation: owner,
                style: owner.map(|i| self.style_for(&annotations[i], highlighted == Some(i))),
            });
        }
        runs
    }
}

// ==================== TESTS ====================
