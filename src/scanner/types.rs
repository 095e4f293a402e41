//! Core data model for the annotation engine
//!
//! All ranges are expressed in UTF-16 code units, the addressing scheme used by
//! text layout engines on the UI side. Conversion to byte offsets happens once,
//! in `offsets.rs`.

use serde::{Deserialize, Serialize, Serializer};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::lookup::SpanLookup;

// =============================================================================
// AnnotationKind
// =============================================================================

/// Kind of annotation detected in text
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKind {
    UserHandle,
    Hashtag,
    Url,
    Email,
    PhoneNumber,
    TextLink,
    None,
}

impl AnnotationKind {
    /// Order in which detectors run and results are concatenated.
    pub const RESOLUTION_ORDER: [AnnotationKind; 6] = [
        AnnotationKind::TextLink,
        AnnotationKind::UserHandle,
        AnnotationKind::Hashtag,
        AnnotationKind::Url,
        AnnotationKind::Email,
        AnnotationKind::PhoneNumber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::UserHandle => "user_handle",
            AnnotationKind::Hashtag => "hashtag",
            AnnotationKind::Url => "url",
            AnnotationKind::Email => "email",
            AnnotationKind::PhoneNumber => "phone_number",
            AnnotationKind::TextLink => "text_link",
            AnnotationKind::None => "none",
        }
    }

    fn bit(self) -> u8 {
        match self {
            AnnotationKind::UserHandle => 1 << 0,
            AnnotationKind::Hashtag => 1 << 1,
            AnnotationKind::Url => 1 << 2,
            AnnotationKind::Email => 1 << 3,
            AnnotationKind::PhoneNumber => 1 << 4,
            AnnotationKind::TextLink => 1 << 5,
            AnnotationKind::None => 0,
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// KindSet
// =============================================================================

/// Set of enabled annotation kinds.
///
/// Serializes as a list of kind names, e.g. `["user_handle", "url"]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<AnnotationKind>", into = "Vec<AnnotationKind>")]
pub struct KindSet(u8);

impl KindSet {
    pub const fn empty() -> Self {
        KindSet(0)
    }

    /// Every detectable kind (`None` is not a detectable kind)
    pub fn all() -> Self {
        AnnotationKind::RESOLUTION_ORDER.iter().copied().collect()
    }

    pub fn contains(&self, kind: AnnotationKind) -> bool {
        let bit = kind.bit();
        bit != 0 && self.0 & bit == bit
    }

    pub fn insert(&mut self, kind: AnnotationKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: AnnotationKind) {
        self.0 &= !kind.bit();
    }

    pub fn with(mut self, kind: AnnotationKind) -> Self {
        self.insert(kind);
        self
    }

    pub fn without(mut self, kind: AnnotationKind) -> Self {
        self.remove(kind);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Kinds in resolution order
    pub fn iter(&self) -> impl Iterator<Item = AnnotationKind> + '_ {
        AnnotationKind::RESOLUTION_ORDER
            .iter()
            .copied()
            .filter(move |k| self.contains(*k))
    }
}

impl Default for KindSet {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<AnnotationKind> for KindSet {
    fn from_iter<I: IntoIterator<Item = AnnotationKind>>(iter: I) -> Self {
        let mut set = KindSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl From<Vec<AnnotationKind>> for KindSet {
    fn from(kinds: Vec<AnnotationKind>) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<KindSet> for Vec<AnnotationKind> {
    fn from(set: KindSet) -> Self {
        set.iter().collect()
    }
}

// =============================================================================
// TextRange
// =============================================================================

/// A span of text in UTF-16 code units
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub offset: usize,
    pub length: usize,
}

impl TextRange {
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Exclusive end offset, saturating at `usize::MAX`
    pub const fn end(&self) -> usize {
        self.offset.saturating_add(self.length)
    }

    /// Exclusive end offset, or `None` if it does not fit in `usize`
    pub const fn checked_end(&self) -> Option<usize> {
        self.offset.checked_add(self.length)
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// True if `offset` falls on one of the code units of this range.
    /// Empty ranges contain nothing.
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.offset && offset - self.offset < self.length
    }
}

// =============================================================================
// CompareOptions
// =============================================================================

/// Comparison options for literal text-link search
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct CompareOptions {
    pub case_insensitive: bool,
    /// Search from the end of the window; occurrences are reported right-to-left
    pub backwards: bool,
    /// Match must start at the window start (end at the window end when backwards)
    pub anchored: bool,
    /// Treat the needle as a regular expression
    pub regular_expression: bool,
}

impl CompareOptions {
    pub fn case_insensitive() -> Self {
        Self { case_insensitive: true, ..Self::default() }
    }

    pub fn backwards() -> Self {
        Self { backwards: true, ..Self::default() }
    }

    pub fn regular_expression() -> Self {
        Self { regular_expression: true, ..Self::default() }
    }
}

// =============================================================================
// LinkDefinition
// =============================================================================

pub type LinkPayload = Arc<dyn Any + Send + Sync>;
pub type LinkAction = Arc<dyn Fn() + Send + Sync>;

/// Caller-supplied literal phrase to be turned into a clickable span
#[derive(Clone)]
pub struct LinkDefinition {
    pub text: String,
    /// Restricts matches to occurrences fully inside this range
    pub range: Option<TextRange>,
    pub options: CompareOptions,
    pub payload: Option<LinkPayload>,
    action: Option<LinkAction>,
}

impl LinkDefinition {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            range: None,
            options: CompareOptions::default(),
            payload: None,
            action: None,
        }
    }

    pub fn in_range(mut self, range: TextRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn on_activate<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.action = Some(Arc::new(action));
        self
    }

    /// Downcast the payload to a concrete type
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<T>())
    }

    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Run the activation callback. Returns false if none was registered.
    pub fn activate(&self) -> bool {
        match &self.action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for LinkDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkDefinition")
            .field("text", &self.text)
            .field("range", &self.range)
            .field("options", &self.options)
            .field("has_payload", &self.payload.is_some())
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

// =============================================================================
// Annotation
// =============================================================================

/// A classified, located match within text. Immutable once produced.
#[derive(Clone, Debug, Serialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub range: TextRange,
    /// Exactly the substring of the owning text at `range`
    pub matched_text: String,
    /// Link destination for URL/email annotations (embedded link wins over the literal text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Definition that produced a `TextLink` annotation
    #[serde(rename = "link_text", serialize_with = "serialize_source")]
    pub source: Option<Arc<LinkDefinition>>,
}

fn serialize_source<S: Serializer>(
    source: &Option<Arc<LinkDefinition>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match source {
        Some(def) => serializer.serialize_some(&def.text),
        None => serializer.serialize_none(),
    }
}

impl Annotation {
    /// Annotation produced by a pattern detector
    pub fn detected(kind: AnnotationKind, range: TextRange, matched_text: impl Into<String>) -> Self {
        Self {
            kind,
            range,
            matched_text: matched_text.into(),
            target: None,
            source: None,
        }
    }

    /// Run the source definition's action, if any
    pub fn activate(&self) -> bool {
        self.source.as_ref().map(|def| def.activate()).unwrap_or(false)
    }
}

impl PartialEq for Annotation {
    fn eq(&self, other: &Self) -> bool {
        let same_source = match (&self.source, &other.source) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.kind == other.kind
            && self.range == other.range
            && self.matched_text == other.matched_text
            && self.target == other.target
            && same_source
    }
}

// =============================================================================
// AnnotationSet
// =============================================================================

/// Ordered, immutable annotations for one resolved text.
///
/// Cloning shares the underlying list; appending builds a new one so readers
/// holding the old set never observe a partial update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotationSet {
    annotations: Arc<Vec<Annotation>>,
}

impl AnnotationSet {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self { annotations: Arc::new(annotations) }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.annotations.iter()
    }

    pub fn of_kind(&self, kind: AnnotationKind) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter().filter(move |a| a.kind == kind)
    }

    pub fn count_of(&self, kind: AnnotationKind) -> usize {
        self.of_kind(kind).count()
    }

    /// First annotation covering `offset`
    pub fn find(&self, offset: usize) -> Option<&Annotation> {
        SpanLookup::find(&self.annotations, offset)
    }

    /// New set with `more` appended after the existing annotations
    pub fn with_appended(&self, more: Vec<Annotation>) -> Self {
        if more.is_empty() {
            return self.clone();
        }
        let mut annotations = Vec::with_capacity(self.len() + more.len());
        annotations.extend(self.annotations.iter().cloned());
        annotations.extend(more);
        Self::new(annotations)
    }

    /// True if both sets share the same underlying list
    pub fn ptr_eq(&self, other: &AnnotationSet) -> bool {
        Arc::ptr_eq(&self.annotations, &other.annotations)
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.annotations.iter()
    }
}

impl Serialize for AnnotationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.annotations.as_slice().serialize(serializer)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Annotation engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationError {
    OutOfBounds { range: TextRange, len: usize },
    SplitsSurrogatePair { offset: usize },
    PatternCompile { pattern: String, message: String },
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationError::OutOfBounds { range, len } => write!(
                f,
                "range {}..{} out of bounds for text of {} code units",
                range.offset,
                range.end(),
                len
            ),
            AnnotationError::SplitsSurrogatePair { offset } => {
                write!(f, "offset {} splits a surrogate pair", offset)
            }
            AnnotationError::PatternCompile { pattern, message } => {
                write!(f, "invalid pattern {:?}: {}", pattern, message)
            }
        }
    }
}

impl std::error::Error for AnnotationError {}

// ==================== TESTS ====================
