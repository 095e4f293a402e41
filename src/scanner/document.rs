//! LabelDocument: the current text of one label and its annotations
//!
//! Holds the configuration state a label carries between renders:
//! - display text (plus caller-embedded links)
//! - enabled kinds, detection switch, custom patterns
//! - registered link definitions
//!
//! Any configuration change triggers a full re-resolution that replaces the
//! AnnotationSet. The one incremental path is `register_link_definitions`,
//! which appends the new definitions' matches to a fresh copy of the set.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::change::ChangeDetector;
use super::links::{EmbeddedLink, LinkCortex};
use super::phone::PhoneCortex;
use super::resolver::{AnnotationResolver, MatchContext, ResolveStats};
use super::syntax::SyntaxCortex;
use super::types::{Annotation, AnnotationKind, AnnotationSet, KindSet, LinkDefinition};

// =============================================================================
// Configuration
// =============================================================================

/// Document configuration, deserializable from a partial JSON object
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScannerConfig {
    /// Master switch for the pattern detectors. Text links are unaffected.
    #[serde(default = "default_true")]
    pub automatic_detection: bool,
    #[serde(default)]
    pub enabled_kinds: KindSet,
    #[serde(default)]
    pub handle_pattern: Option<String>,
    #[serde(default)]
    pub hashtag_pattern: Option<String>,
    /// Ignore scheme-less links such as `www.example.com`
    #[serde(default)]
    pub urls_require_scheme: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            automatic_detection: true,
            enabled_kinds: KindSet::all(),
            handle_pattern: None,
            hashtag_pattern: None,
            urls_require_scheme: false,
        }
    }
}

impl ScannerConfig {
    /// Kinds actually resolved, after applying the detection switch
    pub fn effective_kinds(&self) -> KindSet {
        if self.automatic_detection {
            return self.enabled_kinds;
        }
        if self.enabled_kinds.contains(AnnotationKind::TextLink) {
            KindSet::empty().with(AnnotationKind::TextLink)
        } else {
            KindSet::empty()
        }
    }

    pub fn build_resolver(&self) -> AnnotationResolver {
        AnnotationResolver::with_cortexes(
            SyntaxCortex::with_patterns(self.handle_pattern.as_deref(), self.hashtag_pattern.as_deref()),
            LinkCortex::new(self.urls_require_scheme),
            PhoneCortex::new(),
        )
    }
}

// =============================================================================
// ResolvedText
// =============================================================================

/// A text together with its resolved annotations.
///
/// Cheap to clone (the annotation list is shared), so list-style
/// collaborators can cache one per row and hand it back on reuse.
#[derive(Clone, Debug)]
pub struct ResolvedText {
    pub text: String,
    pub embedded_links: Vec<EmbeddedLink>,
    pub annotations: AnnotationSet,
    /// Keeps every definition the fingerprint refers to alive
    definitions: Vec<Arc<LinkDefinition>>,
    fingerprint: u64,
}

impl ResolvedText {
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

// =============================================================================
// LabelDocument
// =============================================================================

pub struct LabelDocument {
    config: ScannerConfig,
    resolver: AnnotationResolver,
    definitions: Vec<Arc<LinkDefinition>>,
    text: String,
    embedded_links: Vec<EmbeddedLink>,
    annotations: AnnotationSet,
    stats: ResolveStats,
    was_skipped: bool,
    /// Bumped on every configuration change; reported in status only
    revision: u64,
    change_detector: ChangeDetector,
}

impl Default for LabelDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelDocument {
    pub fn new() -> Self {
        Self::with_config(ScannerConfig::default())
    }

    pub fn with_config(config: ScannerConfig) -> Self {
        Self {
            resolver: config.build_resolver(),
            config,
            definitions: Vec::new(),
            text: String::new(),
            embedded_links: Vec::new(),
            annotations: AnnotationSet::default(),
            stats: ResolveStats::default(),
            was_skipped: false,
            revision: 0,
            change_detector: ChangeDetector::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    pub fn set_text(&mut self, text: impl Into<String>) -> &AnnotationSet {
        self.set_attributed_text(text, Vec::new())
    }

    /// Set text that already carries link attributes on some spans
    pub fn set_attributed_text(
        &mut self,
        text: impl Into<String>,
        embedded_links: Vec<EmbeddedLink>,
    ) -> &AnnotationSet {
        self.text = text.into();
        self.embedded_links = embedded_links;
        self.refresh();
        &self.annotations
    }

    /// Replace the link definitions and the text, resolving once
    pub fn set_text_with_links(
        &mut self,
        text: impl Into<String>,
        definitions: Vec<LinkDefinition>,
    ) -> &AnnotationSet {
        self.definitions = definitions.into_iter().map(Arc::new).collect();
        self.revision += 1;
        self.set_text(text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn embedded_links(&self) -> &[EmbeddedLink] {
        &self.embedded_links
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ScannerConfig) {
        self.resolver = config.build_resolver();
        self.config = config;
        self.revision += 1;
        self.refresh();
    }

    pub fn set_enabled_kinds(&mut self, kinds: KindSet) {
        self.config.enabled_kinds = kinds;
        self.revision += 1;
        self.refresh();
    }

    pub fn set_automatic_detection(&mut self, enabled: bool) {
        self.config.automatic_detection = enabled;
        self.revision += 1;
        self.refresh();
    }

    // -------------------------------------------------------------------------
    // Link definitions
    // -------------------------------------------------------------------------

    /// Append definitions to an already-resolved text.
    ///
    /// Existing annotations keep their order; the new matches follow in
    /// registration order. Returns the number of annotations added.
    pub fn register_link_definitions(&mut self, definitions: Vec<LinkDefinition>) -> usize {
        let added: Vec<Arc<LinkDefinition>> = definitions.into_iter().map(Arc::new).collect();
        if added.is_empty() {
            return 0;
        }

        let ctx = MatchContext::new(&self.text).with_embedded_links(&self.embedded_links);
        let found = self
            .resolver
            .resolve_text_links(&ctx, self.config.effective_kinds(), &added);
        let count = found.len();

        self.annotations = self.annotations.with_appended(found);
        self.stats.text_links_found += count;
        self.stats.annotation_count = self.annotations.len();
        self.definitions.extend(added);
        self.revision += 1;
        self.change_detector.set_last_fingerprint(self.fingerprint());
        count
    }

    pub fn clear_link_definitions(&mut self) {
        if self.definitions.is_empty() {
            return;
        }
        self.definitions.clear();
        self.revision += 1;
        self.refresh();
    }

    pub fn link_definitions(&self) -> &[Arc<LinkDefinition>] {
        &self.definitions
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    /// First annotation covering `offset` (code units)
    pub fn lookup(&self, offset: usize) -> Option<&Annotation> {
        self.annotations.find(offset)
    }

    /// Hit-test `offset` and run the source definition's action, if any
    pub fn activate(&self, offset: usize) -> Option<&Annotation> {
        let annotation = self.annotations.find(offset)?;
        annotation.activate();
        Some(annotation)
    }

    pub fn stats(&self) -> &ResolveStats {
        &self.stats
    }

    /// True if the last text update matched the previous input
    pub fn was_skipped(&self) -> bool {
        self.was_skipped
    }

    pub fn skip_rate(&self) -> f64 {
        self.change_detector.skip_rate()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    pub fn snapshot(&self) -> ResolvedText {
        ResolvedText {
            text: self.text.clone(),
            embedded_links: self.embedded_links.clone(),
            annotations: self.annotations.clone(),
            definitions: self.definitions.clone(),
            fingerprint: self.fingerprint(),
        }
    }

    /// Show a previously resolved text. The cached annotations are reused
    /// when they were produced under an identical configuration with the same
    /// link definitions, by this or any other document; otherwise the text is
    /// resolved again. Returns true if the cache was reused.
    pub fn restore(&mut self, snapshot: ResolvedText) -> bool {
        let current = ChangeDetector::fingerprint(&snapshot.text, &snapshot.embedded_links, self.settings_key());
        self.text = snapshot.text;
        self.embedded_links = snapshot.embedded_links;

        if current != snapshot.fingerprint {
            self.refresh();
            return false;
        }

        self.annotations = snapshot.annotations;
        self.stats = ResolveStats {
            text_length: super::offsets::code_unit_length(&self.text),
            annotation_count: self.annotations.len(),
            ..ResolveStats::default()
        };
        self.was_skipped = true;
        self.change_detector.set_last_fingerprint(current);
        true
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    fn fingerprint(&self) -> u64 {
        ChangeDetector::fingerprint(&self.text, &self.embedded_links, self.settings_key())
    }

    /// Everything besides the text that shapes a resolution: the configuration
    /// and the identity of each registered definition. Snapshots hold their
    /// definitions alive, so a matching address is the same Arc.
    fn settings_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.config.hash(&mut hasher);
        for definition in &self.definitions {
            (Arc::as_ptr(definition) as *const () as usize).hash(&mut hasher);
        }
        hasher.finish()
    }

    fn refresh(&mut self) {
        if !self
            .change_detector
            .has_changed(&self.text, &self.embedded_links, self.settings_key())
        {
            self.was_skipped = true;
            return;
        }

        let ctx = MatchContext::new(&self.text).with_embedded_links(&self.embedded_links);
        let (annotations, stats) =
            self.resolver
                .resolve_detailed(&ctx, self.config.effective_kinds(), &self.definitions);

        self.annotations = annotations;
        self.stats = stats;
        self.was_skipped = false;
    }
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::types::TextRange;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const REPEATED: &str = "one two three one two three one two one";

    fn offsets(set: &AnnotationSet) -> Vec<usize> {
        set.iter().map(|a| a.range.offset).collect()
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: ScannerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ScannerConfig::default());

        let config: ScannerConfig = serde_json::from_str(
            r#"{"automatic_detection": false, "enabled_kinds": ["text_link", "url"], "urls_require_scheme": true}"#,
        )
        .unwrap();
        assert!(!config.automatic_detection);
        assert!(config.urls_require_scheme);
        assert!(config.enabled_kinds.contains(AnnotationKind::Url));
        assert!(!config.enabled_kinds.contains(AnnotationKind::Hashtag));
        assert_eq!(config.effective_kinds(), KindSet::empty().with(AnnotationKind::TextLink));
    }

    #[test]
    fn test_set_text_resolves() {
        let mut doc = LabelDocument::new();
        let set = doc.set_text("Hi @ana see #rust");
        assert_eq!(set.len(), 2);
        assert!(!doc.was_skipped());
        assert_eq!(doc.stats().annotation_count, 2);
    }

    #[test]
    fn test_identical_text_is_skipped() {
        let mut doc = LabelDocument::new();
        doc.set_text("Hi @ana");
        let first = doc.annotations().clone();

        doc.set_text("Hi @ana");
        assert!(doc.was_skipped());
        assert!(doc.annotations().ptr_eq(&first));

        doc.set_enabled_kinds(KindSet::empty());
        assert!(!doc.was_skipped());
        assert!(doc.annotations().is_empty());
    }

    #[test]
    fn test_text_links_grouped_by_definition() {
        let mut doc = LabelDocument::new();
        doc.set_text_with_links(
            REPEATED,
            vec![LinkDefinition::new("one"), LinkDefinition::new("two"), LinkDefinition::new("three")],
        );

        let set = doc.annotations();
        assert_eq!(set.count_of(AnnotationKind::TextLink), 9);
        assert_eq!(offsets(set), vec![0, 14, 28, 36, 4, 18, 32, 8, 22]);
    }

    #[test]
    fn test_register_appends_without_touching_previous_set() {
        let mut doc = LabelDocument::new();
        doc.set_text(format!("#tag {}", REPEATED));
        let before = doc.annotations().clone();
        assert_eq!(before.len(), 1);

        let added = doc.register_link_definitions(vec![LinkDefinition::new("two")]);
        assert_eq!(added, 3);
        assert_eq!(before.len(), 1);

        let after = doc.annotations();
        assert_eq!(after.len(), 4);
        assert_eq!(after.as_slice()[0], before.as_slice()[0]);
        assert!(after.iter().skip(1).all(|a| a.kind == AnnotationKind::TextLink));

        // Same input afterwards is still a no-op
        doc.set_text(format!("#tag {}", REPEATED));
        assert!(doc.was_skipped());
        assert_eq!(doc.annotations().len(), 4);
    }

    #[test]
    fn test_registered_links_survive_full_resolution() {
        let mut doc = LabelDocument::new();
        doc.set_text("#tag one");
        doc.register_link_definitions(vec![LinkDefinition::new("one")]);
        doc.set_text("one #tag");

        let kinds: Vec<_> = doc.annotations().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AnnotationKind::TextLink, AnnotationKind::Hashtag]);

        doc.clear_link_definitions();
        assert_eq!(doc.annotations().count_of(AnnotationKind::TextLink), 0);
        assert!(doc.link_definitions().is_empty());
    }

    #[test]
    fn test_automatic_detection_off_keeps_text_links() {
        let mut doc = LabelDocument::new();
        doc.set_text_with_links("#one one", vec![LinkDefinition::new("one")]);
        assert_eq!(doc.annotations().len(), 3);

        doc.set_automatic_detection(false);
        assert_eq!(doc.annotations().len(), 2);
        assert!(doc.annotations().iter().all(|a| a.kind == AnnotationKind::TextLink));
    }

    #[test]
    fn test_lookup_prefers_text_link() {
        let mut doc = LabelDocument::new();
        doc.set_text_with_links("see #docs now", vec![LinkDefinition::new("docs")]);

        assert_eq!(doc.lookup(5).map(|a| a.kind), Some(AnnotationKind::TextLink));
        assert_eq!(doc.lookup(4).map(|a| a.kind), Some(AnnotationKind::Hashtag));
        assert!(doc.lookup(0).is_none());
    }

    #[test]
    fn test_activate_runs_action() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut doc = LabelDocument::new();
        doc.set_text_with_links(
            "read the docs",
            vec![LinkDefinition::new("docs").with_payload("guide").on_activate(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })],
        );

        let hit = doc.activate(10).unwrap();
        assert_eq!(hit.range, TextRange::new(9, 4));
        assert_eq!(
            hit.source.as_ref().and_then(|d| d.payload_as::<&str>()),
            Some(&"guide")
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(doc.activate(0).is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attributed_text_sets_target() {
        let mut doc = LabelDocument::new();
        doc.set_attributed_text(
            "go to example.com",
            vec![EmbeddedLink::new(TextRange::new(6, 11), "https://example.com/landing")],
        );
        let url = doc.annotations().of_kind(AnnotationKind::Url).next().unwrap();
        assert_eq!(url.matched_text, "example.com");
        assert_eq!(url.target.as_deref(), Some("https://example.com/landing"));
    }

    #[test]
    fn test_snapshot_restore() {
        let mut doc = LabelDocument::new();
        doc.set_text("row one #a");
        let snapshot = doc.snapshot();

        doc.set_text("row two #b @c");
        assert_eq!(doc.annotations().len(), 2);

        assert!(doc.restore(snapshot.clone()));
        assert_eq!(doc.text(), "row one #a");
        assert!(doc.annotations().ptr_eq(&snapshot.annotations));

        // Stale after a configuration change: resolved again
        doc.set_enabled_kinds(KindSet::empty().with(AnnotationKind::UserHandle));
        assert!(!doc.restore(snapshot));
        assert!(doc.annotations().is_empty());
    }

    #[test]
    fn test_restore_across_documents_checks_configuration() {
        let mut source = LabelDocument::new();
        source.set_text("#tag @user");
        let snapshot = source.snapshot();

        let mut handles_only = LabelDocument::with_config(ScannerConfig {
            enabled_kinds: KindSet::empty().with(AnnotationKind::UserHandle),
            ..ScannerConfig::default()
        });
        assert!(!handles_only.restore(snapshot.clone()));
        assert_eq!(handles_only.annotations().count_of(AnnotationKind::Hashtag), 0);
        assert_eq!(handles_only.annotations().count_of(AnnotationKind::UserHandle), 1);

        let mut same_config = LabelDocument::new();
        assert!(same_config.restore(snapshot.clone()));
        assert!(same_config.annotations().ptr_eq(&snapshot.annotations));
    }

    #[test]
    fn test_restore_across_documents_checks_link_definitions() {
        let mut source = LabelDocument::new();
        source.set_text_with_links("read the docs", vec![LinkDefinition::new("docs")]);
        let snapshot = source.snapshot();

        let mut other = LabelDocument::new();
        assert!(!other.restore(snapshot));
        assert_eq!(other.annotations().count_of(AnnotationKind::TextLink), 0);
    }

    #[test]
    fn test_overflowing_search_range_is_ignored() {
        let mut doc = LabelDocument::new();
        doc.set_text_with_links(
            "one two",
            vec![LinkDefinition::new("one").in_range(TextRange::new(usize::MAX, 2))],
        );
        assert!(doc.annotations().is_empty());
        assert!(doc.lookup(usize::MAX).is_none());
    }

    #[test]
    fn test_bad_custom_pattern_degrades_one_kind() {
        let config = ScannerConfig {
            handle_pattern: Some("(".to_string()),
            ..ScannerConfig::default()
        };
        let mut doc = LabelDocument::with_config(config);
        doc.set_text("@ana #rust");
        assert_eq!(doc.annotations().count_of(AnnotationKind::UserHandle), 0);
        assert_eq!(doc.annotations().count_of(AnnotationKind::Hashtag), 1);
    }
}
