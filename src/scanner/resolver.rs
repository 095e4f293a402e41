//! AnnotationResolver - runs the enabled detectors over one text
//!
//! Phases run in a fixed order and their outputs are concatenated as-is:
//!
//! 1. TextLink (caller definitions, only if any are registered)
//! 2. UserHandle
//! 3. Hashtag
//! 4. Url
//! 5. Email
//! 6. PhoneNumber
//!
//! Overlapping annotations from different phases are kept. Stylers apply the
//! list in order (later entries paint over earlier ones) and hit-testing
//! returns the first covering entry, so text links win lookups.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::links::{EmbeddedLink, LinkCortex};
use super::offsets::TextOffsetIndex;
use super::phone::PhoneCortex;
use super::syntax::SyntaxCortex;
use super::text_link::TextLinkCortex;
use super::types::{Annotation, AnnotationKind, AnnotationSet, KindSet, LinkDefinition};

// =============================================================================
// MatchContext
// =============================================================================

/// Shared per-resolution input for every detector
#[derive(Debug, Clone)]
pub struct MatchContext<'a> {
    pub index: TextOffsetIndex<'a>,
    pub embedded_links: &'a [EmbeddedLink],
}

impl<'a> MatchContext<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            index: TextOffsetIndex::new(text),
            embedded_links: &[],
        }
    }

    pub fn with_embedded_links(mut self, links: &'a [EmbeddedLink]) -> Self {
        self.embedded_links = links;
        self
    }

    pub fn text(&self) -> &'a str {
        self.index.text()
    }

    /// First embedded link covering `offset`
    pub fn embedded_link_at(&self, offset: usize) -> Option<&'a EmbeddedLink> {
        self.embedded_links.iter().find(|l| l.range.contains(offset))
    }
}

// =============================================================================
// Stats
// =============================================================================

/// Timing per phase, in microseconds
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResolveTimings {
    pub total_us: u64,
    pub text_link_us: u64,
    pub user_handle_us: u64,
    pub hashtag_us: u64,
    pub link_us: u64,
    pub phone_us: u64,
}

/// Aggregate statistics for one resolution
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResolveStats {
    pub timings: ResolveTimings,
    pub text_length: usize,
    pub annotation_count: usize,
    pub text_links_found: usize,
    pub user_handles_found: usize,
    pub hashtags_found: usize,
    pub urls_found: usize,
    pub emails_found: usize,
    pub phone_numbers_found: usize,
}

// =============================================================================
// AnnotationResolver
// =============================================================================

/// Orchestrates the detectors
#[derive(Debug, Clone, Default)]
pub struct AnnotationResolver {
    syntax: SyntaxCortex,
    links: LinkCortex,
    phone: PhoneCortex,
    text_links: TextLinkCortex,
}

impl AnnotationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cortexes(syntax: SyntaxCortex, links: LinkCortex, phone: PhoneCortex) -> Self {
        Self {
            syntax,
            links,
            phone,
            text_links: TextLinkCortex::new(),
        }
    }

    pub fn syntax(&self) -> &SyntaxCortex {
        &self.syntax
    }

    /// Resolve `text` against the enabled kinds and registered definitions
    pub fn resolve(&self, text: &str, enabled: KindSet, definitions: &[Arc<LinkDefinition>]) -> AnnotationSet {
        self.resolve_detailed(&MatchContext::new(text), enabled, definitions).0
    }

    /// Resolve with a prepared context and return per-phase stats
    pub fn resolve_detailed(
        &self,
        ctx: &MatchContext,
        enabled: KindSet,
        definitions: &[Arc<LinkDefinition>],
    ) -> (AnnotationSet, ResolveStats) {
        let overall_start = instant::Instant::now();
        let mut stats = ResolveStats {
            text_length: ctx.index.code_unit_len(),
            ..ResolveStats::default()
        };
        let mut annotations: Vec<Annotation> = Vec::new();

        // Phase 1: Caller text links
        if enabled.contains(AnnotationKind::TextLink) && !definitions.is_empty() {
            let t0 = instant::Instant::now();
            let found = self.text_links.text_links(ctx, definitions);
            stats.timings.text_link_us = t0.elapsed().as_micros() as u64;
            stats.text_links_found = found.len();
            annotations.extend(found);
        }

        // Phase 2: @handles
        if enabled.contains(AnnotationKind::UserHandle) {
            let t0 = instant::Instant::now();
            let found = self.syntax.user_handles(ctx);
            stats.timings.user_handle_us = t0.elapsed().as_micros() as u64;
            stats.user_handles_found = found.len();
            annotations.extend(found);
        }

        // Phase 3: #hashtags
        if enabled.contains(AnnotationKind::Hashtag) {
            let t0 = instant::Instant::now();
            let found = self.syntax.hashtags(ctx);
            stats.timings.hashtag_us = t0.elapsed().as_micros() as u64;
            stats.hashtags_found = found.len();
            annotations.extend(found);
        }

        // Phases 4-5: one link pass, split into URLs then emails
        let want_urls = enabled.contains(AnnotationKind::Url);
        let want_emails = enabled.contains(AnnotationKind::Email);
        if want_urls || want_emails {
            let t0 = instant::Instant::now();
            let (emails, urls): (Vec<_>, Vec<_>) = self
                .links
                .detect(ctx)
                .into_iter()
                .partition(|a| a.kind == AnnotationKind::Email);
            stats.timings.link_us = t0.elapsed().as_micros() as u64;
            if want_urls {
                stats.urls_found = urls.len();
                annotations.extend(urls);
            }
            if want_emails {
                stats.emails_found = emails.len();
                annotations.extend(emails);
            }
        }

        // Phase 6: phone numbers
        if enabled.contains(AnnotationKind::PhoneNumber) {
            let t0 = instant::Instant::now();
            let found = self.phone.phone_numbers(ctx);
            stats.timings.phone_us = t0.elapsed().as_micros() as u64;
            stats.phone_numbers_found = found.len();
            annotations.extend(found);
        }

        stats.annotation_count = annotations.len();
        stats.timings.total_us = overall_start.elapsed().as_micros() as u64;

        (AnnotationSet::new(annotations), stats)
    }

    /// Text-link annotations for definitions added after a resolution.
    /// Returns nothing when text links are disabled.
    pub fn resolve_text_links(
        &self,
        ctx: &MatchContext,
        enabled: KindSet,
        definitions: &[Arc<LinkDefinition>],
    ) -> Vec<Annotation> {
        if !enabled.contains(AnnotationKind::TextLink) {
            return Vec::new();
        }
        self.text_links.text_links(ctx, definitions)
    }
}

// ==================== TESTS ====================
