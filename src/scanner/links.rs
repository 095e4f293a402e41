//! LinkCortex - URL and email detection
//!
//! Wraps `linkify::LinkFinder` as a generic link-shaped detector. One pass
//! yields both kinds; hits are then classified:
//! - linkify email, or a URL with a `mailto:` scheme → Email
//! - everything else → Url
//!
//! Callers rendering rich text may already know the destination of a span
//! (an `EmbeddedLink`). When a detected link starts inside such a span, the
//! embedded URL becomes the annotation's `target`; `matched_text` still holds
//! the literal text.

use linkify::{LinkFinder, LinkKind};
use serde::{Deserialize, Serialize};

use super::resolver::MatchContext;
use super::types::{Annotation, AnnotationKind, TextRange};

const MAILTO: &str = "mailto:";

/// Caller-supplied link attribute on a span of text
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EmbeddedLink {
    pub range: TextRange,
    pub url: String,
}

impl EmbeddedLink {
    pub fn new(range: TextRange, url: impl Into<String>) -> Self {
        Self { range, url: url.into() }
    }
}

/// URL / email detector
#[derive(Debug, Clone, Default)]
pub struct LinkCortex {
    require_scheme: bool,
}

impl LinkCortex {
    /// # Arguments
    /// * `require_scheme` - If true, bare domains like `www.example.com` are ignored
    pub fn new(require_scheme: bool) -> Self {
        Self { require_scheme }
    }

    /// All link-shaped hits, in text order, each classified as Url or Email
    pub fn detect(&self, ctx: &MatchContext) -> Vec<Annotation> {
        let text = ctx.text();
        let mut finder = LinkFinder::new();
        finder
            .kinds(&[LinkKind::Url, LinkKind::Email])
            .url_must_have_scheme(self.require_scheme);

        finder
            .links(text)
            .map(|link| {
                let range = ctx.index.range_from_bytes(link.start(), link.end());
                let kind = classify(link.kind(), link.as_str());
                let target = ctx
                    .embedded_link_at(range.offset)
                    .map(|embedded| embedded.url.clone())
                    .unwrap_or_else(|| link.as_str().to_string());

                let mut annotation = Annotation::detected(kind, range, link.as_str());
                annotation.target = Some(target);
                annotation
            })
            .collect()
    }

    pub fn urls(&self, ctx: &MatchContext) -> Vec<Annotation> {
        self.detect_kind(ctx, AnnotationKind::Url)
    }

    pub fn emails(&self, ctx: &MatchContext) -> Vec<Annotation> {
        self.detect_kind(ctx, AnnotationKind::Email)
    }

    fn detect_kind(&self, ctx: &MatchContext, kind: AnnotationKind) -> Vec<Annotation> {
        let mut links = self.detect(ctx);
        links.retain(|a| a.kind == kind);
        links
    }
}

/// Email if linkify says so or the scheme is `mailto`
pub fn classify(kind: &LinkKind, text: &str) -> AnnotationKind {
    match kind {
        LinkKind::Email => AnnotationKind::Email,
        _ if has_mailto_scheme(text) => AnnotationKind::Email,
        _ => AnnotationKind::Url,
    }
}

fn has_mailto_scheme(text: &str) -> bool {
    text.len() >= MAILTO.len()
        && text.is_char_boundary(MAILTO.len())
        && text[..MAILTO.len()].eq_ignore_ascii_case(MAILTO)
}

// ==================== TESTS ====================
