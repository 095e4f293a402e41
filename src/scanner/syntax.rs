//! SyntaxCortex - User handle and hashtag detection via Regex
//!
//! Detects marker-prefixed words:
//! - User handles: @username
//! - Hashtags: #tag
//!
//! A marker only counts at the start of the text or after whitespace, and must
//! be followed by word characters with at least one letter, `&`, `_` or `-`.
//! So `@@user`, `@#user` and a bare `#` are not matches.

use regex::{Regex, RegexBuilder};

use super::resolver::MatchContext;
use super::types::{Annotation, AnnotationError, AnnotationKind};
use crate::console;

/// @username. The leading `(?:^|\s)` stands in for a lookbehind and is not
/// part of the reported range (group 1).
pub const USER_HANDLE_PATTERN: &str = r"(?:^|\s)(@\w*[A-Za-z&_-]+\w*)";

/// #tag, same boundary rule as handles
pub const HASHTAG_PATTERN: &str = r"(?:^|\s)(#\w*[A-Za-z&_-]+\w*)";

/// Handle and hashtag detector.
///
/// Each pattern is compiled once. A pattern that fails to compile leaves its
/// kind disabled; the other kind keeps working.
#[derive(Debug, Clone)]
pub struct SyntaxCortex {
    handle_re: Option<Regex>,
    hashtag_re: Option<Regex>,
}

impl SyntaxCortex {
    /// Create a new SyntaxCortex with the built-in patterns
    pub fn new() -> Self {
        Self::with_patterns(None, None)
    }

    /// Override either pattern. Custom patterns report capture group 1 when
    /// they have one, otherwise the whole match.
    pub fn with_patterns(handle: Option<&str>, hashtag: Option<&str>) -> Self {
        Self {
            handle_re: compile_or_warn(handle.unwrap_or(USER_HANDLE_PATTERN)),
            hashtag_re: compile_or_warn(hashtag.unwrap_or(HASHTAG_PATTERN)),
        }
    }

    pub fn handles_ready(&self) -> bool {
        self.handle_re.is_some()
    }

    pub fn hashtags_ready(&self) -> bool {
        self.hashtag_re.is_some()
    }

    /// @handles, left to right
    pub fn user_handles(&self, ctx: &MatchContext) -> Vec<Annotation> {
        scan(self.handle_re.as_ref(), AnnotationKind::UserHandle, ctx)
    }

    /// #hashtags, left to right
    pub fn hashtags(&self, ctx: &MatchContext) -> Vec<Annotation> {
        scan(self.hashtag_re.as_ref(), AnnotationKind::Hashtag, ctx)
    }
}

impl Default for SyntaxCortex {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn compile(pattern: &str) -> Result<Regex, AnnotationError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| AnnotationError::PatternCompile {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

fn compile_or_warn(pattern: &str) -> Option<Regex> {
    match compile(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            console::warn(&format!("[SyntaxCortex] {}", e));
            None
        }
    }
}

fn scan(re: Option<&Regex>, kind: AnnotationKind, ctx: &MatchContext) -> Vec<Annotation> {
    let Some(re) = re else {
        return Vec::new();
    };
    let text = ctx.text();

    re.captures_iter(text)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(0)))
        .filter_map(|m| {
            let range = ctx.index.range_from_bytes(m.start(), m.end());
            // A bare marker is not a match
            if range.length <= 1 {
                return None;
            }
            Some(Annotation::detected(kind, range, m.as_str()))
        })
        .collect()
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::offsets::substring;

    fn texts(annotations: &[Annotation]) -> Vec<&str> {
        annotations.iter().map(|a| a.matched_text.as_str()).collect()
    }

    #[test]
    fn test_user_handles_without_emojis() {
        let cortex = SyntaxCortex::new();
        let text = "Testing #tag1 @user1 #and @user2 #tag4 # @ @@user @#user without emojis";
        let ctx = MatchContext::new(text);

        let handles = cortex.user_handles(&ctx);
        assert_eq!(texts(&handles), vec!["@user1", "@user2"]);
        assert!(handles.iter().all(|a| a.kind == AnnotationKind::UserHandle));
        assert!(handles.iter().all(|a| a.source.is_none()));
        assert_eq!(handles[0].range.offset, 14);
        assert_eq!(handles[0].range.length, 6);
    }

    #[test]
    fn test_hashtags_without_emojis() {
        let cortex = SyntaxCortex::new();
        let text = "Testing #tag1 @user1 #and @user2 #tag4 # @ @@user @#user without emojis";
        let ctx = MatchContext::new(text);

        assert_eq!(texts(&cortex.hashtags(&ctx)), vec!["#tag1", "#and", "#tag4"]);
    }

    #[test]
    fn test_user_handles_with_emojis() {
        let cortex = SyntaxCortex::new();
        let text = "Testing ☕️🍪 #tag1 ☕️🍪 @user1😊 #and @user2☕️emoji #tag4 # @ @@user @#user with emojis 👍";
        let ctx = MatchContext::new(text);

        let handles = cortex.user_handles(&ctx);
        assert_eq!(texts(&handles), vec!["@user1", "@user2"]);
        for handle in &handles {
            assert_eq!(substring(text, handle.range).unwrap(), handle.matched_text);
        }
    }

    #[test]
    fn test_hashtags_with_emojis() {
        let cortex = SyntaxCortex::new();
        let text = "Testing ☕️🍪 #tag1 ☕️🍪 @and #tag2😊 @user #tag3☕️emoji # @ @@user @#tag with emojis 👍";
        let ctx = MatchContext::new(text);

        let tags = cortex.hashtags(&ctx);
        assert_eq!(texts(&tags), vec!["#tag1", "#tag2", "#tag3"]);
        for tag in &tags {
            assert_eq!(substring(text, tag.range).unwrap(), tag.matched_text);
        }
    }

    #[test]
    fn test_marker_at_start_of_text() {
        let cortex = SyntaxCortex::new();
        let ctx = MatchContext::new("#first and @second");
        assert_eq!(texts(&cortex.hashtags(&ctx)), vec!["#first"]);
        assert_eq!(texts(&cortex.user_handles(&ctx)), vec!["@second"]);
    }

    #[test]
    fn test_marker_inside_word_is_ignored() {
        let cortex = SyntaxCortex::new();
        let ctx = MatchContext::new("mail me at name@example and issue#12");
        assert!(cortex.user_handles(&ctx).is_empty());
        assert!(cortex.hashtags(&ctx).is_empty());
    }

    #[test]
    fn test_digits_only_is_not_a_tag() {
        let cortex = SyntaxCortex::new();
        let ctx = MatchContext::new("ticket #123 vs #v2 and #rock-n-roll");
        assert_eq!(texts(&cortex.hashtags(&ctx)), vec!["#v2", "#rock-n-roll"]);
    }

    #[test]
    fn test_adjacent_markers_after_whitespace() {
        let cortex = SyntaxCortex::new();
        let ctx = MatchContext::new("#a #b\t#c\n#d");
        assert_eq!(texts(&cortex.hashtags(&ctx)), vec!["#a", "#b", "#c", "#d"]);
    }

    #[test]
    fn test_invalid_custom_pattern_disables_only_that_kind() {
        let cortex = SyntaxCortex::with_patterns(Some("(@unclosed"), None);
        assert!(!cortex.handles_ready());
        assert!(cortex.hashtags_ready());

        let ctx = MatchContext::new("hi @user #tag");
        assert!(cortex.user_handles(&ctx).is_empty());
        assert_eq!(texts(&cortex.hashtags(&ctx)), vec!["#tag"]);
    }

    #[test]
    fn test_custom_pattern_without_group_reports_whole_match() {
        let cortex = SyntaxCortex::with_patterns(Some(r"@[a-z]+"), None);
        let ctx = MatchContext::new("x@abc");
        assert_eq!(texts(&cortex.user_handles(&ctx)), vec!["@abc"]);
    }

    #[test]
    fn test_compile_error() {
        let err = compile("[").unwrap_err();
        assert!(matches!(err, AnnotationError::PatternCompile { .. }));
    }
}
