//! TextLinkCortex - Caller-registered literal links
//!
//! For each `LinkDefinition`, finds every non-overlapping occurrence of its
//! text inside its search window (the definition's range, or the whole text).
//! Results are grouped by definition, in registration order; within one
//! definition they are in search order (left-to-right, or right-to-left when
//! searching backwards).
//!
//! Literal needles go through an Aho-Corasick automaton. Regex needles, and
//! case-insensitive needles outside ASCII, go through `regex`.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, Anchored, Input, MatchKind, StartKind};
use regex::{Regex, RegexBuilder};
use std::ops::Range;
use std::sync::Arc;

use super::resolver::MatchContext;
use super::types::{Annotation, AnnotationError, AnnotationKind, CompareOptions, LinkDefinition, TextRange};
use crate::console;

/// Literal text-link matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLinkCortex;

impl TextLinkCortex {
    pub fn new() -> Self {
        Self
    }

    /// All occurrences of every definition, grouped by definition
    pub fn text_links(&self, ctx: &MatchContext, definitions: &[Arc<LinkDefinition>]) -> Vec<Annotation> {
        let mut out = Vec::new();
        for def in definitions {
            self.collect(ctx, def, &mut out);
        }
        out
    }

    /// All occurrences of one definition
    pub fn occurrences(&self, ctx: &MatchContext, def: &Arc<LinkDefinition>) -> Vec<Annotation> {
        let mut out = Vec::new();
        self.collect(ctx, def, &mut out);
        out
    }

    fn collect(&self, ctx: &MatchContext, def: &Arc<LinkDefinition>, out: &mut Vec<Annotation>) {
        if def.text.is_empty() {
            return;
        }

        let whole = TextRange::new(0, ctx.index.code_unit_len());
        let window = match ctx.index.byte_range(def.range.unwrap_or(whole)) {
            Ok(window) => window,
            Err(e) => {
                console::warn(&format!("[TextLinkCortex] skipping {:?}: {}", def.text, e));
                return;
            }
        };

        let searcher = match Searcher::compile(&def.text, def.options) {
            Ok(searcher) => searcher,
            Err(e) => {
                console::warn(&format!("[TextLinkCortex] {}", e));
                return;
            }
        };

        let text = ctx.text();
        let mut push = |m: Range<usize>| {
            let mut annotation = Annotation::detected(
                AnnotationKind::TextLink,
                ctx.index.range_from_bytes(m.start, m.end),
                &text[m],
            );
            annotation.source = Some(def.clone());
            out.push(annotation);
        };

        let anchored = def.options.anchored;
        if def.options.backwards {
            let mut end = window.end;
            while let Some(m) = searcher.rfind(text, window.start, end, anchored) {
                end = m.start;
                push(m);
            }
        } else {
            let mut cursor = window.start;
            while cursor <= window.end {
                let Some(m) = searcher.find(text, cursor, window.end, anchored) else {
                    break;
                };
                if m.is_empty() {
                    // Zero-width regex hit: step over one char and keep looking
                    match text[m.end..window.end].chars().next() {
                        Some(c) if !anchored => cursor = m.end + c.len_utf8(),
                        _ => break,
                    }
                    continue;
                }
                cursor = m.end;
                push(m);
            }
        }
    }
}

// =============================================================================
// Searcher
// =============================================================================

enum Searcher {
    Literal(AhoCorasick),
    Pattern(Regex),
}

impl Searcher {
    fn compile(needle: &str, options: CompareOptions) -> Result<Self, AnnotationError> {
        if options.regular_expression {
            return compile_regex(needle, options.case_insensitive).map(Searcher::Pattern);
        }
        if options.case_insensitive && !needle.is_ascii() {
            return compile_regex(&regex::escape(needle), true).map(Searcher::Pattern);
        }

        AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostFirst)
            .start_kind(StartKind::Both)
            .ascii_case_insensitive(options.case_insensitive)
            .build([needle])
            .map(Searcher::Literal)
            .map_err(|e| AnnotationError::PatternCompile {
                pattern: needle.to_string(),
                message: e.to_string(),
            })
    }

    /// Leftmost match fully inside `start..end`. When `anchored`, the match
    /// must begin at `start`.
    fn find(&self, text: &str, start: usize, end: usize, anchored: bool) -> Option<Range<usize>> {
        match self {
            Searcher::Literal(ac) => {
                let anchored = if anchored { Anchored::Yes } else { Anchored::No };
                let input = Input::new(text).range(start..end).anchored(anchored);
                ac.find(input).map(|m| m.start()..m.end())
            }
            Searcher::Pattern(re) => {
                // Search the whole text so `$` and `\b` see the real context,
                // then reject hits that spill past the window end.
                let mut at = start;
                loop {
                    let m = re.find_at(text, at)?;
                    if m.start() > end || (anchored && m.start() != start) {
                        return None;
                    }
                    if m.end() <= end {
                        return Some(m.start()..m.end());
                    }
                    if anchored {
                        return None;
                    }
                    let c = text[m.start()..].chars().next()?;
                    at = m.start() + c.len_utf8();
                }
            }
        }
    }

    /// Rightmost non-empty match fully inside `start..end`. When `anchored`,
    /// the match must finish at `end`.
    fn rfind(&self, text: &str, start: usize, end: usize, anchored: bool) -> Option<Range<usize>> {
        let candidates = text[start..end].char_indices().map(|(i, _)| start + i).rev();
        for at in candidates {
            if let Some(m) = self.find(text, at, end, true) {
                if m.is_empty() || (anchored && m.end != end) {
                    continue;
                }
                return Some(m);
            }
        }
        None
    }
}

fn compile_regex(pattern: &str, case_insensitive: bool) -> Result<Regex, AnnotationError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| AnnotationError::PatternCompile {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

// ==================== TESTS ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::offsets::substring;

    const REPEATED: &str = "one two three one two three one two one";

    fn defs(items: Vec<LinkDefinition>) -> Vec<Arc<LinkDefinition>> {
        items.into_iter().map(Arc::new).collect()
    }

    fn find(text: &str, items: Vec<LinkDefinition>) -> Vec<Annotation> {
        TextLinkCortex::new().text_links(&MatchContext::new(text), &defs(items))
    }

    fn offsets(annotations: &[Annotation]) -> Vec<usize> {
        annotations.iter().map(|a| a.range.offset).collect()
    }

    #[test]
    fn test_text_links_without_emojis() {
        let results = find(
            "Testing link1 and link2 without emojis",
            vec![LinkDefinition::new("link1"), LinkDefinition::new("link2"), LinkDefinition::new("link3")],
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].matched_text, "link1");
        assert_eq!(results[0].range, TextRange::new(8, 5));
        assert_eq!(results[0].source.as_ref().map(|d| d.text.as_str()), Some("link1"));
        assert_eq!(results[1].matched_text, "link2");
        assert_eq!(results[1].range, TextRange::new(18, 5));
    }

    #[test]
    fn test_text_links_with_emojis() {
        let text = "Testing ☕️🍪 link😊 and ☕️🍪 link2 with emojis 👍";
        let results = find(
            text,
            vec![LinkDefinition::new("link😊"), LinkDefinition::new("link2"), LinkDefinition::new("link3")],
        );

        assert_eq!(results.len(), 2);
        assert_eq!(substring(text, results[0].range).unwrap(), "link😊");
        assert_eq!(substring(text, results[1].range).unwrap(), "link2");
        assert_eq!(results[0].range.length, 6);
    }

    #[test]
    fn test_multiple_occurrences_without_range() {
        assert_eq!(find(REPEATED, vec![LinkDefinition::new("one")]).len(), 4);
        assert_eq!(find(REPEATED, vec![LinkDefinition::new("two")]).len(), 3);
        assert_eq!(find(REPEATED, vec![LinkDefinition::new("three")]).len(), 2);

        let all = find(
            REPEATED,
            vec![LinkDefinition::new("one"), LinkDefinition::new("two"), LinkDefinition::new("three")],
        );
        assert_eq!(all.len(), 4 + 3 + 2);
        assert_eq!(offsets(&all), vec![0, 14, 28, 36, 4, 18, 32, 8, 22]);
    }

    #[test]
    fn test_multiple_occurrences_with_range() {
        // "one two three on"
        let range = TextRange::new(0, 16);
        assert_eq!(find(REPEATED, vec![LinkDefinition::new("one").in_range(range)]).len(), 1);
        assert_eq!(find(REPEATED, vec![LinkDefinition::new("two").in_range(range)]).len(), 1);
        assert_eq!(find(REPEATED, vec![LinkDefinition::new("three").in_range(range)]).len(), 1);

        let all = find(
            REPEATED,
            vec![
                LinkDefinition::new("one").in_range(range),
                LinkDefinition::new("two").in_range(range),
                LinkDefinition::new("three").in_range(range),
            ],
        );
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_range_not_starting_at_zero() {
        // [1, 30): the "one" at 28..31 straddles the end
        let found = find(REPEATED, vec![LinkDefinition::new("one").in_range(TextRange::new(1, 29))]);
        assert_eq!(offsets(&found), vec![14]);
    }

    #[test]
    fn test_case_insensitive_ascii() {
        let text = "One ONE one oNe";
        assert_eq!(find(text, vec![LinkDefinition::new("one")]).len(), 1);

        let found = find(text, vec![LinkDefinition::new("one").with_options(CompareOptions::case_insensitive())]);
        assert_eq!(offsets(&found), vec![0, 4, 8, 12]);
        assert_eq!(found[1].matched_text, "ONE");
    }

    #[test]
    fn test_case_insensitive_unicode() {
        let text = "été, ÉTÉ et Été";
        let found = find(text, vec![LinkDefinition::new("été").with_options(CompareOptions::case_insensitive())]);
        assert_eq!(found.len(), 3);
        assert_eq!(found[1].matched_text, "ÉTÉ");
        assert_eq!(found[1].range, TextRange::new(5, 3));
    }

    #[test]
    fn test_backwards_reports_right_to_left() {
        let found = find("one two one x one", vec![LinkDefinition::new("one").with_options(CompareOptions::backwards())]);
        assert_eq!(offsets(&found), vec![14, 8, 0]);
    }

    #[test]
    fn test_backwards_prefers_rightmost_overlap() {
        let found = find("aaa", vec![LinkDefinition::new("aa").with_options(CompareOptions::backwards())]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range, TextRange::new(1, 2));

        let forward = find("aaa", vec![LinkDefinition::new("aa")]);
        assert_eq!(forward[0].range, TextRange::new(0, 2));
    }

    #[test]
    fn test_anchored() {
        let options = CompareOptions { anchored: true, ..CompareOptions::default() };
        let found = find("oneone two one", vec![LinkDefinition::new("one").with_options(options)]);
        assert_eq!(offsets(&found), vec![0, 3]);

        assert!(find("x one", vec![LinkDefinition::new("one").with_options(options)]).is_empty());
    }

    #[test]
    fn test_anchored_backwards() {
        let options = CompareOptions { anchored: true, backwards: true, ..CompareOptions::default() };
        let found = find("one x oneone", vec![LinkDefinition::new("one").with_options(options)]);
        assert_eq!(offsets(&found), vec![9, 6]);
    }

    #[test]
    fn test_regular_expression() {
        let found = find(
            "release v1.2 and v10.4",
            vec![LinkDefinition::new(r"v\d+\.\d+").with_options(CompareOptions::regular_expression())],
        );
        let texts: Vec<_> = found.iter().map(|a| a.matched_text.as_str()).collect();
        assert_eq!(texts, vec!["v1.2", "v10.4"]);
    }

    #[test]
    fn test_zero_width_regex_matches_skipped() {
        let found = find("baab", vec![LinkDefinition::new("a*").with_options(CompareOptions::regular_expression())]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_text, "aa");
    }

    #[test]
    fn test_invalid_regex_only_drops_its_definition() {
        let found = find(
            "one two",
            vec![
                LinkDefinition::new("(").with_options(CompareOptions::regular_expression()),
                LinkDefinition::new("two"),
            ],
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_text, "two");
    }

    #[test]
    fn test_regex_metacharacters_are_literal_by_default() {
        assert_eq!(find("a.b axb", vec![LinkDefinition::new("a.b")]).len(), 1);
    }

    #[test]
    fn test_bad_ranges_yield_nothing() {
        // splits the surrogate pair of 😊
        assert!(find("a😊b a", vec![LinkDefinition::new("a").in_range(TextRange::new(0, 2))]).is_empty());
        assert!(find("abc", vec![LinkDefinition::new("a").in_range(TextRange::new(1, 5))]).is_empty());
        assert!(find("one two", vec![LinkDefinition::new("one").in_range(TextRange::new(usize::MAX, 2))]).is_empty());
        assert!(find("one two", vec![LinkDefinition::new("one").in_range(TextRange::new(0, usize::MAX))]).is_empty());
    }

    #[test]
    fn test_regex_window_end_is_not_text_end() {
        let options = CompareOptions::regular_expression();
        let text = "oneself one";

        let clipped = find(text, vec![LinkDefinition::new(r"one\b").with_options(options).in_range(TextRange::new(0, 3))]);
        assert!(clipped.is_empty());

        let whole = find(text, vec![LinkDefinition::new(r"one\b").with_options(options)]);
        assert_eq!(offsets(&whole), vec![8]);

        let dollar = find("one two", vec![LinkDefinition::new("one$").with_options(options).in_range(TextRange::new(0, 3))]);
        assert!(dollar.is_empty());
    }

    #[test]
    fn test_regex_hit_spilling_past_window_falls_back_to_later_hit() {
        let options = CompareOptions::regular_expression();
        // "abcd" overruns the window; "bc" fits
        let found = find("abcd", vec![LinkDefinition::new("abcd|bc").with_options(options).in_range(TextRange::new(0, 3))]);
        assert_eq!(offsets(&found), vec![1]);
        assert_eq!(found[0].matched_text, "bc");
    }

    #[test]
    fn test_empty_needle_yields_nothing() {
        assert!(find("abc", vec![LinkDefinition::new("")]).is_empty());
    }
}
