//! PhoneCortex - Phone number detection via Regex
//!
//! Recognizes the common written shapes:
//! - +1 (555) 123-4567
//! - (555) 123 4567
//! - 555.987.6543
//! - +44 20 7946 0958
//!
//! Hits are post-filtered: 7 to 15 digits, and not glued to a letter, digit
//! or `+` on either side (so order numbers and long digit runs are skipped).

use regex::Regex;

use super::resolver::MatchContext;
use super::types::{Annotation, AnnotationKind};
use crate::console;

pub const PHONE_PATTERN: &str = r"(?x)
    (?:\+\d{1,3}[\s.-]?)?           # country code
    (?:\(\d{1,4}\)[\s.-]?|\d{1,4}[\s.-])?   # area code
    \d{2,4}[\s.-]?\d{3,4}           # subscriber number
    (?:[\s.-]\d{3,4})?
";

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

/// Phone number detector
#[derive(Debug, Clone)]
pub struct PhoneCortex {
    phone_re: Option<Regex>,
}

impl PhoneCortex {
    pub fn new() -> Self {
        let phone_re = match Regex::new(PHONE_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                console::warn(&format!("[PhoneCortex] invalid pattern: {}", e));
                None
            }
        };
        Self { phone_re }
    }

    /// Phone numbers, left to right, verbatim
    pub fn phone_numbers(&self, ctx: &MatchContext) -> Vec<Annotation> {
        let Some(re) = &self.phone_re else {
            return Vec::new();
        };
        let text = ctx.text();
        let mut found = Vec::new();
        let mut at = 0;

        // A rejected hit only consumes its first char, so a number starting
        // inside it is still found.
        while let Some(m) = re.find_at(text, at) {
            let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
            if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) && is_isolated(text, m.start(), m.end()) {
                let range = ctx.index.range_from_bytes(m.start(), m.end());
                found.push(Annotation::detected(AnnotationKind::PhoneNumber, range, m.as_str()));
                at = m.end();
                continue;
            }
            match text[m.start()..].chars().next() {
                Some(c) => at = m.start() + c.len_utf8(),
                None => break,
            }
        }
        found
    }
}

impl Default for PhoneCortex {
    fn default() -> Self {
        Self::new()
    }
}

fn is_isolated(text: &str, start: usize, end: usize) -> bool {
    let glued = |c: char| c.is_alphanumeric() || c == '+';
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.map_or(false, glued) && !after.map_or(false, glued)
}

// ==================== TESTS ====================
