//! ChangeDetector: skip re-resolution of identical input
//!
//! A resolution depends on the text, the caller's embedded links and the
//! document settings (enabled kinds, detection switch, patterns, link
//! definitions). The document condenses its settings into one key; the
//! detector hashes all three into one fingerprint.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::links::EmbeddedLink;

// =============================================================================
// Types
// =============================================================================

/// Result of change detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeResult {
    /// True if the input differs from the last check
    pub has_changed: bool,
    pub fingerprint: u64,
    pub previous: Option<u64>,
}

// =============================================================================
// ChangeDetector
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    last_fingerprint: Option<u64>,
    check_count: u64,
    skip_count: u64,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint of one resolution input
    pub fn fingerprint(text: &str, embedded_links: &[EmbeddedLink], settings: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        embedded_links.hash(&mut hasher);
        settings.hash(&mut hasher);
        hasher.finish()
    }

    /// Record a check and report whether the input changed
    pub fn check(&mut self, text: &str, embedded_links: &[EmbeddedLink], settings: u64) -> ChangeResult {
        self.check_count += 1;

        let fingerprint = Self::fingerprint(text, embedded_links, settings);
        let previous = self.last_fingerprint;
        let has_changed = previous != Some(fingerprint);

        if !has_changed {
            self.skip_count += 1;
        }
        self.last_fingerprint = Some(fingerprint);

        ChangeResult { has_changed, fingerprint, previous }
    }

    pub fn has_changed(&mut self, text: &str, embedded_links: &[EmbeddedLink], settings: u64) -> bool {
        self.check(text, embedded_links, settings).has_changed
    }

    /// Adopt a fingerprint computed elsewhere (e.g. a restored snapshot)
    pub fn set_last_fingerprint(&mut self, fingerprint: u64) {
        self.last_fingerprint = Some(fingerprint);
    }

    /// Skip rate as percentage
    pub fn skip_rate(&self) -> f64 {
        if self.check_count == 0 {
            return 0.0;
        }
        (self.skip_count as f64 / self.check_count as f64) * 100.0
    }
}

// ==================== TESTS ====================
