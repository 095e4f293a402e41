//! ContextCore: rich-text annotation engine for clickable labels
//!
//! A Rust/WASM engine that finds the interactive spans of a label's text and
//! answers "what is under this point" for the UI layer.
//!
//! # Architecture
//!
//! ## Scanner Components
//! - `document.rs` - LabelDocument: **Configuration state** - text, kinds, link definitions
//! - `resolver.rs` - AnnotationResolver: runs the detectors in a fixed order
//! - `text_link.rs` - TextLinkCortex: caller phrases via Aho-Corasick / Regex
//! - `syntax.rs` - SyntaxCortex: @handles and #hashtags
//! - `links.rs` - LinkCortex: URLs and emails via linkify
//! - `phone.rs` - PhoneCortex: phone numbers
//! - `lookup.rs` - SpanLookup: hit-testing
//! - `offsets.rs` - TextOffsetIndex: UTF-16 code unit addressing
//! - `change.rs` - ChangeDetector: skip identical re-resolution
//! - `style.rs` - StyleSheet: per-kind appearance and style runs
//!
//! # Usage (WASM)
//! ```javascript,ignore
//! import init, { ContextScanner } from 'contextcore';
//!
//! await init();
//!
//! const scanner = new ContextScanner({ enabled_kinds: ['text_link', 'user_handle', 'url'] });
//!
//! scanner.setText("Ping @ana about the release notes: https://example.com");
//! scanner.registerTextLinks([
//!   { text: 'release notes', action: (a) => openNotes(a.range) },
//! ]);
//!
//! // On pointer-up at a code unit offset
//! const hit = scanner.activate(offset);   // runs the action for text links
//! console.log(hit?.kind);                 // "text_link"
//! ```

mod console;
pub mod scanner;
pub mod wasm;

// Public exports - Scanner
pub use scanner::*;
pub use wasm::ContextScanner;

use wasm_bindgen::prelude::*;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator for smaller WASM bundle size.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get version information
#[wasm_bindgen]
pub fn version() -> String {
    format!("contextcore v{}", env!("CARGO_PKG_VERSION"))
}

/// Length of `text` in UTF-16 code units, the unit every range uses
#[wasm_bindgen(js_name = codeUnitLength)]
pub fn js_code_unit_length(text: &str) -> usize {
    scanner::code_unit_length(text)
}
