//! ContextScanner - JS facade over LabelDocument
//!
//! JS callers register text links as plain objects:
//! `{ text, range?: { offset, length }, options?: {...}, action?: Function }`.
//! JS functions cannot cross into the `Send + Sync` callback slot of a
//! `LinkDefinition`, so the scanner keeps them itself and tags each definition
//! with its registration index as payload.

use js_sys::{Array, Function, Reflect};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::console;
use crate::scanner::{
    code_unit_length, CompareOptions, EmbeddedLink, KindSet, LabelDocument, LinkDefinition,
    ScannerConfig, StyleSheet, TextRange,
};

#[derive(Deserialize)]
struct TextLinkInput {
    text: String,
    #[serde(default)]
    range: Option<TextRange>,
    #[serde(default)]
    options: CompareOptions,
}

/// Plain JS objects rather than `Map`s for map-shaped values
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub struct ContextScanner {
    document: LabelDocument,
    styles: StyleSheet,
    /// Indexed by the payload of each registered definition
    actions: Vec<Option<Function>>,
}

#[wasm_bindgen]
impl ContextScanner {
    /// Create a scanner from an optional configuration object
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<ContextScanner, JsValue> {
        let config: ScannerConfig = if config.is_undefined() || config.is_null() {
            ScannerConfig::default()
        } else {
            from_js(config)?
        };

        Ok(ContextScanner {
            document: LabelDocument::with_config(config),
            styles: StyleSheet::default(),
            actions: Vec::new(),
        })
    }

    /// Set plain text and return its annotations
    #[wasm_bindgen(js_name = setText)]
    pub fn set_text(&mut self, text: &str) -> Result<JsValue, JsValue> {
        self.document.set_text(text);
        self.log_resolution();
        self.annotations()
    }

    /// Set text whose spans already carry links: `[{ range, url }]`
    #[wasm_bindgen(js_name = setAttributedText)]
    pub fn set_attributed_text(&mut self, text: &str, links: JsValue) -> Result<JsValue, JsValue> {
        let links: Vec<EmbeddedLink> = from_js(links)?;
        self.document.set_attributed_text(text, links);
        self.log_resolution();
        self.annotations()
    }

    /// Enable exactly the given kinds, e.g. `["hashtag", "url"]`
    #[wasm_bindgen(js_name = setEnabledKinds)]
    pub fn set_enabled_kinds(&mut self, kinds: JsValue) -> Result<(), JsValue> {
        let kinds: KindSet = from_js(kinds)?;
        self.document.set_enabled_kinds(kinds);
        Ok(())
    }

    #[wasm_bindgen(js_name = setAutomaticDetection)]
    pub fn set_automatic_detection(&mut self, enabled: bool) {
        self.document.set_automatic_detection(enabled);
    }

    /// Register text links against the current text.
    /// Returns the number of annotations added.
    #[wasm_bindgen(js_name = registerTextLinks)]
    pub fn register_text_links(&mut self, items: JsValue) -> Result<usize, JsValue> {
        let items: Array = items
            .dyn_into()
            .map_err(|_| JsValue::from_str("registerTextLinks expects an array"))?;

        // Parse everything first so a bad item leaves no orphaned action
        let mut parsed = Vec::with_capacity(items.length() as usize);
        for item in items.iter() {
            let action = Reflect::get(&item, &JsValue::from_str("action"))
                .ok()
                .and_then(|value| value.dyn_into::<Function>().ok());
            let input: TextLinkInput = from_js(item)?;
            parsed.push((input, action));
        }

        let mut definitions = Vec::with_capacity(parsed.len());
        for (input, action) in parsed {
            let mut definition = LinkDefinition::new(input.text)
                .with_options(input.options)
                .with_payload(self.actions.len());
            if let Some(range) = input.range {
                definition = definition.in_range(range);
            }
            self.actions.push(action);
            definitions.push(definition);
        }

        Ok(self.document.register_link_definitions(definitions))
    }

    #[wasm_bindgen(js_name = clearTextLinks)]
    pub fn clear_text_links(&mut self) {
        self.actions.clear();
        self.document.clear_link_definitions();
    }

    #[wasm_bindgen]
    pub fn annotations(&self) -> Result<JsValue, JsValue> {
        to_js(self.document.annotations())
    }

    /// Annotation at a code unit offset, or undefined
    #[wasm_bindgen]
    pub fn lookup(&self, offset: usize) -> Result<JsValue, JsValue> {
        match self.document.lookup(offset) {
            Some(annotation) => to_js(annotation),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// Hit-test and invoke the text link's action with the annotation
    #[wasm_bindgen]
    pub fn activate(&self, offset: usize) -> Result<JsValue, JsValue> {
        let Some(annotation) = self.document.lookup(offset) else {
            return Ok(JsValue::UNDEFINED);
        };
        let value = to_js(annotation)?;

        let index = annotation
            .source
            .as_ref()
            .and_then(|definition| definition.payload_as::<usize>());
        if let Some(Some(action)) = index.and_then(|i| self.actions.get(*i)) {
            action.call1(&JsValue::NULL, &value)?;
        }
        Ok(value)
    }

    /// Non-overlapping style runs over the whole text, with the default palette
    #[wasm_bindgen(js_name = styleRuns)]
    pub fn style_runs(&self, highlighted: Option<usize>) -> Result<JsValue, JsValue> {
        let text_len = code_unit_length(self.document.text());
        to_js(&self.styles.runs(text_len, self.document.annotations(), highlighted))
    }

    #[wasm_bindgen(js_name = getStatus)]
    pub fn get_status(&self) -> Result<JsValue, JsValue> {
        let config = self.document.config();
        let status = serde_json::json!({
            "textLength": code_unit_length(self.document.text()),
            "annotationCount": self.document.annotations().len(),
            "textLinkCount": self.document.link_definitions().len(),
            "actionCount": self.actions.len(),
            "automaticDetection": config.automatic_detection,
            "enabledKinds": config.enabled_kinds,
            "revision": self.document.revision(),
            "wasSkipped": self.document.was_skipped(),
            "skipRate": self.document.skip_rate(),
        });
        to_js(&status)
    }

    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> Result<JsValue, JsValue> {
        to_js(self.document.stats())
    }
}

impl ContextScanner {
    fn log_resolution(&self) {
        if self.document.was_skipped() {
            return;
        }
        let stats = self.document.stats();
        console::log(&format!(
            "[ContextScanner] {} annotations in {} code units ({}us)",
            stats.annotation_count, stats.text_length, stats.timings.total_us
        ));
    }
}
