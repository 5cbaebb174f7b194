//! Translation seam.
//!
//! The form engine never looks up translations through an ambient global.
//! Hosts inject a [`Translator`]; [`IdentityTranslator`] returns message IDs
//! unchanged and [`CatalogTranslator`] serves a fixed in-memory catalog.

use std::collections::HashMap;

/// Resolves message IDs to user-facing text.
pub trait Translator: Send + Sync {
    /// Translates `msgid`, falling back to `msgid` itself when unknown.
    fn translate(&self, msgid: &str) -> String;

    /// Translates `msgid` and substitutes `{name}` placeholders.
    fn translate_with(&self, msgid: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.translate(msgid);
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }
}

/// A translator that returns message IDs unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, msgid: &str) -> String {
        msgid.to_string()
    }
}

/// A translator backed by a single-language message catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogTranslator {
    language: String,
    messages: HashMap<String, String>,
}

impl CatalogTranslator {
    /// Creates an empty catalog for `language`.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            messages: HashMap::new(),
        }
    }

    /// Adds `(msgid, translated)` pairs, overwriting duplicates.
    #[must_use]
    pub fn with_messages<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.messages
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Loads entries from a JSON object of `msgid -> text`.
    pub fn from_json(language: impl Into<String>, json: &str) -> Result<Self, serde_json::Error> {
        let messages: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(Self {
            language: language.into(),
            messages,
        })
    }

    /// Returns the catalog language.
    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Translator for CatalogTranslator {
    fn translate(&self, msgid: &str) -> String {
        self.messages
            .get(msgid)
            .cloned()
            .unwrap_or_else(|| msgid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert_eq!(IdentityTranslator.translate("stepform@hello"), "stepform@hello");
    }

    #[test]
    fn test_catalog_lookup_and_fallback() {
        let t = CatalogTranslator::new("fr").with_messages([("hello", "bonjour")]);
        assert_eq!(t.language(), "fr");
        assert_eq!(t.translate("hello"), "bonjour");
        assert_eq!(t.translate("missing"), "missing");
    }

    #[test]
    fn test_translate_with_placeholders() {
        let t = CatalogTranslator::new("en")
            .with_messages([("widget_failed", "Widget {uid} failed: {reason}")]);
        assert_eq!(
            t.translate_with("widget_failed", &[("uid", "city"), ("reason", "404")]),
            "Widget city failed: 404"
        );
    }

    #[test]
    fn test_from_json() {
        let t = CatalogTranslator::from_json("de", r#"{"yes": "ja"}"#).unwrap();
        assert_eq!(t.translate("yes"), "ja");
        assert!(CatalogTranslator::from_json("de", "[1]").is_err());
    }
}
