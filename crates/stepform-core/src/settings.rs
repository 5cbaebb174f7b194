//! Settings for stepform.
//!
//! [`Settings`] holds the ambient configuration shared by every form on a
//! page: API endpoint layout, asset location, logging, and UX timing. There is
//! no global instance; settings are loaded once by the host (see
//! [`settings_loader`](crate::settings_loader)) and passed explicitly.

use serde::{Deserialize, Serialize};

/// The complete set of stepform settings.
///
/// # Examples
///
/// ```
/// use stepform_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.api_prefix, "/api");
/// assert_eq!(settings.scroll_duration_ms, 250);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    // ── Core ─────────────────────────────────────────────────────────

    /// Whether debug mode is enabled.
    pub debug: bool,

    // ── Logging ──────────────────────────────────────────────────────

    /// The log level (e.g. "info", "debug", "warn").
    pub log_level: String,

    // ── Internationalization ─────────────────────────────────────────

    /// The language code sent with every API request (e.g. "en").
    pub language_code: String,

    // ── HTTP API ─────────────────────────────────────────────────────

    /// URL prefix of the HTTP API.
    pub api_prefix: String,
    /// The default API version.
    pub api_version: String,
    /// Whether the user agent is attached to outgoing request payloads.
    pub include_user_agent: bool,
    /// The user agent string to attach, if any.
    pub user_agent: Option<String>,

    // ── Assets ───────────────────────────────────────────────────────

    /// URL prefix under which packaged assets are served.
    pub asset_base_url: String,
    /// The package used for asset references without an explicit package.
    pub theme: String,

    // ── Forms ────────────────────────────────────────────────────────

    /// Duration of scroll animations, in milliseconds.
    pub scroll_duration_ms: u64,
    /// Layout areas assumed when a form configuration does not list any.
    pub default_areas: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            language_code: "en".to_string(),
            api_prefix: "/api".to_string(),
            api_version: "1".to_string(),
            include_user_agent: true,
            user_agent: None,
            asset_base_url: "/assets".to_string(),
            theme: "app".to_string(),
            scroll_duration_ms: 250,
            default_areas: vec![
                "hidden".to_string(),
                "header".to_string(),
                "body".to_string(),
                "footer".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.debug);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.api_version, "1");
        assert_eq!(settings.asset_base_url, "/assets");
        assert!(settings.default_areas.contains(&"body".to_string()));
        assert!(settings.default_areas.contains(&"hidden".to_string()));
    }

    #[test]
    fn test_serde_roundtrip_keeps_values() {
        let mut settings = Settings::default();
        settings.theme = "dark".into();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.theme, "dark");
        assert_eq!(back.default_areas, settings.default_areas);
    }
}
