//! `[widget]` section and the declarative carrier element.
//!
//! # Example
//!
//! ```toml
//! [widget]
//! background = "#222"
//! text_color = "#eee"
//! default_text = "image unavailable"
//! auto_convert = true
//! ```
//!
//! The same four options can be given per page on a carrier element:
//!
//! ```html
//! <script id="fix-broken-img" data-background="#222" data-auto-convert="false"></script>
//! ```

use crate::config::ConfigDiagnostics;
use crate::dom::Document;
use serde::{Deserialize, Serialize};

/// Built-in fallback background.
pub const DEFAULT_BACKGROUND: &str = "#f5f5f5";
/// Built-in fallback text color.
pub const DEFAULT_TEXT_COLOR: &str = "#666";
/// Built-in fallback label.
pub const DEFAULT_TEXT: &str = "😟 图片加载失败";
/// `id` of the element carrying page-level configuration.
pub const CARRIER_ID: &str = "fix-broken-img";

/// Options accepted by `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Fallback background given to auto-converted images.
    pub background: String,
    /// Fallback text color given to auto-converted images.
    pub text_color: String,
    /// Fallback label for instances without `alt`.
    pub default_text: String,
    /// Scan and observe the document for plain images.
    pub auto_convert: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND.into(),
            text_color: DEFAULT_TEXT_COLOR.into(),
            default_text: DEFAULT_TEXT.into(),
            auto_convert: true,
        }
    }
}

impl WidgetConfig {
    /// Read the page's carrier element, falling back to built-in defaults.
    pub fn from_carrier(doc: &Document) -> Self {
        Self::default().with_carrier(doc)
    }

    /// Overlay the carrier element's data attributes on `self`.
    ///
    /// Empty values keep the current setting. `data-auto-convert` disables
    /// conversion only when it is exactly `"false"`.
    pub fn with_carrier(mut self, doc: &Document) -> Self {
        let Some(carrier) = doc.get_element_by_id(CARRIER_ID) else {
            return self;
        };

        let read = |key: &str| doc.dataset(carrier, key).filter(|v| !v.is_empty());
        if let Some(background) = read("background") {
            self.background = background.to_string();
        }
        if let Some(color) = read("textColor") {
            self.text_color = color.to_string();
        }
        if let Some(text) = read("defaultText") {
            self.default_text = text.to_string();
        }
        if let Some(flag) = doc.dataset(carrier, "autoConvert") {
            self.auto_convert = flag != "false";
        }
        self
    }

    /// Whether a fallback background must be spelled out on a converted element.
    pub fn custom_background(&self) -> Option<&str> {
        Some(self.background.as_str()).filter(|bg| !bg.is_empty() && *bg != DEFAULT_BACKGROUND)
    }

    /// Whether a fallback text color must be spelled out on a converted element.
    pub fn custom_text_color(&self) -> Option<&str> {
        Some(self.text_color.as_str())
            .filter(|color| !color.is_empty() && *color != DEFAULT_TEXT_COLOR)
    }

    /// Validate values read from a config file.
    ///
    /// Values are otherwise accepted as-is; only empty strings are rejected
    /// since they would silently fall back to the built-in defaults.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.default_text.trim().is_empty() {
            diag.error_with_hint(
                "widget.default_text",
                "must not be empty",
                "remove the field to use the built-in label",
            );
        }
        if self.background.trim().is_empty() {
            diag.warn("widget.background", "empty, built-in background is used");
        }
        if self.text_color.trim().is_empty() {
            diag.warn("widget.text_color", "empty, built-in text color is used");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::html::parse_document;

    #[test]
    fn test_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.background, "#f5f5f5");
        assert_eq!(config.text_color, "#666");
        assert_eq!(config.default_text, DEFAULT_TEXT);
        assert!(config.auto_convert);
    }

    #[test]
    fn test_missing_carrier_uses_defaults() {
        let doc = parse_document("<body><img src=\"a.png\"></body>").unwrap();
        assert_eq!(WidgetConfig::from_carrier(&doc), WidgetConfig::default());
    }

    #[test]
    fn test_carrier_overrides() {
        let doc = parse_document(
            r##"<script id="fix-broken-img" data-background="#000" data-text-color="#fff"
                data-default-text="gone" data-auto-convert="false"></script>"##,
        )
        .unwrap();
        let config = WidgetConfig::from_carrier(&doc);
        assert_eq!(config.background, "#000");
        assert_eq!(config.text_color, "#fff");
        assert_eq!(config.default_text, "gone");
        assert!(!config.auto_convert);
    }

    #[test]
    fn test_carrier_is_permissive() {
        let doc = parse_document(
            r#"<script id="fix-broken-img" data-background="" data-auto-convert="no"></script>"#,
        )
        .unwrap();
        let config = WidgetConfig::from_carrier(&doc);
        assert_eq!(config.background, DEFAULT_BACKGROUND);
        assert!(config.auto_convert, "only the literal \"false\" disables conversion");
    }

    #[test]
    fn test_custom_colors_skip_defaults() {
        let config = WidgetConfig::default();
        assert_eq!(config.custom_background(), None);
        assert_eq!(config.custom_text_color(), None);

        let config = WidgetConfig {
            background: "#123".into(),
            text_color: "red".into(),
            ..WidgetConfig::default()
        };
        assert_eq!(config.custom_background(), Some("#123"));
        assert_eq!(config.custom_text_color(), Some("red"));
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let config = WidgetConfig {
            default_text: "  ".into(),
            ..WidgetConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        assert!(diag.has_errors());
        assert_eq!(diag.errors()[0].field, "widget.default_text");
    }

    #[test]
    fn test_toml_section() {
        let config: WidgetConfig = toml::from_str("text_color = \"#eee\"\nauto_convert = false").unwrap();
        assert_eq!(config.text_color, "#eee");
        assert_eq!(config.background, DEFAULT_BACKGROUND);
        assert!(!config.auto_convert);
    }
}
