//! Form-level messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The severity of a form-level message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    /// Neutral information.
    #[default]
    Info,
    /// A positive outcome.
    Success,
    /// Something the user should look at.
    Warning,
    /// A failure.
    Danger,
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
        })
    }
}

/// A message shown in the form's message area.
///
/// The text is stored HTML-escaped, ready to be inserted into markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormMessage {
    /// The escaped message text.
    pub html: String,
    /// The severity.
    pub level: MessageLevel,
}

impl FormMessage {
    /// Creates a message, escaping `text`.
    pub fn new(text: &str, level: MessageLevel) -> Self {
        Self {
            html: escape_html(text),
            level,
        }
    }

    /// Returns `true` if the escaped text contains `needle` (escaped the same way).
    pub fn contains(&self, needle: &str) -> bool {
        self.html.contains(&escape_html(needle))
    }
}

/// Escapes the characters that are unsafe in HTML text and attribute values.
///
/// # Examples
///
/// ```
/// use stepform_forms::messages::escape_html;
///
/// assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;&#x2F;b&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            other => out.push(other),
        }
    }
    out
}
