//! Form controls extracted from server-rendered widget markup.
//!
//! Widget definitions arrive with pre-rendered HTML. The engine does not need
//! a full DOM: it only needs the named controls (`input`, `select`,
//! `textarea`, `button`) in document order, with their values and checked
//! state, so it can serialize, fill, and reset them.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(input|select|textarea|button)\b([^>]*)>").expect("valid tag regex")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>"']+)))?"#)
        .expect("valid attribute regex")
});

static OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<option\b([^>]*)>(.*?)</option\s*>").expect("valid option regex")
});

static TEXTAREA_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</textarea\s*>").expect("valid textarea regex"));

static SELECT_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</select\s*>").expect("valid select regex"));

/// The element kind of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTag {
    /// `<input>`.
    Input,
    /// `<select>`.
    Select,
    /// `<textarea>`.
    Textarea,
    /// `<button>`.
    Button,
}

impl ControlTag {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "input" => Some(Self::Input),
            "select" => Some(Self::Select),
            "textarea" => Some(Self::Textarea),
            "button" => Some(Self::Button),
            _ => None,
        }
    }
}

impl fmt::Display for ControlTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "INPUT",
            Self::Select => "SELECT",
            Self::Textarea => "TEXTAREA",
            Self::Button => "BUTTON",
        })
    }
}

/// A named form control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    /// The element kind.
    pub tag: ControlTag,
    /// The lowercased `type` attribute of an `<input>` (`"text"` if absent).
    pub input_type: String,
    /// The `name` attribute.
    pub name: String,
    /// The current value.
    pub value: String,
    /// The current checked state (checkboxes and radios).
    pub checked: bool,
    /// Set by `data-skip-serialization="True"`.
    pub skip_serialization: bool,
    default_value: String,
    default_checked: bool,
}

impl Control {
    /// Creates a control with an empty value.
    pub fn new(tag: ControlTag, name: impl Into<String>) -> Self {
        Self {
            tag,
            input_type: if tag == ControlTag::Input {
                "text".to_string()
            } else {
                String::new()
            },
            name: name.into(),
            value: String::new(),
            checked: false,
            skip_serialization: false,
            default_value: String::new(),
            default_checked: false,
        }
    }

    /// Creates an `<input type="hidden">`.
    pub fn hidden(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ControlTag::Input, name)
            .with_type("hidden")
            .with_value(value)
    }

    /// Sets the input type.
    #[must_use]
    pub fn with_type(mut self, input_type: &str) -> Self {
        self.input_type = input_type.to_ascii_lowercase();
        self
    }

    /// Sets the value and makes it the default.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self.default_value.clone_from(&self.value);
        self
    }

    /// Sets the checked state and makes it the default.
    #[must_use]
    pub const fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self.default_checked = checked;
        self
    }

    /// Excludes the control from serialization.
    #[must_use]
    pub const fn skipped(mut self) -> Self {
        self.skip_serialization = true;
        self
    }

    /// Returns `true` for `<input type="checkbox">`.
    pub fn is_checkbox(&self) -> bool {
        self.tag == ControlTag::Input && self.input_type == "checkbox"
    }

    /// Returns `true` for `<input type="radio">`.
    pub fn is_radio(&self) -> bool {
        self.tag == ControlTag::Input && self.input_type == "radio"
    }

    /// Restores the value and checked state declared in the markup.
    pub fn reset(&mut self) {
        self.value.clone_from(&self.default_value);
        self.checked = self.default_checked;
    }
}

/// Extracts the named controls from an HTML fragment, in document order.
///
/// Controls without a `name` attribute are ignored. A `<select>` takes the
/// value of its first selected option, or of its first option.
///
/// # Examples
///
/// ```
/// use stepform_forms::markup::{parse_controls, ControlTag};
///
/// let controls = parse_controls(
///     r#"<div><input type="checkbox" name="agree" checked><textarea name="bio">Hi</textarea></div>"#,
/// );
/// assert_eq!(controls.len(), 2);
/// assert!(controls[0].checked);
/// assert_eq!(controls[1].tag, ControlTag::Textarea);
/// assert_eq!(controls[1].value, "Hi");
/// ```
pub fn parse_controls(markup: &str) -> Vec<Control> {
    let mut controls = Vec::new();
    let mut resume_at = 0;

    for caps in TAG_RE.captures_iter(markup) {
        let whole = caps.get(0).expect("match 0 always present");
        if whole.start() < resume_at {
            continue;
        }
        let Some(tag) = ControlTag::from_name(&caps[1]) else {
            continue;
        };
        let attrs = parse_attrs(&caps[2]);
        let Some(name) = attr(&attrs, "name").filter(|n| !n.is_empty()) else {
            continue;
        };

        let mut control = Control::new(tag, name);
        control.skip_serialization = attr(&attrs, "data-skip-serialization") == Some("True");

        match tag {
            ControlTag::Input => {
                if let Some(t) = attr(&attrs, "type") {
                    control = control.with_type(t);
                }
                let default_on = if control.is_checkbox() || control.is_radio() {
                    "on"
                } else {
                    ""
                };
                control = control
                    .with_value(attr(&attrs, "value").unwrap_or(default_on))
                    .with_checked(has_attr(&attrs, "checked"));
            }
            ControlTag::Button => {
                control = control.with_value(attr(&attrs, "value").unwrap_or_default());
            }
            ControlTag::Textarea => {
                let body_start = whole.end();
                let (content, end) = TEXTAREA_END_RE.find_at(markup, body_start).map_or(
                    (&markup[body_start..], markup.len()),
                    |m| (&markup[body_start..m.start()], m.end()),
                );
                control = control.with_value(decode_entities(content));
                resume_at = end;
            }
            ControlTag::Select => {
                let body_start = whole.end();
                let (content, end) = SELECT_END_RE.find_at(markup, body_start).map_or(
                    (&markup[body_start..], markup.len()),
                    |m| (&markup[body_start..m.start()], m.end()),
                );
                control = control.with_value(selected_option(content));
                resume_at = end;
            }
        }

        controls.push(control);
    }

    controls
}

fn parse_attrs(raw: &str) -> Vec<(String, Option<String>)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|c| {
            let name = c[1].to_ascii_lowercase();
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| decode_entities(m.as_str()));
            (name, value)
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, Option<String>)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_deref().unwrap_or(""))
}

fn has_attr(attrs: &[(String, Option<String>)], name: &str) -> bool {
    attrs.iter().any(|(n, _)| n == name)
}

fn selected_option(content: &str) -> String {
    let mut first = None;
    for caps in OPTION_RE.captures_iter(content) {
        let attrs = parse_attrs(&caps[1]);
        let value = attr(&attrs, "value")
            .map_or_else(|| decode_entities(caps[2].trim()), ToString::to_string);
        if has_attr(&attrs, "selected") {
            return value;
        }
        first.get_or_insert(value);
    }
    first.unwrap_or_default()
}

/// Decodes the handful of entities servers emit in attribute values.
fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_input() {
        let c = parse_controls(r#"<input type="text" name="title" value="Hello &amp; bye">"#);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].name, "title");
        assert_eq!(c[0].value, "Hello & bye");
        assert_eq!(c[0].input_type, "text");
    }

    #[test]
    fn test_input_defaults_to_text_type() {
        let c = parse_controls("<input name=q value=abc>");
        assert_eq!(c[0].input_type, "text");
        assert_eq!(c[0].value, "abc");
    }

    #[test]
    fn test_unnamed_controls_ignored() {
        let c = parse_controls(r#"<input type="submit" value="Go"><button>Next</button>"#);
        assert!(c.is_empty());
    }

    #[test]
    fn test_checkbox_default_value_and_checked() {
        let c = parse_controls(
            r#"<input type="checkbox" name="a"><input type='checkbox' name='b' value='x' checked>"#,
        );
        assert_eq!(c[0].value, "on");
        assert!(!c[0].checked);
        assert!(c[0].is_checkbox());
        assert_eq!(c[1].value, "x");
        assert!(c[1].checked);
    }

    #[test]
    fn test_skip_serialization_flag() {
        let c = parse_controls(r#"<input type="hidden" name="t" data-skip-serialization="True">"#);
        assert!(c[0].skip_serialization);
    }

    #[test]
    fn test_select_selected_option() {
        let c = parse_controls(
            r#"<select name="country">
                 <option value="ua">Ukraine</option>
                 <option value="pl" selected>Poland</option>
               </select>"#,
        );
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].tag, ControlTag::Select);
        assert_eq!(c[0].value, "pl");
    }

    #[test]
    fn test_select_first_option_and_text_fallback() {
        let c = parse_controls("<select name=s><option> One </option><option>Two</option></select>");
        assert_eq!(c[0].value, "One");
    }

    #[test]
    fn test_textarea_content_not_scanned() {
        let c = parse_controls(
            r#"<textarea name="html"><input name="fake"></textarea><input name="real" value="1">"#,
        );
        let names: Vec<_> = c.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["html", "real"]);
        assert_eq!(c[0].value, r#"<input name="fake">"#);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut c = parse_controls(r#"<input type="checkbox" name="a" value="1" checked>"#)
            .remove(0);
        c.value = "2".into();
        c.checked = false;
        c.reset();
        assert_eq!(c.value, "1");
        assert!(c.checked);
    }

    #[test]
    fn test_document_order() {
        let c = parse_controls(
            r#"<input name="a"><select name="b"><option>x</option></select><button name="c" value="go"></button>"#,
        );
        let names: Vec<_> = c.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(c[2].value, "go");
    }
}
