//! Control serialization.
//!
//! Turns the named controls of a form, in document order, into a
//! [`FormData`] payload:
//!
//! - `name[key][]` accumulates into a dict of lists,
//! - `name[]` accumulates into a list, collapsed to a scalar when it holds one
//!   item,
//! - a checkbox without `[]` yields its checked state,
//! - anything else yields its value, the last control winning.
//!
//! Unchecked checkboxes inside lists and unchecked radios contribute nothing.
//! This departs from a plain walk over every named element, which would also
//! send their values.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use stepform_core::{FieldValue, FormData};

use crate::markup::{Control, ControlTag};

static DICT_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[]+)\[([^\[\]]+)\]\[\]$").expect("valid dict-list regex"));

/// Serializes `controls`, skipping controls marked `data-skip-serialization`
/// and controls whose tag is in `skip_tags`.
///
/// # Examples
///
/// ```
/// use stepform_core::FieldValue;
/// use stepform_forms::markup::parse_controls;
/// use stepform_forms::serialize::serialize;
///
/// let controls = parse_controls(
///     r#"<input name="x[]" value="a"><input name="x[]" value="b"><input type="checkbox" name="flag" value="yes">"#,
/// );
/// let data = serialize(&controls, &[]);
/// assert_eq!(data["x"], FieldValue::List(vec!["a".into(), "b".into()]));
/// assert_eq!(data["flag"], FieldValue::Bool(false));
/// ```
pub fn serialize<'a, I>(controls: I, skip_tags: &[ControlTag]) -> FormData
where
    I: IntoIterator<Item = &'a Control>,
{
    let mut data = FormData::new();

    for control in controls {
        if control.skip_serialization || skip_tags.contains(&control.tag) {
            continue;
        }
        let toggles = control.is_checkbox() || control.is_radio();

        if let Some(caps) = DICT_LIST_RE.captures(&control.name) {
            if toggles && !control.checked {
                continue;
            }
            let (name, key) = (caps[1].to_string(), caps[2].to_string());
            let entry = data
                .entry(name)
                .or_insert_with(|| FieldValue::Dict(BTreeMap::new()));
            if !matches!(entry, FieldValue::Dict(_)) {
                *entry = FieldValue::Dict(BTreeMap::new());
            }
            if let FieldValue::Dict(dict) = entry {
                dict.entry(key).or_default().push(control.value.clone());
            }
        } else if let Some(name) = control.name.strip_suffix("[]") {
            if toggles && !control.checked {
                continue;
            }
            let entry = data
                .entry(name.to_string())
                .or_insert_with(|| FieldValue::List(Vec::new()));
            if !matches!(entry, FieldValue::List(_)) {
                *entry = FieldValue::List(Vec::new());
            }
            if let FieldValue::List(items) = entry {
                items.push(control.value.clone());
            }
        } else if control.is_checkbox() {
            data.insert(control.name.clone(), FieldValue::Bool(control.checked));
        } else if control.is_radio() {
            if control.checked {
                data.insert(control.name.clone(), FieldValue::Text(control.value.clone()));
            }
        } else {
            data.insert(control.name.clone(), FieldValue::Text(control.value.clone()));
        }
    }

    data.into_iter().map(|(k, v)| (k, v.collapse())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse_controls;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn list(items: &[&str]) -> FieldValue {
        FieldValue::List(items.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_list_and_collapse() {
        let c = parse_controls(r#"<input name="x[]" value="a"><input name="x[]" value="b">"#);
        assert_eq!(serialize(&c, &[])["x"], list(&["a", "b"]));

        let c = parse_controls(r#"<input name="x[]" value="a">"#);
        assert_eq!(serialize(&c, &[])["x"], text("a"));
    }

    #[test]
    fn test_dict_of_lists() {
        let c = parse_controls(
            r#"<input name="x[k1][]" value="a"><input name="x[k1][]" value="b"><input name="x[k2][]" value="c">"#,
        );
        let data = serialize(&c, &[]);
        let FieldValue::Dict(dict) = &data["x"] else {
            panic!("expected dict");
        };
        assert_eq!(dict["k1"], vec!["a", "b"]);
        assert_eq!(dict["k2"], vec!["c"]);
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn test_checkbox_yields_checked_state() {
        let c = parse_controls(
            r#"<input type="checkbox" name="flag" value="yes" checked><input type="checkbox" name="off" value="yes">"#,
        );
        let data = serialize(&c, &[]);
        assert_eq!(data["flag"], FieldValue::Bool(true));
        assert_eq!(data["off"], FieldValue::Bool(false));
    }

    #[test]
    fn test_checkbox_list_only_checked() {
        let c = parse_controls(
            r#"<input type="checkbox" name="tags[]" value="a" checked>
               <input type="checkbox" name="tags[]" value="b">
               <input type="checkbox" name="tags[]" value="c" checked>"#,
        );
        assert_eq!(serialize(&c, &[])["tags"], list(&["a", "c"]));
    }

    #[test]
    fn test_radio_group() {
        let c = parse_controls(
            r#"<input type="radio" name="size" value="s"><input type="radio" name="size" value="m" checked><input type="radio" name="size" value="l">"#,
        );
        assert_eq!(serialize(&c, &[])["size"], text("m"));
    }

    #[test]
    fn test_scalar_last_wins() {
        let c = parse_controls(r#"<input name="a" value="1"><input name="a" value="2">"#);
        assert_eq!(serialize(&c, &[])["a"], text("2"));
    }

    #[test]
    fn test_skip_marked_and_tags() {
        let c = parse_controls(
            r#"<input name="token" value="t" data-skip-serialization="True"><textarea name="body">long</textarea><input name="title" value="x">"#,
        );
        let data = serialize(&c, &[ControlTag::Textarea]);
        assert_eq!(data.len(), 1);
        assert_eq!(data["title"], text("x"));
    }

    #[test]
    fn test_idempotent() {
        let c = parse_controls(r#"<input name="x[]" value="a"><input name="y" value="b">"#);
        assert_eq!(serialize(&c, &[]), serialize(&c, &[]));
    }
}
