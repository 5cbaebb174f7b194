//! Query string codec.
//!
//! [`QueryDict`] wraps [`MultiValueDict`] to hold the raw `key=value` pairs of
//! a query string. [`parse_query`] and [`encode_query`] translate between a
//! query string and a [`QueryMap`], applying the `[]` multi-value convention:
//! keys carrying `[]` accumulate into lists, and single-element lists
//! collapse to their scalar.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

use stepform_core::utils::MultiValueDict;
use stepform_core::FieldValue;

/// A decoded query: parameter name to value.
pub type QueryMap = BTreeMap<String, FieldValue>;

/// Characters escaped by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// The raw multi-valued pairs of a query string.
///
/// # Examples
///
/// ```
/// use stepform_http::QueryDict;
///
/// let qd = QueryDict::parse("color=red&color=blue&size=large");
/// assert_eq!(qd.get("color"), Some("blue"));
/// assert_eq!(qd.get_list("color"), Some(&vec!["red".to_string(), "blue".to_string()]));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: MultiValueDict<String, String>,
}

impl QueryDict {
    /// Creates a new, empty `QueryDict`.
    pub const fn new() -> Self {
        Self {
            data: MultiValueDict::new(),
        }
    }

    /// Parses a URL query string (without the leading `?`).
    ///
    /// Handles percent-encoding and `+` as space. A key without `=` is kept
    /// with an empty value.
    pub fn parse(query_string: &str) -> Self {
        let mut data = MultiValueDict::new();

        for pair in query_string.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair
                .find('=')
                .map_or((pair, ""), |eq_pos| (&pair[..eq_pos], &pair[eq_pos + 1..]));

            let decoded_key = percent_decode(key);
            if decoded_key.is_empty() {
                continue;
            }
            data.append(decoded_key, percent_decode(value));
        }

        Self { data }
    }

    /// Returns the last value for the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Returns all values for the given key.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.data.get_list(key)
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: &str, value: &str) {
        self.data.append(key.to_string(), value.to_string());
    }

    /// Encodes the raw pairs as a query string, keys in first-seen order.
    pub fn urlencode(&self) -> String {
        let mut parts = Vec::new();
        for (key, values) in &self.data {
            for value in values {
                parts.push(format!("{}={}", percent_encode(key), percent_encode(value)));
            }
        }
        parts.join("&")
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the `QueryDict` contains no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a reference to the underlying `MultiValueDict`.
    pub const fn data(&self) -> &MultiValueDict<String, String> {
        &self.data
    }

    /// Folds the raw pairs into a [`QueryMap`].
    ///
    /// A key containing `[]` has its first `[]` removed and all of its values
    /// collected into a list; any other key keeps its last value. Lists of one
    /// element collapse to a scalar. With `skip_empty`, empty values are
    /// dropped.
    pub fn to_map(&self, skip_empty: bool) -> QueryMap {
        let mut map = QueryMap::new();

        for (key, values) in &self.data {
            if key.find("[]").is_some_and(|pos| pos > 0) {
                let name = key.replacen("[]", "", 1);
                match map.get_mut(&name) {
                    Some(FieldValue::List(items)) => items.extend(values.iter().cloned()),
                    _ => {
                        map.insert(name, FieldValue::List(values.clone()));
                    }
                }
            } else if let Some(last) = values.last() {
                map.insert(key.clone(), FieldValue::Text(last.clone()));
            }
        }

        map.into_iter()
            .map(|(k, v)| (k, v.collapse()))
            .filter(|(_, v)| !(skip_empty && v.is_empty()))
            .collect()
    }
}

/// Parses a query string into a [`QueryMap`].
///
/// # Examples
///
/// ```
/// use stepform_core::FieldValue;
/// use stepform_http::parse_query;
///
/// let q = parse_query("step=2&tags[]=a&tags[]=b&one[]=x&empty=", true);
/// assert_eq!(q["step"], FieldValue::Text("2".into()));
/// assert_eq!(q["tags"], FieldValue::List(vec!["a".into(), "b".into()]));
/// assert_eq!(q["one"], FieldValue::Text("x".into()));
/// assert!(!q.contains_key("empty"));
/// ```
pub fn parse_query(query_string: &str, skip_empty: bool) -> QueryMap {
    QueryDict::parse(query_string).to_map(skip_empty)
}

/// Encodes a [`QueryMap`] as a query string.
///
/// Lists are written as repeated `key[]=value` pairs and dicts of lists as
/// `key[sub][]=value`, so that [`parse_query`] reads lists back.
pub fn encode_query(map: &QueryMap) -> String {
    let mut parts = Vec::new();

    for (key, value) in map {
        let k = percent_encode(key);
        match value {
            FieldValue::Bool(b) => parts.push(format!("{k}={b}")),
            FieldValue::Text(s) => parts.push(format!("{k}={}", percent_encode(s))),
            FieldValue::List(items) => {
                parts.extend(items.iter().map(|v| format!("{k}[]={}", percent_encode(v))));
            }
            FieldValue::Dict(dict) => {
                for (sub, items) in dict {
                    let sub = percent_encode(sub);
                    parts.extend(
                        items
                            .iter()
                            .map(|v| format!("{k}[{sub}][]={}", percent_encode(v))),
                    );
                }
            }
        }
    }

    parts.join("&")
}

/// Decodes a percent-encoded string.
fn percent_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Percent-encodes a string the way `encodeURIComponent` does.
fn percent_encode(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn list(items: &[&str]) -> FieldValue {
        FieldValue::List(items.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_parse_simple() {
        let qd = QueryDict::parse("name=alice&age=30");
        assert_eq!(qd.get("name"), Some("alice"));
        assert_eq!(qd.get("age"), Some("30"));
        assert_eq!(qd.len(), 2);
    }

    #[test]
    fn test_parse_leading_question_mark() {
        let qd = QueryDict::parse("?a=1");
        assert_eq!(qd.get("a"), Some("1"));
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(QueryDict::parse("").is_empty());
    }

    #[test]
    fn test_parse_no_value() {
        let qd = QueryDict::parse("flag");
        assert_eq!(qd.get("flag"), Some(""));
    }

    #[test]
    fn test_parse_percent_encoded_and_plus() {
        let qd = QueryDict::parse("q=hello+world&city=Kyiv%20Oblast");
        assert_eq!(qd.get("q"), Some("hello world"));
        assert_eq!(qd.get("city"), Some("Kyiv Oblast"));
    }

    #[test]
    fn test_parse_skips_empty_pairs() {
        let qd = QueryDict::parse("a=1&&b=2&");
        assert_eq!(qd.len(), 2);
    }

    #[test]
    fn test_to_map_scalar_last_wins() {
        let q = parse_query("a=1&a=2", false);
        assert_eq!(q["a"], text("2"));
    }

    #[test]
    fn test_to_map_lists_and_collapse() {
        let q = parse_query("x[]=a&x[]=b&y[]=only", false);
        assert_eq!(q["x"], list(&["a", "b"]));
        assert_eq!(q["y"], text("only"));
    }

    #[test]
    fn test_to_map_skip_empty() {
        let q = parse_query("a=&b=1&c", true);
        assert_eq!(q.len(), 1);
        assert_eq!(q["b"], text("1"));

        let q = parse_query("a=&b=1&c", false);
        assert_eq!(q.len(), 3);
        assert_eq!(q["c"], text(""));
    }

    #[test]
    fn test_encode_scalars_and_lists() {
        let mut map = QueryMap::new();
        map.insert("step".into(), text("2"));
        map.insert("tags".into(), list(&["a b", "c&d"]));
        map.insert("agree".into(), FieldValue::Bool(true));
        assert_eq!(
            encode_query(&map),
            "agree=true&step=2&tags[]=a%20b&tags[]=c%26d"
        );
    }

    #[test]
    fn test_encode_dict() {
        let mut dict = BTreeMap::new();
        dict.insert("k1".to_string(), vec!["a".to_string(), "b".to_string()]);
        let mut map = QueryMap::new();
        map.insert("opts".into(), FieldValue::Dict(dict));
        assert_eq!(encode_query(&map), "opts[k1][]=a&opts[k1][]=b");
    }

    #[test]
    fn test_roundtrip() {
        let mut map = QueryMap::new();
        map.insert("name".into(), text("Alice Smith"));
        map.insert("colors".into(), list(&["red", "green", "blue"]));
        map.insert("page".into(), text("3"));
        assert_eq!(parse_query(&encode_query(&map), false), map);
    }

    #[test]
    fn test_urlencode_raw_pairs() {
        let mut qd = QueryDict::new();
        qd.append("b", "2");
        qd.append("a", "x y");
        qd.append("b", "3");
        assert_eq!(qd.urlencode(), "b=2&b=3&a=x%20y");
    }
}
