//! An insertion-ordered multi-map.
//!
//! [`MultiValueDict`] holds the raw pairs of a query string, where one key may
//! appear several times. Keys keep the order in which they were first seen,
//! so a query re-encoded from its pairs reads the way it was written.

use std::borrow::Borrow;
use std::slice;
use std::vec;

/// Maps keys to the list of values given for them.
///
/// [`get`](MultiValueDict::get) returns the **last** value for a key, like a
/// query string where a repeated key overrides earlier ones, while
/// [`get_list`](MultiValueDict::get_list) returns every value.
///
/// # Examples
///
/// ```
/// use stepform_core::utils::MultiValueDict;
///
/// let mut pairs: MultiValueDict<String, String> = MultiValueDict::new();
/// pairs.append("step".into(), "1".into());
/// pairs.append("tags[]".into(), "a".into());
/// pairs.append("step".into(), "2".into());
///
/// assert_eq!(pairs.get("step").map(String::as_str), Some("2"));
/// assert_eq!(pairs.keys().collect::<Vec<_>>(), ["step", "tags[]"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiValueDict<K, V> {
    entries: Vec<(K, Vec<V>)>,
}

impl<K, V> Default for MultiValueDict<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MultiValueDict<K, V> {
    /// Creates an empty dict.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterates over `(key, values)` in first-seen order.
    pub fn iter(&self) -> slice::Iter<'_, (K, Vec<V>)> {
        self.entries.iter()
    }
}

impl<K: Eq, V> MultiValueDict<K, V> {
    fn position<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries.iter().position(|(k, _)| k.borrow() == key)
    }

    /// Returns the last value given for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.get_list(key).and_then(|values| values.last())
    }

    /// Returns every value given for `key`, oldest first.
    pub fn get_list<Q>(&self, key: &Q) -> Option<&Vec<V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.position(key).map(|i| &self.entries[i].1)
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.position(key).is_some()
    }

    /// Adds a value for `key`. A new key goes last.
    pub fn append(&mut self, key: K, value: V) {
        match self.position(&key) {
            Some(i) => self.entries[i].1.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Replaces the values of `key` with `value`, keeping its position.
    pub fn set(&mut self, key: K, value: V) {
        match self.position(&key) {
            Some(i) => self.entries[i].1 = vec![value],
            None => self.entries.push((key, vec![value])),
        }
    }

    /// Removes `key` and returns its values.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Vec<V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.position(key).map(|i| self.entries.remove(i).1)
    }
}

impl<K, V> IntoIterator for MultiValueDict<K, V> {
    type Item = (K, Vec<V>);
    type IntoIter = vec::IntoIter<(K, Vec<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a MultiValueDict<K, V> {
    type Item = &'a (K, Vec<V>);
    type IntoIter = slice::Iter<'a, (K, Vec<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_key_keeps_all_values() {
        let mut d = MultiValueDict::new();
        d.append("tag", "a");
        d.append("tag", "b");
        assert_eq!(d.get(&"tag"), Some(&"b"));
        assert_eq!(d.get_list(&"tag"), Some(&vec!["a", "b"]));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_first_seen_order() {
        let mut d = MultiValueDict::new();
        d.append("z", 1);
        d.append("a", 2);
        d.append("z", 3);
        d.set("a", 4);
        assert_eq!(d.keys().copied().collect::<Vec<_>>(), ["z", "a"]);
        assert_eq!(d.get_list(&"a"), Some(&vec![4]));
    }

    #[test]
    fn test_borrowed_lookup_and_remove() {
        let mut d: MultiValueDict<String, u8> = MultiValueDict::new();
        d.append("k".to_string(), 1);
        assert!(d.contains_key("k"));
        assert_eq!(d.remove("k"), Some(vec![1]));
        assert!(d.is_empty());
        assert_eq!(d.get("k"), None);
    }
}
