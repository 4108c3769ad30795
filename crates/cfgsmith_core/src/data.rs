//! Ordered key-value data shared by manifests, profiles and token tables.

use serde::{Serialize, Serializer};

/// An insertion-ordered string map.
///
/// Re-inserting an existing key replaces its value but keeps its position,
/// which is what makes profile overrides order-preserving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataMap {
    entries: Vec<(String, String)>,
}

impl DataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite in place. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Coalesce `overrides` on top of `self`.
    ///
    /// Keys already present keep their position and take the override's
    /// value; new keys are appended in the override's order.
    pub fn merged(&self, overrides: &DataMap) -> DataMap {
        let mut merged = self.clone();
        for (k, v) in overrides.iter() {
            merged.insert(k, v);
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = DataMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for DataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut map = DataMap::new();
        map.insert("a", "1");
        map.insert("b", "2");
        assert_eq!(map.insert("a", "3"), Some("1".to_string()));

        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_merge_overrides_in_place_and_appends() {
        let defaults: DataMap = [("PORT", "8080"), ("HOST", "localhost"), ("DEBUG", "1")]
            .into_iter()
            .collect();
        let profile: DataMap = [("NEW", "x"), ("HOST", "example.com")].into_iter().collect();

        let merged = defaults.merged(&profile);
        let pairs: Vec<_> = merged.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("PORT", "8080"),
                ("HOST", "example.com"),
                ("DEBUG", "1"),
                ("NEW", "x"),
            ]
        );
    }

    #[test]
    fn test_serializes_as_ordered_map() {
        let map: DataMap = [("b", "1"), ("a", "2")].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"b":"1","a":"2"}"#);
    }

    fn small_map() -> impl Strategy<Value = DataMap> {
        prop::collection::vec(("[a-e]", "[a-z0-9]{0,4}"), 0..8)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    proptest! {
        #[test]
        fn prop_merge_order(defaults in small_map(), profile in small_map()) {
            let merged = defaults.merged(&profile);

            // default keys first, in their order, then profile-only keys in theirs
            let mut expected: Vec<&str> = defaults.keys().collect();
            expected.extend(profile.keys().filter(|k| !defaults.contains_key(k)));
            prop_assert_eq!(merged.keys().collect::<Vec<_>>(), expected);

            for (k, v) in merged.iter() {
                let want = profile.get(k).or_else(|| defaults.get(k));
                prop_assert_eq!(Some(v), want);
            }
        }
    }
}
