//
// index/prefix.rs
//
// Name -> values index with a short-prefix fast path
//

use std::collections::HashMap;

/// Number of leading characters that get a precomputed bucket
pub const MAX_PREFIX_CHARS: usize = 3;

/// Case-insensitive multimap from symbol name to values.
///
/// Every `add` also files the value under the first one, two and three
/// characters of the name, so queries of up to three characters are a single
/// bucket lookup. Longer queries scan the exact-name buckets.
#[derive(Debug, Clone)]
pub struct PrefixIndex<T> {
    exact: HashMap<String, Vec<T>>,
    prefixes: HashMap<String, Vec<T>>,
}

impl<T> Default for PrefixIndex<T> {
    fn default() -> Self {
        Self {
            exact: HashMap::new(),
            prefixes: HashMap::new(),
        }
    }
}

impl<T: Clone> PrefixIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, value: T) {
        let key = name.to_lowercase();
        let ends = key
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .take(MAX_PREFIX_CHARS);
        for end in ends {
            self.prefixes
                .entry(key[..end].to_string())
                .or_default()
                .push(value.clone());
        }
        self.exact.entry(key).or_default().push(value);
    }

    /// Values whose name starts with `query`, ignoring case.
    /// An empty query returns everything.
    pub fn find(&self, query: &str) -> Vec<T> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return self.exact.values().flatten().cloned().collect();
        }
        if query.chars().count() <= MAX_PREFIX_CHARS {
            return self.prefixes.get(&query).cloned().unwrap_or_default();
        }
        self.exact
            .iter()
            .filter(|(key, _)| key.starts_with(&query))
            .flat_map(|(_, values)| values.iter().cloned())
            .collect()
    }

    /// Values stored under exactly `name`, ignoring case
    pub fn get(&self, name: &str) -> &[T] {
        self.exact
            .get(&name.to_lowercase())
            .map_or(&[], |v| v.as_slice())
    }

    pub fn clear(&mut self) {
        self.exact.clear();
        self.prefixes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Number of distinct names
    pub fn len(&self) -> usize {
        self.exact.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn index_of(names: &[&str]) -> PrefixIndex<String> {
        let mut index = PrefixIndex::new();
        for name in names {
            index.add(name, name.to_string());
        }
        index
    }

    fn sorted(values: Vec<String>) -> Vec<String> {
        let mut values = values;
        values.sort();
        values
    }

    #[test]
    fn test_short_query_uses_bucket() {
        let index = index_of(&["TAG_fnc_a", "tag_var", "other", "t"]);
        assert_eq!(sorted(index.find("t")), vec!["TAG_fnc_a", "t", "tag_var"]);
        assert_eq!(sorted(index.find("TA")), vec!["TAG_fnc_a", "tag_var"]);
        assert_eq!(sorted(index.find("tag")), vec!["TAG_fnc_a", "tag_var"]);
    }

    #[test]
    fn test_long_query_scans() {
        let index = index_of(&["TAG_fnc_a", "TAG_fnc_b", "tag_var"]);
        assert_eq!(sorted(index.find("tag_fnc")), vec!["TAG_fnc_a", "TAG_fnc_b"]);
        assert!(index.find("tag_fnc_c").is_empty());
    }

    #[test]
    fn test_name_shorter_than_query() {
        let index = index_of(&["ab"]);
        assert!(index.find("abc").is_empty());
        assert_eq!(index.find("ab"), vec!["ab"]);
    }

    #[test]
    fn test_duplicate_names_keep_all_values() {
        let mut index = PrefixIndex::new();
        index.add("Alpha", 1);
        index.add("alpha", 2);
        assert_eq!(index.get("ALPHA"), &[1, 2]);
        assert_eq!(index.find("al"), vec![1, 2]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_query_returns_all() {
        let index = index_of(&["a", "bb", "ccc", "dddd"]);
        assert_eq!(index.find("").len(), 4);
    }

    #[test]
    fn test_multibyte_names() {
        let index = index_of(&["éclair", "écu"]);
        assert_eq!(sorted(index.find("é")), vec!["éclair", "écu"]);
        assert_eq!(index.find("écl"), vec!["éclair"]);
    }

    #[test]
    fn test_clear() {
        let mut index = index_of(&["alpha"]);
        index.clear();
        assert!(index.is_empty());
        assert!(index.find("a").is_empty());
        assert!(index.find("alph").is_empty());
    }

    // ========================================================================
    // Property tests
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every query agrees with a brute-force scan over the inserted names
        #[test]
        fn prop_find_matches_brute_force(
            names in prop::collection::vec("[a-cA-C_]{0,6}", 0..30),
            query in "[a-cA-C_]{0,5}",
        ) {
            let mut index = PrefixIndex::new();
            for name in &names {
                index.add(name, name.clone());
            }

            let q = query.to_lowercase();
            let expected: Vec<String> = sorted(
                names
                    .iter()
                    .filter(|n| n.to_lowercase().starts_with(&q))
                    .cloned()
                    .collect(),
            );
            prop_assert_eq!(sorted(index.find(&query)), expected);
        }
    }
}
