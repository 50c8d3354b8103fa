//! Insertion-ordered string-to-string configuration map
//!
//! Writer configuration is a small map populated from three places: built-in
//! defaults, global scripted config, and per-writer overrides. Iteration
//! order matters when writers apply per-filter options, so entries keep the
//! order they were first inserted in. Replacing a value keeps its position.

/// Insertion-ordered `String -> String` map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMap {
    entries: Vec<(String, String)>,
}

impl ConfigMap {
    /// Create an empty map
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert a key/value pair
    ///
    /// An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert every entry of `parent` whose key this map does not set
    ///
    /// This is the defaults-composition step: the child (leaf) map wins on
    /// collision, the parent fills in the rest.
    pub fn merge_defaults(&mut self, parent: &ConfigMap) {
        for (key, value) in parent.iter() {
            if !self.contains(key) {
                self.entries.push((key.to_string(), value.to_string()));
            }
        }
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for ConfigMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut map = Self::new();
        for (k, v) in pairs {
            map.insert(k, v);
        }
        map
    }
}

impl FromIterator<(String, String)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
#[path = "config_map_test.rs"]
mod config_map_test;
