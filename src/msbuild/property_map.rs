//! Case-insensitive property bag
//!
//! MSBuild treats property names case-insensitively, so `AssemblyName` and
//! `assemblyname` are the same key. The first spelling seen is preserved for display.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: BTreeMap<String, (String, String)>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, keeping the original spelling of an existing key
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.entries
            .entry(name.to_ascii_lowercase())
            .and_modify(|entry| entry.1 = value.clone())
            .or_insert((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove a key and return its value ("get and forget").
    ///
    /// A blank value is undefined to MSBuild, so it comes back as `None`.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.entries
            .remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over (original name, value) pairs, ordered case-insensitively
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let map: PropertyMap = [("AssemblyName", "Contoso.Core")].into_iter().collect();

        assert_eq!(map.get("assemblyname"), Some("Contoso.Core"));
        assert_eq!(map.get("ASSEMBLYNAME"), Some("Contoso.Core"));
        assert!(map.contains_key("AssemblyNAME"));
    }

    #[test]
    fn test_insert_keeps_first_spelling() {
        let mut map = PropertyMap::new();
        map.insert("PackageId", "A");
        map.insert("packageid", "B");

        assert_eq!(map.len(), 1);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("PackageId", "B")]);
    }

    #[test]
    fn test_take_removes_entry() {
        let mut map: PropertyMap = [("Version", "1.2.3"), ("Custom", "x")].into_iter().collect();

        assert_eq!(map.take("VERSION"), Some("1.2.3".to_string()));
        assert_eq!(map.take("Version"), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_take_treats_blank_as_undefined() {
        let mut map: PropertyMap = [("Title", ""), ("Authors", "  ")].into_iter().collect();

        assert_eq!(map.take("Title"), None);
        assert_eq!(map.take("Authors"), None);
        assert!(map.is_empty());
    }
}
