//! Element attributes
//!
//! Insertion-ordered attribute collection with a by-name index.

use std::collections::HashMap;

/// Single attribute
#[derive(Debug, Clone)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Attribute collection
#[derive(Debug, Clone, Default)]
pub struct AttrMap {
    attributes: Vec<Attr>,
    by_name: HashMap<String, usize>,
}

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Get attribute value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .and_then(|&i| self.attributes.get(i))
            .map(|attr| attr.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Set an attribute, overwriting any previous value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.by_name.get(&name) {
            Some(&i) => self.attributes[i].value = value.into(),
            None => {
                self.by_name.insert(name.clone(), self.attributes.len());
                self.attributes.push(Attr::new(name, value));
            }
        }
    }

    /// Remove an attribute by name
    pub fn remove(&mut self, name: &str) -> Option<Attr> {
        let index = self.by_name.remove(name)?;
        let removed = self.attributes.remove(index);
        // Indices past the removal point shifted down by one.
        for (i, attr) in self.attributes.iter().enumerate().skip(index) {
            self.by_name.insert(attr.name.clone(), i);
        }
        Some(removed)
    }

    /// Iterate attributes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attributes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut attrs = AttrMap::new();
        attrs.set("id", "main");
        attrs.set("class", "wide");
        attrs.set("id", "other");

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("id"), Some("other"));
        assert_eq!(attrs.get("class"), Some("wide"));
        assert_eq!(attrs.get("missing"), None);
    }

    #[test]
    fn test_remove_reindexes() {
        let mut attrs = AttrMap::new();
        attrs.set("a", "1");
        attrs.set("b", "2");
        attrs.set("c", "3");

        let removed = attrs.remove("a").unwrap();
        assert_eq!(removed.value, "1");
        assert_eq!(attrs.get("b"), Some("2"));
        assert_eq!(attrs.get("c"), Some("3"));
        assert!(!attrs.contains("a"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut attrs = AttrMap::new();
        attrs.set("b", "2");
        attrs.set("a", "1");

        let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }
}
