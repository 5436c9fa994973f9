//! Simple selector matching
//!
//! Tag, class, id, universal, and attribute-presence selectors. No
//! combinators.

use crate::{Document, NodeId};

/// Simple selector for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Tag(String),
    Class(String),
    Id(String),
    HasAttr(String),
}

impl SimpleSelector {
    /// Parse a simple selector string
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if s == "*" {
            Some(Self::Universal)
        } else if let Some(id) = s.strip_prefix('#') {
            Some(Self::Id(id.to_string()))
        } else if let Some(class) = s.strip_prefix('.') {
            Some(Self::Class(class.to_string()))
        } else if let Some(rest) = s.strip_prefix('[') {
            let attr = rest.strip_suffix(']')?;
            if attr.is_empty() {
                None
            } else {
                Some(Self::HasAttr(attr.trim().to_string()))
            }
        } else {
            Some(Self::Tag(s.to_string()))
        }
    }
}

impl Document {
    /// Check if an element matches a simple selector
    pub fn matches(&self, id: NodeId, selector: &SimpleSelector) -> bool {
        if !self.is_element(id) {
            return false;
        }
        match selector {
            SimpleSelector::Universal => true,
            SimpleSelector::Tag(tag) => self.tag(id) == Some(tag.as_str()),
            SimpleSelector::Id(wanted) => self.attribute(id, "id") == Some(wanted.as_str()),
            SimpleSelector::Class(wanted) => self
                .attribute(id, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == wanted)),
            SimpleSelector::HasAttr(name) => self.has_attribute(id, name),
        }
    }

    /// All elements under `root` matching a selector string, in document
    /// order; an unparseable selector matches nothing
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(parsed) = SimpleSelector::parse(selector) else {
            tracing::debug!("unparseable selector: {selector:?}");
            return Vec::new();
        };
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.matches(id, &parsed))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let container = doc.create_element("div");
        let card = doc.create_element("section");
        let plain = doc.create_element("span");
        doc.append_child(doc.root(), container).unwrap();
        doc.append_child(container, card).unwrap();
        doc.append_child(container, plain).unwrap();
        doc.set_attribute(card, "class", "card featured").unwrap();
        doc.set_attribute(card, "data-container-queries", "wide: >=500")
            .unwrap();
        (doc, container, card, plain)
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(SimpleSelector::parse("*"), Some(SimpleSelector::Universal));
        assert_eq!(
            SimpleSelector::parse("div"),
            Some(SimpleSelector::Tag("div".into()))
        );
        assert_eq!(
            SimpleSelector::parse(".card"),
            Some(SimpleSelector::Class("card".into()))
        );
        assert_eq!(
            SimpleSelector::parse("#main"),
            Some(SimpleSelector::Id("main".into()))
        );
        assert_eq!(
            SimpleSelector::parse("[data-container-queries]"),
            Some(SimpleSelector::HasAttr("data-container-queries".into()))
        );
        assert_eq!(SimpleSelector::parse(""), None);
        assert_eq!(SimpleSelector::parse("[unclosed"), None);
    }

    #[test]
    fn test_query_selector_all() {
        let (doc, container, card, plain) = sample();

        assert_eq!(doc.query_selector_all(doc.root(), ".card"), vec![card]);
        assert_eq!(
            doc.query_selector_all(doc.root(), "[data-container-queries]"),
            vec![card]
        );
        assert_eq!(
            doc.query_selector_all(doc.root(), "*"),
            vec![container, card, plain]
        );
        assert!(doc.query_selector_all(card, "section").is_empty());
    }

    #[test]
    fn test_text_nodes_never_match() {
        let mut doc = Document::new();
        let text = doc.create_text("hello");
        doc.append_child(doc.root(), text).unwrap();
        assert!(doc.query_selector_all(doc.root(), "*").is_empty());
    }
}
