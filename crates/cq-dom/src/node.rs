//! Node representation
//!
//! Compact link layout: parent/sibling/child links are `NodeId`s into the
//! owning arena rather than pointers.

use crate::NodeId;
use crate::attributes::AttrMap;

/// A single tree node
#[derive(Debug)]
pub struct Node {
    /// Parent node (NONE if detached or root)
    pub parent: NodeId,
    /// First child
    pub first_child: NodeId,
    /// Last child (for O(1) append)
    pub last_child: NodeId,
    /// Previous sibling
    pub prev_sibling: NodeId,
    /// Next sibling
    pub next_sibling: NodeId,
    /// Node-specific data
    pub data: NodeData,
    /// Last measured content width, 0 until the host layout reports one
    pub content_width: u32,
}

impl Node {
    /// Create a new element node
    pub fn element(tag: impl Into<String>) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(tag)))
    }

    /// Create a new text node
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_data(NodeData::Text(TextData {
            content: content.into(),
        }))
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    fn with_data(data: NodeData) -> Self {
        Self {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
            content_width: 0,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(&t.content),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Document root
    Document,
    /// Element
    Element(ElementData),
    /// Text content
    Text(TextData),
}

/// Element data: tag name plus attributes
#[derive(Debug)]
pub struct ElementData {
    pub tag: String,
    pub attributes: AttrMap,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: AttrMap::new(),
        }
    }
}

/// Text node data
#[derive(Debug)]
pub struct TextData {
    pub content: String,
}
