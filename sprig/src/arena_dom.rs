//! Arena-based document tree.
//!
//! Every node of a [`Document`] lives in one `indextree` arena. Children are
//! owned by the arena's child lists; the parent link is a plain [`NodeId`]
//! index, so it never keeps anything alive and is cleared when a node is
//! detached. The synthetic root is a [`NodeKind::Document`] node that has no
//! parent and is never matched by selectors.

use compact_str::CompactString;
use facet::Facet;
use indexmap::IndexMap;
use indextree::Arena;
use std::fmt;
use std::str::FromStr;

pub use indextree::NodeId;

use crate::Error;

/// A parsed (or constructed) document: the arena plus its synthetic root.
#[derive(Debug, Clone)]
pub struct Document {
    /// THE tree - all nodes live here, attached or not
    pub(crate) arena: Arena<NodeData>,

    /// Synthetic root, parent of the top-level nodes
    pub(crate) root: NodeId,
}

/// What goes in each arena slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub kind: NodeKind,
}

/// Node payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic document root (invisible, parent of the top-level nodes)
    Document,
    /// Element with tag and attributes
    Element(ElementData),
    /// Character data, entities already decoded
    Text(String),
    /// `<!--...-->` body
    Comment(String),
    /// `<![CDATA[...]]>` body
    CData(String),
    /// `<!DOCTYPE ...>` body
    Doctype(String),
    /// `<?...?>` body, e.g. the XML declaration
    ProcessingInstruction(String),
}

impl NodeKind {
    /// The kind tag of this payload.
    pub fn kind(&self) -> Kind {
        match self {
            NodeKind::Document => Kind::Document,
            NodeKind::Element(_) => Kind::Element,
            NodeKind::Text(_) => Kind::Text,
            NodeKind::Comment(_) => Kind::Comment,
            NodeKind::CData(_) => Kind::CData,
            NodeKind::Doctype(_) => Kind::Doctype,
            NodeKind::ProcessingInstruction(_) => Kind::ProcessingInstruction,
        }
    }
}

/// Element data (tag + attributes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: CompactString,
    pub attrs: Attributes,
    /// The element was written `<tag/>` (or was an implicitly closed void
    /// element). Only affects serialization of elements without children.
    pub self_closing: bool,
}

impl ElementData {
    pub fn new(tag: impl Into<CompactString>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Attributes::new(),
            self_closing: false,
        }
    }
}

/// Plain kind tag of a node, used for dispatch and in the JSON format.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    Document,
    Element,
    Text,
    Comment,
    CData,
    Doctype,
    ProcessingInstruction,
}

impl Kind {
    pub const COUNT: usize = 7;

    pub const ALL: [Kind; Kind::COUNT] = [
        Kind::Document,
        Kind::Element,
        Kind::Text,
        Kind::Comment,
        Kind::CData,
        Kind::Doctype,
        Kind::ProcessingInstruction,
    ];

    /// Handler name used by the walker: `node`, `text`, `comment`, `cdata`,
    /// `doctype`, `pi` (and `document` for the root).
    pub fn name(self) -> &'static str {
        match self {
            Kind::Document => "document",
            Kind::Element => "node",
            Kind::Text => "text",
            Kind::Comment => "comment",
            Kind::CData => "cdata",
            Kind::Doctype => "doctype",
            Kind::ProcessingInstruction => "pi",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnknownKind {
                name: s.to_string(),
            })
    }
}

/// A single attribute as produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: CompactString,
    /// Empty for bare attributes (`<input disabled>`)
    pub value: String,
}

/// An ordered collection of attributes with unique names.
///
/// Setting an existing name replaces its value in place (last assignment
/// wins, first position kept).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: IndexMap<CompactString, String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<CompactString>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    /// Remove an attribute, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate over all attributes in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<CompactString>, V: Into<String>> FromIterator<(N, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (name, value) in iter {
            attrs.set(name, value);
        }
        attrs
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: just the synthetic root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeData {
            kind: NodeKind::Document,
        });
        Self { arena, root }
    }

    /// The synthetic root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get immutable reference to node data
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Get mutable reference to node data
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    pub fn kind(&self, id: NodeId) -> Kind {
        self.get(id).kind.kind()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.get(id).kind, NodeKind::Element(_))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.get_mut(id).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    /// Tag name of an element, `None` for every other kind.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|elem| elem.tag.as_str())
    }

    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        self.element(id).map(|elem| &elem.attrs)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)?.get(name)
    }

    /// Set an attribute on an element. Returns `false` if `id` is not an element.
    pub fn set_attr(
        &mut self,
        id: NodeId,
        name: impl Into<CompactString>,
        value: impl Into<String>,
    ) -> bool {
        match self.element_mut(id) {
            Some(elem) => {
                elem.attrs.set(name, value);
                true
            }
            None => false,
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.attrs.remove(name)
    }

    /// String payload of a text, comment, CDATA, doctype or PI node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id).kind {
            NodeKind::Text(s)
            | NodeKind::Comment(s)
            | NodeKind::CData(s)
            | NodeKind::Doctype(s)
            | NodeKind::ProcessingInstruction(s) => Some(s),
            NodeKind::Document | NodeKind::Element(_) => None,
        }
    }

    /// Replace the payload of a text-like node. Returns `false` for elements
    /// and the root.
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) -> bool {
        match &mut self.get_mut(id).kind {
            NodeKind::Text(s)
            | NodeKind::Comment(s)
            | NodeKind::CData(s)
            | NodeKind::Doctype(s)
            | NodeKind::ProcessingInstruction(s) => {
                *s = value.into();
                true
            }
            NodeKind::Document | NodeKind::Element(_) => false,
        }
    }

    /// Parent of a node; `None` for the root and for detached nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Iterate children of a node
    pub fn children(&self, id: NodeId) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// `id` followed by all its descendants, in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Whether `id` is currently reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        !id.is_removed(&self.arena) && id.ancestors(&self.arena).any(|a| a == self.root)
    }

    pub(crate) fn new_node(&mut self, kind: NodeKind) -> NodeId {
        self.arena.new_node(NodeData { kind })
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: impl Into<CompactString>) -> NodeId {
        self.new_node(NodeKind::Element(ElementData::new(tag)))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.new_node(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.new_node(NodeKind::Comment(text.into()))
    }

    pub fn create_cdata(&mut self, text: impl Into<String>) -> NodeId {
        self.new_node(NodeKind::CData(text.into()))
    }

    pub fn create_doctype(&mut self, text: impl Into<String>) -> NodeId {
        self.new_node(NodeKind::Doctype(text.into()))
    }

    pub fn create_processing_instruction(&mut self, text: impl Into<String>) -> NodeId {
        self.new_node(NodeKind::ProcessingInstruction(text.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_new_document_has_lone_root() {
        let doc = Document::new();
        assert_eq!(doc.kind(doc.root()), Kind::Document);
        assert_eq!(doc.parent(doc.root()), None);
        assert_eq!(doc.child_count(doc.root()), 0);
        assert_eq!(doc.tag(doc.root()), None);
    }

    #[test]
    fn test_attributes_last_assignment_wins() {
        let mut attrs = Attributes::new();
        attrs.set("a", "1");
        attrs.set("b", "2");
        attrs.set("a", "3");
        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_attributes_remove_keeps_order() {
        let mut attrs: Attributes = [("x", "1"), ("y", "2"), ("z", "3")].into_iter().collect();
        assert_eq!(attrs.remove("y"), Some("2".to_string()));
        let names: Vec<_> = attrs.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x", "z"]);
        assert!(!attrs.contains("y"));
    }

    #[test]
    fn test_element_accessors() {
        let mut doc = Document::new();
        let hero = doc.create_element("hero");
        assert!(doc.set_attr(hero, "name", "Zabu"));
        assert_eq!(doc.tag(hero), Some("hero"));
        assert_eq!(doc.attr(hero, "name"), Some("Zabu"));
        assert_eq!(doc.remove_attr(hero, "name"), Some("Zabu".to_string()));
        assert_eq!(doc.attr(hero, "name"), None);
        assert!(!doc.is_attached(hero));

        let text = doc.create_text("hi");
        assert!(!doc.set_attr(text, "name", "x"));
        assert_eq!(doc.text(text), Some("hi"));
        assert!(doc.set_text(text, "bye"));
        assert_eq!(doc.text(text), Some("bye"));
        assert!(!doc.set_text(hero, "nope"));
    }

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in Kind::ALL {
            assert_eq!(kind.name().parse::<Kind>(), Ok(kind));
        }
        assert!(matches!(
            "widget".parse::<Kind>(),
            Err(Error::UnknownKind { name }) if name == "widget"
        ));
    }
}
