//! JSON form of a document.
//!
//! [`JsonNode`] mirrors one node: its [`Kind`], tag, text payload,
//! attributes (in order), self-closing flag and children. A document is
//! written as its `Document`-kind root:
//!
//! ```json
//! {"kind":"Document","children":[
//!   {"kind":"Element","tag":"hero","attributes":{"name":"Zabu"},"self_closing":true}
//! ]}
//! ```
//!
//! Markup written from a tree and from that tree's JSON round-trip is
//! identical.

use facet::Facet;
use indexmap::IndexMap;

use crate::arena_dom::{Attributes, Document, ElementData, Kind, NodeId, NodeKind};
use crate::tracing_macros::debug;
use crate::{Error, Result};

/// One node and its subtree.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct JsonNode {
    pub kind: Kind,

    /// Element tag, `None` for every other kind
    #[facet(default)]
    pub tag: Option<String>,

    /// Payload of text, comment, CDATA, doctype and PI nodes
    #[facet(default)]
    pub content: Option<String>,

    #[facet(default)]
    pub attributes: IndexMap<String, String>,

    #[facet(default)]
    pub self_closing: bool,

    #[facet(default)]
    #[facet(recursive_type)]
    pub children: Vec<JsonNode>,
}

impl JsonNode {
    fn leaf(kind: Kind, content: Option<String>) -> Self {
        Self {
            kind,
            tag: None,
            content,
            attributes: IndexMap::new(),
            self_closing: false,
            children: Vec::new(),
        }
    }
}

fn json_error(message: impl Into<String>) -> Error {
    Error::Json {
        message: message.into(),
    }
}

impl Document {
    /// The JSON mirror of node `id` and its subtree.
    pub fn to_json_node(&self, id: NodeId) -> JsonNode {
        let mut node = self.json_shell(id);
        let mut children = self.children(id);
        let mut stack = Vec::new();
        loop {
            if let Some(child) = children.next() {
                stack.push((node, children));
                node = self.json_shell(child);
                children = self.children(child);
                continue;
            }
            match stack.pop() {
                Some((mut parent, rest)) => {
                    parent.children.push(node);
                    node = parent;
                    children = rest;
                }
                None => return node,
            }
        }
    }

    /// `id` without its children.
    fn json_shell(&self, id: NodeId) -> JsonNode {
        let data = &self.get(id).kind;
        let mut node = JsonNode::leaf(data.kind(), self.text(id).map(str::to_string));
        if let NodeKind::Element(elem) = data {
            node.tag = Some(elem.tag.to_string());
            node.attributes = elem
                .attrs
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            node.self_closing = elem.self_closing;
        }
        node
    }

    /// Serialize the whole document to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        facet_json::to_string(&self.to_json_node(self.root)).map_err(|e| json_error(e.to_string()))
    }

    /// Build a document from its JSON mirror. A non-`Document` node becomes
    /// the only child of a fresh root.
    pub fn from_json_node(node: &JsonNode) -> Result<Document> {
        let mut doc = Document::new();
        let root = doc.root;
        if node.kind == Kind::Document {
            doc.build_json(&node.children, root)?;
        } else {
            doc.build_json(std::slice::from_ref(node), root)?;
        }
        Ok(doc)
    }

    /// Appends `nodes` and their subtrees under `parent`, in order.
    fn build_json(&mut self, nodes: &[JsonNode], parent: NodeId) -> Result<()> {
        let mut stack: Vec<_> = nodes.iter().rev().map(|node| (node, parent)).collect();
        while let Some((node, parent)) = stack.pop() {
            let id = self.new_node(node_kind(node)?);
            parent.append(id, &mut self.arena);
            stack.extend(node.children.iter().rev().map(|child| (child, id)));
        }
        Ok(())
    }
}

/// Payload for one JSON node, checked against its place in the tree.
fn node_kind(node: &JsonNode) -> Result<NodeKind> {
    let content = || node.content.clone().unwrap_or_default();
    let kind = match node.kind {
        Kind::Document => return Err(json_error("document node below the root")),
        Kind::Element => {
            let tag = match node.tag.as_deref() {
                Some(tag) if !tag.is_empty() => tag,
                _ => return Err(json_error("element without a tag")),
            };
            NodeKind::Element(ElementData {
                tag: tag.into(),
                attrs: node
                    .attributes
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()))
                    .collect::<Attributes>(),
                self_closing: node.self_closing,
            })
        }
        Kind::Text => NodeKind::Text(content()),
        Kind::Comment => NodeKind::Comment(content()),
        Kind::CData => NodeKind::CData(content()),
        Kind::Doctype => NodeKind::Doctype(content()),
        Kind::ProcessingInstruction => NodeKind::ProcessingInstruction(content()),
    };
    if node.kind != Kind::Element && !node.children.is_empty() {
        return Err(json_error(format!("a {} node cannot have children", node.kind)));
    }
    Ok(kind)
}

/// Parse a JSON string produced by [`Document::to_json`] (or any single
/// serialized node) back into a document.
pub fn parse_json(json: &str) -> Result<Document> {
    let node: JsonNode = facet_json::from_str(json).map_err(|e| json_error(e.to_string()))?;
    debug!(children = node.children.len(), "parsed JSON document");
    Document::from_json_node(&node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, parse};
    use facet_testhelpers::test;

    #[test]
    fn test_json_mirror_shape() {
        let doc = parse(r#"<hero name="Zabu" class="warrior"/>"#, &ParseOptions::default())
            .unwrap();
        let json = doc.to_json_node(doc.root());
        assert_eq!(json.kind, Kind::Document);
        let hero = &json.children[0];
        assert_eq!(hero.kind, Kind::Element);
        assert_eq!(hero.tag.as_deref(), Some("hero"));
        assert!(hero.self_closing);
        let attrs: Vec<_> = hero.attributes.iter().collect();
        assert_eq!(attrs[0], (&"name".to_string(), &"Zabu".to_string()));
        assert_eq!(attrs[1], (&"class".to_string(), &"warrior".to_string()));
    }

    #[test]
    fn test_json_roundtrip_preserves_markup() {
        let markup = r#"<?xml version="1.0"?><!DOCTYPE x><x b="2" a="1"><y/><z></z>t &amp; u<!--c--><![CDATA[d]]></x>"#;
        let doc = parse(markup, &ParseOptions::default()).unwrap();
        let json = doc.to_json().unwrap();
        let back = parse_json(&json).unwrap();
        assert_eq!(back.to_xml(), doc.to_xml());
    }

    #[test]
    fn test_single_node_becomes_child_of_root() {
        let doc = parse_json(r#"{"kind":"Element","tag":"solo"}"#).unwrap();
        assert_eq!(doc.to_xml(), "<solo></solo>");
    }

    #[test]
    fn test_deep_tree_conversion() {
        let depth = 100_000;
        let markup = format!("{}x{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let doc = parse(&markup, &ParseOptions::default()).unwrap();

        let mut json = doc.to_json_node(doc.root());
        let back = Document::from_json_node(&json).unwrap();
        assert_eq!(back.to_xml(), markup);

        // unlink level by level so dropping the mirror stays shallow
        let mut pending = std::mem::take(&mut json.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }

    #[test]
    fn test_children_keep_their_order() {
        let markup = "<r><a><b/><c/></a>t<d><e>f</e></d><!--g--></r>";
        let doc = parse(markup, &ParseOptions::default()).unwrap();
        let back = Document::from_json_node(&doc.to_json_node(doc.root())).unwrap();
        assert_eq!(back.to_xml(), markup);
    }

    #[test]
    fn test_invalid_trees_are_rejected() {
        assert!(matches!(
            parse_json(r#"{"kind":"Element"}"#),
            Err(Error::Json { .. })
        ));
        assert!(matches!(
            parse_json(r#"{"kind":"Document","children":[{"kind":"Document"}]}"#),
            Err(Error::Json { .. })
        ));
        assert!(matches!(
            parse_json(r#"{"kind":"Text","content":"x","children":[{"kind":"Text"}]}"#),
            Err(Error::Json { .. })
        ));
        assert!(matches!(parse_json("not json"), Err(Error::Json { .. })));
    }
}
