//! Structural edits: moving, replacing, inserting and removing nodes.
//!
//! Every operation validates all of its inputs before touching a single link,
//! so a failed call leaves the tree exactly as it was. Moving a node always
//! unlinks it from its old parent first; a node is never a child of two
//! parents.

use crate::arena_dom::{Document, Kind, NodeId, NodeKind};
use crate::tracing_macros::debug;
use crate::{Error, Result};

/// What can be spliced into a tree: one node, an ordered list of nodes, or a
/// raw string that becomes a new `Text` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Text(String),
}

impl Content {
    fn node_ids(&self) -> &[NodeId] {
        match self {
            Content::Node(id) => std::slice::from_ref(id),
            Content::Nodes(ids) => ids,
            Content::Text(_) => &[],
        }
    }

    /// Resolve into the ordered list of nodes to splice. Only called after
    /// validation, since text content allocates a node.
    fn into_nodes(self, doc: &mut Document) -> Vec<NodeId> {
        match self {
            Content::Node(id) => vec![id],
            Content::Nodes(ids) => ids,
            Content::Text(text) => vec![doc.create_text(text)],
        }
    }
}

impl From<NodeId> for Content {
    fn from(id: NodeId) -> Self {
        Content::Node(id)
    }
}

impl From<Vec<NodeId>> for Content {
    fn from(ids: Vec<NodeId>) -> Self {
        Content::Nodes(ids)
    }
}

impl From<&[NodeId]> for Content {
    fn from(ids: &[NodeId]) -> Self {
        Content::Nodes(ids.to_vec())
    }
}

impl<const N: usize> From<[NodeId; N]> for Content {
    fn from(ids: [NodeId; N]) -> Self {
        Content::Nodes(ids.to_vec())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

fn hierarchy(message: impl Into<String>) -> Error {
    Error::Hierarchy {
        message: message.into(),
    }
}

impl Document {
    /// Append content as the last children of `target`, unlinking each node
    /// from its previous parent first.
    pub fn push(&mut self, target: NodeId, content: impl Into<Content>) -> Result<()> {
        let content = content.into();
        self.check_insert(target, content.node_ids())?;
        let nodes = content.into_nodes(self);
        debug!("push {} node(s) into {:?}", nodes.len(), target);
        for id in nodes {
            target
                .checked_append(id, &mut self.arena)
                .map_err(|e| hierarchy(e.to_string()))?;
        }
        Ok(())
    }

    /// `push(target, node)`.
    pub fn push_to(&mut self, node: NodeId, target: NodeId) -> Result<()> {
        self.push(target, node)
    }

    /// Put content where `node` is, preserving sibling order, and unlink
    /// `node`. A node without a parent has nothing to be replaced in, so this
    /// is then a no-op. Replacing with an empty list just unlinks `node`.
    pub fn replace_with(&mut self, node: NodeId, content: impl Into<Content>) -> Result<()> {
        let Some(parent) = self.parent(node) else {
            return Ok(());
        };
        let content = content.into();
        self.check_insert(parent, content.node_ids())?;
        let nodes = content.into_nodes(self);
        let anchor = node
            .following_siblings(&self.arena)
            .skip(1)
            .find(|sibling| !nodes.contains(sibling));
        debug!("replace {:?} with {} node(s)", node, nodes.len());
        node.detach(&mut self.arena);
        self.splice(parent, anchor, nodes)
    }

    /// Insert content into `parent` before the child currently at `index`,
    /// or at the end when `index` is past the last child.
    pub fn insert_at(
        &mut self,
        parent: NodeId,
        index: usize,
        content: impl Into<Content>,
    ) -> Result<()> {
        let content = content.into();
        self.check_insert(parent, content.node_ids())?;
        let nodes = content.into_nodes(self);
        let anchor = self
            .children(parent)
            .skip(index)
            .find(|child| !nodes.contains(child));
        debug!("insert {} node(s) into {:?} at {}", nodes.len(), parent, index);
        self.splice(parent, anchor, nodes)
    }

    /// Unlink `node` (with its subtree) from its parent. The node stays in the
    /// document and can be pushed back in later. No-op for detached nodes and
    /// the root.
    pub fn detach(&mut self, node: NodeId) {
        if self.parent(node).is_some() {
            debug!("detach {:?}", node);
            node.detach(&mut self.arena);
        }
    }

    /// Unlink `node` and free its whole subtree. Handles into the removed
    /// subtree must not be used afterwards.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        if node == self.root {
            return Err(hierarchy("cannot remove the document root"));
        }
        if node.is_removed(&self.arena) {
            return Ok(());
        }
        debug!("remove {:?}", node);
        node.remove_subtree(&mut self.arena);
        Ok(())
    }

    /// Deep-copy the subtree at `node` of `other` into this document. The copy
    /// is detached; push it wherever it belongs.
    pub fn import(&mut self, other: &Document, node: NodeId) -> Result<NodeId> {
        if other.kind(node) == Kind::Document {
            return Err(hierarchy("cannot import a document root"));
        }
        Ok(self.copy_subtree(other, node))
    }

    fn copy_subtree(&mut self, other: &Document, node: NodeId) -> NodeId {
        let copy = self.new_node(other.get(node).kind.clone());
        let mut stack: Vec<_> = other.children(node).rev().map(|child| (child, copy)).collect();
        while let Some((source, parent)) = stack.pop() {
            let id = self.new_node(other.get(source).kind.clone());
            parent.append(id, &mut self.arena);
            stack.extend(other.children(source).rev().map(|child| (child, id)));
        }
        copy
    }

    fn splice(&mut self, parent: NodeId, anchor: Option<NodeId>, nodes: Vec<NodeId>) -> Result<()> {
        for id in nodes {
            let linked = match anchor {
                Some(anchor) => anchor.checked_insert_before(id, &mut self.arena),
                None => parent.checked_append(id, &mut self.arena),
            };
            linked.map_err(|e| hierarchy(e.to_string()))?;
        }
        Ok(())
    }

    /// Everything that could break the tree invariants is rejected here,
    /// before any link changes.
    fn check_insert(&self, parent: NodeId, nodes: &[NodeId]) -> Result<()> {
        if parent.is_removed(&self.arena) {
            return Err(hierarchy("target node was removed"));
        }
        if !matches!(
            self.get(parent).kind,
            NodeKind::Element(_) | NodeKind::Document
        ) {
            return Err(hierarchy(format!(
                "a {} node cannot have children",
                self.kind(parent)
            )));
        }
        for &id in nodes {
            if id.is_removed(&self.arena) {
                return Err(hierarchy("cannot insert a removed node"));
            }
            if self.kind(id) == Kind::Document {
                return Err(hierarchy("cannot move the document root"));
            }
            if parent.ancestors(&self.arena).any(|ancestor| ancestor == id) {
                return Err(hierarchy("cannot move a node into its own subtree"));
            }
        }
        Ok(())
    }
}
