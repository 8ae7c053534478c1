//! Glob-and-attribute selectors.
//!
//! A selector is a list of clauses. A clause without `=` is a tag-name glob;
//! `name=value` is an attribute clause whose name and value are both globs.
//! An element matches when every tag clause matches its tag name and every
//! attribute clause is satisfied by at least one of its attributes. In globs
//! `*` matches any run of characters; everything else is literal,
//! case-sensitive, and the whole string must match.
//!
//! Only elements are ever matched; the synthetic root and character nodes
//! never are.
//!
//! ```rust
//! use sprig::{ParseOptions, parse};
//!
//! let doc = parse(
//!     r#"<heroes><hero name="Zabu"/><hero name="Coco"/></heroes>"#,
//!     &ParseOptions::default(),
//! )
//! .unwrap();
//! let heroes = doc.find(doc.root(), "h*").unwrap().unwrap();
//! assert_eq!(doc.find_all(heroes, ["name=*b*"]).unwrap().len(), 1);
//! ```

use smallvec::SmallVec;

use crate::arena_dom::{Document, ElementData, NodeId, NodeKind};
use crate::{Error, Result};

/// A compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glob {
    source: String,
    /// Literal pieces between the `*`s; a pattern without `*` has one piece
    parts: Vec<String>,
}

impl Glob {
    pub fn new(pattern: &str) -> Self {
        Self {
            source: pattern.to_string(),
            parts: pattern.split('*').map(str::to_string).collect(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whole-string, case-sensitive match.
    pub fn matches(&self, text: &str) -> bool {
        let (first, rest) = match self.parts.split_first() {
            Some(split) => split,
            None => return text.is_empty(),
        };
        let Some(mut remaining) = text.strip_prefix(first.as_str()) else {
            return false;
        };
        let Some((last, middle)) = rest.split_last() else {
            // no '*' at all
            return remaining.is_empty();
        };
        for part in middle {
            match remaining.find(part.as_str()) {
                Some(at) => remaining = &remaining[at + part.len()..],
                None => return false,
            }
        }
        remaining.len() >= last.len() && remaining.ends_with(last.as_str())
    }
}

/// One selector clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// Tag-name glob
    Tag(Glob),
    /// `name=value`, both globs
    Attr { name: Glob, value: Glob },
}

impl Clause {
    /// Parse `glob` or `nameGlob=valueGlob`. The value may be empty (it then
    /// matches bare attributes); the tag or attribute-name glob may not.
    pub fn parse(clause: &str) -> Result<Self> {
        match clause.split_once('=') {
            Some((name, value)) => {
                if name.is_empty() {
                    return Err(Error::selector(clause, "empty attribute name"));
                }
                Ok(Clause::Attr {
                    name: Glob::new(name),
                    value: Glob::new(value),
                })
            }
            None if clause.is_empty() => Err(Error::selector(clause, "empty clause")),
            None => Ok(Clause::Tag(Glob::new(clause))),
        }
    }

    fn matches(&self, elem: &ElementData) -> bool {
        match self {
            Clause::Tag(glob) => glob.matches(&elem.tag),
            Clause::Attr { name, value } => elem
                .attrs
                .iter()
                .any(|(n, v)| name.matches(n) && value.matches(v)),
        }
    }
}

/// A compiled selector: all clauses must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    clauses: SmallVec<[Clause; 2]>,
}

impl Selector {
    /// Compile a list of clauses.
    pub fn new<I, S>(clauses: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let clauses = clauses
            .into_iter()
            .map(|clause| Clause::parse(clause.as_ref()))
            .collect::<Result<SmallVec<_>>>()?;
        if clauses.is_empty() {
            return Err(Error::selector("", "selector has no clauses"));
        }
        Ok(Self { clauses })
    }

    /// Compile a single string. A plain string is a tag-name glob; a string
    /// containing `=` is an attribute clause.
    pub fn parse(selector: &str) -> Result<Self> {
        Self::new([selector])
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Whether node `id` of `doc` matches.
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        match &doc.get(id).kind {
            NodeKind::Element(elem) => self.clauses.iter().all(|clause| clause.matches(elem)),
            _ => false,
        }
    }
}

/// Anything query operations accept as a selector: a string, a list of
/// clause strings, or a compiled [`Selector`].
pub trait IntoSelector {
    fn into_selector(self) -> Result<Selector>;
}

impl IntoSelector for Selector {
    fn into_selector(self) -> Result<Selector> {
        Ok(self)
    }
}

impl IntoSelector for &Selector {
    fn into_selector(self) -> Result<Selector> {
        Ok(self.clone())
    }
}

impl IntoSelector for &str {
    fn into_selector(self) -> Result<Selector> {
        Selector::parse(self)
    }
}

impl IntoSelector for &String {
    fn into_selector(self) -> Result<Selector> {
        Selector::parse(self)
    }
}

impl IntoSelector for String {
    fn into_selector(self) -> Result<Selector> {
        Selector::parse(&self)
    }
}

impl<S: AsRef<str>, const N: usize> IntoSelector for [S; N] {
    fn into_selector(self) -> Result<Selector> {
        Selector::new(self)
    }
}

impl<S: AsRef<str>> IntoSelector for &[S] {
    fn into_selector(self) -> Result<Selector> {
        Selector::new(self)
    }
}

impl<S: AsRef<str>> IntoSelector for Vec<S> {
    fn into_selector(self) -> Result<Selector> {
        Selector::new(self)
    }
}

impl Document {
    /// First matching descendant of `from` in document order.
    pub fn find(&self, from: NodeId, selector: impl IntoSelector) -> Result<Option<NodeId>> {
        let selector = selector.into_selector()?;
        Ok(self
            .descendants(from)
            .skip(1)
            .find(|&id| selector.matches(self, id)))
    }

    /// All matching descendants of `from`, in document order.
    pub fn find_all(&self, from: NodeId, selector: impl IntoSelector) -> Result<Vec<NodeId>> {
        let selector = selector.into_selector()?;
        Ok(self
            .descendants(from)
            .skip(1)
            .filter(|&id| selector.matches(self, id))
            .collect())
    }

    /// First matching direct child of `from`.
    pub fn find_child(&self, from: NodeId, selector: impl IntoSelector) -> Result<Option<NodeId>> {
        let selector = selector.into_selector()?;
        Ok(self.children(from).find(|&id| selector.matches(self, id)))
    }

    /// All matching direct children of `from`, in child order.
    pub fn find_all_children(
        &self,
        from: NodeId,
        selector: impl IntoSelector,
    ) -> Result<Vec<NodeId>> {
        let selector = selector.into_selector()?;
        Ok(self
            .children(from)
            .filter(|&id| selector.matches(self, id))
            .collect())
    }

    /// Nearest matching ancestor of `from`.
    pub fn find_parent(&self, from: NodeId, selector: impl IntoSelector) -> Result<Option<NodeId>> {
        let selector = selector.into_selector()?;
        Ok(self
            .ancestors(from)
            .into_iter()
            .find(|&id| selector.matches(self, id)))
    }

    /// Every ancestor of `from` below the root, nearest first.
    pub fn find_all_parents(&self, from: NodeId) -> Vec<NodeId> {
        self.ancestors(from)
    }

    fn ancestors(&self, from: NodeId) -> Vec<NodeId> {
        from.ancestors(&self.arena)
            .skip(1)
            .filter(|&id| id != self.root)
            .collect()
    }

    /// Concatenated text of all `Text` descendants of `id`, in document
    /// order, with no separator.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id).skip(1) {
            if let NodeKind::Text(text) = &self.get(node).kind {
                out.push_str(text);
            }
        }
        out
    }
}
