//! Depth-first visitor.
//!
//! A [`Walker`] holds at most one handler per [`Kind`] and calls it for every
//! node of that kind in document order. Kinds without a handler are skipped.
//! Handlers can be registered by kind ([`Walker::on`], [`Walker::on_named`])
//! or positionally ([`Walker::positional`]); both fill the same table.
//!
//! ```rust
//! use sprig::{Kind, ParseOptions, Walker, parse};
//!
//! let doc = parse("<a>x<!--y-->z</a>", &ParseOptions::default()).unwrap();
//! let mut texts = 0;
//! let mut walker = Walker::new().on(Kind::Text, |_, _| texts += 1);
//! doc.walk(&mut walker);
//! drop(walker);
//! assert_eq!(texts, 2);
//! ```

use crate::arena_dom::{Document, Kind, NodeId};
use crate::{Error, Result};

/// Callback invoked with the document and the visited node.
pub type Handler<'h> = Box<dyn FnMut(&Document, NodeId) + 'h>;

/// Order of handlers in the positional convention.
pub const POSITIONAL_ORDER: [Kind; 6] = [
    Kind::Text,
    Kind::Comment,
    Kind::Element,
    Kind::CData,
    Kind::Doctype,
    Kind::ProcessingInstruction,
];

/// Dispatch table from node kind to handler.
pub struct Walker<'h> {
    handlers: [Option<Handler<'h>>; Kind::COUNT],
}

impl Default for Walker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Walker<'h> {
    pub fn new() -> Self {
        Self {
            handlers: Default::default(),
        }
    }

    /// Set the handler for `kind`, replacing any previous one.
    pub fn on(mut self, kind: Kind, handler: impl FnMut(&Document, NodeId) + 'h) -> Self {
        self.handlers[kind.index()] = Some(Box::new(handler));
        self
    }

    /// [`Walker::on`] keyed by handler name: `node`, `text`, `comment`,
    /// `cdata`, `doctype` or `pi`. The root is never visited, so `document`
    /// is not a handler name.
    pub fn on_named(self, name: &str, handler: impl FnMut(&Document, NodeId) + 'h) -> Result<Self> {
        match name.parse::<Kind>()? {
            Kind::Document => Err(Error::UnknownKind {
                name: name.to_string(),
            }),
            kind => Ok(self.on(kind, handler)),
        }
    }

    /// Text handler first, comment handler second.
    pub fn positional(
        text: impl FnMut(&Document, NodeId) + 'h,
        comment: impl FnMut(&Document, NodeId) + 'h,
    ) -> Self {
        Self::positional_all([
            Box::new(text) as Handler<'h>,
            Box::new(comment) as Handler<'h>,
        ])
    }

    /// Handlers in [`POSITIONAL_ORDER`]; extra handlers are ignored and
    /// missing trailing ones are simply not set.
    pub fn positional_all(handlers: impl IntoIterator<Item = Handler<'h>>) -> Self {
        let mut walker = Self::new();
        for (kind, handler) in POSITIONAL_ORDER.into_iter().zip(handlers) {
            walker.handlers[kind.index()] = Some(handler);
        }
        walker
    }

    pub fn has_handler(&self, kind: Kind) -> bool {
        self.handlers[kind.index()].is_some()
    }

    /// Visit `from` and its descendants in document order. The synthetic root
    /// is never reported.
    pub fn walk(&mut self, doc: &Document, from: NodeId) {
        for id in doc.descendants(from) {
            let kind = doc.kind(id);
            if kind == Kind::Document {
                continue;
            }
            if let Some(handler) = &mut self.handlers[kind.index()] {
                handler(doc, id);
            }
        }
    }
}

impl Document {
    /// Walk the whole document.
    pub fn walk(&self, walker: &mut Walker<'_>) {
        walker.walk(self, self.root);
    }
}
