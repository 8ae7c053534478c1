//! Tree builder.
//!
//! Consumes [`Tokenizer`] events and assembles a [`Document`]. Open elements
//! live on an explicit stack: a start tag pushes, a close tag pops down to
//! (and including) the nearest element with the same tag name. Every
//! strict/lenient decision, in this module and in the tokenizer, goes through
//! one `Policy` value so the recovery rules sit in one place.

use std::path::Path;

use crate::arena_dom::{Document, NodeId, NodeKind};
use crate::tokenizer::{Token, Tokenizer};
use crate::tracing_macros::{debug, trace};
use crate::{Error, Result};

/// Options for parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    /// Trim surrounding whitespace from text nodes and drop the ones left
    /// empty (default: false)
    pub trim: bool,
    /// Require well-formed markup (default: true). When false, void elements
    /// close themselves, mismatched close tags are recovered from and
    /// malformed constructs are kept as text.
    pub strict: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            trim: false,
            strict: true,
        }
    }
}

impl ParseOptions {
    /// Create new default options (strict, whitespace preserved).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable whitespace trimming.
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Switch to HTML-style lenient parsing.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Elements that close themselves in lenient mode.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Strict/lenient decision points.
///
/// Each check returns `Ok(())` when parsing may continue with the recovery
/// described on the method, or the error strict mode reports.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Policy {
    strict: bool,
    trim: bool,
}

impl From<&ParseOptions> for Policy {
    fn from(options: &ParseOptions) -> Self {
        Self {
            strict: options.strict,
            trim: options.trim,
        }
    }
}

impl Policy {
    fn check(&self, fail: impl FnOnce() -> Error) -> Result<()> {
        if self.strict { Err(fail()) } else { Ok(()) }
    }

    /// Unterminated comment, CDATA, doctype, PI or tag: kept as literal text.
    pub(crate) fn unterminated(&self, input: &str, at: usize, what: &str) -> Result<()> {
        self.check(|| Error::syntax(input, at, format!("unterminated {what}")))
    }

    /// `<` that starts no construct: kept as literal text.
    pub(crate) fn stray_lt(&self, input: &str, at: usize) -> Result<()> {
        self.check(|| Error::syntax(input, at, "'<' does not start a tag"))
    }

    /// Unquoted attribute value: read up to whitespace or `>`.
    pub(crate) fn unquoted_value(&self, input: &str, at: usize) -> Result<()> {
        self.check(|| Error::syntax(input, at, "attribute value must be quoted"))
    }

    /// Junk inside a start tag: skipped.
    pub(crate) fn malformed_tag(&self, input: &str, at: usize) -> Result<()> {
        self.check(|| Error::syntax(input, at, "expected attribute name"))
    }

    /// `</>` or `</a b>`: the first word is used as the name, if any.
    pub(crate) fn malformed_close(&self, input: &str, at: usize) -> Result<()> {
        self.check(|| Error::syntax(input, at, "malformed close tag"))
    }

    /// Tags that close themselves without `/>`.
    pub(crate) fn is_void(&self, tag: &str) -> bool {
        !self.strict && VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
    }

    /// Close tag naming an ancestor rather than the innermost open element:
    /// the elements in between are closed implicitly.
    pub(crate) fn mismatched_close(
        &self,
        input: &str,
        at: usize,
        open: &str,
        found: &str,
    ) -> Result<()> {
        self.check(|| Error::structure(input, at, format!("expected </{open}>, found </{found}>")))
    }

    /// Close tag matching no open element: ignored.
    pub(crate) fn unmatched_close(&self, input: &str, at: usize, found: &str) -> Result<()> {
        self.check(|| Error::structure(input, at, format!("unexpected close tag </{found}>")))
    }

    /// Open elements left at end of input: closed implicitly.
    pub(crate) fn unclosed_at_end(&self, input: &str, open: &str) -> Result<()> {
        self.check(|| Error::structure(input, input.len(), format!("unclosed tag <{open}>")))
    }

    /// Invalid UTF-8 in a byte buffer: replaced with U+FFFD. `valid` is the
    /// well-formed prefix.
    pub(crate) fn invalid_utf8(&self, valid: &str) -> Result<()> {
        self.check(|| Error::syntax(valid, valid.len(), "invalid UTF-8"))
    }

    pub(crate) fn trim(&self) -> bool {
        self.trim
    }
}

/// Parse a markup string into a document.
///
/// # Example
///
/// ```rust
/// use sprig::{ParseOptions, parse};
///
/// let doc = parse("<heroes><hero name=\"Zabu\"/></heroes>", &ParseOptions::default()).unwrap();
/// let hero = doc.find(doc.root(), "hero").unwrap().unwrap();
/// assert_eq!(doc.attr(hero, "name"), Some("Zabu"));
/// ```
pub fn parse(input: &str, options: &ParseOptions) -> Result<Document> {
    TreeBuilder::new(input, Policy::from(options)).build()
}

/// Parse a byte buffer. Strict mode requires valid UTF-8; lenient mode
/// replaces invalid sequences.
pub fn parse_bytes(input: &[u8], options: &ParseOptions) -> Result<Document> {
    match std::str::from_utf8(input) {
        Ok(s) => parse(s, options),
        Err(err) => {
            let valid = std::str::from_utf8(&input[..err.valid_up_to()]).unwrap_or_default();
            Policy::from(options).invalid_utf8(valid)?;
            parse(&String::from_utf8_lossy(input), options)
        }
    }
}

/// Read and parse a file.
pub fn parse_file(path: impl AsRef<Path>, options: &ParseOptions) -> Result<Document> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| Error::io(path, err))?;
    debug!(path = %path.display(), len = bytes.len(), "parsing file");
    parse_bytes(&bytes, options)
}

struct TreeBuilder<'a> {
    input: &'a str,
    policy: Policy,
    doc: Document,
    /// Open elements, innermost last
    stack: Vec<NodeId>,
    /// Element whose start tag may still receive attributes
    pending: Option<NodeId>,
}

impl<'a> TreeBuilder<'a> {
    fn new(input: &'a str, policy: Policy) -> Self {
        Self {
            input,
            policy,
            doc: Document::new(),
            stack: Vec::new(),
            pending: None,
        }
    }

    fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.doc.root)
    }

    fn append(&mut self, kind: NodeKind) -> NodeId {
        let parent = self.current();
        let id = self.doc.new_node(kind);
        parent.append(id, &mut self.doc.arena);
        id
    }

    fn build(mut self) -> Result<Document> {
        let mut tokens = Tokenizer::with_policy(self.input, self.policy);
        while let Some(token) = tokens.next() {
            let token = token?;
            let at = tokens.offset();
            if !matches!(token, Token::Attribute(_) | Token::SelfCloseTag) {
                self.finish_start_tag();
            }
            match token {
                Token::OpenTag(name) => self.open(name),
                Token::Attribute(attr) => {
                    if let Some(id) = self.pending {
                        self.doc.set_attr(id, attr.name, attr.value);
                    }
                }
                Token::SelfCloseTag => {
                    if let Some(id) = self.pending.take() {
                        self.close_self(id);
                    }
                }
                Token::CloseTag(name) => self.close(name, at)?,
                Token::Text(text) => self.append_text(&text),
                Token::Comment(s) => {
                    self.append(NodeKind::Comment(s.to_string()));
                }
                Token::CData(s) => {
                    self.append(NodeKind::CData(s.to_string()));
                }
                Token::Doctype(s) => {
                    self.append(NodeKind::Doctype(s.to_string()));
                }
                Token::ProcessingInstruction(s) => {
                    self.append(NodeKind::ProcessingInstruction(s.to_string()));
                }
            }
        }
        self.finish_start_tag();

        if let Some(&open) = self.stack.last() {
            let tag = self.doc.tag(open).unwrap_or_default().to_string();
            self.policy.unclosed_at_end(self.input, &tag)?;
            debug!(count = self.stack.len(), "closing open elements at end of input");
            self.stack.clear();
        }

        if self.policy.trim() {
            self.trim_text();
        }
        Ok(self.doc)
    }

    fn open(&mut self, name: &str) {
        let id = self.doc.create_element(name);
        let parent = self.current();
        parent.append(id, &mut self.doc.arena);
        self.stack.push(id);
        self.pending = Some(id);
    }

    /// Called once the attributes of the pending start tag are complete.
    fn finish_start_tag(&mut self) {
        let Some(id) = self.pending.take() else {
            return;
        };
        if self.doc.tag(id).is_some_and(|tag| self.policy.is_void(tag)) {
            trace!(tag = ?self.doc.tag(id), "void element closes itself");
            self.close_self(id);
        }
    }

    fn close_self(&mut self, id: NodeId) {
        if let Some(elem) = self.doc.element_mut(id) {
            elem.self_closing = true;
        }
        if self.stack.last() == Some(&id) {
            self.stack.pop();
        }
    }

    fn close(&mut self, name: &str, at: usize) -> Result<()> {
        let doc = &self.doc;
        let matching = self
            .stack
            .iter()
            .rposition(|&id| doc.tag(id) == Some(name));
        match matching {
            Some(index) if index + 1 == self.stack.len() => {
                self.stack.pop();
            }
            Some(index) => {
                let innermost = self.stack[self.stack.len() - 1];
                let open = doc.tag(innermost).unwrap_or_default();
                self.policy.mismatched_close(self.input, at, open, name)?;
                debug!(
                    closed = self.stack.len() - index - 1,
                    tag = name,
                    "implicitly closing elements"
                );
                self.stack.truncate(index);
            }
            None => {
                self.policy.unmatched_close(self.input, at, name)?;
                debug!(tag = name, "ignoring unmatched close tag");
            }
        }
        Ok(())
    }

    /// Appends text, merging with a preceding text sibling.
    fn append_text(&mut self, text: &str) {
        let parent = self.current();
        if let Some(last) = parent.children(&self.doc.arena).next_back()
            && let NodeKind::Text(existing) = &mut self.doc.arena[last].get_mut().kind
        {
            existing.push_str(text);
            return;
        }
        self.append(NodeKind::Text(text.to_string()));
    }

    fn trim_text(&mut self) {
        let texts: Vec<NodeId> = self
            .doc
            .descendants(self.doc.root)
            .filter(|&id| matches!(self.doc.get(id).kind, NodeKind::Text(_)))
            .collect();
        for id in texts {
            if let NodeKind::Text(text) = &mut self.doc.arena[id].get_mut().kind {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    id.remove(&mut self.doc.arena);
                } else if trimmed.len() != text.len() {
                    *text = trimmed.to_string();
                }
            }
        }
    }
}
