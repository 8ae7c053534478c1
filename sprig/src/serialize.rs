//! Markup writer.
//!
//! Compact output (the default) is round-trip stable: parsing it with the same
//! [`ParseOptions`](crate::ParseOptions) and writing it again gives the same
//! bytes. Pretty output adds indentation and newlines, which become text nodes
//! when parsed back.

use std::fmt::Write;
use std::path::Path;

use crate::arena_dom::{Document, ElementData, NodeId, NodeKind};
use crate::{Error, Result};

/// Options for markup serialization.
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Whether to pretty-print with indentation (default: false for compact output)
    pub pretty: bool,
    /// Indentation string for pretty-printing (default: "  ")
    pub indent: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ".to_string(),
        }
    }
}

impl SerializeOptions {
    /// Create new default options (compact output).
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty-printing with default indentation.
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Set a custom indentation string (implies pretty-printing).
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self.pretty = true;
        self
    }
}

/// Serialize node `id` of `doc` and its subtree. For the root this is the
/// whole document.
pub fn serialize_node(doc: &Document, id: NodeId, opts: &SerializeOptions) -> String {
    let mut out = String::new();
    let mut ser = Serializer::new(doc, &mut out, opts);
    ser.write_node(id);
    out
}

struct Serializer<'a, W: Write> {
    doc: &'a Document,
    out: &'a mut W,
    options: &'a SerializeOptions,
    depth: usize,
}

impl<'a, W: Write> Serializer<'a, W> {
    fn new(doc: &'a Document, out: &'a mut W, options: &'a SerializeOptions) -> Self {
        Self {
            doc,
            out,
            options,
            depth: 0,
        }
    }

    fn write_indent(&mut self) {
        if self.options.pretty {
            for _ in 0..self.depth {
                let _ = write!(self.out, "{}", self.options.indent);
            }
        }
    }

    fn write_newline(&mut self) {
        if self.options.pretty {
            let _ = writeln!(self.out);
        }
    }

    /// Escape `&`, `<` and `>`; with `quote`, also `"`.
    fn write_escaped(&mut self, text: &str, quote: bool) {
        for c in text.chars() {
            let _ = match c {
                '&' => self.out.write_str("&amp;"),
                '<' => self.out.write_str("&lt;"),
                '>' => self.out.write_str("&gt;"),
                '"' if quote => self.out.write_str("&quot;"),
                _ => self.out.write_char(c),
            };
        }
    }

    /// Writes `id` and its subtree with an explicit stack, so nesting depth
    /// is bounded by memory rather than the call stack.
    fn write_node(&mut self, id: NodeId) {
        let doc = self.doc;
        let mut stack = vec![Step::Open(id)];
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Open(id) => id,
                Step::Close(tag) => {
                    self.depth -= 1;
                    self.write_indent();
                    self.write_close(tag);
                    continue;
                }
            };
            match &doc.get(id).kind {
                NodeKind::Document => stack.extend(doc.children(id).rev().map(Step::Open)),
                NodeKind::Element(elem) => {
                    if self.open_element(id, elem) {
                        self.depth += 1;
                        stack.push(Step::Close(elem.tag.as_str()));
                        stack.extend(doc.children(id).rev().map(Step::Open));
                    }
                }
                NodeKind::Text(text) => {
                    self.write_indent();
                    self.write_escaped(text, false);
                    if !text.is_empty() {
                        self.write_newline();
                    }
                }
                NodeKind::Comment(text) => self.write_raw("<!--", text, "-->"),
                NodeKind::CData(text) => self.write_raw("<![CDATA[", text, "]]>"),
                NodeKind::Doctype(text) => self.write_raw("<!DOCTYPE ", text, ">"),
                NodeKind::ProcessingInstruction(text) => self.write_raw("<?", text, "?>"),
            }
        }
    }

    fn write_raw(&mut self, open: &str, text: &str, close: &str) {
        self.write_indent();
        let _ = write!(self.out, "{open}{text}{close}");
        self.write_newline();
    }

    fn write_close(&mut self, tag: &str) {
        let _ = write!(self.out, "</{tag}>");
        self.write_newline();
    }

    /// Writes the start tag, and the whole element when it is empty or holds
    /// only text. Returns true when element children still have to be
    /// written, followed by the end tag.
    fn open_element(&mut self, id: NodeId, elem: &ElementData) -> bool {
        let doc = self.doc;
        self.write_indent();
        let _ = write!(self.out, "<{}", elem.tag);
        for (name, value) in elem.attrs.iter() {
            let _ = write!(self.out, " {name}=\"");
            self.write_escaped(value, true);
            let _ = self.out.write_char('"');
        }

        if doc.children(id).next().is_none() {
            if elem.self_closing {
                let _ = self.out.write_str("/>");
                self.write_newline();
            } else {
                let _ = self.out.write_char('>');
                self.write_close(&elem.tag);
            }
            return false;
        }
        let _ = self.out.write_char('>');

        let all_text = doc
            .children(id)
            .all(|child| matches!(doc.get(child).kind, NodeKind::Text(_)));
        if !all_text {
            self.write_newline();
            return true;
        }
        // inline, even when pretty
        for child in doc.children(id) {
            if let NodeKind::Text(text) = &doc.get(child).kind {
                self.write_escaped(text, false);
            }
        }
        self.write_close(&elem.tag);
        false
    }
}

enum Step<'a> {
    Open(NodeId),
    Close(&'a str),
}

impl Document {
    /// Serialize the whole document to compact markup.
    pub fn to_xml(&self) -> String {
        serialize_node(self, self.root, &SerializeOptions::default())
    }

    /// Serialize the whole document to indented markup.
    pub fn to_xml_pretty(&self) -> String {
        serialize_node(self, self.root, &SerializeOptions::default().pretty())
    }

    /// Serialize one node and its subtree to compact markup.
    pub fn node_to_xml(&self, id: NodeId) -> String {
        serialize_node(self, id, &SerializeOptions::default())
    }

    pub fn to_xml_with_options(&self, opts: &SerializeOptions) -> String {
        serialize_node(self, self.root, opts)
    }

    /// Write [`Document::to_xml`] to a file.
    pub fn write_xml_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_xml()).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParseOptions, parse};
    use facet_testhelpers::test;

    fn roundtrip(markup: &str) -> String {
        parse(markup, &ParseOptions::default()).unwrap().to_xml()
    }

    #[test]
    fn test_compact_is_identity_for_canonical_markup() {
        let markup = r#"<?xml version="1.0"?><!DOCTYPE note><a x="1" y="2"><b/><c></c>text<!-- hi --><![CDATA[<raw>]]></a>"#;
        assert_eq!(roundtrip(markup), markup);
    }

    #[test]
    fn test_self_closing_flag_is_kept() {
        assert_eq!(roundtrip("<r><a/><a></a></r>"), "<r><a/><a></a></r>");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(
            roundtrip("<p>a &amp; b &lt; c &gt; d \"q\"</p>"),
            "<p>a &amp; b &lt; c &gt; d \"q\"</p>"
        );
        assert_eq!(roundtrip("<p>&copy; &#65;</p>"), "<p>\u{a9} A</p>");
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = Document::new();
        let el = doc.create_element("e");
        doc.set_attr(el, "v", r#"say "hi" & <go>"#);
        let root = doc.root();
        doc.push(root, el).unwrap();
        assert_eq!(
            doc.to_xml(),
            r#"<e v="say &quot;hi&quot; &amp; &lt;go&gt;"></e>"#
        );
    }

    #[test]
    fn test_node_to_xml() {
        let doc = parse("<a><b k=\"v\">x</b><c/></a>", &ParseOptions::default()).unwrap();
        let b = doc.find(doc.root(), "b").unwrap().unwrap();
        assert_eq!(doc.node_to_xml(b), "<b k=\"v\">x</b>");
    }

    #[test]
    fn test_pretty() {
        let doc = parse("<a><b>x</b><c/><!--n--></a>", &ParseOptions::default()).unwrap();
        assert_eq!(
            doc.to_xml_pretty(),
            "<a>\n  <b>x</b>\n  <c/>\n  <!--n-->\n</a>\n"
        );
        let tabbed = doc.to_xml_with_options(&SerializeOptions::new().with_indent("\t"));
        assert!(tabbed.contains("\n\t<c/>\n"));
    }

    #[test]
    fn test_deep_nesting() {
        let depth = 100_000;
        let markup = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let doc = parse(&markup, &ParseOptions::default()).unwrap();
        assert_eq!(doc.to_xml(), markup);

        let pretty = doc.to_xml_with_options(&SerializeOptions::new().with_indent(""));
        assert_eq!(pretty.lines().count(), 2 * depth - 1);
        assert_eq!(pretty.lines().nth(depth - 1), Some("<a></a>"));
    }

    #[test]
    fn test_write_file_error() {
        let doc = Document::new();
        let err = doc
            .write_xml_file("/nonexistent-dir/sub/out.xml")
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
