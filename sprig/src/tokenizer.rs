//! Markup tokenizer.
//!
//! [`Tokenizer`] turns a markup string into a lazy stream of [`Token`]s. It
//! makes no structural decisions: whitespace-only text is reported like any
//! other text, and tags are never matched against each other. What happens on
//! malformed input (unterminated comment, stray `<`, unquoted attribute value)
//! is decided by the parse policy: strict mode fails with
//! [`crate::Error::Syntax`], lenient mode keeps the offending bytes as literal text.

use std::borrow::Cow;
use std::collections::VecDeque;

use crate::arena_dom::Attribute;
use crate::parser::{ParseOptions, Policy};
use crate::tracing_macros::trace;
use crate::Result;

/// A lexical event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `<name`, followed by zero or more `Attribute`s and maybe `SelfCloseTag`
    OpenTag(&'a str),
    Attribute(Attribute),
    /// `/>` closing the most recent `OpenTag`
    SelfCloseTag,
    /// `</name>`
    CloseTag(&'a str),
    /// Character data with references decoded
    Text(Cow<'a, str>),
    Comment(&'a str),
    CData(&'a str),
    /// Doctype body, keyword and leading whitespace stripped
    Doctype(&'a str),
    ProcessingInstruction(&'a str),
}

/// Lazy, single-pass tokenizer over a markup string.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    policy: Policy,
    /// Tokens already scanned from one start tag, with the tag's offset
    queue: VecDeque<(Token<'a>, usize)>,
    last_offset: usize,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        Self::with_policy(input, Policy::from(options))
    }

    pub(crate) fn with_policy(input: &'a str, policy: Policy) -> Self {
        Self {
            input,
            pos: 0,
            policy,
            queue: VecDeque::new(),
            last_offset: 0,
            done: false,
        }
    }

    /// Byte offset where the most recently returned token starts. Attribute
    /// and self-close tokens report the offset of their start tag.
    pub fn offset(&self) -> usize {
        self.last_offset
    }

    fn step(&mut self) -> Result<Option<(Token<'a>, usize)>> {
        let input = self.input;
        let start = self.pos;
        let rest = &input[start..];
        if rest.is_empty() {
            return Ok(None);
        }

        if !rest.starts_with('<') {
            let len = rest.find('<').unwrap_or(rest.len());
            self.pos += len;
            return Ok(Some((Token::Text(decode_entities(&rest[..len])), start)));
        }

        if rest.starts_with("<!--") {
            return self.delimited("<!--", "-->", "comment", Token::Comment);
        }
        if rest.starts_with("<![CDATA[") {
            return self.delimited("<![CDATA[", "]]>", "CDATA section", Token::CData);
        }
        if starts_with_ignore_ascii_case(rest, "<!DOCTYPE") {
            return self.doctype();
        }
        if rest.starts_with("<?") {
            return self.delimited("<?", "?>", "processing instruction", Token::ProcessingInstruction);
        }
        if rest.starts_with("</") {
            return self.close_tag();
        }
        if rest[1..].chars().next().is_some_and(is_name_start_char) {
            return self.open_tag();
        }

        self.policy.stray_lt(input, start)?;
        trace!(offset = start, "keeping stray '<' as text");
        self.pos += 1;
        Ok(Some((Token::Text(Cow::Borrowed("<")), start)))
    }

    /// Scans `open ... close`, handing the body to `make`.
    fn delimited(
        &mut self,
        open: &str,
        close: &str,
        what: &str,
        make: fn(&'a str) -> Token<'a>,
    ) -> Result<Option<(Token<'a>, usize)>> {
        let input = self.input;
        let start = self.pos;
        let body_start = start + open.len();
        match input[body_start..].find(close) {
            Some(len) => {
                self.pos = body_start + len + close.len();
                Ok(Some((make(&input[body_start..body_start + len]), start)))
            }
            None => self.unterminated(start, what),
        }
    }

    fn doctype(&mut self) -> Result<Option<(Token<'a>, usize)>> {
        let input = self.input;
        let start = self.pos;
        let body_start = start + "<!DOCTYPE".len();
        // an internal subset may contain '>'
        let mut depth = 0usize;
        for (i, b) in input.as_bytes()[body_start..].iter().enumerate() {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    self.pos = body_start + i + 1;
                    let body = input[body_start..body_start + i].trim_start();
                    return Ok(Some((Token::Doctype(body), start)));
                }
                _ => {}
            }
        }
        self.unterminated(start, "doctype")
    }

    fn close_tag(&mut self) -> Result<Option<(Token<'a>, usize)>> {
        let input = self.input;
        let start = self.pos;
        let Some(len) = input[start..].find('>') else {
            return self.unterminated(start, "close tag");
        };
        let inner = &input[start + 2..start + len];
        let name = inner.trim_end();
        let well_formed = !name.is_empty() && !name.contains(char::is_whitespace);
        if !well_formed {
            self.policy.malformed_close(input, start)?;
            self.pos = start + len + 1;
            return match name.split_whitespace().next() {
                Some(first) => Ok(Some((Token::CloseTag(first), start))),
                None => Ok(Some((Token::Text(Cow::Borrowed(&input[start..self.pos])), start))),
            };
        }
        self.pos = start + len + 1;
        Ok(Some((Token::CloseTag(name), start)))
    }

    fn open_tag(&mut self) -> Result<Option<(Token<'a>, usize)>> {
        let input = self.input;
        let bytes = input.as_bytes();
        let start = self.pos;

        let name_end = scan_until(input, start + 1, |c| {
            c.is_whitespace() || c == '/' || c == '>'
        });
        let name = &input[start + 1..name_end];
        let mut tokens = vec![Token::OpenTag(name)];
        let mut i = name_end;

        loop {
            i = skip_whitespace(input, i);
            match bytes.get(i) {
                None => return self.unterminated(start, "start tag"),
                Some(b'>') => {
                    i += 1;
                    break;
                }
                Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                    tokens.push(Token::SelfCloseTag);
                    i += 2;
                    break;
                }
                Some(_) => {}
            }

            let attr_end = scan_until(input, i, |c| {
                c.is_whitespace() || c == '=' || c == '>' || c == '/'
            });
            if attr_end == i {
                // '/' not followed by '>', or a stray '='
                self.policy.malformed_tag(input, i)?;
                i += 1;
                continue;
            }
            let attr_name = &input[i..attr_end];
            i = skip_whitespace(input, attr_end);

            let value = if bytes.get(i) == Some(&b'=') {
                i = skip_whitespace(input, i + 1);
                match bytes.get(i) {
                    None => return self.unterminated(start, "start tag"),
                    Some(&quote) if quote == b'"' || quote == b'\'' => {
                        let Some(len) = input[i + 1..].find(quote as char) else {
                            return self.unterminated(start, "attribute value");
                        };
                        let value = decode_entities(&input[i + 1..i + 1 + len]);
                        i += len + 2;
                        value.into_owned()
                    }
                    Some(_) => {
                        self.policy.unquoted_value(input, i)?;
                        let end = scan_until(input, i, |c| c.is_whitespace() || c == '>');
                        let value = decode_entities(&input[i..end]).into_owned();
                        i = end;
                        value
                    }
                }
            } else {
                String::new()
            };

            tokens.push(Token::Attribute(Attribute {
                name: attr_name.into(),
                value,
            }));
        }

        self.pos = i;
        let mut tokens = tokens.into_iter();
        let first = tokens.next().map(|token| (token, start));
        self.queue.extend(tokens.map(|token| (token, start)));
        Ok(first)
    }

    /// An unterminated construct: an error in strict mode, the rest of the
    /// input as literal text otherwise.
    fn unterminated(&mut self, start: usize, what: &str) -> Result<Option<(Token<'a>, usize)>> {
        let input = self.input;
        self.policy.unterminated(input, start, what)?;
        trace!(offset = start, what, "unterminated construct kept as text");
        self.pos = input.len();
        Ok(Some((Token::Text(Cow::Borrowed(&input[start..])), start)))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((token, offset)) = self.queue.pop_front() {
            self.last_offset = offset;
            return Some(Ok(token));
        }
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some((token, offset))) => {
                self.last_offset = offset;
                Some(Ok(token))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn starts_with_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack.len() >= needle.len()
        && haystack.as_bytes()[..needle.len()].eq_ignore_ascii_case(needle.as_bytes())
}

fn scan_until(input: &str, from: usize, stop: impl Fn(char) -> bool) -> usize {
    input[from..]
        .char_indices()
        .find(|&(_, c)| stop(c))
        .map_or(input.len(), |(i, _)| from + i)
}

fn skip_whitespace(input: &str, from: usize) -> usize {
    scan_until(input, from, |c| !c.is_whitespace())
}

/// Named references understood in text and attribute values.
const ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", "\u{a0}"),
    ("copy", "\u{a9}"),
    ("reg", "\u{ae}"),
    ("trade", "\u{2122}"),
    ("hellip", "\u{2026}"),
    ("mdash", "\u{2014}"),
    ("ndash", "\u{2013}"),
    ("laquo", "\u{ab}"),
    ("raquo", "\u{bb}"),
];

/// Decodes character and entity references. Anything that is not a
/// well-formed known reference is kept as written.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match decode_reference(rest) {
            Some((decoded, consumed)) => {
                out.push(decoded);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Longest reference body looked at; longer runs are never a reference.
const MAX_REFERENCE_LEN: usize = 32;

/// Decodes the reference at the start of `s` (which begins with `&`),
/// returning the character and the number of bytes consumed. Only a short
/// run of `[A-Za-z0-9#]` followed by `;` is considered, so decoding a text
/// run stays linear.
fn decode_reference(s: &str) -> Option<(char, usize)> {
    let body_len = s.as_bytes()[1..]
        .iter()
        .take(MAX_REFERENCE_LEN + 1)
        .position(|&b| !(b.is_ascii_alphanumeric() || b == b'#'))?;
    if body_len > MAX_REFERENCE_LEN || s.as_bytes().get(1 + body_len) != Some(&b';') {
        return None;
    }
    let body = &s[1..1 + body_len];
    let decoded = if let Some(num) = body.strip_prefix('#') {
        let value = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                u32::from_str_radix(hex, 16).ok()?
            }
            None if !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()) => {
                num.parse::<u32>().ok()?
            }
            _ => return None,
        };
        char::from_u32(value)?
    } else {
        let (_, value) = ENTITIES.iter().find(|(name, _)| *name == body)?;
        value.chars().next()?
    };
    Some((decoded, body_len + 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use facet_testhelpers::test;

    fn tokens<'a>(input: &'a str, options: &ParseOptions) -> Result<Vec<Token<'a>>> {
        Tokenizer::new(input, options).collect()
    }

    fn strict(input: &str) -> Vec<Token<'_>> {
        tokens(input, &ParseOptions::default()).unwrap()
    }

    fn attr(name: &str, value: &str) -> Token<'static> {
        Token::Attribute(Attribute {
            name: name.into(),
            value: value.to_string(),
        })
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            strict(r#"<hero name="Zabu">hi</hero>"#),
            vec![
                Token::OpenTag("hero"),
                attr("name", "Zabu"),
                Token::Text(Cow::Borrowed("hi")),
                Token::CloseTag("hero"),
            ]
        );
    }

    #[test]
    fn test_self_close_and_bare_attribute() {
        assert_eq!(
            strict("<input disabled value='x'/>"),
            vec![
                Token::OpenTag("input"),
                attr("disabled", ""),
                attr("value", "x"),
                Token::SelfCloseTag,
            ]
        );
    }

    #[test]
    fn test_whitespace_text_is_preserved() {
        assert_eq!(
            strict("<a>\n  </a>"),
            vec![
                Token::OpenTag("a"),
                Token::Text(Cow::Borrowed("\n  ")),
                Token::CloseTag("a"),
            ]
        );
    }

    #[test]
    fn test_special_constructs() {
        assert_eq!(
            strict("<?xml version=\"1.0\"?><!DOCTYPE  note><!-- c --><![CDATA[a<b]]>"),
            vec![
                Token::ProcessingInstruction("xml version=\"1.0\""),
                Token::Doctype("note"),
                Token::Comment(" c "),
                Token::CData("a<b"),
            ]
        );
    }

    #[test]
    fn test_doctype_internal_subset() {
        assert_eq!(
            strict("<!doctype note [<!ELEMENT note (#PCDATA)>]><note/>"),
            vec![
                Token::Doctype("note [<!ELEMENT note (#PCDATA)>]"),
                Token::OpenTag("note"),
                Token::SelfCloseTag,
            ]
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(
            strict(r#"<a t="&quot;x&quot;">&lt;&#65;&#x42;&amp;&bogus;&</a>"#),
            vec![
                Token::OpenTag("a"),
                attr("t", "\"x\""),
                Token::Text(Cow::Owned("<AB&&bogus;&".to_string())),
                Token::CloseTag("a"),
            ]
        );
    }

    #[test]
    fn test_malformed_references_kept() {
        assert_eq!(decode_entities("&#+65;&#x+42;&#;&#x;&#65a;"), "&#+65;&#x+42;&#;&#x;&#65a;");
        assert_eq!(decode_entities("&#99999999999;"), "&#99999999999;");
        assert_eq!(decode_entities("&amp b;"), "&amp b;");
        assert_eq!(decode_entities("&#X41;"), "A");
    }

    #[test]
    fn test_long_ampersand_run_kept_literally() {
        let run = "&".repeat(200_000);
        assert_eq!(decode_entities(&run), run);

        // the terminator is far beyond any reference length
        let far = format!("&{};", "a".repeat(100_000));
        assert_eq!(decode_entities(&far), far);

        let mixed = format!("{}&lt;", "& ".repeat(50_000));
        assert!(decode_entities(&mixed).ends_with("& <"));
    }

    #[test]
    fn test_unterminated_comment_strict() {
        let err = tokens("<a><!-- oops", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, column: 4, .. }), "{err:?}");
    }

    #[test]
    fn test_unterminated_comment_lenient() {
        let toks = tokens("<a><!-- oops", &ParseOptions::default().lenient()).unwrap();
        assert_eq!(
            toks,
            vec![Token::OpenTag("a"), Token::Text(Cow::Borrowed("<!-- oops"))]
        );
    }

    #[test]
    fn test_unterminated_tag() {
        let err = tokens("<a href=\"x", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));

        let toks = tokens("x<a href=\"x", &ParseOptions::default().lenient()).unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Text(Cow::Borrowed("x")),
                Token::Text(Cow::Borrowed("<a href=\"x")),
            ]
        );
    }

    #[test]
    fn test_stray_lt() {
        assert!(tokens("a < b", &ParseOptions::default()).is_err());
        let toks = tokens("a < b", &ParseOptions::default().lenient()).unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Text(Cow::Borrowed("a ")),
                Token::Text(Cow::Borrowed("<")),
                Token::Text(Cow::Borrowed(" b")),
            ]
        );
    }

    #[test]
    fn test_unquoted_attribute_value() {
        assert!(tokens("<a b=c>", &ParseOptions::default()).is_err());
        let toks = tokens("<a b=c>", &ParseOptions::default().lenient()).unwrap();
        assert_eq!(toks, vec![Token::OpenTag("a"), attr("b", "c")]);
    }

    #[test]
    fn test_offsets() {
        let mut tokenizer = Tokenizer::new("ab<c d='1'/>", &ParseOptions::default());
        assert!(matches!(tokenizer.next(), Some(Ok(Token::Text(_)))));
        assert_eq!(tokenizer.offset(), 0);
        assert!(matches!(tokenizer.next(), Some(Ok(Token::OpenTag("c")))));
        assert_eq!(tokenizer.offset(), 2);
        assert!(matches!(tokenizer.next(), Some(Ok(Token::Attribute(_)))));
        assert_eq!(tokenizer.offset(), 2);
        assert!(matches!(tokenizer.next(), Some(Ok(Token::SelfCloseTag))));
        assert!(tokenizer.next().is_none());
    }
}
