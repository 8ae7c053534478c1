//! Small document-tree toolkit for XML and HTML-like markup.
//!
//! sprig provides:
//! - **Parsing**: a tokenizer and tree builder with a strict (well-formed XML)
//!   and a lenient (HTML-style recovery) mode
//! - **Arena DOM**: every node lives in one `indextree` arena owned by a
//!   [`Document`]; nodes are addressed by [`NodeId`]
//! - **Selectors**: tag globs and `name=value` attribute globs
//! - **Mutation**: moving, replacing, inserting and removing nodes
//! - **Serialization**: markup and JSON, both round-trip stable
//! - **Walking**: per-kind visitor callbacks in document order
//!
//! # Example
//!
//! ```rust
//! use sprig::{ParseOptions, parse, parse_json};
//!
//! let mut doc = parse(
//!     r#"<heroes><hero name="Zabu"/><friends><hero name="Coco"/></friends></heroes>"#,
//!     &ParseOptions::default(),
//! )
//! .unwrap();
//!
//! let heroes = doc.find(doc.root(), "heroes").unwrap().unwrap();
//! assert_eq!(doc.find_all(heroes, ["name=*"]).unwrap().len(), 2);
//! assert_eq!(doc.find_all_children(heroes, "hero").unwrap().len(), 1);
//!
//! let zabu = doc.find(heroes, ["name=Zabu"]).unwrap().unwrap();
//! doc.replace_with(zabu, "gone").unwrap();
//! assert_eq!(
//!     doc.to_xml(),
//!     r#"<heroes>gone<friends><hero name="Coco"/></friends></heroes>"#
//! );
//!
//! let copy = parse_json(&doc.to_json().unwrap()).unwrap();
//! assert_eq!(copy.to_xml(), doc.to_xml());
//! ```

mod tracing_macros;

pub mod arena_dom;
mod error;
pub mod json;
pub mod mutate;
pub mod parser;
pub mod select;
pub mod serialize;
pub mod tokenizer;
pub mod walk;

pub use arena_dom::{Attribute, Attributes, Document, ElementData, Kind, NodeData, NodeId, NodeKind};
pub use error::{Error, Result};
pub use json::{JsonNode, parse_json};
pub use mutate::Content;
pub use parser::{ParseOptions, parse, parse_bytes, parse_file};
pub use select::{Clause, Glob, IntoSelector, Selector};
pub use serialize::{SerializeOptions, serialize_node};
pub use tokenizer::{Token, Tokenizer, decode_entities};
pub use walk::{Handler, Walker};
