//! Errors surfaced by parsing, selector compilation, mutation and JSON import.

use facet::Facet;

/// Result alias used throughout sprig.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while building, querying or editing a document.
///
/// Positions are 1-based; columns count characters, not bytes.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum Error {
    /// syntax error at {line}:{column}: {message}
    Syntax {
        message: String,
        line: u32,
        column: u32,
    },

    /// structure error at {line}:{column}: {message}
    Structure {
        message: String,
        line: u32,
        column: u32,
    },

    /// invalid selector clause '{clause}': {reason}
    SelectorSyntax { clause: String, reason: String },

    /// invalid tree operation: {message}
    Hierarchy { message: String },

    /// unknown node kind '{name}'
    UnknownKind { name: String },

    /// invalid JSON document: {message}
    Json { message: String },

    /// i/o error on {path}: {message}
    Io { path: String, message: String },
}

impl Error {
    pub(crate) fn syntax(input: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(input, offset);
        Error::Syntax {
            message: message.into(),
            line,
            column,
        }
    }

    pub(crate) fn structure(input: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(input, offset);
        Error::Structure {
            message: message.into(),
            line,
            column,
        }
    }

    pub(crate) fn selector(clause: &str, reason: &str) -> Self {
        Error::SelectorSyntax {
            clause: clause.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Error::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    /// The `(line, column)` position for syntax and structure errors.
    pub fn position(&self) -> Option<(u32, u32)> {
        match self {
            Error::Syntax { line, column, .. } | Error::Structure { line, column, .. } => {
                Some((*line, *column))
            }
            _ => None,
        }
    }
}

/// Maps a byte offset to a 1-based line and column.
fn line_column(input: &str, offset: usize) -> (u32, u32) {
    let mut end = offset.min(input.len());
    while !input.is_char_boundary(end) {
        end -= 1;
    }
    let before = &input[..end];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line as u32, column as u32)
}
