//! All error types for the cldrpack crate.
//!
//! These are returned from all fallible operations (XML parsing, record
//! extraction, serialization, etc.). Structural errors such as a malformed
//! alias path, an interval-format element the category model cannot
//! represent, or a source file without a revision marker abort the whole
//! run; pattern errors are recoverable per item and only logged by the
//! extractor.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("JSON dump error: {0}")]
    JsonDump(#[from] serde_json::Error),

    #[error("record encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("invalid XML structure: {0}")]
    InvalidXml(String),

    #[error("malformed alias segment `{segment}` in path `{path}`")]
    MalformedAliasPath { path: String, segment: String },

    #[error("unsupported interval format element `{0}`")]
    UnsupportedIntervalFormat(String),

    #[error("no revision marker found in {}", .0.display())]
    MissingRevision(PathBuf),

    #[error("plural rule parse error: {0}")]
    PluralRule(String),

    #[error("malformed pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

impl Error {
    /// Creates a structural-XML error from any displayable message.
    pub fn invalid_xml(message: impl Into<String>) -> Self {
        Error::InvalidXml(message.into())
    }

    /// Creates a recoverable pattern error for the given pattern text.
    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Pattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}
