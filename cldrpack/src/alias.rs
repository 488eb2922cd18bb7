//! Symbolic cross-references between record tree locations.
//!
//! A CLDR category node may be an `<alias path="…"/>` element instead of
//! concrete data. The path is an XPath-like expression relative to the node
//! where the alias appears; [`translate_alias`] rewrites it into an ordered
//! key path against the record tree. Aliases are stored as data; resolving
//! them needs the full set of records and is the consumer's job.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

lazy_static! {
    static ref NAME_RE: Regex = Regex::new(r"^\w+$").unwrap();
    static ref TYPE_ATTR_RE: Regex = Regex::new(r"^\w+\[@type='(.*?)'\]$").unwrap();
}

/// XML element names whose record-tree key differs from the tag.
pub(crate) fn map_name(name: &str) -> &str {
    match name {
        "dateFormats" => "date_formats",
        "dateTimeFormats" => "datetime_formats",
        "eraAbbr" => "abbreviated",
        "eraNames" => "wide",
        "eraNarrow" => "narrow",
        "timeFormats" => "time_formats",
        other => other,
    }
}

/// An unresolved pointer to another location in the record tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub keys: Vec<String>,
}

impl Alias {
    pub fn new(keys: Vec<String>) -> Self {
        Alias { keys }
    }
}

/// Translates an alias path expression into a key path, starting from the
/// key-path context where the alias was encountered.
///
/// A `..` segment pops one context element; `name[@type='value']` appends
/// the literal `value`; a bare identifier is appended after tag-name
/// normalization. Any other segment shape means the corpus contains a
/// reference this model cannot represent, which is fatal for the run.
pub fn translate_alias(context: &[&str], path: &str) -> Result<Vec<String>, Error> {
    let mut keys: Vec<String> = context.iter().map(|s| s.to_string()).collect();
    for part in path.split('/') {
        if part == ".." {
            keys.pop();
        } else if let Some(captures) = TYPE_ATTR_RE.captures(part) {
            keys.push(captures[1].to_string());
        } else if NAME_RE.is_match(part) {
            keys.push(map_name(part).to_string());
        } else {
            return Err(Error::MalformedAliasPath {
                path: path.to_string(),
                segment: part.to_string(),
            });
        }
    }
    Ok(keys)
}
