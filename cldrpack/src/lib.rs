#![forbid(unsafe_code)]
//! Compiler for CLDR XML locale data.
//!
//! Walks a CLDR source tree and produces one compact binary record per
//! locale plus a single record of cross-locale tables. All conversion runs
//! through the owned [`xml::Document`] model; records are written through
//! the incremental [`importer`] driver, which skips destinations whose
//! embedded source revision is already current.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cldrpack::importer::{run, Options};
//!
//! let options = Options::new("path/to/cldr", "path/to/out");
//! run(&options)?;
//! # Ok::<(), cldrpack::Error>(())
//! ```
//!
//! # What gets extracted
//!
//! - **Per locale**: display names, Gregorian calendar data, number,
//!   currency and unit formats, date fields and interval formats, with
//!   draft/alt override suppression and symbolic aliases kept unresolved.
//! - **Globally**: timezone↔territory tables, windows-zone and metazone
//!   mappings, identifier alias tables, likely subtags, per-territory
//!   currency history, currency fractions and language populations.

pub mod alias;
pub mod error;
pub mod importer;
pub mod locale;
pub mod pattern;
pub mod plural;
pub mod supplemental;
pub mod types;
pub mod xml;

// Re-export most used types for easy consumption
pub use crate::{
    alias::Alias,
    error::Error,
    plural::PluralRule,
    types::{GlobalData, Key, LocaleRecord, Value},
};
