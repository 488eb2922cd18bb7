//! Incremental build driver and on-disk record format.
//!
//! Every source file embeds a Subversion-style revision marker near its
//! top; the compiled `.dat` carries the same revision in a fixed header
//! ahead of the record body, so the staleness check reads nine bytes
//! instead of decoding a record. A destination is rebuilt when it is
//! missing, when its stored revision differs from the source, or when the
//! force flag is set.
//!
//! # File layout
//!
//! ```text
//! <out>/
//! ├── global.dat             # GlobalData (header + bincode body)
//! └── locale-data/
//!     ├── root.dat           # one LocaleRecord per locale source
//!     ├── en.dat
//!     └── en.dat.json        # optional debug mirror (--json)
//! ```

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    error::Error,
    locale::{LocaleContext, extract_locale},
    supplemental::{SupplementalDocs, build_global_data, extract_plural_rules, territory_containment},
    types::{GlobalData, LocaleRecord},
    xml::Document,
};

const DAT_MAGIC: &[u8; 4] = b"CLDR";
const DAT_FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 9;

lazy_static! {
    static ref REVISION_RE: Regex = Regex::new(r#"version number="\$Revision: (\d+)"#).unwrap();
}

/// One import run's configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Root of the CLDR source tree.
    pub source_dir: PathBuf,
    /// Destination directory for compiled records.
    pub dest_dir: PathBuf,
    /// Rebuild every destination even if it looks up to date.
    pub force: bool,
    /// Also write a human-readable JSON mirror next to each record.
    pub dump_json: bool,
}

impl Options {
    pub fn new(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Options {
            source_dir: source_dir.into(),
            dest_dir: dest_dir.into(),
            force: false,
            dump_json: false,
        }
    }
}

/// Counts of what one run actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Reads the revision stamp embedded near the top of a source file. The
/// marker must appear within the first 4 KiB; a source without one cannot
/// participate in incremental builds and fails the run.
pub fn read_revision(path: &Path) -> Result<u32, Error> {
    let mut head = vec![0u8; 4096];
    let mut file = File::open(path)?;
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    let text = String::from_utf8_lossy(&head[..filled]);
    REVISION_RE
        .captures(&text)
        .and_then(|captures| captures[1].parse().ok())
        .ok_or_else(|| Error::MissingRevision(path.to_path_buf()))
}

/// Revision stored in an existing `.dat` header, or `None` when the file
/// is missing or not a record.
fn stored_revision(path: &Path) -> Option<u32> {
    let mut header = [0u8; HEADER_LEN];
    let mut file = File::open(path).ok()?;
    file.read_exact(&mut header).ok()?;
    if &header[..4] != DAT_MAGIC || header[4] != DAT_FORMAT_VERSION {
        return None;
    }
    Some(u32::from_le_bytes([header[5], header[6], header[7], header[8]]))
}

fn needs_build(dst: &Path, source_revision: u32, force: bool) -> bool {
    force || stored_revision(dst) != Some(source_revision)
}

fn write_datafile<T: Serialize>(
    path: &Path,
    revision: u32,
    data: &T,
    debug_json: Option<serde_json::Value>,
) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(DAT_MAGIC)?;
    writer.write_all(&[DAT_FORMAT_VERSION])?;
    writer.write_all(&revision.to_le_bytes())?;
    bincode::serialize_into(&mut writer, data)?;
    writer.flush()?;

    if let Some(json) = debug_json {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let json_path = path.with_file_name(format!("{file_name}.json"));
        let mut json_writer = BufWriter::new(File::create(json_path)?);
        serde_json::to_writer_pretty(&mut json_writer, &json)?;
        json_writer.flush()?;
    }
    Ok(())
}

fn read_record_body<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    if &header[..4] != DAT_MAGIC || header[4] != DAT_FORMAT_VERSION {
        return Err(Error::invalid_xml(format!(
            "{} is not a compiled record",
            path.display()
        )));
    }
    Ok(bincode::deserialize_from(reader)?)
}

/// Reads back a compiled locale record.
pub fn read_locale_record(path: &Path) -> Result<LocaleRecord, Error> {
    read_record_body(path)
}

/// Reads back the compiled global tables.
pub fn read_global_data(path: &Path) -> Result<GlobalData, Error> {
    read_record_body(path)
}

/// Runs the full import: global tables first, then one record per locale
/// file, root first and the rest in filename-length order.
pub fn run(options: &Options) -> Result<RunSummary, Error> {
    let src = &options.source_dir;
    let supplemental_dir = src.join("supplemental");
    let sup_path = supplemental_dir.join("supplementalData.xml");
    let sup_revision = read_revision(&sup_path)?;

    let docs = SupplementalDocs {
        data: Document::read_from(&sup_path)?,
        metadata: Document::read_from(supplemental_dir.join("supplementalMetadata.xml"))?,
        likely: Document::read_from(supplemental_dir.join("likelySubtags.xml"))?,
        windows_zones: Document::read_from(supplemental_dir.join("windowsZones.xml"))?,
        meta_zones: Document::read_from(supplemental_dir.join("metaZones.xml"))?,
        bcp47_timezone: Document::read_from(src.join("bcp47").join("timezone.xml"))?,
    };

    let locale_dest = options.dest_dir.join("locale-data");
    fs::create_dir_all(&locale_dest)?;

    let mut summary = RunSummary::default();

    let global_path = options.dest_dir.join("global.dat");
    if needs_build(&global_path, sup_revision, options.force) {
        let global = build_global_data(&docs, sup_revision)?;
        let json = options.dump_json.then(|| global.debug_json());
        write_datafile(&global_path, sup_revision, &global, json)?;
        info!(path = %global_path.display(), revision = sup_revision, "wrote global tables");
        summary.written += 1;
    } else {
        debug!(path = %global_path.display(), "global tables up to date");
        summary.skipped += 1;
    }

    // Supplemental inputs the per-locale extraction depends on; all of
    // them must exist before the first locale file is opened.
    let containment = territory_containment(&docs.data)?;
    let plural_rules =
        extract_plural_rules(&Document::read_from(supplemental_dir.join("plurals.xml"))?)?;
    let ordinal_rules =
        extract_plural_rules(&Document::read_from(supplemental_dir.join("ordinals.xml"))?)?;
    let ctx = LocaleContext {
        supplemental: &docs.data,
        containment: &containment,
        plural_rules: &plural_rules,
        ordinal_rules: &ordinal_rules,
    };

    // root.xml goes first so log and dump order stays deterministic; the
    // rest sort by filename length, shortest (most general) locales first.
    let main_dir = src.join("main");
    let mut filenames: Vec<String> = fs::read_dir(&main_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".xml") && name != "root.xml")
        .collect();
    filenames.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    filenames.insert(0, "root.xml".to_string());

    for filename in &filenames {
        let stem = filename.trim_end_matches(".xml");
        let full_path = main_dir.join(filename);
        let data_path = locale_dest.join(format!("{stem}.dat"));

        let revision = read_revision(&full_path)?;
        if !needs_build(&data_path, revision, options.force) {
            debug!(file = filename.as_str(), "up to date");
            summary.skipped += 1;
            continue;
        }

        let tree = Document::read_from(&full_path)?;
        let record = extract_locale(&tree, revision, &ctx, filename)?;
        let json = options.dump_json.then(|| record.debug_json());
        write_datafile(&data_path, revision, &record, json)?;
        summary.written += 1;
    }

    info!(
        written = summary.written,
        skipped = summary.skipped,
        "import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_regex() {
        let text = r#"<?xml version="1.0" encoding="UTF-8" ?>
<!DOCTYPE ldml SYSTEM "../../common/dtd/ldml.dtd">
<ldml>
    <identity>
        <version number="$Revision: 9061 $"/>
    </identity>
</ldml>"#;
        let captures = REVISION_RE.captures(text).unwrap();
        assert_eq!(&captures[1], "9061");
    }

    #[test]
    fn test_header_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.dat");
        let record = LocaleRecord::new(77);
        write_datafile(&path, 77, &record, None).unwrap();
        assert_eq!(stored_revision(&path), Some(77));
        assert!(needs_build(&path, 78, false));
        assert!(!needs_build(&path, 77, false));
        assert!(needs_build(&path, 77, true));
        let back = read_locale_record(&path).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_missing_destination_needs_build() {
        assert!(needs_build(Path::new("/nonexistent/x.dat"), 1, false));
    }

    #[test]
    fn test_missing_revision_marker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.xml");
        fs::write(&path, "<ldml/>").unwrap();
        assert!(matches!(
            read_revision(&path),
            Err(Error::MissingRevision(_))
        ));
    }

    #[test]
    fn test_json_mirror_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.dat");
        let record = LocaleRecord::new(5);
        write_datafile(&path, 5, &record, Some(record.debug_json())).unwrap();
        let json_text = fs::read_to_string(dir.path().join("en.dat.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&json_text).unwrap();
        assert_eq!(json["_version"], 5);
    }
}
