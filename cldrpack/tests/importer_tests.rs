//! End-to-end tests over a miniature CLDR corpus: a full import run, the
//! incremental skip behavior, and the contents of the records it writes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use cldrpack::importer::{Options, read_global_data, read_locale_record, run};
use cldrpack::types::{CldrDate, Key, Value};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

const SUPPLEMENTAL_DATA: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<supplementalData>
    <version number="$Revision: 9061 $"/>
    <currencyData>
        <fractions>
            <info iso4217="JPY" digits="0" rounding="0"/>
        </fractions>
        <region iso3166="US">
            <currency iso4217="USN" tender="false"/>
            <currency iso4217="USD" from="1792-01-01"/>
        </region>
    </currencyData>
    <territoryContainment>
        <group type="001" contains="019 150"/>
        <group type="019" contains="021"/>
        <group type="021" contains="US CA"/>
        <group type="150" contains="155"/>
        <group type="155" contains="DE FR"/>
    </territoryContainment>
    <weekData>
        <minDays count="1" territories="001"/>
        <minDays count="4" territories="150"/>
        <firstDay day="sun" territories="001"/>
        <firstDay day="mon" territories="150"/>
        <weekendStart day="sat" territories="001"/>
        <weekendEnd day="sun" territories="001"/>
    </weekData>
    <parentLocales>
        <parentLocale parent="root" locales="az_Cyrl az_Arab"/>
    </parentLocales>
    <territoryInfo>
        <territory type="US">
            <languagePopulation type="en" populationPercent="96" officialStatus="de_facto_official"/>
        </territory>
    </territoryInfo>
</supplementalData>
"#;

const SUPPLEMENTAL_METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<supplementalMetadata>
    <version number="$Revision: 9061 $"/>
    <metadata>
        <alias>
            <languageAlias type="iw" replacement="he"/>
            <languageAlias type="zh_CN" replacement="zh_Hans_CN"/>
            <territoryAlias type="SU" replacement="RU AM AZ"/>
            <scriptAlias type="Qaai" replacement="Zinh"/>
            <variantAlias type="heploc" replacement="alalc97"/>
        </alias>
    </metadata>
</supplementalMetadata>
"#;

const LIKELY_SUBTAGS: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<supplementalData>
    <version number="$Revision: 9061 $"/>
    <likelySubtags>
        <likelySubtag from="en" to="en_Latn_US"/>
        <likelySubtag from="de" to="de_Latn_DE"/>
    </likelySubtags>
</supplementalData>
"#;

const WINDOWS_ZONES: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<supplementalData>
    <version number="$Revision: 9061 $"/>
    <windowsZones>
        <mapTimezones>
            <mapZone other="Pacific Standard Time" territory="001" type="America/Los_Angeles"/>
            <mapZone other="Pacific Standard Time" territory="US" type="America/Los_Angeles"/>
        </mapTimezones>
    </windowsZones>
</supplementalData>
"#;

const META_ZONES: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<supplementalData>
    <version number="$Revision: 9061 $"/>
    <metaZones>
        <metazoneInfo>
            <timezone type="America/Los_Angeles">
                <usesMetazone mzone="America_Pacific"/>
            </timezone>
        </metazoneInfo>
    </metaZones>
</supplementalData>
"#;

const PLURALS: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<supplementalData>
    <version number="$Revision: 9061 $"/>
    <plurals type="cardinal">
        <pluralRules locales="en de">
            <pluralRule count="one">i = 1 and v = 0 @integer 1</pluralRule>
            <pluralRule count="other"> @integer 0, 2~16</pluralRule>
        </pluralRules>
        <pluralRules locales="ja">
            <pluralRule count="other"> @integer 0~15</pluralRule>
        </pluralRules>
    </plurals>
</supplementalData>
"#;

const ORDINALS: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<supplementalData>
    <version number="$Revision: 9061 $"/>
    <plurals type="ordinal">
        <pluralRules locales="en">
            <pluralRule count="one">n % 10 = 1 and n % 100 != 11 @integer 1, 21</pluralRule>
            <pluralRule count="other"> @integer 0, 4~18</pluralRule>
        </pluralRules>
    </plurals>
</supplementalData>
"#;

const BCP47_TIMEZONE: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<ldmlBCP47>
    <keyword>
        <key name="tz">
            <type name="uslax" alias="America/Los_Angeles US/Pacific"/>
            <type name="utc" alias="Etc/UTC"/>
        </key>
    </keyword>
</ldmlBCP47>
"#;

const ROOT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<ldml>
    <identity>
        <version number="$Revision: 9061 $"/>
        <language type="root"/>
    </identity>
</ldml>
"#;

const EN_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<ldml>
    <identity>
        <version number="$Revision: 9061 $"/>
        <language type="en"/>
    </identity>
    <localeDisplayNames>
        <territories>
            <territory type="US">United States</territory>
            <territory type="US" alt="short">US of A</territory>
        </territories>
    </localeDisplayNames>
    <dates>
        <calendars>
            <calendar type="gregorian">
                <months>
                    <monthContext type="format">
                        <monthWidth type="wide">
                            <month type="1">January</month>
                        </monthWidth>
                    </monthContext>
                </months>
                <dateFormats>
                    <dateFormatLength type="full">
                        <dateFormat><pattern>EEEE, MMMM d, y</pattern></dateFormat>
                    </dateFormatLength>
                </dateFormats>
                <dateTimeFormats>
                    <intervalFormats>
                        <intervalFormatFallback>{0} – {1}</intervalFormatFallback>
                        <intervalFormatItem id="MMMd">
                            <greatestDifference id="d">MMM d–d</greatestDifference>
                        </intervalFormatItem>
                    </intervalFormats>
                </dateTimeFormats>
            </calendar>
        </calendars>
    </dates>
    <numbers>
        <symbols>
            <decimal>.</decimal>
            <group>,</group>
        </symbols>
        <decimalFormats>
            <decimalFormatLength>
                <decimalFormat><pattern>#,##0.###</pattern></decimalFormat>
            </decimalFormatLength>
        </decimalFormats>
        <currencies>
            <currency type="USD">
                <displayName>US Dollar</displayName>
                <symbol>$</symbol>
            </currency>
        </currencies>
    </numbers>
</ldml>
"#;

fn build_corpus(root: &Path) {
    write(root, "supplemental/supplementalData.xml", SUPPLEMENTAL_DATA);
    write(
        root,
        "supplemental/supplementalMetadata.xml",
        SUPPLEMENTAL_METADATA,
    );
    write(root, "supplemental/likelySubtags.xml", LIKELY_SUBTAGS);
    write(root, "supplemental/windowsZones.xml", WINDOWS_ZONES);
    write(root, "supplemental/metaZones.xml", META_ZONES);
    write(root, "supplemental/plurals.xml", PLURALS);
    write(root, "supplemental/ordinals.xml", ORDINALS);
    write(root, "bcp47/timezone.xml", BCP47_TIMEZONE);
    write(root, "main/root.xml", ROOT_XML);
    write(root, "main/en.xml", EN_XML);
}

fn map_of<'a>(value: Option<&'a Value>) -> &'a BTreeMap<Key, Value> {
    match value {
        Some(Value::Map(map)) => map,
        other => panic!("expected map, got {other:?}"),
    }
}

#[test]
fn test_full_import_and_record_contents() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("cldr");
    let out = dir.path().join("out");
    build_corpus(&src);

    let options = Options::new(&src, &out);
    let summary = run(&options).unwrap();
    // global.dat, root.dat, en.dat
    assert_eq!(summary.written, 3);
    assert_eq!(summary.skipped, 0);

    let record = read_locale_record(&out.join("locale-data/en.dat")).unwrap();
    assert_eq!(record.version, 9061);

    // The alt entry lost to the plain one; nothing else is in the table.
    let territories = map_of(record.get("territories"));
    assert_eq!(territories.len(), 1);
    assert_eq!(
        territories[&Key::from("US")],
        Value::from("United States")
    );

    // No identity territory: the world code applies, and the world-scoped
    // week rows win.
    let week = map_of(record.get("week_data"));
    assert_eq!(week[&Key::from("min_days")], Value::Int(1));
    assert_eq!(week[&Key::from("first_day")], Value::Int(6));

    // "en" (not "en_001") keys the rule tables.
    assert!(matches!(record.get("plural_form"), Some(Value::PluralRule(_))));
    assert!(matches!(record.get("ordinal_form"), Some(Value::PluralRule(_))));

    let months = map_of(record.get("months"));
    let Value::Map(format_ctx) = &months[&Key::from("format")] else {
        panic!();
    };
    let Value::Map(wide) = &format_ctx[&Key::from("wide")] else {
        panic!();
    };
    assert_eq!(wide[&Key::Int(1)], Value::from("January"));

    let date_formats = map_of(record.get("date_formats"));
    assert!(matches!(
        date_formats[&Key::from("full")],
        Value::DateTimePattern(_)
    ));

    let intervals = map_of(record.get("interval_formats"));
    assert_eq!(intervals[&Key::Null], Value::from("{0} – {1}"));

    // Root record exists and was stamped from its own file.
    let root_record = read_locale_record(&out.join("locale-data/root.dat")).unwrap();
    assert_eq!(root_record.version, 9061);
}

#[test]
fn test_global_tables() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("cldr");
    let out = dir.path().join("out");
    build_corpus(&src);
    run(&Options::new(&src, &out)).unwrap();

    let global = read_global_data(&out.join("global.dat")).unwrap();
    assert_eq!(global.version, 9061);

    // Tender currency first despite the document order.
    let us = &global.territory_currencies["US"];
    assert_eq!(us[0].code, "USD");
    assert_eq!(us[0].from, Some(CldrDate::new(1792, 1, 1)));
    assert_eq!(us[1].code, "USN");
    assert!(!us[1].tender);

    assert_eq!(
        global.windows_zone_mapping["Pacific Standard Time"],
        "America/Los_Angeles"
    );
    assert_eq!(global.zone_aliases["US/Pacific"], "America/Los_Angeles");
    assert_eq!(global.zone_territories["Etc/UTC"], "001");
    assert_eq!(global.meta_zones["America/Los_Angeles"], "America_Pacific");

    assert_eq!(global.language_aliases["iw"], "he");
    assert!(!global.language_aliases.contains_key("zh_CN"));
    assert_eq!(global.likely_subtags["en"], "en_Latn_US");
    assert_eq!(global.parent_exceptions["az_Arab"], "root");
    assert_eq!(global.currency_fractions["JPY"].digits, 0);
    assert_eq!(
        global.territory_languages["US"]["en"].official_status.as_deref(),
        Some("de_facto_official")
    );
}

#[test]
fn test_second_run_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("cldr");
    let out = dir.path().join("out");
    build_corpus(&src);

    let options = Options::new(&src, &out);
    run(&options).unwrap();

    let summary = run(&options).unwrap();
    assert_eq!(summary.written, 0);
    assert_eq!(summary.skipped, 3);

    let mut forced = options.clone();
    forced.force = true;
    let summary = run(&forced).unwrap();
    assert_eq!(summary.written, 3);
    assert_eq!(summary.skipped, 0);
}

#[test]
fn test_revision_change_triggers_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("cldr");
    let out = dir.path().join("out");
    build_corpus(&src);

    let options = Options::new(&src, &out);
    run(&options).unwrap();

    // Bump only en.xml's revision; everything else stays current.
    write(
        &src,
        "main/en.xml",
        &EN_XML.replace("$Revision: 9061 $", "$Revision: 9100 $"),
    );
    let summary = run(&options).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 2);

    let record = read_locale_record(&out.join("locale-data/en.dat")).unwrap();
    assert_eq!(record.version, 9100);
}

#[test]
fn test_json_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("cldr");
    let out = dir.path().join("out");
    build_corpus(&src);

    let mut options = Options::new(&src, &out);
    options.dump_json = true;
    run(&options).unwrap();

    let json_text = fs::read_to_string(out.join("locale-data/en.dat.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&json_text).unwrap();
    assert_eq!(json["_version"], 9061);
    assert_eq!(json["territories"]["US"], "United States");
    // Compiled rules render via their abstract textual form.
    assert_eq!(json["plural_form"], "one: i = 1 and v = 0");
    assert_eq!(
        json["ordinal_form"],
        "one: n % 10 = 1 and n % 100 != 11"
    );
    // Compiled patterns render as their source text.
    assert_eq!(json["date_formats"]["full"], "EEEE, MMMM d, y");

    assert!(out.join("global.dat.json").exists());
}

#[test]
fn test_missing_supplemental_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("cldr");
    let out = dir.path().join("out");
    build_corpus(&src);
    fs::remove_file(src.join("supplemental/plurals.xml")).unwrap();

    assert!(run(&Options::new(&src, &out)).is_err());
}
