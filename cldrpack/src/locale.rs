//! Per-locale record extraction.
//!
//! One pass over a `main/<locale>.xml` tree builds a [`LocaleRecord`]: each
//! category constructs its own value and the record stores it once. The
//! draft/alt override policy is a single reducer, [`merge_pref`], applied
//! per natural key: a flagged candidate loses only to a value that is
//! already present. A category whose source node is an `<alias>` element is
//! stored as an unresolved [`Alias`] instead of concrete data.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tracing::{info, warn};

use crate::{
    alias::{Alias, map_name, translate_alias},
    error::Error,
    pattern::{parse_date_pattern, parse_number_pattern, split_interval_pattern},
    plural::PluralRule,
    types::{Key, LocaleRecord, Value},
    xml::{Document, Element},
};

/// Supplemental context consulted while extracting each locale file. Built
/// once per run, before any locale is processed.
pub struct LocaleContext<'a> {
    pub supplemental: &'a Document,
    pub containment: &'a BTreeMap<String, BTreeSet<String>>,
    pub plural_rules: &'a BTreeMap<String, Arc<PluralRule>>,
    pub ordinal_rules: &'a BTreeMap<String, Arc<PluralRule>>,
}

/// The override-suppression reducer: a draft/alt candidate is dropped iff
/// the key already holds a value; anything else is stored, so an alternate
/// may seed an empty slot and a later plain value still overwrites it.
fn merge_pref(map: &mut BTreeMap<Key, Value>, key: Key, value: Value, alternate: bool) {
    if alternate && map.contains_key(&key) {
        return;
    }
    map.insert(key, value);
}

fn is_flagged(elem: &Element) -> bool {
    elem.has_attr("draft") || elem.has_attr("alt")
}

fn weekday_index(name: &str) -> Option<i64> {
    match name {
        "mon" => Some(0),
        "tue" => Some(1),
        "wed" => Some(2),
        "thu" => Some(3),
        "fri" => Some(4),
        "sat" => Some(5),
        "sun" => Some(6),
        _ => None,
    }
}

fn elem_text(elem: &Element) -> Value {
    Value::Str(elem.text().unwrap_or("").to_string())
}

/// Extracts the full record for one locale source tree.
pub fn extract_locale(
    tree: &Document,
    version: u32,
    ctx: &LocaleContext<'_>,
    name: &str,
) -> Result<LocaleRecord, Error> {
    let language = tree
        .find(".//identity/language")
        .and_then(|e| e.attr("type"))
        .map(String::from);
    let territory = tree
        .find(".//identity/territory")
        .and_then(|e| e.attr("type"))
        .unwrap_or("001")
        .to_string();
    let empty = BTreeSet::new();
    let regions = ctx.containment.get(&territory).unwrap_or(&empty);

    info!(
        file = name,
        language = language.as_deref().unwrap_or("-"),
        territory = territory.as_str(),
        "processing locale"
    );

    let mut record = LocaleRecord::new(version);

    // Plural rules are keyed by `language[_territory]`, with the world
    // territory left out of the identifier.
    let mut id_parts: Vec<&str> = Vec::new();
    if let Some(lang) = language.as_deref() {
        id_parts.push(lang);
    }
    if territory != "001" {
        id_parts.push(&territory);
    }
    let locale_id = id_parts.join("_");
    if let Some(rule) = ctx.plural_rules.get(&locale_id) {
        record.insert("plural_form", Value::PluralRule(Arc::clone(rule)));
    }
    if let Some(rule) = ctx.ordinal_rules.get(&locale_id) {
        record.insert("ordinal_form", Value::PluralRule(Arc::clone(rule)));
    }

    // <localeDisplayNames>
    record.insert(
        "territories",
        extract_display_names(tree, ".//territories/territory")?,
    );
    record.insert(
        "languages",
        extract_display_names(tree, ".//languages/language")?,
    );
    record.insert(
        "variants",
        extract_display_names(tree, ".//variants/variant")?,
    );
    record.insert("scripts", extract_display_names(tree, ".//scripts/script")?);
    record.insert("list_patterns", extract_list_patterns(tree)?);

    // <dates>
    record.insert(
        "week_data",
        extract_week_data(ctx.supplemental, &territory, regions)?,
    );
    record.insert("zone_formats", extract_zone_formats(tree));
    record.insert(
        "time_zones",
        extract_zone_names(tree, ".//timeZoneNames/zone")?,
    );
    record.insert(
        "meta_zones",
        extract_zone_names(tree, ".//timeZoneNames/metazone")?,
    );

    // Gregorian calendar only; other calendar systems are out of scope.
    let mut months = Value::Map(BTreeMap::new());
    let mut days = Value::Map(BTreeMap::new());
    let mut quarters = Value::Map(BTreeMap::new());
    let mut eras = Value::Map(BTreeMap::new());
    let mut periods = BTreeMap::new();
    let mut date_formats = Value::Map(BTreeMap::new());
    let mut time_formats = Value::Map(BTreeMap::new());
    let mut datetime_formats = Value::Map(BTreeMap::new());
    let mut datetime_skeletons = BTreeMap::new();
    let mut interval_formats = BTreeMap::new();
    for calendar in tree.find_all(".//calendars/calendar") {
        if calendar.attr("type") != Some("gregorian") {
            continue;
        }
        extract_calendar_grid(
            calendar,
            "months",
            "months/monthContext",
            "monthWidth",
            "month",
            &mut months,
            &int_key,
            &is_flagged,
        )?;
        extract_calendar_grid(
            calendar,
            "days",
            "days/dayContext",
            "dayWidth",
            "day",
            &mut days,
            &day_key,
            // Weekday entries keep the original asymmetric rule: an entry
            // yields to an existing one when draft is set or alt is absent.
            &|elem| elem.has_attr("draft") || !elem.has_attr("alt"),
        )?;
        extract_calendar_grid(
            calendar,
            "quarters",
            "quarters/quarterContext",
            "quarterWidth",
            "quarter",
            &mut quarters,
            &int_key,
            &is_flagged,
        )?;
        extract_eras(calendar, &mut eras)?;
        extract_day_periods(calendar, &mut periods)?;
        extract_pattern_lengths(
            calendar,
            "dateFormats",
            "dateFormatLength",
            "dateFormat/pattern",
            "date_formats",
            &mut date_formats,
            // Date format lengths only defer to drafts, never to alt.
            &|elem| elem.has_attr("draft"),
        )?;
        extract_pattern_lengths(
            calendar,
            "timeFormats",
            "timeFormatLength",
            "timeFormat/pattern",
            "time_formats",
            &mut time_formats,
            &is_flagged,
        )?;
        extract_datetime_formats(
            calendar,
            &mut datetime_formats,
            &mut datetime_skeletons,
        )?;
        extract_interval_formats(calendar, &mut interval_formats)?;
    }
    record.insert("months", months);
    record.insert("days", days);
    record.insert("quarters", quarters);
    record.insert("eras", eras);
    record.insert("periods", Value::Map(periods));
    record.insert("date_formats", date_formats);
    record.insert("time_formats", time_formats);
    record.insert("datetime_formats", datetime_formats);
    record.insert("datetime_skeletons", Value::Map(datetime_skeletons));
    record.insert("interval_formats", Value::Map(interval_formats));

    // <numbers>
    record.insert("number_symbols", extract_number_symbols(tree));
    record.insert(
        "decimal_formats",
        extract_number_formats(tree, ".//decimalFormats/decimalFormatLength", "decimalFormat/pattern", true)?,
    );
    record.insert(
        "scientific_formats",
        extract_number_formats(tree, ".//scientificFormats/scientificFormatLength", "scientificFormat/pattern", false)?,
    );
    record.insert("currency_formats", extract_currency_formats(tree)?);
    record.insert(
        "percent_formats",
        extract_number_formats(tree, ".//percentFormats/percentFormatLength", "percentFormat/pattern", false)?,
    );
    let (currency_names, currency_names_plural, currency_symbols) = extract_currencies(tree)?;
    record.insert("currency_names", currency_names);
    record.insert("currency_names_plural", currency_names_plural);
    record.insert("currency_symbols", currency_symbols);

    // <units>
    record.insert("unit_patterns", extract_unit_patterns(tree)?);
    record.insert("date_fields", extract_date_fields(tree)?);

    Ok(record)
}

fn extract_display_names(tree: &Document, path: &str) -> Result<Value, Error> {
    let mut map = BTreeMap::new();
    for elem in tree.find_all(path) {
        let key = Key::from(elem.require_attr("type")?);
        merge_pref(&mut map, key, Value::Str(elem.flat_text()), is_flagged(elem));
    }
    Ok(Value::Map(map))
}

/// Only the default (un-typed) list pattern is kept.
fn extract_list_patterns(tree: &Document) -> Result<Value, Error> {
    let mut map = BTreeMap::new();
    for list in tree.find_all(".//listPatterns/listPattern") {
        if list.has_attr("type") {
            continue;
        }
        for part in list.children_named("listPatternPart") {
            map.insert(
                Key::from(part.require_attr("type")?),
                Value::Str(part.flat_text()),
            );
        }
    }
    Ok(Value::Map(map))
}

/// Week facts come from the supplemental data, scoped by territory lists; a
/// row applies when it names the locale's territory or any region that
/// contains it.
fn extract_week_data(
    supplemental: &Document,
    territory: &str,
    regions: &BTreeSet<String>,
) -> Result<Value, Error> {
    let mut map = BTreeMap::new();
    let Some(week) = supplemental.find(".//weekData") else {
        return Ok(Value::Map(map));
    };

    let applies = |elem: &Element| -> Result<bool, Error> {
        Ok(elem
            .require_attr("territories")?
            .split_whitespace()
            .any(|t| t == territory || regions.contains(t)))
    };

    for elem in week.children_named("minDays") {
        if applies(elem)? {
            let count = elem.require_attr("count")?;
            let count: i64 = count
                .parse()
                .map_err(|_| Error::invalid_xml(format!("bad minDays count `{count}`")))?;
            map.insert(Key::from("min_days"), Value::Int(count));
        }
    }
    for (tag, key) in [
        ("firstDay", "first_day"),
        ("weekendStart", "weekend_start"),
        ("weekendEnd", "weekend_end"),
    ] {
        for elem in week.children_named(tag) {
            if applies(elem)? {
                let day = elem.require_attr("day")?;
                let index = weekday_index(day)
                    .ok_or_else(|| Error::invalid_xml(format!("unknown weekday `{day}`")))?;
                map.insert(Key::from(key), Value::Int(index));
            }
        }
    }
    Ok(Value::Map(map))
}

/// Zone display formats: the first non-flagged element of each kind wins;
/// placeholders are rewritten to the runtime's substitution style.
fn extract_zone_formats(tree: &Document) -> Value {
    let mut map = BTreeMap::new();
    let single = [("gmtFormat", "gmt"), ("regionFormat", "region")];
    for (tag, key) in single {
        for elem in tree.find_all(&format!(".//timeZoneNames/{tag}")) {
            if !is_flagged(elem) {
                let text = elem.text().unwrap_or("").replace("{0}", "%s");
                map.insert(Key::from(key), Value::Str(text));
                break;
            }
        }
    }
    let double = [
        ("fallbackFormat", "fallback"),
        ("fallbackRegionFormat", "fallback_region"),
    ];
    for (tag, key) in double {
        for elem in tree.find_all(&format!(".//timeZoneNames/{tag}")) {
            if !is_flagged(elem) {
                let text = elem
                    .text()
                    .unwrap_or("")
                    .replace("{0}", "%(0)s")
                    .replace("{1}", "%(1)s");
                map.insert(Key::from(key), Value::Str(text));
                break;
            }
        }
    }
    Value::Map(map)
}

fn extract_zone_names(tree: &Document, path: &str) -> Result<Value, Error> {
    let mut map = BTreeMap::new();
    for elem in tree.find_all(path) {
        let mut info = BTreeMap::new();
        if let Some(city) = elem.find_text("exemplarCity") {
            if !city.is_empty() {
                info.insert(Key::from("city"), Value::Str(city.to_string()));
            }
        }
        for (group, group_path) in [("long", "long/*"), ("short", "short/*")] {
            let children = elem.find_all(group_path);
            if children.is_empty() {
                continue;
            }
            let mut sub = BTreeMap::new();
            for child in children {
                sub.insert(Key::from(child.tag.as_str()), elem_text(child));
            }
            info.insert(Key::from(group), Value::Map(sub));
        }
        map.insert(Key::from(elem.require_attr("type")?), Value::Map(info));
    }
    Ok(Value::Map(map))
}

/// Shared shape of months, days, and quarters: context → width → keyed
/// entries, where a width-level `<alias>` replaces the whole width value.
#[allow(clippy::too_many_arguments)]
fn extract_calendar_grid(
    calendar: &Element,
    category: &str,
    context_path: &str,
    width_tag: &str,
    item_tag: &str,
    into: &mut Value,
    item_key: &dyn Fn(&Element) -> Result<Key, Error>,
    yields_to_existing: &dyn Fn(&Element) -> bool,
) -> Result<(), Error> {
    let Value::Map(contexts) = into else {
        return Ok(());
    };
    for ctxt in calendar.find_all(context_path) {
        let ctxt_type = ctxt.require_attr("type")?.to_string();
        let widths_slot = contexts
            .entry(Key::Str(ctxt_type.clone()))
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        let Value::Map(widths_map) = widths_slot else {
            continue;
        };
        for width in ctxt.children_named(width_tag) {
            let width_type = width.require_attr("type")?.to_string();
            let mut value = widths_map
                .remove(&Key::Str(width_type.clone()))
                .unwrap_or_else(|| Value::Map(BTreeMap::new()));
            for elem in width.subtree() {
                if elem.tag == item_tag {
                    if let Value::Map(items) = &mut value {
                        merge_pref(
                            items,
                            item_key(elem)?,
                            elem_text(elem),
                            yields_to_existing(elem),
                        );
                    }
                } else if elem.tag == "alias" {
                    let keys = translate_alias(
                        &[category, &ctxt_type, &width_type],
                        elem.require_attr("path")?,
                    )?;
                    value = Value::Alias(Alias::new(keys));
                }
            }
            widths_map.insert(Key::Str(width_type), value);
        }
    }
    Ok(())
}

fn int_key(elem: &Element) -> Result<Key, Error> {
    let raw = elem.require_attr("type")?;
    let index: i64 = raw
        .parse()
        .map_err(|_| Error::invalid_xml(format!("non-numeric type `{raw}`")))?;
    Ok(Key::Int(index))
}

fn day_key(elem: &Element) -> Result<Key, Error> {
    let raw = elem.require_attr("type")?;
    weekday_index(raw)
        .map(Key::Int)
        .ok_or_else(|| Error::invalid_xml(format!("unknown weekday `{raw}`")))
}

/// Era widths are keyed by the normalized tag name (`eraAbbr` →
/// `abbreviated`, …); a width-level alias replaces the whole width.
fn extract_eras(calendar: &Element, into: &mut Value) -> Result<(), Error> {
    let Value::Map(eras) = into else {
        return Ok(());
    };
    for width in calendar.find_all("eras/*") {
        let width_type = map_name(&width.tag).to_string();
        let mut value = eras
            .remove(&Key::Str(width_type.clone()))
            .unwrap_or_else(|| Value::Map(BTreeMap::new()));
        for elem in width.subtree() {
            if elem.tag == "era" {
                if let Value::Map(items) = &mut value {
                    merge_pref(items, int_key(elem)?, elem_text(elem), is_flagged(elem));
                }
            } else if elem.tag == "alias" {
                let keys = translate_alias(&["eras", &width_type], elem.require_attr("path")?)?;
                value = Value::Alias(Alias::new(keys));
            }
        }
        eras.insert(Key::Str(width_type), value);
    }
    Ok(())
}

/// AM/PM and friends: wide width only, alternates skipped outright.
fn extract_day_periods(
    calendar: &Element,
    periods: &mut BTreeMap<Key, Value>,
) -> Result<(), Error> {
    for width in calendar.find_all("dayPeriods/dayPeriodContext/dayPeriodWidth") {
        if width.attr("type") != Some("wide") {
            continue;
        }
        for day_period in width.children_named("dayPeriod") {
            if !day_period.has_attr("alt") {
                periods.insert(
                    Key::from(day_period.require_attr("type")?),
                    elem_text(day_period),
                );
            }
        }
    }
    Ok(())
}

/// Date and time formats: per length type, the pattern is compiled; a
/// malformed pattern is logged and the slot left unset. An `<alias>` child
/// replaces the whole category value.
fn extract_pattern_lengths(
    calendar: &Element,
    wrapper_tag: &str,
    length_tag: &str,
    pattern_path: &str,
    category: &str,
    into: &mut Value,
    yields_to_existing: &dyn Fn(&Element) -> bool,
) -> Result<(), Error> {
    for wrapper in calendar.find_all(wrapper_tag) {
        for elem in wrapper.subtree() {
            if elem.tag == length_tag {
                let Value::Map(map) = into else {
                    continue;
                };
                let key = Key::from(elem.attr("type"));
                if yields_to_existing(elem) && map.contains_key(&key) {
                    continue;
                }
                let Some(text) = elem.find_text(pattern_path) else {
                    warn!(category, "format length without pattern text");
                    continue;
                };
                match parse_date_pattern(text) {
                    Ok(compiled) => {
                        map.insert(key, Value::DateTimePattern(compiled));
                    }
                    Err(e) => warn!(category, error = %e, "skipping malformed pattern"),
                }
            } else if elem.tag == "alias" {
                *into = Value::Alias(Alias::new(translate_alias(
                    &[category],
                    elem.require_attr("path")?,
                )?));
            }
        }
    }
    Ok(())
}

/// Datetime glue formats are kept as raw strings; the `availableFormats`
/// skeletons compile like any other date pattern.
fn extract_datetime_formats(
    calendar: &Element,
    into: &mut Value,
    skeletons: &mut BTreeMap<Key, Value>,
) -> Result<(), Error> {
    for wrapper in calendar.find_all("dateTimeFormats") {
        for elem in wrapper.subtree() {
            if elem.tag == "dateTimeFormatLength" {
                let Value::Map(map) = into else {
                    continue;
                };
                let key = Key::from(elem.attr("type"));
                if is_flagged(elem) && map.contains_key(&key) {
                    continue;
                }
                let Some(text) = elem.find_text("dateTimeFormat/pattern") else {
                    warn!("dateTimeFormatLength without pattern text");
                    continue;
                };
                map.insert(key, Value::Str(text.to_string()));
            } else if elem.tag == "alias" {
                *into = Value::Alias(Alias::new(translate_alias(
                    &["datetime_formats"],
                    elem.require_attr("path")?,
                )?));
            } else if elem.tag == "availableFormats" {
                for skeleton in elem.children_named("dateFormatItem") {
                    let id = Key::from(skeleton.require_attr("id")?);
                    match parse_date_pattern(skeleton.text().unwrap_or("")) {
                        Ok(compiled) => {
                            skeletons.insert(id, Value::DateTimePattern(compiled));
                        }
                        Err(e) => warn!(error = %e, "skipping malformed skeleton"),
                    }
                }
            }
        }
    }
    Ok(())
}

/// Interval formats: the fallback text keys by null; each item id maps
/// greatest-difference fields to split pattern pairs. Any other child
/// element is a format this model cannot represent and aborts the run.
fn extract_interval_formats(
    calendar: &Element,
    into: &mut BTreeMap<Key, Value>,
) -> Result<(), Error> {
    for elem in calendar.find_all("dateTimeFormats/intervalFormats/*") {
        if elem.has_attr("draft") {
            continue;
        }
        match elem.tag.as_str() {
            "intervalFormatFallback" => {
                into.insert(Key::Null, elem_text(elem));
            }
            "intervalFormatItem" => {
                let id = elem.require_attr("id")?;
                let mut skeleton = match into.remove(&Key::from(id)) {
                    Some(Value::Map(map)) => map,
                    _ => BTreeMap::new(),
                };
                for sub in &elem.children {
                    if sub.tag != "greatestDifference" {
                        return Err(Error::UnsupportedIntervalFormat(sub.tag.clone()));
                    }
                    let diff = sub.require_attr("id")?;
                    match split_interval_pattern(sub.text().unwrap_or("")) {
                        Ok(parts) => {
                            skeleton.insert(
                                Key::from(diff),
                                Value::List(parts.into_iter().map(Value::from).collect()),
                            );
                        }
                        Err(e) => warn!(error = %e, "skipping malformed interval pattern"),
                    }
                }
                into.insert(Key::from(id), Value::Map(skeleton));
            }
            _ => {}
        }
    }
    Ok(())
}

/// Number symbols carry no natural key, so flagged elements are skipped
/// outright rather than reduced.
fn extract_number_symbols(tree: &Document) -> Value {
    let mut map = BTreeMap::new();
    for elem in tree.find_all(".//numbers/symbols/*") {
        if is_flagged(elem) {
            continue;
        }
        map.insert(Key::from(elem.tag.as_str()), elem_text(elem));
    }
    Value::Map(map)
}

/// Decimal, scientific, and percent format lengths. Decimal lengths that
/// carry an alias child are skipped; the alias target is not mapped.
fn extract_number_formats(
    tree: &Document,
    length_path: &str,
    pattern_path: &str,
    skip_alias: bool,
) -> Result<Value, Error> {
    let mut map = BTreeMap::new();
    for elem in tree.find_all(length_path) {
        let key = Key::from(elem.attr("type"));
        if is_flagged(elem) && map.contains_key(&key) {
            continue;
        }
        if skip_alias && elem.find("alias").is_some() {
            continue;
        }
        let Some(text) = elem.find_text(pattern_path) else {
            warn!(path = length_path, "format length without pattern text");
            continue;
        };
        match parse_number_pattern(text) {
            Ok(compiled) => {
                map.insert(key, Value::NumberPattern(compiled));
            }
            Err(e) => warn!(error = %e, "skipping malformed number pattern"),
        }
    }
    Ok(Value::Map(map))
}

/// Currency formats: non-default lengths are namespaced into `type:length`
/// composite keys so they cannot collide with the default-length entries.
fn extract_currency_formats(tree: &Document) -> Result<Value, Error> {
    let mut map = BTreeMap::new();
    for length_elem in tree.find_all(".//currencyFormats/currencyFormatLength") {
        let length_type = length_elem.attr("type");
        for elem in length_elem.children_named("currencyFormat") {
            let key = match length_type {
                Some(length) => Key::Str(format!(
                    "{}:{}",
                    elem.attr("type").unwrap_or("standard"),
                    length
                )),
                None => Key::from(elem.attr("type")),
            };
            if is_flagged(elem) && map.contains_key(&key) {
                continue;
            }
            for child in elem.subtree() {
                if child.tag == "alias" {
                    let keys = translate_alias(
                        &["currency_formats", elem.require_attr("type")?],
                        child.require_attr("path")?,
                    )?;
                    map.insert(key.clone(), Value::Alias(Alias::new(keys)));
                } else if child.tag == "pattern" {
                    match parse_number_pattern(child.text().unwrap_or("")) {
                        Ok(compiled) => {
                            map.insert(key.clone(), Value::NumberPattern(compiled));
                        }
                        Err(e) => warn!(error = %e, "skipping malformed currency pattern"),
                    }
                }
            }
        }
    }
    Ok(Value::Map(map))
}

/// Currency display data: plain and per-count display names plus symbols.
/// Symbols with a choice pattern are not supported and are skipped.
fn extract_currencies(tree: &Document) -> Result<(Value, Value, Value), Error> {
    let mut names = BTreeMap::new();
    let mut names_plural: BTreeMap<Key, Value> = BTreeMap::new();
    let mut symbols = BTreeMap::new();
    for elem in tree.find_all(".//currencies/currency") {
        let code = elem.require_attr("type")?;
        for display in elem.children_named("displayName") {
            if display.has_attr("draft") && names.contains_key(&Key::from(code)) {
                continue;
            }
            match display.attr("count") {
                Some(count) => {
                    let slot = names_plural
                        .entry(Key::from(code))
                        .or_insert_with(|| Value::Map(BTreeMap::new()));
                    if let Value::Map(counts) = slot {
                        counts.insert(Key::from(count), elem_text(display));
                    }
                }
                None => {
                    names.insert(Key::from(code), elem_text(display));
                }
            }
        }
        if let Some(symbol) = elem.find("symbol") {
            if !symbol.has_attr("draft") && !symbol.has_attr("choice") {
                symbols.insert(Key::from(code), elem_text(symbol));
            }
        }
    }
    Ok((
        Value::Map(names),
        Value::Map(names_plural),
        Value::Map(symbols),
    ))
}

/// Unit patterns are keyed `unit_type:length` with per-count forms below.
fn extract_unit_patterns(tree: &Document) -> Result<Value, Error> {
    let mut map: BTreeMap<Key, Value> = BTreeMap::new();
    for length_elem in tree.find_all(".//units/unitLength") {
        let length_type = length_elem.require_attr("type")?;
        for unit in length_elem.children_named("unit") {
            let unit_type = unit.require_attr("type")?;
            let slot = map
                .entry(Key::Str(format!("{unit_type}:{length_type}")))
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            let Value::Map(counts) = slot else {
                continue;
            };
            for pattern in unit.children_named("unitPattern") {
                counts.insert(Key::from(pattern.require_attr("count")?), elem_text(pattern));
            }
        }
    }
    Ok(Value::Map(map))
}

/// Relative-time fields: field type → relative type → count → text. A
/// field with no relative times still records an empty table.
fn extract_date_fields(tree: &Document) -> Result<Value, Error> {
    let mut map: BTreeMap<Key, Value> = BTreeMap::new();
    for field in tree.find_all(".//dates/fields/field") {
        let field_type = field.require_attr("type")?;
        let slot = map
            .entry(Key::from(field_type))
            .or_insert_with(|| Value::Map(BTreeMap::new()));
        let Value::Map(rel_map) = slot else {
            continue;
        };
        for rel_time in field.children_named("relativeTime") {
            let rel_type = rel_time.require_attr("type")?;
            let rel_slot = rel_map
                .entry(Key::from(rel_type))
                .or_insert_with(|| Value::Map(BTreeMap::new()));
            let Value::Map(counts) = rel_slot else {
                continue;
            };
            for pattern in rel_time.children_named("relativeTimePattern") {
                counts.insert(Key::from(pattern.require_attr("count")?), elem_text(pattern));
            }
        }
    }
    Ok(Value::Map(map))
}
