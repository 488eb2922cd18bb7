//! Extraction of cross-locale tables from the supplemental sources.
//!
//! Everything here is a direct pass over a supplemental subtree: the
//! draft/alt override policy only applies to locale display elements, never
//! to supplemental data. The resulting [`GlobalData`] is rebuilt in full
//! whenever the supplemental revision stamp changes.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use tracing::debug;

use crate::{
    error::Error,
    plural::PluralRule,
    types::{CldrDate, CurrencyFraction, CurrencyPeriod, GlobalData, LanguagePopulation},
    xml::Document,
};

/// The parsed supplemental source documents, loaded once per run.
pub struct SupplementalDocs {
    /// supplemental/supplementalData.xml
    pub data: Document,
    /// supplemental/supplementalMetadata.xml
    pub metadata: Document,
    /// supplemental/likelySubtags.xml
    pub likely: Document,
    /// supplemental/windowsZones.xml
    pub windows_zones: Document,
    /// supplemental/metaZones.xml
    pub meta_zones: Document,
    /// bcp47/timezone.xml
    pub bcp47_timezone: Document,
}

/// Builds every global table in one pass over the supplemental documents.
pub fn build_global_data(docs: &SupplementalDocs, version: u32) -> Result<GlobalData, Error> {
    let mut global = GlobalData {
        version,
        ..GlobalData::default()
    };

    // Windows zone mapping. Only the "world" (001) rows name the canonical
    // zone; every row feeds an auxiliary tzid→territory hint that the bcp47
    // pass below uses, since the bcp47 data decides which spelling of a
    // zone is canonical.
    let mut zone_territory_hint: BTreeMap<String, String> = BTreeMap::new();
    for map_zone in docs
        .windows_zones
        .find_all(".//windowsZones/mapTimezones/mapZone")
    {
        let zone_ids = map_zone.require_attr("type")?;
        let territory = map_zone.require_attr("territory")?;
        if territory == "001" {
            if let Some(first) = zone_ids.split_whitespace().next() {
                global
                    .windows_zone_mapping
                    .insert(map_zone.require_attr("other")?.to_string(), first.to_string());
            }
        }
        for tzid in zone_ids.split_whitespace() {
            zone_territory_hint.insert(tzid.to_string(), territory.to_string());
        }
    }

    // BCP-47 timezone canonicalization: first alias token is the canonical
    // id, the rest point at it. Territory falls back to the world code when
    // the windows data gave no hint.
    for key in docs.bcp47_timezone.find_all(".//keyword/key") {
        if key.attr("name") != Some("tz") {
            continue;
        }
        for elem in key.children_named("type") {
            if elem.has_attr("deprecated") {
                continue;
            }
            let Some(alias_attr) = elem.attr("alias") else {
                continue;
            };
            let mut aliases = alias_attr.split_whitespace();
            let Some(tzid) = aliases.next() else {
                continue;
            };
            let territory = zone_territory_hint
                .get(tzid)
                .cloned()
                .unwrap_or_else(|| "001".to_string());
            global
                .territory_zones
                .entry(territory.clone())
                .or_default()
                .push(tzid.to_string());
            global.zone_territories.insert(tzid.to_string(), territory);
            for alias in aliases {
                global.zone_aliases.insert(alias.to_string(), tzid.to_string());
            }
        }
        break;
    }

    // Metazone mapping: only currently active mappings (no `to` bound).
    for elem in docs.meta_zones.find_all(".//timezone") {
        for child in elem.children_named("usesMetazone") {
            if !child.has_attr("to") {
                global.meta_zones.insert(
                    elem.require_attr("type")?.to_string(),
                    child.require_attr("mzone")?.to_string(),
                );
            }
        }
    }

    // Identifier alias tables. Language aliases with a sub-tag separator
    // are not valid simple identifiers for this table and are dropped.
    for alias in docs.metadata.find_all(".//alias/languageAlias") {
        let from = alias.require_attr("type")?;
        if from.contains('_') {
            continue;
        }
        global
            .language_aliases
            .insert(from.to_string(), alias.require_attr("replacement")?.to_string());
    }
    for alias in docs.metadata.find_all(".//alias/territoryAlias") {
        global.territory_aliases.insert(
            alias.require_attr("type")?.to_string(),
            alias
                .require_attr("replacement")?
                .split_whitespace()
                .map(String::from)
                .collect(),
        );
    }
    for alias in docs.metadata.find_all(".//alias/scriptAlias") {
        global.script_aliases.insert(
            alias.require_attr("type")?.to_string(),
            alias.require_attr("replacement")?.to_string(),
        );
    }
    for alias in docs.metadata.find_all(".//alias/variantAlias") {
        if let Some(replacement) = alias.attr("replacement") {
            if !replacement.is_empty() {
                global
                    .variant_aliases
                    .insert(alias.require_attr("type")?.to_string(), replacement.to_string());
            }
        }
    }

    // Likely subtags.
    for likely in docs.likely.find_all(".//likelySubtags/likelySubtag") {
        global.likely_subtags.insert(
            likely.require_attr("from")?.to_string(),
            likely.require_attr("to")?.to_string(),
        );
    }

    // Currency history per territory, ordered tender-first.
    for region in docs.data.find_all(".//currencyData/region") {
        let code = region.require_attr("iso3166")?;
        let mut periods = Vec::new();
        for currency in region.children_named("currency") {
            periods.push(CurrencyPeriod {
                code: currency.require_attr("iso4217")?.to_string(),
                from: parse_currency_date(currency.attr("from"))?,
                to: parse_currency_date(currency.attr("to"))?,
                tender: currency.attr("tender").unwrap_or("true") == "true",
            });
        }
        periods.sort_by_key(CurrencyPeriod::sort_key);
        global.territory_currencies.insert(code.to_string(), periods);
    }

    // Explicit parent locales.
    for paternity in docs.data.find_all(".//parentLocales/parentLocale") {
        let parent = paternity.require_attr("parent")?;
        for child in paternity.require_attr("locales")?.split_whitespace() {
            global
                .parent_exceptions
                .insert(child.to_string(), parent.to_string());
        }
    }

    // Currency decimal and rounding digits.
    for fraction in docs.data.find_all(".//currencyData/fractions/info") {
        let digits = parse_int(fraction.require_attr("digits")?)?;
        let rounding = parse_int(fraction.require_attr("rounding")?)?;
        global.currency_fractions.insert(
            fraction.require_attr("iso4217")?.to_string(),
            CurrencyFraction {
                digits,
                rounding,
                cash_digits: match fraction.attr("cashDigits") {
                    Some(v) => parse_int(v)?,
                    None => digits,
                },
                cash_rounding: match fraction.attr("cashRounding") {
                    Some(v) => parse_int(v)?,
                    None => rounding,
                },
            },
        );
    }

    // Language populations per territory.
    for territory in docs.data.find_all(".//territoryInfo/territory") {
        let mut languages = BTreeMap::new();
        for language in territory.children_named("languagePopulation") {
            let percent = language.require_attr("populationPercent")?;
            languages.insert(
                language.require_attr("type")?.to_string(),
                LanguagePopulation {
                    population_percent: percent.parse().map_err(|_| {
                        Error::invalid_xml(format!("bad populationPercent `{percent}`"))
                    })?,
                    official_status: language.attr("officialStatus").map(String::from),
                },
            );
        }
        global
            .territory_languages
            .insert(territory.require_attr("type")?.to_string(), languages);
    }

    debug!(
        zones = global.zone_territories.len(),
        currencies = global.territory_currencies.len(),
        "built global tables"
    );
    Ok(global)
}

/// Builds the transitive closure of territory containment: every territory
/// maps to all regions containing it at any depth.
///
/// Runs an iterative fixed point over the group definitions instead of a
/// single pass in identifier order, so forward references between groups
/// resolve no matter how the corpus orders them.
pub fn territory_containment(data: &Document) -> Result<BTreeMap<String, BTreeSet<String>>, Error> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for elem in data.find_all(".//territoryContainment/group") {
        groups.insert(
            elem.require_attr("type")?.to_string(),
            elem.require_attr("contains")?
                .split_whitespace()
                .map(String::from)
                .collect(),
        );
    }

    let mut containment: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (group, members) in &groups {
        for member in members {
            containment
                .entry(member.clone())
                .or_default()
                .insert(group.clone());
        }
    }

    loop {
        let mut changed = false;
        for (group, members) in &groups {
            let Some(inherited) = containment.get(group).cloned() else {
                continue;
            };
            for member in members {
                let set = containment.entry(member.clone()).or_default();
                let before = set.len();
                set.extend(inherited.iter().cloned());
                changed |= set.len() != before;
            }
        }
        if !changed {
            break;
        }
    }
    Ok(containment)
}

/// Extracts a plural or ordinal rule table. Each source group compiles to
/// one shared rule, referenced by every locale the group lists.
pub fn extract_plural_rules(doc: &Document) -> Result<BTreeMap<String, Arc<PluralRule>>, Error> {
    let mut table = BTreeMap::new();
    for elem in doc.find_all(".//plurals/pluralRules") {
        let mut rules = Vec::new();
        for rule in elem.children_named("pluralRule") {
            rules.push((
                rule.require_attr("count")?.to_string(),
                rule.text().unwrap_or("").to_string(),
            ));
        }
        let compiled = Arc::new(PluralRule::parse(&rules)?);
        for locale in elem.require_attr("locales")?.split_whitespace() {
            table.insert(locale.to_string(), Arc::clone(&compiled));
        }
    }
    Ok(table)
}

fn parse_currency_date(value: Option<&str>) -> Result<Option<CldrDate>, Error> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_empty() {
        return Ok(None);
    }
    let mut parts = value.splitn(3, '-');
    let year = parse_date_part(value, parts.next())?;
    let month = parse_date_part(value, parts.next())?;
    let day = parse_date_part(value, parts.next())?;
    Ok(Some(CldrDate::new(year, month as u8, day as u8)))
}

fn parse_date_part(source: &str, part: Option<&str>) -> Result<i32, Error> {
    part.unwrap_or("1")
        .parse()
        .map_err(|_| Error::invalid_xml(format!("bad currency date `{source}`")))
}

fn parse_int(value: &str) -> Result<u8, Error> {
    value
        .parse()
        .map_err(|_| Error::invalid_xml(format!("bad digit count `{value}`")))
}
