//! Core record types shared across the extraction pipeline.
//!
//! A locale record is a tree of [`Value`]s keyed by [`Key`]s. The tree keeps
//! compiled objects (date/number patterns, plural rules) and unresolved
//! [`Alias`] pointers side by side with plain strings; resolution of aliases
//! is left to whatever consumes the records.

use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    alias::Alias,
    pattern::{DateTimePattern, NumberPattern},
    plural::PluralRule,
};

/// Map key inside a record tree.
///
/// Month, quarter and era numbers and weekday indices key by integer, the
/// interval-format fallback and default format lengths key by `Null`, and
/// everything else keys by string. `Null` orders before integers, integers
/// before strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    Null,
    Int(i64),
    Str(String),
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Null => write!(f, "null"),
            Key::Int(n) => write!(f, "{}", n),
            Key::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<Option<&str>> for Key {
    fn from(s: Option<&str>) -> Self {
        match s {
            Some(s) => Key::Str(s.to_string()),
            None => Key::Null,
        }
    }
}

/// One value in a record tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    Int(i64),
    Map(BTreeMap<Key, Value>),
    List(Vec<Value>),
    Alias(Alias),
    DateTimePattern(DateTimePattern),
    NumberPattern(NumberPattern),
    PluralRule(Arc<PluralRule>),
}

impl Value {
    /// Renders the value for the human-readable JSON mirror. Compiled
    /// objects appear in their textual form: patterns as their source text,
    /// plural rules as their abstract rule text, aliases as `<alias …>`.
    /// Non-string map keys are rendered as strings.
    pub fn debug_json(&self) -> serde_json::Value {
        match self {
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.debug_json()))
                    .collect(),
            ),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::debug_json).collect())
            }
            Value::Alias(alias) => {
                serde_json::Value::String(format!("<alias {}>", alias.keys.join("/")))
            }
            Value::DateTimePattern(p) => serde_json::Value::String(p.pattern.clone()),
            Value::NumberPattern(p) => serde_json::Value::String(p.pattern.clone()),
            Value::PluralRule(rule) => serde_json::Value::String(rule.abstract_form()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<BTreeMap<Key, Value>> for Value {
    fn from(map: BTreeMap<Key, Value>) -> Self {
        Value::Map(map)
    }
}

/// The compiled record for one locale source file: a mapping from category
/// name to category value, stamped with the source revision it was built
/// from. Built fresh per file, persisted once, then discarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocaleRecord {
    pub version: u32,
    pub categories: BTreeMap<String, Value>,
}

impl LocaleRecord {
    pub fn new(version: u32) -> Self {
        LocaleRecord {
            version,
            categories: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, category: &str, value: impl Into<Value>) {
        self.categories.insert(category.to_string(), value.into());
    }

    pub fn get(&self, category: &str) -> Option<&Value> {
        self.categories.get(category)
    }

    pub fn debug_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert("_version".to_string(), serde_json::Value::from(self.version));
        for (category, value) in &self.categories {
            object.insert(category.clone(), value.debug_json());
        }
        serde_json::Value::Object(object)
    }
}

/// A calendar date from the supplemental data, with unspecified month and
/// day defaulting to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CldrDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl CldrDate {
    pub fn new(year: i32, month: u8, day: u8) -> Self {
        CldrDate { year, month, day }
    }
}

/// One currency's validity window in a territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyPeriod {
    pub code: String,
    pub from: Option<CldrDate>,
    pub to: Option<CldrDate>,
    pub tender: bool,
}

impl CurrencyPeriod {
    /// Legal tender sorts before non-tender; within a tender class, by
    /// start date with an absent start first.
    pub fn sort_key(&self) -> (bool, CldrDate) {
        (!self.tender, self.from.unwrap_or(CldrDate::new(1, 1, 1)))
    }
}

/// Decimal and rounding digits for one currency, cash values defaulting to
/// the non-cash ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyFraction {
    pub digits: u8,
    pub rounding: u8,
    pub cash_digits: u8,
    pub cash_rounding: u8,
}

/// Population share and official status of one language in a territory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagePopulation {
    pub population_percent: f64,
    pub official_status: Option<String>,
}

/// Cross-locale tables extracted from the supplemental sources. Rebuilt in
/// full whenever the supplemental revision stamp changes; never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalData {
    pub version: u32,
    pub territory_zones: BTreeMap<String, Vec<String>>,
    pub zone_aliases: BTreeMap<String, String>,
    pub zone_territories: BTreeMap<String, String>,
    pub windows_zone_mapping: BTreeMap<String, String>,
    pub meta_zones: BTreeMap<String, String>,
    pub language_aliases: BTreeMap<String, String>,
    pub territory_aliases: BTreeMap<String, Vec<String>>,
    pub script_aliases: BTreeMap<String, String>,
    pub variant_aliases: BTreeMap<String, String>,
    pub likely_subtags: BTreeMap<String, String>,
    pub territory_currencies: BTreeMap<String, Vec<CurrencyPeriod>>,
    pub parent_exceptions: BTreeMap<String, String>,
    pub currency_fractions: BTreeMap<String, CurrencyFraction>,
    pub territory_languages: BTreeMap<String, BTreeMap<String, LanguagePopulation>>,
}

impl GlobalData {
    pub fn debug_json(&self) -> serde_json::Value {
        fn string_map(map: &BTreeMap<String, String>) -> serde_json::Value {
            serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect(),
            )
        }
        fn date_json(date: &Option<CldrDate>) -> serde_json::Value {
            match date {
                Some(d) => serde_json::json!([d.year, d.month, d.day]),
                None => serde_json::Value::Null,
            }
        }

        let currencies: serde_json::Map<String, serde_json::Value> = self
            .territory_currencies
            .iter()
            .map(|(territory, periods)| {
                let list: Vec<serde_json::Value> = periods
                    .iter()
                    .map(|p| {
                        serde_json::json!([p.code, date_json(&p.from), date_json(&p.to), p.tender])
                    })
                    .collect();
                (territory.clone(), serde_json::Value::Array(list))
            })
            .collect();

        let fractions: serde_json::Map<String, serde_json::Value> = self
            .currency_fractions
            .iter()
            .map(|(code, f)| {
                (
                    code.clone(),
                    serde_json::json!([f.digits, f.rounding, f.cash_digits, f.cash_rounding]),
                )
            })
            .collect();

        serde_json::json!({
            "_version": self.version,
            "territory_zones": self.territory_zones,
            "zone_aliases": string_map(&self.zone_aliases),
            "zone_territories": string_map(&self.zone_territories),
            "windows_zone_mapping": string_map(&self.windows_zone_mapping),
            "meta_zones": string_map(&self.meta_zones),
            "language_aliases": string_map(&self.language_aliases),
            "territory_aliases": self.territory_aliases,
            "script_aliases": string_map(&self.script_aliases),
            "variant_aliases": string_map(&self.variant_aliases),
            "likely_subtags": string_map(&self.likely_subtags),
            "territory_currencies": currencies,
            "parent_exceptions": string_map(&self.parent_exceptions),
            "currency_fractions": fractions,
            "territory_languages": self.territory_languages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering() {
        let mut keys = vec![
            Key::Str("a".to_string()),
            Key::Int(3),
            Key::Null,
            Key::Int(1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::Null,
                Key::Int(1),
                Key::Int(3),
                Key::Str("a".to_string()),
            ]
        );
    }

    #[test]
    fn test_currency_sort_tender_before_start_date() {
        // Tender status is the primary key, so Y (1999, tender) must sort
        // before X (2001, non-tender) and before any start-less non-tender.
        let mut periods = vec![
            CurrencyPeriod {
                code: "X".to_string(),
                from: Some(CldrDate::new(2001, 1, 1)),
                to: None,
                tender: false,
            },
            CurrencyPeriod {
                code: "Y".to_string(),
                from: Some(CldrDate::new(1999, 1, 1)),
                to: None,
                tender: true,
            },
        ];
        periods.sort_by_key(CurrencyPeriod::sort_key);
        assert_eq!(periods[0].code, "Y");
        assert_eq!(periods[1].code, "X");
    }

    #[test]
    fn test_currency_sort_absent_start_first() {
        let mut periods = vec![
            CurrencyPeriod {
                code: "B".to_string(),
                from: Some(CldrDate::new(1850, 1, 1)),
                to: None,
                tender: true,
            },
            CurrencyPeriod {
                code: "A".to_string(),
                from: None,
                to: None,
                tender: true,
            },
        ];
        periods.sort_by_key(CurrencyPeriod::sort_key);
        assert_eq!(periods[0].code, "A");
    }

    #[test]
    fn test_value_debug_json_keys_stringified() {
        let mut months = BTreeMap::new();
        months.insert(Key::Int(1), Value::from("Jan"));
        months.insert(Key::Null, Value::from("default"));
        let json = Value::Map(months).debug_json();
        assert_eq!(json["1"], "Jan");
        assert_eq!(json["null"], "default");
    }

    #[test]
    fn test_locale_record_debug_json_has_version() {
        let mut record = LocaleRecord::new(9061);
        record.insert("territories", Value::Map(BTreeMap::new()));
        let json = record.debug_json();
        assert_eq!(json["_version"], 9061);
        assert!(json["territories"].is_object());
    }

    #[test]
    fn test_record_roundtrip_bincode() {
        let mut record = LocaleRecord::new(3);
        let mut map = BTreeMap::new();
        map.insert(Key::from("US"), Value::from("United States"));
        record.insert("territories", Value::Map(map));

        let bytes = bincode::serialize(&record).unwrap();
        let back: LocaleRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, record);
    }
}
