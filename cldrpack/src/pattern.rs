//! Parsers for CLDR date/time and number format patterns.
//!
//! Pattern strings are compiled at import time so the runtime consumer
//! never re-tokenizes them. A malformed pattern is a per-item, recoverable
//! condition: the extractor logs it and leaves the slot unset.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Date/time field letters defined by LDML, any width.
const DATE_FIELD_CHARS: &str = "GyYuQqMLlwWdDFgEecahHKkmsSAzZOvVxX";

lazy_static! {
    static ref NUMBER_RE: Regex =
        Regex::new(r"^([^0-9@#.,]*)([0-9@#.,E+]*)(.*)$").unwrap();
}

/// One token of a compiled date/time pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternToken {
    /// A field letter and its repeat count, e.g. `yyyy` → `('y', 4)`.
    Field { field: char, width: usize },
    /// A literal run, unquoted.
    Literal(String),
}

/// A compiled date, time, or skeleton pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimePattern {
    pub pattern: String,
    pub tokens: Vec<PatternToken>,
}

/// Tokenizes a date/time pattern. `'…'` spans are literal, `''` is an
/// escaped apostrophe, and any unquoted ASCII letter must be an LDML field.
pub fn parse_date_pattern(pattern: &str) -> Result<DateTimePattern, Error> {
    let mut tokens: Vec<PatternToken> = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    fn flush(tokens: &mut Vec<PatternToken>, literal: &mut String) {
        if !literal.is_empty() {
            tokens.push(PatternToken::Literal(std::mem::take(literal)));
        }
    }

    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                literal.push('\'');
                continue;
            }
            // Quoted literal span, `''` inside meaning one apostrophe.
            loop {
                match chars.next() {
                    Some('\'') => {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            literal.push('\'');
                        } else {
                            break;
                        }
                    }
                    Some(other) => literal.push(other),
                    None => {
                        return Err(Error::pattern(pattern, "unterminated quote"));
                    }
                }
            }
        } else if c.is_ascii_alphabetic() {
            if !DATE_FIELD_CHARS.contains(c) {
                return Err(Error::pattern(pattern, format!("unknown field `{c}`")));
            }
            flush(&mut tokens, &mut literal);
            let mut width = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                width += 1;
            }
            tokens.push(PatternToken::Field { field: c, width });
        } else {
            literal.push(c);
        }
    }
    flush(&mut tokens, &mut literal);

    Ok(DateTimePattern {
        pattern: pattern.to_string(),
        tokens,
    })
}

/// Renders tokens back to pattern text, quoting literal runs that contain
/// field letters.
pub fn untokenize(tokens: &[PatternToken]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            PatternToken::Field { field, width } => {
                out.extend(std::iter::repeat(*field).take(*width));
            }
            PatternToken::Literal(text) => {
                if text.chars().any(|c| DATE_FIELD_CHARS.contains(c)) {
                    out.push('\'');
                    out.push_str(&text.replace('\'', "''"));
                    out.push('\'');
                } else {
                    out.push_str(text);
                }
            }
        }
    }
    out
}

/// Splits an interval pattern into per-side patterns at each point where a
/// field letter repeats: `"MMM d – d"` becomes `["MMM d – ", "d"]`.
pub fn split_interval_pattern(pattern: &str) -> Result<Vec<String>, Error> {
    let compiled = parse_date_pattern(pattern)?;
    let mut parts: Vec<Vec<PatternToken>> = Vec::new();
    let mut current: Vec<PatternToken> = Vec::new();
    let mut seen_fields: Vec<char> = Vec::new();

    for token in compiled.tokens {
        if let PatternToken::Field { field, .. } = &token {
            if seen_fields.contains(field) {
                parts.push(std::mem::take(&mut current));
                seen_fields.clear();
            }
            seen_fields.push(*field);
        }
        current.push(token);
    }
    if !current.is_empty() {
        parts.push(current);
    }

    Ok(parts.iter().map(|tokens| untokenize(tokens)).collect())
}

/// A compiled number format pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberPattern {
    pub pattern: String,
    pub prefix: String,
    pub suffix: String,
    pub neg_prefix: String,
    pub neg_suffix: String,
    /// Primary and secondary grouping sizes; 1000 means no grouping.
    pub grouping: (usize, usize),
    pub int_precision: (usize, usize),
    pub frac_precision: (usize, usize),
    pub exp_precision: Option<(usize, usize)>,
    pub exp_plus: bool,
}

/// Parses a decimal, scientific, percent, or currency number pattern into
/// its affixes, grouping, and precision.
pub fn parse_number_pattern(pattern: &str) -> Result<NumberPattern, Error> {
    let (positive, negative) = match pattern.split_once(';') {
        Some((pos, neg)) => (pos, Some(neg)),
        None => (pattern, None),
    };

    let (prefix, number, suffix) = split_affixes(positive)?;
    let (neg_prefix, neg_suffix) = match negative {
        Some(neg) => {
            let (p, _, s) = split_affixes(neg)?;
            (p.to_string(), s.to_string())
        }
        None => (format!("-{prefix}"), suffix.to_string()),
    };

    let (number, exponent) = match number.split_once('E') {
        Some((n, e)) => (n, Some(e)),
        None => (number, None),
    };
    if number.contains('@') && number.contains('.') && number.contains('0') {
        return Err(Error::pattern(
            pattern,
            "significant-digit patterns can not mix `@` and `0`",
        ));
    }

    let (integer, fraction) = match number.rsplit_once('.') {
        Some((i, f)) => (i, f),
        None => (number, ""),
    };

    let (exp_precision, exp_plus) = match exponent {
        Some(exp) => {
            let exp_plus = exp.starts_with('+');
            (Some(parse_precision(exp.trim_start_matches('+'))), exp_plus)
        }
        None => (None, false),
    };

    Ok(NumberPattern {
        pattern: pattern.to_string(),
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
        neg_prefix,
        neg_suffix,
        grouping: parse_grouping(integer),
        int_precision: parse_precision(integer),
        frac_precision: parse_precision(fraction),
        exp_precision,
        exp_plus,
    })
}

fn split_affixes(subpattern: &str) -> Result<(&str, &str, &str), Error> {
    let captures = NUMBER_RE
        .captures(subpattern)
        .ok_or_else(|| Error::pattern(subpattern, "no number part"))?;
    Ok((
        captures.get(1).map_or("", |m| m.as_str()),
        captures.get(2).map_or("", |m| m.as_str()),
        captures.get(3).map_or("", |m| m.as_str()),
    ))
}

/// Grouping sizes from an integer sub-pattern: distance from the end to the
/// last `,`, then the distance between the last two. `(1000, 1000)` when
/// the pattern has no grouping separator.
fn parse_grouping(integer: &str) -> (usize, usize) {
    let width = integer.len();
    let Some(g1_pos) = integer.rfind(',') else {
        return (1000, 1000);
    };
    let g1 = width - g1_pos - 1;
    let Some(g2_pos) = integer[..g1_pos].rfind(',') else {
        return (g1, g1);
    };
    let g2 = g1_pos - g2_pos - 1;
    (g1, g2)
}

/// Minimum and maximum digit counts from a digit sub-pattern: `0` and `@`
/// raise both bounds, `#` only the maximum, `,` is ignored.
fn parse_precision(digits: &str) -> (usize, usize) {
    let mut min = 0;
    let mut max = 0;
    for c in digits.chars() {
        match c {
            '0' | '@' => {
                min += 1;
                max += 1;
            }
            '#' => max += 1,
            ',' => {}
            _ => break,
        }
    }
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_pattern_fields_and_literals() {
        let compiled = parse_date_pattern("EEE, MMM d, ''yy").unwrap();
        assert_eq!(
            compiled.tokens,
            vec![
                PatternToken::Field { field: 'E', width: 3 },
                PatternToken::Literal(", ".to_string()),
                PatternToken::Field { field: 'M', width: 3 },
                PatternToken::Literal(" ".to_string()),
                PatternToken::Field { field: 'd', width: 1 },
                PatternToken::Literal(", '".to_string()),
                PatternToken::Field { field: 'y', width: 2 },
            ]
        );
    }

    #[test]
    fn test_date_pattern_quoted_span() {
        let compiled = parse_date_pattern("h 'o''clock' a").unwrap();
        assert_eq!(
            compiled.tokens,
            vec![
                PatternToken::Field { field: 'h', width: 1 },
                PatternToken::Literal(" o'clock ".to_string()),
                PatternToken::Field { field: 'a', width: 1 },
            ]
        );
    }

    #[test]
    fn test_date_pattern_errors() {
        assert!(parse_date_pattern("yyyy 'unterminated").is_err());
        assert!(parse_date_pattern("yyyy b").is_err());
    }

    #[test]
    fn test_untokenize_quotes_field_letters() {
        let compiled = parse_date_pattern("h 'o''clock' a").unwrap();
        assert_eq!(untokenize(&compiled.tokens), "h' o''clock 'a");
    }

    #[test]
    fn test_split_interval_pattern() {
        let parts = split_interval_pattern("d–d").unwrap();
        assert_eq!(parts, vec!["d–", "d"]);

        let parts = split_interval_pattern("MMM d – MMM d").unwrap();
        assert_eq!(parts, vec!["MMM d – ", "MMM d"]);
    }

    #[test]
    fn test_split_interval_pattern_single_sided() {
        let parts = split_interval_pattern("h a").unwrap();
        assert_eq!(parts, vec!["h a"]);
    }

    #[test]
    fn test_number_pattern_grouping_and_precision() {
        let compiled = parse_number_pattern("#,##0.00").unwrap();
        assert_eq!(compiled.grouping, (3, 3));
        assert_eq!(compiled.int_precision, (1, 4));
        assert_eq!(compiled.frac_precision, (2, 2));
        assert_eq!(compiled.prefix, "");
        assert_eq!(compiled.neg_prefix, "-");
    }

    #[test]
    fn test_number_pattern_indian_grouping() {
        let compiled = parse_number_pattern("#,##,##0.###").unwrap();
        assert_eq!(compiled.grouping, (3, 2));
        assert_eq!(compiled.frac_precision, (0, 3));
    }

    #[test]
    fn test_number_pattern_negative_subpattern() {
        let compiled = parse_number_pattern("¤#,##0.00;(¤#,##0.00)").unwrap();
        assert_eq!(compiled.prefix, "¤");
        assert_eq!(compiled.neg_prefix, "(¤");
        assert_eq!(compiled.neg_suffix, ")");
    }

    #[test]
    fn test_number_pattern_scientific() {
        let compiled = parse_number_pattern("0.###E+0").unwrap();
        assert_eq!(compiled.exp_precision, Some((1, 1)));
        assert!(compiled.exp_plus);
    }

    #[test]
    fn test_number_pattern_percent_suffix() {
        let compiled = parse_number_pattern("#,##0\u{a0}%").unwrap();
        assert_eq!(compiled.suffix, "\u{a0}%");
        assert_eq!(compiled.grouping, (3, 3));
    }

    #[test]
    fn test_number_pattern_no_grouping() {
        let compiled = parse_number_pattern("0.###").unwrap();
        assert_eq!(compiled.grouping, (1000, 1000));
    }
}
