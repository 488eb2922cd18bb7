//! Compiler for CLDR plural and ordinal rule expressions.
//!
//! A rule set maps category names ("one", "few", …) to boolean conditions
//! over a numeric operand, e.g. `n % 10 = 1 and n % 100 != 11`. Both the
//! modern relational syntax (`=`, `!=`) and the older keyword syntax
//! (`is`, `in`, `within`, `mod`) are accepted; sample annotations after `@`
//! are ignored. The compiled form is an AST that can be evaluated directly
//! or rendered back to canonical rule text for debug dumps.
//!
//! `other` is the implicit catch-all category and is never stored.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Numeric operand selector in a rule expression.
///
/// `n` is the absolute value of the source number, `i` its integer part,
/// `v`/`w` the count of visible fraction digits with and without trailing
/// zeros, `f`/`t` the fraction digits themselves as integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    N,
    I,
    V,
    W,
    F,
    T,
}

impl Operand {
    fn symbol(self) -> &'static str {
        match self {
            Operand::N => "n",
            Operand::I => "i",
            Operand::V => "v",
            Operand::W => "w",
            Operand::F => "f",
            Operand::T => "t",
        }
    }
}

/// Decomposed numeric operand values, following the LDML operand table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operands {
    pub n: f64,
    pub i: u64,
    pub v: u32,
    pub w: u32,
    pub f: u64,
    pub t: u64,
}

impl Operands {
    /// Decompose a decimal string such as `"1"`, `"1.5"`, or `"1.50"`.
    /// Visible fraction digits are taken from the source text, so `"1.50"`
    /// has `v = 2, w = 1, f = 50, t = 5`.
    pub fn parse(source: &str) -> Option<Operands> {
        let source = source.trim().trim_start_matches('-');
        let (int_part, frac_part) = match source.split_once('.') {
            Some((i, f)) => (i, f),
            None => (source, ""),
        };
        let i: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        if !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let f: u64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().ok()?
        };
        let trimmed = frac_part.trim_end_matches('0');
        let t: u64 = if trimmed.is_empty() {
            0
        } else {
            trimmed.parse().ok()?
        };
        let n: f64 = source.parse().ok()?;
        Some(Operands {
            n,
            i,
            v: frac_part.len() as u32,
            w: trimmed.len() as u32,
            f,
            t,
        })
    }

    fn get(&self, operand: Operand) -> f64 {
        match operand {
            Operand::N => self.n,
            Operand::I => self.i as f64,
            Operand::V => self.v as f64,
            Operand::W => self.w as f64,
            Operand::F => self.f as f64,
            Operand::T => self.t as f64,
        }
    }
}

impl From<u64> for Operands {
    fn from(value: u64) -> Self {
        Operands {
            n: value as f64,
            i: value,
            v: 0,
            w: 0,
            f: 0,
            t: 0,
        }
    }
}

/// One compiled boolean condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Relation {
        operand: Operand,
        modulus: Option<u64>,
        negated: bool,
        /// Inclusive ranges; a plain value is a degenerate range.
        ranges: Vec<(u64, u64)>,
        /// `within` matches non-integers inside a range, `in`/`=` do not.
        within: bool,
    },
}

impl Condition {
    fn matches(&self, operands: &Operands) -> bool {
        match self {
            Condition::And(a, b) => a.matches(operands) && b.matches(operands),
            Condition::Or(a, b) => a.matches(operands) || b.matches(operands),
            Condition::Relation {
                operand,
                modulus,
                negated,
                ranges,
                within,
            } => {
                let mut value = operands.get(*operand);
                if let Some(m) = modulus {
                    value %= *m as f64;
                }
                let integral = value.fract() == 0.0;
                let hit = ranges.iter().any(|(lo, hi)| {
                    value >= *lo as f64 && value <= *hi as f64 && (*within || integral)
                });
                hit != *negated
            }
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            Condition::And(a, b) => {
                a.render(out);
                out.push_str(" and ");
                b.render(out);
            }
            Condition::Or(a, b) => {
                a.render(out);
                out.push_str(" or ");
                b.render(out);
            }
            Condition::Relation {
                operand,
                modulus,
                negated,
                ranges,
                within,
            } => {
                out.push_str(operand.symbol());
                if let Some(m) = modulus {
                    let _ = write!(out, " % {m}");
                }
                match (within, negated) {
                    (true, false) => out.push_str(" within "),
                    (true, true) => out.push_str(" not within "),
                    (false, false) => out.push_str(" = "),
                    (false, true) => out.push_str(" != "),
                }
                for (index, (lo, hi)) in ranges.iter().enumerate() {
                    if index > 0 {
                        out.push(',');
                    }
                    if lo == hi {
                        let _ = write!(out, "{lo}");
                    } else {
                        let _ = write!(out, "{lo}..{hi}");
                    }
                }
            }
        }
    }
}

/// A compiled plural rule set: ordered (category, condition) clauses.
///
/// One compiled rule is shared by reference across every locale listed in
/// its source group, and may appear in both the cardinal and the ordinal
/// table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluralRule {
    clauses: Vec<(String, Condition)>,
}

impl PluralRule {
    /// Compiles an ordered list of (category, rule text) pairs. Clauses for
    /// `other` (or any clause whose condition is empty once samples are
    /// stripped) are dropped.
    pub fn parse(rules: &[(String, String)]) -> Result<PluralRule, Error> {
        let mut clauses = Vec::new();
        for (category, source) in rules {
            let source = source.split('@').next().unwrap_or("").trim();
            if category == "other" || source.is_empty() {
                continue;
            }
            let condition = RuleParser::new(source)?.parse()?;
            clauses.push((category.clone(), condition));
        }
        Ok(PluralRule { clauses })
    }

    /// The category names this rule can produce, `other` included.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clauses.iter().map(|(c, _)| c.as_str()).collect();
        names.push("other");
        names
    }

    /// Evaluates the rule for a number given in decimal source form.
    pub fn category_for_str(&self, value: &str) -> Option<&str> {
        Operands::parse(value).map(|ops| self.category(&ops))
    }

    /// Evaluates the rule against decomposed operands.
    pub fn category(&self, operands: &Operands) -> &str {
        for (category, condition) in &self.clauses {
            if condition.matches(operands) {
                return category;
            }
        }
        "other"
    }

    /// Canonical textual form of the compiled rule, used by debug dumps.
    pub fn abstract_form(&self) -> String {
        let mut out = String::new();
        for (index, (category, condition)) in self.clauses.iter().enumerate() {
            if index > 0 {
                out.push_str("; ");
            }
            let _ = write!(out, "{category}: ");
            condition.render(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Value(u64),
    Equal,
    NotEqual,
    Percent,
    Comma,
    Ellipsis,
}

struct RuleParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl RuleParser {
    fn new(source: &str) -> Result<RuleParser, Error> {
        Ok(RuleParser {
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    fn parse(mut self) -> Result<Condition, Error> {
        let condition = self.parse_or()?;
        if self.pos != self.tokens.len() {
            return Err(Error::PluralRule(format!(
                "trailing tokens after condition: {:?}",
                &self.tokens[self.pos..]
            )));
        }
        Ok(condition)
    }

    fn parse_or(&mut self) -> Result<Condition, Error> {
        let mut left = self.parse_and()?;
        while self.eat_word("or") {
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, Error> {
        let mut left = self.parse_relation()?;
        while self.eat_word("and") {
            let right = self.parse_relation()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_relation(&mut self) -> Result<Condition, Error> {
        let operand = self.parse_operand()?;
        let modulus = self.parse_modulus()?;

        if self.eat_word("is") {
            let negated = self.eat_word("not");
            let value = self.expect_value()?;
            return Ok(Condition::Relation {
                operand,
                modulus,
                negated,
                ranges: vec![(value, value)],
                within: false,
            });
        }

        let (negated, within) = if self.eat(&Token::Equal) {
            (false, false)
        } else if self.eat(&Token::NotEqual) {
            (true, false)
        } else {
            let negated = self.eat_word("not");
            if self.eat_word("in") {
                (negated, false)
            } else if self.eat_word("within") {
                (negated, true)
            } else {
                return Err(Error::PluralRule(format!(
                    "expected relation operator at token {}",
                    self.pos
                )));
            }
        };

        Ok(Condition::Relation {
            operand,
            modulus,
            negated,
            ranges: self.parse_range_list()?,
            within,
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, Error> {
        let word = match self.tokens.get(self.pos) {
            Some(Token::Word(w)) => w.clone(),
            other => {
                return Err(Error::PluralRule(format!("expected operand, got {other:?}")));
            }
        };
        let operand = match word.as_str() {
            "n" => Operand::N,
            "i" => Operand::I,
            "v" => Operand::V,
            "w" => Operand::W,
            "f" => Operand::F,
            "t" => Operand::T,
            other => {
                return Err(Error::PluralRule(format!("unknown operand `{other}`")));
            }
        };
        self.pos += 1;
        Ok(operand)
    }

    fn parse_modulus(&mut self) -> Result<Option<u64>, Error> {
        if self.eat(&Token::Percent) || self.eat_word("mod") {
            Ok(Some(self.expect_value()?))
        } else {
            Ok(None)
        }
    }

    fn parse_range_list(&mut self) -> Result<Vec<(u64, u64)>, Error> {
        let mut ranges = Vec::new();
        loop {
            let lo = self.expect_value()?;
            let hi = if self.eat(&Token::Ellipsis) {
                self.expect_value()?
            } else {
                lo
            };
            ranges.push((lo, hi));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(ranges)
    }

    fn expect_value(&mut self) -> Result<u64, Error> {
        match self.tokens.get(self.pos) {
            Some(Token::Value(v)) => {
                let value = *v;
                self.pos += 1;
                Ok(value)
            }
            other => Err(Error::PluralRule(format!("expected value, got {other:?}"))),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.tokens.get(self.pos) == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if matches!(self.tokens.get(self.pos), Some(Token::Word(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut pos = 0;
    while pos < bytes.len() {
        let c = bytes[pos] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => pos += 1,
            ',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                pos += 1;
            }
            '=' => {
                tokens.push(Token::Equal);
                pos += 1;
            }
            '!' if bytes.get(pos + 1) == Some(&b'=') => {
                tokens.push(Token::NotEqual);
                pos += 2;
            }
            '.' if bytes.get(pos + 1) == Some(&b'.') => {
                tokens.push(Token::Ellipsis);
                pos += 2;
            }
            '0'..='9' => {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let value: u64 = source[start..pos].parse().map_err(|_| {
                    Error::PluralRule(format!("value out of range at `{}`", &source[start..pos]))
                })?;
                tokens.push(Token::Value(value));
            }
            'a'..='z' => {
                let start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_lowercase() {
                    pos += 1;
                }
                tokens.push(Token::Word(source[start..pos].to_string()));
            }
            other => {
                return Err(Error::PluralRule(format!(
                    "unexpected character `{other}` in rule `{source}`"
                )));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pairs: &[(&str, &str)]) -> PluralRule {
        let rules: Vec<(String, String)> = pairs
            .iter()
            .map(|(c, s)| (c.to_string(), s.to_string()))
            .collect();
        PluralRule::parse(&rules).unwrap()
    }

    #[test]
    fn test_english_cardinal() {
        let rule = rule(&[("one", "i = 1 and v = 0")]);
        assert_eq!(rule.category(&Operands::from(1)), "one");
        assert_eq!(rule.category(&Operands::from(2)), "other");
        // 1.0 has a visible fraction digit, so v != 0
        assert_eq!(rule.category_for_str("1.0"), Some("other"));
    }

    #[test]
    fn test_russian_style_modulus() {
        let rule = rule(&[
            ("one", "v = 0 and i % 10 = 1 and i % 100 != 11"),
            ("few", "v = 0 and i % 10 = 2..4 and i % 100 != 12..14"),
        ]);
        assert_eq!(rule.category(&Operands::from(21)), "one");
        assert_eq!(rule.category(&Operands::from(11)), "other");
        assert_eq!(rule.category(&Operands::from(23)), "few");
        assert_eq!(rule.category(&Operands::from(12)), "other");
    }

    #[test]
    fn test_legacy_keyword_syntax() {
        let rule = rule(&[
            ("one", "n is 1"),
            ("few", "n mod 10 in 2..4 and n mod 100 not in 12..14"),
        ]);
        assert_eq!(rule.category(&Operands::from(1)), "one");
        assert_eq!(rule.category(&Operands::from(3)), "few");
        assert_eq!(rule.category(&Operands::from(13)), "other");
    }

    #[test]
    fn test_within_matches_fractions() {
        let within = rule(&[("one", "n within 0..2")]);
        let within_in = rule(&[("one", "n in 0..2")]);
        assert_eq!(within.category_for_str("1.5"), Some("one"));
        assert_eq!(within_in.category_for_str("1.5"), Some("other"));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let rule = rule(&[("few", "n = 0 or n != 1 and n % 100 = 1..19")]);
        // Romanian-style: `and` binds tighter than `or`.
        assert_eq!(rule.category(&Operands::from(0)), "few");
        assert_eq!(rule.category(&Operands::from(119)), "few");
        assert_eq!(rule.category(&Operands::from(1)), "other");
    }

    #[test]
    fn test_samples_stripped() {
        let rule = rule(&[(
            "one",
            "i = 1 and v = 0 @integer 1 @decimal 1.0~1.5",
        )]);
        assert_eq!(rule.category(&Operands::from(1)), "one");
    }

    #[test]
    fn test_other_clause_dropped() {
        let rule = rule(&[("one", "n is 1"), ("other", " @integer 0, 2~16")]);
        assert_eq!(rule.categories(), vec!["one", "other"]);
    }

    #[test]
    fn test_abstract_form() {
        let rule = rule(&[("one", "n % 10 is 1"), ("few", "n in 2..4,6")]);
        assert_eq!(
            rule.abstract_form(),
            "one: n % 10 = 1; few: n = 2..4,6"
        );
    }

    #[test]
    fn test_malformed_rule_is_error() {
        let rules = vec![("one".to_string(), "n === 1".to_string())];
        assert!(PluralRule::parse(&rules).is_err());
    }

    #[test]
    fn test_operands_decomposition() {
        let ops = Operands::parse("1.50").unwrap();
        assert_eq!(ops.i, 1);
        assert_eq!(ops.v, 2);
        assert_eq!(ops.w, 1);
        assert_eq!(ops.f, 50);
        assert_eq!(ops.t, 5);
        assert!((ops.n - 1.5).abs() < 1e-9);
    }
}
