//! Next-free case file name generation.
//!
//! A [`Convention`] is a name template plus optional acceptance rules. The
//! template understands three placeholders, substituted left to right in this
//! order by [`expand_template`]:
//!
//! | placeholder | replaced with                          |
//! |-------------|----------------------------------------|
//! | `%`         | counter in decimal                     |
//! | `$hex$`     | counter in lowercase hex, no prefix    |
//! | `$chr$`     | the character with the counter's code point |
//!
//! The search starts at 1 and is bounded, so a convention no name can satisfy
//! fails with [`NamingError::Exhausted`] instead of looping.

use std::collections::HashSet;

use regex::Regex;
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "test%.case";
/// Default rule for selecting case files in a folder.
pub const DEFAULT_CASE_RULE: &str = r".*\.case$";
/// Name of the per-directory convention file.
pub const CONVENTION_FILE: &str = ".testconvention";

/// Attempts allowed when no rules are configured.
pub const UNRULED_ATTEMPTS: u32 = 10_000;
/// Attempts allowed when names must also satisfy a rule.
pub const RULED_ATTEMPTS: u32 = 5_000;

#[derive(Debug, Clone, Error)]
pub enum NamingError {
    #[error("no usable name after {attempts} attempts (too many cases, or no rule accepts the template)")]
    Exhausted { attempts: u32 },
    #[error("invalid naming rule {rule:?}: {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Decimal,
    Hex,
    Char,
}

const SUBSTITUTIONS: &[(&str, Placeholder)] = &[
    ("%", Placeholder::Decimal),
    ("$hex$", Placeholder::Hex),
    ("$chr$", Placeholder::Char),
];

impl Placeholder {
    fn render(self, counter: u32) -> String {
        match self {
            Self::Decimal => counter.to_string(),
            Self::Hex => format!("{counter:x}"),
            Self::Char => char::from_u32(counter).map(String::from).unwrap_or_default(),
        }
    }
}

/// Apply the substitution table to `template` for one counter value.
#[must_use]
pub fn expand_template(template: &str, counter: u32) -> String {
    let mut out = template.to_string();
    for (needle, placeholder) in SUBSTITUTIONS {
        if out.contains(needle) {
            out = out.replace(needle, &placeholder.render(counter));
        }
    }
    out.trim().to_string()
}

/// A template plus full-match acceptance rules.
#[derive(Debug, Clone)]
pub struct Convention {
    template: String,
    rules: Vec<Regex>,
}

impl Default for Convention {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            rules: Vec::new(),
        }
    }
}

impl Convention {
    /// Build from a template and rule sources. Each rule must match a whole name.
    pub fn new<S: AsRef<str>>(template: &str, rules: &[S]) -> Result<Self, NamingError> {
        let template = template.trim();
        let template = if template.is_empty() {
            DEFAULT_TEMPLATE
        } else {
            template
        };
        let rules = rules
            .iter()
            .map(|rule| compile_rule(rule.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            template: template.to_string(),
            rules,
        })
    }

    /// Parse `.testconvention` content: first line is the template, the rest are
    /// rules with `//` comments removed. Blank rules are skipped.
    pub fn parse(content: &str) -> Result<Self, NamingError> {
        let mut lines = content.lines();
        let template = lines.next().unwrap_or_default();
        let rules: Vec<&str> = lines.map(strip_comment).filter(|r| !r.is_empty()).collect();
        Self::new(template, &rules)
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// True when some rule accepts `name`, or when there are no rules.
    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|rule| rule.is_match(name))
    }

    /// Rules used to select case files in a folder; falls back to `*.case`.
    pub fn folder_rules(&self) -> Result<Vec<Regex>, NamingError> {
        if self.rules.is_empty() {
            Ok(vec![compile_rule(DEFAULT_CASE_RULE)?])
        } else {
            Ok(self.rules.clone())
        }
    }

    /// First expanded name not in `existing` and accepted by the rules.
    pub fn next_name<S: AsRef<str>>(&self, existing: &[S]) -> Result<String, NamingError> {
        let taken: HashSet<&str> = existing.iter().map(AsRef::as_ref).collect();
        let attempts = if self.has_rules() {
            RULED_ATTEMPTS
        } else {
            UNRULED_ATTEMPTS
        };
        (1..=attempts)
            .map(|counter| expand_template(&self.template, counter))
            .find(|name| !taken.contains(name.as_str()) && self.accepts(name))
            .ok_or(NamingError::Exhausted { attempts })
    }
}

fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or_default().trim()
}

fn compile_rule(rule: &str) -> Result<Regex, NamingError> {
    Regex::new(&format!("^(?:{rule})$")).map_err(|source| NamingError::InvalidRule {
        rule: rule.to_string(),
        source,
    })
}

/// Does any of `rules` accept `name`?
#[must_use]
pub fn matches_any(rules: &[Regex], name: &str) -> bool {
    rules.iter().any(|rule| rule.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitution_table_applies_in_order() {
        assert_eq!(expand_template("%$hex$$chr$", 90), "905aZ");
        assert_eq!(expand_template("  case_%.case\n", 7), "case_7.case");
        assert_eq!(expand_template("no_placeholder", 3), "no_placeholder");
    }

    #[test]
    fn default_convention_skips_taken_names() {
        let conv = Convention::default();
        assert_eq!(conv.next_name::<&str>(&[]).unwrap(), "test1.case");
        assert_eq!(
            conv.next_name(&["test1.case", "test2.case", "other"]).unwrap(),
            "test3.case"
        );
    }

    #[test]
    fn rules_filter_candidates() {
        let conv = Convention::new("t%.case", &[r"t\d\d\.case"]).unwrap();
        assert_eq!(conv.next_name::<&str>(&[]).unwrap(), "t10.case");
    }

    #[test]
    fn rules_must_match_whole_name() {
        let conv = Convention::new("x%.case", &["x1"]).unwrap();
        assert!(!conv.accepts("x1.case"));
        assert!(conv.accepts("x1"));
    }

    #[test]
    fn unsatisfiable_rules_exhaust() {
        let conv = Convention::new("t%.case", &["never"]).unwrap();
        assert!(matches!(
            conv.next_name::<&str>(&[]),
            Err(NamingError::Exhausted { attempts: RULED_ATTEMPTS })
        ));
    }

    #[test]
    fn constant_template_exhausts_without_rules() {
        let conv = Convention::new("fixed.case", &[] as &[&str]).unwrap();
        assert!(matches!(
            conv.next_name(&["fixed.case"]),
            Err(NamingError::Exhausted { attempts: UNRULED_ATTEMPTS })
        ));
    }

    #[test]
    fn parse_convention_file() {
        let conv = Convention::parse("case-%.bin\ncase-\\d+\\.bin // numbered\n\n// only comment\n")
            .unwrap();
        assert_eq!(conv.template(), "case-%.bin");
        assert!(conv.has_rules());
        assert!(conv.accepts("case-12.bin"));
        assert!(!conv.accepts("case-x.bin"));
    }

    #[test]
    fn empty_template_line_falls_back_to_default() {
        let conv = Convention::parse("\n").unwrap();
        assert_eq!(conv.template(), DEFAULT_TEMPLATE);
    }

    #[test]
    fn folder_rules_default_to_case_extension() {
        let rules = Convention::default().folder_rules().unwrap();
        assert!(matches_any(&rules, "a.case"));
        assert!(!matches_any(&rules, "a.case.bak"));
        assert!(!matches_any(&rules, CONVENTION_FILE));
    }

    #[test]
    fn invalid_rule_is_reported() {
        assert!(matches!(
            Convention::new("t%", &["("]),
            Err(NamingError::InvalidRule { .. })
        ));
    }
}
