//! Deterministic keyword category rules
//!
//! A rule maps a case-insensitive regex over the transaction description to
//! a category id. Rules only ever prefill the category *hint* on staged
//! rows; the reviewer can always override before commit.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::models::CategoryRule;

/// A set of compiled rules, applied in creation order (first match wins)
pub struct RuleSet {
    rules: Vec<(Regex, i64)>,
}

impl RuleSet {
    /// Compile stored rules. Rules whose pattern fails to compile are logged
    /// and skipped rather than poisoning the whole set.
    pub fn compile(rules: &[CategoryRule]) -> Self {
        let compiled = rules
            .iter()
            .filter_map(|rule| {
                match RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                {
                    Ok(re) => Some((re, rule.category_id)),
                    Err(e) => {
                        warn!(rule_id = rule.id, error = %e, "Skipping unparsable category rule");
                        None
                    }
                }
            })
            .collect();
        Self { rules: compiled }
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Category hint for a description, if any rule matches
    pub fn categorize(&self, description: &str) -> Option<i64> {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(description))
            .map(|(_, category_id)| *category_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rule(id: i64, pattern: &str, category_id: i64) -> CategoryRule {
        CategoryRule {
            id,
            pattern: pattern.to_string(),
            category_id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let set = RuleSet::compile(&[
            rule(1, "swiggy|zomato", 10),
            rule(2, "zomato", 20),
        ]);
        assert_eq!(set.categorize("ZOMATO ORDER 4411"), Some(10));
    }

    #[test]
    fn test_case_insensitive() {
        let set = RuleSet::compile(&[rule(1, "salary", 7)]);
        assert_eq!(set.categorize("NEFT SALARY JAN"), Some(7));
    }

    #[test]
    fn test_no_match() {
        let set = RuleSet::compile(&[rule(1, "uber", 3)]);
        assert_eq!(set.categorize("GROCERY STORE"), None);
    }

    #[test]
    fn test_bad_pattern_skipped() {
        let set = RuleSet::compile(&[rule(1, "([", 3), rule(2, "metro", 4)]);
        assert_eq!(set.categorize("METRO CARD RECHARGE"), Some(4));
    }
}
