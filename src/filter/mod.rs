use std::collections::BTreeMap;

use regex::Regex;

use crate::app::{RelayError, Result};

/// Prefix marking a pattern that must *not* match.
pub const NEGATION_PREFIX: char = '!';

#[derive(Debug, Clone)]
struct ActiveFilter {
    name: String,
    regex: Regex,
    negated: bool,
}

/// Ordered set of named patterns; a title passes iff every active one agrees.
#[derive(Debug, Clone, Default)]
pub struct RegexFilterChain {
    active: Vec<ActiveFilter>,
}

impl RegexFilterChain {
    pub fn new(patterns: &BTreeMap<String, String>, active: &[String]) -> Result<Self> {
        let active = active
            .iter()
            .map(|name| {
                let pattern = patterns
                    .get(name)
                    .ok_or_else(|| RelayError::Config(format!("Unknown filter: {}", name)))?;
                let (negated, source) = match pattern.strip_prefix(NEGATION_PREFIX) {
                    Some(rest) => (true, rest),
                    None => (false, pattern.as_str()),
                };
                Ok(ActiveFilter {
                    name: name.clone(),
                    regex: Regex::new(source)?,
                    negated,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { active })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.active
            .iter()
            .all(|f| f.regex.is_match(text) != f.negated)
    }

    /// Names of the active filters rejecting `text`, for logging.
    pub fn rejected_by(&self, text: &str) -> Vec<&str> {
        self.active
            .iter()
            .filter(|f| f.regex.is_match(text) == f.negated)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
