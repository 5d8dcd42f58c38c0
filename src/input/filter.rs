// Released under MIT License.
// Copyright (c) 2024 Ladislav Bartos

//! Contains the implementation of the `SystemFilter` structure.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::composition::base_system;
use crate::errors::ConfigError;

/// Selection of systems by their name.
///
/// Patterns are regular expressions matched case-insensitively against the base name
/// of the system (replicas `Cv-1`, `Cv-2`, ... are all matched as `Cv`).
/// A system is selected if it matches at least one `include` pattern (or no `include`
/// pattern is given) and it matches none of the `exclude` patterns.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "FilterPatterns")]
pub struct SystemFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FilterPatterns {
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    exclude: Vec<String>,
}

impl TryFrom<FilterPatterns> for SystemFilter {
    type Error = ConfigError;

    fn try_from(value: FilterPatterns) -> Result<Self, Self::Error> {
        SystemFilter::new(&value.include, &value.exclude)
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidRegex(pattern.to_owned(), e))
}

impl SystemFilter {
    /// Create a new filter from lists of `include` and `exclude` patterns.
    pub fn new(
        include: &[impl AsRef<str>],
        exclude: &[impl AsRef<str>],
    ) -> Result<Self, ConfigError> {
        Ok(SystemFilter {
            include: include
                .iter()
                .map(|p| compile(p.as_ref()))
                .collect::<Result<Vec<_>, _>>()?,
            exclude: exclude
                .iter()
                .map(|p| compile(p.as_ref()))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    /// Filter selecting every system.
    pub fn all() -> Self {
        SystemFilter::default()
    }

    /// Is the system with the given name selected by the filter?
    pub fn matches(&self, system: &str) -> bool {
        let base = base_system(system);

        let included = self.include.is_empty() || self.include.iter().any(|r| r.is_match(base));
        included && !self.exclude.iter().any(|r| r.is_match(base))
    }

    /// Returns `true` if the filter selects every system.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_all() {
        let filter = SystemFilter::all();
        assert!(filter.is_empty());
        assert!(filter.matches("pt6sn8"));
        assert!(filter.matches("Cv-3"));
    }

    #[test]
    fn filter_include() {
        let filter = SystemFilter::new(&["^pt6sn\\d+$"], &[] as &[&str]).unwrap();
        assert!(filter.matches("pt6sn8"));
        assert!(filter.matches("Pt6Sn4"));
        assert!(!filter.matches("pt8sn2"));
        assert!(!filter.matches("pt6sn8o4"));
    }

    #[test]
    fn filter_exclude_base_system() {
        let filter = SystemFilter::new(&[] as &[&str], &["^cv$"]).unwrap();
        assert!(!filter.matches("Cv"));
        assert!(!filter.matches("Cv-2"));
        assert!(filter.matches("pt6sn8o4"));
    }

    #[test]
    fn filter_include_and_exclude() {
        let filter = SystemFilter::new(&["pt"], &["o\\d"]).unwrap();
        assert!(filter.matches("pt8sn4"));
        assert!(!filter.matches("pt8sn4o2"));
        assert!(!filter.matches("air68"));
    }

    #[test]
    fn filter_invalid_regex() {
        assert!(matches!(
            SystemFilter::new(&["pt("], &[] as &[&str]),
            Err(ConfigError::InvalidRegex(_, _))
        ));
    }

    #[test]
    fn filter_yaml() {
        let filter: SystemFilter =
            serde_yaml::from_str("include: [\"^pt8\"]\nexclude: [\"o\\\\d\"]\n").unwrap();
        assert!(filter.matches("pt8sn3"));
        assert!(!filter.matches("pt8sn3o1"));
        assert!(!filter.matches("pt6sn3"));
    }
}
