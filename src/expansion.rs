//! Pointer expansion rules.
//!
//! A pointer to a record can be emitted with its full elaborated type,
//! `(:pointer (:struct foo))`, or as an opaque `:pointer`. Batch files
//! control which tag names get the full form through include/exclude blocks
//! of literal names and regex patterns.

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;

/// One include or exclude block: literal names plus regex patterns.
///
/// `match` accepts either a single pattern or a list of them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchBlock {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default, rename = "match")]
    pub patterns: OneOrMany,
}

/// A YAML value that is either one string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    fn as_slice(&self) -> &[String] {
        match self {
            OneOrMany::One(pattern) => std::slice::from_ref(pattern),
            OneOrMany::Many(patterns) => patterns,
        }
    }
}

/// Raw expansion configuration as written in a batch file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpansionConfig {
    pub include: Option<MatchBlock>,
    pub exclude: Option<MatchBlock>,
}

/// Compiled expansion rules, exposed as a predicate over tag names.
pub struct ExpansionRules {
    include_names: HashSet<String>,
    include_patterns: Vec<Regex>,
    exclude_names: HashSet<String>,
    exclude_patterns: Vec<Regex>,
    has_include: bool,
}

impl ExpansionRules {
    /// Rules that expand every pointer. The default.
    pub fn allow_all() -> Self {
        ExpansionRules {
            include_names: HashSet::new(),
            include_patterns: Vec::new(),
            exclude_names: HashSet::new(),
            exclude_patterns: Vec::new(),
            has_include: false,
        }
    }

    /// Compile a configuration block into a predicate.
    pub fn from_config(config: &ExpansionConfig) -> Result<Self, regex::Error> {
        let (include_names, include_patterns, has_include) = match &config.include {
            Some(block) => (
                block.names.iter().cloned().collect(),
                compile(block.patterns.as_slice())?,
                !block.names.is_empty() || !block.patterns.as_slice().is_empty(),
            ),
            None => (HashSet::new(), Vec::new(), false),
        };
        let (exclude_names, exclude_patterns) = match &config.exclude {
            Some(block) => (
                block.names.iter().cloned().collect(),
                compile(block.patterns.as_slice())?,
            ),
            None => (HashSet::new(), Vec::new()),
        };
        Ok(ExpansionRules {
            include_names,
            include_patterns,
            exclude_names,
            exclude_patterns,
            has_include,
        })
    }

    /// Whether pointers to the record tagged `name` get the elaborated form.
    pub fn allows(&self, name: &str) -> bool {
        if self.has_include
            && !self.include_names.contains(name)
            && !matches_any(&self.include_patterns, name)
        {
            return false;
        }
        !self.exclude_names.contains(name) && !matches_any(&self.exclude_patterns, name)
    }
}

impl Default for ExpansionRules {
    fn default() -> Self {
        ExpansionRules::allow_all()
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, regex::Error> {
    patterns.iter().map(|pattern| Regex::new(pattern)).collect()
}

fn matches_any(patterns: &[Regex], name: &str) -> bool {
    patterns.iter().any(|pattern| pattern.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(yaml: &str) -> ExpansionRules {
        let config: ExpansionConfig = serde_yaml::from_str(yaml).unwrap();
        ExpansionRules::from_config(&config).unwrap()
    }

    #[test]
    fn no_rules_allows_everything() {
        let rules = ExpansionRules::allow_all();
        assert!(rules.allows("anything"));
    }

    #[test]
    fn empty_include_block_allows_everything() {
        let rules = rules("include: {}");
        assert!(rules.allows("anything"));
    }

    #[test]
    fn whitelist_allows_only_listed_names() {
        let rules = rules("include:\n  names: [foo, bar, baz]");
        for name in ["foo", "bar", "baz"] {
            assert!(rules.allows(name));
        }
        assert!(!rules.allows("fooBar"));
    }

    #[test]
    fn blacklist_allows_everything_else() {
        let rules = rules("exclude:\n  names: [foo, bar, baz]");
        for name in ["foo", "bar", "baz"] {
            assert!(!rules.allows(name));
        }
        assert!(rules.allows("fooBar"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let rules = rules(
            "include:\n  names: [foo, cheese, curds]\nexclude:\n  names: [foo, bar, baz]",
        );
        for name in ["foo", "bar", "baz"] {
            assert!(!rules.allows(name));
        }
        for name in ["cheese", "curds"] {
            assert!(rules.allows(name));
        }
        assert!(!rules.allows("fish"));
    }

    #[test]
    fn match_accepts_a_single_pattern() {
        let rules = rules("include:\n  match: \"^wl_\"");
        assert!(rules.allows("wl_display"));
        assert!(!rules.allows("xdg_surface"));
    }

    #[test]
    fn match_accepts_a_pattern_list() {
        let rules = rules("exclude:\n  match: [\"^_\", \"_private$\"]");
        assert!(!rules.allows("_internal"));
        assert!(!rules.allows("conn_private"));
        assert!(rules.allows("connection"));
    }
}
