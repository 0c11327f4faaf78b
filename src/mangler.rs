//! Manglers transform C names into lisp symbol names.
//!
//! Each mangler provides one transformation; a chain of them is applied to
//! every C name of a given kind (types, enum variants, parameters,
//! constants). The `UnderscoreMangler`, for example, converts `_` into `-`.

use convert_case::{Case, Casing};
use regex::Regex;

/// One name transformation in a mangler chain.
pub trait Mangler {
    /// Whether this mangler knows how to transform `name`.
    fn can_mangle(&self, name: &str) -> bool;
    /// Return a new string with the transformation applied.
    fn mangle(&self, name: &str) -> String;
}

/// Apply every applicable mangler of `chain` to `name`, in order.
pub fn apply_chain(chain: &[Box<dyn Mangler>], name: &str) -> String {
    let mut name = name.to_string();
    for mangler in chain {
        if mangler.can_mangle(&name) {
            name = mangler.mangle(&name);
        }
    }
    name
}

/// Converts underscores to dashes.
pub struct UnderscoreMangler;

impl Mangler for UnderscoreMangler {
    fn can_mangle(&self, name: &str) -> bool {
        name.contains('_')
    }

    fn mangle(&self, name: &str) -> String {
        name.replace('_', "-")
    }
}

/// Turns a name into a keyword symbol. Names that already carry a package
/// prefix are left alone, common lisp won't accept a second colon.
pub struct KeywordMangler;

impl Mangler for KeywordMangler {
    fn can_mangle(&self, name: &str) -> bool {
        !name.contains(':')
    }

    fn mangle(&self, name: &str) -> String {
        format!(":{}", name)
    }
}

/// Wraps a name in `+` markers for a constant, keeping any package prefix
/// outside the markers (`pkg:sym` becomes `pkg:+sym+`).
pub struct ConstantMangler;

impl Mangler for ConstantMangler {
    fn can_mangle(&self, _name: &str) -> bool {
        true
    }

    fn mangle(&self, name: &str) -> String {
        match name.rfind(':') {
            Some(index) => format!("{}:+{}+", &name[..index], &name[index + 1..]),
            None => format!("+{}+", name),
        }
    }
}

/// Replaces a leading prefix with a given string.
pub struct PrefixMangler {
    prefix: String,
    replace: String,
}

impl PrefixMangler {
    pub fn new(prefix: impl Into<String>, replace: impl Into<String>) -> Self {
        PrefixMangler {
            prefix: prefix.into(),
            replace: replace.into(),
        }
    }
}

impl Mangler for PrefixMangler {
    fn can_mangle(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    fn mangle(&self, name: &str) -> String {
        format!("{}{}", self.replace, &name[self.prefix.len()..])
    }
}

/// Substitutes every match of a regex with a replacement string.
pub struct RegexSubMangler {
    regex: Regex,
    replace: String,
}

impl RegexSubMangler {
    pub fn new(regex: Regex, replace: impl Into<String>) -> Self {
        RegexSubMangler {
            regex,
            replace: replace.into(),
        }
    }
}

impl Mangler for RegexSubMangler {
    fn can_mangle(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    fn mangle(&self, name: &str) -> String {
        self.regex.replace_all(name, self.replace.as_str()).into_owned()
    }
}

/// Converts CamelCase names to kebab-case. Snake_case names are left for the
/// `UnderscoreMangler`.
pub struct CamelCaseConverter;

impl Mangler for CamelCaseConverter {
    fn can_mangle(&self, name: &str) -> bool {
        !name.contains('_')
    }

    fn mangle(&self, name: &str) -> String {
        name.to_case(Case::Kebab)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscores_become_dashes() {
        assert!(UnderscoreMangler.can_mangle("std_int_fn"));
        assert_eq!(UnderscoreMangler.mangle("std_int_fn"), "std-int-fn");
        assert!(!UnderscoreMangler.can_mangle("plain"));
    }

    #[test]
    fn keyword_mangler_skips_package_prefixes() {
        assert_eq!(KeywordMangler.mangle("red"), ":red");
        assert!(!KeywordMangler.can_mangle("pkg:red"));
    }

    #[test]
    fn constant_mangler_wraps_in_plus() {
        assert_eq!(ConstantMangler.mangle("max-path"), "+max-path+");
        assert_eq!(ConstantMangler.mangle("pkg:max-path"), "pkg:+max-path+");
    }

    #[test]
    fn prefix_mangler_replaces_once() {
        let mangler = PrefixMangler::new("wfx_", "");
        assert!(mangler.can_mangle("wfx_send"));
        assert_eq!(mangler.mangle("wfx_send"), "send");
        assert!(!mangler.can_mangle("send_wfx_"));
    }

    #[test]
    fn regex_mangler_substitutes_matches() {
        let mangler = RegexSubMangler::new(Regex::new("[0-9]+").unwrap(), "N");
        assert!(mangler.can_mangle("sha256_update"));
        assert_eq!(mangler.mangle("sha256_update"), "shaN_update");
    }

    #[test]
    fn camel_case_converts_title_case() {
        assert_eq!(CamelCaseConverter.mangle("TestTitleCase"), "test-title-case");
    }

    #[test]
    fn camel_case_converts_mixed_case() {
        assert_eq!(CamelCaseConverter.mangle("camelCase"), "camel-case");
    }

    #[test]
    fn camel_case_keeps_all_lowercase() {
        assert_eq!(CamelCaseConverter.mangle("camels"), "camels");
    }

    #[test]
    fn camel_case_converts_trailing_acronym() {
        assert_eq!(CamelCaseConverter.mangle("ThingDNE"), "thing-dne");
    }

    #[test]
    fn camel_case_leaves_snake_names_alone() {
        assert!(!CamelCaseConverter.can_mangle("GRAVITY_TOP_RIGHT"));
    }

    #[test]
    fn chain_applies_in_order() {
        let chain: Vec<Box<dyn Mangler>> = vec![Box::new(KeywordMangler), Box::new(UnderscoreMangler)];
        assert_eq!(apply_chain(&chain, "color_red"), ":color-red");
    }
}
