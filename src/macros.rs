//! Helpers for turning `#define`s into lisp constants.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

/// Convert a single-token macro body into a lisp literal. Hex integers
/// render as `#x...`; plain integers, decimal floats, and double-quoted
/// strings pass through unchanged. Returns `None` for anything else.
pub fn convert_literal(body: &str) -> Option<String> {
    let body = body.trim();
    if let Some(digits) = body
        .strip_prefix("0x")
        .or_else(|| body.strip_prefix("0X"))
    {
        let digits = digits.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
        let value = u64::from_str_radix(digits, 16).ok()?;
        return Some(format!("#x{:x}", value));
    }
    static LITERAL: OnceLock<Regex> = OnceLock::new();
    let literal = LITERAL.get_or_init(|| Regex::new(r#"^("(.*)"|[0-9]+\.?[0-9]*)$"#).unwrap());
    if literal.is_match(body) {
        Some(body.to_string())
    } else {
        None
    }
}

/// Whether `name` looks like the include guard of `file`: the uppercased
/// macro name ends with the file name's `STEM_EXT` form (`foo/bar_baz.h`
/// matches `BAR_BAZ_H` and `__SOME_PREFIX_BAR_BAZ_H`).
pub fn matches_file_path(file: &str, name: &str) -> bool {
    let file_name = match Path::new(file).file_name() {
        Some(file_name) => file_name.to_string_lossy().into_owned(),
        None => return false,
    };
    let candidate = file_name.replace('.', "_").to_uppercase();
    name.to_uppercase().ends_with(&candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_decimal_integers() {
        assert_eq!(convert_literal("512").as_deref(), Some("512"));
    }

    #[test]
    fn converts_hex_to_sharp_x() {
        assert_eq!(convert_literal("0x1000").as_deref(), Some("#x1000"));
        assert_eq!(convert_literal("0xFFul").as_deref(), Some("#xff"));
    }

    #[test]
    fn converts_floats_and_strings() {
        assert_eq!(convert_literal("2.5").as_deref(), Some("2.5"));
        assert_eq!(convert_literal("\"1.2.0\"").as_deref(), Some("\"1.2.0\""));
    }

    #[test]
    fn rejects_expressions() {
        assert_eq!(convert_literal("(1 << 4)"), None);
        assert_eq!(convert_literal("FOO | BAR"), None);
    }

    #[test]
    fn guard_matches_file_stem() {
        assert!(matches_file_path("inputs/standard_types.h", "STANDARD_TYPES_H"));
        assert!(matches_file_path("macros.h", "__LIBFOO_MACROS_H"));
        assert!(!matches_file_path("macros.h", "BUFFER_SIZE"));
    }
}
