//! C type to CFFI type translation.

use log::warn;

use crate::ast::{CType, IntWidth, RecordKind, Signedness};
use crate::expansion::ExpansionRules;
use crate::mangler::{apply_chain, Mangler};

/// Typedef names from `<stdint.h>`, `<stddef.h>`, and `<sys/types.h>` with
/// their CFFI counterparts. These don't have to be resolved through an
/// include, the mapping is fixed.
pub const KNOWN_TYPEDEFS: &[(&str, &str)] = &[
    ("uint64_t", ":uint64"),
    ("uint32_t", ":uint32"),
    ("uint16_t", ":uint16"),
    ("uint8_t", ":uint8"),
    ("int64_t", ":int64"),
    ("int32_t", ":int32"),
    ("int16_t", ":int16"),
    ("int8_t", ":int8"),
    ("size_t", ":size"),
    ("ssize_t", ":ssize"),
    ("uintptr_t", ":uintptr"),
    ("intptr_t", ":intptr"),
    ("ptrdiff_t", ":ptrdiff"),
];

/// A translated type: the CFFI expression plus an optional end-of-line
/// comment the emitter appends after the enclosing form.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub expr: String,
    pub note: Option<String>,
}

impl TypeExpr {
    fn plain(expr: impl Into<String>) -> Self {
        TypeExpr {
            expr: expr.into(),
            note: None,
        }
    }

    fn with_note(expr: impl Into<String>, note: impl Into<String>) -> Self {
        TypeExpr {
            expr: expr.into(),
            note: Some(note.into()),
        }
    }
}

/// Translates `CType`s into CFFI type strings and owns the type and typedef
/// mangler chains.
pub struct TypeTransformer<'a> {
    type_manglers: &'a [Box<dyn Mangler>],
    typedef_manglers: &'a [Box<dyn Mangler>],
    expansion: &'a ExpansionRules,
}

impl<'a> TypeTransformer<'a> {
    pub fn new(
        type_manglers: &'a [Box<dyn Mangler>],
        typedef_manglers: &'a [Box<dyn Mangler>],
        expansion: &'a ExpansionRules,
    ) -> Self {
        TypeTransformer {
            type_manglers,
            typedef_manglers,
            expansion,
        }
    }

    /// The fixed CFFI keyword for a known typedef name, if there is one.
    pub fn known_typedef(name: &str) -> Option<&'static str> {
        KNOWN_TYPEDEFS
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, keyword)| *keyword)
    }

    /// Mangle a struct/union/enum tag or function name.
    pub fn mangle_type(&self, name: &str) -> String {
        apply_chain(self.type_manglers, name)
    }

    /// Mangle a typedef name.
    pub fn mangle_typedef(&self, name: &str) -> String {
        apply_chain(self.typedef_manglers, name)
    }

    /// Translate a type reference into its CFFI form.
    pub fn lisp_type(&self, ty: &CType) -> TypeExpr {
        match ty {
            CType::Void => TypeExpr::plain(":void"),
            CType::Bool => TypeExpr::plain(":bool"),
            CType::Char => TypeExpr::plain(":char"),
            CType::SignedChar => TypeExpr::plain(":signed-char"),
            CType::UnsignedChar => TypeExpr::plain(":unsigned-char"),
            CType::Int { width, sign } => TypeExpr::plain(int_keyword(*width, *sign)),
            CType::Float => TypeExpr::plain(":float"),
            CType::Double => TypeExpr::plain(":double"),
            CType::LongDouble => TypeExpr::plain(":long-double"),
            CType::Named(name) => match Self::known_typedef(name) {
                Some(keyword) => TypeExpr::plain(keyword),
                None => TypeExpr::plain(format!(
                    ":{}",
                    self.mangle_typedef(&name.to_lowercase())
                )),
            },
            CType::Record(record) => match &record.tag {
                Some(tag) => TypeExpr::plain(format!(
                    "({} {})",
                    record_keyword(record.kind),
                    self.mangle_type(&tag.to_lowercase())
                )),
                None => {
                    warn!("anonymous record used as a bare type, emitting :void");
                    TypeExpr::plain(":void")
                }
            },
            CType::Enum(definition) => match &definition.tag {
                Some(tag) => TypeExpr::with_note(":int", tag.to_lowercase()),
                None => TypeExpr::with_note(":int", "anonymous enum"),
            },
            CType::Pointer(pointee) => match pointee.as_ref() {
                CType::Function { .. } => {
                    warn!("function pointer emitted as bare :pointer");
                    TypeExpr::plain(":pointer")
                }
                CType::Record(record) => match &record.tag {
                    Some(tag) if self.expansion.allows(tag) => {
                        let inner = self.lisp_type(pointee);
                        TypeExpr {
                            expr: format!("(:pointer {})", inner.expr),
                            note: inner.note,
                        }
                    }
                    _ => TypeExpr::plain(":pointer"),
                },
                _ => {
                    let inner = self.lisp_type(pointee);
                    TypeExpr {
                        expr: format!("(:pointer {})", inner.expr),
                        note: inner.note,
                    }
                }
            },
            CType::Array { elem, len } => {
                let inner = self.lisp_type(elem);
                let note = match len {
                    Some(len) => format!("array (size {})", len),
                    None => "array".to_string(),
                };
                TypeExpr::with_note(format!("(:pointer {})", inner.expr), note)
            }
            CType::Function { .. } => {
                warn!("bare function type emitted as :pointer");
                TypeExpr::plain(":pointer")
            }
        }
    }
}

fn int_keyword(width: IntWidth, sign: Signedness) -> &'static str {
    match (width, sign) {
        (IntWidth::Short, Signedness::Signed) => ":short",
        (IntWidth::Short, Signedness::Unsigned) => ":unsigned-short",
        (IntWidth::Int, Signedness::Signed) => ":int",
        (IntWidth::Int, Signedness::Unsigned) => ":unsigned-int",
        (IntWidth::Long, Signedness::Signed) => ":long",
        (IntWidth::Long, Signedness::Unsigned) => ":unsigned-long",
        (IntWidth::LongLong, Signedness::Signed) => ":long-long",
        (IntWidth::LongLong, Signedness::Unsigned) => ":unsigned-long-long",
    }
}

fn record_keyword(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Struct => ":struct",
        RecordKind::Union => ":union",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::RecordType;
    use crate::mangler::UnderscoreMangler;

    fn manglers() -> Vec<Box<dyn Mangler>> {
        vec![Box::new(UnderscoreMangler)]
    }

    #[test]
    fn fixed_width_typedefs_map_to_cffi_keywords() {
        for (name, keyword) in [
            ("int8_t", ":int8"),
            ("int16_t", ":int16"),
            ("int32_t", ":int32"),
            ("int64_t", ":int64"),
            ("uint8_t", ":uint8"),
            ("uint16_t", ":uint16"),
            ("uint32_t", ":uint32"),
            ("uint64_t", ":uint64"),
        ] {
            assert_eq!(TypeTransformer::known_typedef(name), Some(keyword));
        }
    }

    #[test]
    fn size_typedefs_map_to_cffi_keywords() {
        for (name, keyword) in [
            ("size_t", ":size"),
            ("ssize_t", ":ssize"),
            ("uintptr_t", ":uintptr"),
            ("intptr_t", ":intptr"),
            ("ptrdiff_t", ":ptrdiff"),
        ] {
            assert_eq!(TypeTransformer::known_typedef(name), Some(keyword));
        }
    }

    #[test]
    fn unknown_typedefs_get_a_keyword_prefix() {
        let type_manglers = manglers();
        let typedef_manglers = manglers();
        let rules = ExpansionRules::allow_all();
        let transformer = TypeTransformer::new(&type_manglers, &typedef_manglers, &rules);
        let expr = transformer.lisp_type(&CType::Named("wl_fixed_t".into()));
        assert_eq!(expr.expr, ":wl-fixed-t");
    }

    #[test]
    fn pointer_expansion_rules_gate_record_pointers() {
        let type_manglers = manglers();
        let typedef_manglers = manglers();
        let config: crate::expansion::ExpansionConfig =
            serde_yaml::from_str("exclude:\n  names: [opaque]").unwrap();
        let rules = ExpansionRules::from_config(&config).unwrap();
        let transformer = TypeTransformer::new(&type_manglers, &typedef_manglers, &rules);

        let open = CType::Pointer(Box::new(CType::Record(RecordType {
            kind: RecordKind::Struct,
            tag: Some("point".into()),
            fields: None,
        })));
        assert_eq!(transformer.lisp_type(&open).expr, "(:pointer (:struct point))");

        let opaque = CType::Pointer(Box::new(CType::Record(RecordType {
            kind: RecordKind::Struct,
            tag: Some("opaque".into()),
            fields: None,
        })));
        assert_eq!(transformer.lisp_type(&opaque).expr, ":pointer");
    }

    #[test]
    fn arrays_decay_to_pointers_with_a_note() {
        let type_manglers = manglers();
        let typedef_manglers = manglers();
        let rules = ExpansionRules::allow_all();
        let transformer = TypeTransformer::new(&type_manglers, &typedef_manglers, &rules);
        let array = CType::Array {
            elem: Box::new(CType::Char),
            len: Some(16),
        };
        let expr = transformer.lisp_type(&array);
        assert_eq!(expr.expr, "(:pointer :char)");
        assert_eq!(expr.note.as_deref(), Some("array (size 16)"));
    }
}
