//! Walks parsed declarations and writes CFFI binding forms.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::ast::{CType, Decl, Enumerator, Location, Param, RecordKind, RecordType};
use crate::error::Result;
use crate::expansion::{ExpansionConfig, ExpansionRules};
use crate::macros;
use crate::mangler::{
    apply_chain, ConstantMangler, KeywordMangler, Mangler, UnderscoreMangler,
};
use crate::parser;
use crate::types::TypeTransformer;

/// Options for one processing run.
///
/// Manglers are applied in the order they are given: enum manglers to enum
/// variants, type manglers to tag and function names, name manglers to
/// parameters and fields, typedef manglers to typedef names, and constant
/// manglers to macro and flushed-enum constants.
pub struct ProcessOptions {
    pub enum_manglers: Vec<Box<dyn Mangler>>,
    pub type_manglers: Vec<Box<dyn Mangler>>,
    pub name_manglers: Vec<Box<dyn Mangler>>,
    pub typedef_manglers: Vec<Box<dyn Mangler>>,
    pub constant_manglers: Vec<Box<dyn Mangler>>,
    /// Written as `(cl:in-package :name)` ahead of the bindings.
    pub package: Option<String>,
    /// Search path for quoted includes.
    pub include_dirs: Vec<PathBuf>,
    pub expansion: ExpansionConfig,
    /// Drop macros that look like include guards.
    pub skip_header_guards: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            enum_manglers: vec![Box::new(KeywordMangler), Box::new(UnderscoreMangler)],
            type_manglers: vec![Box::new(UnderscoreMangler)],
            name_manglers: vec![Box::new(UnderscoreMangler)],
            typedef_manglers: vec![Box::new(UnderscoreMangler)],
            constant_manglers: vec![Box::new(UnderscoreMangler), Box::new(ConstantMangler)],
            package: None,
            include_dirs: Vec::new(),
            expansion: ExpansionConfig::default(),
            skip_header_guards: true,
        }
    }
}

/// Where generated bindings go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl Output {
    /// `":stdout"` and `":stderr"` name the standard streams, anything else
    /// is a file path.
    pub fn parse(value: &str) -> Output {
        match value {
            ":stdout" => Output::Stdout,
            ":stderr" => Output::Stderr,
            path => Output::File(PathBuf::from(path)),
        }
    }

    pub fn open(&self) -> io::Result<Box<dyn Write>> {
        match self {
            Output::Stdout => Ok(Box::new(io::stdout())),
            Output::Stderr => Ok(Box::new(io::stderr())),
            Output::File(path) => {
                if path.exists() {
                    warn!("overwriting {}", path.display());
                }
                Ok(Box::new(BufWriter::new(File::create(path)?)))
            }
        }
    }
}

/// Write the `(cl:in-package ...)` form ahead of any bindings.
pub fn write_package_form<W: Write + ?Sized>(output: &mut W, package: &str) -> io::Result<()> {
    write!(output, "(cl:in-package :{})\n\n", package)
}

/// Parse `path` and write bindings for the declarations it contains.
/// Declarations pulled in through includes only feed name resolution.
pub fn process_file<W: Write + ?Sized>(
    path: &Path,
    options: &ProcessOptions,
    output: &mut W,
) -> Result<()> {
    info!("processing file: {}", path.display());
    let rules = ExpansionRules::from_config(&options.expansion)?;
    let decls = parser::parse_header(path, &options.include_dirs)?;
    let main_file = path.to_string_lossy();
    let mut processor = FileProcessor::new(options, &rules, output);
    processor.process(&decls, &main_file)
}

/// Emits binding forms for one file's declarations.
pub struct FileProcessor<'a, W: Write + ?Sized> {
    options: &'a ProcessOptions,
    types: TypeTransformer<'a>,
    output: &'a mut W,
    /// Anonymous enums held back for a typedef; flushed as constants at the
    /// end of the file if nothing realized them.
    pending_enums: Vec<(Vec<Enumerator>, Location)>,
    pending_records: Vec<(RecordKind, Location)>,
}

impl<'a, W: Write + ?Sized> FileProcessor<'a, W> {
    pub fn new(
        options: &'a ProcessOptions,
        rules: &'a ExpansionRules,
        output: &'a mut W,
    ) -> Self {
        FileProcessor {
            types: TypeTransformer::new(
                &options.type_manglers,
                &options.typedef_manglers,
                rules,
            ),
            options,
            output,
            pending_enums: Vec::new(),
            pending_records: Vec::new(),
        }
    }

    /// Process every declaration located in `main_file`, then flush
    /// held-back anonymous enums.
    pub fn process(&mut self, decls: &[Decl], main_file: &str) -> Result<()> {
        for decl in decls {
            if decl.location().file.as_ref() != main_file {
                continue;
            }
            match decl {
                Decl::Function {
                    name,
                    ret,
                    params,
                    variadic,
                    location,
                } => self.process_function(name, ret, params, *variadic, location)?,
                Decl::Record { record, location } => match (&record.tag, &record.fields) {
                    (Some(tag), Some(_)) => {
                        let name = self.types.mangle_type(&tag.to_lowercase());
                        self.emit_record(&name, record)?;
                    }
                    (_, None) => debug!("skipping forward declaration at {}", location),
                    (None, Some(_)) => {
                        self.pending_records.push((record.kind, location.clone()));
                    }
                },
                Decl::Enum {
                    definition,
                    location,
                } => match (&definition.tag, &definition.variants) {
                    (Some(tag), Some(variants)) => {
                        let name = self.types.mangle_type(&tag.to_lowercase());
                        self.emit_enum(&name, variants)?;
                    }
                    (_, None) => debug!("skipping forward declaration at {}", location),
                    (None, Some(variants)) => {
                        self.pending_enums.push((variants.clone(), location.clone()));
                    }
                },
                Decl::Typedef {
                    name, underlying, ..
                } => self.process_typedef(name, underlying)?,
                Decl::Var { name, location } => {
                    warn!("not processing var decl {} at {}", name, location);
                }
                Decl::MacroDef {
                    name,
                    body,
                    function_like,
                    is_guard,
                    location,
                } => self.process_macro(name, body.as_deref(), *function_like, *is_guard, location)?,
                Decl::Include { .. } => {}
            }
        }
        self.flush_pending()
    }

    fn process_function(
        &mut self,
        name: &str,
        ret: &CType,
        params: &[Param],
        variadic: bool,
        location: &Location,
    ) -> Result<()> {
        let mangled = self.types.mangle_type(&name.to_lowercase());
        let ret_expr = self.types.lisp_type(ret);

        if name == mangled {
            write!(self.output, "(defcfun \"{}\" {}", name, ret_expr.expr)?;
        } else {
            write!(
                self.output,
                "(defcfun (\"{}\" {}) {}",
                name, mangled, ret_expr.expr
            )?;
        }
        let mut last_note = ret_expr.note;
        if let Some(note) = &last_note {
            write!(self.output, " ; {}", note)?;
        }

        for param in params {
            let arg_name = if param.name.is_empty() {
                "unknown".to_string()
            } else {
                param.name.to_lowercase()
            };
            let arg_mangled = apply_chain(&self.options.name_manglers, &arg_name);
            let arg_expr = self.types.lisp_type(&param.ty);
            write!(self.output, "\n  ({} {})", arg_mangled, arg_expr.expr)?;
            if let Some(note) = &arg_expr.note {
                write!(self.output, " ; {}", note)?;
            }
            last_note = arg_expr.note;
        }
        if variadic {
            warn!("skipping variadic arguments of {} at {}", name, location);
        }
        self.close_form(last_note.is_some())
    }

    /// Write one struct or union. Anonymous record-typed fields are emitted
    /// first as their own records named `outer-field`; anonymous enum-typed
    /// fields are flushed as constants and typed `:int`.
    fn emit_record(&mut self, name: &str, record: &RecordType) -> Result<()> {
        let keyword = match record.kind {
            RecordKind::Struct => "defcstruct",
            RecordKind::Union => "defcunion",
        };
        let fields = record.fields.as_deref().unwrap_or(&[]);
        let mut body = String::new();
        let mut last_note = false;
        for field in fields {
            let field_name = apply_chain(&self.options.name_manglers, &field.name.to_lowercase());
            let (expr, note) = match &field.ty {
                CType::Record(inner) if inner.fields.is_some() => {
                    let inner_name = match &inner.tag {
                        Some(tag) => self.types.mangle_type(&tag.to_lowercase()),
                        None => format!("{}-{}", name, field_name),
                    };
                    self.emit_record(&inner_name, inner)?;
                    let reference = match inner.kind {
                        RecordKind::Struct => ":struct",
                        RecordKind::Union => ":union",
                    };
                    (format!("({} {})", reference, inner_name), None)
                }
                CType::Enum(inner) if inner.variants.is_some() => match &inner.tag {
                    Some(_) => {
                        let expr = self.types.lisp_type(&field.ty);
                        (expr.expr, expr.note)
                    }
                    None => {
                        self.emit_enum_constants(inner.variants.as_ref().unwrap())?;
                        (":int".to_string(), None)
                    }
                },
                _ => {
                    let expr = self.types.lisp_type(&field.ty);
                    (expr.expr, expr.note)
                }
            };
            body.push_str(&format!("\n  ({} {})", field_name, expr));
            last_note = note.is_some();
            if let Some(note) = note {
                body.push_str(&format!(" ; {}", note));
            }
        }
        write!(self.output, "({} {}{}", keyword, name, body)?;
        self.close_form(last_note)
    }

    fn emit_enum(&mut self, name: &str, variants: &[Enumerator]) -> Result<()> {
        write!(self.output, "(defcenum {}", name)?;
        for variant in variants {
            let mangled =
                apply_chain(&self.options.enum_manglers, &variant.name.to_lowercase());
            write!(self.output, "\n  ({} {})", mangled, variant.value)?;
        }
        self.close_form(false)
    }

    fn emit_enum_constants(&mut self, variants: &[Enumerator]) -> Result<()> {
        for variant in variants {
            let mangled =
                apply_chain(&self.options.constant_manglers, &variant.name.to_lowercase());
            writeln!(self.output, "(defconstant {} {})", mangled, variant.value)?;
        }
        writeln!(self.output)?;
        Ok(())
    }

    fn process_typedef(&mut self, name: &str, underlying: &CType) -> Result<()> {
        let lower = name.to_lowercase();
        let mangled = self.types.mangle_typedef(&lower);
        match underlying {
            // A typedef of an anonymous record realizes it under
            // `name-record`; of a named defining record, under the tag.
            CType::Record(record) if record.fields.is_some() => {
                let base = match &record.tag {
                    Some(tag) => self.types.mangle_type(&tag.to_lowercase()),
                    None => format!("{}-record", lower.replace('_', "-")),
                };
                self.emit_record(&base, record)?;
                let reference = match record.kind {
                    RecordKind::Struct => ":struct",
                    RecordKind::Union => ":union",
                };
                write!(
                    self.output,
                    "(defctype {} ({} {}))\n\n",
                    mangled, reference, base
                )?;
                Ok(())
            }
            CType::Enum(definition) if definition.variants.is_some() => {
                let base = match &definition.tag {
                    Some(tag) => self.types.mangle_type(&tag.to_lowercase()),
                    None => format!("{}-enum", lower.replace('_', "-")),
                };
                self.emit_enum(&base, definition.variants.as_ref().unwrap())?;
                write!(self.output, "(defctype {} {})\n\n", mangled, base)?;
                Ok(())
            }
            _ => {
                let expr = self.types.lisp_type(underlying);
                write!(self.output, "(defctype {} {})", mangled, expr.expr)?;
                if let Some(note) = &expr.note {
                    write!(self.output, " ; {}", note)?;
                }
                write!(self.output, "\n\n")?;
                Ok(())
            }
        }
    }

    fn process_macro(
        &mut self,
        name: &str,
        body: Option<&str>,
        function_like: bool,
        is_guard: bool,
        location: &Location,
    ) -> Result<()> {
        if body.is_none() && is_guard && self.options.skip_header_guards {
            debug!("skipping header guard {} at {}", name, location);
            return Ok(());
        }
        info!("found macro {} definition at {}", name, location);
        let mangled = apply_chain(&self.options.constant_manglers, &name.to_lowercase());
        if !function_like {
            if let Some(value) = body.and_then(macros::convert_literal) {
                write!(self.output, "(defconstant {} {})\n\n", mangled, value)?;
                return Ok(());
            }
        }
        write!(
            self.output,
            "#| MACRO_DEFINITION\n(defconstant {} ACTUAL_VALUE_HERE)\n|#\n\n",
            mangled
        )?;
        Ok(())
    }

    /// Anonymous enums nothing realized become plain constants; anonymous
    /// records can't be referenced at all, so they only rate a warning.
    fn flush_pending(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending_enums);
        for (variants, _) in &pending {
            self.emit_enum_constants(variants)?;
        }
        for (kind, location) in &self.pending_records {
            let what = match kind {
                RecordKind::Struct => "struct",
                RecordKind::Union => "union",
            };
            warn!("skipping unnamed {} decl at {}", what, location);
        }
        Ok(())
    }

    /// Close a multi-line form. When the last line ended in a comment the
    /// paren needs its own line.
    fn close_form(&mut self, last_note: bool) -> Result<()> {
        if last_note {
            write!(self.output, "\n)")?;
        } else {
            write!(self.output, ")")?;
        }
        write!(self.output, "\n\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn run(name: &str, source: &str) -> String {
        let dir = std::env::temp_dir().join(format!("c2cffi-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.h", name));
        fs::write(&path, source).unwrap();
        let mut output = Vec::new();
        process_file(&path, &ProcessOptions::default(), &mut output).unwrap();
        fs::remove_dir_all(&dir).ok();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn emits_defcfun_with_paired_name() {
        let output = run(
            "fn",
            "#include <stdint.h>\nuint8_t uint_fn(uint16_t foo);\n",
        );
        assert_eq!(
            output,
            "(defcfun (\"uint_fn\" uint-fn) :uint8\n  (foo :uint16))\n\n"
        );
    }

    #[test]
    fn emits_plain_name_when_mangling_changes_nothing() {
        let output = run("plain", "int contains(int x);\n");
        assert_eq!(output, "(defcfun \"contains\" :int\n  (x :int))\n\n");
    }

    #[test]
    fn emits_struct_and_typedef() {
        let output = run(
            "td",
            "struct point { int x; int y; };\ntypedef struct point point_t;\n",
        );
        assert_eq!(
            output,
            "(defcstruct point\n  (x :int)\n  (y :int))\n\n\
             (defctype point-t (:struct point))\n\n"
        );
    }

    #[test]
    fn realizes_typedef_of_anonymous_struct() {
        let output = run(
            "anon",
            "typedef struct { unsigned long bits; } flags_t;\n",
        );
        assert_eq!(
            output,
            "(defcstruct flags-t-record\n  (bits :unsigned-long))\n\n\
             (defctype flags-t (:struct flags-t-record))\n\n"
        );
    }

    #[test]
    fn anonymous_enum_flushes_as_constants() {
        let output = run("enum", "enum { STATUS_OK = 0, STATUS_ERR = -1 };\n");
        assert_eq!(
            output,
            "(defconstant +status-ok+ 0)\n(defconstant +status-err+ -1)\n\n"
        );
    }

    #[test]
    fn header_guards_are_dropped() {
        let output = run(
            "guard",
            "#ifndef GUARD_H\n#define GUARD_H\n#define LIMIT 8\n#endif\n",
        );
        assert_eq!(output, "(defconstant +limit+ 8)\n\n");
    }
}
