//! Declaration model produced by the parser and consumed by the processor.

use std::fmt;
use std::sync::Arc;

/// Source position of a token or declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: Arc<str>, line: u32, column: u32) -> Self {
        Location { file, line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Signedness of an integer base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Width class of an integer base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    Short,
    Int,
    Long,
    LongLong,
}

/// Struct or union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Union,
}

/// A C type as written in a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum CType {
    Void,
    Bool,
    /// Plain `char`, signedness left to the platform.
    Char,
    SignedChar,
    UnsignedChar,
    Int { width: IntWidth, sign: Signedness },
    Float,
    Double,
    LongDouble,
    /// Reference to a typedef name.
    Named(String),
    Record(RecordType),
    Enum(EnumType),
    Pointer(Box<CType>),
    /// `len` is `None` for incomplete arrays (`[]`).
    Array { elem: Box<CType>, len: Option<u64> },
    /// Function prototype type. Only meaningful behind a pointer.
    Function { ret: Box<CType>, params: Vec<CType> },
}

/// A struct or union type. `fields` is `Some` only on defining declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub kind: RecordKind,
    pub tag: Option<String>,
    pub fields: Option<Vec<Field>>,
}

/// An enum type. `variants` is `Some` only on defining declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub tag: Option<String>,
    pub variants: Option<Vec<Enumerator>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

/// One member of a struct or union. Unnamed members keep an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: CType,
    pub location: Location,
}

/// One function parameter. Unnamed parameters keep an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: CType,
}

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Decl {
    Function {
        name: String,
        ret: CType,
        params: Vec<Param>,
        variadic: bool,
        location: Location,
    },
    Record {
        record: RecordType,
        location: Location,
    },
    Enum {
        definition: EnumType,
        location: Location,
    },
    Typedef {
        name: String,
        underlying: CType,
        location: Location,
    },
    Var {
        name: String,
        location: Location,
    },
    MacroDef {
        name: String,
        /// Raw replacement text, `None` for a bare `#define NAME`.
        body: Option<String>,
        function_like: bool,
        is_guard: bool,
        location: Location,
    },
    Include {
        path: String,
        system: bool,
        location: Location,
    },
}

impl Decl {
    /// Where the declaration was written.
    pub fn location(&self) -> &Location {
        match self {
            Decl::Function { location, .. }
            | Decl::Record { location, .. }
            | Decl::Enum { location, .. }
            | Decl::Typedef { location, .. }
            | Decl::Var { location, .. }
            | Decl::MacroDef { location, .. }
            | Decl::Include { location, .. } => location,
        }
    }
}
