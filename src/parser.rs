//! Recursive-descent parser for the declaration subset of C found in
//! binding headers: typedefs, struct/union/enum definitions, function
//! prototypes, and simple preprocessor directives. Function bodies and
//! conditional compilation are out of scope.
//!
//! Quoted includes are parsed recursively so typedef names resolve, but the
//! processor only emits declarations located in the file it was asked to
//! process.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use crate::ast::{
    CType, Decl, EnumType, Enumerator, Field, IntWidth, Location, Param, RecordKind, RecordType,
    Signedness,
};
use crate::error::{ProcessingError, Result};
use crate::lexer::{self, Token, TokenKind};
use crate::macros;
use crate::types::KNOWN_TYPEDEFS;

/// Parse `path` and everything it includes by quoted `#include`.
pub fn parse_header(path: &Path, include_dirs: &[PathBuf]) -> Result<Vec<Decl>> {
    let mut parser = Parser::new(include_dirs);
    parser.load_file(path)?;
    Ok(parser.decls)
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    file: Arc<str>,
}

impl Cursor {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|token| &token.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => Ok(self.bump().unwrap()),
            Some(token) => Err(ProcessingError::parse(
                format!("expected {}", what),
                token.location.clone(),
            )),
            None => Err(ProcessingError::parse(
                format!("expected {}, found end of file", what),
                self.eof_location(),
            )),
        }
    }

    fn location(&self) -> Location {
        match self.peek() {
            Some(token) => token.location.clone(),
            None => self.eof_location(),
        }
    }

    fn eof_location(&self) -> Location {
        match self.tokens.last() {
            Some(token) => token.location.clone(),
            None => Location::new(self.file.clone(), 1, 1),
        }
    }
}

/// The result of parsing one declarator.
struct Declarator {
    name: Option<String>,
    ty: CType,
    /// Set when the declarator is a direct function: `int f(...)`.
    params: Option<(Vec<Param>, bool)>,
}

struct Parser {
    include_dirs: Vec<PathBuf>,
    typedefs: HashSet<String>,
    enum_values: HashMap<String, i64>,
    visited: HashSet<PathBuf>,
    decls: Vec<Decl>,
}

impl Parser {
    fn new(include_dirs: &[PathBuf]) -> Self {
        let typedefs = KNOWN_TYPEDEFS
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();
        Parser {
            include_dirs: include_dirs.to_vec(),
            typedefs,
            enum_values: HashMap::new(),
            visited: HashSet::new(),
            decls: Vec::new(),
        }
    }

    fn load_file(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(ProcessingError::MissingInput(path.to_path_buf()));
        }
        if let Ok(canonical) = path.canonicalize() {
            if !self.visited.insert(canonical) {
                return Ok(());
            }
        }
        let source = fs::read_to_string(path)?;
        let file: Arc<str> = Arc::from(path.to_string_lossy().as_ref());
        let tokens = lexer::tokenize(&source, file.clone())?;
        let mut cursor = Cursor {
            tokens,
            pos: 0,
            file,
        };
        self.parse_unit(&mut cursor)
    }

    fn parse_unit(&mut self, cursor: &mut Cursor) -> Result<()> {
        loop {
            match cursor.peek_kind() {
                None => return Ok(()),
                Some(TokenKind::Directive { .. }) => self.handle_directive(cursor)?,
                Some(TokenKind::Semi) => {
                    cursor.bump();
                }
                Some(_) => self.parse_declaration(cursor)?,
            }
        }
    }

    fn handle_directive(&mut self, cursor: &mut Cursor) -> Result<()> {
        let token = cursor.bump().unwrap();
        let (name, rest) = match token.kind {
            TokenKind::Directive { name, rest } => (name, rest),
            _ => unreachable!(),
        };
        match name.as_str() {
            "include" => self.handle_include(&rest, token.location),
            "define" => self.handle_define(&rest, token.location),
            "if" | "ifdef" | "ifndef" | "else" | "elif" | "endif" | "undef" | "pragma" => {
                debug!("skipping #{} at {}", name, token.location);
            }
            other => {
                warn!("not processing #{} at {}", other, token.location);
            }
        }
        Ok(())
    }

    fn handle_include(&mut self, rest: &str, location: Location) {
        let (path, system) = if let Some(inner) = rest.strip_prefix('<') {
            match inner.find('>') {
                Some(end) => (inner[..end].to_string(), true),
                None => {
                    warn!("malformed #include at {}", location);
                    return;
                }
            }
        } else if let Some(inner) = rest.strip_prefix('"') {
            match inner.find('"') {
                Some(end) => (inner[..end].to_string(), false),
                None => {
                    warn!("malformed #include at {}", location);
                    return;
                }
            }
        } else {
            warn!("malformed #include at {}", location);
            return;
        };

        if !system {
            match self.resolve_include(&location.file, &path) {
                Some(resolved) => {
                    if let Err(error) = self.load_file(&resolved) {
                        warn!("could not process include {}: {}", path, error);
                    }
                }
                None => warn!("could not resolve include \"{}\" at {}", path, location),
            }
        }
        self.decls.push(Decl::Include {
            path,
            system,
            location,
        });
    }

    fn resolve_include(&self, from: &str, target: &str) -> Option<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(parent) = Path::new(from).parent() {
            candidates.push(parent.join(target));
        }
        for dir in &self.include_dirs {
            candidates.push(dir.join(target));
        }
        candidates.into_iter().find(|candidate| candidate.is_file())
    }

    fn handle_define(&mut self, rest: &str, location: Location) {
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if name.is_empty() {
            warn!("malformed #define at {}", location);
            return;
        }
        let remainder = &rest[name.len()..];
        let function_like = remainder.starts_with('(');
        let body = if function_like {
            Some(remainder.trim().to_string())
        } else {
            let trimmed = remainder.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };
        let is_guard = macros::matches_file_path(&location.file, &name);
        self.decls.push(Decl::MacroDef {
            name,
            body,
            function_like,
            is_guard,
            location,
        });
    }

    fn parse_declaration(&mut self, cursor: &mut Cursor) -> Result<()> {
        let location = cursor.location();
        let mut is_typedef = false;
        loop {
            let word = match cursor.peek_kind() {
                Some(TokenKind::Ident(word)) => word.clone(),
                _ => break,
            };
            match word.as_str() {
                "typedef" => {
                    is_typedef = true;
                    cursor.bump();
                }
                "extern" | "static" | "inline" | "const" | "volatile" => {
                    cursor.bump();
                }
                _ => break,
            }
        }

        let base = self.parse_base_type(cursor)?;

        // A lone `struct foo {...};` or `enum foo {...};` has no declarator.
        if cursor.peek_kind() == Some(&TokenKind::Semi) {
            cursor.bump();
            match base {
                CType::Record(record) => self.decls.push(Decl::Record { record, location }),
                CType::Enum(definition) => {
                    self.decls.push(Decl::Enum {
                        definition,
                        location,
                    });
                }
                _ => warn!("declaration declares nothing at {}", location),
            }
            return Ok(());
        }

        let mut first = true;
        loop {
            let declarator = self.parse_declarator(cursor, base.clone())?;
            if let Some((params, variadic)) = declarator.params {
                if is_typedef {
                    let name = declarator.name.ok_or_else(|| {
                        ProcessingError::parse("typedef without a name", location.clone())
                    })?;
                    self.typedefs.insert(name.clone());
                    self.decls.push(Decl::Typedef {
                        name,
                        underlying: CType::Function {
                            ret: Box::new(declarator.ty),
                            params: params.into_iter().map(|param| param.ty).collect(),
                        },
                        location: location.clone(),
                    });
                } else {
                    let name = declarator.name.ok_or_else(|| {
                        ProcessingError::parse("function prototype without a name", location.clone())
                    })?;
                    if !first || cursor.peek_kind() != Some(&TokenKind::Semi) {
                        return Err(ProcessingError::parse(
                            "unsupported function declaration",
                            cursor.location(),
                        ));
                    }
                    cursor.bump();
                    // The record/enum definition inside a return type still
                    // counts as a declaration of its own.
                    self.emit_inline_definition(&base, &location);
                    self.decls.push(Decl::Function {
                        name,
                        ret: declarator.ty,
                        params,
                        variadic,
                        location,
                    });
                    return Ok(());
                }
            } else if is_typedef {
                let name = declarator.name.ok_or_else(|| {
                    ProcessingError::parse("typedef without a name", location.clone())
                })?;
                self.typedefs.insert(name.clone());
                self.decls.push(Decl::Typedef {
                    name,
                    underlying: declarator.ty,
                    location: location.clone(),
                });
            } else {
                // Tentative definition or extern variable. The processor
                // warns and skips these, but an inline record/enum
                // definition still declares a type.
                if first {
                    self.emit_inline_definition(&base, &location);
                }
                if cursor.eat(&TokenKind::Assign) {
                    self.skip_initializer(cursor)?;
                }
                self.decls.push(Decl::Var {
                    name: declarator.name.unwrap_or_default(),
                    location: location.clone(),
                });
            }
            first = false;
            if cursor.eat(&TokenKind::Comma) {
                continue;
            }
            cursor.expect(TokenKind::Semi, "';'")?;
            return Ok(());
        }
    }

    /// Record a struct/union/enum definition that appeared inline in a
    /// variable declaration or return type, so it still gets emitted once.
    fn emit_inline_definition(&mut self, base: &CType, location: &Location) {
        match base {
            CType::Record(record) if record.fields.is_some() => {
                self.decls.push(Decl::Record {
                    record: record.clone(),
                    location: location.clone(),
                });
            }
            CType::Enum(definition) if definition.variants.is_some() => {
                self.decls.push(Decl::Enum {
                    definition: definition.clone(),
                    location: location.clone(),
                });
            }
            _ => {}
        }
    }

    fn skip_initializer(&mut self, cursor: &mut Cursor) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match cursor.peek_kind() {
                None => {
                    return Err(ProcessingError::parse(
                        "unterminated initializer",
                        cursor.eof_location(),
                    ));
                }
                Some(TokenKind::LBrace) | Some(TokenKind::LParen) => {
                    depth += 1;
                    cursor.bump();
                }
                Some(TokenKind::RBrace) | Some(TokenKind::RParen) => {
                    depth = depth.saturating_sub(1);
                    cursor.bump();
                }
                Some(TokenKind::Semi) | Some(TokenKind::Comma) if depth == 0 => return Ok(()),
                Some(_) => {
                    cursor.bump();
                }
            }
        }
    }

    fn parse_base_type(&mut self, cursor: &mut Cursor) -> Result<CType> {
        let location = cursor.location();
        let mut words: Vec<String> = Vec::new();
        loop {
            let word = match cursor.peek_kind() {
                Some(TokenKind::Ident(word)) => word.clone(),
                _ => break,
            };
            match word.as_str() {
                "const" | "volatile" => {
                    cursor.bump();
                }
                "struct" => {
                    cursor.bump();
                    return self.parse_record(cursor, RecordKind::Struct);
                }
                "union" => {
                    cursor.bump();
                    return self.parse_record(cursor, RecordKind::Union);
                }
                "enum" => {
                    cursor.bump();
                    return self.parse_enum(cursor);
                }
                "void" | "char" | "short" | "int" | "long" | "signed" | "unsigned" | "float"
                | "double" | "bool" | "_Bool" => {
                    words.push(word);
                    cursor.bump();
                }
                _ if words.is_empty() => {
                    if self.typedefs.contains(&word) {
                        cursor.bump();
                        // Trailing qualifiers: `foo_t const *x`.
                        while matches!(cursor.peek_kind(), Some(TokenKind::Ident(q)) if q == "const" || q == "volatile")
                        {
                            cursor.bump();
                        }
                        return Ok(CType::Named(word));
                    }
                    return Err(ProcessingError::parse(
                        format!("unknown type name '{}'", word),
                        cursor.location(),
                    ));
                }
                _ => break,
            }
        }
        resolve_builtin(&words, location)
    }

    fn parse_record(&mut self, cursor: &mut Cursor, kind: RecordKind) -> Result<CType> {
        let tag = match cursor.peek_kind() {
            Some(TokenKind::Ident(tag)) => {
                let tag = tag.clone();
                cursor.bump();
                Some(tag)
            }
            _ => None,
        };
        let fields = if cursor.eat(&TokenKind::LBrace) {
            Some(self.parse_fields(cursor)?)
        } else {
            None
        };
        Ok(CType::Record(RecordType { kind, tag, fields }))
    }

    fn parse_fields(&mut self, cursor: &mut Cursor) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        loop {
            match cursor.peek_kind() {
                None => {
                    return Err(ProcessingError::parse(
                        "unterminated record body",
                        cursor.eof_location(),
                    ));
                }
                Some(TokenKind::RBrace) => {
                    cursor.bump();
                    return Ok(fields);
                }
                Some(TokenKind::Directive { .. }) => {
                    let token = cursor.bump().unwrap();
                    debug!("skipping directive inside record at {}", token.location);
                }
                Some(_) => {
                    let location = cursor.location();
                    while matches!(cursor.peek_kind(), Some(TokenKind::Ident(q)) if q == "const" || q == "volatile")
                    {
                        cursor.bump();
                    }
                    let base = self.parse_base_type(cursor)?;

                    // `struct {...};` with no declarator is an unnamed member.
                    if cursor.peek_kind() == Some(&TokenKind::Semi) {
                        cursor.bump();
                        warn!("skipping unnamed member at {}", location);
                        continue;
                    }
                    // `int : 3;` is anonymous bitfield padding.
                    if cursor.eat(&TokenKind::Colon) {
                        self.parse_const_expr(cursor)?;
                        cursor.expect(TokenKind::Semi, "';'")?;
                        continue;
                    }

                    loop {
                        let declarator = self.parse_declarator(cursor, base.clone())?;
                        if cursor.eat(&TokenKind::Colon) {
                            self.parse_const_expr(cursor)?;
                            warn!("bitfield width dropped at {}", location);
                        }
                        match declarator.name {
                            Some(name) => fields.push(Field {
                                name,
                                ty: declarator.ty,
                                location: location.clone(),
                            }),
                            None => warn!("skipping unnamed field at {}", location),
                        }
                        if cursor.eat(&TokenKind::Comma) {
                            continue;
                        }
                        cursor.expect(TokenKind::Semi, "';'")?;
                        break;
                    }
                }
            }
        }
    }

    fn parse_enum(&mut self, cursor: &mut Cursor) -> Result<CType> {
        let tag = match cursor.peek_kind() {
            Some(TokenKind::Ident(tag)) => {
                let tag = tag.clone();
                cursor.bump();
                Some(tag)
            }
            _ => None,
        };
        if !cursor.eat(&TokenKind::LBrace) {
            return Ok(CType::Enum(EnumType {
                tag,
                variants: None,
            }));
        }
        let mut variants: Vec<Enumerator> = Vec::new();
        let mut next_value: i64 = 0;
        loop {
            match cursor.peek_kind() {
                None => {
                    return Err(ProcessingError::parse(
                        "unterminated enum body",
                        cursor.eof_location(),
                    ));
                }
                Some(TokenKind::RBrace) => {
                    cursor.bump();
                    break;
                }
                Some(TokenKind::Ident(_)) => {
                    let name = match cursor.bump().unwrap().kind {
                        TokenKind::Ident(name) => name,
                        _ => unreachable!(),
                    };
                    let value = if cursor.eat(&TokenKind::Assign) {
                        self.parse_const_expr(cursor)?
                    } else {
                        next_value
                    };
                    next_value = value + 1;
                    self.enum_values.insert(name.clone(), value);
                    variants.push(Enumerator { name, value });
                    if !cursor.eat(&TokenKind::Comma) {
                        cursor.expect(TokenKind::RBrace, "'}'")?;
                        break;
                    }
                }
                Some(_) => {
                    return Err(ProcessingError::parse(
                        "expected enumerator name",
                        cursor.location(),
                    ));
                }
            }
        }
        Ok(CType::Enum(EnumType {
            tag,
            variants: Some(variants),
        }))
    }

    fn parse_declarator(&mut self, cursor: &mut Cursor, base: CType) -> Result<Declarator> {
        let mut ty = base;
        while cursor.eat(&TokenKind::Star) {
            while matches!(cursor.peek_kind(), Some(TokenKind::Ident(q)) if q == "const" || q == "volatile")
            {
                cursor.bump();
            }
            ty = CType::Pointer(Box::new(ty));
        }

        // Function pointer declarator: `(*name)(params)`.
        if cursor.peek_kind() == Some(&TokenKind::LParen)
            && cursor.peek_kind_at(1) == Some(&TokenKind::Star)
        {
            cursor.bump();
            let mut stars = 0usize;
            while cursor.eat(&TokenKind::Star) {
                stars += 1;
            }
            let name = match cursor.peek_kind() {
                Some(TokenKind::Ident(name)) => {
                    let name = name.clone();
                    cursor.bump();
                    Some(name)
                }
                _ => None,
            };
            cursor.expect(TokenKind::RParen, "')'")?;
            cursor.expect(TokenKind::LParen, "'('")?;
            let (params, _variadic) = self.parse_params(cursor)?;
            let mut pointer = CType::Function {
                ret: Box::new(ty),
                params: params.into_iter().map(|param| param.ty).collect(),
            };
            for _ in 0..stars {
                pointer = CType::Pointer(Box::new(pointer));
            }
            return Ok(Declarator {
                name,
                ty: pointer,
                params: None,
            });
        }

        let name = match cursor.peek_kind() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                cursor.bump();
                Some(name)
            }
            _ => None,
        };

        let mut dims: Vec<Option<u64>> = Vec::new();
        while cursor.eat(&TokenKind::LBracket) {
            if cursor.eat(&TokenKind::RBracket) {
                dims.push(None);
            } else {
                let len = self.parse_const_expr(cursor)?;
                cursor.expect(TokenKind::RBracket, "']'")?;
                dims.push(Some(len as u64));
            }
        }
        for len in dims.into_iter().rev() {
            ty = CType::Array {
                elem: Box::new(ty),
                len,
            };
        }

        if name.is_some() && cursor.peek_kind() == Some(&TokenKind::LParen) {
            cursor.bump();
            let (params, variadic) = self.parse_params(cursor)?;
            return Ok(Declarator {
                name,
                ty,
                params: Some((params, variadic)),
            });
        }

        Ok(Declarator {
            name,
            ty,
            params: None,
        })
    }

    fn parse_params(&mut self, cursor: &mut Cursor) -> Result<(Vec<Param>, bool)> {
        let mut params = Vec::new();
        let mut variadic = false;
        if cursor.eat(&TokenKind::RParen) {
            return Ok((params, variadic));
        }
        loop {
            if cursor.eat(&TokenKind::Ellipsis) {
                variadic = true;
                cursor.expect(TokenKind::RParen, "')'")?;
                break;
            }
            let base = self.parse_base_type(cursor)?;
            let declarator = self.parse_declarator(cursor, base)?;
            let ty = match declarator.params {
                // A function-typed parameter decays to a pointer.
                Some((inner, _)) => CType::Pointer(Box::new(CType::Function {
                    ret: Box::new(declarator.ty),
                    params: inner.into_iter().map(|param| param.ty).collect(),
                })),
                None => declarator.ty,
            };
            params.push(Param {
                name: declarator.name.unwrap_or_default(),
                ty,
            });
            if cursor.eat(&TokenKind::Comma) {
                continue;
            }
            cursor.expect(TokenKind::RParen, "')'")?;
            break;
        }
        if params.len() == 1 && params[0].ty == CType::Void && params[0].name.is_empty() {
            params.clear();
        }
        Ok((params, variadic))
    }

    fn parse_const_expr(&mut self, cursor: &mut Cursor) -> Result<i64> {
        self.parse_binary_expr(cursor, 0)
    }

    fn parse_binary_expr(&mut self, cursor: &mut Cursor, min_power: u8) -> Result<i64> {
        let mut lhs = self.parse_unary_expr(cursor)?;
        loop {
            let (power, kind) = match cursor.peek_kind() {
                Some(TokenKind::Pipe) => (1, TokenKind::Pipe),
                Some(TokenKind::Caret) => (2, TokenKind::Caret),
                Some(TokenKind::Amp) => (3, TokenKind::Amp),
                Some(TokenKind::Shl) => (4, TokenKind::Shl),
                Some(TokenKind::Shr) => (4, TokenKind::Shr),
                Some(TokenKind::Plus) => (5, TokenKind::Plus),
                Some(TokenKind::Minus) => (5, TokenKind::Minus),
                Some(TokenKind::Star) => (6, TokenKind::Star),
                Some(TokenKind::Slash) => (6, TokenKind::Slash),
                Some(TokenKind::Percent) => (6, TokenKind::Percent),
                _ => break,
            };
            if power < min_power {
                break;
            }
            let location = cursor.location();
            cursor.bump();
            let rhs = self.parse_binary_expr(cursor, power + 1)?;
            lhs = match kind {
                TokenKind::Pipe => lhs | rhs,
                TokenKind::Caret => lhs ^ rhs,
                TokenKind::Amp => lhs & rhs,
                TokenKind::Shl => lhs.wrapping_shl(rhs as u32),
                TokenKind::Shr => lhs.wrapping_shr(rhs as u32),
                TokenKind::Plus => lhs.wrapping_add(rhs),
                TokenKind::Minus => lhs.wrapping_sub(rhs),
                TokenKind::Star => lhs.wrapping_mul(rhs),
                TokenKind::Slash | TokenKind::Percent => {
                    if rhs == 0 {
                        return Err(ProcessingError::parse("division by zero", location));
                    }
                    if kind == TokenKind::Slash {
                        lhs / rhs
                    } else {
                        lhs % rhs
                    }
                }
                _ => unreachable!(),
            };
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self, cursor: &mut Cursor) -> Result<i64> {
        let location = cursor.location();
        match cursor.peek_kind() {
            Some(TokenKind::Minus) => {
                cursor.bump();
                Ok(self.parse_unary_expr(cursor)?.wrapping_neg())
            }
            Some(TokenKind::Plus) => {
                cursor.bump();
                self.parse_unary_expr(cursor)
            }
            Some(TokenKind::Tilde) => {
                cursor.bump();
                Ok(!self.parse_unary_expr(cursor)?)
            }
            Some(TokenKind::LParen) => {
                cursor.bump();
                let value = self.parse_const_expr(cursor)?;
                cursor.expect(TokenKind::RParen, "')'")?;
                Ok(value)
            }
            Some(TokenKind::Int(value)) => {
                let value = *value;
                cursor.bump();
                Ok(value)
            }
            Some(TokenKind::CharLit(value)) => {
                let value = *value;
                cursor.bump();
                Ok(value)
            }
            Some(TokenKind::Ident(name)) => match self.enum_values.get(name) {
                Some(value) => {
                    let value = *value;
                    cursor.bump();
                    Ok(value)
                }
                None => Err(ProcessingError::parse(
                    format!("unknown name '{}' in constant expression", name),
                    location,
                )),
            },
            _ => Err(ProcessingError::parse(
                "expected constant expression",
                location,
            )),
        }
    }
}

fn resolve_builtin(words: &[String], location: Location) -> Result<CType> {
    let has = |word: &str| words.iter().any(|w| w == word);
    if words.is_empty() {
        return Err(ProcessingError::parse("expected a type", location));
    }
    if has("float") {
        return Ok(CType::Float);
    }
    if has("double") {
        return Ok(if has("long") {
            CType::LongDouble
        } else {
            CType::Double
        });
    }
    if has("bool") || has("_Bool") {
        return Ok(CType::Bool);
    }
    if has("void") {
        return Ok(CType::Void);
    }
    if has("char") {
        return Ok(if has("unsigned") {
            CType::UnsignedChar
        } else if has("signed") {
            CType::SignedChar
        } else {
            CType::Char
        });
    }
    let longs = words.iter().filter(|word| *word == "long").count();
    let width = if has("short") {
        IntWidth::Short
    } else if longs >= 2 {
        IntWidth::LongLong
    } else if longs == 1 {
        IntWidth::Long
    } else {
        IntWidth::Int
    };
    let sign = if has("unsigned") {
        Signedness::Unsigned
    } else {
        Signedness::Signed
    };
    Ok(CType::Int { width, sign })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_source(source: &str) -> Vec<Decl> {
        let file: Arc<str> = Arc::from("test.h");
        let tokens = lexer::tokenize(source, file.clone()).unwrap();
        let mut cursor = Cursor {
            tokens,
            pos: 0,
            file,
        };
        let mut parser = Parser::new(&[]);
        parser.parse_unit(&mut cursor).unwrap();
        parser.decls
    }

    #[test]
    fn parses_a_prototype_with_fixed_width_types() {
        let decls = parse_source("int8_t std_int_fn(int16_t foo, int32_t bar, int64_t baz);");
        assert_eq!(decls.len(), 1);
        match &decls[0] {
            Decl::Function {
                name,
                ret,
                params,
                variadic,
                ..
            } => {
                assert_eq!(name, "std_int_fn");
                assert_eq!(*ret, CType::Named("int8_t".into()));
                assert_eq!(params.len(), 3);
                assert_eq!(params[0].name, "foo");
                assert_eq!(params[0].ty, CType::Named("int16_t".into()));
                assert!(!variadic);
            }
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn parses_struct_definitions() {
        let decls = parse_source("struct point { int x; int y; };");
        match &decls[0] {
            Decl::Record { record, .. } => {
                assert_eq!(record.tag.as_deref(), Some("point"));
                let fields = record.fields.as_ref().unwrap();
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].name, "x");
            }
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn parses_typedef_of_anonymous_struct() {
        let decls = parse_source("typedef struct { unsigned long bits; } flags_t;");
        match &decls[0] {
            Decl::Typedef {
                name, underlying, ..
            } => {
                assert_eq!(name, "flags_t");
                match underlying {
                    CType::Record(record) => {
                        assert!(record.tag.is_none());
                        assert_eq!(record.fields.as_ref().unwrap().len(), 1);
                    }
                    other => panic!("expected a record, got {:?}", other),
                }
            }
            other => panic!("expected a typedef, got {:?}", other),
        }
    }

    #[test]
    fn typedef_names_become_usable_types() {
        let decls = parse_source("typedef unsigned int my_uint;\nvoid take(my_uint value);");
        match &decls[1] {
            Decl::Function { params, .. } => {
                assert_eq!(params[0].ty, CType::Named("my_uint".into()));
            }
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn evaluates_enum_constant_expressions() {
        let decls = parse_source(
            "enum flags { A = 1 << 4, B, C = (A | 2) & ~1, D = -3, E = 'x' };",
        );
        match &decls[0] {
            Decl::Enum { definition, .. } => {
                let variants = definition.variants.as_ref().unwrap();
                let values: Vec<i64> = variants.iter().map(|variant| variant.value).collect();
                assert_eq!(values, vec![16, 17, 18, -3, 120]);
            }
            other => panic!("expected an enum, got {:?}", other),
        }
    }

    #[test]
    fn parses_pointers_and_arrays() {
        let decls = parse_source("struct buf { char *data; unsigned char raw[64]; };");
        match &decls[0] {
            Decl::Record { record, .. } => {
                let fields = record.fields.as_ref().unwrap();
                assert_eq!(fields[0].ty, CType::Pointer(Box::new(CType::Char)));
                assert_eq!(
                    fields[1].ty,
                    CType::Array {
                        elem: Box::new(CType::UnsignedChar),
                        len: Some(64),
                    }
                );
            }
            other => panic!("expected a record, got {:?}", other),
        }
    }

    #[test]
    fn parses_function_pointer_typedefs() {
        let decls = parse_source("typedef void (*notify_fn)(int code, void *ctx);");
        match &decls[0] {
            Decl::Typedef {
                name, underlying, ..
            } => {
                assert_eq!(name, "notify_fn");
                match underlying {
                    CType::Pointer(inner) => {
                        assert!(matches!(inner.as_ref(), CType::Function { .. }));
                    }
                    other => panic!("expected a pointer, got {:?}", other),
                }
            }
            other => panic!("expected a typedef, got {:?}", other),
        }
    }

    #[test]
    fn void_parameter_list_is_empty() {
        let decls = parse_source("void reset(void);");
        match &decls[0] {
            Decl::Function { params, .. } => assert!(params.is_empty()),
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn variadic_prototypes_are_flagged() {
        let decls = parse_source("void logf(const char *fmt, ...);");
        match &decls[0] {
            Decl::Function { variadic, .. } => assert!(*variadic),
            other => panic!("expected a function, got {:?}", other),
        }
    }

    #[test]
    fn captures_macro_definitions() {
        let decls = parse_source("#define BUFFER_SIZE 512\n#define TEST_H\n");
        match &decls[0] {
            Decl::MacroDef { name, body, .. } => {
                assert_eq!(name, "BUFFER_SIZE");
                assert_eq!(body.as_deref(), Some("512"));
            }
            other => panic!("expected a macro, got {:?}", other),
        }
        match &decls[1] {
            Decl::MacroDef { body, is_guard, .. } => {
                assert!(body.is_none());
                assert!(*is_guard);
            }
            other => panic!("expected a macro, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_names_are_errors() {
        let file: Arc<str> = Arc::from("test.h");
        let tokens = lexer::tokenize("mystery_t fn(void);", file.clone()).unwrap();
        let mut cursor = Cursor {
            tokens,
            pos: 0,
            file,
        };
        let mut parser = Parser::new(&[]);
        assert!(parser.parse_unit(&mut cursor).is_err());
    }
}
