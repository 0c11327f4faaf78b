//! Tokenizer for the declaration subset of C that appears in binding headers.
//!
//! Comments and whitespace are dropped. A `#` opening a line turns the whole
//! directive (with backslash continuations folded) into a single token so the
//! parser can handle `#include` and `#define` without a real preprocessor.

use std::sync::Arc;

use crate::ast::Location;
use crate::error::{ProcessingError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(String),
    Str(String),
    CharLit(i64),
    /// A preprocessor directive: its name and the raw remainder of the line.
    Directive { name: String, rest: String },
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Star,
    Colon,
    Assign,
    Plus,
    Minus,
    Tilde,
    Amp,
    Pipe,
    Caret,
    Slash,
    Percent,
    Shl,
    Shr,
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    file: Arc<str>,
    /// True until a non-whitespace byte has been seen on the current line.
    at_line_start: bool,
}

/// Tokenize `src`, labeling every token with `file`.
pub fn tokenize(src: &str, file: Arc<str>) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        src: src.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
        file,
        at_line_start: true,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

impl<'a> Lexer<'a> {
    fn location(&self) -> Location {
        Location::new(self.file.clone(), self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
            if !matches!(byte, b' ' | b'\t' | b'\r') {
                self.at_line_start = false;
            }
        }
        Some(byte)
    }

    fn error(&self, message: impl Into<String>) -> ProcessingError {
        ProcessingError::parse(message, self.location())
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.location();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => {
                                return Err(ProcessingError::parse(
                                    "unterminated block comment",
                                    start,
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_trivia()?;
        let location = self.location();
        let byte = match self.peek() {
            Some(byte) => byte,
            None => return Ok(None),
        };

        if byte == b'#' && self.at_line_start {
            return self.lex_directive(location).map(Some);
        }

        let kind = match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => TokenKind::Ident(self.lex_ident()),
            b'0'..=b'9' => self.lex_number()?,
            b'.' => {
                if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                    self.bump();
                    self.bump();
                    self.bump();
                    TokenKind::Ellipsis
                } else if matches!(self.peek_at(1), Some(b'0'..=b'9')) {
                    self.lex_number()?
                } else {
                    return Err(self.error("unexpected '.'"));
                }
            }
            b'"' => self.lex_string()?,
            b'\'' => self.lex_char()?,
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.bump();
                self.bump();
                TokenKind::Shl
            }
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.bump();
                self.bump();
                TokenKind::Shr
            }
            _ => {
                self.bump();
                match byte {
                    b'(' => TokenKind::LParen,
                    b')' => TokenKind::RParen,
                    b'{' => TokenKind::LBrace,
                    b'}' => TokenKind::RBrace,
                    b'[' => TokenKind::LBracket,
                    b']' => TokenKind::RBracket,
                    b';' => TokenKind::Semi,
                    b',' => TokenKind::Comma,
                    b'*' => TokenKind::Star,
                    b':' => TokenKind::Colon,
                    b'=' => TokenKind::Assign,
                    b'+' => TokenKind::Plus,
                    b'-' => TokenKind::Minus,
                    b'~' => TokenKind::Tilde,
                    b'&' => TokenKind::Amp,
                    b'|' => TokenKind::Pipe,
                    b'^' => TokenKind::Caret,
                    b'/' => TokenKind::Slash,
                    b'%' => TokenKind::Percent,
                    other => {
                        return Err(ProcessingError::parse(
                            format!("unrecognized character '{}'", other as char),
                            location,
                        ));
                    }
                }
            }
        };
        Ok(Some(Token { kind, location }))
    }

    fn lex_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'_' {
                ident.push(byte as char);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    fn lex_number(&mut self) -> Result<TokenKind> {
        let start = self.pos;
        let location = self.location();
        if self.peek() == Some(b'0')
            && matches!(self.peek_at(1), Some(b'x') | Some(b'X'))
        {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while matches!(self.peek(), Some(byte) if byte.is_ascii_hexdigit()) {
                self.bump();
            }
            if self.pos == digits_start {
                return Err(ProcessingError::parse("missing hex digits", location));
            }
            let text = std::str::from_utf8(&self.src[digits_start..self.pos]).unwrap();
            let value = u64::from_str_radix(text, 16)
                .map_err(|_| ProcessingError::parse("hex literal out of range", location))?;
            self.skip_int_suffix();
            return Ok(TokenKind::Int(value as i64));
        }

        let mut saw_dot = false;
        while let Some(byte) = self.peek() {
            match byte {
                b'0'..=b'9' => {
                    self.bump();
                }
                b'.' if !saw_dot => {
                    saw_dot = true;
                    self.bump();
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap().to_string();
        if saw_dot {
            self.skip_float_suffix();
            return Ok(TokenKind::Float(text));
        }
        // Octal when it has a leading zero, decimal otherwise.
        let value = if text.len() > 1 && text.starts_with('0') {
            u64::from_str_radix(&text[1..], 8)
                .map_err(|_| ProcessingError::parse("bad octal literal", location))?
        } else {
            text.parse::<u64>()
                .map_err(|_| ProcessingError::parse("integer literal out of range", location))?
        };
        self.skip_int_suffix();
        Ok(TokenKind::Int(value as i64))
    }

    fn skip_int_suffix(&mut self) {
        while matches!(self.peek(), Some(b'u') | Some(b'U') | Some(b'l') | Some(b'L')) {
            self.bump();
        }
    }

    fn skip_float_suffix(&mut self) {
        while matches!(self.peek(), Some(b'f') | Some(b'F') | Some(b'l') | Some(b'L')) {
            self.bump();
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind> {
        let start = self.location();
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(b'"') => return Ok(TokenKind::Str(value)),
                Some(b'\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| ProcessingError::parse("unterminated string", start.clone()))?;
                    value.push('\\');
                    value.push(escaped as char);
                }
                Some(b'\n') | None => {
                    return Err(ProcessingError::parse("unterminated string", start));
                }
                Some(byte) => value.push(byte as char),
            }
        }
    }

    fn lex_char(&mut self) -> Result<TokenKind> {
        let start = self.location();
        self.bump();
        let value = match self.bump() {
            Some(b'\\') => {
                let escaped = self
                    .bump()
                    .ok_or_else(|| ProcessingError::parse("unterminated char literal", start.clone()))?;
                match escaped {
                    b'n' => b'\n' as i64,
                    b't' => b'\t' as i64,
                    b'r' => b'\r' as i64,
                    b'0' => 0,
                    b'\\' => b'\\' as i64,
                    b'\'' => b'\'' as i64,
                    b'"' => b'"' as i64,
                    b'x' => {
                        let mut value: i64 = 0;
                        let mut digits = 0;
                        while let Some(byte) = self.peek() {
                            if byte.is_ascii_hexdigit() {
                                value = value * 16 + (byte as char).to_digit(16).unwrap() as i64;
                                digits += 1;
                                self.bump();
                            } else {
                                break;
                            }
                        }
                        if digits == 0 {
                            return Err(ProcessingError::parse("missing hex digits", start));
                        }
                        value
                    }
                    other => {
                        return Err(ProcessingError::parse(
                            format!("unsupported escape '\\{}'", other as char),
                            start,
                        ));
                    }
                }
            }
            Some(b'\'') | Some(b'\n') | None => {
                return Err(ProcessingError::parse("empty char literal", start));
            }
            Some(byte) => byte as i64,
        };
        match self.bump() {
            Some(b'\'') => Ok(TokenKind::CharLit(value)),
            _ => Err(ProcessingError::parse("unterminated char literal", start)),
        }
    }

    /// Consume the rest of a directive line, folding `\`-newline continuations
    /// and stripping comments.
    fn lex_directive(&mut self, location: Location) -> Result<Token> {
        self.bump(); // '#'
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.bump();
        }
        let name = self.lex_ident();
        let mut rest = String::new();
        // Runs of whitespace collapse to one space so continuations and
        // comments don't leave gaps in macro bodies.
        let mut push_space = |rest: &mut String| {
            if !rest.is_empty() && !rest.ends_with(' ') {
                rest.push(' ');
            }
        };
        loop {
            match self.peek() {
                None | Some(b'\n') => break,
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.bump();
                    push_space(&mut rest);
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                    push_space(&mut rest);
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                    self.bump();
                    push_space(&mut rest);
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => {
                                return Err(ProcessingError::parse(
                                    "unterminated block comment",
                                    location,
                                ));
                            }
                        }
                    }
                    push_space(&mut rest);
                }
                Some(byte) => {
                    rest.push(byte as char);
                    self.bump();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::Directive {
                name,
                rest: rest.trim().to_string(),
            },
            location,
        })
    }
}
