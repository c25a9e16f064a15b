//! Lexer (tokenizer) for C source code
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! preprocessor and parser. Literals are kept opaque: the symbol front end
//! only needs to know where they start and end. Preprocessor lines become a
//! single [`Token::Directive`]; `#define`, `#undef` and `#include` are decoded,
//! everything else is reduced to its directive name.

use crate::symbol::{SourceLocation, StreamId};
use std::fmt;
use thiserror::Error;

/// C keywords, with GNU alternate spellings folded onto the standard ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // Storage classes and function specifiers
    Auto,
    Extern,
    Register,
    Static,
    Typedef,
    ThreadLocal,
    Inline,
    Noreturn,
    // Qualifiers
    Const,
    Volatile,
    Restrict,
    Atomic,
    // Type specifiers
    Void,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Signed,
    Unsigned,
    Bool,
    Complex,
    Imaginary,
    BuiltinVaList,
    Struct,
    Union,
    Enum,
    // Extensions that can appear among declaration specifiers
    Attribute,
    Extension,
    Asm,
    Typeof,
    Alignas,
    StaticAssert,
    // Everything else
    Alignof,
    Break,
    Case,
    Continue,
    Default,
    Do,
    Else,
    For,
    Generic,
    Goto,
    If,
    Return,
    Sizeof,
    Switch,
    While,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("auto", Keyword::Auto),
    ("extern", Keyword::Extern),
    ("register", Keyword::Register),
    ("static", Keyword::Static),
    ("typedef", Keyword::Typedef),
    ("_Thread_local", Keyword::ThreadLocal),
    ("__thread", Keyword::ThreadLocal),
    ("inline", Keyword::Inline),
    ("__inline", Keyword::Inline),
    ("__inline__", Keyword::Inline),
    ("_Noreturn", Keyword::Noreturn),
    ("const", Keyword::Const),
    ("__const", Keyword::Const),
    ("__const__", Keyword::Const),
    ("volatile", Keyword::Volatile),
    ("__volatile", Keyword::Volatile),
    ("__volatile__", Keyword::Volatile),
    ("restrict", Keyword::Restrict),
    ("__restrict", Keyword::Restrict),
    ("__restrict__", Keyword::Restrict),
    ("_Atomic", Keyword::Atomic),
    ("void", Keyword::Void),
    ("char", Keyword::Char),
    ("short", Keyword::Short),
    ("int", Keyword::Int),
    ("long", Keyword::Long),
    ("float", Keyword::Float),
    ("double", Keyword::Double),
    ("signed", Keyword::Signed),
    ("__signed", Keyword::Signed),
    ("__signed__", Keyword::Signed),
    ("unsigned", Keyword::Unsigned),
    ("_Bool", Keyword::Bool),
    ("_Complex", Keyword::Complex),
    ("_Imaginary", Keyword::Imaginary),
    ("__builtin_va_list", Keyword::BuiltinVaList),
    ("struct", Keyword::Struct),
    ("union", Keyword::Union),
    ("enum", Keyword::Enum),
    ("__attribute__", Keyword::Attribute),
    ("__attribute", Keyword::Attribute),
    ("__extension__", Keyword::Extension),
    ("asm", Keyword::Asm),
    ("__asm", Keyword::Asm),
    ("__asm__", Keyword::Asm),
    ("typeof", Keyword::Typeof),
    ("__typeof", Keyword::Typeof),
    ("__typeof__", Keyword::Typeof),
    ("_Alignas", Keyword::Alignas),
    ("_Static_assert", Keyword::StaticAssert),
    ("_Alignof", Keyword::Alignof),
    ("__alignof__", Keyword::Alignof),
    ("break", Keyword::Break),
    ("case", Keyword::Case),
    ("continue", Keyword::Continue),
    ("default", Keyword::Default),
    ("do", Keyword::Do),
    ("else", Keyword::Else),
    ("for", Keyword::For),
    ("_Generic", Keyword::Generic),
    ("goto", Keyword::Goto),
    ("if", Keyword::If),
    ("return", Keyword::Return),
    ("sizeof", Keyword::Sizeof),
    ("switch", Keyword::Switch),
    ("while", Keyword::While),
];

impl Keyword {
    pub fn lookup(word: &str) -> Option<Keyword> {
        KEYWORDS
            .iter()
            .find(|(spelling, _)| *spelling == word)
            .map(|(_, keyword)| *keyword)
    }

    /// Every keyword spelling the lexer recognises.
    pub fn spellings() -> impl Iterator<Item = &'static str> {
        KEYWORDS.iter().map(|(spelling, _)| *spelling)
    }

    /// Canonical spelling.
    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, keyword)| *keyword == self)
            .map(|(spelling, _)| *spelling)
            .unwrap_or("?")
    }
}

/// Whether `word` is a language keyword.
pub fn is_reserved(word: &str) -> bool {
    Keyword::lookup(word).is_some()
}

/// A decoded preprocessor line.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `#define name` or `#define name(params)`; `params` is `Some` only when
    /// the parenthesis directly follows the name.
    Define {
        name: String,
        params: Option<Vec<String>>,
    },
    Undef {
        name: String,
    },
    Include {
        path: String,
        angled: bool,
    },
    Other(String),
}

/// All token variants produced by the lexer.
///
/// Every variant carries a [`SourceLocation`] so that parse errors can report
/// an accurate position without a separate token→location table.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(String, SourceLocation),
    CharLiteral(String, SourceLocation),
    StringLiteral(String, SourceLocation),

    Ident(String, SourceLocation),
    Keyword(Keyword, SourceLocation),

    /// A whole preprocessor line; for `#define`/`#undef` the location is the
    /// macro name's.
    Directive(Directive, SourceLocation),

    // Punctuation the declaration parser inspects
    LParen(SourceLocation),    // (
    RParen(SourceLocation),    // )
    LBrace(SourceLocation),    // {
    RBrace(SourceLocation),    // }
    LBracket(SourceLocation),  // [
    RBracket(SourceLocation),  // ]
    Semicolon(SourceLocation), // ;
    Comma(SourceLocation),     // ,
    Star(SourceLocation),      // *
    Eq(SourceLocation),        // =
    Colon(SourceLocation),     // :
    Ellipsis(SourceLocation),  // ...

    /// Any other operator
    Punct(&'static str, SourceLocation),

    // End of file
    Eof(SourceLocation),
}

impl Token {
    /// Returns the source location where this token appears.
    pub fn location(&self) -> SourceLocation {
        match self {
            Token::Number(_, loc)
            | Token::CharLiteral(_, loc)
            | Token::StringLiteral(_, loc)
            | Token::Ident(_, loc)
            | Token::Keyword(_, loc)
            | Token::Directive(_, loc)
            | Token::LParen(loc)
            | Token::RParen(loc)
            | Token::LBrace(loc)
            | Token::RBrace(loc)
            | Token::LBracket(loc)
            | Token::RBracket(loc)
            | Token::Semicolon(loc)
            | Token::Comma(loc)
            | Token::Star(loc)
            | Token::Eq(loc)
            | Token::Colon(loc)
            | Token::Ellipsis(loc)
            | Token::Punct(_, loc)
            | Token::Eof(loc) => *loc,
        }
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self, Token::Keyword(k, _) if *k == keyword)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n, _) => write!(f, "number {}", n),
            Token::CharLiteral(c, _) => write!(f, "char literal '{}'", c),
            Token::StringLiteral(s, _) => write!(f, "string literal \"{}\"", s),
            Token::Ident(s, _) => write!(f, "identifier '{}'", s),
            Token::Keyword(k, _) => write!(f, "'{}'", k.as_str()),
            Token::Directive(_, _) => write!(f, "preprocessor directive"),
            Token::LParen(_) => write!(f, "'('"),
            Token::RParen(_) => write!(f, "')'"),
            Token::LBrace(_) => write!(f, "'{{'"),
            Token::RBrace(_) => write!(f, "'}}'"),
            Token::LBracket(_) => write!(f, "'['"),
            Token::RBracket(_) => write!(f, "']'"),
            Token::Semicolon(_) => write!(f, "';'"),
            Token::Comma(_) => write!(f, "','"),
            Token::Star(_) => write!(f, "'*'"),
            Token::Eq(_) => write!(f, "'='"),
            Token::Colon(_) => write!(f, "':'"),
            Token::Ellipsis(_) => write!(f, "'...'"),
            Token::Punct(p, _) => write!(f, "'{}'", p),
            Token::Eof(_) => write!(f, "end of file"),
        }
    }
}

/// Operators the parser never inspects individually, longest first.
const PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "*=", "/=",
    "%=", "+=", "-=", "&=", "^=", "|=", "##", "+", "-", "/", "%", "<", ">", "!", "&", "|", "^",
    "~", "?", ".", "#",
];

/// Lexer error type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Lexer error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    stream: StreamId,
    /// Only whitespace and comments seen since the last newline.
    at_line_start: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str, stream: StreamId) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            stream,
            at_line_start: true,
        }
    }

    /// Tokenize the entire input
    ///
    /// A line that fails to lex is dropped and its error recorded; lexing
    /// resumes on the next line, so the tokens around it survive.
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.scan() {
                Ok(Some(token)) => tokens.push(token),
                Ok(None) => break,
                Err(e) => {
                    self.recover(&mut tokens, &e);
                    errors.push(e);
                }
            }
        }

        tokens.push(Token::Eof(self.current_location()));
        (tokens, errors)
    }

    /// Next token or directive line, `None` at end of input.
    fn scan(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace_and_comments()?;

        if self.is_at_end() {
            return Ok(None);
        }

        if self.at_line_start && self.peek() == Some('#') {
            return self.directive().map(Some);
        }

        self.at_line_start = false;
        self.next_token().map(Some)
    }

    /// Discard what was read of the failing line and skip to its end.
    fn recover(&mut self, tokens: &mut Vec<Token>, err: &LexError) {
        while tokens.last().is_some_and(|token| {
            token.location().line == err.location.line && !matches!(token, Token::Directive(..))
        }) {
            tokens.pop();
        }
        while self.peek().is_some_and(|ch| ch != '\n') {
            self.advance();
        }
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "Unexpected end of file".to_string(),
            location: loc,
        })?;

        match ch {
            '"' => self.quoted('"', loc).map(|s| Token::StringLiteral(s, loc)),
            '\'' => self.quoted('\'', loc).map(|s| Token::CharLiteral(s, loc)),
            '0'..='9' => Ok(self.number_literal(ch, loc)),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                Ok(self.number_literal(ch, loc))
            }
            'a'..='z' | 'A'..='Z' | '_' | '$' => self.identifier_or_keyword(ch, loc),

            '(' => Ok(Token::LParen(loc)),
            ')' => Ok(Token::RParen(loc)),
            '{' => Ok(Token::LBrace(loc)),
            '}' => Ok(Token::RBrace(loc)),
            '[' => Ok(Token::LBracket(loc)),
            ']' => Ok(Token::RBracket(loc)),
            ';' => Ok(Token::Semicolon(loc)),
            ',' => Ok(Token::Comma(loc)),
            ':' => Ok(Token::Colon(loc)),
            '.' if self.peek() == Some('.') && self.peek_ahead(1) == Some('.') => {
                self.advance();
                self.advance();
                Ok(Token::Ellipsis(loc))
            }
            '*' if self.peek() != Some('=') => Ok(Token::Star(loc)),
            '=' if self.peek() != Some('=') => Ok(Token::Eq(loc)),

            _ => self.punctuator(ch, loc),
        }
    }

    /// Match the longest operator starting with `first`.
    fn punctuator(&mut self, first: char, loc: SourceLocation) -> Result<Token, LexError> {
        for &candidate in PUNCTUATORS {
            let mut chars = candidate.chars();
            if chars.next() != Some(first) {
                continue;
            }
            let rest: Vec<char> = chars.collect();
            let matches = rest
                .iter()
                .enumerate()
                .all(|(i, c)| self.peek_ahead(i) == Some(*c));
            if matches {
                for _ in 0..rest.len() {
                    self.advance();
                }
                return Ok(Token::Punct(candidate, loc));
            }
        }

        Err(LexError {
            message: format!("Unexpected character: '{}'", first),
            location: loc,
        })
    }

    /// Body of a string or character literal, escapes left untouched.
    fn quoted(&mut self, close: char, loc: SourceLocation) -> Result<String, LexError> {
        let mut text = String::new();

        while let Some(ch) = self.peek() {
            if ch == close {
                self.advance();
                return Ok(text);
            }
            if ch == '\n' {
                break;
            }
            self.advance();
            text.push(ch);
            if ch == '\\' {
                if let Some(escaped) = self.advance() {
                    text.push(escaped);
                }
            }
        }

        let what = if close == '"' { "string" } else { "character" };
        Err(LexError {
            message: format!("Unterminated {} literal", what),
            location: loc,
        })
    }

    /// Preprocessing number: digits, letters, `.`, and signed exponents.
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Token {
        let mut num = String::new();
        num.push(first);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' {
                num.push(ch);
                self.advance();
                if matches!(ch, 'e' | 'E' | 'p' | 'P')
                    && matches!(self.peek(), Some('+') | Some('-'))
                {
                    if let Some(sign) = self.advance() {
                        num.push(sign);
                    }
                }
            } else {
                break;
            }
        }

        Token::Number(num, loc)
    }

    fn identifier_or_keyword(
        &mut self,
        first_char: char,
        loc: SourceLocation,
    ) -> Result<Token, LexError> {
        let ident = self.read_identifier(first_char);

        // Encoding prefixes: L"..", u8"..", U'..'
        if matches!(ident.as_str(), "L" | "u" | "U" | "u8") {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    return self.quoted('"', loc).map(|s| Token::StringLiteral(s, loc));
                }
                Some('\'') => {
                    self.advance();
                    return self.quoted('\'', loc).map(|s| Token::CharLiteral(s, loc));
                }
                _ => {}
            }
        }

        Ok(match Keyword::lookup(&ident) {
            Some(keyword) => Token::Keyword(keyword, loc),
            None => Token::Ident(ident, loc),
        })
    }

    fn read_identifier(&mut self, first_char: char) -> String {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '$' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        ident
    }

    /// Decode one preprocessor line starting at `#`.
    fn directive(&mut self) -> Result<Token, LexError> {
        let hash_loc = self.current_location();
        self.advance(); // skip '#'
        self.skip_directive_space()?;

        let name = match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                self.advance();
                self.read_identifier(ch)
            }
            _ => {
                // Null directive or `# 12 "file"` line marker
                self.skip_rest_of_directive()?;
                return Ok(Token::Directive(Directive::Other(String::new()), hash_loc));
            }
        };

        let token = match name.as_str() {
            "define" | "undef" => {
                self.skip_directive_space()?;
                let loc = self.current_location();
                let macro_name = match self.peek() {
                    Some(ch) if ch.is_ascii_alphabetic() || ch == '_' || ch == '$' => {
                        self.advance();
                        self.read_identifier(ch)
                    }
                    _ => {
                        return Err(LexError {
                            message: format!("Macro name missing in #{}", name),
                            location: loc,
                        });
                    }
                };

                if name == "undef" {
                    Token::Directive(Directive::Undef { name: macro_name }, loc)
                } else {
                    let params = if self.peek() == Some('(') {
                        self.advance();
                        Some(self.macro_params(loc)?)
                    } else {
                        None
                    };
                    Token::Directive(
                        Directive::Define {
                            name: macro_name,
                            params,
                        },
                        loc,
                    )
                }
            }
            "include" | "include_next" | "import" => {
                self.skip_directive_space()?;
                match self.peek() {
                    Some('"') => {
                        self.advance();
                        let path = self.header_name('"', hash_loc)?;
                        Token::Directive(Directive::Include { path, angled: false }, hash_loc)
                    }
                    Some('<') => {
                        self.advance();
                        let path = self.header_name('>', hash_loc)?;
                        Token::Directive(Directive::Include { path, angled: true }, hash_loc)
                    }
                    _ => Token::Directive(Directive::Other(name), hash_loc),
                }
            }
            _ => Token::Directive(Directive::Other(name), hash_loc),
        };

        self.skip_rest_of_directive()?;
        Ok(token)
    }

    /// Parameter names up to the closing parenthesis.
    fn macro_params(&mut self, loc: SourceLocation) -> Result<Vec<String>, LexError> {
        let mut params = Vec::new();
        let mut current = String::new();

        loop {
            self.skip_directive_space()?;
            match self.peek() {
                Some(')') => {
                    self.advance();
                    if !current.is_empty() {
                        params.push(current);
                    }
                    return Ok(params);
                }
                Some(',') => {
                    self.advance();
                    params.push(std::mem::take(&mut current));
                }
                Some('\n') | None => break,
                Some(ch) => {
                    self.advance();
                    current.push(ch);
                }
            }
        }

        Err(LexError {
            message: "Missing ')' in macro parameter list".to_string(),
            location: loc,
        })
    }

    fn header_name(&mut self, close: char, loc: SourceLocation) -> Result<String, LexError> {
        let mut path = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
            if ch == close {
                return Ok(path);
            }
            path.push(ch);
        }
        Err(LexError {
            message: "Unterminated header name in #include".to_string(),
            location: loc,
        })
    }

    /// Skip blanks, comments and line continuations inside a directive.
    fn skip_directive_space(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\x0c') | Some('\x0b') => {
                    self.advance();
                }
                Some('\\') if self.continues_line() => {
                    self.skip_continuation();
                }
                Some('/') if self.peek_ahead(1) == Some('*') => {
                    self.skip_block_comment()?;
                }
                _ => return Ok(()),
            }
        }
    }

    /// Consume the remainder of a directive, including its newline.
    fn skip_rest_of_directive(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek() {
            match ch {
                '\n' => {
                    self.advance();
                    break;
                }
                '\\' if self.continues_line() => self.skip_continuation(),
                '/' if self.peek_ahead(1) == Some('*') => self.skip_block_comment()?,
                '/' if self.peek_ahead(1) == Some('/') => self.skip_line_comment(),
                _ => {
                    self.advance();
                }
            }
        }
        self.at_line_start = true;
        Ok(())
    }

    /// Backslash followed by an (optionally CR) newline.
    fn continues_line(&self) -> bool {
        match self.peek_ahead(1) {
            Some('\n') => true,
            Some('\r') => self.peek_ahead(2) == Some('\n'),
            _ => false,
        }
    }

    fn skip_continuation(&mut self) {
        self.advance(); // '\\'
        if self.peek() == Some('\r') {
            self.advance();
        }
        self.advance(); // '\n'
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some('\n') => {
                    self.advance();
                    self.at_line_start = true;
                }
                Some(' ') | Some('\t') | Some('\r') | Some('\x0c') | Some('\x0b') => {
                    self.advance();
                }
                Some('\\') if self.continues_line() => self.skip_continuation(),
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                        self.at_line_start = true;
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...), up to but not including the newline
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance(); // skip '*'
                self.advance(); // skip '/'
                return Ok(());
            }
            self.advance();
        }

        Err(LexError {
            message: "Unterminated block comment".to_string(),
            location: start_loc,
        })
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.stream, self.line, self.column)
    }
}
