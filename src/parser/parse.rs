//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the error type, helper methods, and the translation-unit loop.
//!
//! # Parser Architecture
//!
//! The Parser is a recursive descent parser over file-scope declarations:
//! - This module: Parser struct, helper methods, error recovery, macro binding
//! - `declarations`: declaration specifiers, declarators, struct/union/enum
//!   bodies and symbol binding
//!
//! Function bodies, initializers and array sizes are skipped by bracket
//! balancing; nothing below file scope is bound.
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::lexer::{is_reserved, Directive, LexError, Token};
use crate::parser::preprocess::{PendingMacro, Preprocessed};
use crate::symbol::{
    Namespace, SourceLocation, Symbol, SymbolGraph, SymbolId, SymbolKind, TranslationUnit,
    TypeShape,
};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::trace;

/// Parser error type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error at line {}, column {}: {message}", .location.line, .location.column)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            location: err.location,
        }
    }
}

/// Recursive descent parser binding file-scope C declarations
pub struct Parser<'g> {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) graph: &'g mut SymbolGraph,
    pub(crate) unit: TranslationUnit,
    /// struct/union/enum tags bound in this unit
    pub(crate) tags: FxHashMap<String, SymbolId>,
    /// typedef names and the shape they stand for
    pub(crate) typedefs: FxHashMap<String, TypeShape>,
    /// open `extern "C" {` blocks
    pub(crate) linkage_depth: usize,
    pub(crate) errors: Vec<ParseError>,
    macros: Vec<PendingMacro>,
    next_macro: usize,
}

impl<'g> Parser<'g> {
    pub fn new(input: Preprocessed, graph: &'g mut SymbolGraph) -> Self {
        let unit = graph.new_unit();
        let mut tokens = input.tokens;
        if !matches!(tokens.last(), Some(Token::Eof(_))) {
            tokens.push(Token::Eof(SourceLocation::builtin()));
        }
        Self {
            tokens,
            position: 0,
            graph,
            unit,
            tags: FxHashMap::default(),
            typedefs: FxHashMap::default(),
            linkage_depth: 0,
            errors: Vec::new(),
            macros: input.macros,
            next_macro: 0,
        }
    }

    /// Parse every file-scope declaration and return the unit's scope lists
    /// together with the errors met on the way.
    pub fn parse_translation_unit(mut self) -> (TranslationUnit, Vec<ParseError>) {
        while !self.is_at_end() {
            self.bind_macros_before(self.position);
            let start = self.position;
            if let Err(e) = self.parse_external_declaration() {
                trace!(error = %e, "recovering");
                self.errors.push(e);
                self.synchronize();
            }
            if self.position == start && !self.is_at_end() {
                self.advance();
            }
        }
        self.bind_macros_before(usize::MAX);

        (self.unit, self.errors)
    }

    /// Bind every macro event anchored before token `limit`.
    fn bind_macros_before(&mut self, limit: usize) {
        while let Some(pending) = self.macros.get(self.next_macro) {
            if pending.at > limit {
                break;
            }
            let symbol = match &pending.directive {
                Directive::Define { name, params } => {
                    let symbol =
                        Symbol::new(name.clone(), Namespace::Macro, SymbolKind::Macro, pending.location)
                            .with_reserved(is_reserved(name));
                    match params {
                        Some(params) => symbol.with_params(params.clone()),
                        None => symbol,
                    }
                }
                Directive::Undef { name } => Symbol::new(
                    name.clone(),
                    Namespace::Undefined,
                    SymbolKind::Macro,
                    pending.location,
                ),
                _ => {
                    self.next_macro += 1;
                    continue;
                }
            };
            let id = self.graph.add_symbol(symbol);
            self.unit.tags.push(id);
            self.next_macro += 1;
        }
    }

    /// Skip to the end of the broken declaration: the next `;` or the `}`
    /// closing the block it opened.
    pub(crate) fn synchronize(&mut self) {
        let mut depth = 0usize;
        while !self.is_at_end() {
            match self.peek() {
                Token::LBrace(_) | Token::LParen(_) | Token::LBracket(_) => depth += 1,
                Token::RParen(_) | Token::RBracket(_) => depth = depth.saturating_sub(1),
                Token::RBrace(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        self.match_token(&Token::Semicolon(self.current_location()));
                        return;
                    }
                }
                Token::Semicolon(_) if depth == 0 => {
                    self.advance();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip a bracketed group starting at the current opening token.
    pub(crate) fn skip_balanced(&mut self) -> Result<(), ParseError> {
        let start = self.current_location();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                Token::LBrace(_) | Token::LParen(_) | Token::LBracket(_) => depth += 1,
                Token::RBrace(_) | Token::RParen(_) | Token::RBracket(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                Token::Eof(_) => {
                    return Err(ParseError {
                        message: "Unbalanced brackets, reached end of file".to_string(),
                        location: start,
                    })
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip an expression up to (not including) the first top-level token
    /// accepted by `stop`.
    pub(crate) fn skip_expression(&mut self, stop: fn(&Token) -> bool) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Token::LBrace(_) | Token::LParen(_) | Token::LBracket(_) => self.skip_balanced()?,
                Token::Eof(_) => {
                    return Err(ParseError {
                        message: "Unexpected end of file in expression".to_string(),
                        location: self.current_location(),
                    })
                }
                token if stop(token) => return Ok(()),
                Token::RBrace(_) | Token::RParen(_) | Token::RBracket(_) => {
                    return Err(ParseError {
                        message: format!("Unexpected {}", self.peek()),
                        location: self.current_location(),
                    })
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ===== Helper methods =====

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError {
                message: format!("{}, found {}", message, self.peek()),
                location: self.current_location(),
            })
        }
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RParen(self.current_location()),
            &format!("Expected ')' {ctx}"),
        )
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBrace(self.current_location()),
            &format!("Expected '}}' {ctx}"),
        )
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            &format!("Expected ';' {ctx}"),
        )
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, SourceLocation), ParseError> {
        if let Token::Ident(name, loc) = self.peek() {
            let ident = (name.clone(), *loc);
            self.advance();
            Ok(ident)
        } else {
            Err(ParseError {
                message: format!("Expected identifier, found {}", self.peek()),
                location: self.current_location(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::preprocess::Preprocessor;

    fn parse(source: &str) -> (SymbolGraph, TranslationUnit, Vec<ParseError>) {
        let mut graph = SymbolGraph::new();
        let mut errors = Vec::new();
        let input = Preprocessor::new(&mut graph, &[], &mut errors).run_source("t.c", source);
        let (unit, parse_errors) = Parser::new(input, &mut graph).parse_translation_unit();
        errors.extend(parse_errors);
        (graph, unit, errors)
    }

    fn names(graph: &SymbolGraph, ids: &[SymbolId]) -> Vec<String> {
        ids.iter().map(|id| graph.symbol(*id).ident.clone()).collect()
    }

    #[test]
    fn test_macros_bound_in_order() {
        let source = "#define A 1\nstruct S { int x; };\n#define F(x) x\n#undef A\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(names(&graph, &unit.tags), ["A", "S", "F", "A"]);
        let undef = graph.symbol(unit.tags[3]);
        assert_eq!(undef.namespace, Namespace::Undefined);
        assert!(graph.symbol(unit.tags[2]).macro_params.is_some());
    }

    #[test]
    fn test_keyword_macro_is_reserved() {
        let (graph, unit, _) = parse("#define inline __inline__\n");
        assert!(graph.symbol(unit.tags[0]).reserved);
    }

    #[test]
    fn test_recovery_after_error() {
        let source = "int a;\nint 3bad = ;\nint b;\nstatic int c(void) { if (x) { return; } }\n";
        let (graph, unit, errors) = parse(source);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location.line, 2);
        assert_eq!(names(&graph, &graph.global_scope), ["a", "b"]);
        assert_eq!(names(&graph, &unit.file_scope), ["c"]);
    }

    #[test]
    fn test_unbalanced_body_is_error() {
        let (_, _, errors) = parse("void f(void) { {\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Unbalanced"));
    }

    #[test]
    fn test_lex_error_converts_with_location() {
        let err: ParseError = LexError {
            message: "Unterminated character literal".to_string(),
            location: SourceLocation::new(crate::symbol::StreamId(1), 3, 9),
        }
        .into();
        assert_eq!(err.location.line, 3);
        assert_eq!(
            err.to_string(),
            "Parse error at line 3, column 9: Unterminated character literal"
        );
    }

    #[test]
    fn test_lex_error_line_does_not_stop_parsing() {
        let (graph, _, errors) = parse("int before;\n#if 0\nthis isn't compiled\n#endif\nint after;\n");

        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(names(&graph, &graph.global_scope), ["before", "after"]);
    }

    #[test]
    fn test_stray_closer_makes_progress() {
        let (graph, _, errors) = parse(") int a; int b;");
        assert_eq!(errors.len(), 1);
        assert_eq!(names(&graph, &graph.global_scope), ["b"]);
    }
}
