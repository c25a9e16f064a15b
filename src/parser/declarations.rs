//! Declaration parsing implementation
//!
//! This module handles parsing of file-scope declarations and binds the
//! symbols they introduce:
//!
//! - Declaration specifiers: storage classes, qualifiers, type specifiers,
//!   typedef names, GNU attributes
//! - Declarators: pointers, arrays, functions, parenthesised declarators
//! - struct/union/enum specifiers and their member lists
//! - Function definitions (bodies are skipped)
//!
//! # Grammar
//!
//! ```text
//! external_decl ::= specifiers [declarator ["=" init] ("," declarator ["=" init])*] ";"
//!                 | specifiers declarator "{" body "}"
//! specifiers    ::= (storage | qualifier | type | tag_spec | typedef_name | attribute)+
//! tag_spec      ::= ("struct" | "union" | "enum") [identifier] ["{" members "}"]
//! declarator    ::= "*"* (identifier | "(" declarator ")") ("[" ... "]" | "(" ... ")")*
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::lexer::{Keyword, Token};
use crate::parser::parse::{ParseError, Parser};
use crate::symbol::{Modifiers, Namespace, SourceLocation, Symbol, SymbolId, SymbolKind, TypeShape};
use tracing::{debug, trace};

/// Storage class, qualifiers and type information shared by the declarators
/// of one declaration.
#[derive(Debug, Clone, Default)]
pub(crate) struct DeclSpecs {
    pub modifiers: Modifiers,
    pub is_typedef: bool,
    pub has_type: bool,
    /// Set when the type is a typedef name; the shape it stands for.
    pub typedef_shape: Option<TypeShape>,
    /// Anything at all was consumed.
    pub any: bool,
}

/// Result of parsing one declarator.
#[derive(Debug, Clone, Default)]
pub(crate) struct Declarator {
    pub name: Option<(String, SourceLocation)>,
    /// Outermost derivation, `None` when the declarator adds none.
    pub shape: Option<TypeShape>,
}

impl Parser<'_> {
    /// Parse one file-scope declaration or function definition.
    pub(crate) fn parse_external_declaration(&mut self) -> Result<(), ParseError> {
        match self.peek() {
            Token::Semicolon(_) => {
                self.advance();
                return Ok(());
            }
            Token::RBrace(_) if self.linkage_depth > 0 => {
                self.advance();
                self.linkage_depth -= 1;
                return Ok(());
            }
            Token::Keyword(Keyword::StaticAssert, _) | Token::Keyword(Keyword::Asm, _) => {
                self.advance();
                self.skip_balanced()?;
                return self.expect_semicolon("after top-level directive");
            }
            Token::Keyword(Keyword::Extern, _) => {
                if let Some(Token::StringLiteral(_, _)) = self.peek_ahead(1) {
                    return self.parse_linkage_specification();
                }
            }
            _ => {}
        }

        let specs = self.parse_declaration_specifiers()?;
        if !specs.any && !matches!(self.peek(), Token::Ident(..) | Token::Star(_) | Token::LParen(_)) {
            return Err(ParseError {
                message: format!("Expected declaration, found {}", self.peek()),
                location: self.current_location(),
            });
        }

        // `struct S;`, `struct S { ... };`, `enum { A, B };`
        if self.match_token(&Token::Semicolon(self.current_location())) {
            return Ok(());
        }

        let mut first = true;
        loop {
            let declarator = self.parse_declarator()?;
            self.skip_gnu_extras()?;

            let Some((name, loc)) = declarator.name else {
                return Err(ParseError {
                    message: format!("Expected identifier, found {}", self.peek()),
                    location: self.current_location(),
                });
            };
            let shape = declarator
                .shape
                .or(specs.typedef_shape)
                .unwrap_or_default();
            self.bind_declarator(&specs, name, loc, shape);

            if first && shape == TypeShape::Function && self.check(&Token::LBrace(self.current_location())) {
                // Function definition
                return self.skip_balanced();
            }
            first = false;

            if self.match_token(&Token::Eq(self.current_location())) {
                self.skip_expression(|t| matches!(t, Token::Comma(_) | Token::Semicolon(_)))?;
            }

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        self.expect_semicolon("after declaration")
    }

    /// `extern "C" { ... }` or `extern "C" declaration`
    fn parse_linkage_specification(&mut self) -> Result<(), ParseError> {
        self.advance(); // 'extern'
        self.advance(); // "C"
        if self.match_token(&Token::LBrace(self.current_location())) {
            self.linkage_depth += 1;
            Ok(())
        } else {
            self.parse_external_declaration()
        }
    }

    /// Parse declaration specifiers, binding any struct/union/enum tags they
    /// mention.
    pub(crate) fn parse_declaration_specifiers(&mut self) -> Result<DeclSpecs, ParseError> {
        let mut specs = DeclSpecs::default();

        loop {
            match self.peek().clone() {
                Token::Keyword(keyword, _) => {
                    match keyword {
                        Keyword::Typedef => specs.is_typedef = true,
                        Keyword::Static => specs.modifiers |= Modifiers::STATIC,
                        Keyword::Extern => specs.modifiers |= Modifiers::EXTERN,
                        Keyword::Inline => specs.modifiers |= Modifiers::INLINE,
                        Keyword::Auto => specs.modifiers |= Modifiers::AUTO,
                        Keyword::Register => specs.modifiers |= Modifiers::REGISTER,
                        Keyword::ThreadLocal => specs.modifiers |= Modifiers::THREAD_LOCAL,
                        Keyword::Noreturn => {}
                        Keyword::Const => specs.modifiers |= Modifiers::CONST,
                        Keyword::Volatile => specs.modifiers |= Modifiers::VOLATILE,
                        Keyword::Restrict => specs.modifiers |= Modifiers::RESTRICT,
                        Keyword::Atomic => {
                            if matches!(self.peek_ahead(1), Some(Token::LParen(_))) {
                                // _Atomic(type)
                                self.advance();
                                self.skip_balanced()?;
                                specs.has_type = true;
                                specs.any = true;
                                continue;
                            }
                            specs.modifiers |= Modifiers::ATOMIC;
                        }
                        Keyword::Void
                        | Keyword::Char
                        | Keyword::Short
                        | Keyword::Int
                        | Keyword::Long
                        | Keyword::Float
                        | Keyword::Double
                        | Keyword::Signed
                        | Keyword::Unsigned
                        | Keyword::Bool
                        | Keyword::Complex
                        | Keyword::Imaginary
                        | Keyword::BuiltinVaList => specs.has_type = true,
                        Keyword::Struct | Keyword::Union | Keyword::Enum => {
                            let kind = match keyword {
                                Keyword::Struct => SymbolKind::Struct,
                                Keyword::Union => SymbolKind::Union,
                                _ => SymbolKind::Enum,
                            };
                            self.advance();
                            self.parse_tag_specifier(kind)?;
                            specs.has_type = true;
                            specs.any = true;
                            continue;
                        }
                        Keyword::Typeof | Keyword::Alignas => {
                            self.advance();
                            if self.check(&Token::LParen(self.current_location())) {
                                self.skip_balanced()?;
                            }
                            specs.has_type |= keyword == Keyword::Typeof;
                            specs.any = true;
                            continue;
                        }
                        Keyword::Attribute | Keyword::Extension => {
                            self.skip_gnu_extras()?;
                            specs.any = true;
                            continue;
                        }
                        _ => break,
                    }
                    self.advance();
                    specs.any = true;
                }
                Token::Ident(name, loc) if !specs.has_type => {
                    if let Some(shape) = self.typedefs.get(&name) {
                        specs.typedef_shape = Some(*shape);
                    } else if self.continues_specifiers() {
                        // Type from a header we did not read, or an
                        // attribute-like macro
                        debug!(name = %name, line = loc.line, "treating unknown identifier as a type name");
                    } else {
                        break;
                    }
                    self.advance();
                    specs.has_type = true;
                    specs.any = true;
                }
                _ => break,
            }
        }

        Ok(specs)
    }

    /// Whether the token after the current identifier keeps the declaration
    /// specifiers going, making the identifier a type rather than the
    /// declarator name.
    fn continues_specifiers(&self) -> bool {
        match self.peek_ahead(1) {
            Some(Token::Ident(..)) | Some(Token::Star(_)) => true,
            Some(Token::Keyword(keyword, _)) => !matches!(
                keyword,
                Keyword::Asm | Keyword::Sizeof | Keyword::Alignof | Keyword::Generic
            ),
            _ => false,
        }
    }

    /// Parse the rest of a struct/union/enum specifier after its keyword.
    pub(crate) fn parse_tag_specifier(&mut self, kind: SymbolKind) -> Result<(), ParseError> {
        self.skip_gnu_extras()?;

        let tag = match self.peek() {
            Token::Ident(name, loc) => Some((name.clone(), *loc)),
            _ => None,
        };
        if tag.is_some() {
            self.advance();
        }

        let defining = self.check(&Token::LBrace(self.current_location()));
        let id = match &tag {
            Some((name, loc)) => self.bind_tag(kind, name, *loc, defining),
            None => None,
        };

        if !defining {
            if tag.is_none() {
                return Err(ParseError {
                    message: "Expected tag name or '{'".to_string(),
                    location: self.current_location(),
                });
            }
            return Ok(());
        }

        self.advance(); // '{'
        let members = if kind == SymbolKind::Enum {
            self.parse_enumerator_list()?
        } else {
            self.parse_member_list()?
        };
        self.expect_rbrace("after member list")?;
        self.skip_gnu_extras()?;

        if let Some(id) = id {
            self.graph.symbol_mut(id).members = members;
        }
        Ok(())
    }

    /// Find or create the tag symbol for `name`.
    ///
    /// A reference to a known tag binds nothing; a body attaches to the
    /// existing declaration and moves its position to the definition.
    fn bind_tag(
        &mut self,
        kind: SymbolKind,
        name: &str,
        loc: SourceLocation,
        defining: bool,
    ) -> Option<SymbolId> {
        let Some(&id) = self.tags.get(name) else {
            let id = self
                .graph
                .add_symbol(Symbol::new(name, Namespace::Aggregate, kind, loc));
            self.unit.tags.push(id);
            self.tags.insert(name.to_string(), id);
            trace!(name, %kind, defining, "new tag");
            return Some(id);
        };

        let existing = self.graph.symbol(id);
        if existing.kind != kind {
            self.errors.push(ParseError {
                message: format!("'{}' defined as wrong kind of tag", name),
                location: loc,
            });
            return None;
        }

        if defining {
            if existing.is_definition() {
                self.errors.push(ParseError {
                    message: format!("redefinition of '{} {}'", kind, name),
                    location: loc,
                });
                return None;
            }
            self.graph.symbol_mut(id).pos = loc;
        }
        Some(id)
    }

    /// Members of a struct or union body, up to the closing brace.
    fn parse_member_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut members = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            if self.match_token(&Token::Semicolon(self.current_location())) {
                continue;
            }
            if self.peek().is_keyword(Keyword::StaticAssert) {
                self.advance();
                self.skip_balanced()?;
                self.expect_semicolon("after _Static_assert")?;
                continue;
            }

            let specs = self.parse_declaration_specifiers()?;
            if !specs.any {
                return Err(ParseError {
                    message: format!("Expected member declaration, found {}", self.peek()),
                    location: self.current_location(),
                });
            }

            // Anonymous struct or union member
            if self.match_token(&Token::Semicolon(self.current_location())) {
                members.push(String::new());
                continue;
            }

            loop {
                let declarator = if self.check(&Token::Colon(self.current_location())) {
                    Declarator::default()
                } else {
                    self.parse_declarator()?
                };
                if self.match_token(&Token::Colon(self.current_location())) {
                    // bit-field width
                    self.skip_expression(|t| matches!(t, Token::Comma(_) | Token::Semicolon(_)))?;
                }
                self.skip_gnu_extras()?;

                members.push(declarator.name.map(|(name, _)| name).unwrap_or_default());

                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
            self.expect_semicolon("after struct member")?;
        }

        Ok(members)
    }

    /// Enumerators of an enum body, binding each as an enumeration constant.
    fn parse_enumerator_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut members = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) {
            let (name, loc) = self.expect_identifier()?;
            self.skip_gnu_extras()?;
            if self.match_token(&Token::Eq(self.current_location())) {
                self.skip_expression(|t| matches!(t, Token::Comma(_) | Token::RBrace(_)))?;
            }

            let id = self.graph.add_symbol(
                Symbol::new(name.clone(), Namespace::Ordinary, SymbolKind::Node, loc).as_enum_member(),
            );
            self.graph.global_scope.push(id);
            members.push(name);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(members)
    }

    /// Parse a (possibly abstract) declarator.
    pub(crate) fn parse_declarator(&mut self) -> Result<Declarator, ParseError> {
        let mut pointers = 0usize;
        loop {
            match self.peek() {
                Token::Star(_) => pointers += 1,
                Token::Keyword(
                    Keyword::Const | Keyword::Volatile | Keyword::Restrict | Keyword::Atomic,
                    _,
                ) => {}
                Token::Keyword(Keyword::Attribute, _) => {
                    self.skip_gnu_extras()?;
                    continue;
                }
                _ => break,
            }
            self.advance();
        }

        let mut inner = Declarator::default();
        match self.peek() {
            Token::Ident(name, loc) => {
                inner.name = Some((name.clone(), *loc));
                self.advance();
            }
            Token::LParen(_) if self.paren_starts_declarator() => {
                self.advance();
                self.skip_gnu_extras()?;
                inner = self.parse_declarator()?;
                self.expect_rparen("after nested declarator")?;
            }
            _ => {}
        }

        let mut suffix = None;
        loop {
            match self.peek() {
                Token::LBracket(_) => {
                    self.skip_balanced()?;
                    suffix.get_or_insert(TypeShape::Array);
                }
                Token::LParen(_) => {
                    self.skip_balanced()?;
                    suffix.get_or_insert(TypeShape::Function);
                }
                _ => break,
            }
        }

        let own = suffix.or((pointers > 0).then_some(TypeShape::Pointer));
        Ok(Declarator {
            name: inner.name,
            shape: inner.shape.or(own),
        })
    }

    /// After `(` in declarator position: nested declarator or parameter list?
    fn paren_starts_declarator(&self) -> bool {
        match self.peek_ahead(1) {
            Some(Token::Star(_)) | Some(Token::LParen(_)) | Some(Token::LBracket(_)) => true,
            Some(Token::Keyword(Keyword::Attribute, _)) => true,
            Some(Token::Ident(name, _)) => !self.typedefs.contains_key(name),
            _ => false,
        }
    }

    /// Skip `__attribute__((...))`, `__asm__("...")` and `__extension__`.
    pub(crate) fn skip_gnu_extras(&mut self) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                Token::Keyword(Keyword::Attribute, _) | Token::Keyword(Keyword::Asm, _) => {
                    self.advance();
                    while matches!(
                        self.peek(),
                        Token::Keyword(Keyword::Volatile | Keyword::Inline | Keyword::Goto, _)
                    ) {
                        self.advance();
                    }
                    if self.check(&Token::LParen(self.current_location())) {
                        self.skip_balanced()?;
                    }
                }
                Token::Keyword(Keyword::Extension, _) => {
                    self.advance();
                }
                _ => return Ok(()),
            }
        }
    }

    /// Bind a named declarator in the scope its declaration calls for.
    fn bind_declarator(&mut self, specs: &DeclSpecs, name: String, loc: SourceLocation, shape: TypeShape) {
        if specs.is_typedef {
            let id = self.graph.add_symbol(
                Symbol::new(name.clone(), Namespace::Typedef, SymbolKind::Node, loc).with_shape(shape),
            );
            self.unit.tags.push(id);
            self.typedefs.insert(name, shape);
            return;
        }

        let modifiers = specs.modifiers;
        let internal = modifiers.contains(Modifiers::STATIC)
            || (shape == TypeShape::Function && modifiers.contains(Modifiers::EXTERN | Modifiers::INLINE));

        let id = self.graph.add_symbol(
            Symbol::new(name, Namespace::Ordinary, SymbolKind::Node, loc)
                .with_modifiers(modifiers)
                .with_shape(shape),
        );
        if internal {
            self.unit.file_scope.push(id);
        } else {
            self.graph.global_scope.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse::{ParseError, Parser};
    use crate::parser::preprocess::Preprocessor;
    use crate::symbol::*;

    fn parse(source: &str) -> (SymbolGraph, TranslationUnit, Vec<ParseError>) {
        let mut graph = SymbolGraph::new();
        let mut errors = Vec::new();
        let input = Preprocessor::new(&mut graph, &[], &mut errors).run_source("t.c", source);
        let (unit, parse_errors) = Parser::new(input, &mut graph).parse_translation_unit();
        errors.extend(parse_errors);
        (graph, unit, errors)
    }

    fn find<'a>(graph: &'a SymbolGraph, ids: &[SymbolId], name: &str) -> &'a Symbol {
        ids.iter()
            .map(|id| graph.symbol(*id))
            .find(|sym| sym.ident == name)
            .unwrap_or_else(|| panic!("{} not bound", name))
    }

    #[test]
    fn test_function_shapes() {
        let source = "int f(void);\nint *g(int a, char **b);\nint (*fp)(int);\nint arr[3][4];\nstatic inline int h(void) { return 0; }\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(find(&graph, &graph.global_scope, "f").shape, TypeShape::Function);
        assert_eq!(find(&graph, &graph.global_scope, "g").shape, TypeShape::Function);
        assert_eq!(find(&graph, &graph.global_scope, "fp").shape, TypeShape::Pointer);
        assert_eq!(find(&graph, &graph.global_scope, "arr").shape, TypeShape::Array);
        let h = find(&graph, &unit.file_scope, "h");
        assert_eq!(h.shape, TypeShape::Function);
        assert!(h.modifiers.contains(Modifiers::STATIC | Modifiers::INLINE));
    }

    #[test]
    fn test_linkage_scopes() {
        let source = "static int s;\nint e;\nextern int x;\nextern inline void ei(void) {}\ninline void i(void) {}\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        let file: Vec<_> = unit.file_scope.iter().map(|id| graph.symbol(*id).ident.as_str()).collect();
        let global: Vec<_> = graph.global_scope.iter().map(|id| graph.symbol(*id).ident.as_str()).collect();
        assert_eq!(file, ["s", "ei"]);
        assert_eq!(global, ["e", "x", "i"]);
    }

    #[test]
    fn test_tags_declare_then_define() {
        let source = "struct S;\nstruct S *p;\nstruct S {\n  int x;\n};\nunion U { int a; float b; };\nenum E;\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        let tags: Vec<_> = unit.tags.iter().map(|id| graph.symbol(*id).ident.as_str()).collect();
        assert_eq!(tags, ["S", "U", "E"]);

        let s = find(&graph, &unit.tags, "S");
        assert!(s.is_definition());
        assert_eq!(s.pos.line, 3);
        assert_eq!(find(&graph, &unit.tags, "U").members, ["a", "b"]);
        assert!(!find(&graph, &unit.tags, "E").is_definition());
    }

    #[test]
    fn test_enum_constants_are_global() {
        let source = "enum Color {\n  RED,\n  GREEN = 1 << 2,\n  BLUE = (3, 4),\n};\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        let color = find(&graph, &unit.tags, "Color");
        assert_eq!(color.members, ["RED", "GREEN", "BLUE"]);
        let green = find(&graph, &graph.global_scope, "GREEN");
        assert!(green.enum_member);
        assert_eq!(green.pos.line, 3);
    }

    #[test]
    fn test_typedefs_and_typedef_shapes() {
        let source = "typedef int myint;\ntypedef void handler_t(int);\nmyint v;\nhandler_t on_signal;\ntypedef struct { int x; } anon_t;\nanon_t a, *b;\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        let typedefs: Vec<_> = unit
            .tags
            .iter()
            .map(|id| graph.symbol(*id))
            .filter(|sym| sym.namespace == Namespace::Typedef)
            .map(|sym| sym.ident.as_str())
            .collect();
        assert_eq!(typedefs, ["myint", "handler_t", "anon_t"]);
        assert_eq!(find(&graph, &graph.global_scope, "v").shape, TypeShape::Basic);
        assert_eq!(find(&graph, &graph.global_scope, "on_signal").shape, TypeShape::Function);
        assert_eq!(find(&graph, &graph.global_scope, "b").shape, TypeShape::Pointer);
    }

    #[test]
    fn test_nested_tags_in_members() {
        let source = "struct outer {\n  struct inner { int y; } in;\n  union { int a; long b; };\n  unsigned flag : 1, : 3;\n};\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        let outer = find(&graph, &unit.tags, "outer");
        assert_eq!(outer.members, ["in", "", "flag", ""]);
        assert!(find(&graph, &unit.tags, "inner").is_definition());
    }

    #[test]
    fn test_function_body_tags_not_bound() {
        let source = "void f(struct P *p) {\n  struct L { int z; } l;\n  static int counter;\n}\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        assert!(unit.tags.is_empty());
        assert!(unit.file_scope.is_empty());
        assert_eq!(graph.global_scope.len(), 1);
    }

    #[test]
    fn test_unknown_types_and_attributes() {
        let source = "size_t len(const char *s);\nFILE *out;\nEXPORT int api(void) __attribute__((pure));\nint x __attribute__((aligned(8))) = 3;\nint y __asm__(\"real_y\");\n";
        let (graph, _, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        let global: Vec<_> = graph.global_scope.iter().map(|id| graph.symbol(*id).ident.as_str()).collect();
        assert_eq!(global, ["len", "out", "api", "x", "y"]);
    }

    #[test]
    fn test_extern_c_block() {
        let source = "extern \"C\" {\nint c_api(void);\n}\nextern \"C\" int single;\n";
        let (graph, _, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(graph.global_scope.len(), 2);
    }

    #[test]
    fn test_wrong_tag_kind_is_error() {
        let (graph, unit, errors) = parse("struct T { int a; };\nunion T { int b; };\nint after;\n");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("wrong kind of tag"));
        assert_eq!(unit.tags.len(), 1);
        assert_eq!(graph.global_scope.len(), 1);
    }

    #[test]
    fn test_redefinition_is_error() {
        let (_, _, errors) = parse("struct T { int a; };\nstruct T { int b; };\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("redefinition"));
    }

    #[test]
    fn test_multiple_declarators_with_initializers() {
        let source = "int a = 1, b[] = { 1, 2 }, *c = &a;\nstatic const char *names[] = { \"x\", \"y\" };\n";
        let (graph, unit, errors) = parse(source);

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(graph.global_scope.len(), 3);
        assert_eq!(find(&graph, &unit.file_scope, "names").shape, TypeShape::Array);
    }

    #[test]
    fn test_old_style_implicit_int() {
        let (graph, _, errors) = parse("main() { return 0; }\ncounter;\n");
        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(find(&graph, &graph.global_scope, "main").shape, TypeShape::Function);
        assert_eq!(find(&graph, &graph.global_scope, "counter").shape, TypeShape::Basic);
    }
}
