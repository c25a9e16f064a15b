//! Symbol graph produced by the C front end
//!
//! The front end ([`crate::parser`]) fills a [`SymbolGraph`]: an arena of
//! [`Symbol`]s, the list of source streams they came from, and the scope
//! lists the report walks. Apart from [`Symbol::visited`], nothing here is
//! modified once a translation unit has been compiled.

use bitflags::bitflags;
use std::fmt;

/// Index of a source stream in [`SymbolGraph::streams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamId(pub usize);

/// Index of a symbol in [`SymbolGraph::symbols`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub usize);

/// Stream of the predefined symbols.
pub const BUILTIN_STREAM: StreamId = StreamId(0);
pub const BUILTIN_STREAM_NAME: &str = "<builtin>";

/// Source location information for symbols and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub stream: StreamId,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(stream: StreamId, line: usize, column: usize) -> Self {
        Self {
            stream,
            line,
            column,
        }
    }

    pub fn builtin() -> Self {
        Self::new(BUILTIN_STREAM, 0, 0)
    }
}

/// Identifier table a symbol is bound in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Macro,
    Typedef,
    /// struct, union and enum tags
    Aggregate,
    /// objects, functions and enumeration constants
    Ordinary,
    None,
    Label,
    Iterator,
    Undefined,
    Preprocessor,
    Keyword,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Macro => "macro",
            Namespace::Typedef => "typedef",
            Namespace::Aggregate => "aggregate",
            Namespace::Ordinary => "ordinary",
            Namespace::None => "none",
            Namespace::Label => "label",
            Namespace::Iterator => "iterator",
            Namespace::Undefined => "undef",
            Namespace::Preprocessor => "preprocessor",
            Namespace::Keyword => "keyword",
        };
        f.write_str(name)
    }
}

/// What kind of entity the symbol itself is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A declared entity: object, function, typedef name or enumerator.
    Node,
    Macro,
    Struct,
    Union,
    Enum,
    Keyword,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Node => "node",
            SymbolKind::Macro => "macro",
            SymbolKind::Struct => "struct",
            SymbolKind::Union => "union",
            SymbolKind::Enum => "enum",
            SymbolKind::Keyword => "keyword",
        };
        f.write_str(name)
    }
}

/// Outermost derivation of a declared entity's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeShape {
    #[default]
    Basic,
    Pointer,
    Array,
    Function,
}

bitflags! {
    /// Storage classes and qualifiers attached to a declaration
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const STATIC = 1 << 0;
        const EXTERN = 1 << 1;
        const INLINE = 1 << 2;
        const AUTO = 1 << 3;
        const REGISTER = 1 << 4;
        const THREAD_LOCAL = 1 << 5;
        const CONST = 1 << 6;
        const VOLATILE = 1 << 7;
        const RESTRICT = 1 << 8;
        const ATOMIC = 1 << 9;
    }
}

/// A named entity as seen by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub ident: String,
    /// Language keyword; never reported.
    pub reserved: bool,
    pub namespace: Namespace,
    pub kind: SymbolKind,
    pub pos: SourceLocation,
    /// Parameter names of a function-like macro.
    pub macro_params: Option<Vec<String>>,
    /// Member names attached to a struct, union or enum tag.
    pub members: Vec<String>,
    pub modifiers: Modifiers,
    pub shape: TypeShape,
    pub enum_member: bool,
    /// Set once the symbol has been reported.
    pub visited: bool,
}

impl Symbol {
    pub fn new(
        ident: impl Into<String>,
        namespace: Namespace,
        kind: SymbolKind,
        pos: SourceLocation,
    ) -> Self {
        Symbol {
            ident: ident.into(),
            reserved: false,
            namespace,
            kind,
            pos,
            macro_params: None,
            members: Vec::new(),
            modifiers: Modifiers::empty(),
            shape: TypeShape::Basic,
            enum_member: false,
            visited: false,
        }
    }

    pub fn with_reserved(mut self, reserved: bool) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn with_params(mut self, params: Vec<String>) -> Self {
        self.macro_params = Some(params);
        self
    }

    pub fn with_members(mut self, members: Vec<String>) -> Self {
        self.members = members;
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_shape(mut self, shape: TypeShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn as_enum_member(mut self) -> Self {
        self.enum_member = true;
        self
    }

    pub fn is_function(&self) -> bool {
        self.shape == TypeShape::Function
    }

    pub fn is_definition(&self) -> bool {
        !self.members.is_empty()
    }
}

/// An opened source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub name: String,
}

/// Scope lists of one compiled input file.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    /// Builtins, then macros, typedefs, tags and `#undef` markers in
    /// declaration order.
    pub tags: Vec<SymbolId>,
    /// Top-level ordinary entities with internal linkage.
    pub file_scope: Vec<SymbolId>,
}

/// Everything the front end knows about a run.
#[derive(Debug, Clone)]
pub struct SymbolGraph {
    pub symbols: Vec<Symbol>,
    pub streams: Vec<Stream>,
    /// Predefined symbols, shared by every translation unit.
    pub builtins: Vec<SymbolId>,
    /// Top-level ordinary entities with external linkage, across all units.
    pub global_scope: Vec<SymbolId>,
}

/// Name of stream `id` in `streams`, `<unknown>` when out of range.
pub fn stream_name(streams: &[Stream], id: StreamId) -> &str {
    streams
        .get(id.0)
        .map(|stream| stream.name.as_str())
        .unwrap_or("<unknown>")
}

impl Default for SymbolGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolGraph {
    pub fn new() -> Self {
        SymbolGraph {
            symbols: Vec::new(),
            streams: vec![Stream {
                name: BUILTIN_STREAM_NAME.to_string(),
            }],
            builtins: Vec::new(),
            global_scope: Vec::new(),
        }
    }

    pub fn add_stream(&mut self, name: impl Into<String>) -> StreamId {
        self.streams.push(Stream { name: name.into() });
        StreamId(self.streams.len() - 1)
    }

    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.push(symbol);
        SymbolId(self.symbols.len() - 1)
    }

    pub fn add_builtin(&mut self, symbol: Symbol) -> SymbolId {
        let id = self.add_symbol(symbol);
        self.builtins.push(id);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    /// Display name of a stream, `<unknown>` for ids the graph never issued.
    pub fn stream_name(&self, id: StreamId) -> &str {
        stream_name(&self.streams, id)
    }

    /// Fresh unit whose tag table starts with the builtins.
    pub fn new_unit(&self) -> TranslationUnit {
        TranslationUnit {
            tags: self.builtins.clone(),
            file_scope: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_starts_with_builtin_stream() {
        let graph = SymbolGraph::new();
        assert_eq!(graph.streams.len(), 1);
        assert_eq!(graph.stream_name(BUILTIN_STREAM), "<builtin>");
        assert_eq!(graph.stream_name(StreamId(7)), "<unknown>");
    }

    #[test]
    fn test_new_unit_shares_builtins() {
        let mut graph = SymbolGraph::new();
        let id = graph.add_builtin(Symbol::new(
            "__STDC__",
            Namespace::Macro,
            SymbolKind::Macro,
            SourceLocation::builtin(),
        ));
        let first = graph.new_unit();
        let second = graph.new_unit();
        assert_eq!(first.tags, vec![id]);
        assert_eq!(second.tags, vec![id]);
    }

    #[test]
    fn test_definition_follows_members() {
        let pos = SourceLocation::builtin();
        let decl = Symbol::new("S", Namespace::Aggregate, SymbolKind::Struct, pos);
        assert!(!decl.is_definition());
        let def = decl.with_members(vec!["x".into()]);
        assert!(def.is_definition());
    }
}
