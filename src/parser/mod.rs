//! C front end
//!
//! This module turns C source files into the symbol graph the classifier walks:
//! - [`options`]: compiler-style arguments (include dirs, `-D`/`-U`, input files)
//! - [`lexer`]: Tokenization (source text → tokens and directive lines)
//! - [`preprocess`]: include splicing and macro collection
//! - [`parse`]: Parsing (tokens → bound file-scope symbols)
//!
//! # Supported C
//!
//! Everything that can appear at file scope, including GNU attributes and
//! `asm` labels. Only declarations are understood:
//! - Function bodies, initializers and array sizes are skipped unparsed
//! - Macros are recorded but never expanded
//! - Conditional directives are not evaluated; both branches are read
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with bracket-balancing recovery.
//! No external parser generator dependencies.

mod declarations;
pub mod lexer;
pub mod options;
pub mod parse;
pub mod preprocess;

use crate::symbol::{
    Namespace, SourceLocation, Symbol, SymbolGraph, SymbolKind, TranslationUnit, BUILTIN_STREAM,
};
use lexer::Keyword;
use options::FrontendOptions;
use parse::{ParseError, Parser};
use preprocess::Preprocessor;
use std::io::{self, Read};
use tracing::{debug, info};

/// Macros every translation unit starts with.
const PREDEFINED_MACROS: &[&str] = &["__STDC__", "__STDC_VERSION__", "__STDC_HOSTED__"];

/// Owns the symbol graph shared by every file of a run.
pub struct Frontend {
    options: FrontendOptions,
    graph: SymbolGraph,
    errors: usize,
}

impl Frontend {
    pub fn new(options: FrontendOptions) -> Self {
        let mut graph = SymbolGraph::new();
        install_builtins(&mut graph, &options);
        debug!(builtins = graph.builtins.len(), "front end ready");
        Frontend {
            options,
            graph,
            errors: 0,
        }
    }

    /// Parse one input file into a translation unit.
    ///
    /// Errors are printed to stderr and counted; whatever parsed is kept.
    /// `-` reads standard input.
    pub fn compile(&mut self, path: &str) -> TranslationUnit {
        let mut errors = Vec::new();
        let include_dirs = &self.options.include_dirs;

        let input = if path == "-" {
            let mut source = String::new();
            match io::stdin().read_to_string(&mut source) {
                Ok(_) => Some(
                    Preprocessor::new(&mut self.graph, include_dirs, &mut errors)
                        .run_source(path, &source),
                ),
                Err(e) => {
                    errors.push(ParseError {
                        message: format!("unable to read standard input: {}", e),
                        location: SourceLocation::builtin(),
                    });
                    None
                }
            }
        } else {
            Preprocessor::new(&mut self.graph, include_dirs, &mut errors).run_file(path)
        };

        let unit = match input {
            Some(input) => {
                let (unit, parse_errors) =
                    Parser::new(input, &mut self.graph).parse_translation_unit();
                errors.extend(parse_errors);
                unit
            }
            None => self.graph.new_unit(),
        };

        info!(
            file = path,
            tags = unit.tags.len(),
            file_scope = unit.file_scope.len(),
            errors = errors.len(),
            "compiled"
        );
        for error in &errors {
            eprintln!("{}", self.diagnostic(error));
        }
        self.errors += errors.len();
        unit
    }

    /// Render an error as `file:line:col: error: message`.
    pub fn diagnostic(&self, error: &ParseError) -> String {
        if error.location.stream == BUILTIN_STREAM {
            return format!("error: {}", error.message);
        }
        format!(
            "{}:{}:{}: error: {}",
            self.graph.stream_name(error.location.stream),
            error.location.line,
            error.location.column,
            error.message
        )
    }

    pub fn graph(&self) -> &SymbolGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SymbolGraph {
        &mut self.graph
    }

    /// Errors recorded over every file compiled so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }
}

/// Predefined and `-D` macros, then one reserved symbol per keyword.
fn install_builtins(graph: &mut SymbolGraph, options: &FrontendOptions) {
    let predefined = PREDEFINED_MACROS
        .iter()
        .copied()
        .filter(|name| !options.undefs.iter().any(|undef| undef.as_str() == *name));

    for name in predefined.chain(options.macro_names()) {
        graph.add_builtin(Symbol::new(
            name,
            Namespace::Macro,
            SymbolKind::Macro,
            SourceLocation::builtin(),
        ));
    }

    for spelling in Keyword::spellings() {
        graph.add_builtin(
            Symbol::new(
                spelling,
                Namespace::Keyword,
                SymbolKind::Keyword,
                SourceLocation::builtin(),
            )
            .with_reserved(true),
        );
    }
}
