//! Include handling and macro collection
//!
//! The preprocessor opens one stream per file, splices `#include`d files into
//! a single token vector and sets `#define`/`#undef` lines aside, each anchored
//! at the token index where it appeared. Macros are never expanded and
//! conditional directives are not evaluated: every branch is read.

use crate::parser::lexer::{Directive, Lexer, Token};
use crate::parser::parse::ParseError;
use crate::symbol::{SourceLocation, StreamId, SymbolGraph};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Deepest include nesting accepted before giving up.
pub const MAX_INCLUDE_DEPTH: usize = 200;

/// A `#define` or `#undef` waiting to be bound by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMacro {
    /// Index of the first token after the directive.
    pub at: usize,
    pub directive: Directive,
    pub location: SourceLocation,
}

/// Token stream of one translation unit, includes already spliced in.
#[derive(Debug, Default)]
pub struct Preprocessed {
    pub tokens: Vec<Token>,
    pub macros: Vec<PendingMacro>,
}

pub struct Preprocessor<'a> {
    graph: &'a mut SymbolGraph,
    include_dirs: &'a [PathBuf],
    errors: &'a mut Vec<ParseError>,
    included: FxHashSet<PathBuf>,
    out: Preprocessed,
}

impl<'a> Preprocessor<'a> {
    pub fn new(
        graph: &'a mut SymbolGraph,
        include_dirs: &'a [PathBuf],
        errors: &'a mut Vec<ParseError>,
    ) -> Self {
        Self {
            graph,
            include_dirs,
            errors,
            included: FxHashSet::default(),
            out: Preprocessed::default(),
        }
    }

    /// Preprocess an input file named on the command line.
    ///
    /// Returns `None` when the file cannot be read; the failure is recorded
    /// as an error.
    pub fn run_file(self, path: &str) -> Option<Preprocessed> {
        let source = match read_source(Path::new(path)) {
            Ok(source) => source,
            Err(e) => {
                self.errors.push(ParseError {
                    message: format!("unable to open '{}': {}", path, e),
                    location: SourceLocation::builtin(),
                });
                return None;
            }
        };
        Some(self.run_source(path, &source))
    }

    /// Preprocess in-memory source registered under `name`.
    pub fn run_source(mut self, name: &str, source: &str) -> Preprocessed {
        self.included.insert(include_key(Path::new(name)));
        self.process(name, source, 0);

        let end = self
            .out
            .tokens
            .last()
            .map(|t| t.location())
            .unwrap_or_else(SourceLocation::builtin);
        self.out.tokens.push(Token::Eof(end));
        self.out
    }

    fn process(&mut self, name: &str, source: &str, depth: usize) {
        let stream = self.graph.add_stream(name);
        debug!(name, stream = stream.0, depth, "opened stream");

        let (tokens, lex_errors) = Lexer::new(source, stream).tokenize();

        for token in tokens {
            match token {
                Token::Eof(_) => {}
                Token::Directive(directive, location) => {
                    self.directive(directive, location, name, stream, depth)
                }
                token => self.out.tokens.push(token),
            }
        }

        // behind the errors of files this one includes
        self.errors.extend(lex_errors.into_iter().map(ParseError::from));
    }

    fn directive(
        &mut self,
        directive: Directive,
        location: SourceLocation,
        current: &str,
        stream: StreamId,
        depth: usize,
    ) {
        match directive {
            Directive::Define { .. } | Directive::Undef { .. } => {
                self.out.macros.push(PendingMacro {
                    at: self.out.tokens.len(),
                    directive,
                    location,
                });
            }
            Directive::Include { path, angled } => {
                self.include(&path, angled, current, location, depth)
            }
            Directive::Other(name) => {
                trace!(directive = %name, stream = stream.0, line = location.line, "ignored directive")
            }
        }
    }

    fn include(
        &mut self,
        path: &str,
        angled: bool,
        current: &str,
        location: SourceLocation,
        depth: usize,
    ) {
        let Some(resolved) = resolve_include(path, angled, current, self.include_dirs) else {
            if angled {
                debug!(path, "system header not found, skipped");
            } else {
                self.errors.push(ParseError {
                    message: format!("unable to open '{}'", path),
                    location,
                });
            }
            return;
        };

        if depth + 1 >= MAX_INCLUDE_DEPTH {
            self.errors.push(ParseError {
                message: format!("#include nested too deeply at '{}'", path),
                location,
            });
            return;
        }

        if !self.included.insert(include_key(&resolved)) {
            trace!(path = %resolved.display(), "already included");
            return;
        }

        match read_source(&resolved) {
            Ok(source) => {
                let name = resolved.to_string_lossy().into_owned();
                self.process(&name, &source, depth + 1);
            }
            Err(e) => self.errors.push(ParseError {
                message: format!("unable to open '{}': {}", resolved.display(), e),
                location,
            }),
        }
    }
}

/// Locate an included file: the including file's directory first for
/// `"..."`, then every `-I` directory.
pub fn resolve_include(
    path: &str,
    angled: bool,
    current: &str,
    include_dirs: &[PathBuf],
) -> Option<PathBuf> {
    let wanted = Path::new(path);
    if wanted.is_absolute() {
        return wanted.is_file().then(|| wanted.to_path_buf());
    }

    let mut candidates = Vec::with_capacity(include_dirs.len() + 1);
    if !angled {
        let dir = Path::new(current).parent().unwrap_or_else(|| Path::new(""));
        candidates.push(dir.join(wanted));
    }
    candidates.extend(include_dirs.iter().map(|dir| dir.join(wanted)));

    candidates.into_iter().find(|candidate| candidate.is_file())
}

fn include_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn read_source(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
