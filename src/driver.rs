//! Traversal driver
//!
//! For every input file the driver walks three symbol lists in order:
//!
//! 1. the unit's tag table (builtins, macros, typedefs, struct/union/enum tags)
//! 2. the unit's file scope (internal linkage)
//! 3. the run-wide global scope (external linkage)
//!
//! Unless cross-file inclusion is on, only symbols whose origin is the file
//! itself are examined. A symbol is reported at most once per run no matter
//! how many passes reach it.

use crate::classify::classify;
use crate::config::Policy;
use crate::error::Result;
use crate::report::Reporter;
use crate::symbol::{
    stream_name, Stream, StreamId, Symbol, SymbolGraph, SymbolId, TranslationUnit,
};
use std::fmt;
use std::io::Write;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Tags,
    FileScope,
    GlobalScope,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Tags => write!(f, "tags"),
            Pass::FileScope => write!(f, "file scope"),
            Pass::GlobalScope => write!(f, "global scope"),
        }
    }
}

/// Find the stream the front end opened for `name`.
///
/// Streams are matched by their name only, so two files opened under the same
/// name resolve to whichever was opened first.
pub fn resolve_stream(streams: &[Stream], name: &str) -> Option<StreamId> {
    streams
        .iter()
        .position(|stream| stream.name == name)
        .map(StreamId)
}

/// Report every symbol of `unit` that belongs to `file`.
pub fn report_unit<W: Write>(
    graph: &mut SymbolGraph,
    unit: &TranslationUnit,
    file: &str,
    policy: &Policy,
    reporter: &mut Reporter<'_, W>,
) -> Result<()> {
    let origin = resolve_stream(&graph.streams, file);
    if origin.is_none() && !policy.all_files() {
        debug!(file, "no stream matches input file");
    }

    let passes = [
        (Pass::Tags, unit.tags.as_slice()),
        (Pass::FileScope, unit.file_scope.as_slice()),
        (Pass::GlobalScope, graph.global_scope.as_slice()),
    ];

    for (pass, list) in passes {
        let before = reporter.lines();
        let mut walk = Walk {
            symbols: &mut graph.symbols,
            streams: &graph.streams,
            origin,
            all_files: policy.all_files(),
        };
        walk.examine_list(list, reporter)?;
        debug!(file, %pass, reported = reporter.lines() - before, "pass done");
    }

    Ok(())
}

struct Walk<'g> {
    symbols: &'g mut [Symbol],
    streams: &'g [Stream],
    origin: Option<StreamId>,
    all_files: bool,
}

impl Walk<'_> {
    fn examine_list<W: Write>(
        &mut self,
        list: &[SymbolId],
        reporter: &mut Reporter<'_, W>,
    ) -> Result<()> {
        for &id in list {
            let sym = &mut self.symbols[id.0];
            if self.all_files || Some(sym.pos.stream) == self.origin {
                let origin = stream_name(self.streams, sym.pos.stream);
                examine(sym, origin, reporter)?;
            }
        }
        Ok(())
    }
}

/// Classify and report one symbol, marking it as visited.
fn examine<W: Write>(sym: &mut Symbol, origin: &str, reporter: &mut Reporter<'_, W>) -> Result<()> {
    if sym.visited {
        trace!(ident = %sym.ident, "already reported");
        return Ok(());
    }

    if let Some(class) = classify(sym)? {
        sym.visited = true;
        reporter.report(sym, class, origin)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::IdentClass;
    use crate::error::CidentError;
    use crate::symbol::{Modifiers, Namespace, SourceLocation, SymbolKind, TypeShape};

    fn run(graph: &mut SymbolGraph, units: &[(&TranslationUnit, &str)], policy: &Policy) -> String {
        let mut reporter = Reporter::new(Vec::new(), policy);
        for (unit, file) in units {
            report_unit(graph, unit, file, policy, &mut reporter).unwrap();
        }
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn var(graph: &mut SymbolGraph, name: &str, stream: StreamId, line: usize) -> SymbolId {
        graph.add_symbol(Symbol::new(
            name,
            Namespace::Ordinary,
            SymbolKind::Node,
            SourceLocation::new(stream, line, 1),
        ))
    }

    #[test]
    fn test_resolve_stream() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        graph.add_stream("inc/b.h");
        assert_eq!(resolve_stream(&graph.streams, "a.c"), Some(a));
        assert_eq!(resolve_stream(&graph.streams, "b.h"), None);
        assert_eq!(resolve_stream(&graph.streams, "<builtin>"), Some(StreamId(0)));
    }

    #[test]
    fn test_same_name_resolves_to_first_stream() {
        let mut graph = SymbolGraph::new();
        let first = graph.add_stream("x.h");
        graph.add_stream("x.h");
        assert_eq!(resolve_stream(&graph.streams, "x.h"), Some(first));
    }

    #[test]
    fn test_symbol_in_two_passes_reported_once() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        let id = var(&mut graph, "shared", a, 3);
        graph.global_scope.push(id);
        let mut unit = graph.new_unit();
        unit.file_scope.push(id);

        let out = run(&mut graph, &[(&unit, "a.c")], &Policy::default());
        assert_eq!(out, "a.c:3\textern_var\tshared\n");
        assert!(graph.symbol(id).visited);
    }

    #[test]
    fn test_foreign_origin_filtered_by_default() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        let h = graph.add_stream("a.h");
        let ours = var(&mut graph, "ours", a, 1);
        let theirs = var(&mut graph, "theirs", h, 1);
        graph.global_scope.extend([theirs, ours]);
        let unit = graph.new_unit();

        let out = run(&mut graph, &[(&unit, "a.c")], &Policy::default());
        assert_eq!(out, "a.c:1\textern_var\tours\n");
        assert!(!graph.symbol(theirs).visited);
    }

    #[test]
    fn test_all_files_reports_every_origin_once() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        let b = graph.add_stream("b.c");
        let h = graph.add_stream("common.h");
        let from_a = var(&mut graph, "from_a", a, 1);
        let from_h = var(&mut graph, "from_h", h, 2);
        let from_b = var(&mut graph, "from_b", b, 1);
        graph.global_scope.extend([from_a, from_h, from_b]);
        let unit_a = graph.new_unit();
        let unit_b = graph.new_unit();

        let policy = Policy::default().with_all_files(true);
        let out = run(&mut graph, &[(&unit_a, "a.c"), (&unit_b, "b.c")], &policy);
        assert_eq!(
            out,
            "a.c:1\textern_var\tfrom_a\n\
             common.h:2\textern_var\tfrom_h\n\
             b.c:1\textern_var\tfrom_b\n"
        );
    }

    #[test]
    fn test_unmatched_file_yields_nothing() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        let id = var(&mut graph, "x", a, 1);
        graph.global_scope.push(id);
        let unit = graph.new_unit();

        let out = run(&mut graph, &[(&unit, "./a.c")], &Policy::default());
        assert!(out.is_empty());
    }

    #[test]
    fn test_builtins_reported_once_across_units() {
        let mut graph = SymbolGraph::new();
        graph.add_builtin(Symbol::new(
            "__STDC__",
            Namespace::Macro,
            SymbolKind::Macro,
            SourceLocation::builtin(),
        ));
        graph.add_stream("a.c");
        graph.add_stream("b.c");
        let unit_a = graph.new_unit();
        let unit_b = graph.new_unit();

        let policy = Policy::default().with_all_files(true);
        let out = run(&mut graph, &[(&unit_a, "a.c"), (&unit_b, "b.c")], &policy);
        assert_eq!(out, "<builtin>:0\tobj_macro\t__STDC__\n");

        let mut quiet = SymbolGraph::new();
        quiet.add_builtin(Symbol::new(
            "__STDC__",
            Namespace::Macro,
            SymbolKind::Macro,
            SourceLocation::builtin(),
        ));
        quiet.add_stream("a.c");
        let unit = quiet.new_unit();
        assert!(run(&mut quiet, &[(&unit, "a.c")], &Policy::default()).is_empty());
    }

    #[test]
    fn test_unissued_stream_reports_unknown_origin() {
        let mut graph = SymbolGraph::new();
        graph.add_stream("a.c");
        let stray = var(&mut graph, "stray", StreamId(9), 4);
        graph.global_scope.push(stray);
        let unit = graph.new_unit();

        let policy = Policy::default().with_all_files(true);
        let out = run(&mut graph, &[(&unit, "a.c")], &policy);
        assert_eq!(out, "<unknown>:4\textern_var\tstray\n");
        assert_eq!(stream_name(&graph.streams, StreamId(1)), "a.c");
    }

    #[test]
    fn test_pass_order() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        let global = var(&mut graph, "global", a, 1);
        let helper = graph.add_symbol(
            Symbol::new(
                "helper",
                Namespace::Ordinary,
                SymbolKind::Node,
                SourceLocation::new(a, 2, 1),
            )
            .with_shape(TypeShape::Function)
            .with_modifiers(Modifiers::STATIC),
        );
        let tag = graph.add_symbol(
            Symbol::new("S", Namespace::Aggregate, SymbolKind::Struct, SourceLocation::new(a, 3, 8))
                .with_members(vec!["x".into()]),
        );
        graph.global_scope.push(global);
        let mut unit = graph.new_unit();
        unit.file_scope.push(helper);
        unit.tags.push(tag);

        let out = run(&mut graph, &[(&unit, "a.c")], &Policy::default());
        let classes: Vec<_> = out
            .lines()
            .map(|line| line.split('\t').nth(1).unwrap().to_string())
            .collect();
        assert_eq!(classes, ["struct_def", "static_func", "extern_var"]);
    }

    #[test]
    fn test_suppressed_symbol_is_still_marked() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        let id = graph.add_symbol(Symbol::new(
            "Fwd",
            Namespace::Aggregate,
            SymbolKind::Struct,
            SourceLocation::new(a, 1, 8),
        ));
        let mut unit = graph.new_unit();
        unit.tags.push(id);

        let out = run(&mut graph, &[(&unit, "a.c")], &Policy::default());
        assert!(out.is_empty());
        assert!(graph.symbol(id).visited);

        let enabled = Policy::default().with_class(IdentClass::StructDecl, true);
        graph.symbol_mut(id).visited = false;
        let out = run(&mut graph, &[(&unit, "a.c")], &enabled);
        assert_eq!(out, "a.c:1\tstruct_decl\tFwd\n");
    }

    #[test]
    fn test_integrity_fault_stops_the_walk() {
        let mut graph = SymbolGraph::new();
        let a = graph.add_stream("a.c");
        let bad = graph.add_symbol(Symbol::new(
            "bad",
            Namespace::Aggregate,
            SymbolKind::Macro,
            SourceLocation::new(a, 1, 1),
        ));
        let after = var(&mut graph, "after", a, 2);
        graph.global_scope.push(after);
        let mut unit = graph.new_unit();
        unit.tags.push(bad);

        let policy = Policy::default();
        let mut reporter = Reporter::new(Vec::new(), &policy);
        let err = report_unit(&mut graph, &unit, "a.c", &policy, &mut reporter).unwrap_err();
        assert!(matches!(err, CidentError::Integrity(_)));
        assert!(!graph.symbol(after).visited);
    }
}
