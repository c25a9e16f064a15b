//! Report sink
//!
//! One line per accepted symbol: `file:line<TAB>class<TAB>identifier`.

use crate::class::IdentClass;
use crate::config::Policy;
use crate::symbol::Symbol;
use std::io::{self, Write};

/// Writes report lines for the classes the policy enables.
pub struct Reporter<'p, W: Write> {
    out: W,
    policy: &'p Policy,
    lines: usize,
}

impl<'p, W: Write> Reporter<'p, W> {
    pub fn new(out: W, policy: &'p Policy) -> Self {
        Reporter {
            out,
            policy,
            lines: 0,
        }
    }

    /// Emit `sym` under `class`, unless the class is suppressed.
    pub fn report(&mut self, sym: &Symbol, class: IdentClass, origin: &str) -> io::Result<()> {
        if !self.policy.is_enabled(class) {
            return Ok(());
        }

        writeln!(
            self.out,
            "{}:{}\t{}\t{}",
            origin,
            sym.pos.line,
            class.name(),
            sym.ident
        )?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Namespace, SourceLocation, StreamId, SymbolKind};

    fn sample() -> Symbol {
        Symbol::new(
            "helper",
            Namespace::Ordinary,
            SymbolKind::Node,
            SourceLocation::new(StreamId(1), 42, 13),
        )
    }

    #[test]
    fn test_line_format() {
        let policy = Policy::default();
        let mut reporter = Reporter::new(Vec::new(), &policy);
        reporter
            .report(&sample(), IdentClass::StaticFunc, "src/util.c")
            .unwrap();
        assert_eq!(reporter.lines(), 1);
        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(out, "src/util.c:42\tstatic_func\thelper\n");
    }

    #[test]
    fn test_suppressed_class_writes_nothing() {
        let policy = Policy::default();
        let mut reporter = Reporter::new(Vec::new(), &policy);
        reporter
            .report(&sample(), IdentClass::StructDecl, "a.h")
            .unwrap();
        assert_eq!(reporter.lines(), 0);
        assert!(reporter.into_inner().is_empty());
    }
}
