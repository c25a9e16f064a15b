//! # Introduction
//!
//! cident lists the identifiers a set of C files declare at file scope, one
//! line per identifier, tagged with the kind of entity it names:
//!
//! ```text
//! a.c:1	obj_macro	MAX
//! a.c:2	typedef	myint
//! a.c:3	static_func	helper
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Preprocessor → Parser → SymbolGraph → Classifier → Report
//! ```
//!
//! 1. [`parser`] reads compiler-style arguments, tokenises every input file and
//!    binds its macros, typedefs, tags and top-level declarations into a
//!    [`symbol::SymbolGraph`].
//! 2. [`driver`] walks each file's tag table, file scope and the shared global
//!    scope, filtering by origin and reporting each symbol at most once.
//! 3. [`classify`] maps a symbol to one of the [`class::IdentClass`] values.
//! 4. [`report`] prints the classes the [`config::Policy`] enables.
//!
//! ## Configuration
//!
//! Every class is switched by an environment variable `CIDENT_<class>`, and
//! `CIDENT_all_files` also reports symbols from included headers. The values
//! `""`, `0` and `n` (any case) are false; anything else is true.

pub mod class;
pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod parser;
pub mod report;
pub mod symbol;

use crate::config::Policy;
use crate::error::Result;
use crate::parser::options::FrontendOptions;
use crate::parser::Frontend;
use crate::report::Reporter;
use std::io::Write;
use tracing::warn;

/// Outcome of a run that did not hit an integrity fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub files: usize,
    /// Front-end errors over all files.
    pub errors: usize,
    pub reported: usize,
}

/// Compile every input named in `args` and write the report to `out`.
pub fn run<W: Write>(args: &[String], policy: &Policy, out: W) -> Result<RunSummary> {
    let (options, files) = FrontendOptions::from_args(args);
    if files.is_empty() {
        warn!("no input files");
    }

    let mut frontend = Frontend::new(options);
    let mut reporter = Reporter::new(out, policy);

    for file in &files {
        let unit = frontend.compile(file);
        driver::report_unit(frontend.graph_mut(), &unit, file, policy, &mut reporter)?;
    }
    reporter.flush()?;

    Ok(RunSummary {
        files: files.len(),
        errors: frontend.error_count(),
        reported: reporter.lines(),
    })
}
