//! Error types
//!
//! [`IntegrityFault`] is the only error the classifier produces. It means the
//! front end handed over a symbol that breaks the symbol graph contract, and
//! it aborts the run. Front-end parse errors are not represented here: they
//! are diagnostics, counted by the front end and surfaced through the exit
//! status.

use crate::symbol::{Namespace, SymbolKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CidentError>;

/// Broken contract between the front end and the classifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityFault {
    #[error("symbol '{ident}' in the {namespace} namespace is a {kind}")]
    NamespaceShapeMismatch {
        ident: String,
        namespace: Namespace,
        kind: SymbolKind,
    },

    #[error("symbol '{ident}' has kind {kind}, which is none of struct, union or enum")]
    NotAnAggregate { ident: String, kind: SymbolKind },
}

#[derive(Error, Debug)]
pub enum CidentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Integrity fault: {0}")]
    Integrity(#[from] IntegrityFault),
}
