//! Symbol classification
//!
//! [`classify`] maps one symbol to at most one [`IdentClass`]. It reads the
//! symbol and nothing else, so the same symbol always gets the same answer;
//! marking symbols as reported is the driver's job.
//!
//! `Ok(None)` means "nothing to report" (reserved identifiers, namespaces
//! without a public identifier, already reported entities). `Err` means the
//! symbol violates the symbol graph contract.

use crate::class::IdentClass;
use crate::error::IntegrityFault;
use crate::symbol::{Modifiers, Namespace, Symbol, SymbolKind};

/// Dispatch on the symbol's namespace.
pub fn classify(sym: &Symbol) -> Result<Option<IdentClass>, IntegrityFault> {
    if sym.reserved {
        return Ok(None);
    }

    match sym.namespace {
        Namespace::Macro => classify_macro(sym).map(Some),
        Namespace::Typedef => Ok(Some(classify_typedef(sym))),
        Namespace::Aggregate => classify_aggregate(sym).map(Some),
        Namespace::Ordinary => Ok(classify_ordinary(sym)),
        Namespace::None
        | Namespace::Label
        | Namespace::Iterator
        | Namespace::Undefined
        | Namespace::Preprocessor
        | Namespace::Keyword => Ok(None),
    }
}

fn classify_macro(sym: &Symbol) -> Result<IdentClass, IntegrityFault> {
    if sym.kind != SymbolKind::Macro {
        return Err(IntegrityFault::NamespaceShapeMismatch {
            ident: sym.ident.clone(),
            namespace: sym.namespace,
            kind: sym.kind,
        });
    }

    if sym.macro_params.is_some() {
        Ok(IdentClass::FunMacro)
    } else {
        Ok(IdentClass::ObjMacro)
    }
}

fn classify_typedef(_sym: &Symbol) -> IdentClass {
    IdentClass::Typedef
}

fn classify_aggregate(sym: &Symbol) -> Result<IdentClass, IntegrityFault> {
    let defined = sym.is_definition();
    let class = match sym.kind {
        SymbolKind::Struct if defined => IdentClass::StructDef,
        SymbolKind::Struct => IdentClass::StructDecl,
        SymbolKind::Union if defined => IdentClass::UnionDef,
        SymbolKind::Union => IdentClass::UnionDecl,
        SymbolKind::Enum if defined => IdentClass::EnumDef,
        SymbolKind::Enum => IdentClass::EnumDecl,
        kind => {
            return Err(IntegrityFault::NotAnAggregate {
                ident: sym.ident.clone(),
                kind,
            })
        }
    };
    Ok(class)
}

/// Ordered rule ladder for objects, functions and enumeration constants.
///
/// The first matching rule wins:
///
/// 1. already reported: nothing
/// 2. reserved: nothing
/// 3. enumeration constant: `enum_cst`
/// 4. function type: `inline_func`, else `static_func`, else `extern_func`
/// 5. declared entity: `static_var`, else `extern_var`
/// 6. anything else: `other`
fn classify_ordinary(sym: &Symbol) -> Option<IdentClass> {
    if sym.visited {
        return None;
    }

    if sym.reserved {
        return None;
    }

    if sym.enum_member {
        return Some(IdentClass::EnumCst);
    }

    if sym.is_function() {
        let class = if sym.modifiers.contains(Modifiers::INLINE) {
            IdentClass::InlineFunc
        } else if sym.modifiers.contains(Modifiers::STATIC) {
            IdentClass::StaticFunc
        } else {
            IdentClass::ExternFunc
        };
        return Some(class);
    }

    if sym.kind == SymbolKind::Node {
        let class = if sym.modifiers.contains(Modifiers::STATIC) {
            IdentClass::StaticVar
        } else {
            IdentClass::ExternVar
        };
        return Some(class);
    }

    Some(IdentClass::Other)
}
