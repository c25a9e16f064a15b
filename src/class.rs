//! Identifier class registry
//!
//! Every reported identifier falls into exactly one [`IdentClass`]. The
//! [`REGISTRY`] table is the single source of truth for the class list: its
//! order defines the class indices, its short names are what the report prints
//! and what the `CIDENT_<name>` settings are keyed by, and its default flags
//! seed the [`Policy`](crate::config::Policy).

use std::fmt;

/// Classification assigned to a reported identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentClass {
    ObjMacro,
    FunMacro,
    Typedef,
    StructDecl,
    StructDef,
    UnionDecl,
    UnionDef,
    /// Not allowed by ISO C, but still used in a few places in the kernel
    EnumDecl,
    EnumDef,
    InlineFunc,
    /// Shouldn't appear in headers
    StaticFunc,
    ExternFunc,
    /// Shouldn't appear in headers
    StaticVar,
    ExternVar,
    EnumCst,
    Other,
}

/// One row of the class table.
#[derive(Debug, Clone, Copy)]
pub struct ClassInfo {
    pub class: IdentClass,
    pub name: &'static str,
    pub default_enabled: bool,
}

const fn row(class: IdentClass, name: &'static str, default_enabled: bool) -> ClassInfo {
    ClassInfo {
        class,
        name,
        default_enabled,
    }
}

/// The class table, in [`IdentClass`] declaration order.
pub const REGISTRY: [ClassInfo; IdentClass::COUNT] = [
    row(IdentClass::ObjMacro, "obj_macro", true),
    row(IdentClass::FunMacro, "fun_macro", true),
    row(IdentClass::Typedef, "typedef", true),
    row(IdentClass::StructDecl, "struct_decl", false),
    row(IdentClass::StructDef, "struct_def", true),
    row(IdentClass::UnionDecl, "union_decl", false),
    row(IdentClass::UnionDef, "union_def", true),
    row(IdentClass::EnumDecl, "enum_decl", false),
    row(IdentClass::EnumDef, "enum_def", true),
    row(IdentClass::InlineFunc, "inline_func", true),
    row(IdentClass::StaticFunc, "static_func", true),
    row(IdentClass::ExternFunc, "extern_func", true),
    row(IdentClass::StaticVar, "static_var", true),
    row(IdentClass::ExternVar, "extern_var", true),
    row(IdentClass::EnumCst, "enum_cst", true),
    row(IdentClass::Other, "other", true),
];

impl IdentClass {
    pub const COUNT: usize = 16;

    /// Position of this class in [`REGISTRY`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn info(self) -> &'static ClassInfo {
        &REGISTRY[self.index()]
    }

    /// Short name used in the report and in configuration keys.
    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn default_enabled(self) -> bool {
        self.info().default_enabled
    }

    /// Look a class up by its short name.
    pub fn from_name(name: &str) -> Option<IdentClass> {
        REGISTRY
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.class)
    }

    pub fn all() -> impl Iterator<Item = IdentClass> {
        REGISTRY.iter().map(|info| info.class)
    }
}

impl fmt::Display for IdentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
