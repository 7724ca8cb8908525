//! Scope and type resolution.
//!
//! [`Semantic`] bundles the scope stack and the record layouts. The code
//! generator owns one and calls into it while walking the tree: to declare
//! and look up names, to turn declaration specifiers and declarators into
//! [`CType`]s, and to fold constant expressions.

pub mod const_eval;
pub mod expr_type;
pub mod symbol_table;
pub mod type_registry;
pub mod type_resolver;
pub mod types;

pub use const_eval::fold_binary;
pub use expr_type::binary_result_type;
pub use symbol_table::{FunctionSig, Namespace, Parameter, ScopeStack, Storage, Symbol};
pub use type_registry::{Member, RecordLayout, TypeRegistry};
pub use type_resolver::DeclaredType;
pub use types::{BaseType, CType, Derivation, RecordId, WORD_SIZE};

/// Scope stack plus record layouts.
#[derive(Debug, Default)]
pub struct Semantic {
    pub scopes: ScopeStack,
    pub registry: TypeRegistry,
}

impl Semantic {
    pub fn new() -> Self {
        Self::default()
    }
}
