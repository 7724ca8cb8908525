//! Symbol table management and scope handling.
//!
//! Scopes form a stack that mirrors lexical block nesting. Each level owns
//! only its own bindings; lookups walk outward from the innermost level.
//! Ordinary identifiers and struct/union/enum tags live in separate
//! namespaces.

use std::rc::Rc;

use hashbrown::HashMap;
use log::debug;

use crate::ast::NameId;
use crate::diagnostic::{CompileError, CompileResult};

use super::types::{CType, RecordId};

/// Where a variable lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Byte offset below the frame base: the object starts at `[rbp - offset]`.
    /// Parameters have negative offsets.
    Frame(i64),
    /// Data-section label.
    Global(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Option<NameId>,
    pub ty: CType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub name: NameId,
    pub ret: CType,
    pub params: Vec<Parameter>,
    pub variadic: bool,
}

impl FunctionSig {
    /// Whether a call with `count` arguments matches this signature.
    pub fn accepts_arg_count(&self, count: usize) -> bool {
        if self.variadic {
            count >= self.params.len()
        } else {
            count == self.params.len()
        }
    }
}

/// Meaning of a declared name.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable {
        ty: CType,
        storage: Storage,
        /// Folded initializer of a global, usable in later constant
        /// expressions.
        initial: Option<i64>,
    },
    Array {
        ty: CType,
        storage: Storage,
    },
    Function(Rc<FunctionSig>),
    Typedef(CType),
    EnumConstant(i64),
    /// struct/union tag.
    Record(RecordId),
    /// enum tag; enums are plain integers.
    EnumTag,
}

impl Symbol {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Variable { .. } => "variable",
            Symbol::Array { .. } => "array",
            Symbol::Function(_) => "function",
            Symbol::Typedef(_) => "typedef",
            Symbol::EnumConstant(_) => "enum constant",
            Symbol::Record(_) => "struct",
            Symbol::EnumTag => "enum",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Ordinary,
    Tag,
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<NameId, Symbol>,
    tags: HashMap<NameId, Symbol>,
}

impl Scope {
    fn table(&self, ns: Namespace) -> &HashMap<NameId, Symbol> {
        match ns {
            Namespace::Ordinary => &self.symbols,
            Namespace::Tag => &self.tags,
        }
    }

    fn table_mut(&mut self, ns: Namespace) -> &mut HashMap<NameId, Symbol> {
        match ns {
            Namespace::Ordinary => &mut self.symbols,
            Namespace::Tag => &mut self.tags,
        }
    }
}

/// Stack of nested scopes; index 0 is file scope.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::default()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_file_scope(&self) -> bool {
        self.scopes.len() == 1
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
        debug!("ScopeStack: entered level {}", self.scopes.len() - 1);
    }

    /// Leave the innermost scope. The file scope is never left.
    pub fn pop_scope(&mut self) -> CompileResult<()> {
        if self.scopes.len() == 1 {
            return Err(CompileError::internal("attempted to leave file scope"));
        }
        self.scopes.pop();
        debug!("ScopeStack: left level {}", self.scopes.len());
        Ok(())
    }

    /// Bind `name` in the innermost scope. Re-declaring a name in the same
    /// scope is an error; shadowing an outer binding is not.
    pub fn declare(&mut self, ns: Namespace, name: NameId, symbol: Symbol, line: u32) -> CompileResult<()> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| CompileError::internal("no scope to declare into"))?;
        let table = scope.table_mut(ns);
        if table.contains_key(&name) {
            return Err(CompileError::source(line, format!("[{name}] already defined")));
        }
        table.insert(name, symbol);
        Ok(())
    }

    /// Replace an existing binding in the innermost scope.
    pub fn redeclare(&mut self, ns: Namespace, name: NameId, symbol: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.table_mut(ns).insert(name, symbol);
        }
    }

    pub fn find(&self, ns: Namespace, name: NameId) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| scope.table(ns).get(&name))
    }

    pub fn find_in_current(&self, ns: Namespace, name: NameId) -> Option<&Symbol> {
        self.scopes.last().and_then(|scope| scope.table(ns).get(&name))
    }

    /// Like [`ScopeStack::find`], but a missing name is a source error.
    pub fn lookup(&self, ns: Namespace, name: NameId, line: u32) -> CompileResult<&Symbol> {
        self.find(ns, name)
            .ok_or_else(|| CompileError::source(line, format!("[{name}] not defined")))
    }
}
