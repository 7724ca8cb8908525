//! Functions, global objects and local declarations.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};
use crate::semantic::{CType, DeclaredType, FunctionSig, Namespace, Storage, Symbol, WORD_SIZE};

use super::frame::{FunctionFrame, Operand, Place, frame_slot};
use super::{ARG_REGISTERS, CodeGen, Linkage};

/// One qword of a global's initial data.
#[derive(Debug, Clone, PartialEq)]
enum DataWord {
    Value(i64),
    /// Address of another data label.
    Label(String),
}

impl fmt::Display for DataWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataWord::Value(value) => write!(f, "{value}"),
            DataWord::Label(label) => write!(f, "{label}"),
        }
    }
}

/// A scalar position inside an object and what initializes it.
#[derive(Debug)]
enum InitLeaf<'a> {
    Expr(&'a AssignmentExpr),
    /// One character of a string literal stored into an array.
    Byte(u8),
}

/// Extent an empty `[]` takes from its initializer.
fn initializer_extent(init: &Initializer) -> Option<usize> {
    match init {
        Initializer::List(items, _) => Some(items.len().max(1)),
        Initializer::Expr(expr) => expr.as_string_literal().map(|bytes| bytes.len() + 1),
    }
}

fn object_symbol(ty: CType, storage: Storage, initial: Option<i64>) -> Symbol {
    if ty.is_array() {
        Symbol::Array { ty, storage }
    } else {
        Symbol::Variable { ty, storage, initial }
    }
}

impl CodeGen {
    pub(crate) fn gen_function(&mut self, function: &FunctionDefinition) -> CompileResult<()> {
        let specifiers = &function.specifiers;
        if specifiers.storage == Some(StorageClass::Typedef) {
            return Err(CompileError::source(function.line, "function definition declared typedef"));
        }
        let base = self
            .sema
            .resolve_specifier(&specifiers.type_spec, specifiers.qualifiers, specifiers.line)?;
        let DeclaredType::Function(sig) = self.sema.resolve_declarator(&base, &function.declarator)? else {
            return Err(CompileError::internal("function definition without a function declarator"));
        };
        self.declare_function(Rc::clone(&sig), true, function.line)?;

        let name = sig.name.to_string();
        debug!("codegen: function {name} ({} params)", sig.params.len());
        self.frame = Some(FunctionFrame::new(&name, sig.ret.clone()));
        self.code.push_str(&format!("{name} proc\n"));
        self.emit("push rbp");
        self.emit("mov rbp, rsp");

        self.sema.scopes.push_scope();
        for (i, param) in sig.params.iter().enumerate() {
            let Some(param_name) = param.name else {
                return Err(CompileError::source(
                    function.line,
                    format!("parameter {} of [{name}] has no name", i + 1),
                ));
            };
            // the caller's argument slots sit above the return address
            let offset = -(16 + 8 * i as i64);
            if let Some(reg) = ARG_REGISTERS.get(i) {
                self.emit(format_args!("mov {}, {reg}", frame_slot(offset)));
            }
            self.sema.scopes.declare(
                Namespace::Ordinary,
                param_name,
                object_symbol(param.ty.clone(), Storage::Frame(offset), None),
                function.line,
            )?;
        }
        for item in &function.body.items {
            self.gen_block_item(item)?;
        }
        self.sema.scopes.pop_scope()?;

        self.emit("xor rax, rax");
        self.emit("leave");
        self.emit("ret 0");
        self.code.push_str(&format!("{name} endp\n\n"));
        self.frame = None;
        self.jump_targets.clear();
        Ok(())
    }

    /// Bind a function name in the current scope. A prototype may be
    /// repeated and later defined, but the arity must agree.
    fn declare_function(&mut self, sig: Rc<FunctionSig>, defining: bool, line: u32) -> CompileResult<()> {
        let name = sig.name;
        match self.sema.scopes.find_in_current(Namespace::Ordinary, name) {
            Some(Symbol::Function(previous)) => {
                if previous.params.len() != sig.params.len() || previous.variadic != sig.variadic {
                    return Err(CompileError::source(line, format!("conflicting types for [{name}]")));
                }
                if defining && self.functions.get(&name) == Some(&Linkage::Defined) {
                    return Err(CompileError::source(line, format!("[{name}] already defined")));
                }
                self.sema
                    .scopes
                    .redeclare(Namespace::Ordinary, name, Symbol::Function(sig));
            }
            Some(_) => return Err(CompileError::source(line, format!("[{name}] already defined"))),
            None => self
                .sema
                .scopes
                .declare(Namespace::Ordinary, name, Symbol::Function(sig), line)?,
        }
        let linkage = self.functions.entry(name).or_insert(Linkage::Declared);
        if defining {
            *linkage = Linkage::Defined;
        }
        Ok(())
    }

    /// Any declaration, at file or block scope.
    pub(crate) fn gen_declaration(&mut self, declaration: &Declaration) -> CompileResult<()> {
        let specifiers = &declaration.specifiers;
        let base = self
            .sema
            .resolve_specifier(&specifiers.type_spec, specifiers.qualifiers, specifiers.line)?;
        for init_declarator in &declaration.declarators {
            self.gen_init_declarator(specifiers.storage, &base, init_declarator)?;
        }
        Ok(())
    }

    fn gen_init_declarator(
        &mut self,
        storage: Option<StorageClass>,
        base: &CType,
        init_declarator: &InitDeclarator,
    ) -> CompileResult<()> {
        let declarator = &init_declarator.declarator;
        let init = init_declarator.init.as_ref();
        let (name, line) = (declarator.name, declarator.line);
        let declared = self
            .sema
            .resolve_declarator_sized(base, declarator, init.and_then(initializer_extent))?;

        let ty = match declared {
            DeclaredType::Function(sig) => {
                if storage == Some(StorageClass::Typedef) {
                    return Err(CompileError::source(line, "function typedefs are not supported"));
                }
                if init.is_some() {
                    return Err(CompileError::source(line, format!("function [{name}] is initialized")));
                }
                return self.declare_function(sig, false, line);
            }
            DeclaredType::Object(ty) => ty,
        };

        if storage == Some(StorageClass::Typedef) {
            if init.is_some() {
                return Err(CompileError::source(line, format!("typedef [{name}] is initialized")));
            }
            return self
                .sema
                .scopes
                .declare(Namespace::Ordinary, name, Symbol::Typedef(ty), line);
        }
        if ty.is_void() {
            return Err(CompileError::source(line, format!("variable [{name}] has void type")));
        }
        let size = self.sema.registry.size_of(&ty, line)?;
        let file_scope = self.sema.scopes.is_file_scope();

        match storage {
            Some(StorageClass::Extern) => {
                if init.is_some() {
                    return Err(CompileError::source(line, format!("extern [{name}] is initialized")));
                }
                let symbol = object_symbol(ty, Storage::Global(name.to_string()), None);
                let known = self.sema.scopes.find_in_current(Namespace::Ordinary, name);
                if file_scope && matches!(known, Some(Symbol::Variable { .. } | Symbol::Array { .. })) {
                    return Ok(());
                }
                self.sema.scopes.declare(Namespace::Ordinary, name, symbol, line)?;
                self.extern_objects.entry(name).or_insert(false);
                Ok(())
            }
            _ if file_scope => {
                let label = name.to_string();
                let initial = self.emit_global_object(&label, &ty, size, init, line)?;
                let symbol = object_symbol(ty, Storage::Global(label), initial);
                match self.extern_objects.get_mut(&name) {
                    Some(defined) if !*defined => {
                        *defined = true;
                        self.sema.scopes.redeclare(Namespace::Ordinary, name, symbol);
                        Ok(())
                    }
                    _ => self.sema.scopes.declare(Namespace::Ordinary, name, symbol, line),
                }
            }
            Some(StorageClass::Static) => {
                let label = format!("{name}_static_{}", self.next_label_id());
                self.emit_global_object(&label, &ty, size, init, line)?;
                let symbol = object_symbol(ty, Storage::Global(label), None);
                self.sema.scopes.declare(Namespace::Ordinary, name, symbol, line)
            }
            _ => self.gen_local_object(name, ty, size, init, line),
        }
    }

    /// Write a data-section definition for a global or static object.
    /// Returns the folded value of a scalar's initializer.
    fn emit_global_object(
        &mut self,
        label: &str,
        ty: &CType,
        size: usize,
        init: Option<&Initializer>,
        line: u32,
    ) -> CompileResult<Option<i64>> {
        let Some(init) = init else {
            if ty.is_scalar() {
                self.emit_data(format_args!("{label} qword 0"));
                return Ok(Some(0));
            }
            self.emit_data(format_args!("{label} byte {size} dup (0)"));
            return Ok(None);
        };

        let mut leaves = Vec::new();
        self.initializer_leaves(ty, init, 0, line, &mut leaves)?;
        let mut words = vec![DataWord::Value(0); size / WORD_SIZE];
        for (offset, leaf_ty, leaf) in leaves {
            let word = match leaf {
                InitLeaf::Byte(byte) => DataWord::Value(byte as i64),
                InitLeaf::Expr(expr) => {
                    if leaf_ty.record().is_some() {
                        return Err(CompileError::source(line, "initializer element is not constant"));
                    }
                    match expr.as_string_literal() {
                        Some(bytes) if leaf_ty.is_pointer() => DataWord::Label(self.intern_string(bytes)),
                        _ => DataWord::Value(self.sema.fold_assignment(expr)?),
                    }
                }
            };
            if let Some(slot) = words.get_mut(offset / WORD_SIZE) {
                *slot = word;
            }
        }

        if ty.is_scalar() {
            let word = words.first().cloned().unwrap_or(DataWord::Value(0));
            self.emit_data(format_args!("{label} qword {word}"));
            return Ok(match word {
                DataWord::Value(value) => Some(value),
                DataWord::Label(_) => None,
            });
        }

        let used = words
            .iter()
            .rposition(|word| *word != DataWord::Value(0))
            .map_or(0, |last| last + 1);
        let rest = words.len() - used;
        if used == 0 {
            self.emit_data(format_args!("{label} qword {rest} dup (0)"));
        } else {
            let list = words[..used].iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            self.emit_data(format_args!("{label} qword {list}"));
            if rest > 0 {
                self.emit_data(format_args!("    qword {rest} dup (0)"));
            }
        }
        Ok(None)
    }

    /// Flatten `init` for an object of type `ty` placed at `offset` into
    /// scalar positions. Positions not mentioned stay zero.
    fn initializer_leaves<'a>(
        &self,
        ty: &CType,
        init: &'a Initializer,
        offset: usize,
        line: u32,
        out: &mut Vec<(usize, CType, InitLeaf<'a>)>,
    ) -> CompileResult<()> {
        let registry = &self.sema.registry;
        if let Some(extent) = ty.array_len() {
            let element = ty.without_first_dim();
            match init {
                Initializer::List(items, list_line) => {
                    if items.len() > extent {
                        return Err(CompileError::source(*list_line, "excess elements in array initializer"));
                    }
                    let stride = registry.size_of(&element, line)?;
                    for (i, item) in items.iter().enumerate() {
                        if !item.designators.is_empty() {
                            return Err(CompileError::source(*list_line, "designated initializers are not supported"));
                        }
                        self.initializer_leaves(&element, &item.init, offset + i * stride, line, out)?;
                    }
                    Ok(())
                }
                Initializer::Expr(expr) => match expr.as_string_literal() {
                    Some(bytes) if element.is_integer() => {
                        if bytes.len() > extent {
                            return Err(CompileError::source(line, "initializer string is too long"));
                        }
                        for (i, byte) in bytes.iter().enumerate() {
                            out.push((offset + i * WORD_SIZE, element.clone(), InitLeaf::Byte(*byte)));
                        }
                        Ok(())
                    }
                    _ => Err(CompileError::source(line, "array initializer must be a brace list")),
                },
            }
        } else if let Some(id) = ty.record() {
            match init {
                Initializer::List(items, list_line) => {
                    let members = registry.record(id).members.values().cloned().collect::<Vec<_>>();
                    if items.len() > members.len() {
                        return Err(CompileError::source(*list_line, "excess elements in struct initializer"));
                    }
                    for (member, item) in members.iter().zip(items) {
                        if !item.designators.is_empty() {
                            return Err(CompileError::source(*list_line, "designated initializers are not supported"));
                        }
                        self.initializer_leaves(&member.ty, &item.init, offset + member.offset, line, out)?;
                    }
                    Ok(())
                }
                Initializer::Expr(expr) => {
                    out.push((offset, ty.clone(), InitLeaf::Expr(expr)));
                    Ok(())
                }
            }
        } else {
            match init {
                Initializer::List(items, list_line) => match items.as_slice() {
                    [] => Ok(()),
                    [item] if item.designators.is_empty() => {
                        self.initializer_leaves(ty, &item.init, offset, line, out)
                    }
                    [_] => Err(CompileError::source(*list_line, "designated initializers are not supported")),
                    _ => Err(CompileError::source(*list_line, "excess elements in scalar initializer")),
                },
                Initializer::Expr(expr) => {
                    out.push((offset, ty.clone(), InitLeaf::Expr(expr)));
                    Ok(())
                }
            }
        }
    }

    /// Reserve frame space for a local and run its initializer.
    fn gen_local_object(
        &mut self,
        name: NameId,
        ty: CType,
        size: usize,
        init: Option<&Initializer>,
        line: u32,
    ) -> CompileResult<()> {
        let bytes = size as i64;
        let offset = self.stack_alloc(bytes)?;
        let storage = Storage::Frame(offset);
        self.sema.scopes.declare(
            Namespace::Ordinary,
            name,
            object_symbol(ty.clone(), storage.clone(), None),
            line,
        )?;
        debug!("local {name}: {} bytes at {}", size, frame_slot(offset));

        let Some(init) = init else {
            return Ok(());
        };
        let mark = self.frame()?.offset();
        match init {
            Initializer::Expr(expr) if !ty.is_array() => {
                let value = self.gen_assignment(expr)?;
                let value = self.spill(value)?;
                self.store(&Operand::new(Place::Var(storage), ty), &value, line)?;
            }
            _ => {
                let mut leaves = Vec::new();
                self.initializer_leaves(&ty, init, 0, line, &mut leaves)?;
                self.zero_fill(offset, size / WORD_SIZE)?;
                for (leaf_offset, leaf_ty, leaf) in leaves {
                    let value = match leaf {
                        InitLeaf::Expr(expr) => {
                            let value = self.gen_assignment(expr)?;
                            self.spill(value)?
                        }
                        InitLeaf::Byte(byte) => Operand::constant(byte as i64),
                    };
                    let target = Operand::new(Place::Var(Storage::Frame(offset - leaf_offset as i64)), leaf_ty);
                    self.store(&target, &value, line)?;
                }
            }
        }
        self.stack_release_to(mark)
    }

    /// Clear `words` qwords starting at `[rbp - offset]`.
    fn zero_fill(&mut self, offset: i64, words: usize) -> CompileResult<()> {
        if words <= 8 {
            for word in 0..words as i64 {
                self.emit(format_args!("mov qword ptr {}, 0", frame_slot(offset - 8 * word)));
            }
            return Ok(());
        }
        let label = self.new_label("zero_fill");
        self.emit(format_args!("lea r10, {}", frame_slot(offset)));
        self.emit(format_args!("mov r11, {words}"));
        self.emit_label(&label);
        self.emit("mov qword ptr [r10], 0");
        self.emit("add r10, 8");
        self.emit("dec r11");
        self.emit(format_args!("jnz {label}"));
        Ok(())
    }
}
