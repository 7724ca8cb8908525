//! Turns declaration specifiers and declarators into resolved types.
//!
//! Struct/union definitions are laid out here, enum constants are declared
//! here, and typedef names are expanded: the qualifiers of the use site are
//! merged into the aliased type and the declarator's own pointer and array
//! levels are applied outside the ones the typedef carries.

use std::rc::Rc;

use log::trace;

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};

use super::symbol_table::{FunctionSig, Namespace, Parameter, Symbol};
use super::types::{BaseType, CType, Derivation, RecordId};
use super::Semantic;

/// What a declarator declares.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    Object(CType),
    Function(Rc<FunctionSig>),
}

impl Semantic {
    /// Resolve a type specifier plus qualifiers to the base type of a
    /// declaration.
    pub fn resolve_specifier(
        &mut self,
        spec: &TypeSpecifier,
        qualifiers: TypeQualifiers,
        line: u32,
    ) -> CompileResult<CType> {
        let mut ty = match spec {
            TypeSpecifier::Basic(BasicType::Void) => CType::void(),
            TypeSpecifier::Basic(BasicType::Float | BasicType::Double) => {
                return Err(CompileError::source(line, "floating point types are not supported"));
            }
            TypeSpecifier::Basic(_) => CType::int(),
            TypeSpecifier::Record(record) => CType::new(BaseType::Record(self.resolve_record(record)?)),
            TypeSpecifier::Enum(enumeration) => {
                self.resolve_enum(enumeration)?;
                CType::int()
            }
            TypeSpecifier::TypedefName(name) => match self.scopes.lookup(Namespace::Ordinary, *name, line)? {
                Symbol::Typedef(aliased) => aliased.clone(),
                other => {
                    return Err(CompileError::source(
                        line,
                        format!("[{name}] is a {}, not a type", other.kind_name()),
                    ));
                }
            },
        };
        ty.qualifiers |= qualifiers;
        Ok(ty)
    }

    pub fn resolve_record(&mut self, spec: &RecordSpecifier) -> CompileResult<RecordId> {
        let line = spec.line;
        let Some(members) = &spec.members else {
            // reference by name; an unknown tag is declared incomplete here
            let Some(name) = spec.name else {
                return Err(CompileError::internal("record reference without a tag"));
            };
            return match self.scopes.find(Namespace::Tag, name) {
                Some(Symbol::Record(id)) => Ok(*id),
                Some(_) => Err(CompileError::source(line, format!("[{name}] is not struct"))),
                None => {
                    let id = self.registry.declare_record(spec.kind, Some(name));
                    self.scopes.declare(Namespace::Tag, name, Symbol::Record(id), line)?;
                    Ok(id)
                }
            };
        };

        let id = match spec.name {
            Some(name) => match self.scopes.find_in_current(Namespace::Tag, name) {
                Some(Symbol::Record(id)) if !self.registry.record(*id).complete => *id,
                Some(_) => return Err(CompileError::source(line, format!("[{name}] already defined"))),
                None => {
                    let id = self.registry.declare_record(spec.kind, Some(name));
                    self.scopes.declare(Namespace::Tag, name, Symbol::Record(id), line)?;
                    id
                }
            },
            None => self.registry.declare_record(spec.kind, None),
        };

        let mut laid_out = Vec::new();
        for member in members {
            let base = self.resolve_specifier(&member.type_spec, member.qualifiers, member.line)?;
            for declarator in &member.declarators {
                if declarator.bit_width.is_some() {
                    return Err(CompileError::source(member.line, "bitfields are not supported"));
                }
                let Some(declarator) = &declarator.declarator else {
                    continue;
                };
                match self.resolve_declarator(&base, declarator)? {
                    DeclaredType::Object(ty) => laid_out.push((declarator.name, ty)),
                    DeclaredType::Function(_) => {
                        return Err(CompileError::source(
                            declarator.line,
                            format!("member [{}] declared as a function", declarator.name),
                        ));
                    }
                }
            }
        }
        self.registry.complete_record(id, laid_out, line)?;
        Ok(id)
    }

    fn resolve_enum(&mut self, spec: &EnumSpecifier) -> CompileResult<()> {
        let Some(enumerators) = &spec.enumerators else {
            return match spec.name {
                Some(name) => match self.scopes.find(Namespace::Tag, name) {
                    Some(Symbol::EnumTag) | None => Ok(()),
                    Some(_) => Err(CompileError::source(spec.line, format!("[{name}] is not an enum"))),
                },
                None => Ok(()),
            };
        };

        if let Some(name) = spec.name {
            self.scopes.declare(Namespace::Tag, name, Symbol::EnumTag, spec.line)?;
        }
        let mut next = 0i64;
        for enumerator in enumerators {
            let value = match &enumerator.value {
                Some(expr) => self.fold_conditional(expr)?,
                None => next,
            };
            trace!("enum constant {} = {value}", enumerator.name);
            self.scopes.declare(
                Namespace::Ordinary,
                enumerator.name,
                Symbol::EnumConstant(value),
                enumerator.line,
            )?;
            next = value.wrapping_add(1);
        }
        Ok(())
    }

    /// Fold every array bound. An empty `[]` takes the extent `open_len`
    /// when one is known (parameters, sized by an initializer list).
    pub fn fold_dims(
        &mut self,
        dims: &[Option<ConditionalExpr>],
        open_len: Option<usize>,
        line: u32,
    ) -> CompileResult<Vec<usize>> {
        let mut folded = Vec::with_capacity(dims.len());
        for dim in dims {
            let Some(expr) = dim else {
                match open_len {
                    Some(len) => folded.push(len),
                    None => return Err(CompileError::source(line, "array size missing")),
                }
                continue;
            };
            let value = match self.fold_conditional(expr) {
                Ok(value) => value,
                Err(CompileError::Source { .. }) => {
                    return Err(CompileError::source(line, "array rank must be const"));
                }
                Err(internal) => return Err(internal),
            };
            if value <= 0 {
                return Err(CompileError::source(line, format!("array size {value} is not positive")));
            }
            folded.push(value as usize);
        }
        Ok(folded)
    }

    /// Apply declarator pointer levels and array bounds to `base`.
    fn apply_shape(
        &mut self,
        base: &CType,
        pointers: &[TypeQualifiers],
        dims: &[Option<ConditionalExpr>],
        open_len: Option<usize>,
        line: u32,
    ) -> CompileResult<CType> {
        let mut ty = base.clone();
        ty.derived.extend(pointers.iter().copied().map(Derivation::Pointer));
        let dims = self.fold_dims(dims, open_len, line)?;
        ty.derived.extend(dims.into_iter().rev().map(Derivation::Array));
        Ok(ty)
    }

    pub fn resolve_declarator(&mut self, base: &CType, declarator: &Declarator) -> CompileResult<DeclaredType> {
        self.resolve_declarator_sized(base, declarator, None)
    }

    /// Like [`Semantic::resolve_declarator`], with the extent used for an
    /// empty `[]` bound.
    pub fn resolve_declarator_sized(
        &mut self,
        base: &CType,
        declarator: &Declarator,
        open_len: Option<usize>,
    ) -> CompileResult<DeclaredType> {
        let line = declarator.line;
        match &declarator.suffix {
            DeclaratorSuffix::None => Ok(DeclaredType::Object(self.apply_shape(
                base,
                &declarator.pointers,
                &[],
                None,
                line,
            )?)),
            DeclaratorSuffix::Array(dims) => Ok(DeclaredType::Object(self.apply_shape(
                base,
                &declarator.pointers,
                dims,
                open_len,
                line,
            )?)),
            DeclaratorSuffix::Function(params) => {
                let ret = self.apply_shape(base, &declarator.pointers, &[], None, line)?;
                if ret.is_array() {
                    return Err(CompileError::source(line, "function returning an array"));
                }
                if ret.record().is_some() {
                    return Err(CompileError::source(line, "struct return values are not supported"));
                }
                let params = self.resolve_parameters(params)?;
                Ok(DeclaredType::Function(Rc::new(FunctionSig {
                    name: declarator.name,
                    ret,
                    params,
                    variadic: params_variadic(declarator),
                })))
            }
        }
    }

    fn resolve_parameters(&mut self, list: &ParameterList) -> CompileResult<Vec<Parameter>> {
        let mut params = Vec::with_capacity(list.params.len());
        for param in &list.params {
            let specifiers = &param.specifiers;
            let base = self.resolve_specifier(&specifiers.type_spec, specifiers.qualifiers, param.line)?;
            let (name, pointers, dims) = match &param.declarator {
                ParamDeclarator::Named(declarator) => match &declarator.suffix {
                    DeclaratorSuffix::None => (Some(declarator.name), declarator.pointers.clone(), Vec::new()),
                    DeclaratorSuffix::Array(dims) => (Some(declarator.name), declarator.pointers.clone(), dims.clone()),
                    DeclaratorSuffix::Function(_) => {
                        return Err(CompileError::source(param.line, "function parameters are not supported"));
                    }
                },
                ParamDeclarator::Abstract(abstract_declarator) => (
                    None,
                    abstract_declarator.pointers.clone(),
                    abstract_declarator.dims.clone(),
                ),
            };
            let ty = self.apply_shape(&base, &pointers, &dims, Some(1), param.line)?.decay();
            if ty.is_void() {
                return Err(CompileError::source(param.line, "parameter has void type"));
            }
            if ty.record().is_some() {
                return Err(CompileError::source(param.line, "struct parameters are not supported"));
            }
            params.push(Parameter { name, ty });
        }
        Ok(params)
    }

    pub fn resolve_type_name(&mut self, type_name: &TypeName) -> CompileResult<CType> {
        let base = self.resolve_specifier(&type_name.type_spec, type_name.qualifiers, type_name.line)?;
        self.apply_shape(
            &base,
            &type_name.declarator.pointers,
            &type_name.declarator.dims,
            None,
            type_name.line,
        )
    }
}

fn params_variadic(declarator: &Declarator) -> bool {
    matches!(&declarator.suffix, DeclaratorSuffix::Function(params) if params.variadic)
}
