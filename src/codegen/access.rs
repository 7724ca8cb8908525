//! Reading, addressing and storing operands.
//!
//! An lvalue either *is* its variable's storage (`Place::Var`) or is
//! reached through a runtime address kept in a frame temporary
//! (`Place::Address`). Loads, address-of and stores branch on that so an
//! object is never dereferenced twice.

use crate::ast::NameId;
use crate::diagnostic::{CompileError, CompileResult};
use crate::semantic::{CType, Storage};

use super::CodeGen;
use super::frame::{Operand, Place, frame_slot, storage_operand};

impl CodeGen {
    /// Reserve one 8-byte frame temporary.
    pub(crate) fn alloc_temp(&mut self) -> CompileResult<i64> {
        self.stack_alloc(8)
    }

    /// Put the value of `operand` in `reg`. Arrays and structs load as
    /// their address.
    pub(crate) fn load(&mut self, operand: &Operand, reg: &str) -> CompileResult<()> {
        match &operand.place {
            Place::Const(value) => self.emit(format_args!("mov {reg}, {value}")),
            Place::Slot(offset) => self.emit(format_args!("mov {reg}, {}", frame_slot(*offset))),
            Place::Address(offset) => {
                self.emit(format_args!("mov {reg}, {}", frame_slot(*offset)));
                if !operand.is_aggregate() {
                    self.emit(format_args!("mov {reg}, [{reg}]"));
                }
            }
            Place::Var(storage) => {
                let mem = storage_operand(storage);
                if operand.is_aggregate() {
                    self.emit(format_args!("lea {reg}, {mem}"));
                } else {
                    self.emit(format_args!("mov {reg}, {mem}"));
                }
            }
        }
        Ok(())
    }

    /// Put the address of the object `operand` designates in `reg`.
    pub(crate) fn load_address(&mut self, operand: &Operand, reg: &str, line: u32) -> CompileResult<()> {
        match &operand.place {
            Place::Address(offset) => self.emit(format_args!("mov {reg}, {}", frame_slot(*offset))),
            Place::Var(storage) => self.emit(format_args!("lea {reg}, {}", storage_operand(storage))),
            Place::Const(_) | Place::Slot(_) => {
                return Err(CompileError::source(line, "lvalue required"));
            }
        }
        Ok(())
    }

    /// Copy `reg` into a fresh temporary.
    pub(crate) fn store_temp(&mut self, reg: &str) -> CompileResult<i64> {
        let slot = self.alloc_temp()?;
        self.emit(format_args!("mov {}, {reg}", frame_slot(slot)));
        Ok(slot)
    }

    /// A temporary holding a pointer to `ty`'s object, already in `reg`.
    pub(crate) fn address_in(&mut self, reg: &str, ty: CType) -> CompileResult<Operand> {
        let slot = self.store_temp(reg)?;
        Ok(Operand::new(Place::Address(slot), ty))
    }

    /// The value of `operand` as a frame temporary or constant, so that
    /// evaluating further expressions cannot change it.
    pub(crate) fn spill(&mut self, operand: Operand) -> CompileResult<Operand> {
        match operand.place {
            Place::Const(_) | Place::Slot(_) => Ok(operand),
            Place::Address(_) if operand.ty.record().is_some() => Ok(operand),
            Place::Var(_) if operand.ty.record().is_some() => {
                self.load(&operand, "r10")?;
                self.address_in("r10", operand.ty)
            }
            _ => {
                self.load(&operand, "r10")?;
                let slot = self.store_temp("r10")?;
                Ok(Operand::new(Place::Slot(slot), operand.ty.decay()))
            }
        }
    }

    /// `target = value`, where the address of `target` is computed after
    /// the value is evaluated.
    pub(crate) fn store(&mut self, target: &Operand, value: &Operand, line: u32) -> CompileResult<()> {
        if target.ty.is_array() {
            return Err(CompileError::source(line, "array is not assignable"));
        }
        if let Some(id) = target.ty.record() {
            if value.ty.record() != Some(id) {
                return Err(CompileError::source(line, "incompatible struct assignment"));
            }
            let size = self.sema.registry.size_of(&target.ty, line)?;
            self.load_address(value, "r10", line)?;
            self.load_address(target, "r11", line)?;
            for word in (0..size).step_by(8) {
                self.emit(format_args!("mov rax, [r10 + {word}]"));
                self.emit(format_args!("mov [r11 + {word}], rax"));
            }
            return Ok(());
        }
        if value.ty.record().is_some() {
            return Err(CompileError::source(line, "cannot assign a struct to a scalar"));
        }
        self.load_address(target, "r11", line)?;
        self.load(value, "rax")?;
        self.emit("mov [r11], rax");
        Ok(())
    }

    /// Apply `[index]` to `base`.
    ///
    /// The index is scaled by the size of everything below the first
    /// dimension; once the last dimension is consumed the result is a plain
    /// lvalue of the element type.
    pub(crate) fn index(&mut self, base: Operand, index: Operand, line: u32) -> CompileResult<Operand> {
        let (stride, element) = if base.ty.is_array() {
            let element = base.ty.without_first_dim();
            (self.sema.registry.size_of(&element, line)?, element)
        } else if let Some(pointee) = base.ty.deref() {
            (self.sema.registry.pointee_size(&base.ty, line)?, pointee)
        } else {
            return Err(CompileError::source(
                line,
                format!("[{}] is not an array or pointer", self.sema.registry.describe(&base.ty)),
            ));
        };
        if !index.ty.decay().is_integer() {
            return Err(CompileError::source(line, "array subscript is not an integer"));
        }

        self.load(&base, "r10")?;
        if let Place::Const(value) = index.place {
            let delta = value.wrapping_mul(stride as i64);
            if delta != 0 {
                self.emit(format_args!("add r10, {delta}"));
            }
        } else {
            self.load(&index, "r11")?;
            self.emit(format_args!("imul r11, {stride}"));
            self.emit("add r10, r11");
        }
        self.address_in("r10", element)
    }

    /// Member `name` of the struct object `base`.
    pub(crate) fn member(&mut self, base: Operand, name: NameId, line: u32) -> CompileResult<Operand> {
        let Some(id) = base.ty.record() else {
            return Err(CompileError::source(
                line,
                format!(
                    "[{name}] requested from [{}], which is not a struct",
                    self.sema.registry.describe(&base.ty)
                ),
            ));
        };
        let member = self.sema.registry.member(id, name, line)?.clone();
        match base.place {
            // frame objects are addressed statically
            Place::Var(Storage::Frame(offset)) => Ok(Operand::new(
                Place::Var(Storage::Frame(offset - member.offset as i64)),
                member.ty,
            )),
            _ => {
                self.load_address(&base, "r10", line)?;
                if member.offset != 0 {
                    self.emit(format_args!("add r10, {}", member.offset));
                }
                self.address_in("r10", member.ty)
            }
        }
    }

    /// Member `name` of the struct `pointer` points at.
    pub(crate) fn arrow(&mut self, pointer: Operand, name: NameId, line: u32) -> CompileResult<Operand> {
        let Some(pointee) = pointer.ty.decay().deref() else {
            return Err(CompileError::source(line, format!("[->{name}] applied to a non-pointer")));
        };
        self.load(&pointer, "r10")?;
        let object = self.address_in("r10", pointee)?;
        self.member(object, name, line)
    }
}
