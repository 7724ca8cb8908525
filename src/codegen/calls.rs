//! Function calls under the Microsoft x64 convention.
//!
//! Arguments are evaluated left to right into temporaries first. Then the
//! caller saves `r15`, loads it with the argument count, pads the stack if
//! needed and reserves one slot per argument (at least four, the shadow
//! space). Argument `i` is stored at `[rsp + 8*i]`; the first four are also
//! loaded into `rcx`, `rdx`, `r8` and `r9`.

use log::debug;

use crate::ast::AssignmentExpr;
use crate::diagnostic::{CompileError, CompileResult};
use crate::semantic::FunctionSig;

use super::frame::{Operand, Place, frame_slot};
use super::{ARG_REGISTERS, CodeGen};

/// Minimum number of argument slots reserved for every call.
const SHADOW_SLOTS: usize = 4;

impl CodeGen {
    pub(crate) fn gen_call(&mut self, sig: &FunctionSig, args: &[AssignmentExpr], line: u32) -> CompileResult<Operand> {
        if !sig.accepts_arg_count(args.len()) {
            return Err(CompileError::source(line, format!("function args not match [{}]", sig.name)));
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.gen_assignment(arg)?;
            if value.ty.record().is_some() {
                return Err(CompileError::source(line, "struct arguments are not supported"));
            }
            if value.ty.is_void() {
                return Err(CompileError::source(line, "void value passed as an argument"));
            }
            values.push(value);
        }

        let result = self.alloc_temp()?;
        let slots = args.len().max(SHADOW_SLOTS) as i64;
        self.push_reg("r15")?;
        self.emit(format_args!("mov r15, {}", args.len()));
        let padding = if (self.frame()?.offset() + slots * 8) % 16 != 0 { 8 } else { 0 };
        self.stack_alloc(padding + slots * 8)?;
        let top = self.frame()?.offset();

        for (i, value) in values.iter().enumerate() {
            self.load(value, "r10")?;
            self.emit(format_args!("mov {}, r10", frame_slot(top - 8 * i as i64)));
        }
        for (i, reg) in ARG_REGISTERS.iter().enumerate().take(values.len()) {
            self.emit(format_args!("mov {reg}, {}", frame_slot(top - 8 * i as i64)));
        }

        if !self.frame()?.is_call_aligned() {
            return Err(CompileError::internal(format!(
                "stack misaligned before call to {} (offset {})",
                sig.name,
                self.frame()?.offset()
            )));
        }
        debug!(
            "call {}: {} args, {} slots, padding {padding}",
            sig.name,
            values.len(),
            slots
        );
        self.emit(format_args!("call {}", sig.name));
        self.emit(format_args!("mov {}, rax", frame_slot(result)));
        self.stack_release_to(top - padding - slots * 8)?;
        self.pop_reg("r15")?;

        Ok(Operand::new(Place::Slot(result), sig.ret.clone()))
    }
}
