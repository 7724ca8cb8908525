//! Stack frame bookkeeping and operand addressing.

use std::fmt;

use log::trace;

use crate::diagnostic::{CompileError, CompileResult};
use crate::semantic::{CType, Storage};

/// Distance from `rbp` down to `rsp` for the function being generated.
///
/// After the prologue `rsp == rbp` and the offset is 0. Every `sub rsp`,
/// `push`, `add rsp` and `pop` the generator emits goes through this
/// counter, so `rsp == rbp - offset` holds at every instruction boundary.
/// `rbp` itself is 16-byte aligned, which makes `offset % 16 == 0` the
/// alignment condition for a `call`.
#[derive(Debug, Clone)]
pub struct FunctionFrame {
    pub name: String,
    pub ret: CType,
    offset: i64,
}

impl FunctionFrame {
    pub fn new(name: &str, ret: CType) -> Self {
        FunctionFrame {
            name: name.to_string(),
            ret,
            offset: 0,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Grow the frame by `bytes`; returns the new offset, which addresses
    /// the lowest byte of the reserved block.
    pub fn alloc(&mut self, bytes: i64) -> i64 {
        self.offset += bytes;
        trace!("frame {}: +{bytes} -> {}", self.name, self.offset);
        self.offset
    }

    pub fn release(&mut self, bytes: i64) -> CompileResult<()> {
        if bytes > self.offset {
            return Err(CompileError::internal(format!(
                "frame {}: releasing {bytes} bytes with only {} reserved",
                self.name, self.offset
            )));
        }
        self.offset -= bytes;
        trace!("frame {}: -{bytes} -> {}", self.name, self.offset);
        Ok(())
    }

    pub fn is_call_aligned(&self) -> bool {
        self.offset % 16 == 0
    }
}

/// `[rbp - offset]`, or `[rbp + n]` for the caller-owned slots above the
/// return address.
pub fn frame_slot(offset: i64) -> String {
    if offset < 0 {
        format!("[rbp + {}]", -offset)
    } else {
        format!("[rbp - {offset}]")
    }
}

/// Memory operand naming a variable's storage.
pub fn storage_operand(storage: &Storage) -> String {
    match storage {
        Storage::Frame(offset) => frame_slot(*offset),
        Storage::Global(label) => label.clone(),
    }
}

/// Where an expression's result lives.
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    /// Compile-time integer.
    Const(i64),
    /// Frame temporary holding the value.
    Slot(i64),
    /// Frame temporary holding the runtime address of the object.
    Address(i64),
    /// The named variable's own storage.
    Var(Storage),
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Const(value) => write!(f, "{value}"),
            Place::Slot(offset) => write!(f, "value at {}", frame_slot(*offset)),
            Place::Address(offset) => write!(f, "object at address in {}", frame_slot(*offset)),
            Place::Var(storage) => write!(f, "{}", storage_operand(storage)),
        }
    }
}

/// A generated expression: its type plus where the result is.
#[derive(Debug, Clone)]
pub struct Operand {
    pub place: Place,
    pub ty: CType,
}

impl Operand {
    pub fn new(place: Place, ty: CType) -> Self {
        Operand { place, ty }
    }

    pub fn constant(value: i64) -> Self {
        Operand::new(Place::Const(value), CType::int())
    }

    /// Designates an object rather than a computed value.
    pub fn is_lvalue(&self) -> bool {
        matches!(self.place, Place::Address(_) | Place::Var(_))
    }

    /// Arrays and structs are handled through their address.
    pub fn is_aggregate(&self) -> bool {
        self.ty.is_array() || self.ty.record().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_above_return_address_use_plus() {
        assert_eq!(frame_slot(24), "[rbp - 24]");
        assert_eq!(frame_slot(-16), "[rbp + 16]");
        assert_eq!(storage_operand(&Storage::Global("g".into())), "g");
    }

    #[test]
    fn release_past_zero_is_internal_error() {
        let mut frame = FunctionFrame::new("f", CType::int());
        frame.alloc(8);
        assert!(frame.release(8).is_ok());
        let err = frame.release(8).unwrap_err();
        assert!(!err.is_source_error());
    }
}
