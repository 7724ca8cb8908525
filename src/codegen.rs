//! Code generation module.
//!
//! Walks the syntax tree once and writes x86-64 MASM text for the Microsoft
//! x64 calling convention. Output goes to three streams that are joined at
//! the end: a header banner, the `.data` section and the `.code` section.
//!
//! Every scalar is one 8-byte slot. Locals and expression temporaries live
//! below `rbp`; the generator tracks the distance from `rbp` to `rsp` at
//! every point (see [`frame::FunctionFrame`]) so that `rsp` can always be
//! recomputed as `rbp - offset` and calls can be checked for 16-byte
//! alignment at compile time.

use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use log::{debug, trace};

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};
use crate::semantic::Semantic;

mod access;
mod calls;
mod declarations;
mod expressions;
pub mod frame;
mod statements;

use frame::FunctionFrame;

/// Argument registers of the Microsoft x64 calling convention.
pub(crate) const ARG_REGISTERS: [&str; 4] = ["rcx", "rdx", "r8", "r9"];

/// Where `break` and `continue` go from inside a loop or switch.
#[derive(Debug, Clone)]
struct JumpTarget {
    break_label: String,
    /// `None` for a switch.
    continue_label: Option<String>,
    /// Frame offset at loop entry.
    offset: i64,
}

/// Case labels of the innermost switch, in source order.
#[derive(Debug, Default)]
struct SwitchContext {
    case_labels: std::collections::VecDeque<String>,
    default_label: Option<String>,
}

/// Per-function external linkage bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Linkage {
    Declared,
    Defined,
}

pub struct CodeGen {
    name: String,
    timestamp: Option<String>,
    pub(crate) sema: Semantic,
    head: String,
    data: String,
    code: String,
    label_counter: u32,
    frame: Option<FunctionFrame>,
    jump_targets: Vec<JumpTarget>,
    switches: Vec<SwitchContext>,
    functions: IndexMap<NameId, Linkage>,
    /// `extern` objects, emitted unless defined later in the unit.
    extern_objects: IndexMap<NameId, bool>,
}

impl CodeGen {
    /// `name` is the output file stem used in the banner. Pass `None` as
    /// `timestamp` for reproducible output.
    pub fn new(name: &str, timestamp: Option<String>) -> Self {
        CodeGen {
            name: name.to_string(),
            timestamp,
            sema: Semantic::new(),
            head: String::new(),
            data: String::new(),
            code: String::new(),
            label_counter: 0,
            frame: None,
            jump_targets: Vec::new(),
            switches: Vec::new(),
            functions: IndexMap::new(),
            extern_objects: IndexMap::new(),
        }
    }

    /// Generate the whole assembly file for `unit`.
    pub fn generate(mut self, unit: &TranslationUnit) -> CompileResult<String> {
        self.emit_banner();
        for item in &unit.items {
            match item {
                ExternalDeclaration::Function(function) => self.gen_function(function)?,
                ExternalDeclaration::Declaration(declaration) => self.gen_declaration(declaration)?,
            }
        }
        Ok(self.finish())
    }

    fn emit_banner(&mut self) {
        let _ = writeln!(self.head, "; {}.asm", self.name);
        if let Some(timestamp) = &self.timestamp {
            let _ = writeln!(self.head, "; {timestamp}");
        }
        self.head.push('\n');

        self.data.push_str("    .data\n\n");
        self.data.push_str("right_32f qword 0ffffffffh\n");
    }

    fn finish(mut self) -> String {
        for (name, defined) in &self.extern_objects {
            if !defined {
                let _ = writeln!(self.data, "extern {name}:qword");
            }
        }
        for (name, linkage) in &self.functions {
            if *linkage == Linkage::Declared {
                let _ = writeln!(self.data, "extern {name}:proc");
            }
        }
        debug!(
            "codegen: {} functions, {} labels, {} bytes of code",
            self.functions.len(),
            self.label_counter,
            self.code.len()
        );

        let mut out = self.head;
        out.push_str(&self.data);
        out.push_str("\n    .code\n\n");
        out.push_str(&self.code);
        out.push_str("end\n");
        out
    }

    /// Allocate a fresh number for a group of related labels.
    pub(crate) fn next_label_id(&mut self) -> u32 {
        let id = self.label_counter;
        self.label_counter += 1;
        id
    }

    pub(crate) fn new_label(&mut self, prefix: &str) -> String {
        format!("{prefix}_{}", self.next_label_id())
    }

    /// One indented instruction in the code section.
    pub(crate) fn emit(&mut self, instruction: impl fmt::Display) {
        trace!("emit: {instruction}");
        let _ = writeln!(self.code, "    {instruction}");
    }

    pub(crate) fn emit_label(&mut self, label: &str) {
        let _ = writeln!(self.code, "{label}:");
    }

    /// A line in the data section.
    pub(crate) fn emit_data(&mut self, line: impl fmt::Display) {
        let _ = writeln!(self.data, "{line}");
    }

    pub(crate) fn frame(&self) -> CompileResult<&FunctionFrame> {
        self.frame
            .as_ref()
            .ok_or_else(|| CompileError::internal("no function frame outside a function body"))
    }

    pub(crate) fn frame_mut(&mut self) -> CompileResult<&mut FunctionFrame> {
        self.frame
            .as_mut()
            .ok_or_else(|| CompileError::internal("no function frame outside a function body"))
    }

    /// Reserve `bytes` below the current stack top.
    pub(crate) fn stack_alloc(&mut self, bytes: i64) -> CompileResult<i64> {
        if bytes > 0 {
            self.emit(format_args!("sub rsp, {bytes}"));
        }
        Ok(self.frame_mut()?.alloc(bytes))
    }

    /// Release everything allocated after `mark`.
    pub(crate) fn stack_release_to(&mut self, mark: i64) -> CompileResult<()> {
        let extra = self.frame()?.offset() - mark;
        if extra > 0 {
            self.emit(format_args!("add rsp, {extra}"));
            self.frame_mut()?.release(extra)?;
        }
        Ok(())
    }

    /// Recompute `rsp` from the tracked offset. Used at join points that
    /// can be reached with a different stack depth.
    pub(crate) fn sync_stack(&mut self) -> CompileResult<()> {
        let offset = self.frame()?.offset();
        self.emit(format_args!("lea rsp, [rbp - {offset}]"));
        Ok(())
    }

    pub(crate) fn push_reg(&mut self, reg: &str) -> CompileResult<()> {
        self.emit(format_args!("push {reg}"));
        self.frame_mut()?.alloc(8);
        Ok(())
    }

    pub(crate) fn pop_reg(&mut self, reg: &str) -> CompileResult<()> {
        self.emit(format_args!("pop {reg}"));
        self.frame_mut()?.release(8)
    }

    /// Data label holding a NUL-terminated copy of `bytes`.
    pub(crate) fn intern_string(&mut self, bytes: &[u8]) -> String {
        let label = self.new_label("string");
        let line = format!("{label} byte {}", masm_bytes(bytes));
        self.emit_data(line);
        label
    }
}

/// MASM byte list for a string: printable runs quoted, everything else
/// numeric, always ending in a 0 byte.
pub(crate) fn masm_bytes(bytes: &[u8]) -> String {
    let mut parts = Vec::new();
    let mut run = String::new();
    for &byte in bytes {
        if (0x20..0x7f).contains(&byte) && byte != b'"' {
            run.push(byte as char);
        } else {
            if !run.is_empty() {
                parts.push(format!("\"{}\"", std::mem::take(&mut run)));
            }
            parts.push(byte.to_string());
        }
    }
    if !run.is_empty() {
        parts.push(format!("\"{run}\""));
    }
    parts.push("0".to_string());
    parts.join(", ")
}
