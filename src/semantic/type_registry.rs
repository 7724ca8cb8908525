//! Type Registry
//!
//! Arena of struct/union layouts. Tags in scope refer to a layout by
//! [`RecordId`]; a tag can be declared before its body is seen (for
//! self-referential structs) and completed later.
//!
//! Invariants:
//! - layouts are never removed
//! - member offsets increase strictly in declaration order
//! - a complete record's size is the sum of its member sizes

use indexmap::IndexMap;
use log::debug;

use crate::ast::{NameId, RecordKind};
use crate::diagnostic::{CompileError, CompileResult};

use super::types::{BaseType, CType, RecordId, WORD_SIZE};

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: NameId,
    pub ty: CType,
    pub offset: usize,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct RecordLayout {
    pub kind: RecordKind,
    /// Tag name, `None` for anonymous records.
    pub name: Option<NameId>,
    pub members: IndexMap<NameId, Member>,
    pub size: usize,
    pub complete: bool,
}

impl RecordLayout {
    pub fn display_name(&self) -> String {
        let keyword = match self.kind {
            RecordKind::Struct => "struct",
            RecordKind::Union => "union",
        };
        match self.name {
            Some(name) => format!("{keyword} {name}"),
            None => format!("{keyword} <anonymous>"),
        }
    }
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: Vec<RecordLayout>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an incomplete record.
    pub fn declare_record(&mut self, kind: RecordKind, name: Option<NameId>) -> RecordId {
        let id = RecordId(self.records.len() as u32);
        self.records.push(RecordLayout {
            kind,
            name,
            members: IndexMap::new(),
            size: 0,
            complete: false,
        });
        id
    }

    pub fn record(&self, id: RecordId) -> &RecordLayout {
        &self.records[id.index()]
    }

    /// Lay out `members` in declaration order and mark the record complete.
    pub fn complete_record(&mut self, id: RecordId, members: Vec<(NameId, CType)>, line: u32) -> CompileResult<()> {
        if self.record(id).complete {
            return Err(CompileError::source(
                line,
                format!("[{}] already defined", self.record(id).display_name()),
            ));
        }

        let mut laid_out = IndexMap::new();
        let mut offset = 0;
        for (name, ty) in members {
            if ty.record() == Some(id) {
                return Err(CompileError::source(line, format!("[{name}] has incomplete type")));
            }
            let size = self.size_of(&ty, line)?;
            if laid_out.contains_key(&name) {
                return Err(CompileError::source(line, format!("[{name}] already defined")));
            }
            laid_out.insert(name, Member { name, ty, offset, size });
            offset += size;
        }

        let record = &mut self.records[id.index()];
        debug!("{} laid out: {} members, {} bytes", record.display_name(), laid_out.len(), offset);
        record.members = laid_out;
        record.size = offset;
        record.complete = true;
        Ok(())
    }

    /// Size of one element of `ty`, ignoring array dimensions.
    pub fn element_size(&self, ty: &CType, line: u32) -> CompileResult<usize> {
        if ty.element().is_pointer() {
            return Ok(WORD_SIZE);
        }
        match ty.base {
            BaseType::Int => Ok(WORD_SIZE),
            BaseType::Void => Err(CompileError::source(line, "void has no size")),
            BaseType::Record(id) => {
                let record = self.record(id);
                if !record.complete {
                    let name = record.name.map(|n| n.to_string()).unwrap_or_else(|| record.display_name());
                    return Err(CompileError::source(line, format!("[{name}] not defined")));
                }
                Ok(record.size)
            }
        }
    }

    /// Total size in bytes, including every array dimension.
    pub fn size_of(&self, ty: &CType, line: u32) -> CompileResult<usize> {
        Ok(self.element_size(ty, line)? * ty.element_count())
    }

    /// Size of what a pointer of type `ty` points at, used to scale
    /// pointer arithmetic. `void *` steps by one byte.
    pub fn pointee_size(&self, ty: &CType, line: u32) -> CompileResult<usize> {
        match ty.deref() {
            Some(pointee) if pointee.is_void() => Ok(1),
            Some(pointee) => self.size_of(&pointee, line),
            None => Err(CompileError::internal(format!("pointee size of non-pointer {ty}"))),
        }
    }

    pub fn member(&self, id: RecordId, name: NameId, line: u32) -> CompileResult<&Member> {
        let record = self.record(id);
        if !record.complete {
            return Err(CompileError::source(
                line,
                format!("[{}] not defined", record.display_name()),
            ));
        }
        record.members.get(&name).ok_or_else(|| {
            CompileError::source(
                line,
                format!("[{name}] is not a member of [{}]", record.display_name()),
            )
        })
    }

    /// Human-readable type name for diagnostics.
    pub fn describe(&self, ty: &CType) -> String {
        let mut text = match ty.base {
            BaseType::Void => "void".to_string(),
            BaseType::Int => "int".to_string(),
            BaseType::Record(id) => self.record(id).display_name(),
        };
        text.push_str(&ty.shape());
        text
    }
}
