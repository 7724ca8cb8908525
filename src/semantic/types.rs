//! Resolved C types.
//!
//! Every scalar (and every pointer) occupies one 8-byte slot. A type is a
//! base plus the pointer and array levels applied to it, in order.

use std::fmt;

use crate::ast::TypeQualifiers;

/// Size of every scalar and pointer.
pub const WORD_SIZE: usize = 8;

/// Index of a struct or union layout in the
/// [`TypeRegistry`](super::type_registry::TypeRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub(crate) u32);

impl RecordId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Void,
    Int,
    Record(RecordId),
}

/// One pointer or array level applied to a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Pointer(TypeQualifiers),
    Array(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType {
    pub base: BaseType,
    /// Qualifiers on the base type.
    pub qualifiers: TypeQualifiers,
    /// Levels applied to the base, innermost first. The last entry is the
    /// outermost level: `int *a[3]` is `[Pointer, Array(3)]` while a
    /// pointer to `int[3]` is `[Array(3), Pointer]`.
    pub derived: Vec<Derivation>,
}

impl CType {
    pub fn new(base: BaseType) -> Self {
        CType {
            base,
            qualifiers: TypeQualifiers::empty(),
            derived: Vec::new(),
        }
    }

    pub fn int() -> Self {
        CType::new(BaseType::Int)
    }

    pub fn void() -> Self {
        CType::new(BaseType::Void)
    }

    fn outer(&self) -> Option<Derivation> {
        self.derived.last().copied()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.outer(), Some(Derivation::Array(_)))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.outer(), Some(Derivation::Pointer(_)))
    }

    pub fn is_void(&self) -> bool {
        self.derived.is_empty() && self.base == BaseType::Void
    }

    /// A struct or union object (not a pointer to one, not an array).
    pub fn record(&self) -> Option<RecordId> {
        match self.base {
            BaseType::Record(id) if self.derived.is_empty() => Some(id),
            _ => None,
        }
    }

    /// Scalar integer (or enum) value.
    pub fn is_integer(&self) -> bool {
        self.derived.is_empty() && self.base == BaseType::Int
    }

    /// Scalars are everything that fits one slot: integers and pointers.
    pub fn is_scalar(&self) -> bool {
        self.is_pointer() || self.is_integer()
    }

    /// Whether storing through this type is forbidden.
    pub fn is_const(&self) -> bool {
        match self.outer() {
            Some(Derivation::Pointer(level)) => level.contains(TypeQualifiers::CONST),
            Some(Derivation::Array(_)) => self.without_first_dim().is_const(),
            None => self.qualifiers.contains(TypeQualifiers::CONST),
        }
    }

    pub fn pointer_to(&self) -> CType {
        let mut ty = self.clone();
        ty.derived.push(Derivation::Pointer(TypeQualifiers::empty()));
        ty
    }

    /// The pointee of a pointer type.
    pub fn deref(&self) -> Option<CType> {
        if !self.is_pointer() {
            return None;
        }
        let mut ty = self.clone();
        ty.derived.pop();
        Some(ty)
    }

    /// Array element type with every dimension removed.
    pub fn element(&self) -> CType {
        let mut ty = self.clone();
        while ty.is_array() {
            ty.derived.pop();
        }
        ty
    }

    /// The type left after applying one `[index]`.
    pub fn without_first_dim(&self) -> CType {
        let mut ty = self.clone();
        if ty.is_array() {
            ty.derived.pop();
        }
        ty
    }

    /// Extent of the outermost dimension.
    pub fn array_len(&self) -> Option<usize> {
        match self.outer() {
            Some(Derivation::Array(len)) => Some(len),
            _ => None,
        }
    }

    /// Array extents, outermost first. Empty for non-arrays.
    pub fn dims(&self) -> Vec<usize> {
        self.derived
            .iter()
            .rev()
            .map_while(|level| match level {
                Derivation::Array(len) => Some(*len),
                Derivation::Pointer(_) => None,
            })
            .collect()
    }

    /// Array-to-pointer decay: an array of `T` becomes a pointer to `T`,
    /// keeping the inner dimensions. Other types are returned unchanged.
    pub fn decay(&self) -> CType {
        if self.is_array() {
            self.without_first_dim().pointer_to()
        } else {
            self.clone()
        }
    }

    /// Number of elements across all dimensions.
    pub fn element_count(&self) -> usize {
        self.dims().iter().product()
    }

    /// Abstract declarator following the base type name: `*`, `[3][4]`,
    /// `(*)[4]`.
    pub fn shape(&self) -> String {
        let mut text = String::new();
        for level in self.derived.iter().rev() {
            match level {
                Derivation::Pointer(_) => text.insert(0, '*'),
                Derivation::Array(len) => {
                    if text.starts_with('*') {
                        text = format!("({text})");
                    }
                    text.push_str(&format!("[{len}]"));
                }
            }
        }
        text
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base {
            BaseType::Void => write!(f, "void")?,
            BaseType::Int => write!(f, "int")?,
            BaseType::Record(id) => write!(f, "record#{}", id.0)?,
        }
        write!(f, "{}", self.shape())
    }
}
