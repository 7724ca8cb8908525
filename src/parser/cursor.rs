//! Character-level scanner state for the backtracking parser.
//!
//! No tokens are materialized. Rules read characters straight from the
//! source through a [`Scanner`], saving a [`Cursor`] before an attempt and
//! restoring it when the attempt does not match. The cursor carries the
//! typedef-name scope as a persistent list, so restoring it also undoes any
//! typedef declared during the failed attempt.

use std::rc::Rc;

use log::trace;

use crate::ast::NameId;

/// A saved parse position. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Cursor {
    pos: usize,
    line: u32,
    typedefs: TypedefScope,
}

#[derive(Debug)]
enum TypedefEntry {
    /// Start of a block.
    Block,
    Typedef(NameId),
    /// An ordinary declaration hiding an outer typedef of the same name.
    Ordinary(NameId),
}

#[derive(Debug)]
struct TypedefLink {
    entry: TypedefEntry,
    next: TypedefScope,
}

/// Persistent stack of typedef names, innermost binding first.
#[derive(Debug, Clone, Default)]
pub struct TypedefScope(Option<Rc<TypedefLink>>);

impl TypedefScope {
    fn push(&self, entry: TypedefEntry) -> Self {
        TypedefScope(Some(Rc::new(TypedefLink {
            entry,
            next: self.clone(),
        })))
    }

    pub fn enter(&self) -> Self {
        self.push(TypedefEntry::Block)
    }

    /// Drop every binding made since the matching [`TypedefScope::enter`].
    pub fn leave(&self) -> Self {
        let mut scope = self.clone();
        while let Some(link) = scope.0.clone() {
            scope = link.next.clone();
            if matches!(link.entry, TypedefEntry::Block) {
                break;
            }
        }
        scope
    }

    pub fn declare_typedef(&self, name: NameId) -> Self {
        self.push(TypedefEntry::Typedef(name))
    }

    pub fn declare_ordinary(&self, name: NameId) -> Self {
        self.push(TypedefEntry::Ordinary(name))
    }

    /// Whether `name` currently names a type.
    pub fn is_typedef(&self, name: NameId) -> bool {
        let mut scope = &self.0;
        while let Some(link) = scope {
            match link.entry {
                TypedefEntry::Typedef(n) if n == name => return true,
                TypedefEntry::Ordinary(n) if n == name => return false,
                _ => {}
            }
            scope = &link.next.0;
        }
        false
    }
}

/// Reads characters from a source buffer and tracks line numbers.
pub struct Scanner<'src> {
    src: &'src [u8],
    cursor: Cursor,
}

pub(crate) fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

pub(crate) fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str) -> Self {
        Scanner {
            src: src.as_bytes(),
            cursor: Cursor {
                pos: 0,
                line: 1,
                typedefs: TypedefScope::default(),
            },
        }
    }

    pub fn save(&self) -> Cursor {
        self.cursor.clone()
    }

    pub fn restore(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub fn line(&self) -> u32 {
        self.cursor.line
    }

    pub fn typedefs(&self) -> &TypedefScope {
        &self.cursor.typedefs
    }

    pub fn set_typedefs(&mut self, typedefs: TypedefScope) {
        self.cursor.typedefs = typedefs;
    }

    pub fn peek(&self) -> Option<u8> {
        self.src.get(self.cursor.pos).copied()
    }

    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.cursor.pos + offset).copied()
    }

    /// Read the next character, or `None` at end of input.
    pub fn getc(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.cursor.pos += 1;
        if c == b'\n' {
            self.cursor.line += 1;
        }
        Some(c)
    }

    pub fn skip_white(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.getc();
        }
    }

    /// True when only whitespace remains.
    pub fn rest_is_white(&self) -> bool {
        self.src[self.cursor.pos.min(self.src.len())..]
            .iter()
            .all(|c| c.is_ascii_whitespace())
    }

    /// Match `text` exactly at the current position (after whitespace).
    /// The cursor is left untouched on mismatch.
    pub fn eat(&mut self, text: &str) -> bool {
        let saved = self.save();
        self.skip_white();
        for &expected in text.as_bytes() {
            if self.getc() != Some(expected) {
                self.restore(saved);
                return false;
            }
        }
        true
    }

    /// Match the punctuator `op` unless the following character would make
    /// it a longer punctuator (`=` vs `==`, `&` vs `&&`/`&=`).
    pub fn eat_punct(&mut self, op: &str, not_followed_by: &[u8]) -> bool {
        let saved = self.save();
        if !self.eat(op) {
            return false;
        }
        if let Some(next) = self.peek()
            && not_followed_by.contains(&next)
        {
            trace!("punctuator '{op}' rejected by lookahead '{}'", next as char);
            self.restore(saved);
            return false;
        }
        true
    }

    /// Read an identifier-shaped word (keywords included).
    pub fn word(&mut self) -> Option<&'src str> {
        let saved = self.save();
        self.skip_white();
        let start = self.cursor.pos;
        match self.peek() {
            Some(c) if is_ident_start(c) => {}
            _ => {
                self.restore(saved);
                return None;
            }
        }
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            self.getc();
        }
        let src: &'src [u8] = self.src;
        // identifiers are ASCII, so the slice is valid utf-8
        std::str::from_utf8(&src[start..self.cursor.pos]).ok()
    }

    /// Match the keyword `kw` as a whole word.
    pub fn eat_keyword(&mut self, kw: &str) -> bool {
        let saved = self.save();
        match self.word() {
            Some(w) if w == kw => true,
            _ => {
                self.restore(saved);
                false
            }
        }
    }
}
