//! Backtracking recursive-descent parser.
//!
//! One method per grammar production. Every production runs through
//! [`Parser::rule`], which restores the saved [`Cursor`](cursor::Cursor)
//! whenever the production does not match. Self-embedding productions go
//! through [`Parser::nested`], which also bounds the nesting depth.
//! A rule returns `Ok(Some(node))` on a match, `Ok(None)` when the input
//! does not start with this production, and `Err` only for real errors in
//! the source (or a broken compiler invariant).

use log::debug;

use crate::ast::*;
use crate::diagnostic::{CompileError, CompileResult};

pub mod cursor;
pub mod declarations;
pub mod expressions;
pub mod statements;

use cursor::Scanner;

/// Result of a single grammar production.
pub(crate) type PResult<T> = CompileResult<Option<T>>;

/// Nesting limit for self-embedding grammar rules.
pub const MAX_PARSE_DEPTH: usize = 128;

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else", "enum", "extern",
    "float", "for", "goto", "if", "inline", "int", "long", "register", "restrict", "return", "short", "signed",
    "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void", "volatile", "while",
];

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

pub struct Parser<'src> {
    pub(crate) scanner: Scanner<'src>,
    depth: usize,
    max_depth: usize,
}

/// Parse a complete (comment-free) translation unit.
pub fn parse_source(source: &str) -> CompileResult<TranslationUnit> {
    Parser::new(source).parse_translation_unit()
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Parser {
            scanner: Scanner::new(source),
            depth: 0,
            max_depth: MAX_PARSE_DEPTH,
        }
    }

    /// Override the nesting limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn parse_translation_unit(&mut self) -> CompileResult<TranslationUnit> {
        let mut items = Vec::new();
        while let Some(item) = self.parse_external_declaration()? {
            items.push(item);
        }

        if !self.scanner.rest_is_white() {
            let line = self.start_line();
            return Err(CompileError::source(line, "declaration parsing failed"));
        }

        debug!("parsed translation unit with {} external declarations", items.len());
        Ok(TranslationUnit { items })
    }

    /// Run one grammar production.
    pub(crate) fn rule<T>(&mut self, _name: &'static str, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.scanner.save();
        let result = f(self);
        match result {
            Ok(None) => {
                self.scanner.restore(saved);
                Ok(None)
            }
            other => other,
        }
    }

    /// Run a production that can contain itself (statements, assignment,
    /// cast and unary expressions, initializers, struct specifiers). Only
    /// these count toward the nesting limit.
    pub(crate) fn nested<T>(&mut self, name: &'static str, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= self.max_depth {
            return Err(CompileError::internal(format!(
                "parser nesting exceeded {} levels in {name}",
                self.max_depth
            )));
        }
        self.depth += 1;
        let result = self.rule(name, f);
        self.depth -= 1;
        result
    }

    /// Line of the next non-blank character.
    pub(crate) fn start_line(&mut self) -> u32 {
        self.scanner.skip_white();
        self.scanner.line()
    }

    /// Consume `text` or report that the production did not match.
    pub(crate) fn expect(&mut self, text: &str) -> Option<()> {
        self.scanner.eat(text).then_some(())
    }

    /// An identifier that is not a keyword.
    pub(crate) fn identifier(&mut self) -> Option<NameId> {
        let saved = self.scanner.save();
        match self.scanner.word() {
            Some(word) if !is_keyword(word) => Some(NameId::new(word)),
            _ => {
                self.scanner.restore(saved);
                None
            }
        }
    }

    pub(crate) fn enter_typedef_scope(&mut self) {
        let scope = self.scanner.typedefs().enter();
        self.scanner.set_typedefs(scope);
    }

    pub(crate) fn leave_typedef_scope(&mut self) {
        let scope = self.scanner.typedefs().leave();
        self.scanner.set_typedefs(scope);
    }

    pub(crate) fn is_typedef_name(&self, name: NameId) -> bool {
        self.scanner.typedefs().is_typedef(name)
    }

    /// Record names introduced by a declaration so later type-specifier
    /// parsing sees the right meaning.
    pub(crate) fn bind_declared_name(&mut self, name: NameId, is_typedef: bool) {
        let scope = if is_typedef {
            self.scanner.typedefs().declare_typedef(name)
        } else if self.is_typedef_name(name) {
            self.scanner.typedefs().declare_ordinary(name)
        } else {
            return;
        };
        self.scanner.set_typedefs(scope);
    }
}
