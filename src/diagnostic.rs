//! Error taxonomy and diagnostic rendering.
//!
//! Two kinds of failure exist: an internal error signals a broken compiler
//! invariant and aborts the compilation, a source error points at a defect in
//! the input program and carries the offending line.

use std::fmt;

/// Error produced by any compiler phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("internal compiler error: {message}")]
    Internal { message: String },

    #[error("line {line}: {message}")]
    Source { line: u32, message: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        CompileError::Internal {
            message: message.into(),
        }
    }

    pub fn source(line: u32, message: impl Into<String>) -> Self {
        CompileError::Source {
            line,
            message: message.into(),
        }
    }

    /// True for defects in the input program.
    pub fn is_source_error(&self) -> bool {
        matches!(self, CompileError::Source { .. })
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Source { line, .. } => Some(*line),
            CompileError::Internal { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Internal { message } | CompileError::Source { message, .. } => message,
        }
    }
}

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Error,
    Fatal,
}

/// A rendered report bound to a source file.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub file: String,
    pub line: Option<u32>,
}

impl Diagnostic {
    pub fn from_error(file: &str, error: &CompileError) -> Self {
        let level = if error.is_source_error() {
            DiagnosticLevel::Error
        } else {
            DiagnosticLevel::Fatal
        };
        Diagnostic {
            level,
            message: error.message().to_string(),
            file: file.to_string(),
            line: error.line(),
        }
    }

    /// Render with ANSI colors for terminal output.
    pub fn render_colored(&self) -> String {
        let label = match self.level {
            DiagnosticLevel::Error => "\x1b[38;5;208merror\x1b[0m",
            DiagnosticLevel::Fatal => "\x1b[1;31mfatal\x1b[0m",
        };
        format!("{}: {}: {}", self.location(), label, self.message)
    }

    fn location(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{}", self.file, line),
            None => self.file.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.level {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Fatal => "fatal",
        };
        write!(f, "{}: {}: {}", self.location(), label, self.message)
    }
}
