//! Comment-stripping pre-pass.
//!
//! Removes `//` and `/* */` comments in a single pass. Newlines inside
//! comments are kept so that line numbers reported by later phases still
//! match the original file. Comment markers inside string and character
//! literals are left alone.

use crate::diagnostic::{CompileError, CompileResult};

/// Strip all comments from `source`.
pub fn strip_comments(source: &str) -> CompileResult<String> {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut line = 1u32;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'"' | b'\'' => {
                i = copy_literal(bytes, i, &mut out, &mut line);
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i += 2;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start_line = line;
                i += 2;
                loop {
                    match bytes.get(i) {
                        None => return Err(CompileError::source(start_line, "unterminated comment")),
                        Some(b'*') if bytes.get(i + 1) == Some(&b'/') => {
                            i += 2;
                            break;
                        }
                        Some(b'\n') => {
                            out.push(b'\n');
                            line += 1;
                            i += 1;
                        }
                        Some(_) => i += 1,
                    }
                }
                // a comment separates tokens like whitespace does
                out.push(b' ');
            }
            _ => {
                if c == b'\n' {
                    line += 1;
                }
                out.push(c);
                i += 1;
            }
        }
    }

    String::from_utf8(out).map_err(|e| CompileError::internal(format!("comment stripper broke utf-8: {e}")))
}

/// Copy a quoted literal starting at `start` verbatim, returning the index
/// after its closing quote. An unterminated literal runs to end of line.
fn copy_literal(bytes: &[u8], start: usize, out: &mut Vec<u8>, line: &mut u32) -> usize {
    let quote = bytes[start];
    out.push(quote);
    let mut i = start + 1;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\\' => {
                out.push(c);
                if let Some(&next) = bytes.get(i + 1) {
                    if next == b'\n' {
                        *line += 1;
                    }
                    out.push(next);
                }
                i += 2;
            }
            b'\n' => return i,
            _ => {
                out.push(c);
                i += 1;
                if c == quote {
                    return i;
                }
            }
        }
    }
    i
}
