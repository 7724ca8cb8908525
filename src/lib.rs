//! A small C compiler producing x86-64 MASM for the Microsoft x64 ABI.

pub mod ast;
pub mod codegen;
pub mod diagnostic;
pub mod driver;
pub mod parser;
pub mod pp;
pub mod semantic;

#[cfg(test)]
mod tests;
