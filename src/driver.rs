//! Compiler driver: command line, pipeline orchestration, the external
//! MASM toolchain and the regression-suite runner.

pub mod artifact;
pub mod cli;
pub mod compiler;
pub mod suite;
pub mod toolchain;

pub use artifact::{CompileArtifact, CompilePhase};
pub use cli::{Cli, CompileConfig};
pub use compiler::{CompilerDriver, DriverError};
