use std::path::PathBuf;

use crate::ast::TranslationUnit;

use super::toolchain::ProgramOutput;

/// Pipeline phases, in execution order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CompilePhase {
    StripComments,
    Parse,
    Codegen,
    Assemble,
    #[default]
    Run,
}

/// Outputs of one compilation, filled up to the phase the pipeline stopped
/// after.
#[derive(Debug, Default)]
pub struct CompileArtifact {
    pub stripped: Option<String>,
    pub ast: Option<TranslationUnit>,
    pub assembly: Option<String>,
    pub executable: Option<PathBuf>,
    pub run_output: Option<ProgramOutput>,
}
