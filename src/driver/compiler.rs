//! Core compilation pipeline orchestration module
//!
//! This module contains the main compiler driver that runs the phases in
//! order: comment stripping, parsing, code generation, assembling and
//! linking with the external toolchain, and running the program.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use log::{debug, info};

use crate::ast::TranslationUnit;
use crate::ast::dumper::AstDumper;
use crate::codegen::CodeGen;
use crate::diagnostic::{CompileError, Diagnostic};
use crate::parser::parse_source;
use crate::pp::strip_comments;

use super::artifact::{CompileArtifact, CompilePhase};
use super::cli::{CompileConfig, SourceInput};
use super::suite::{SuiteControl, SuiteReport, run_suite};
use super::toolchain::{ProgramOutput, Toolchain};

/// Main compiler driver
pub struct CompilerDriver {
    config: CompileConfig,
}

impl CompilerDriver {
    /// Create a new compiler driver from CLI arguments
    pub fn new(cli: super::cli::Cli) -> Self {
        Self::from_config(cli.into_config())
    }

    /// Create a new compiler driver from configuration
    pub fn from_config(config: CompileConfig) -> Self {
        CompilerDriver { config }
    }

    /// File stem used for every generated file.
    pub fn unit_name(&self) -> String {
        match &self.config.input {
            SourceInput::Path(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "a".to_string()),
            SourceInput::Buffer { name, .. } => name.clone(),
        }
    }

    /// Display name of the input for diagnostics.
    pub fn source_name(&self) -> String {
        match &self.config.input {
            SourceInput::Path(path) => path.display().to_string(),
            SourceInput::Buffer { name, .. } => format!("{name}.c"),
        }
    }

    pub fn run_pipeline(&mut self, stop_after: CompilePhase) -> Result<CompileArtifact, DriverError> {
        let mut out = CompileArtifact::default();
        let name = self.unit_name();
        debug!("compiling {} (stop after {:?})", self.source_name(), stop_after);

        let source = self.read_source()?;
        let stripped = strip_comments(&source)?;
        if self.config.keep_stripped {
            self.write_output(&format!("{name}_no_comment.c"), &stripped)?;
        }
        if stop_after == CompilePhase::StripComments {
            out.stripped = Some(stripped);
            return Ok(out);
        }

        let unit = self.run_parser(&stripped)?;
        if stop_after == CompilePhase::Parse {
            out.ast = Some(unit);
            return Ok(out);
        }

        let assembly = self.run_codegen(&name, &unit)?;
        if self.config.dump_ast {
            out.ast = Some(unit);
        }
        if stop_after == CompilePhase::Codegen {
            out.assembly = Some(assembly);
            return Ok(out);
        }

        let asm_file = format!("{name}.asm");
        self.write_output(&asm_file, &assembly)?;
        out.assembly = Some(assembly);
        let work_dir = self.work_dir()?;
        let toolchain = Toolchain::new(&self.config.toolchain, &work_dir);
        let executable = toolchain.build(Path::new(&asm_file))?;
        if stop_after == CompilePhase::Assemble {
            out.executable = Some(executable);
            return Ok(out);
        }

        let output = toolchain.run_program(&executable)?;
        out.executable = Some(executable);
        out.run_output = Some(output);
        Ok(out)
    }

    fn read_source(&self) -> Result<String, DriverError> {
        match &self.config.input {
            SourceInput::Path(path) => fs::read_to_string(path).map_err(|source| DriverError::Io {
                path: path.clone(),
                source,
            }),
            SourceInput::Buffer { text, .. } => Ok(text.clone()),
        }
    }

    fn run_parser(&self, stripped: &str) -> Result<TranslationUnit, DriverError> {
        let unit = parse_source(stripped)?;
        debug!("parsed {} external declarations", unit.items.len());
        Ok(unit)
    }

    fn run_codegen(&self, name: &str, unit: &TranslationUnit) -> Result<String, DriverError> {
        let timestamp = self
            .config
            .timestamp
            .then(|| chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string());
        let assembly = CodeGen::new(name, timestamp).generate(unit)?;
        debug!("generated {} bytes of assembly", assembly.len());
        Ok(assembly)
    }

    fn work_dir(&self) -> Result<PathBuf, DriverError> {
        std::path::absolute(&self.config.output_dir).map_err(|source| DriverError::Io {
            path: self.config.output_dir.clone(),
            source,
        })
    }

    fn write_output(&self, file_name: &str, contents: &str) -> Result<PathBuf, DriverError> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).map_err(|source| DriverError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(file_name);
        fs::write(&path, contents).map_err(|source| DriverError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("wrote {}", path.display());
        Ok(path)
    }

    /// Run the compilation process (or the regression suite) as configured
    /// and print its results.
    pub fn run(&mut self) -> Result<(), DriverError> {
        if let Some(control) = self.config.suite.clone() {
            let report = self.run_suite(&control)?;
            println!("{}", report.summary());
            return if report.all_passed() {
                Ok(())
            } else {
                Err(DriverError::SuiteFailed {
                    failed: report.failed.len(),
                    total: report.total(),
                })
            };
        }

        let stop_after = self.config.stop_after;
        let artifact = self.run_pipeline(stop_after)?;
        if let Some(ast) = &artifact.ast {
            print!("{}", AstDumper::dump(ast));
        }
        if stop_after == CompilePhase::Codegen
            && let Some(assembly) = &artifact.assembly
        {
            let path = self.write_output(&format!("{}.asm", self.unit_name()), assembly)?;
            info!("assembly written to {}", path.display());
        }
        if let Some(output) = &artifact.run_output {
            print!("{}", output.stdout);
        }
        Ok(())
    }

    /// Compile and run every case of the suite described by `control_file`.
    pub fn run_suite(&self, control_file: &Path) -> Result<SuiteReport, DriverError> {
        let control = SuiteControl::load(control_file)?;
        info!(
            "running suite {} (cases {}..={})",
            control_file.display(),
            control.first,
            control.last
        );
        run_suite(&control, |case| {
            let mut driver = CompilerDriver::from_config(self.config.for_source(case.to_path_buf()));
            let artifact = driver.run_pipeline(CompilePhase::Run)?;
            Ok(artifact.run_output.map(|o: ProgramOutput| o.stdout).unwrap_or_default())
        })
    }

    /// Print a failure the way the command line reports it.
    pub fn print_error(&self, error: &DriverError) {
        match error {
            DriverError::Compile(e) => {
                eprintln!("{}", Diagnostic::from_error(&self.source_name(), e).render_colored());
            }
            other => eprintln!("\x1b[1;31merror\x1b[0m: {other}"),
        }
    }
}

/// Error types for the compiler driver
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with {status}")]
    ToolFailed { tool: String, status: ExitStatus },

    #[error("invalid suite control file, line {line}: {message}")]
    InvalidControl { line: usize, message: String },

    #[error("{failed} of {total} suite cases failed")]
    SuiteFailed { failed: usize, total: usize },
}

impl DriverError {
    /// The compile error behind this failure if it is a defect in the
    /// input program.
    pub fn as_source_error(&self) -> Option<&CompileError> {
        match self {
            DriverError::Compile(e) if e.is_source_error() => Some(e),
            _ => None,
        }
    }
}
