//! CLI parsing and configuration module
//!
//! This module handles command-line argument parsing using clap and
//! provides configuration structures for the compiler driver.

use clap::Parser as CliParser;
use std::path::PathBuf;

use super::artifact::CompilePhase;
use super::toolchain::ToolchainConfig;

pub const DEFAULT_ML64_PATH: &str =
    "c:/Program Files/Microsoft Visual Studio/2022/Community/VC/Tools/MSVC/14.37.32822/bin/Hostx64/x64/ml64.exe";
pub const DEFAULT_WIN_SDK_LIB_PATH: &str = "C:/Program Files (x86)/Windows Kits/10/Lib/10.0.22621.0/um/x64/";

/// CLI interface using clap
#[derive(CliParser, Debug)]
#[clap(name = "crankcc", about = "C subset compiler emitting x86-64 MASM")]
pub struct Cli {
    /// Input C source file
    #[clap(value_parser, default_value = "test.c")]
    pub source_file: PathBuf,

    /// Path of ml64.exe
    #[clap(long = "ml64-path", value_name = "FILE", default_value = DEFAULT_ML64_PATH)]
    pub ml64_path: PathBuf,

    /// Directory holding the Windows SDK import libraries (kernel32.lib, user32.lib)
    #[clap(long = "win-sdk-lib-path", value_name = "DIR", default_value = DEFAULT_WIN_SDK_LIB_PATH)]
    pub win_sdk_lib_path: PathBuf,

    /// Runtime support assembly linked into every program
    #[clap(long, value_name = "FILE", default_value = "runtime/cranks_libc.asm")]
    pub runtime: PathBuf,

    /// Directory receiving the generated files
    #[clap(short = 'o', long = "output-dir", value_name = "DIR", default_value = "output")]
    pub output_dir: PathBuf,

    /// Stop after writing the assembly file
    #[clap(short = 'S')]
    pub assembly_only: bool,

    /// Print the parsed AST
    #[clap(long)]
    pub dump_ast: bool,

    /// Also write the comment-free source as <name>_no_comment.c
    #[clap(long)]
    pub keep_stripped: bool,

    /// Build the executable but do not run it
    #[clap(long)]
    pub no_run: bool,

    /// Run the regression suite described by a control file
    #[clap(long, value_name = "CONTROL_FILE")]
    pub suite: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Where the source text comes from.
#[derive(Debug, Clone)]
pub enum SourceInput {
    Path(PathBuf),
    /// In-memory text with the name used for the generated files.
    Buffer { name: String, text: String },
}

/// Configuration for compilation
#[derive(Debug)]
pub struct CompileConfig {
    pub input: SourceInput,
    pub output_dir: PathBuf,
    pub toolchain: ToolchainConfig,
    pub stop_after: CompilePhase,
    pub dump_ast: bool,
    pub keep_stripped: bool,
    /// Stamp the assembly header with the current time.
    pub timestamp: bool,
    pub suite: Option<PathBuf>,
    pub verbose: u8,
    _temp_dir: Option<tempfile::TempDir>,
}

impl CompileConfig {
    /// Create a new CompileConfig from a string of source code. Generated
    /// files go to a temporary directory that lives as long as the config.
    pub fn from_source_code(source: impl Into<String>, stop_after: CompilePhase) -> std::io::Result<Self> {
        let temp_dir = tempfile::Builder::new().prefix("crankcc").tempdir()?;
        Ok(Self {
            input: SourceInput::Buffer {
                name: "test".to_string(),
                text: source.into(),
            },
            output_dir: temp_dir.path().to_path_buf(),
            toolchain: ToolchainConfig::default(),
            stop_after,
            dump_ast: false,
            keep_stripped: false,
            timestamp: false,
            suite: None,
            verbose: 0,
            _temp_dir: Some(temp_dir),
        })
    }

    /// The same settings applied to another source file.
    pub fn for_source(&self, path: PathBuf) -> Self {
        Self {
            input: SourceInput::Path(path),
            output_dir: self.output_dir.clone(),
            toolchain: self.toolchain.clone(),
            stop_after: self.stop_after,
            dump_ast: false,
            keep_stripped: self.keep_stripped,
            timestamp: self.timestamp,
            suite: None,
            verbose: self.verbose,
            _temp_dir: None,
        }
    }
}

impl Cli {
    /// Convert CLI arguments into compilation configuration
    pub fn into_config(self) -> CompileConfig {
        let stop_after = if self.assembly_only {
            CompilePhase::Codegen
        } else if self.no_run {
            CompilePhase::Assemble
        } else {
            CompilePhase::Run
        };

        CompileConfig {
            input: SourceInput::Path(self.source_file),
            output_dir: self.output_dir,
            toolchain: ToolchainConfig {
                ml64_path: self.ml64_path,
                win_sdk_lib_path: self.win_sdk_lib_path,
                runtime: self.runtime,
            },
            stop_after,
            dump_ast: self.dump_ast,
            keep_stripped: self.keep_stripped,
            timestamp: true,
            suite: self.suite,
            verbose: self.verbose,
            _temp_dir: None,
        }
    }
}
