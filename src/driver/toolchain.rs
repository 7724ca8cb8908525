//! External MASM toolchain.
//!
//! `ml64` is run twice: once to assemble the runtime support file into an
//! object, once to assemble the generated file and link it with that object
//! and the system import libraries into a console executable. Every tool
//! runs with the output directory as its working directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use super::cli::{DEFAULT_ML64_PATH, DEFAULT_WIN_SDK_LIB_PATH};
use super::compiler::DriverError;

/// Stack reserved for generated programs.
pub const STACK_RESERVE: u64 = 16 * 1024 * 1024;

const SYSTEM_LIBRARIES: [&str; 2] = ["kernel32.lib", "user32.lib"];

#[derive(Debug, Clone)]
pub struct ToolchainConfig {
    pub ml64_path: PathBuf,
    pub win_sdk_lib_path: PathBuf,
    pub runtime: PathBuf,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            ml64_path: PathBuf::from(DEFAULT_ML64_PATH),
            win_sdk_lib_path: PathBuf::from(DEFAULT_WIN_SDK_LIB_PATH),
            runtime: PathBuf::from("runtime/cranks_libc.asm"),
        }
    }
}

/// Captured result of running a generated program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutput {
    pub stdout: String,
    pub exit_code: Option<i32>,
}

pub struct Toolchain<'a> {
    config: &'a ToolchainConfig,
    work_dir: &'a Path,
}

impl<'a> Toolchain<'a> {
    pub fn new(config: &'a ToolchainConfig, work_dir: &'a Path) -> Self {
        Toolchain { config, work_dir }
    }

    /// Arguments of the runtime assembly step.
    pub fn runtime_args(&self) -> Result<Vec<String>, DriverError> {
        let runtime = std::path::absolute(&self.config.runtime).map_err(|source| DriverError::Io {
            path: self.config.runtime.clone(),
            source,
        })?;
        Ok(vec!["/c".to_string(), runtime.display().to_string()])
    }

    /// Arguments of the assemble-and-link step for `asm_file`.
    pub fn link_args(&self, asm_file: &Path) -> Vec<String> {
        let mut args = vec![asm_file.display().to_string(), self.runtime_object().display().to_string()];
        for lib in SYSTEM_LIBRARIES {
            args.push(self.config.win_sdk_lib_path.join(lib).display().to_string());
        }
        args.extend(["/link", "/subsystem:console", "/entry:main"].map(String::from));
        args.push(format!("/STACK:{STACK_RESERVE}"));
        args
    }

    /// Object file produced from the runtime support assembly.
    pub fn runtime_object(&self) -> PathBuf {
        let stem = self
            .config
            .runtime
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "runtime".to_string());
        PathBuf::from(format!("{stem}.obj"))
    }

    /// Assemble the runtime and `asm_file`, link them and return the path of
    /// the executable.
    pub fn build(&self, asm_file: &Path) -> Result<PathBuf, DriverError> {
        let runtime_args = self.runtime_args()?;
        self.run_tool(&self.config.ml64_path, &runtime_args)?;
        self.run_tool(&self.config.ml64_path, &self.link_args(asm_file))?;

        let executable = self.work_dir.join(asm_file.with_extension("exe"));
        if !executable.exists() {
            return Err(DriverError::Io {
                path: executable,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "linker produced no executable"),
            });
        }
        info!("built {}", executable.display());
        Ok(executable)
    }

    /// Run a built program and capture its standard output.
    pub fn run_program(&self, executable: &Path) -> Result<ProgramOutput, DriverError> {
        debug!("running {}", executable.display());
        let output = Command::new(executable)
            .current_dir(self.work_dir)
            .output()
            .map_err(|source| DriverError::ToolLaunch {
                tool: executable.display().to_string(),
                source,
            })?;
        let exit_code = output.status.code();
        debug!("{} exited with {:?}", executable.display(), exit_code);
        Ok(ProgramOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            exit_code,
        })
    }

    fn run_tool(&self, tool: &Path, args: &[String]) -> Result<(), DriverError> {
        fs::create_dir_all(self.work_dir).map_err(|source| DriverError::Io {
            path: self.work_dir.to_path_buf(),
            source,
        })?;
        debug!("executing {} {}", tool.display(), args.join(" "));
        let status = Command::new(tool)
            .args(args)
            .current_dir(self.work_dir)
            .status()
            .map_err(|source| DriverError::ToolLaunch {
                tool: tool.display().to_string(),
                source,
            })?;
        if !status.success() {
            return Err(DriverError::ToolFailed {
                tool: tool.display().to_string(),
                status,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_step_lists_runtime_and_system_libraries() {
        let config = ToolchainConfig {
            ml64_path: PathBuf::from("ml64.exe"),
            win_sdk_lib_path: PathBuf::from("sdk"),
            runtime: PathBuf::from("rt/cranks_libc.asm"),
        };
        let toolchain = Toolchain::new(&config, Path::new("out"));
        let args = toolchain.link_args(Path::new("prog.asm"));
        assert_eq!(args[0], "prog.asm");
        assert_eq!(args[1], "cranks_libc.obj");
        assert!(args[2].ends_with("kernel32.lib"));
        assert!(args[3].ends_with("user32.lib"));
        assert_eq!(
            &args[4..],
            ["/link", "/subsystem:console", "/entry:main", "/STACK:16777216"]
        );
    }
}
