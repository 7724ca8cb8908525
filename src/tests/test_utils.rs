use crate::ast::TranslationUnit;
use crate::ast::dumper::AstDumper;
use crate::codegen::CodeGen;
use crate::diagnostic::CompileError;
use crate::driver::artifact::{CompileArtifact, CompilePhase};
use crate::driver::cli::CompileConfig;
use crate::driver::compiler::{CompilerDriver, DriverError};
use crate::parser::parse_source;
use crate::pp::strip_comments;

pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn front_end(source: &str) -> Result<TranslationUnit, CompileError> {
    setup();
    let stripped = strip_comments(source)?;
    parse_source(&stripped)
}

pub fn parse(source: &str) -> TranslationUnit {
    match front_end(source) {
        Ok(unit) => unit,
        Err(e) => panic!("parse failed: {e}"),
    }
}

pub fn parse_err(source: &str) -> CompileError {
    match front_end(source) {
        Ok(unit) => panic!("expected a parse error, got {unit:#?}"),
        Err(e) => e,
    }
}

pub fn dump(source: &str) -> String {
    AstDumper::dump(&parse(source))
}

fn generate(source: &str) -> Result<String, CompileError> {
    let unit = front_end(source)?;
    CodeGen::new("test", None).generate(&unit)
}

/// Assembly for `source`, without a timestamp in the header.
pub fn compile(source: &str) -> String {
    match generate(source) {
        Ok(asm) => asm,
        Err(e) => panic!("compilation failed: {e}"),
    }
}

pub fn compile_err(source: &str) -> CompileError {
    match generate(source) {
        Ok(asm) => panic!("expected a compile error, got:\n{asm}"),
        Err(e) => e,
    }
}

/// Message of the source error `source` is rejected with.
pub fn source_error(source: &str) -> String {
    let error = compile_err(source);
    assert!(error.is_source_error(), "expected a source error, got {error:?}");
    error.message().to_string()
}

/// The lines of the procedure `name` in `asm`, from `proc` to `endp`.
pub fn procedure<'a>(asm: &'a str, name: &str) -> Vec<&'a str> {
    let start = format!("{name} proc");
    let end = format!("{name} endp");
    asm.lines()
        .skip_while(|line| *line != start)
        .take_while(|line| *line != end)
        .skip(1)
        .collect()
}

pub fn setup_driver(source: &str, phase: CompilePhase) -> CompilerDriver {
    setup();
    let config = match CompileConfig::from_source_code(source, phase) {
        Ok(config) => config,
        Err(e) => panic!("cannot create temp dir: {e}"),
    };
    CompilerDriver::from_config(config)
}

pub fn run_pipeline(source: &str, phase: CompilePhase) -> (CompilerDriver, Result<CompileArtifact, DriverError>) {
    let mut driver = setup_driver(source, phase);
    let result = driver.run_pipeline(phase);
    (driver, result)
}
