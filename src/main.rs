use clap::Parser as ClapParser;
use crankcc::driver::{Cli, CompilerDriver};
use log::LevelFilter;
use std::process::exit;

/// The main entry point for the application.
///
/// Parses command-line arguments and runs the compiler.
fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut driver = CompilerDriver::new(cli);
    if let Err(e) = driver.run() {
        driver.print_error(&e);
        exit(1);
    }
}
