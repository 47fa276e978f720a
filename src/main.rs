use awkcc::driver::{Cli, Driver};
use clap::Parser as CliParser;
use std::process::exit;

/// Parses command-line arguments and runs the compiler.
fn main() {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    if let Err(error) = Driver::new(cli).run() {
        eprintln!("error: {}", error);
        exit(1);
    }
}
