//! Command-line interface and compilation driver.

use std::fs;
use std::path::PathBuf;

use clap::Parser as CliParser;
use log::debug;
use thiserror::Error;

use crate::ast::{printer, Ast};
use crate::codegen::{generate_segments, splice_template};
use crate::diagnostic::DiagnosticEngine;
use crate::lexer::{LexError, Lexer};
use crate::normalize::normalize;
use crate::parser::{AwkParser, ParseEngine, ParseError, TokenCode};
use crate::symtab::{preload, Dialects, Scopes, SymbolCategory};

/// CLI interface using clap
#[derive(CliParser, Debug, Default)]
#[clap(name = "awkcc", about = "AWK to C++ source compiler", version)]
pub struct Cli {
    /// AWK source files
    #[clap(value_parser)]
    pub files: Vec<PathBuf>,

    /// Inline program text (repeatable)
    #[clap(short = 'e', long = "source", value_name = "PROGRAM")]
    pub sources: Vec<String>,

    /// Source files scanned before the main program
    #[clap(short = 'i', long = "include", value_name = "FILE")]
    pub pre_includes: Vec<PathBuf>,

    /// Directories searched for @include files
    #[clap(short = 'I', long = "include-path", value_name = "DIR")]
    pub include_paths: Vec<PathBuf>,

    /// Pre-assign a variable (repeatable)
    #[clap(short = 'v', long = "assign", value_name = "NAME=VALUE")]
    pub assigns: Vec<String>,

    /// Enable (some) gawk extensions
    #[clap(long)]
    pub gawk: bool,

    /// Enable (some) awkccc extensions
    #[clap(long)]
    pub awkccc: bool,

    /// Code generation template file
    #[clap(short = 't', long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Output file (stdout when absent)
    #[clap(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the normalized tree instead of generating code
    #[clap(long)]
    pub dump_ast: bool,

    /// Verbose diagnostic output
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("no input: provide source files or -e program text")]
    NoInput,
    #[error("failed to read {path:?}: {source}")]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read template {path:?}: {source}")]
    ReadTemplate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    WriteOutput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid variable assignment \"{0}\" (expected NAME=VALUE)")]
    BadAssign(String),
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("input produced no parse tree")]
    NoProgram,
}

/// Fallback template carrying every marker, used when `-t` is absent.
const DEFAULT_TEMPLATE: &str = "\
// generated by awkcc
%includes;
%variables;
%procedures;
// begin
%begin;
// begin_file
%begin_file;
// body
%body;
// end_file
%end_file;
// end
%end;
";

/// Main compilation driver: source text in, generated C++ text out.
pub struct Driver {
    cli: Cli,
}

impl Driver {
    pub fn new(cli: Cli) -> Self {
        Driver { cli }
    }

    pub fn run(&self) -> Result<(), DriverError> {
        let mut scopes = Scopes::new();
        preload(
            &mut scopes,
            Dialects {
                gawk: self.cli.gawk,
                awkccc: self.cli.awkccc,
            },
        );
        for assign in &self.cli.assigns {
            apply_assign(&mut scopes, assign)?;
        }

        let buffers = self.collect_sources()?;
        if buffers.is_empty() {
            return Err(DriverError::NoInput);
        }

        let mut ast = Ast::new();
        let mut engine = AwkParser::new();
        let mut diag = DiagnosticEngine::new();
        let mut lexer = Lexer::new(self.cli.include_paths.clone());
        for buffer in &buffers {
            lexer.run(buffer, &mut ast, &mut scopes, &mut engine, &mut diag)?;
        }
        let root = engine.finish(&mut ast, &mut scopes)?;

        // Lexical problems are recoverable; report them and carry on.
        diag.print_all();

        let Some(root) = root else {
            return Err(DriverError::NoProgram);
        };
        debug!("driver: parse produced {} node(s)", ast.len());
        normalize(&mut ast, root);

        if self.cli.dump_ast {
            print!("{}", printer::print_ast(&ast, root));
            return Ok(());
        }

        let template = match &self.cli.template {
            Some(path) => fs::read_to_string(path).map_err(|source| DriverError::ReadTemplate {
                path: path.clone(),
                source,
            })?,
            None => DEFAULT_TEMPLATE.to_string(),
        };
        let segments = generate_segments(&ast, &scopes, root);
        let output = splice_template(&template, &segments);

        match &self.cli.output {
            Some(path) => fs::write(path, output).map_err(|source| DriverError::WriteOutput {
                path: path.clone(),
                source,
            })?,
            None => print!("{}", output),
        }
        Ok(())
    }

    /// Pre-included files, inline `-e` programs, then the main files,
    /// in that order.
    fn collect_sources(&self) -> Result<Vec<String>, DriverError> {
        let mut buffers = Vec::new();
        for path in &self.cli.pre_includes {
            buffers.push(read_source(path)?);
        }
        for source in &self.cli.sources {
            buffers.push(source.clone());
        }
        for path in &self.cli.files {
            buffers.push(read_source(path)?);
        }
        Ok(buffers)
    }
}

fn read_source(path: &PathBuf) -> Result<String, DriverError> {
    fs::read_to_string(path).map_err(|source| DriverError::ReadInput {
        path: path.clone(),
        source,
    })
}

/// `-v NAME=VALUE`: register the variable so generated code declares
/// it. The value itself matters at runtime, which is outside this
/// front end; it is recorded in the log for traceability.
fn apply_assign(scopes: &mut Scopes, assign: &str) -> Result<(), DriverError> {
    let Some((name, value)) = assign.split_once('=') else {
        return Err(DriverError::BadAssign(assign.to_string()));
    };
    if name.is_empty() {
        return Err(DriverError::BadAssign(assign.to_string()));
    }
    let sym = scopes.get("", name, TokenCode::NAME, false, SymbolCategory::Variable);
    debug!(
        "driver: pre-assigned {} = {:?}",
        scopes.symbol(sym).qualified_name(),
        value
    );
    Ok(())
}
