use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tarn_ast::{LineIndex, Module};
use tarn_typeck::CheckError;

#[derive(Parser)]
#[command(name = "tarn", about = "The Tarn programming language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a .tarn file and dump the AST
    Parse {
        /// Path to the .tarn source file
        file: PathBuf,
    },
    /// Print the type constraints collected for each function
    Constraints {
        /// Path to the .tarn source file
        file: PathBuf,
    },
    /// Type-check a .tarn file and print the inferred signatures
    Check {
        /// Path to the .tarn source file
        file: PathBuf,
    },
}

fn read_file(file: &Path) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: could not read {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

/// Parse source, reporting errors with line:col positions. Exits on the
/// first parse failure.
fn parse_or_exit(source: &str, file: &Path) -> (Module, LineIndex) {
    let lines = LineIndex::new(source);
    let (module, errors) = tarn_parser::parse(source);
    if !errors.is_empty() {
        for error in &errors {
            let (line, col) = lines.line_col(error.span.start);
            eprintln!(
                "{}:{}:{}: parse error: {}",
                file.display(),
                line,
                col,
                error.message
            );
        }
        std::process::exit(1);
    }
    (module, lines)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Parse { file } => {
            let source = read_file(&file);
            let (module, _) = parse_or_exit(&source, &file);
            print!("{}", tarn_ast::pretty_print(&module));
        }
        Command::Constraints { file } => {
            let source = read_file(&file);
            let (module, lines) = parse_or_exit(&source, &file);
            let symbols = match tarn_sema::SymbolTable::build(&module) {
                Ok(s) => s,
                Err(e) => report_sema(&e, &file, &lines),
            };
            for (id, fun) in module.funs.iter() {
                println!("{}:", fun.name(&module));
                for constraint in tarn_typeck::collect(&module, &lines, &symbols, id) {
                    println!("  {}", constraint);
                }
            }
        }
        Command::Check { file } => {
            let source = read_file(&file);
            let (module, lines) = parse_or_exit(&source, &file);
            let types = match tarn_typeck::check_module(&module, &lines) {
                Ok(t) => t,
                Err(CheckError::Sema(e)) => report_sema(&e, &file, &lines),
                Err(CheckError::Type(e)) => {
                    eprintln!("{}: type error: {}", file.display(), e);
                    std::process::exit(1);
                }
            };
            for (id, fun) in module.funs.iter() {
                if let Some(signature) = types.signature(&module, &lines, id) {
                    println!("{}: {}", fun.name(&module), signature);
                }
            }
        }
    }
}

fn report_sema(error: &tarn_sema::SemaError, file: &Path, lines: &LineIndex) -> ! {
    let (line, col) = lines.line_col(error.span().start);
    eprintln!("{}:{}:{}: error: {}", file.display(), line, col, error);
    std::process::exit(1)
}
