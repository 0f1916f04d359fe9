//! Lox CLI: execute script files or run the REPL.

use std::env;
use std::path::Path;
use std::process;

use loxlang::error::LoxError;
use loxlang::repl::Repl;

fn print_usage() {
    eprintln!("Usage: lox [script]");
    eprintln!();
    eprintln!("  lox             Start the interactive REPL");
    eprintln!("  lox script.lox  Run a script file");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    match args.len() {
        1 => Repl::new().run(),
        2 => run_file(&args[1]),
        _ => {
            print_usage();
            process::exit(64);
        }
    }
}

fn run_file(path: &str) {
    if let Err(err) = loxlang::run_file(Path::new(path)) {
        process::exit(report(&err));
    }
}

/// Print an error to stderr and map it to a process exit code.
fn report(err: &LoxError) -> i32 {
    match err {
        LoxError::Compile(errors) => {
            for error in errors {
                eprintln!("{}", error);
            }
            65
        }
        LoxError::Runtime(error) => {
            eprintln!("{}", error);
            70
        }
        LoxError::Io(error) => {
            eprintln!("Could not read script: {}", error);
            74
        }
    }
}
