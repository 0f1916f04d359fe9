//! Interactive REPL for Lox.

use std::io::{self, Write};
use std::path::PathBuf;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::LoxError;
use crate::Vm;

const HISTORY_FILE: &str = ".lox_history";

/// A REPL session. One VM lives for the whole session, so globals and
/// interned strings persist between lines.
pub struct Repl {
    vm: Vm,
    history_file: PathBuf,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            vm: Vm::new(),
            history_file: Self::history_path(),
        }
    }

    fn history_path() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(HISTORY_FILE),
            None => PathBuf::from(HISTORY_FILE),
        }
    }

    pub fn run(&mut self) {
        println!("Lox {}", env!("CARGO_PKG_VERSION"));
        println!("Type \"exit\" to quit.\n");

        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(_) => {
                println!("Warning: using basic input (no history)");
                self.run_basic();
                return;
            }
        };
        let _ = editor.load_history(&self.history_file);

        loop {
            match editor.readline("> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == "exit" || line == "quit" {
                        break;
                    }
                    let _ = editor.add_history_entry(line);
                    self.execute(line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Input error: {}", err);
                    break;
                }
            }
        }

        let _ = editor.save_history(&self.history_file);
        println!("Goodbye!");
    }

    /// Fallback loop when the line editor is unavailable.
    fn run_basic(&mut self) {
        let stdin = io::stdin();
        loop {
            print!("> ");
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "exit" || line == "quit" {
                break;
            }
            self.execute(line);
        }
    }

    /// Run one line, printing errors without ending the session.
    fn execute(&mut self, line: &str) {
        match self.vm.interpret(line) {
            Ok(()) => {}
            Err(LoxError::Compile(errors)) => {
                for error in errors {
                    eprintln!("{}", error.to_string().red());
                }
            }
            Err(err) => eprintln!("{}", err.to_string().red()),
        }
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}
