//! Driver facade: one value owning the whole pipeline.
//!
//! A [`Lox`] session runs source through scanner → parser → resolver →
//! interpreter and records what went wrong in `had_error` /
//! `had_runtime_error`, so drivers (CLI, REPL, tests) decide on exit codes
//! without any process-wide state.  Diagnostics go to stderr; `print` output
//! goes to the writer the session was built with.

use std::io::Write;

use log::info;

use crate::ast::Stmt;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

pub struct Lox<'out, W: Write> {
    interpreter: Interpreter<'out, W>,
    pub had_error: bool,
    pub had_runtime_error: bool,
}

impl<'out, W: Write> Lox<'out, W> {
    pub fn new(output: &'out mut W) -> Self {
        Lox {
            interpreter: Interpreter::new(output),
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Run one source buffer through the full pipeline.  Interpreter state
    /// (globals, definitions, the resolver side-table) survives across calls,
    /// which is what keeps a REPL session coherent.
    pub fn run(&mut self, source: &[u8]) {
        info!("Running {} byte(s) of source", source.len());

        let mut tokens: Vec<Token> = Vec::new();

        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),

                // The scanner surfaces its first offense and the pipeline
                // stops before parsing.
                Err(error) => {
                    eprintln!("{error}");
                    self.had_error = true;
                    return;
                }
            }
        }

        let statements: Vec<Stmt> = match Parser::new(tokens).parse() {
            Ok(statements) => statements,

            Err(errors) => {
                for error in errors {
                    eprintln!("{error}");
                }
                self.had_error = true;
                return;
            }
        };

        if let Err(error) = Resolver::new(&mut self.interpreter).resolve(&statements) {
            eprintln!("{error}");
            self.had_error = true;
            return;
        }

        if let Err(error) = self.interpreter.interpret(&statements) {
            eprintln!("{error}");
            self.had_runtime_error = true;
        }
    }

    /// REPL hook: a bad line should not poison the next one.
    pub fn clear_error(&mut self) {
        self.had_error = false;
    }
}
