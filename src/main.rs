use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;

use rulox as lox;

use anyhow::Context;
use clap::Parser as ClapParser;

use lox::session::Lox;

#[derive(ClapParser, Debug)]
#[command(name = "lox", version, about = "Tree-walking interpreter for the Lox language", long_about = None)]
pub struct Cli {
    /// Script to execute; starts a REPL when omitted.
    scripts: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.scripts.as_slice() {
        [] => run_prompt()?,

        [script] => run_file(script)?,

        _ => {
            eprintln!("Usage: lox [script]");
            process::exit(64);
        }
    }

    Ok(())
}

fn run_file(path: &Path) -> anyhow::Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?,
    );
    reader.read_to_end(&mut buf)?;

    let mut stdout: io::Stdout = io::stdout();
    let mut session: Lox<'_, io::Stdout> = Lox::new(&mut stdout);

    session.run(&buf);

    if session.had_error {
        process::exit(65);
    }
    if session.had_runtime_error {
        process::exit(70);
    }

    Ok(())
}

fn run_prompt() -> anyhow::Result<()> {
    let mut stdout: io::Stdout = io::stdout();
    let mut session: Lox<'_, io::Stdout> = Lox::new(&mut stdout);

    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        session.run(line.as_bytes());

        // One bad line must not poison the next; runtime errors do not end
        // the session either.
        session.clear_error();
    }

    Ok(())
}
