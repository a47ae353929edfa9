#![cfg(not(test))]

#[macro_use]
extern crate serde_derive;

use std::process::exit;
use std::sync::Arc;

use akl_engine::machine::{Machine, Solution};
use akl_engine::program::{load_file, Program};
use akl_ir::write::print_term;
use docopt::Docopt;
use failure::Fallible;
use rustyline::error::ReadlineError;

const USAGE: &str = "
akl interpreter

Usage:
  akl [options] [<file>...]
  akl (-h | --help)

Options:
  -h, --help     Show this screen.
  -e GOAL        Execute one query and exit.
  --all          Enumerate all solutions rather than prompt.
";

#[derive(Debug, Deserialize)]
struct Args {
    arg_file: Vec<String>,
    flag_e: Option<String>,
    flag_all: bool,
}

/// Exit status per query: 0 for `yes`, 1 for `no`, 2 for a parse or
/// internal error.
fn run() -> Fallible<i32> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("AKL_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    let mut program = Program::new();
    for path in &args.arg_file {
        load_file(&mut program, path)?;
        println!("% Loaded {}", path);
    }
    let program = Arc::new(program);

    if let Some(goal) = &args.flag_e {
        let goal = goal.trim_end_matches('.');
        return execute_query(&program, goal, args.flag_all, None);
    }

    let mut editor = rustyline::Editor::<()>::new();
    loop {
        match editor.readline("?- ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line);
                let goal = line.trim_end_matches('.');
                match execute_query(&program, goal, args.flag_all, Some(&mut editor)) {
                    Ok(_) => {}
                    Err(e) => eprintln!("error: {}", e),
                }
            }

            // EOF ends the session.
            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => break,

            Err(e) => Err(e)?,
        }
    }

    Ok(0)
}

/// Solves one goal, printing bindings the classic way: each solution's
/// bindings, then `yes` or `no`. Interactively, `;` asks for the next
/// solution; with `--all` every solution prints unprompted.
fn execute_query(
    program: &Arc<Program>,
    goal: &str,
    all: bool,
    mut editor: Option<&mut rustyline::Editor<()>>,
) -> Fallible<i32> {
    let mut machine = match Machine::from_source(program.clone(), goal) {
        Ok(machine) => machine,
        Err(e) => {
            println!("Syntax error: {}", e);
            return Ok(2);
        }
    };

    let mut count = 0;
    while let Some(solution) = machine.next_solution() {
        count += 1;
        if count == 1 {
            println!();
        }
        print!("{}", format_solution(&machine, &solution));

        if all {
            println!(" ;");
            continue;
        }

        match editor.as_mut() {
            Some(editor) => match editor.readline(" ? ") {
                Ok(reply) if reply.trim() == ";" => continue,
                _ => break,
            },
            None => break,
        }
    }

    if let Some(code) = machine.halted() {
        exit(code);
    }

    println!();
    if count > 0 {
        println!("yes");
        Ok(0)
    } else {
        println!("no");
        Ok(1)
    }
}

fn format_solution(machine: &Machine, solution: &Solution) -> String {
    if solution.bindings.is_empty() {
        return "true".to_string();
    }
    solution
        .bindings
        .iter()
        .map(|(name, term)| format!("{} = {}", name, print_term(&machine.heap, term)))
        .collect::<Vec<_>>()
        .join(",\n")
}

fn main() {
    exit(match run() {
        Ok(code) => code,
        Err(ref e) => {
            eprintln!("error: {}", e);
            2
        }
    });
}
