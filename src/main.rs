//! Opal driver.
//!
//! Usage:
//!   opal <file.opal>             # compile and run
//!   opal <file.opal> --emit-ir   # print LLVM IR to stdout
//!   opal <file.opal> --no-run    # compile and verify only
//!   opal < file.opal             # read the program from stdin
//!
//! Pipeline:  source → Lexer → Parser → AST → LLVM IR → MCJIT

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::process;

use opal::errors;
use opal::{EvalOptions, Evaluator, OpalError};

fn init_logging() {
    use std::io::IsTerminal;
    use tracing_subscriber::{fmt, EnvFilter};

    let use_ansi = env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = fmt::fmt()
        .with_env_filter(filter)
        .with_ansi(use_ansi)
        .with_writer(io::stderr)
        .with_target(true)
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() {
    init_logging();

    // ── CLI argument handling ────────────────────────────────────
    let args: Vec<String> = env::args().skip(1).collect();
    let emit_ir = args.iter().any(|a| a == "--emit-ir");
    let no_run = args.iter().any(|a| a == "--no-run");

    if let Some(unknown) = args.iter().find(|a| a.starts_with("--") && *a != "--emit-ir" && *a != "--no-run") {
        errors::warn(format!("ignoring unknown option {unknown}"));
    }
    let path = args.iter().find(|a| !a.starts_with("--"));

    // ── Read source ─────────────────────────────────────────────
    let source = match path {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|e| {
            eprintln!("\x1b[1;31merror\x1b[0m: could not read {path}: {e}");
            process::exit(1);
        }),
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("\x1b[1;31merror\x1b[0m: could not read stdin: {e}");
                process::exit(1);
            }
            buffer
        }
    };

    if let Some(path) = path {
        errors::info(format!("compiling {path}"));
    }

    // ── Evaluate ────────────────────────────────────────────────
    let evaluator = Evaluator::new(EvalOptions {
        run: !emit_ir && !no_run,
        ..EvalOptions::default()
    });

    match evaluator.evaluate(&source) {
        Ok(evaluation) => {
            if emit_ir {
                print!("{}", evaluation.ir);
            } else if let Some(output) = evaluation.output {
                print!("{output}");
            } else {
                errors::success("module verified");
            }
            let _ = io::stdout().flush();
        }
        Err(err) => fail(&err),
    }
}

fn fail(err: &OpalError) -> ! {
    errors::report(err);
    process::exit(1);
}
