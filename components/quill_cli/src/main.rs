//! Quill CLI entry point
//!
//! Parses arguments, prepares a runtime, and dispatches to file
//! execution, snippet evaluation, or the REPL. The exit code follows
//! the run status: 0 on success, 65 for compile errors, 70 for runtime
//! errors.

use clap::Parser;
use core_types::{RunStatus, Value};
use quill_cli::runtime::{diagnostics_json, exit_code, EXIT_RUNTIME};
use quill_cli::{repl, Cli, Runtime};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    std::process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let mut runtime = match Runtime::new(cli.json) {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("quill: {error}");
            return EXIT_RUNTIME;
        }
    };

    for path in &cli.extensions {
        if runtime.load_extension(path).is_err() {
            return finish(&runtime, cli, EXIT_RUNTIME);
        }
    }

    if let Some(path) = cli.script_path() {
        let status = runtime.run_file(path);
        return finish(&runtime, cli, exit_code(status));
    }

    if let Some(code) = &cli.eval {
        let status = eval_and_print(&mut runtime, code);
        return finish(&runtime, cli, exit_code(status));
    }

    if cli.repl {
        return match repl::run(&mut runtime) {
            Ok(()) => finish(&runtime, cli, 0),
            Err(error) => {
                eprintln!("quill: {error}");
                finish(&runtime, cli, EXIT_RUNTIME)
            }
        };
    }

    println!("Quill scripting VM v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  quill <SCRIPT>          Run a script file");
    println!("  quill --eval <CODE>     Evaluate a snippet");
    println!("  quill --repl            Start an interactive session");
    println!();
    println!("Run 'quill --help' for more options.");
    finish(&runtime, cli, 0)
}

/// Evaluate a snippet, echoing a non-null result to stdout.
fn eval_and_print(runtime: &mut Runtime, code: &str) -> RunStatus {
    match runtime.eval(code) {
        Ok(Value::Null) => RunStatus::Success,
        Ok(value) => match runtime.stringify(&value) {
            Ok(text) => {
                println!("{text}");
                RunStatus::Success
            }
            Err(error) => runtime.report(&error),
        },
        Err(error) => runtime.report(&error),
    }
}

fn finish(runtime: &Runtime, cli: &Cli, code: i32) -> i32 {
    if cli.json {
        println!("{}", diagnostics_json(&runtime.diagnostics()));
    }
    code
}
