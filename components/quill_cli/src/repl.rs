//! Interactive session
//!
//! Reads lines with rustyline, accumulating input until delimiters
//! balance, then evaluates and echoes non-null results. Dot commands
//! cover help, screen clearing, and VM statistics.

use core_types::Value;
use interpreter::render_error;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::CliResult;
use crate::runtime::Runtime;

/// Run the interactive session until the user exits.
pub fn run(runtime: &mut Runtime) -> CliResult<()> {
    let mut editor = DefaultEditor::new()?;

    println!("Quill v{}", env!("CARGO_PKG_VERSION"));
    println!("Type code to evaluate it, '.help' for commands, 'exit' to quit.");
    println!();

    let mut buffer = String::new();
    let mut continuing = false;

    loop {
        let prompt = if continuing { "... " } else { "> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let trimmed = line.trim();

                if !continuing && (trimmed == "exit" || trimmed == "quit" || trimmed == ".exit") {
                    break;
                }
                if !continuing && trimmed.starts_with('.') {
                    handle_command(trimmed, runtime);
                    continue;
                }

                if continuing {
                    buffer.push('\n');
                }
                buffer.push_str(&line);

                if !is_input_complete(&buffer) {
                    continuing = true;
                    continue;
                }
                continuing = false;
                let _ = editor.add_history_entry(&buffer);

                match runtime.eval(&buffer) {
                    Ok(Value::Null) => {}
                    Ok(value) => match runtime.stringify(&value) {
                        Ok(text) => println!("{text}"),
                        Err(error) => eprintln!("{}", render_error(&error)),
                    },
                    Err(error) => eprintln!("{}", render_error(&error)),
                }
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                if continuing {
                    println!("^C");
                    buffer.clear();
                    continuing = false;
                } else {
                    println!("Press Ctrl-D or type 'exit' to quit");
                }
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(error) => return Err(error.into()),
        }
    }

    Ok(())
}

fn handle_command(command: &str, runtime: &mut Runtime) {
    match command {
        ".help" => {
            println!("Commands:");
            println!("  .help     show this help");
            println!("  .clear    clear the screen");
            println!("  .stats    heap and handle counts");
            println!("  .exit     leave the session");
        }
        ".clear" => {
            print!("\x1B[2J\x1B[1;1H");
        }
        ".stats" => {
            let vm = runtime.vm();
            println!(
                "{} instances, {} bytes, {} handles, {} collections",
                vm.live_instances(),
                vm.heap_bytes(),
                vm.live_handles(),
                vm.collections()
            );
        }
        _ => {
            println!("Unknown command: {command}");
            println!("Type .help for available commands");
        }
    }
}

/// Whether accumulated input should be submitted to the parser.
///
/// Counts parentheses and braces outside strings and comments; input
/// waits for more lines while any group is open. Strings cannot span
/// lines, so an unterminated string submits immediately and lets the
/// parser report it.
fn is_input_complete(input: &str) -> bool {
    let mut depth = 0i32;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => loop {
                match chars.next() {
                    Some('\\') => {
                        chars.next();
                    }
                    Some('"') | Some('\n') | None => break,
                    Some(_) => {}
                }
            },
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                let mut closed = false;
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = c;
                }
                if !closed {
                    return false;
                }
            }
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            _ => {}
        }
    }

    depth <= 0
}
