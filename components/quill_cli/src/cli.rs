//! Command-line arguments for the quill binary

use clap::Parser;

/// Run Quill scripts from files, snippets, or an interactive session.
#[derive(Debug, Parser)]
#[command(name = "quill", version, about = "The Quill scripting VM")]
pub struct Cli {
    /// Script file to run
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<String>,

    /// Script file to run, positional form
    #[arg(value_name = "SCRIPT", conflicts_with = "file")]
    pub script: Option<String>,

    /// Evaluate a snippet and print its result
    #[arg(short, long, value_name = "CODE")]
    pub eval: Option<String>,

    /// Start an interactive session
    #[arg(short, long)]
    pub repl: bool,

    /// Load a native extension library before running (repeatable)
    #[arg(long = "ext", value_name = "LIB")]
    pub extensions: Vec<String>,

    /// Emit collected diagnostics as a JSON array on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// The script path, from `--file` or the positional argument.
    pub fn script_path(&self) -> Option<&str> {
        self.file.as_deref().or(self.script.as_deref())
    }
}
