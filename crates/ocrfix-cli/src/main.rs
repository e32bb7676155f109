//! `ocrfix`: offline tools for page annotation JSON.
//!
//! Reads a page document (`{annotations, updated_at}`) from stdin and
//! writes the result of one subcommand to stdout.

mod commands;

use clap::Parser;
use commands::{Cli, CliError};
use ocrfix_core::EditorConfig;
use std::io::Read;
use std::path::Path;

fn load_config(path: Option<&Path>) -> Result<EditorConfig, CliError> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            Ok(EditorConfig::from_json(&json)?)
        }
        None => Ok(EditorConfig::default()),
    }
}

fn run(cli: &Cli) -> Result<String, CliError> {
    let config = load_config(cli.config.as_deref())?;
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    commands::execute(&cli.command, &config, &input)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("ocrfix: {e}");
            std::process::exit(1);
        }
    }
}
