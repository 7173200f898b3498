//! Shared-task scorer CLI.
//!
//! Usage:
//!   medeval -r <reference.tsv> -p <predictions.tsv> [-o <results>]
//!
//! See `medeval --help` for the full option list.

use clap::Parser;
use medeval::cli::{run, Cli};
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
