use clap::Parser;
use noms_core::{config, logging};

mod cli;

use crate::cli::Cli;

fn main() {
    let cli = Cli::parse();

    let cfg = match config::load_or_init() {
        Ok(mut cfg) => {
            cfg.debug |= cli.debug;
            cfg
        }
        Err(err) => {
            eprintln!("noms error: {:#}", err);
            std::process::exit(1);
        }
    };

    // Initialize logging as early as possible; fall back to stderr.
    if !cfg.log_to_file || logging::init_logging(cfg.debug).is_err() {
        logging::init_logging_stderr(cfg.debug);
    }
    tracing::debug!("loaded config: {:?}", cfg);

    match cli.run(&cfg) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("noms error: {:#}", err);
            std::process::exit(1);
        }
    }
}
