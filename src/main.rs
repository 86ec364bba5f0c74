//! Binary entry point: install the panic hook, init tracing, parse CLI
//! arguments, and dispatch to the pipeline (spec §6 "Exit code 0 on
//! successful analysis; non-zero on malformed input or unhandled internal
//! error").

use anyhow::Result;
use clap::Parser;
use contract_flow_analyzer::cli::{run, Cli};
use contract_flow_analyzer::observability::{init_tracing, install_panic_hook};

fn main() -> Result<()> {
    install_panic_hook();
    init_tracing();

    let cli = Cli::parse();
    run(&cli)?;
    Ok(())
}
