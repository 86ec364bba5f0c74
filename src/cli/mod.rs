//! Command-line surface (spec §6).

mod args;
mod commands;

pub use args::{Cli, DomainArg};
pub use commands::run;
