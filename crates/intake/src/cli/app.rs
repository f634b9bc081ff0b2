use clap::{Parser, Subcommand};

use super::{check::CheckArg, limits::LimitsArg, sanitize::SanitizeArg};

#[derive(Clone, Debug, Parser)]
#[command(
    name = "intake",
    version = env!("CARGO_PKG_VERSION"),
    about,
    long_about = None,
    propagate_version = true
)]
pub struct App {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "s", name = "sanitize", about = "Print a safe storage name for each input")]
    Sanitize(SanitizeArg),
    #[command(alias = "c", name = "check", about = "Validate an archive without extracting it")]
    Check(CheckArg),
    #[command(name = "limits", about = "Print the effective limits as TOML")]
    Limits(LimitsArg),
}
