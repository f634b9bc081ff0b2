pub mod app;
pub mod check;
pub mod limits;
pub mod sanitize;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use intake_config::Limits;

/// Shared `--config` flag.
#[derive(Clone, Debug, Default, Args)]
pub struct ConfigArg {
    /// TOML file overriding the default limits
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ConfigArg {
    pub fn load(&self) -> anyhow::Result<Limits> {
        let limits = Limits::load(self.config.as_deref());
        match &self.config {
            Some(path) => limits.with_context(|| format!("loading limits from {}", path.display())),
            None => limits.context("loading limits"),
        }
    }
}
