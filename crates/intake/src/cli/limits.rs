use clap::Args;
use intake_config::Limits;

use super::ConfigArg;

#[derive(Clone, Debug, Args)]
pub struct LimitsArg {
    #[command(flatten)]
    pub config: ConfigArg,
}

pub fn run(arg: &LimitsArg) -> anyhow::Result<()> {
    print!("{}", render(&arg.config.load()?)?);
    Ok(())
}

fn render(limits: &Limits) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(limits)?)
}
