use std::io::{self, Write};

use clap::Args;
use intake_filename::FilenameSanitizer;

use super::ConfigArg;

#[derive(Clone, Debug, Args)]
pub struct SanitizeArg {
    /// Client-supplied filenames, printed back one per line
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,
    #[command(flatten)]
    pub config: ConfigArg,
}

pub fn run(arg: &SanitizeArg) -> anyhow::Result<()> {
    let sanitizer = FilenameSanitizer::new(&arg.config.load()?);
    let mut out = io::stdout().lock();
    write_sanitized(&sanitizer, &arg.names, &mut out)?;
    Ok(())
}

fn write_sanitized<W: Write>(
    sanitizer: &FilenameSanitizer,
    names: &[String],
    out: &mut W,
) -> io::Result<()> {
    for name in names {
        writeln!(out, "{}", sanitizer.sanitize(name))?;
    }
    out.flush()
}
