use std::fs::File;
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::Args;
use flate2::read::GzDecoder;
use intake_archive::{
    ArchiveEntryValidator, ArchiveFormat, EntryMetadataSource, ExtractionSession, SecurityError,
    detect_from_reader,
};
use tracing::debug;

use super::ConfigArg;

#[derive(Clone, Debug, Args)]
pub struct CheckArg {
    /// Archive to validate (zip, tar or tar.gz)
    pub archive: PathBuf,
    /// Also resolve every entry under this directory
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,
    #[command(flatten)]
    pub config: ConfigArg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Summary {
    pub format: ArchiveFormat,
    pub entries: usize,
    pub bytes: u64,
}

/// Exit code 1 means the archive was rejected; I/O and parse failures
/// propagate as errors.
pub fn run(arg: &CheckArg) -> anyhow::Result<ExitCode> {
    let validator = ArchiveEntryValidator::new(arg.config.load()?);

    match scan(&validator, &arg.archive, arg.target.as_deref()) {
        Ok(summary) => {
            println!(
                "ok: {} archive, {} entries, {} bytes",
                summary.format.as_str(),
                summary.entries,
                summary.bytes
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => match err.downcast_ref::<SecurityError>() {
            Some(rejection) => {
                println!("rejected [{}]: {rejection}", rejection.kind());
                Ok(ExitCode::FAILURE)
            }
            None => Err(err),
        },
    }
}

/// Walk every entry through the validator, streaming content into a sink.
pub fn scan(
    validator: &ArchiveEntryValidator,
    path: &Path,
    target: Option<&Path>,
) -> anyhow::Result<Summary> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let Some(format) = detect_from_reader(&mut reader)? else {
        bail!("{} is not a zip, tar or tar.gz archive", path.display());
    };
    debug!(path = %path.display(), format = format.as_str(), "scanning archive");

    let session = match format {
        ArchiveFormat::Zip => scan_zip(validator, reader, target)?,
        ArchiveFormat::Tar => scan_tar(validator, reader, target)?,
        ArchiveFormat::TarGz => scan_tar(validator, GzDecoder::new(reader), target)?,
    };

    Ok(Summary {
        format,
        entries: session.entry_count(),
        bytes: session.cumulative_decompressed_bytes(),
    })
}

fn scan_zip<R: Read + Seek>(
    validator: &ArchiveEntryValidator,
    reader: R,
    target: Option<&Path>,
) -> anyhow::Result<ExtractionSession> {
    let mut archive = zip::ZipArchive::new(reader).context("reading zip central directory")?;
    let mut session = validator.begin(archive.len())?;

    for index in 0..archive.len() {
        let file = archive
            .by_index(index)
            .with_context(|| format!("reading zip entry #{index}"))?;
        check_entry(validator, file, target, &mut session)?;
    }
    Ok(session)
}

fn scan_tar<R: Read>(
    validator: &ArchiveEntryValidator,
    reader: R,
    target: Option<&Path>,
) -> anyhow::Result<ExtractionSession> {
    let mut archive = tar::Archive::new(reader);
    // Tar has no central listing; the count is enforced per admitted entry.
    let mut session = ExtractionSession::new();

    for entry in archive.entries().context("reading tar stream")? {
        let entry = entry.context("reading tar entry header")?;
        check_entry(validator, entry, target, &mut session)?;
    }
    Ok(session)
}

fn check_entry<E: Read + EntryMetadataSource>(
    validator: &ArchiveEntryValidator,
    entry: E,
    target: Option<&Path>,
    session: &mut ExtractionSession,
) -> anyhow::Result<()> {
    let meta = entry.entry_metadata().map_err(entry_error)?;
    validator.admit_entry(&meta, session)?;

    if let Some(target) = target {
        let destination = validator.validate_path_traversal(Path::new(&meta.name), target)?;
        debug!(destination = %destination.display(), "entry resolved");
    }

    let mut guarded = validator.guard_reader(entry, &meta.name, session);
    io::copy(&mut guarded, &mut io::sink()).map_err(entry_error)?;
    Ok(())
}

/// Keep security failures downcastable; everything else is plain I/O.
fn entry_error(err: io::Error) -> anyhow::Error {
    match SecurityError::from_io(&err) {
        Some(rejection) => rejection.clone().into(),
        None => anyhow::Error::new(err).context("reading archive entry"),
    }
}
