use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use intake_archive::{
    ArchiveEntryValidator, ArchiveFormat, EntryMetadataSource, ExtractionSession, Limits,
    SecurityError, detect_format,
};
use zip::write::SimpleFileOptions;

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn build_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let raw: Vec<(&[u8], &[u8])> = entries
        .iter()
        .map(|(name, data)| (name.as_bytes(), *data))
        .collect();
    build_tar_raw(&raw)
}

/// Writes names straight into the header so hostile paths survive.
fn build_tar_raw(entries: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in entries {
        let mut header = tar::Header::new_gnu();
        let raw = &mut header.as_gnu_mut().unwrap().name;
        raw[..name.len()].copy_from_slice(name);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, *data).unwrap();
    }
    builder.into_inner().unwrap()
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn security_failure(err: io::Error) -> SecurityError {
    SecurityError::from_io(&err)
        .cloned()
        .unwrap_or_else(|| panic!("not a security failure: {err}"))
}

fn scan_zip(validator: &ArchiveEntryValidator, bytes: Vec<u8>) -> Result<u64, SecurityError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut session = validator.begin(archive.len())?;

    for index in 0..archive.len() {
        let file = archive.by_index(index).unwrap();
        let meta = file.entry_metadata().unwrap();
        validator.admit_entry(&meta, &mut session)?;

        let mut guarded = validator.guard_reader(file, &meta.name, &mut session);
        io::copy(&mut guarded, &mut io::sink()).map_err(security_failure)?;
    }
    Ok(session.cumulative_decompressed_bytes())
}

fn scan_tar<R: Read>(validator: &ArchiveEntryValidator, reader: R) -> Result<u64, SecurityError> {
    let mut archive = tar::Archive::new(reader);
    let mut session = ExtractionSession::new();

    for entry in archive.entries().unwrap() {
        let entry = entry.unwrap();
        let meta = entry.entry_metadata().map_err(security_failure)?;
        validator.admit_entry(&meta, &mut session)?;

        let mut guarded = validator.guard_reader(entry, &meta.name, &mut session);
        io::copy(&mut guarded, &mut io::sink()).map_err(security_failure)?;
    }
    Ok(session.cumulative_decompressed_bytes())
}

#[test]
fn clean_zip_is_accepted() {
    let bytes = build_zip(&[
        ("readme.md", b"# hello"),
        ("src/main.rs", b"fn main() {}"),
    ]);
    assert_eq!(detect_format(&bytes), Some(ArchiveFormat::Zip));
    assert_eq!(scan_zip(&ArchiveEntryValidator::default(), bytes), Ok(19));
}

#[test]
fn zip_slip_entry_is_rejected() {
    let bytes = build_zip(&[("ok.txt", b"fine"), ("../../etc/cron.d/evil", b"* * * * *")]);
    let err = scan_zip(&ArchiveEntryValidator::default(), bytes).unwrap_err();
    assert_eq!(err.kind(), "path_traversal");
}

#[test]
fn absolute_zip_entry_is_rejected() {
    let bytes = build_zip(&[("/etc/passwd", b"root:x:0:0")]);
    let err = scan_zip(&ArchiveEntryValidator::default(), bytes).unwrap_err();
    assert_eq!(err.kind(), "absolute_path");
}

#[test]
fn highly_compressed_zip_entry_is_rejected() {
    let zeros = vec![0u8; 4 * 1024 * 1024];
    let bytes = build_zip(&[("zeros.bin", &zeros)]);
    let err = scan_zip(&ArchiveEntryValidator::default(), bytes).unwrap_err();
    assert!(matches!(err, SecurityError::CompressionRatio { limit: 100, .. }));
}

#[test]
fn zip_with_too_many_entries_is_rejected_upfront() {
    let names: Vec<String> = (0..4).map(|i| format!("f{i}.txt")).collect();
    let entries: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"x"[..])).collect();
    let validator = ArchiveEntryValidator::new(Limits::default().max_entry_count(3));

    let err = scan_zip(&validator, build_zip(&entries)).unwrap_err();
    assert_eq!(err, SecurityError::TooManyEntries { count: 4, limit: 3 });
}

#[test]
fn zip_total_size_is_bounded() {
    let chunk = vec![7u8; 600];
    let bytes = build_zip(&[("a.bin", &chunk), ("b.bin", &chunk)]);
    let validator = ArchiveEntryValidator::new(
        Limits::default().max_entry_size(1000).max_total_size(1000),
    );

    let err = scan_zip(&validator, bytes).unwrap_err();
    assert_eq!(err, SecurityError::TotalSizeExceeded { total: 1001, limit: 1000 });
}

#[test]
fn clean_tar_is_accepted() {
    let bytes = build_tar(&[("docs/a.txt", b"alpha"), ("docs/b.txt", b"beta")]);
    assert_eq!(detect_format(&bytes), Some(ArchiveFormat::Tar));
    assert_eq!(scan_tar(&ArchiveEntryValidator::default(), bytes.as_slice()), Ok(9));
}

#[test]
fn duplicate_tar_entry_is_rejected() {
    let bytes = build_tar(&[("config.toml", b"a = 1"), ("./config.toml", b"a = 2")]);
    let err = scan_tar(&ArchiveEntryValidator::default(), bytes.as_slice()).unwrap_err();
    assert_eq!(err.kind(), "duplicate_entry");
}

#[test]
fn non_utf8_tar_names_are_rejected_not_merged() {
    // Both names would decode lossily to "\u{FFFD}.txt".
    let bytes = build_tar_raw(&[(b"\xff.txt", b"one"), (b"\xfe.txt", b"two")]);
    let err = scan_tar(&ArchiveEntryValidator::default(), bytes.as_slice()).unwrap_err();
    assert_eq!(err.kind(), "invalid_encoding");
    assert_eq!(err.entry_name(), Some("\u{FFFD}.txt"));
}

#[test]
fn tar_traversal_is_rejected() {
    let bytes = build_tar(&[("../outside.sh", b"#!/bin/sh")]);
    let err = scan_tar(&ArchiveEntryValidator::default(), bytes.as_slice()).unwrap_err();
    assert_eq!(err.kind(), "path_traversal");
}

#[test]
fn tar_entry_count_is_bounded_while_streaming() {
    let bytes = build_tar(&[("a", b"1"), ("b", b"2"), ("c", b"3")]);
    let validator = ArchiveEntryValidator::new(Limits::default().max_entry_count(2));
    let err = scan_tar(&validator, bytes.as_slice()).unwrap_err();
    assert_eq!(err, SecurityError::TooManyEntries { count: 3, limit: 2 });
}

#[test]
fn gzipped_tar_is_detected_and_scanned() {
    let bytes = gzip(&build_tar(&[("notes.txt", b"hello world")]));
    assert_eq!(detect_format(&bytes), Some(ArchiveFormat::TarGz));
    let scanned = scan_tar(&ArchiveEntryValidator::default(), GzDecoder::new(bytes.as_slice()));
    assert_eq!(scanned, Ok(11));
}

#[test]
fn oversized_tar_entry_is_rejected_before_streaming() {
    let data = vec![1u8; 64];
    let bytes = build_tar(&[("big.bin", &data)]);
    let validator = ArchiveEntryValidator::new(Limits::default().max_entry_size(32));
    let err = scan_tar(&validator, bytes.as_slice()).unwrap_err();
    assert_eq!(
        err,
        SecurityError::EntryTooLarge {
            name: "big.bin".to_string(),
            size: 64,
            limit: 32,
        }
    );
}

#[test]
fn admitted_names_resolve_inside_target() {
    let validator = ArchiveEntryValidator::default();
    let target = Path::new("/srv/uploads/job-42");
    let resolved = validator
        .validate_path_traversal(Path::new("src/./main.rs"), target)
        .unwrap();
    assert!(resolved.starts_with(target));
    assert!(resolved.ends_with("src/main.rs"));
}
