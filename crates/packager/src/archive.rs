//! Zip archive output.
//!
//! An [`ArchiveWriter`] streams entries into a temporary file next to the target
//! and only moves it into place in [`ArchiveWriter::finish`]. A writer dropped
//! before finishing takes its temporary file with it, so the target path never
//! holds a partially written archive.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{PackageError, Result};

/// A finished archive on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    pub path: PathBuf,
    pub size: u64,
    pub entries: Vec<String>,
}

pub struct ArchiveWriter {
    target: PathBuf,
    writer: ZipWriter<NamedTempFile>,
    options: SimpleFileOptions,
    entries: Vec<String>,
}

impl ArchiveWriter {
    /// Start a new archive at `target`, removing any archive already there.
    ///
    /// Fails with [`PackageError::ArchiveLocked`] when the old archive cannot be
    /// removed, typically because another program holds it open.
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        remove_existing(&target)?;

        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let staging = tempfile::Builder::new()
            .prefix(".extpack-")
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|e| PackageError::io("create archive", &target, e))?;

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);

        Ok(Self {
            target,
            writer: ZipWriter::new(staging),
            options,
            entries: Vec::new(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Entry names written so far
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Copy the file at `source` into the archive as `name`
    pub fn add_file(&mut self, source: &Path, name: &str) -> Result<()> {
        let name = normalize_entry_name(name)?;
        let mut file =
            File::open(source).map_err(|e| PackageError::io("open source file", source, e))?;

        self.writer.start_file(name.as_str(), self.options)?;
        io::copy(&mut file, &mut self.writer)
            .map_err(|e| PackageError::io("write archive entry", source, e))?;

        debug!("Added {} as {}", source.display(), name);
        self.entries.push(name);
        Ok(())
    }

    /// Write the central directory and move the archive to its target path
    pub fn finish(self) -> Result<ArchiveReport> {
        let ArchiveWriter {
            target,
            writer,
            entries,
            ..
        } = self;

        let staging = writer.finish()?;
        staging
            .persist(&target)
            .map_err(|e| PackageError::ArchiveLocked {
                path: target.clone(),
                source: e.error,
            })?;

        let size = fs::metadata(&target)
            .map_err(|e| PackageError::io("stat archive", &target, e))?
            .len();

        Ok(ArchiveReport {
            path: target,
            size,
            entries,
        })
    }
}

fn remove_existing(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed previous archive {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(PackageError::ArchiveLocked {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Turn `name` into a relative, `/`-separated entry name.
///
/// Absolute names, drive prefixes and `..` segments are rejected; `.` and empty
/// segments are dropped.
pub fn normalize_entry_name(name: &str) -> Result<String> {
    let invalid = || PackageError::InvalidEntryName {
        name: name.to_string(),
    };

    let unified = name.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(invalid());
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(invalid()),
            s if s.contains(':') => return Err(invalid()),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(invalid());
    }
    Ok(segments.join("/"))
}
