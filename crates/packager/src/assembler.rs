//! Package assembly: resolve declared items, walk them, apply exclusions.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::archive::{ArchiveReport, ArchiveWriter, normalize_entry_name};
use crate::error::{PackageError, Result};
use crate::exclusion::ExclusionFilter;

/// What to do when a required item does not exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum MissingItemPolicy {
    /// Log a warning and build the package without the item
    #[default]
    Warn,
    /// Abort the build with [`PackageError::MissingSourceItem`]
    Fail,
}

/// A root-relative file or directory declared for a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageItem {
    pub name: String,
    /// Optional items are skipped quietly when absent
    pub required: bool,
}

impl PackageItem {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
        }
    }
}

/// The inputs of one build recipe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSpec {
    pub items: Vec<PackageItem>,
    /// Appended to `<slug>-v<version>` in the archive name
    pub suffix: Option<String>,
}

impl PackageSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items
            .extend(names.into_iter().map(PackageItem::required));
        self
    }

    pub fn with_optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items
            .extend(names.into_iter().map(PackageItem::optional));
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Same items, none of them required
    pub fn as_optional(&self) -> Self {
        Self {
            items: self
                .items
                .iter()
                .map(|item| PackageItem::optional(item.name.clone()))
                .collect(),
            suffix: self.suffix.clone(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    /// `<slug>-v<version><suffix>.<extension>`
    pub fn archive_name(&self, slug: &str, version: &str, extension: &str) -> String {
        format!(
            "{}-v{}{}.{}",
            slug,
            version,
            self.suffix.as_deref().unwrap_or(""),
            extension
        )
    }
}

/// A file selected for a package and the entry name it is stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub source: PathBuf,
    pub name: String,
}

/// Turns a [`PackageSpec`] into the concrete set of files below a root directory
pub struct PackageAssembler<'a> {
    root: PathBuf,
    filter: &'a ExclusionFilter,
    missing_items: MissingItemPolicy,
}

impl<'a> PackageAssembler<'a> {
    pub fn new<P: AsRef<Path>>(root: P, filter: &'a ExclusionFilter) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            filter,
            missing_items: MissingItemPolicy::default(),
        }
    }

    pub fn with_missing_items(mut self, policy: MissingItemPolicy) -> Self {
        self.missing_items = policy;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve every item of `spec` into the files that belong in the package.
    ///
    /// Excluded subtrees are pruned from the walk. Directory walks are sorted by
    /// file name, so the result is stable across runs. Items that overlap yield
    /// each entry name once, at its first position.
    pub fn collect(&self, spec: &PackageSpec) -> Result<Vec<PackageEntry>> {
        let mut entries = Vec::new();

        for item in &spec.items {
            let name = normalize_entry_name(&item.name)?;
            if self.filter.should_exclude(Path::new(&name)) {
                debug!("Item '{}' is excluded", name);
                continue;
            }

            let source = self.root.join(&name);
            let metadata = match fs::metadata(&source) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    self.handle_missing(item)?;
                    continue;
                }
                Err(e) => return Err(PackageError::io("inspect item", source, e)),
            };

            if metadata.is_file() {
                entries.push(PackageEntry { source, name });
            } else if metadata.is_dir() {
                self.collect_dir(&source, &name, &mut entries)?;
            }
        }

        let mut seen = BTreeSet::new();
        entries.retain(|entry| {
            let first = seen.insert(entry.name.clone());
            if !first {
                debug!("Skipping duplicate entry '{}'", entry.name);
            }
            first
        });

        Ok(entries)
    }

    fn collect_dir(&self, dir: &Path, item: &str, entries: &mut Vec<PackageEntry>) -> Result<()> {
        let relative = |path: &Path| -> PathBuf {
            Path::new(item).join(path.strip_prefix(dir).unwrap_or(path))
        };

        let walker = WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let excluded = self.filter.should_exclude(&relative(entry.path()));
                if excluded {
                    debug!("Pruned {}", entry.path().display());
                }
                !excluded
            });

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let name = relative(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(PackageEntry {
                source: entry.into_path(),
                name,
            });
        }

        Ok(())
    }

    fn handle_missing(&self, item: &PackageItem) -> Result<()> {
        if !item.required {
            debug!("Skipping missing optional item '{}'", item.name);
            return Ok(());
        }

        match self.missing_items {
            MissingItemPolicy::Warn => {
                warn!(
                    "Item '{}' does not exist under {}; the package will not contain it",
                    item.name,
                    self.root.display()
                );
                Ok(())
            }
            MissingItemPolicy::Fail => Err(PackageError::MissingSourceItem {
                name: item.name.clone(),
            }),
        }
    }

    /// Write the package described by `spec` to `archive_path`
    pub fn build_archive(&self, spec: &PackageSpec, archive_path: &Path) -> Result<ArchiveReport> {
        let entries = self.collect(spec)?;

        let mut writer = ArchiveWriter::create(archive_path)?;
        for entry in &entries {
            writer.add_file(&entry.source, &entry.name)?;
        }
        let report = writer.finish()?;

        info!(
            "Created {} ({} entries, {} bytes)",
            report.path.display(),
            report.entries.len(),
            report.size
        );
        Ok(report)
    }

    /// Copy the package described by `spec` into `destination`, keeping entry paths
    pub fn copy_to(&self, spec: &PackageSpec, destination: &Path) -> Result<Vec<PackageEntry>> {
        let entries = self.collect(spec)?;

        for entry in &entries {
            let target = destination.join(&entry.name);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| PackageError::io("create directory", parent, e))?;
            }
            fs::copy(&entry.source, &target)
                .map_err(|e| PackageError::io("copy file", &entry.source, e))?;
        }

        debug!(
            "Copied {} files into {}",
            entries.len(),
            destination.display()
        );
        Ok(entries)
    }
}
