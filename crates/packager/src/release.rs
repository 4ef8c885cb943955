//! Release recipes for the Chrome Web Store, Firefox Add-ons and GitHub Releases.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::archive::ArchiveReport;
use crate::assembler::{PackageAssembler, PackageSpec};
use crate::config::ReleaseConfig;
use crate::error::{PackageError, Result};
use crate::exclusion::ExclusionFilter;
use crate::manifest::{BumpKind, Manifest, VersionBump, write_pretty_json};

/// A distribution target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Chrome,
    Firefox,
    Github,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Chrome, Channel::Firefox, Channel::Github];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Chrome => "chrome",
            Channel::Firefox => "firefox",
            Channel::Github => "github",
        }
    }

    /// Suffix added after the version in the archive name
    pub fn archive_suffix(&self) -> Option<&'static str> {
        match self {
            Channel::Chrome => Some("-chrome"),
            Channel::Firefox => Some("-firefox"),
            Channel::Github => None,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One produced package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildResult {
    pub channel: Channel,
    pub path: PathBuf,
    pub size: u64,
    pub entries: Vec<String>,
}

impl BuildResult {
    fn from_report(channel: Channel, report: ArchiveReport) -> Self {
        Self {
            channel,
            path: report.path,
            size: report.size,
            entries: report.entries,
        }
    }
}

/// Everything a caller needs to report on a release run
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub name: String,
    pub slug: String,
    pub version: String,
    pub description: String,
    pub output_dir: PathBuf,
    pub packages: BTreeMap<Channel, BuildResult>,
}

impl BuildSummary {
    pub fn package(&self, channel: Channel) -> Option<&BuildResult> {
        self.packages.get(&channel)
    }
}

/// Builds release packages for one extension project.
///
/// Owns the project's manifest for the duration of the run; the manifest is
/// only written back through [`ReleaseBuilder::bump_version`].
pub struct ReleaseBuilder {
    project_root: PathBuf,
    output_dir: PathBuf,
    config: ReleaseConfig,
    filter: ExclusionFilter,
    manifest: Manifest,
    scratch_root: PathBuf,
}

impl ReleaseBuilder {
    /// Open a project using its `extpack.json`, or the defaults
    pub fn new<P: AsRef<Path>>(project_root: P) -> Result<Self> {
        let config = ReleaseConfig::load_or_default(project_root.as_ref())?;
        Self::with_config(project_root, config)
    }

    pub fn with_config<P: AsRef<Path>>(project_root: P, config: ReleaseConfig) -> Result<Self> {
        let project_root = project_root.as_ref().to_path_buf();
        let manifest = Manifest::load(project_root.join(&config.manifest_file))?;
        let output_dir = project_root.join(&config.output_dir);
        let filter = config.exclusion_filter();

        Ok(Self {
            project_root,
            output_dir,
            config,
            filter,
            manifest,
            scratch_root: std::env::temp_dir(),
        })
    }

    /// Create Firefox scratch directories under `dir` instead of the system temp dir
    pub fn with_scratch_root<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_root = dir.into();
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Bump the manifest version and persist it before any package is built
    pub fn bump_version(&mut self, kind: BumpKind) -> Result<VersionBump> {
        self.manifest.bump_version(kind)
    }

    /// The file set of a channel
    pub fn recipe(&self, channel: Channel) -> PackageSpec {
        let mut spec = PackageSpec::new().with_required(self.config.base_items.iter().cloned());
        if channel == Channel::Github {
            spec = spec.with_optional(self.config.doc_items.iter().cloned());
        }
        if let Some(suffix) = channel.archive_suffix() {
            spec = spec.with_suffix(suffix);
        }
        spec
    }

    pub fn archive_path(&self, channel: Channel) -> PathBuf {
        let name = self.recipe(channel).archive_name(
            &self.manifest.slug(),
            self.manifest.version(),
            &self.config.archive_extension,
        );
        self.output_dir.join(name)
    }

    fn assembler(&self, root: &Path) -> PackageAssembler<'_> {
        PackageAssembler::new(root, &self.filter).with_missing_items(self.config.missing_items)
    }

    pub fn build(&self, channel: Channel) -> Result<BuildResult> {
        match channel {
            Channel::Chrome => self.build_chrome(),
            Channel::Firefox => self.build_firefox(),
            Channel::Github => self.build_github(),
        }
    }

    /// Minimal package for the Chrome Web Store
    pub fn build_chrome(&self) -> Result<BuildResult> {
        self.build_from_project(Channel::Chrome)
    }

    /// Chrome files plus whatever documentation exists, for GitHub Releases
    pub fn build_github(&self) -> Result<BuildResult> {
        self.build_from_project(Channel::Github)
    }

    fn build_from_project(&self, channel: Channel) -> Result<BuildResult> {
        let report = self
            .assembler(&self.project_root)
            .build_archive(&self.recipe(channel), &self.archive_path(channel))?;
        Ok(BuildResult::from_report(channel, report))
    }

    /// Package for Firefox Add-ons.
    ///
    /// The base items are staged in a scratch directory where the manifest is
    /// replaced by its Firefox variant; the archive is built from that directory.
    /// The scratch directory is removed on every exit path.
    pub fn build_firefox(&self) -> Result<BuildResult> {
        let scratch = tempfile::Builder::new()
            .prefix("extpack-firefox-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| PackageError::io("create scratch directory", &self.scratch_root, e))?;

        let mut spec = self.recipe(Channel::Firefox);
        self.assembler(&self.project_root)
            .copy_to(&spec, scratch.path())?;

        let manifest_path = scratch.path().join(&self.config.manifest_file);
        if let Some(parent) = manifest_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PackageError::io("create directory", parent, e))?;
        }
        let firefox_manifest = self.manifest.to_firefox_manifest(&self.config.gecko);
        write_pretty_json(&manifest_path, &firefox_manifest)
            .map_err(|e| PackageError::io("write firefox manifest", &manifest_path, e))?;

        if !spec.contains(&self.config.manifest_file) {
            spec = spec.with_required([self.config.manifest_file.clone()]);
        }
        // Missing items were already reported while staging
        let report = self
            .assembler(scratch.path())
            .build_archive(&spec.as_optional(), &self.archive_path(Channel::Firefox))?;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(
                "Failed to remove scratch directory {}: {}",
                scratch_path.display(),
                e
            );
        }

        Ok(BuildResult::from_report(Channel::Firefox, report))
    }

    /// Build Chrome and GitHub packages, and the Firefox package if requested
    pub fn build_all(&self, include_firefox: bool) -> Result<BuildSummary> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| PackageError::io("create output directory", &self.output_dir, e))?;

        let mut channels = vec![Channel::Chrome, Channel::Github];
        if include_firefox {
            channels.push(Channel::Firefox);
        }

        let mut packages = BTreeMap::new();
        for channel in channels {
            let result = self.build(channel)?;
            packages.insert(channel, result);
        }

        info!(
            "Built {} packages for {} v{}",
            packages.len(),
            self.manifest.name(),
            self.manifest.version()
        );

        Ok(BuildSummary {
            name: self.manifest.name().to_string(),
            slug: self.manifest.slug(),
            version: self.manifest.version().to_string(),
            description: self.manifest.description().to_string(),
            output_dir: self.output_dir.clone(),
            packages,
        })
    }
}
