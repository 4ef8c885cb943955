//! Project-level release configuration (`extpack.json`).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assembler::MissingItemPolicy;
use crate::error::{PackageError, Result};
use crate::exclusion::{DEFAULT_EXCLUDE_PATTERNS, ExclusionFilter, ExclusionPattern};
use crate::manifest::GeckoSettings;

/// File name looked up in the project root
pub const CONFIG_FILE: &str = "extpack.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Manifest path, relative to the project root
    pub manifest_file: String,
    /// Where archives are written; relative paths resolve against the project root
    pub output_dir: PathBuf,
    pub archive_extension: String,
    /// Items every package needs
    pub base_items: Vec<String>,
    /// Documentation added to the GitHub package when present
    pub doc_items: Vec<String>,
    pub exclude: Vec<ExclusionPattern>,
    pub gecko: GeckoSettings,
    pub missing_items: MissingItemPolicy,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            manifest_file: "manifest.json".to_string(),
            output_dir: PathBuf::from("releases"),
            archive_extension: "zip".to_string(),
            base_items: vec![
                "manifest.json".to_string(),
                "icons".to_string(),
                "src".to_string(),
            ],
            doc_items: vec![
                "README.md".to_string(),
                "PRIVACY.md".to_string(),
                "LICENSE".to_string(),
                "CHANGELOG.md".to_string(),
            ],
            exclude: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| ExclusionPattern::parse(p))
                .collect(),
            gecko: GeckoSettings::default(),
            missing_items: MissingItemPolicy::default(),
        }
    }
}

impl ReleaseConfig {
    pub fn get_config_path(project_root: &Path) -> PathBuf {
        project_root.join(CONFIG_FILE)
    }

    /// Load `extpack.json` from the project root, or the defaults if there is none
    pub fn load_or_default(project_root: &Path) -> Result<Self> {
        let path = Self::get_config_path(project_root);
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&path, &content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No {} in {}, using defaults", CONFIG_FILE, project_root.display());
                Ok(Self::default())
            }
            Err(e) => Err(PackageError::Config {
                path,
                source: Box::new(e),
            }),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| PackageError::Config {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        Self::parse(path, &content)
    }

    fn parse(path: &Path, content: &str) -> Result<Self> {
        let config = serde_json::from_str(content).map_err(|e| PackageError::Config {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        debug!("Loaded release config from {}", path.display());
        Ok(config)
    }

    pub fn exclusion_filter(&self) -> ExclusionFilter {
        ExclusionFilter::new(self.exclude.clone())
    }
}
