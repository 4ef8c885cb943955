//! Extension manifest model.
//!
//! The manifest is kept as an ordered JSON object so that persisting a version
//! bump rewrites the file with its keys in their original order. Everything except
//! the handful of derived attributes is treated as opaque and passed through.

use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::error::{PackageError, Result};

/// Name used when the manifest has no `name` string.
pub const DEFAULT_NAME: &str = "extension";

/// Version used when the manifest has no `version` string.
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Which component of the version a bump increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl BumpKind {
    /// Fails with [`PackageError::InvalidVersion`] when the bumped component is already `u64::MAX`
    pub fn apply(self, version: &Version) -> Result<Version> {
        let overflow = || PackageError::InvalidVersion {
            version: version.to_string(),
            reason: format!("{} component cannot be incremented", self),
        };

        let bumped = match self {
            BumpKind::Major => {
                Version::new(version.major.checked_add(1).ok_or_else(overflow)?, 0, 0)
            }
            BumpKind::Minor => Version::new(
                version.major,
                version.minor.checked_add(1).ok_or_else(overflow)?,
                0,
            ),
            BumpKind::Patch => Version::new(
                version.major,
                version.minor,
                version.patch.checked_add(1).ok_or_else(overflow)?,
            ),
        };
        Ok(bumped)
    }
}

impl Display for BumpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BumpKind::Major => write!(f, "major"),
            BumpKind::Minor => write!(f, "minor"),
            BumpKind::Patch => write!(f, "patch"),
        }
    }
}

impl FromStr for BumpKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(BumpKind::Major),
            "minor" => Ok(BumpKind::Minor),
            "patch" => Ok(BumpKind::Patch),
            other => Err(format!("Unknown bump kind: {}", other)),
        }
    }
}

/// Outcome of a version bump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionBump {
    pub old: String,
    pub new: String,
}

/// Firefox-only settings injected under `browser_specific_settings.gecko`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeckoSettings {
    pub id: String,
    pub strict_min_version: String,
}

impl Default for GeckoSettings {
    fn default() -> Self {
        Self {
            id: "youtube-auto-like@fastfingertips".to_string(),
            strict_min_version: "109.0".to_string(),
        }
    }
}

/// An extension manifest loaded from disk.
///
/// The document is owned by this value for the whole build; the only write back
/// to storage happens through [`Manifest::save`].
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    data: Map<String, Value>,
}

impl Manifest {
    /// Load and parse a manifest file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PackageError::ManifestNotFound { path });
            }
            Err(e) => return Err(PackageError::io("read manifest", path, e)),
        };

        let value: Value =
            serde_json::from_str(&content).map_err(|source| PackageError::ManifestParse {
                path: path.clone(),
                source,
            })?;

        debug!("Loaded manifest from {}", path.display());
        Self::from_value(path, value)
    }

    /// Wrap an already parsed document; `path` is where [`Manifest::save`] writes to.
    pub fn from_value<P: Into<PathBuf>>(path: P, value: Value) -> Result<Self> {
        let path = path.into();
        match value {
            Value::Object(data) => Ok(Self { path, data }),
            _ => Err(PackageError::ManifestNotObject { path }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn name(&self) -> &str {
        self.get_str("name").unwrap_or(DEFAULT_NAME)
    }

    /// URL-friendly name (lowercase, hyphenated)
    pub fn slug(&self) -> String {
        slugify(self.name())
    }

    pub fn version(&self) -> &str {
        self.get_str("version").unwrap_or(DEFAULT_VERSION)
    }

    pub fn description(&self) -> &str {
        self.get_str("description").unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Get any manifest property, falling back to `default` when absent
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.data.get(key).unwrap_or(default)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// Replace the version in memory. Call [`Manifest::save`] to persist it.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.data
            .insert("version".to_string(), Value::String(version.into()));
    }

    /// Write the whole document back to its source file
    pub fn save(&self) -> Result<()> {
        write_pretty_json(&self.path, &self.data).map_err(|source| {
            PackageError::ManifestPersist {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!("Saved manifest to {}", self.path.display());
        Ok(())
    }

    /// Increment the version and persist the manifest immediately.
    ///
    /// Missing trailing components count as `0`; components past the third are
    /// dropped. The document is left untouched if the current version is invalid.
    pub fn bump_version(&mut self, kind: BumpKind) -> Result<VersionBump> {
        let old = self.version().to_string();
        let new = kind.apply(&parse_version(&old)?)?.to_string();

        self.set_version(new.clone());
        self.save()?;

        info!("Bumped {} version: {} -> {}", kind, old, new);
        Ok(VersionBump { old, new })
    }

    /// Build the Firefox variant of this manifest.
    ///
    /// `background.service_worker` becomes a single-element `background.scripts`
    /// array and `browser_specific_settings.gecko` is set. `self` is not modified.
    pub fn to_firefox_manifest(&self, gecko: &GeckoSettings) -> Value {
        let mut data = self.data.clone();

        if let Some(Value::Object(background)) = data.get_mut("background") {
            if let Some(worker) = background.remove("service_worker") {
                background.insert("scripts".to_string(), Value::Array(vec![worker]));
            }
        }

        data.insert(
            "browser_specific_settings".to_string(),
            json!({
                "gecko": {
                    "id": gecko.id,
                    "strict_min_version": gecko.strict_min_version,
                }
            }),
        );

        Value::Object(data)
    }
}

/// Lowercase `name` and collapse every run of characters outside `[a-z0-9]` into
/// a single hyphen, without leading or trailing hyphens.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Parse a dotted version into a `major.minor.patch` triple
pub fn parse_version(version: &str) -> Result<Version> {
    let invalid = |reason: String| PackageError::InvalidVersion {
        version: version.to_string(),
        reason,
    };

    let mut parts = [0u64; 3];
    for (index, part) in version.split('.').enumerate() {
        if !part.chars().all(|c| c.is_ascii_digit()) || part.is_empty() {
            return Err(invalid(format!("component '{}' is not a number", part)));
        }
        if index >= parts.len() {
            debug!("Ignoring extra version component '{}' in {}", part, version);
            continue;
        }
        parts[index] = part
            .parse()
            .map_err(|e| invalid(format!("component '{}': {}", part, e)))?;
    }

    Ok(Version::new(parts[0], parts[1], parts[2]))
}

/// Write `value` as JSON indented with four spaces, with a trailing newline
pub(crate) fn write_pretty_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer).map_err(io::Error::from)?;
    buffer.push(b'\n');
    fs::write(path, buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, value: &Value) -> PathBuf {
        let path = dir.path().join("manifest.json");
        fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    fn in_memory(value: Value) -> Manifest {
        Manifest::from_value("manifest.json", value).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Cool Ext!"), "my-cool-ext");
        assert_eq!(slugify("  YouTube -- Auto Like  "), "youtube-auto-like");
        assert_eq!(slugify("already-a-slug"), "already-a-slug");
        assert_eq!(slugify("Ünïcode Näme 2"), "n-code-n-me-2");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_derived_attributes_defaults() {
        let manifest = in_memory(json!({}));

        assert_eq!(manifest.name(), DEFAULT_NAME);
        assert_eq!(manifest.slug(), "extension");
        assert_eq!(manifest.version(), DEFAULT_VERSION);
        assert_eq!(manifest.description(), "");
        assert_eq!(manifest.get("permissions"), None);
        assert_eq!(manifest.get_or("permissions", &json!([])), &json!([]));
    }

    #[test]
    fn test_parse_version_pads_and_truncates() {
        assert_eq!(parse_version("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_version("3").unwrap(), Version::new(3, 0, 0));
        assert_eq!(parse_version("1.2.3.4").unwrap(), Version::new(1, 2, 3));
        assert!(parse_version("1.x.0").is_err());
        assert!(parse_version("").is_err());
        assert!(parse_version("1.+2.0").is_err());
    }

    #[test]
    fn test_bump_table() {
        let cases = [
            ("1.2.1", BumpKind::Patch, "1.2.2"),
            ("1.2.1", BumpKind::Minor, "1.3.0"),
            ("1.2.1", BumpKind::Major, "2.0.0"),
            ("1.2", BumpKind::Patch, "1.2.1"),
        ];

        for (old, kind, new) in cases {
            let bumped = kind.apply(&parse_version(old).unwrap()).unwrap();
            assert_eq!(bumped.to_string(), new, "{} + {}", old, kind);
        }
    }

    #[test]
    fn test_bump_version_persists_document() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            &json!({"name": "Ext", "version": "1.2.1", "permissions": ["storage"]}),
        );

        let mut manifest = Manifest::load(&path).unwrap();
        let bump = manifest.bump_version(BumpKind::Minor).unwrap();

        assert_eq!(
            bump,
            VersionBump {
                old: "1.2.1".to_string(),
                new: "1.3.0".to_string()
            }
        );
        assert_eq!(manifest.version(), "1.3.0");

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(reloaded.version(), "1.3.0");
        assert_eq!(reloaded.get("permissions"), Some(&json!(["storage"])));
    }

    #[test]
    fn test_save_preserves_key_order_and_indent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        fs::write(
            &path,
            r#"{"version": "1.0.0", "name": "Ext", "description": "d"}"#,
        )
        .unwrap();

        let mut manifest = Manifest::load(&path).unwrap();
        manifest.bump_version(BumpKind::Patch).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\n    \"version\": \"1.0.1\",\n    \"name\": \"Ext\",\n    \"description\": \"d\"\n}\n"
        );
    }

    #[test]
    fn test_invalid_version_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, &json!({"name": "Ext", "version": "beta"}));
        let before = fs::read_to_string(&path).unwrap();

        let mut manifest = Manifest::load(&path).unwrap();
        let err = manifest.bump_version(BumpKind::Patch).unwrap_err();

        assert!(matches!(err, PackageError::InvalidVersion { .. }));
        assert_eq!(manifest.version(), "beta");
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_load_errors() {
        let dir = TempDir::new().unwrap();

        let missing = Manifest::load(dir.path().join("manifest.json")).unwrap_err();
        assert!(matches!(missing, PackageError::ManifestNotFound { .. }));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            Manifest::load(&broken).unwrap_err(),
            PackageError::ManifestParse { .. }
        ));

        let array = dir.path().join("array.json");
        fs::write(&array, "[1, 2]").unwrap();
        assert!(matches!(
            Manifest::load(&array).unwrap_err(),
            PackageError::ManifestNotObject { .. }
        ));
    }

    #[test]
    fn test_firefox_manifest_transform() {
        let manifest = in_memory(json!({"background": {"service_worker": "bg.js"}}));
        let gecko = GeckoSettings::default();

        let firefox = manifest.to_firefox_manifest(&gecko);

        assert_eq!(
            firefox,
            json!({
                "background": {"scripts": ["bg.js"]},
                "browser_specific_settings": {
                    "gecko": {
                        "id": gecko.id,
                        "strict_min_version": "109.0"
                    }
                }
            })
        );
        assert_eq!(
            manifest.get("background"),
            Some(&json!({"service_worker": "bg.js"}))
        );
        assert!(manifest.get("browser_specific_settings").is_none());
    }

    #[test]
    fn test_firefox_manifest_without_service_worker() {
        let manifest = in_memory(json!({
            "name": "Ext",
            "background": {"scripts": ["a.js"]},
            "browser_specific_settings": {"gecko": {"id": "old@id"}}
        }));
        let gecko = GeckoSettings {
            id: "new@id".to_string(),
            strict_min_version: "115.0".to_string(),
        };

        let firefox = manifest.to_firefox_manifest(&gecko);

        assert_eq!(firefox["background"], json!({"scripts": ["a.js"]}));
        assert_eq!(
            firefox["browser_specific_settings"]["gecko"]["id"],
            json!("new@id")
        );
        assert_eq!(firefox["name"], json!("Ext"));
    }

    fn is_well_formed_slug(slug: &str) -> bool {
        slug.is_empty()
            || slug.split('-').all(|part| {
                !part.is_empty()
                    && part.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            })
    }

    #[test]
    fn test_overflowing_bump_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let version = format!("{0}.{0}.{0}", u64::MAX);
        let path = write_manifest(&dir, &json!({"name": "Ext", "version": &version}));
        let before = fs::read_to_string(&path).unwrap();

        let mut manifest = Manifest::load(&path).unwrap();
        for kind in [BumpKind::Major, BumpKind::Minor, BumpKind::Patch] {
            let err = manifest.bump_version(kind).unwrap_err();
            assert!(matches!(err, PackageError::InvalidVersion { .. }), "{}", kind);
        }

        assert_eq!(manifest.version(), version);
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    proptest! {
        #[test]
        fn prop_slugify_is_idempotent_and_well_formed(name in ".{0,40}") {
            let slug = slugify(&name);
            prop_assert_eq!(slugify(&slug), slug.clone());
            prop_assert!(is_well_formed_slug(&slug), "malformed slug {:?}", slug);
        }

        #[test]
        fn prop_bump_follows_transition_table(
            major in 0u64..10_000,
            minor in 0u64..10_000,
            patch in 0u64..10_000,
        ) {
            let version = parse_version(&format!("{}.{}.{}", major, minor, patch)).unwrap();

            prop_assert_eq!(BumpKind::Major.apply(&version).unwrap(), Version::new(major + 1, 0, 0));
            prop_assert_eq!(BumpKind::Minor.apply(&version).unwrap(), Version::new(major, minor + 1, 0));
            prop_assert_eq!(BumpKind::Patch.apply(&version).unwrap(), Version::new(major, minor, patch + 1));
        }
    }
}
