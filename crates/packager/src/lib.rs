//! Extpack Packager - release packaging for browser extensions
//!
//! This crate turns a browser-extension source tree into distribution-ready zip
//! archives for the Chrome Web Store, Firefox Add-ons and GitHub Releases. Each
//! channel gets its own file set, and the Firefox package gets a manifest with
//! Firefox-specific keys.
//!
//! # Components
//!
//! - [`Manifest`]: load the manifest, derive name/slug/version, bump and persist
//!   the version, produce the Firefox variant
//! - [`ExclusionFilter`]: decide which paths never enter a package
//! - [`ArchiveWriter`]: write a zip archive that only appears once complete
//! - [`PackageAssembler`]: resolve declared items into archive entries
//! - [`ReleaseBuilder`]: the three channel recipes and the overall run
//!
//! # Example
//!
//! ```no_run
//! use extpack_packager::{BumpKind, ReleaseBuilder};
//!
//! # fn example() -> extpack_packager::Result<()> {
//! let mut builder = ReleaseBuilder::new("./my-extension")?;
//! let bump = builder.bump_version(BumpKind::Patch)?;
//! println!("Version bumped: {} -> {}", bump.old, bump.new);
//!
//! let summary = builder.build_all(true)?;
//! for (channel, package) in &summary.packages {
//!     println!("{}: {} ({} bytes)", channel, package.path.display(), package.size);
//! }
//! # Ok(())
//! # }
//! ```
pub mod archive;
pub mod assembler;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod manifest;
pub mod release;

pub use archive::{ArchiveReport, ArchiveWriter};
pub use assembler::{MissingItemPolicy, PackageAssembler, PackageEntry, PackageItem, PackageSpec};
pub use config::ReleaseConfig;
pub use error::{PackageError, Result};
pub use exclusion::{ExclusionFilter, ExclusionPattern};
pub use manifest::{BumpKind, GeckoSettings, Manifest, VersionBump, slugify};
pub use release::{BuildResult, BuildSummary, Channel, ReleaseBuilder};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
