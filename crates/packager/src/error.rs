use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Manifest not found at '{path}'")]
    ManifestNotFound { path: PathBuf },

    #[error("Invalid manifest at '{path}': {source}")]
    ManifestParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid manifest at '{path}': top-level value must be an object")]
    ManifestNotObject { path: PathBuf },

    #[error("Failed to write manifest '{path}': {source}")]
    ManifestPersist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error(
        "Cannot overwrite '{path}': {source}. The file may be open in another program. Close it and try again."
    )]
    ArchiveLocked {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Declared package item '{name}' does not exist")]
    MissingSourceItem { name: String },

    #[error("Invalid archive entry name '{name}'")]
    InvalidEntryName { name: String },

    #[error("IO operation '{operation}' failed on path '{path}': {source}")]
    Io {
        operation: String,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid configuration at '{path}': {source}")]
    Config {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type Result<T> = std::result::Result<T, PackageError>;

impl PackageError {
    pub(crate) fn io(operation: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackageError::Io {
            operation: operation.to_string(),
            path: path.into(),
            source,
        }
    }

    /// Whether the user can fix the condition without changing the tool
    pub fn is_user_error(&self) -> bool {
        match self {
            PackageError::ManifestNotFound { .. } => true,
            PackageError::ManifestParse { .. } => true,
            PackageError::ManifestNotObject { .. } => true,
            PackageError::InvalidVersion { .. } => true,
            PackageError::ArchiveLocked { .. } => true,
            PackageError::MissingSourceItem { .. } => true,
            PackageError::Config { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_locked_message_is_actionable() {
        let err = PackageError::ArchiveLocked {
            path: PathBuf::from("releases/ext-v1.0.0.zip"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        let message = err.to_string();
        assert!(message.contains("releases/ext-v1.0.0.zip"));
        assert!(message.contains("Close it and try again"));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_io_errors_are_not_user_errors() {
        let err = PackageError::io(
            "read",
            "src",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        );
        assert!(!err.is_user_error());
    }
}
