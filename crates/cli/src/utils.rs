//! Post-build helpers.

use std::path::Path;
use std::process::Command;

/// Program used to show a directory in the platform file manager
pub fn file_manager() -> &'static str {
    if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    }
}

/// Open `path` in the file manager without waiting for it. Failures are logged, never fatal.
pub fn open_folder(path: &Path) {
    match Command::new(file_manager()).arg(path).spawn() {
        Ok(_) => tracing::debug!("Opened {}", path.display()),
        Err(e) => tracing::warn!("Failed to open {}: {}", path.display(), e),
    }
}
