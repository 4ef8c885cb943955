//! End-to-end run over a small extension project: bump, then build every channel

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use extpack_packager::{BumpKind, Channel, Manifest, ReleaseBuilder};
use serde_json::{Value, json};
use tempfile::TempDir;
use zip::ZipArchive;

fn create_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let manifest = json!({
        "name": "My Cool Ext!",
        "version": "1.2.1",
        "description": "x",
        "background": {"service_worker": "bg.js"}
    });
    fs::write(
        root.join("manifest.json"),
        serde_json::to_string_pretty(&manifest).unwrap(),
    )
    .unwrap();

    fs::create_dir_all(root.join("src/node_modules")).unwrap();
    fs::write(root.join("src/bg.js"), "chrome.runtime.onInstalled.addListener(() => {});").unwrap();
    fs::write(root.join("src/node_modules/junk.js"), "junk").unwrap();
    fs::write(root.join("README.md"), "# My Cool Ext").unwrap();

    dir
}

fn entry_names(path: &Path) -> BTreeSet<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

fn read_json_entry(path: &Path, name: &str) -> Value {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    serde_json::from_str(&content).unwrap()
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_full_release_with_patch_bump() {
    let project = create_project();
    let scratch = TempDir::new().unwrap();
    let mut builder = ReleaseBuilder::new(project.path())
        .unwrap()
        .with_scratch_root(scratch.path());

    let bump = builder.bump_version(BumpKind::Patch).unwrap();
    assert_eq!((bump.old.as_str(), bump.new.as_str()), ("1.2.1", "1.2.2"));

    let summary = builder.build_all(true).unwrap();

    assert_eq!(summary.name, "My Cool Ext!");
    assert_eq!(summary.slug, "my-cool-ext");
    assert_eq!(summary.version, "1.2.2");
    assert_eq!(summary.description, "x");
    assert_eq!(summary.output_dir, project.path().join("releases"));

    // The bump is on disk regardless of the builds
    let on_disk = Manifest::load(project.path().join("manifest.json")).unwrap();
    assert_eq!(on_disk.version(), "1.2.2");
    assert_eq!(
        on_disk.get("background"),
        Some(&json!({"service_worker": "bg.js"}))
    );

    let chrome = summary.package(Channel::Chrome).unwrap();
    assert_eq!(
        chrome.path,
        project.path().join("releases/my-cool-ext-v1.2.2-chrome.zip")
    );
    assert_eq!(
        entry_names(&chrome.path),
        set(&["manifest.json", "src/bg.js"])
    );
    assert_eq!(chrome.size, fs::metadata(&chrome.path).unwrap().len());

    let github = summary.package(Channel::Github).unwrap();
    assert_eq!(
        github.path,
        project.path().join("releases/my-cool-ext-v1.2.2.zip")
    );
    assert_eq!(
        entry_names(&github.path),
        set(&["manifest.json", "src/bg.js", "README.md"])
    );

    let firefox = summary.package(Channel::Firefox).unwrap();
    assert_eq!(
        firefox.path,
        project.path().join("releases/my-cool-ext-v1.2.2-firefox.zip")
    );
    assert_eq!(
        entry_names(&firefox.path),
        set(&["manifest.json", "src/bg.js"])
    );

    let firefox_manifest = read_json_entry(&firefox.path, "manifest.json");
    assert_eq!(firefox_manifest["background"]["scripts"], json!(["bg.js"]));
    assert!(firefox_manifest["background"].get("service_worker").is_none());
    assert_eq!(firefox_manifest["version"], json!("1.2.2"));
    assert_eq!(
        firefox_manifest["browser_specific_settings"]["gecko"]["strict_min_version"],
        json!("109.0")
    );

    // Chrome keeps the service worker manifest
    let chrome_manifest = read_json_entry(&chrome.path, "manifest.json");
    assert_eq!(chrome_manifest["background"]["service_worker"], json!("bg.js"));

    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn test_rebuild_replaces_previous_archives() {
    let project = create_project();
    let builder = ReleaseBuilder::new(project.path()).unwrap();

    let first = builder.build_all(false).unwrap();
    fs::write(project.path().join("CHANGELOG.md"), "## 1.2.1").unwrap();
    let second = builder.build_all(false).unwrap();

    let github = second.package(Channel::Github).unwrap();
    assert_eq!(github.path, first.package(Channel::Github).unwrap().path);
    assert!(entry_names(&github.path).contains("CHANGELOG.md"));

    // Previous outputs inside the project never end up in a package
    assert!(
        entry_names(&github.path)
            .iter()
            .all(|name| !name.starts_with("releases/") && !name.ends_with(".zip"))
    );
}

#[test]
fn test_unreadable_manifest_aborts_before_any_archive() {
    let project = create_project();
    fs::write(project.path().join("manifest.json"), "{ broken").unwrap();

    let err = ReleaseBuilder::new(project.path()).err().unwrap();

    assert!(err.is_user_error());
    assert!(!project.path().join("releases").exists());
}
