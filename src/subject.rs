//! On-disk presence of one project: its folder, optional pass, and category subfolders.

use crate::error::{OrganizerError, Result};
use crate::profile::{PassLayout, Profile};
use crate::resolver::destination_for;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};

/// A project folder built from a profile.
///
/// Subjects are cheap runtime values and are never cached; construct a new one
/// from the same inputs whenever it is needed. Only the resulting path is
/// persisted, through the owning profile.
#[derive(Debug, Clone)]
pub struct Subject {
    name: String,
    root: PathBuf,
    pass_id: Option<String>,
    layout: PassLayout,
    category_folders: Vec<String>,
    created_at: DateTime<Local>,
}

impl Subject {
    /// Builds a subject under `root`, snapshotting the profile's category names.
    pub fn new(
        profile: &Profile,
        name: &str,
        root: impl Into<PathBuf>,
        pass_id: Option<&str>,
    ) -> Self {
        Self {
            name: name.to_string(),
            root: root.into(),
            pass_id: pass_id.map(str::to_string),
            layout: profile.pass_layout(),
            category_folders: profile.rules().category_names(),
            created_at: Local::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pass_id(&self) -> Option<&str> {
        self.pass_id.as_deref()
    }

    pub fn category_folders(&self) -> &[String] {
        &self.category_folders
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// `<root>/<name>`, or the pass folder below it when a pass is set.
    pub fn destination_path(&self) -> PathBuf {
        destination_for(&self.root, &self.name, self.pass_id.as_deref(), self.layout)
    }

    /// Creates the destination and every category folder. Safe to call repeatedly.
    pub fn create(&self) -> Result<()> {
        let destination = self.destination_path();
        fs::create_dir_all(&destination)
            .map_err(|e| OrganizerError::filesystem(&destination, e))?;

        for folder in &self.category_folders {
            let path = destination.join(folder);
            fs::create_dir_all(&path).map_err(|e| OrganizerError::filesystem(&path, e))?;
        }

        tracing::debug!(
            subject = %self.name,
            path = %destination.display(),
            folders = self.category_folders.len(),
            "subject folders ready"
        );
        Ok(())
    }

    /// Removes the destination tree. Returns `false` (with a warning) if it was absent.
    pub fn delete(&self) -> Result<bool> {
        let destination = self.destination_path();
        if !destination.exists() {
            tracing::warn!(
                subject = %self.name,
                path = %destination.display(),
                "nothing to delete, subject folder does not exist"
            );
            return Ok(false);
        }

        fs::remove_dir_all(&destination)
            .map_err(|e| OrganizerError::filesystem(&destination, e))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn folder_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("Failed to read dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_destination_paths() {
        let simple = Profile::new("assets", None, "", false).unwrap();
        let subject = Subject::new(&simple, "hero", "/r", None);
        assert_eq!(subject.destination_path(), PathBuf::from("/r/hero"));

        let flat = Profile::new("lookdev", None, "", true).unwrap();
        let subject = Subject::new(&flat, "hero", "/r", Some("pass002"));
        assert_eq!(subject.destination_path(), PathBuf::from("/r/hero/pass002"));

        let nested = flat.with_pass_layout(PassLayout::Nested);
        let subject = Subject::new(&nested, "hero", "/r", Some("pass002"));
        assert_eq!(
            subject.destination_path(),
            PathBuf::from("/r/hero/pass/pass002")
        );
    }

    #[test]
    fn test_create_makes_category_folders() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let profile = Profile::new("assets", None, "", false).unwrap();
        let subject = Subject::new(&profile, "hero", temp_dir.path(), None);

        subject.create().expect("Failed to create subject");

        let destination = temp_dir.path().join("hero");
        let mut expected = profile.rules().category_names();
        expected.sort();
        assert_eq!(folder_names(&destination), expected);
    }

    #[test]
    fn test_create_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let profile = Profile::new("lookdev", None, "", true).unwrap();
        let subject = Subject::new(&profile, "hero", temp_dir.path(), Some("pass001"));

        subject.create().expect("First create failed");
        let marker = subject.destination_path().join("Maya").join("scene.ma");
        fs::write(&marker, "keep me").expect("Failed to write marker");
        let before = folder_names(&subject.destination_path());

        subject.create().expect("Second create failed");

        assert_eq!(folder_names(&subject.destination_path()), before);
        assert_eq!(fs::read_to_string(&marker).unwrap(), "keep me");
    }

    #[test]
    fn test_create_fails_when_root_is_a_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a dir").expect("Failed to write blocker");

        let profile = Profile::new("assets", None, "", false).unwrap();
        let subject = Subject::new(&profile, "hero", &blocker, None);

        assert!(matches!(
            subject.create(),
            Err(OrganizerError::Filesystem { .. })
        ));
    }

    #[test]
    fn test_delete_removes_tree() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let profile = Profile::new("assets", None, "", false).unwrap();
        let subject = Subject::new(&profile, "hero", temp_dir.path(), None);
        subject.create().expect("Failed to create subject");

        assert!(subject.delete().expect("Delete failed"));
        assert!(!subject.destination_path().exists());
        assert!(temp_dir.path().exists());
    }

    #[test]
    fn test_delete_missing_is_not_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let profile = Profile::new("assets", None, "", false).unwrap();
        let subject = Subject::new(&profile, "ghost", temp_dir.path(), None);

        assert!(!subject.delete().expect("Delete should not fail"));
    }
}
