//! Persistent storage for profiles.
//!
//! [`ProfileStore`] is the only component that touches profile records on disk.
//! Each record is a pretty-printed JSON file named `<profile>.json` inside the
//! store directory. Writes replace the whole record; there is no merging and no
//! locking, so the last writer wins.
//!
//! Two ways to mutate a profile:
//! - [`ProfileStore::register_subject`] / [`ProfileStore::remove_subject`] change an
//!   in-memory profile and persist it immediately.
//! - [`ProfileStore::update`] loads, applies any number of changes, and persists once.

use crate::error::{OrganizerError, Result};
use crate::profile::{validate_name, Profile};
use crate::resolver::{pass_root, plan_target, resolve_root, subject_root, PassSelection};
use crate::rule_table::RuleTable;
use crate::subject::Subject;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";

/// Handle on a directory of profile records.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `name`, validating the name first.
    pub fn profile_path(&self, name: &str) -> Result<PathBuf> {
        validate_name("Profile", name)?;
        Ok(self.dir.join(format!("{}.{}", name, RECORD_EXTENSION)))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.profile_path(name).is_ok_and(|path| path.is_file())
    }

    /// Creates and persists a new profile. Fails if one already exists under `name`.
    pub fn create(
        &self,
        name: &str,
        rules: Option<RuleTable>,
        notes: &str,
        allow_passes: bool,
    ) -> Result<Profile> {
        let profile = Profile::new(name, rules, notes, allow_passes)?;
        self.create_profile(profile)
    }

    /// Persists an already-built profile, refusing to overwrite an existing record.
    pub fn create_profile(&self, profile: Profile) -> Result<Profile> {
        let path = self.profile_path(profile.name())?;
        if path.exists() {
            return Err(OrganizerError::DuplicateProfile {
                name: profile.name().to_string(),
                path,
            });
        }
        self.save(&profile)?;
        Ok(profile)
    }

    /// Loads the profile stored under `name`.
    pub fn load(&self, name: &str) -> Result<Profile> {
        let path = self.profile_path(name)?;
        if !path.is_file() {
            return Err(OrganizerError::ProfileNotFound {
                name: name.to_string(),
                path: self.dir.clone(),
            });
        }

        let json = fs::read_to_string(&path).map_err(|e| OrganizerError::filesystem(&path, e))?;
        let profile = Profile::from_json(name, &json)?;
        tracing::debug!(profile = name, path = %path.display(), "profile loaded");
        Ok(profile)
    }

    /// Names of every stored profile. Empty when the store directory is missing.
    pub fn list(&self) -> BTreeSet<String> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                if self.dir.exists() {
                    tracing::warn!(dir = %self.dir.display(), error = %e, "cannot list profiles");
                }
                return BTreeSet::new();
            }
        };

        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext == RECORD_EXTENSION)
            })
            .filter_map(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .collect()
    }

    /// Removes the record for `name`. Subject folders on disk are never touched.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let path = self.profile_path(name)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| OrganizerError::filesystem(&path, e))?;
        tracing::info!(profile = name, "profile deleted");
        Ok(true)
    }

    /// Writes the full profile record, replacing any previous one.
    pub fn save(&self, profile: &Profile) -> Result<PathBuf> {
        let path = self.profile_path(profile.name())?;
        fs::create_dir_all(&self.dir).map_err(|e| OrganizerError::filesystem(&self.dir, e))?;

        let json = profile.to_json()?;
        fs::write(&path, json).map_err(|e| OrganizerError::filesystem(&path, e))?;
        tracing::info!(profile = profile.name(), path = %path.display(), "profile saved");
        Ok(path)
    }

    /// Loads `name`, applies `mutate`, and persists once if it succeeds.
    pub fn update<T, F>(&self, name: &str, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut Profile) -> Result<T>,
    {
        let mut profile = self.load(name)?;
        let value = mutate(&mut profile)?;
        self.save(&profile)?;
        Ok(value)
    }

    /// Registers a subject folder (or pass folder) and persists the profile.
    pub fn register_subject(
        &self,
        profile: &mut Profile,
        subject_name: &str,
        destination_path: impl Into<PathBuf>,
        pass_id: Option<&str>,
    ) -> Result<Option<String>> {
        let destination_path = destination_path.into();
        let pass_id =
            profile.register_subject(subject_name, destination_path.clone(), pass_id)?;
        if profile.stored_root(subject_name).is_none() {
            let root = match pass_id {
                Some(_) => pass_root(&destination_path, profile.pass_layout()),
                None => subject_root(&destination_path),
            };
            profile.record_root(subject_name, root);
        }
        self.save(profile)?;
        Ok(pass_id)
    }

    /// Removes a pass or a whole subject entry and persists the profile.
    pub fn remove_subject(
        &self,
        profile: &mut Profile,
        subject_name: &str,
        pass_id: Option<&str>,
    ) -> Result<bool> {
        let removed = profile.remove_subject(subject_name, pass_id);
        self.save(profile)?;
        Ok(removed)
    }

    /// Creates a subject's folders, then registers it with its root and persists.
    ///
    /// With passes enabled and no `pass_id`, the next pass number is used.
    pub fn create_subject(
        &self,
        profile: &mut Profile,
        subject_name: &str,
        root: impl Into<PathBuf>,
        pass_id: Option<&str>,
    ) -> Result<Subject> {
        validate_name("Subject", subject_name)?;
        let root = root.into();
        if profile.subject(subject_name).is_some() {
            let existing = resolve_root(profile, subject_name, None)?;
            if existing != root {
                return Err(OrganizerError::InvalidArgument(format!(
                    "subject '{}' already lives under {}, not {}",
                    subject_name,
                    existing.display(),
                    root.display()
                )));
            }
        }

        let pass_id = match (profile.allow_passes(), pass_id) {
            (true, None) => Some(profile.next_pass_id(subject_name)?),
            (true, Some(pass_id)) => {
                validate_name("Pass", pass_id)?;
                Some(pass_id.to_string())
            }
            (false, None) => None,
            (false, Some(_)) => {
                return Err(OrganizerError::InvalidArgument(format!(
                    "profile '{}' does not allow passes",
                    profile.name()
                )));
            }
        };

        let subject = Subject::new(profile, subject_name, &root, pass_id.as_deref());
        subject.create()?;

        profile.register_subject(subject_name, subject.destination_path(), pass_id.as_deref())?;
        profile.record_root(subject_name, root);
        self.save(profile)?;
        Ok(subject)
    }

    /// Re-enters a registered subject, deriving its root from the profile.
    ///
    /// A new pass is created and registered. An existing pass or simple subject is
    /// re-created in place; if its record predates stored roots, the derived root
    /// is recorded and persisted.
    pub fn open_subject(
        &self,
        profile: &mut Profile,
        subject_name: &str,
        selection: &PassSelection,
    ) -> Result<Subject> {
        let target = plan_target(profile, subject_name, selection)?;
        if matches!(selection, PassSelection::New(_)) {
            return self.create_subject(
                profile,
                subject_name,
                target.root,
                target.pass_id.as_deref(),
            );
        }

        let subject = Subject::new(
            profile,
            subject_name,
            &target.root,
            target.pass_id.as_deref(),
        );
        subject.create()?;

        if profile.stored_root(subject_name).is_none() {
            profile.record_root(subject_name, target.root);
            self.save(profile)?;
        }
        Ok(subject)
    }
}
