//! Recovering the root directory of an existing subject.
//!
//! A subject folder is `<root>/<subject>` and a pass folder is
//! `<root>/<subject>/<pass_id>` (or `<root>/<subject>/pass/<pass_id>` for profiles
//! using [`PassLayout::Nested`]). Re-entering a subject means finding `<root>` again.
//!
//! Profiles record the root at registration time and it wins as long as it agrees
//! with the folder recorded for the subject or pass being re-entered.
//! Records written without a root fall back to ancestor arithmetic driven by the
//! profile's explicit layout, never by guessing from the path shape.

use crate::error::{OrganizerError, Result};
use crate::profile::{PassLayout, Profile, SubjectRecord};
use std::path::{Path, PathBuf};

/// Which pass of a subject an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassSelection {
    /// The profile does not use passes.
    None,
    /// A pass that is already registered.
    Existing(String),
    /// A new pass; `None` picks the next number.
    New(Option<String>),
}

/// Root directory and pass identifier for building a [`crate::subject::Subject`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTarget {
    pub root: PathBuf,
    pub pass_id: Option<String>,
}

/// Parent of a plain subject folder.
pub fn subject_root(subject_path: &Path) -> PathBuf {
    subject_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Root of a pass folder: `layout.depth()` levels up.
///
/// Shallow paths that run out of ancestors fall back to the immediate parent.
///
/// ```
/// use pipeline_organizer::profile::PassLayout;
/// use pipeline_organizer::resolver::pass_root;
/// use std::path::Path;
///
/// let root = pass_root(Path::new("/shows/subjectA/pass007"), PassLayout::Flat);
/// assert_eq!(root, Path::new("/shows"));
/// ```
pub fn pass_root(pass_path: &Path, layout: PassLayout) -> PathBuf {
    match pass_path.ancestors().nth(layout.depth()) {
        Some(root) => root.to_path_buf(),
        None => subject_root(pass_path),
    }
}

/// Root derived from a stored record alone.
///
/// For paged records `pass_id` picks the pass folder to derive from; without one,
/// the first stored pass is used since all passes of a subject share a root.
pub fn derive_root(
    record: &SubjectRecord,
    pass_id: Option<&str>,
    layout: PassLayout,
) -> Option<PathBuf> {
    match record {
        SubjectRecord::Simple(path) => Some(subject_root(path)),
        SubjectRecord::Paged(passes) => {
            let pass_path = match pass_id {
                Some(id) => passes.get(id)?,
                None => passes.values().next()?,
            };
            Some(pass_root(pass_path, layout))
        }
    }
}

/// Folder a subject (or one of its passes) occupies below `root`.
///
/// ```
/// use pipeline_organizer::profile::PassLayout;
/// use pipeline_organizer::resolver::destination_for;
/// use std::path::Path;
///
/// let dir = destination_for(Path::new("/r"), "hero", Some("pass002"), PassLayout::Nested);
/// assert_eq!(dir, Path::new("/r/hero/pass/pass002"));
/// ```
pub fn destination_for(
    root: &Path,
    subject_name: &str,
    pass_id: Option<&str>,
    layout: PassLayout,
) -> PathBuf {
    let subject_dir = root.join(subject_name);
    match pass_id {
        Some(pass_id) => layout.pass_dir(&subject_dir, pass_id),
        None => subject_dir,
    }
}

/// Root directory of a registered subject.
///
/// The stored root is used only while it rebuilds the folder recorded for the
/// subject (or for `pass_id`). A record that points elsewhere wins, so an
/// existing folder is never relocated.
pub fn resolve_root(
    profile: &Profile,
    subject_name: &str,
    pass_id: Option<&str>,
) -> Result<PathBuf> {
    let record = profile
        .subject(subject_name)
        .ok_or_else(|| OrganizerError::SubjectNotFound {
            profile: profile.name().to_string(),
            subject: subject_name.to_string(),
        })?;
    let layout = profile.pass_layout();

    if let Some(root) = profile.stored_root(subject_name) {
        let recorded = match record {
            SubjectRecord::Simple(path) => Some((path.as_path(), None)),
            SubjectRecord::Paged(passes) => {
                pass_id.and_then(|id| passes.get(id).map(|path| (path.as_path(), Some(id))))
            }
        };
        match recorded {
            Some((path, pass)) if destination_for(root, subject_name, pass, layout) != path => {
                tracing::warn!(
                    subject = subject_name,
                    stored_root = %root.display(),
                    recorded = %path.display(),
                    "stored root does not match the recorded folder, using the record"
                );
            }
            _ => return Ok(root.to_path_buf()),
        }
    } else {
        tracing::debug!(
            subject = subject_name,
            "no stored root, deriving from recorded path"
        );
    }

    derive_root(record, pass_id, layout).ok_or_else(|| OrganizerError::InvalidProfile {
        name: profile.name().to_string(),
        reason: format!("subject '{}' has no recorded paths", subject_name),
    })
}

/// Works out the root and pass identifier for re-entering a registered subject.
pub fn plan_target(
    profile: &Profile,
    subject_name: &str,
    selection: &PassSelection,
) -> Result<SubjectTarget> {
    match (profile.allow_passes(), selection) {
        (false, PassSelection::None) => Ok(SubjectTarget {
            root: resolve_root(profile, subject_name, None)?,
            pass_id: None,
        }),
        (false, _) => Err(OrganizerError::InvalidArgument(format!(
            "profile '{}' does not allow passes",
            profile.name()
        ))),
        (true, PassSelection::None) => Err(OrganizerError::InvalidArgument(format!(
            "profile '{}' uses passes; choose an existing pass or a new one",
            profile.name()
        ))),
        (true, PassSelection::Existing(pass_id)) => {
            let record =
                profile
                    .subject(subject_name)
                    .ok_or_else(|| OrganizerError::SubjectNotFound {
                        profile: profile.name().to_string(),
                        subject: subject_name.to_string(),
                    })?;
            if record.pass_path(pass_id).is_none() {
                return Err(OrganizerError::PassNotFound {
                    subject: subject_name.to_string(),
                    pass: pass_id.clone(),
                });
            }
            Ok(SubjectTarget {
                root: resolve_root(profile, subject_name, Some(pass_id))?,
                pass_id: Some(pass_id.clone()),
            })
        }
        (true, PassSelection::New(pass_id)) => {
            let root = resolve_root(profile, subject_name, None)?;
            let pass_id = match pass_id {
                Some(pass_id) => pass_id.clone(),
                None => profile.next_pass_id(subject_name)?,
            };
            Ok(SubjectTarget {
                root,
                pass_id: Some(pass_id),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paged(layout: PassLayout) -> Profile {
        Profile::new("lookdev", None, "", true)
            .unwrap()
            .with_pass_layout(layout)
    }

    #[test]
    fn test_subject_root_is_parent() {
        assert_eq!(subject_root(Path::new("/r/hero")), PathBuf::from("/r"));
        assert_eq!(subject_root(Path::new("hero")), PathBuf::from(""));
    }

    #[test]
    fn test_flat_pass_root() {
        assert_eq!(
            pass_root(Path::new("/root/subjectA/pass007"), PassLayout::Flat),
            PathBuf::from("/root")
        );
    }

    #[test]
    fn test_nested_path_at_both_depths() {
        let stored = Path::new("/root/subjectA/pass/pass007");
        // Two levels up lands inside the subject folder.
        assert_eq!(
            pass_root(stored, PassLayout::Flat),
            PathBuf::from("/root/subjectA")
        );
        assert_eq!(pass_root(stored, PassLayout::Nested), PathBuf::from("/root"));
    }

    #[test]
    fn test_shallow_pass_path_falls_back_to_parent() {
        assert_eq!(
            pass_root(Path::new("pass007"), PassLayout::Flat),
            PathBuf::from("")
        );
        assert_eq!(
            pass_root(Path::new("hero/pass007"), PassLayout::Nested),
            PathBuf::from("hero")
        );
    }

    #[test]
    fn test_derive_root_simple_and_paged() {
        let simple = SubjectRecord::Simple(PathBuf::from("/r/hero"));
        assert_eq!(
            derive_root(&simple, None, PassLayout::Flat),
            Some(PathBuf::from("/r"))
        );

        let mut profile = paged(PassLayout::Flat);
        profile
            .register_subject("hero", "/r/hero/pass001", None)
            .unwrap();
        let record = profile.subject("hero").unwrap();
        assert_eq!(
            derive_root(record, Some("pass001"), PassLayout::Flat),
            Some(PathBuf::from("/r"))
        );
        assert_eq!(derive_root(record, Some("pass404"), PassLayout::Flat), None);
    }

    #[test]
    fn test_stored_root_wins_over_derivation() {
        let mut profile = paged(PassLayout::Flat);
        profile
            .register_subject("hero", "/r/hero/pass/pass001", None)
            .unwrap();
        profile.record_root("hero", "/r");

        assert_eq!(
            resolve_root(&profile, "hero", None).unwrap(),
            PathBuf::from("/r")
        );
    }

    #[test]
    fn test_recorded_pass_wins_over_moved_root() {
        let mut profile = paged(PassLayout::Flat);
        profile
            .register_subject("hero", "/a/hero/pass001", None)
            .unwrap();
        profile
            .register_subject("hero", "/b/hero/pass002", None)
            .unwrap();
        profile.record_root("hero", "/b");

        let old = plan_target(
            &profile,
            "hero",
            &PassSelection::Existing("pass001".to_string()),
        )
        .unwrap();
        assert_eq!(old.root, PathBuf::from("/a"));

        let current = plan_target(
            &profile,
            "hero",
            &PassSelection::Existing("pass002".to_string()),
        )
        .unwrap();
        assert_eq!(current.root, PathBuf::from("/b"));
    }

    #[test]
    fn test_recorded_simple_path_wins_over_stale_root() {
        let mut profile = Profile::new("assets", None, "", false).unwrap();
        profile.register_subject("hero", "/moved/hero", None).unwrap();
        profile.record_root("hero", "/old");

        assert_eq!(
            resolve_root(&profile, "hero", None).unwrap(),
            PathBuf::from("/moved")
        );
    }

    #[test]
    fn test_resolve_unknown_subject() {
        let profile = paged(PassLayout::Flat);
        assert!(matches!(
            resolve_root(&profile, "ghost", None),
            Err(OrganizerError::SubjectNotFound { .. })
        ));
    }

    #[test]
    fn test_plan_new_pass_numbers_from_existing() {
        let mut profile = paged(PassLayout::Flat);
        profile
            .register_subject("hero", "/r/hero/pass001", None)
            .unwrap();
        profile
            .register_subject("hero", "/r/hero/pass002", None)
            .unwrap();

        let target = plan_target(&profile, "hero", &PassSelection::New(None)).unwrap();
        assert_eq!(target.root, PathBuf::from("/r"));
        assert_eq!(target.pass_id.as_deref(), Some("pass003"));
    }

    #[test]
    fn test_plan_existing_pass() {
        let mut profile = paged(PassLayout::Nested);
        profile
            .register_subject("hero", "/r/hero/pass/pass004", Some("pass004"))
            .unwrap();

        let target = plan_target(
            &profile,
            "hero",
            &PassSelection::Existing("pass004".to_string()),
        )
        .unwrap();
        assert_eq!(target.root, PathBuf::from("/r"));
        assert_eq!(target.pass_id.as_deref(), Some("pass004"));

        let missing = plan_target(
            &profile,
            "hero",
            &PassSelection::Existing("pass005".to_string()),
        );
        assert!(matches!(missing, Err(OrganizerError::PassNotFound { .. })));
    }

    #[test]
    fn test_plan_simple_subject() {
        let mut profile = Profile::new("assets", None, "", false).unwrap();
        profile.register_subject("hero", "/r/hero", None).unwrap();

        let target = plan_target(&profile, "hero", &PassSelection::None).unwrap();
        assert_eq!(target.root, PathBuf::from("/r"));
        assert_eq!(target.pass_id, None);

        let bad = plan_target(&profile, "hero", &PassSelection::New(None));
        assert!(matches!(bad, Err(OrganizerError::InvalidArgument(_))));
    }

    #[test]
    fn test_plan_paged_requires_selection() {
        let mut profile = paged(PassLayout::Flat);
        profile
            .register_subject("hero", "/r/hero/pass001", None)
            .unwrap();
        let result = plan_target(&profile, "hero", &PassSelection::None);
        assert!(matches!(result, Err(OrganizerError::InvalidArgument(_))));
    }
}
