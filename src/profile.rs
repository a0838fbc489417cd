//! Profiles: named categorization rules plus the history of subjects created with them.
//!
//! A profile owns a [`RuleTable`], free-form notes, and a subject index. When the
//! profile allows passes, every subject maps pass identifiers (`pass001`, `pass002`,
//! ...) to pass folders; otherwise each subject maps to a single folder. The two
//! shapes are the [`SubjectRecord`] variants and never mix within one profile.
//!
//! Profiles here are plain in-memory values. Persisting them is the job of
//! [`crate::registry::ProfileStore`].

use crate::error::{OrganizerError, Result};
use crate::rule_table::RuleTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix shared by every generated pass identifier.
pub const PASS_PREFIX: &str = "pass";

/// Extracts the number from a pass identifier such as `pass007` or `PASS12`.
///
/// ```
/// use pipeline_organizer::profile::pass_number;
///
/// assert_eq!(pass_number("pass007"), Some(7));
/// assert_eq!(pass_number("Pass1000"), Some(1000));
/// assert_eq!(pass_number("final"), None);
/// assert_eq!(pass_number("pass"), None);
/// ```
pub fn pass_number(pass_id: &str) -> Option<u64> {
    let prefix = pass_id.get(..PASS_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(PASS_PREFIX) {
        return None;
    }
    let digits = &pass_id[PASS_PREFIX.len()..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Formats a pass number, zero-padded to at least three digits.
pub fn format_pass_id(number: u64) -> String {
    format!("{}{:03}", PASS_PREFIX, number)
}

/// Returns one past the highest numbered pass, or `pass001` when there is none.
///
/// Identifiers that do not follow the `pass<digits>` pattern are ignored.
///
/// ```
/// use pipeline_organizer::profile::next_pass_id;
///
/// assert_eq!(next_pass_id(Vec::<&str>::new()).unwrap(), "pass001");
/// assert_eq!(next_pass_id(["pass001", "pass007", "final"]).unwrap(), "pass008");
/// assert!(next_pass_id([format!("pass{}", u64::MAX)]).is_err());
/// ```
pub fn next_pass_id<I, S>(existing: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|id| pass_number(id.as_ref()))
        .max()
        .unwrap_or(0);
    highest
        .checked_add(1)
        .map(format_pass_id)
        .ok_or_else(|| {
            OrganizerError::InvalidArgument(format!(
                "no pass number left after '{}'",
                format_pass_id(highest)
            ))
        })
}

/// How pass folders sit below a subject folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassLayout {
    /// `<root>/<subject>/<pass_id>`
    #[default]
    Flat,
    /// `<root>/<subject>/pass/<pass_id>`
    Nested,
}

impl PassLayout {
    /// Folder of a pass given the subject folder.
    pub fn pass_dir(&self, subject_dir: &Path, pass_id: &str) -> PathBuf {
        match self {
            PassLayout::Flat => subject_dir.join(pass_id),
            PassLayout::Nested => subject_dir.join(PASS_PREFIX).join(pass_id),
        }
    }

    /// Number of directory levels between the root and a pass folder.
    pub fn depth(&self) -> usize {
        match self {
            PassLayout::Flat => 2,
            PassLayout::Nested => 3,
        }
    }
}

/// Where a subject lives on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectRecord {
    /// The subject folder, for profiles without passes.
    Simple(PathBuf),
    /// Pass identifier to pass folder, for profiles with passes.
    Paged(BTreeMap<String, PathBuf>),
}

impl SubjectRecord {
    pub fn is_paged(&self) -> bool {
        matches!(self, SubjectRecord::Paged(_))
    }

    /// Pass identifiers, in stored order. Empty for simple records.
    pub fn pass_ids(&self) -> Vec<&str> {
        match self {
            SubjectRecord::Simple(_) => Vec::new(),
            SubjectRecord::Paged(passes) => passes.keys().map(String::as_str).collect(),
        }
    }

    pub fn pass_path(&self, pass_id: &str) -> Option<&Path> {
        match self {
            SubjectRecord::Simple(_) => None,
            SubjectRecord::Paged(passes) => passes.get(pass_id).map(PathBuf::as_path),
        }
    }
}

/// A named set of categorization rules and the subjects organized with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    name: String,

    #[serde(default)]
    rules: RuleTable,

    #[serde(default)]
    notes: String,

    #[serde(default)]
    subjects: BTreeMap<String, SubjectRecord>,

    #[serde(rename = "allow_subsubjects", default)]
    allow_passes: bool,

    #[serde(default)]
    pass_layout: PassLayout,

    #[serde(
        rename = "subject_roots",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    roots: BTreeMap<String, PathBuf>,
}

/// Rejects names that cannot be used as a single path component.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(OrganizerError::InvalidArgument(format!(
            "{} name '{}' must be a non-empty single folder name",
            kind, name
        )));
    }
    Ok(())
}

impl Profile {
    /// Creates a profile. Missing or empty rules fall back to [`RuleTable::default_rules`].
    pub fn new(
        name: &str,
        rules: Option<RuleTable>,
        notes: &str,
        allow_passes: bool,
    ) -> Result<Self> {
        validate_name("Profile", name)?;
        Ok(Self {
            name: name.to_string(),
            rules: rules.filter(|r| !r.is_empty()).unwrap_or_default(),
            notes: notes.to_string(),
            subjects: BTreeMap::new(),
            allow_passes,
            pass_layout: PassLayout::default(),
            roots: BTreeMap::new(),
        })
    }

    /// Sets the pass folder layout. Only meaningful before any pass is registered.
    pub fn with_pass_layout(mut self, layout: PassLayout) -> Self {
        self.pass_layout = layout;
        self
    }

    /// Parses a stored record. `fallback_name` is used when the record has no name.
    pub fn from_json(fallback_name: &str, json: &str) -> Result<Self> {
        let mut profile: Profile =
            serde_json::from_str(json).map_err(|e| OrganizerError::InvalidProfile {
                name: fallback_name.to_string(),
                reason: e.to_string(),
            })?;
        if profile.name.is_empty() {
            profile.name = fallback_name.to_string();
        }
        if profile.rules.is_empty() {
            profile.rules = RuleTable::default_rules();
        }
        profile.check_shapes()?;
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // Every record must match the allow_passes flag.
    fn check_shapes(&self) -> Result<()> {
        for (subject, record) in &self.subjects {
            if record.is_paged() != self.allow_passes {
                let expected = if self.allow_passes {
                    "a mapping of passes"
                } else {
                    "a single path"
                };
                return Err(OrganizerError::InvalidProfile {
                    name: self.name.clone(),
                    reason: format!("subject '{}' should be {}", subject, expected),
                });
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn allow_passes(&self) -> bool {
        self.allow_passes
    }

    pub fn pass_layout(&self) -> PassLayout {
        self.pass_layout
    }

    pub fn subjects(&self) -> &BTreeMap<String, SubjectRecord> {
        &self.subjects
    }

    pub fn subject(&self, subject_name: &str) -> Option<&SubjectRecord> {
        self.subjects.get(subject_name)
    }

    /// Root directory recorded when the subject was registered, if any.
    pub fn stored_root(&self, subject_name: &str) -> Option<&Path> {
        self.roots.get(subject_name).map(PathBuf::as_path)
    }

    /// Next free pass identifier for a subject.
    pub fn next_pass_id(&self, subject_name: &str) -> Result<String> {
        match self.subjects.get(subject_name) {
            Some(record) => next_pass_id(record.pass_ids()),
            None => next_pass_id(Vec::<&str>::new()),
        }
    }

    /// Records a subject folder (or one pass folder) in the subject index.
    ///
    /// With passes enabled and no `pass_id`, the next pass number is assigned.
    /// Returns the pass identifier used, if any.
    pub fn register_subject(
        &mut self,
        subject_name: &str,
        destination_path: impl Into<PathBuf>,
        pass_id: Option<&str>,
    ) -> Result<Option<String>> {
        validate_name("Subject", subject_name)?;
        let destination_path = destination_path.into();

        if !self.allow_passes {
            if let Some(pass_id) = pass_id {
                return Err(OrganizerError::InvalidArgument(format!(
                    "profile '{}' does not allow passes, got pass '{}'",
                    self.name, pass_id
                )));
            }
            self.subjects.insert(
                subject_name.to_string(),
                SubjectRecord::Simple(destination_path),
            );
            return Ok(None);
        }

        let pass_id = match pass_id {
            Some(id) => {
                validate_name("Pass", id)?;
                id.to_string()
            }
            None => self.next_pass_id(subject_name)?,
        };

        let record = self
            .subjects
            .entry(subject_name.to_string())
            .or_insert_with(|| SubjectRecord::Paged(BTreeMap::new()));
        if !record.is_paged() {
            *record = SubjectRecord::Paged(BTreeMap::new());
        }
        if let SubjectRecord::Paged(passes) = record {
            passes.insert(pass_id.clone(), destination_path);
        }
        Ok(Some(pass_id))
    }

    /// Remembers the root a subject was created under.
    pub fn record_root(&mut self, subject_name: &str, root: impl Into<PathBuf>) {
        self.roots.insert(subject_name.to_string(), root.into());
    }

    /// Removes one pass, or the whole subject when no pass is given or passes are off.
    ///
    /// A subject whose last pass is removed is dropped entirely. Returns whether
    /// anything was removed.
    pub fn remove_subject(&mut self, subject_name: &str, pass_id: Option<&str>) -> bool {
        let removed = match (self.allow_passes, pass_id) {
            (true, Some(pass_id)) => {
                let Some(SubjectRecord::Paged(passes)) = self.subjects.get_mut(subject_name)
                else {
                    return false;
                };
                let removed = passes.remove(pass_id).is_some();
                if passes.is_empty() {
                    self.subjects.remove(subject_name);
                }
                removed
            }
            _ => self.subjects.remove(subject_name).is_some(),
        };

        if !self.subjects.contains_key(subject_name) {
            self.roots.remove(subject_name);
        }
        removed
    }
}
