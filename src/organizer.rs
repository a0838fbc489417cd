/// Sorting files from a source folder into a subject's category folders.
///
/// The organizer reads the direct children of a source folder (it never
/// recurses), classifies each regular file by extension, and hands it to a
/// [`Transfer`] strategy. A file that fails to transfer is recorded in the
/// [`OrganizeReport`] and the run carries on with the next one.
///
/// The organizer holds no shared mutable state. Two runs into the same subject
/// at the same time are not coordinated; callers must serialize them.
use crate::config::CompiledFilters;
use crate::error::{OrganizerError, Result, TransferFailure};
use crate::profile::Profile;
use crate::rule_table::RuleTable;
use crate::subject::Subject;
use crate::transfer::Transfer;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Number of files per category folder.
pub type CategorySummary = BTreeMap<String, usize>;

/// Where one source file would go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub source: PathBuf,
    pub category: String,
    pub destination: PathBuf,
}

impl PlannedTransfer {
    pub fn file_name(&self) -> String {
        file_name_of(&self.source)
    }
}

/// Progress notification emitted once per source file.
#[derive(Debug, Clone)]
pub enum FileEvent {
    Transferred { file_name: String, category: String },
    Failed(TransferFailure),
    Skipped { file_name: String },
}

/// Outcome of an organize run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeReport {
    /// Number of files successfully transferred.
    pub files_transferred: usize,
    /// Files that could not be transferred, with the reason.
    pub failures: Vec<TransferFailure>,
    /// Files left alone because the configured filters exclude them.
    pub skipped: Vec<PathBuf>,
    /// Transferred files per category.
    pub per_category: CategorySummary,
    /// Folder the files were sorted into.
    pub destination: PathBuf,
}

impl OrganizeReport {
    pub fn total_processed(&self) -> usize {
        self.files_transferred + self.failures.len() + self.skipped.len()
    }

    /// True when no file failed.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Classifies and transfers files using a rule table.
#[derive(Debug, Clone)]
pub struct Organizer {
    rules: RuleTable,
    filters: CompiledFilters,
}

impl Organizer {
    /// An organizer that accepts every file in the source folder.
    pub fn new(rules: RuleTable) -> Self {
        Self {
            rules,
            filters: CompiledFilters::default(),
        }
    }

    pub fn for_profile(profile: &Profile) -> Self {
        Self::new(profile.rules().clone())
    }

    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Category a file would be sorted into.
    pub fn category_for(&self, path: &Path) -> &str {
        self.rules.classify_path(path)
    }

    /// Lists what [`Organizer::organize`] would do, without touching the filesystem.
    pub fn plan(&self, source_dir: &Path, subject: &Subject) -> Result<Vec<PlannedTransfer>> {
        let (files, _skipped) = self.collect_files(source_dir)?;
        let destination = subject.destination_path();
        Ok(files
            .into_iter()
            .map(|source| {
                let category = self.category_for(&source).to_string();
                let target = destination.join(&category).join(file_name_of(&source));
                PlannedTransfer {
                    source,
                    category,
                    destination: target,
                }
            })
            .collect())
    }

    /// Transfers every direct-child file of `source_dir` into `subject`.
    ///
    /// Fails before transferring anything if the source folder is missing or the
    /// subject folders cannot be created. Per-file problems end up in the report.
    pub fn organize(
        &self,
        source_dir: &Path,
        subject: &Subject,
        transfer: &dyn Transfer,
    ) -> Result<OrganizeReport> {
        self.organize_with_progress(source_dir, subject, transfer, |_| {})
    }

    /// Same as [`Organizer::organize`], calling `on_event` after each file.
    pub fn organize_with_progress<F>(
        &self,
        source_dir: &Path,
        subject: &Subject,
        transfer: &dyn Transfer,
        mut on_event: F,
    ) -> Result<OrganizeReport>
    where
        F: FnMut(&FileEvent),
    {
        let (files, skipped) = self.collect_files(source_dir)?;
        subject.create()?;

        let destination = subject.destination_path();
        let mut report = OrganizeReport {
            destination: destination.clone(),
            ..Default::default()
        };

        for path in &skipped {
            on_event(&FileEvent::Skipped {
                file_name: file_name_of(path),
            });
        }
        report.skipped = skipped;

        for source in files {
            let category = self.category_for(&source).to_string();
            let event = match transfer_one(&source, &destination.join(&category), transfer) {
                Ok(target) => {
                    tracing::debug!(
                        file = %source.display(),
                        to = %target.display(),
                        "file transferred"
                    );
                    report.files_transferred += 1;
                    *report.per_category.entry(category.clone()).or_insert(0) += 1;
                    FileEvent::Transferred {
                        file_name: file_name_of(&source),
                        category,
                    }
                }
                Err(failure) => {
                    tracing::warn!(file = %source.display(), reason = %failure.reason, "transfer failed");
                    report.failures.push(failure.clone());
                    FileEvent::Failed(failure)
                }
            };
            on_event(&event);
        }

        tracing::info!(
            subject = subject.name(),
            transferred = report.files_transferred,
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "organize run finished"
        );
        Ok(report)
    }

    /// Counts the files directly inside each category folder of a subject.
    ///
    /// Returns an empty summary when the subject folder does not exist.
    pub fn summarize(subject: &Subject) -> CategorySummary {
        let destination = subject.destination_path();
        let mut summary = CategorySummary::new();

        let entries = match fs::read_dir(&destination) {
            Ok(entries) => entries,
            Err(_) => return summary,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let count = match fs::read_dir(&path) {
                Ok(files) => files.flatten().filter(|f| f.path().is_file()).count(),
                Err(e) => {
                    tracing::warn!(folder = %path.display(), error = %e, "cannot read category folder");
                    continue;
                }
            };
            summary.insert(entry.file_name().to_string_lossy().to_string(), count);
        }
        summary
    }

    /// Fails with [`OrganizerError::SourceMissing`] unless `source_dir` is a folder.
    pub fn check_source(source_dir: &Path) -> Result<()> {
        if !source_dir.is_dir() {
            return Err(OrganizerError::SourceMissing(source_dir.to_path_buf()));
        }
        Ok(())
    }

    /// Regular files directly inside `source_dir`, split into (included, skipped by filters).
    fn collect_files(&self, source_dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        Self::check_source(source_dir)?;

        let entries =
            fs::read_dir(source_dir).map_err(|e| OrganizerError::filesystem(source_dir, e))?;

        let mut included = Vec::new();
        let mut skipped = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(dir = %source_dir.display(), error = %e, "unreadable source entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if self.filters.should_include(&path) {
                included.push(path);
            } else {
                skipped.push(path);
            }
        }

        included.sort();
        skipped.sort();
        Ok((included, skipped))
    }
}

/// Ensures the category folder exists and transfers one file into it.
fn transfer_one(
    source: &Path,
    category_dir: &Path,
    transfer: &dyn Transfer,
) -> std::result::Result<PathBuf, TransferFailure> {
    let failure = |reason: String| TransferFailure {
        file_name: file_name_of(source),
        path: source.to_path_buf(),
        reason,
    };

    fs::create_dir_all(category_dir).map_err(|e| {
        failure(format!(
            "cannot create folder {}: {}",
            category_dir.display(),
            e
        ))
    })?;

    let file_name = source
        .file_name()
        .ok_or_else(|| failure("file has no name component".to_string()))?;
    let target = category_dir.join(file_name);

    transfer
        .transfer(source, &target)
        .map_err(|e| failure(e.to_string()))?;
    Ok(target)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
