//! Output formatting and styling module.
//!
//! Every line the command-line front end prints goes through [`OutputFormatter`],
//! so colors, symbols and table layout stay consistent.

use crate::error::TransferFailure;
use crate::organizer::{CategorySummary, OrganizeReport};
use crate::profile::{Profile, SubjectRecord};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// ```no_run
    /// use pipeline_organizer::output::OutputFormatter;
    /// OutputFormatter::success("Profile saved");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar for an organize run.
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints a table of file counts per category folder.
    pub fn summary_table(title: &str, summary: &CategorySummary) {
        Self::header(title);

        if summary.is_empty() {
            Self::plain("No files or folders found for this subject.");
            return;
        }

        let width = summary
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8);

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in summary {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        let total: usize = summary.values().sum();
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            plural(total),
            width = width
        );
    }

    /// Prints the counts of an organize run and every failed file.
    pub fn organize_report(report: &OrganizeReport, verb: &str) {
        Self::success(&format!(
            "{} {} {} into {}",
            verb,
            report.files_transferred,
            plural(report.files_transferred),
            report.destination.display()
        ));

        if !report.skipped.is_empty() {
            Self::warning(&format!(
                "Skipped {} {} excluded by filters",
                report.skipped.len(),
                plural(report.skipped.len())
            ));
        }

        if !report.failures.is_empty() {
            Self::failure_list(&report.failures);
        }
    }

    pub fn failure_list(failures: &[TransferFailure]) {
        Self::error(&format!(
            "{} {} could not be transferred:",
            failures.len(),
            plural(failures.len())
        ));
        for failure in failures {
            eprintln!("    - {}", failure);
        }
    }

    /// Prints a profile's settings, rules and subject index.
    pub fn profile_details(profile: &Profile) {
        Self::header(&format!("=== Profile: {} ===", profile.name()));
        if !profile.notes().is_empty() {
            println!("Notes: {}", profile.notes());
        }
        println!(
            "Passes: {}",
            if profile.allow_passes() {
                "enabled"
            } else {
                "disabled"
            }
        );

        Self::header("Rules");
        for rule in profile.rules().iter() {
            println!("  {}: {}", rule.name, rule.extensions.join(", "));
        }

        Self::subject_index(profile);
    }

    /// Prints every subject (and pass) registered under a profile.
    pub fn subject_index(profile: &Profile) {
        if profile.subjects().is_empty() {
            Self::plain(&format!(
                "No subjects registered for profile '{}'.",
                profile.name()
            ));
            return;
        }

        Self::header(&format!("Subjects for profile: {}", profile.name()));
        for (name, record) in profile.subjects() {
            match record {
                SubjectRecord::Simple(path) => {
                    println!(" - {} -> {}", name.bold(), path.display());
                }
                SubjectRecord::Paged(passes) => {
                    println!(" - {}:", name.bold());
                    for (pass_id, path) in passes {
                        println!("    • {} -> {}", pass_id, path.display());
                    }
                }
            }
        }
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
