//! Command-line interface.
//!
//! This module holds the clap command definitions and turns each command into
//! calls on the profile store, the resolver and the organizer. All printing goes
//! through [`OutputFormatter`].

use crate::config::AppConfig;
use crate::error::{OrganizerError, Result};
use crate::organizer::{CategorySummary, FileEvent, Organizer};
use crate::output::OutputFormatter;
use crate::profile::{validate_name, PassLayout, Profile};
use crate::registry::ProfileStore;
use crate::resolver::{plan_target, resolve_root, PassSelection};
use crate::rule_table::RuleTable;
use crate::subject::Subject;
use crate::transfer::TransferMode;
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};

/// Sort files into per-project category folders driven by named profiles.
#[derive(Parser, Debug)]
#[command(name = "pipeline-organizer", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding profile records (overrides the configuration)
    #[arg(long, global = true)]
    pub profiles_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable trace logging
    #[arg(long, global = true)]
    pub trace: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage profiles
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Manage subjects registered under a profile
    Subject {
        #[command(subcommand)]
        action: SubjectCommand,
    },

    /// Sort the files of a source folder into a subject
    Organize {
        profile: String,
        subject: String,
        /// Folder whose direct files are sorted
        source: PathBuf,

        /// Destination root, required when the subject is not registered yet
        #[arg(long)]
        root: Option<PathBuf>,

        /// Existing pass to organize into
        #[arg(long, conflicts_with = "new_pass")]
        pass: Option<String>,

        /// Start a new, auto-numbered pass
        #[arg(long)]
        new_pass: bool,

        /// Move files instead of copying them
        #[arg(long = "move", conflicts_with = "copy")]
        move_files: bool,

        /// Copy files (keeps the originals)
        #[arg(long)]
        copy: bool,

        /// Show where files would go without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Count files per category folder of a subject
    Summary {
        profile: String,
        subject: String,

        #[arg(long)]
        pass: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
    /// Create a profile
    Create {
        name: String,

        /// Category rule such as "Textures=.png,.jpg" (repeatable; default rules when omitted)
        #[arg(long = "rule", value_parser = parse_rule)]
        rules: Vec<RuleArg>,

        #[arg(long, default_value = "")]
        notes: String,

        /// Track numbered passes for every subject
        #[arg(long)]
        allow_passes: bool,

        /// Store passes as <subject>/pass/<pass_id> instead of <subject>/<pass_id>
        #[arg(long, requires = "allow_passes")]
        nested_passes: bool,
    },

    /// List profile names
    List,

    /// Show a profile's rules and subjects
    Show { name: String },

    /// Delete a profile record (subject folders are kept)
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum SubjectCommand {
    /// Create subject folders and register them
    Create {
        profile: String,
        subject: String,

        #[arg(long)]
        root: PathBuf,

        /// Pass identifier (auto-numbered when omitted on pass profiles)
        #[arg(long)]
        pass: Option<String>,
    },

    /// Remove a subject or one of its passes from a profile
    Remove {
        profile: String,
        subject: String,

        #[arg(long)]
        pass: Option<String>,

        /// Also delete the folders on disk
        #[arg(long)]
        purge: bool,
    },
}

/// One `--rule` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleArg {
    pub category: String,
    pub extensions: Vec<String>,
}

/// Parses `Category=.ext1,.ext2`.
pub fn parse_rule(s: &str) -> std::result::Result<RuleArg, String> {
    let (category, extensions) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=.ext1,.ext2, got '{}'", s))?;
    let category = category.trim();
    validate_name("Category", category).map_err(|e| e.to_string())?;
    let extensions: Vec<String> = extensions
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect();
    if extensions.is_empty() {
        return Err(format!("category '{}' needs at least one extension", category));
    }
    Ok(RuleArg {
        category: category.to_string(),
        extensions,
    })
}

struct Context {
    store: ProfileStore,
    config: AppConfig,
    quiet: bool,
}

/// Runs a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let profiles_dir = cli
        .profiles_dir
        .clone()
        .unwrap_or_else(|| config.store.profiles_dir.clone());
    let ctx = Context {
        store: ProfileStore::new(profiles_dir),
        config,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Profile { action } => run_profile_command(&ctx, action),
        Command::Subject { action } => run_subject_command(&ctx, action),
        Command::Organize {
            profile,
            subject,
            source,
            root,
            pass,
            new_pass,
            move_files,
            copy,
            dry_run,
        } => {
            let mode = if move_files {
                TransferMode::Move
            } else if copy {
                TransferMode::Copy
            } else {
                ctx.config.organize.default_mode
            };
            let request = OrganizeRequest {
                profile,
                subject,
                source,
                root,
                pass,
                new_pass,
                mode,
                dry_run,
            };
            run_organize(&ctx, request)
        }
        Command::Summary {
            profile,
            subject,
            pass,
        } => run_summary(&ctx, &profile, &subject, pass.as_deref()),
    }
}

fn run_profile_command(ctx: &Context, action: ProfileCommand) -> Result<()> {
    match action {
        ProfileCommand::Create {
            name,
            rules,
            notes,
            allow_passes,
            nested_passes,
        } => {
            let rules = if rules.is_empty() {
                None
            } else {
                let mut table = RuleTable::new();
                for rule in &rules {
                    table.insert(&rule.category, &rule.extensions)?;
                }
                Some(table)
            };
            let layout = if nested_passes {
                PassLayout::Nested
            } else {
                PassLayout::Flat
            };
            let profile = Profile::new(&name, rules, &notes, allow_passes)?.with_pass_layout(layout);
            let profile = ctx.store.create_profile(profile)?;
            OutputFormatter::success(&format!(
                "Profile '{}' saved to {}",
                profile.name(),
                ctx.store.dir().display()
            ));
            Ok(())
        }
        ProfileCommand::List => {
            let names = ctx.store.list();
            if names.is_empty() {
                OutputFormatter::plain("No profiles found.");
            }
            for name in names {
                OutputFormatter::plain(&name);
            }
            Ok(())
        }
        ProfileCommand::Show { name } => {
            let profile = ctx.store.load(&name)?;
            OutputFormatter::profile_details(&profile);
            Ok(())
        }
        ProfileCommand::Delete { name } => {
            if ctx.store.delete(&name)? {
                OutputFormatter::success(&format!("Profile '{}' deleted.", name));
            } else {
                OutputFormatter::warning(&format!("Profile '{}' not found.", name));
            }
            Ok(())
        }
    }
}

fn run_subject_command(ctx: &Context, action: SubjectCommand) -> Result<()> {
    match action {
        SubjectCommand::Create {
            profile,
            subject,
            root,
            pass,
        } => {
            let mut profile = ctx.store.load(&profile)?;
            let subject = ctx
                .store
                .create_subject(&mut profile, &subject, root, pass.as_deref())?;
            OutputFormatter::success(&format!(
                "Subject '{}' created at {}",
                subject.name(),
                subject.destination_path().display()
            ));
            Ok(())
        }
        SubjectCommand::Remove {
            profile,
            subject,
            pass,
            purge,
        } => {
            let mut profile = ctx.store.load(&profile)?;
            let folder = if purge {
                Some(registered_subject(&profile, &subject, pass.as_deref())?)
            } else {
                None
            };

            if !ctx
                .store
                .remove_subject(&mut profile, &subject, pass.as_deref())?
            {
                OutputFormatter::warning(&format!(
                    "Nothing registered for subject '{}'",
                    subject
                ));
                return Ok(());
            }
            OutputFormatter::success(&format!("Subject '{}' removed from profile", subject));

            if let Some(folder) = folder {
                if folder.delete()? {
                    OutputFormatter::success(&format!(
                        "Deleted {}",
                        folder.destination_path().display()
                    ));
                } else {
                    OutputFormatter::warning(&format!(
                        "Folder {} does not exist",
                        folder.destination_path().display()
                    ));
                }
            }
            Ok(())
        }
    }
}

/// Subject folder of a registered subject, or of one of its passes.
///
/// Without a pass this is the subject folder itself, which holds every pass.
fn registered_subject(profile: &Profile, subject_name: &str, pass: Option<&str>) -> Result<Subject> {
    let selection = match pass {
        Some(pass) if profile.allow_passes() => PassSelection::Existing(pass.to_string()),
        _ => PassSelection::None,
    };
    let root = match &selection {
        PassSelection::None => resolve_root(profile, subject_name, None)?,
        _ => plan_target(profile, subject_name, &selection)?.root,
    };
    Ok(Subject::new(profile, subject_name, root, pass.filter(|_| profile.allow_passes())))
}

struct OrganizeRequest {
    profile: String,
    subject: String,
    source: PathBuf,
    root: Option<PathBuf>,
    pass: Option<String>,
    new_pass: bool,
    mode: TransferMode,
    dry_run: bool,
}

impl OrganizeRequest {
    fn selection(&self, profile: &Profile) -> PassSelection {
        match (&self.pass, self.new_pass) {
            (Some(pass), _) => PassSelection::Existing(pass.clone()),
            (None, true) => PassSelection::New(None),
            (None, false) if profile.allow_passes() => PassSelection::New(None),
            (None, false) => PassSelection::None,
        }
    }
}

fn run_organize(ctx: &Context, request: OrganizeRequest) -> Result<()> {
    let mut profile = ctx.store.load(&request.profile)?;
    let organizer = Organizer::for_profile(&profile).with_filters(ctx.config.compile_filters()?);
    Organizer::check_source(&request.source)?;
    let registered = profile.subject(&request.subject).is_some();

    if registered && request.root.is_some() {
        OutputFormatter::warning(&format!(
            "Subject '{}' is already registered; ignoring --root",
            request.subject
        ));
    }

    if request.dry_run {
        let subject = if registered {
            let selection = request.selection(&profile);
            let target = plan_target(&profile, &request.subject, &selection)?;
            Subject::new(&profile, &request.subject, target.root, target.pass_id.as_deref())
        } else {
            let root = require_root(&request)?;
            let pass = match (&request.pass, profile.allow_passes()) {
                (Some(pass), true) => Some(pass.clone()),
                (None, true) => Some(profile.next_pass_id(&request.subject)?),
                (None, false) => None,
                (Some(_), false) => {
                    return Err(OrganizerError::InvalidArgument(format!(
                        "profile '{}' does not allow passes",
                        profile.name()
                    )));
                }
            };
            Subject::new(&profile, &request.subject, root, pass.as_deref())
        };
        return print_plan(&organizer, &request.source, &subject);
    }

    let subject = if registered {
        let selection = request.selection(&profile);
        ctx.store
            .open_subject(&mut profile, &request.subject, &selection)?
    } else {
        let root = require_root(&request)?;
        ctx.store
            .create_subject(&mut profile, &request.subject, root, request.pass.as_deref())?
    };

    if !ctx.quiet {
        OutputFormatter::info(&format!(
            "Organizing {} into {}",
            request.source.display(),
            subject.destination_path().display()
        ));
    }

    let total = organizer.plan(&request.source, &subject)?.len() as u64;
    let progress = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        OutputFormatter::create_progress_bar(total)
    };
    let report = organizer.organize_with_progress(
        &request.source,
        &subject,
        &request.mode,
        |event| match event {
            FileEvent::Transferred { file_name, .. } => {
                progress.set_message(file_name.clone());
                progress.inc(1);
            }
            FileEvent::Failed(failure) => {
                progress.set_message(failure.file_name.clone());
                progress.inc(1);
            }
            FileEvent::Skipped { .. } => {}
        },
    )?;
    progress.finish_and_clear();

    OutputFormatter::organize_report(&report, request.mode.verb());
    OutputFormatter::summary_table(
        &format!("Summary for subject '{}'", subject.name()),
        &Organizer::summarize(&subject),
    );
    Ok(())
}

fn require_root(request: &OrganizeRequest) -> Result<PathBuf> {
    request.root.clone().ok_or_else(|| {
        OrganizerError::InvalidArgument(format!(
            "subject '{}' is not registered under profile '{}'; pass --root to create it",
            request.subject, request.profile
        ))
    })
}

fn print_plan(organizer: &Organizer, source: &Path, subject: &Subject) -> Result<()> {
    let plan = organizer.plan(source, subject)?;
    if plan.is_empty() {
        OutputFormatter::dry_run_notice("No files found to organize.");
        return Ok(());
    }

    OutputFormatter::dry_run_notice(&format!(
        "Files would be organized into {}:",
        subject.destination_path().display()
    ));
    let mut counts = CategorySummary::new();
    for planned in &plan {
        OutputFormatter::plain(&format!(
            " - {} → {}/",
            planned.file_name(),
            planned.category
        ));
        *counts.entry(planned.category.clone()).or_insert(0) += 1;
    }
    OutputFormatter::summary_table("DRY RUN SUMMARY", &counts);
    OutputFormatter::dry_run_notice("No files were modified.");
    Ok(())
}

fn run_summary(ctx: &Context, profile_name: &str, subject_name: &str, pass: Option<&str>) -> Result<()> {
    let profile = ctx.store.load(profile_name)?;
    let record = profile
        .subject(subject_name)
        .ok_or_else(|| OrganizerError::SubjectNotFound {
            profile: profile_name.to_string(),
            subject: subject_name.to_string(),
        })?;

    let passes: Vec<Option<String>> = match (profile.allow_passes(), pass) {
        (false, _) => vec![None],
        (true, Some(pass)) => vec![Some(pass.to_string())],
        (true, None) => record
            .pass_ids()
            .into_iter()
            .map(|id| Some(id.to_string()))
            .collect(),
    };

    for pass in passes {
        let selection = match &pass {
            Some(pass) => PassSelection::Existing(pass.clone()),
            None => PassSelection::None,
        };
        let target = plan_target(&profile, subject_name, &selection)?;
        let subject = Subject::new(&profile, subject_name, target.root, target.pass_id.as_deref());
        let title = match subject.pass_id() {
            Some(pass_id) => format!("Summary for subject '{}' ({})", subject_name, pass_id),
            None => format!("Summary for subject '{}'", subject_name),
        };
        OutputFormatter::summary_table(&title, &Organizer::summarize(&subject));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rule() {
        assert_eq!(
            parse_rule("Textures=.png, jpg ,"),
            Ok(RuleArg {
                category: "Textures".to_string(),
                extensions: vec![".png".to_string(), "jpg".to_string()],
            })
        );
        assert!(parse_rule("Textures").is_err());
        assert!(parse_rule("=.png").is_err());
        assert!(parse_rule("../../escaped=.png").is_err());
        assert!(parse_rule("Textures=").is_err());
    }

    #[test]
    fn test_parse_organize_command() {
        let cli = Cli::try_parse_from([
            "pipeline-organizer",
            "organize",
            "lookdev",
            "hero",
            "/incoming",
            "--new-pass",
            "--move",
        ])
        .expect("Failed to parse");

        match cli.command {
            Command::Organize {
                profile,
                new_pass,
                move_files,
                dry_run,
                ..
            } => {
                assert_eq!(profile, "lookdev");
                assert!(new_pass);
                assert!(move_files);
                assert!(!dry_run);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_conflicting_flags_rejected() {
        let both_modes = Cli::try_parse_from([
            "pipeline-organizer",
            "organize",
            "p",
            "s",
            "/src",
            "--move",
            "--copy",
        ]);
        assert!(both_modes.is_err());

        let both_passes = Cli::try_parse_from([
            "pipeline-organizer",
            "organize",
            "p",
            "s",
            "/src",
            "--pass",
            "pass001",
            "--new-pass",
        ]);
        assert!(both_passes.is_err());
    }

    #[test]
    fn test_nested_passes_requires_allow_passes() {
        let result = Cli::try_parse_from([
            "pipeline-organizer",
            "profile",
            "create",
            "legacy",
            "--nested-passes",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_selection_defaults() {
        let simple = Profile::new("assets", None, "", false).unwrap();
        let paged = Profile::new("lookdev", None, "", true).unwrap();
        let request = OrganizeRequest {
            profile: "p".to_string(),
            subject: "s".to_string(),
            source: PathBuf::from("/src"),
            root: None,
            pass: None,
            new_pass: false,
            mode: TransferMode::Copy,
            dry_run: false,
        };

        assert_eq!(request.selection(&simple), PassSelection::None);
        assert_eq!(request.selection(&paged), PassSelection::New(None));
    }
}
