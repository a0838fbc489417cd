//! pipeline-organizer - profile-driven sorting of production files
//!
//! A [`Profile`] names an ordered [`RuleTable`] mapping file extensions to
//! category folders, and keeps an index of the subjects (project folders, with
//! optional numbered passes) created from it. The [`Organizer`] copies or moves
//! the files of a source folder into a [`Subject`]'s category folders and
//! reports per-file failures without aborting the batch.
//!
//! Profiles are persisted as one JSON record per profile through a
//! [`ProfileStore`], and the [`resolver`] recovers a subject's destination root
//! from what the profile recorded.

pub mod cli;
pub mod config;
pub mod error;
pub mod organizer;
pub mod output;
pub mod profile;
pub mod registry;
pub mod resolver;
pub mod rule_table;
pub mod subject;
pub mod transfer;

pub use config::{AppConfig, CompiledFilters, ConfigError};
pub use error::{OrganizerError, Result, TransferFailure};
pub use organizer::{CategorySummary, OrganizeReport, Organizer};
pub use profile::{PassLayout, Profile, SubjectRecord};
pub use registry::ProfileStore;
pub use resolver::PassSelection;
pub use rule_table::RuleTable;
pub use subject::Subject;
pub use transfer::{Transfer, TransferMode};
