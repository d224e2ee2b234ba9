//! Embeddable core library for migrafix.
//!
//! Provides a clap-free, I/O-abstracted entry point suitable for linking
//! into other host processes.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`SourceFetcher`](ports::SourceFetcher): list and read repository files
//! - [`RepoView`](ports::RepoView): read files at apply time
//! - [`WritePort`](ports::WritePort): write files and create directories
//! - [`ConfirmPort`](ports::ConfirmPort): approve or decline the change set
//! - [`VcsPort`](ports::VcsPort): branch, stage, commit and push
//!
//! The [`adapters`] module provides default filesystem and shell
//! implementations.
//!
//! # Entry point
//!
//! - [`run_migration`](pipeline::run_migration): fetch, analyze, plan,
//!   back up, generate, confirm, apply and report

pub mod adapters;
pub mod encoding;
pub mod generation;
pub mod pipeline;
pub mod ports;
pub mod settings;

pub use pipeline::{MigrationOutcome, MigrationPorts, ToolError, run_migration};
pub use settings::{LlmSettings, MigrationSettings};
