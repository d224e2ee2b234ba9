//! Port traits abstracting all I/O away from the pipeline.

use crate::encoding::DecodedText;
use migrafix_domain::Decision;
use migrafix_types::changeset::ChangeSet;
use migrafix_types::source::{FetchStats, SourceFile};
use camino::Utf8Path;

/// Files fetched for one run, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct FetchedSources {
    pub files: Vec<SourceFile>,
    pub stats: FetchStats,
}

/// Source of repository files, already filtered by pattern and size.
pub trait SourceFetcher {
    fn fetch(&self) -> anyhow::Result<FetchedSources>;
}

/// Read-only repository access used at apply time.
pub trait RepoView {
    fn root(&self) -> &Utf8Path;

    /// Decoded content and the encoding to write it back in.
    fn read_text(&self, rel: &Utf8Path) -> anyhow::Result<DecodedText>;

    fn exists(&self, rel: &Utf8Path) -> bool;
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}

/// Human or policy approval of a classified change set.
pub trait ConfirmPort {
    fn confirm(&self, changes: &ChangeSet) -> anyhow::Result<Decision>;
}

/// Version-control operations against the finalized working tree.
pub trait VcsPort {
    fn create_branch(&self, name: &str) -> anyhow::Result<()>;
    fn stage_files(&self, paths: &[String]) -> anyhow::Result<()>;
    fn commit(&self, message: &str) -> anyhow::Result<()>;
    fn push(&self, branch: &str) -> anyhow::Result<()>;
}
