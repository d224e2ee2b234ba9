//! Default filesystem-backed port implementations.

use crate::encoding::{DecodedText, TextEncoding, decode};
use crate::ports::{ConfirmPort, FetchedSources, RepoView, SourceFetcher, VcsPort, WritePort};
use crate::settings::{LlmSettings, MigrationSettings};
use anyhow::{Context, bail};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use glob::Pattern;
use migrafix_domain::Decision;
use migrafix_llm::{
    GenerationContext, HttpConfig, HttpGenerator, Provider, RateLimiter, ResponseCache,
};
use migrafix_types::changeset::ChangeSet;
use migrafix_types::source::{FetchStats, SourceFile, file_name};
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info};

/// Walks a repository and keeps files matching the include patterns.
///
/// Patterns are matched against the repo-relative path, the file name, and
/// the path prefixed with `./`, so `*/target/*` also excludes a top-level
/// `target/`.
#[derive(Debug, Clone)]
pub struct FsSourceFetcher {
    root: Utf8PathBuf,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    max_file_size: u64,
}

impl FsSourceFetcher {
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        include: &[String],
        exclude: &[String],
        max_file_size: u64,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            root: root.into(),
            include: compile(include)?,
            exclude: compile(exclude)?,
            max_file_size,
        })
    }

    pub fn from_settings(settings: &MigrationSettings) -> anyhow::Result<Self> {
        Self::new(
            settings.repo_root.clone(),
            &settings.include,
            &settings.fetch_excludes(),
            settings.max_file_size,
        )
    }

    fn walk(
        &self,
        dir: &Utf8Path,
        found: &mut Vec<(Utf8PathBuf, u64)>,
        stats: &mut FetchStats,
    ) -> anyhow::Result<()> {
        let mut entries = fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("list {}", dir))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                debug!(path = ?entry.path(), "skipping non-UTF-8 path");
                continue;
            };
            let Ok(rel) = path.strip_prefix(&self.root).map(|r| r.to_path_buf()) else {
                continue;
            };
            let rel_str = rel.as_str().replace('\\', "/");
            let file_type = entry
                .file_type()
                .with_context(|| format!("stat {}", path))?;

            if file_type.is_dir() {
                let dir_marker = format!("./{rel_str}/_");
                if self.exclude.iter().any(|p| p.matches(&dir_marker)) {
                    debug!(dir = %rel_str, "pruned");
                    continue;
                }
                self.walk(&path, found, stats)?;
            } else if file_type.is_file() {
                stats.files_seen += 1;
                if !self.wanted(&rel_str) {
                    stats.excluded_by_pattern += 1;
                    continue;
                }
                let len = entry
                    .metadata()
                    .with_context(|| format!("stat {}", path))?
                    .len();
                found.push((path, len));
            }
        }
        Ok(())
    }

    fn wanted(&self, rel: &str) -> bool {
        let dotted = format!("./{rel}");
        let name = file_name(rel);
        let hit = |p: &Pattern| p.matches(rel) || p.matches(name) || p.matches(&dotted);
        self.include.iter().any(hit) && !self.exclude.iter().any(hit)
    }
}

fn compile(patterns: &[String]) -> anyhow::Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("invalid glob pattern `{p}`")))
        .collect()
}

impl SourceFetcher for FsSourceFetcher {
    fn fetch(&self) -> anyhow::Result<FetchedSources> {
        if !self.root.is_dir() {
            bail!("repository root {} is not a directory", self.root);
        }
        let mut stats = FetchStats::default();
        let mut found = Vec::new();
        self.walk(&self.root, &mut found, &mut stats)?;

        let mut files = Vec::with_capacity(found.len());
        for (path, len) in found {
            let rel = path
                .strip_prefix(&self.root)
                .map(|r| r.as_str().replace('\\', "/"))
                .unwrap_or_else(|_| path.to_string());
            if len > self.max_file_size {
                debug!(path = %rel, bytes = len, "over size cap");
                stats.excluded_oversize += 1;
                continue;
            }
            match fs::read(&path).map(|bytes| decode(&bytes)) {
                Ok(Some(DecodedText { text, encoding })) => {
                    if encoding == TextEncoding::Windows1252 {
                        debug!(path = %rel, "decoded as windows-1252");
                        stats.decoded_legacy += 1;
                    }
                    files.push(SourceFile::new(rel, text));
                }
                Ok(None) => {
                    debug!(path = %rel, "binary content");
                    stats.excluded_unreadable += 1;
                }
                Err(e) => {
                    debug!(path = %rel, error = %e, "unreadable");
                    stats.excluded_unreadable += 1;
                }
            }
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));
        stats.files_included = files.len() as u64;

        info!(
            root = %self.root,
            seen = stats.files_seen,
            included = stats.files_included,
            "fetched sources"
        );
        Ok(FetchedSources { files, stats })
    }
}

/// Pre-loaded sources for embedding and testing. Sorted by path on
/// construction to match [`FsSourceFetcher`].
#[derive(Debug, Clone)]
pub struct InMemorySourceFetcher {
    files: Vec<SourceFile>,
}

impl InMemorySourceFetcher {
    pub fn new(mut files: Vec<SourceFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { files }
    }
}

impl SourceFetcher for InMemorySourceFetcher {
    fn fetch(&self) -> anyhow::Result<FetchedSources> {
        let n = self.files.len() as u64;
        Ok(FetchedSources {
            files: self.files.clone(),
            stats: FetchStats {
                files_seen: n,
                files_included: n,
                ..FetchStats::default()
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct FsRepoView {
    root: Utf8PathBuf,
}

impl FsRepoView {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RepoView for FsRepoView {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn read_text(&self, rel: &Utf8Path) -> anyhow::Result<DecodedText> {
        let path = self.root.join(rel);
        let bytes = fs::read(&path).with_context(|| format!("read {}", path))?;
        match decode(&bytes) {
            Some(text) => Ok(text),
            None => bail!("{path} has binary content"),
        }
    }

    fn exists(&self, rel: &Utf8Path) -> bool {
        self.root.join(rel).exists()
    }
}

/// Filesystem write operations.
#[derive(Debug, Clone, Default)]
pub struct FsWritePort;

impl WritePort for FsWritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create parent dir for {}", path))?;
        }
        fs::write(path, contents).with_context(|| format!("write {}", path))
    }

    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()> {
        fs::create_dir_all(path).with_context(|| format!("create_dir_all {}", path))
    }
}

/// Git operations by shelling out to `git` in the repository root.
#[derive(Debug, Clone)]
pub struct ShellGitPort {
    root: Utf8PathBuf,
}

impl ShellGitPort {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn git(&self, args: &[&str]) -> anyhow::Result<String> {
        let out = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .with_context(|| format!("run git {}", args.join(" ")))?;
        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

impl VcsPort for ShellGitPort {
    fn create_branch(&self, name: &str) -> anyhow::Result<()> {
        self.git(&["checkout", "-b", name]).map(drop)
    }

    fn stage_files(&self, paths: &[String]) -> anyhow::Result<()> {
        let mut args = vec!["add", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args).map(drop)
    }

    fn commit(&self, message: &str) -> anyhow::Result<()> {
        self.git(&["commit", "-m", message]).map(drop)
    }

    fn push(&self, branch: &str) -> anyhow::Result<()> {
        self.git(&["push", "-u", "origin", branch]).map(drop)
    }
}

/// Confirms every automatic record; manual ones are declined.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl ConfirmPort for AutoConfirm {
    fn confirm(&self, _changes: &ChangeSet) -> anyhow::Result<Decision> {
        Ok(Decision::AcceptAutomatic)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineConfirm;

impl ConfirmPort for DeclineConfirm {
    fn confirm(&self, _changes: &ChangeSet) -> anyhow::Result<Decision> {
        Ok(Decision::DeclineAll)
    }
}

/// Pick the provider: explicit, else the first one with a key in the
/// environment.
pub fn resolve_provider(llm: &LlmSettings) -> anyhow::Result<Provider> {
    if let Some(p) = llm.provider {
        return Ok(p);
    }
    [Provider::OpenAi, Provider::Anthropic]
        .into_iter()
        .find(|p| env_key(p.api_key_env()).is_some())
        .with_context(|| {
            format!(
                "no generation provider configured: set {} or {}",
                Provider::OpenAi.api_key_env(),
                Provider::Anthropic.api_key_env()
            )
        })
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Build a generation context backed by the HTTP generator.
///
/// `cache_path` enables the persisted response cache when `llm.cache` is set.
pub fn http_generation_context(
    llm: &LlmSettings,
    cache_path: Option<&Utf8Path>,
) -> anyhow::Result<GenerationContext> {
    let provider = resolve_provider(llm)?;
    let key_var = llm
        .api_key_env
        .clone()
        .unwrap_or_else(|| provider.api_key_env().to_string());
    let api_key = env_key(&key_var).with_context(|| format!("{key_var} is not set"))?;

    let mut config = HttpConfig::new(provider, api_key);
    if let Some(model) = &llm.model {
        config.model = model.clone();
    }
    if let Some(url) = &llm.base_url {
        config.base_url = url.trim_end_matches('/').to_string();
    }
    info!(provider = provider.as_str(), model = %config.model, "generation service configured");

    let generator = HttpGenerator::new(config).context("build HTTP client")?;
    let limiter = RateLimiter::new(llm.max_in_flight, llm.min_interval);
    let mut ctx = GenerationContext::new(Arc::new(generator), limiter, llm.retry.clone());
    if llm.cache {
        let cache = match cache_path {
            Some(p) => ResponseCache::load(p),
            None => ResponseCache::in_memory(),
        };
        ctx = ctx.with_cache(cache);
    }
    Ok(ctx)
}
