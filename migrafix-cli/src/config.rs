//! Configuration file loading for migrafix.
//!
//! Discovers and loads `migrafix.toml` from the repository root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use migrafix_core::{LlmSettings, MigrationSettings};
use migrafix_domain::{MIN_FILE_LIMIT, NamespaceMapping, PromptBudgets};
use migrafix_llm::{Provider, RetryPolicy};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "migrafix.toml";

/// Top-level configuration from migrafix.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrafixConfig {
    pub project: ProjectConfig,
    pub generation: GenerationConfig,
    pub namespaces: NamespacesConfig,
    pub apply: ApplyConfig,
}

/// Which files are read and how large they may be.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name used in prompts and reports.
    pub name: Option<String>,

    /// Replaces the default include patterns when non-empty.
    pub include: Vec<String>,

    /// Extends the default exclude patterns.
    pub exclude: Vec<String>,

    pub max_file_size: Option<u64>,

    /// Analyze at most this many files (at least 10).
    pub max_files: Option<usize>,

    /// Files larger than this are not sent for change generation.
    pub max_analyzable_bytes: Option<u64>,
}

/// Generation service, retry and budget settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,

    pub max_attempts: Option<u32>,
    pub initial_timeout_secs: Option<f64>,
    pub timeout_multiplier: Option<f64>,
    pub max_timeout_secs: Option<f64>,
    pub initial_backoff_secs: Option<f64>,
    pub max_backoff_secs: Option<f64>,

    pub max_in_flight: Option<usize>,
    pub min_interval_ms: Option<u64>,
    pub workers: Option<usize>,
    pub cache: Option<bool>,
    pub parse_retries: Option<u32>,

    pub per_file_budget: Option<usize>,
    pub analysis_budget: Option<usize>,
}

/// Extra namespace renames on top of the built-in table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NamespacesConfig {
    pub mappings: Vec<NamespaceMapping>,

    /// Prefixes that must never be renamed.
    pub exclusions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplyConfig {
    pub backup_dir: Option<Utf8PathBuf>,
    pub git: bool,
    pub push: bool,
}

/// Discover the migrafix.toml config file in the repository root.
pub fn discover_config(repo_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = repo_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

pub fn load_config(path: &Utf8Path) -> anyhow::Result<MigrafixConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<MigrafixConfig> {
    let config: MigrafixConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load `explicit` if given, else discover in the repo root, else defaults.
pub fn load_or_default(
    repo_root: &Utf8Path,
    explicit: Option<&Utf8Path>,
) -> anyhow::Result<MigrafixConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(repo_root) {
        Some(path) => load_config(&path),
        None => Ok(MigrafixConfig::default()),
    }
}

/// Values given on the command line. `None`/`false` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub repo_root: Utf8PathBuf,
    pub out_dir: Option<Utf8PathBuf>,
    pub project: Option<String>,
    pub apply: bool,
    pub git: bool,
    pub push: bool,
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub workers: Option<usize>,
    pub max_attempts: Option<u32>,
    pub max_files: Option<usize>,
    pub no_cache: bool,
    pub skip_analysis: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: MigrafixConfig,
}

impl ConfigMerger {
    pub fn new(config: MigrafixConfig) -> Self {
        Self { config }
    }

    /// Merge with `migrate` arguments: CLI > file > defaults.
    ///
    /// CLI boolean flags can only switch a feature on.
    pub fn merge_migrate_args(self, cli: &CliOverrides) -> (MigrationSettings, LlmSettings) {
        let MigrafixConfig {
            project,
            generation: g,
            namespaces,
            apply,
        } = self.config;
        let base = MigrationSettings::default();

        let include = if project.include.is_empty() {
            base.include.clone()
        } else {
            project.include
        };
        let mut exclude = base.exclude.clone();
        for pattern in project.exclude {
            if !exclude.contains(&pattern) {
                exclude.push(pattern);
            }
        }

        let file_max_files = project.max_files.filter(|n| {
            let ok = *n >= MIN_FILE_LIMIT;
            if !ok {
                warn!(max_files = *n, "max_files below {MIN_FILE_LIMIT} ignored");
            }
            ok
        });

        let settings = MigrationSettings {
            out_dir: cli
                .out_dir
                .clone()
                .unwrap_or_else(|| cli.repo_root.join("migrafix-out")),
            repo_root: cli.repo_root.clone(),
            project: cli.project.clone().or(project.name),
            include,
            exclude,
            max_file_size: project.max_file_size.unwrap_or(base.max_file_size),
            max_files: cli.max_files.or(file_max_files),
            max_analyzable_bytes: project
                .max_analyzable_bytes
                .unwrap_or(base.max_analyzable_bytes),
            budgets: PromptBudgets {
                per_file: g.per_file_budget.unwrap_or(base.budgets.per_file),
                analysis_context: g.analysis_budget.unwrap_or(base.budgets.analysis_context),
            },
            workers: cli.workers.or(g.workers).unwrap_or(base.workers).max(1),
            max_parse_retries: g.parse_retries.unwrap_or(base.max_parse_retries),
            skip_analysis: cli.skip_analysis,
            namespace_mappings: namespaces.mappings,
            namespace_exclusions: namespaces.exclusions,
            apply: cli.apply,
            backup_dir: apply.backup_dir,
            git: cli.git || apply.git,
            push: cli.push || apply.push,
        };

        let defaults = RetryPolicy::default();
        let secs = |v: Option<f64>, d: Duration| {
            v.filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64)
                .unwrap_or(d)
        };
        let retry = RetryPolicy {
            max_attempts: cli
                .max_attempts
                .or(g.max_attempts)
                .unwrap_or(defaults.max_attempts)
                .max(1),
            initial_timeout: secs(g.initial_timeout_secs, defaults.initial_timeout),
            timeout_multiplier: g
                .timeout_multiplier
                .filter(|m| m.is_finite() && *m >= 1.0)
                .unwrap_or(defaults.timeout_multiplier),
            max_timeout: secs(g.max_timeout_secs, defaults.max_timeout),
            initial_backoff: secs(g.initial_backoff_secs, defaults.initial_backoff),
            max_backoff: secs(g.max_backoff_secs, defaults.max_backoff),
        };

        let llm_base = LlmSettings::default();
        let llm = LlmSettings {
            provider: cli.provider.or(g.provider),
            model: cli.model.clone().or(g.model),
            base_url: g.base_url,
            api_key_env: g.api_key_env,
            retry,
            max_in_flight: g.max_in_flight.unwrap_or(llm_base.max_in_flight).max(1),
            min_interval: g
                .min_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(llm_base.min_interval),
            cache: !cli.no_cache && g.cache.unwrap_or(llm_base.cache),
        };

        (settings, llm)
    }
}
