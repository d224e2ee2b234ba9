//! Clap-free settings for the migration pipeline.

use camino::{Utf8Path, Utf8PathBuf};
use migrafix_domain::{NamespaceMapping, NamespaceTable, PromptBudgets};
use migrafix_llm::{Provider, RetryPolicy};
use std::time::Duration;

pub const DEFAULT_INCLUDE: [&str; 11] = [
    "*.java",
    "*.xml",
    "*.properties",
    "*.yml",
    "*.yaml",
    "*.gradle",
    "*.gradle.kts",
    "pom.xml",
    "*.sql",
    "*.jsp",
    "*.jspx",
];

pub const DEFAULT_EXCLUDE: [&str; 9] = [
    "*/target/*",
    "*/build/*",
    "*/.git/*",
    "*/.idea/*",
    "*/node_modules/*",
    "*.class",
    "*.jar",
    "*.war",
    "*.ear",
];

/// Settings for one migration run.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub repo_root: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,

    /// Defaults to the repository directory name.
    pub project: Option<String>,

    // Fetch
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_file_size: u64,
    /// Cap on files carried past fetching; Spring-relevant paths are kept first.
    pub max_files: Option<usize>,

    // Generation
    pub max_analyzable_bytes: u64,
    pub budgets: PromptBudgets,
    pub workers: usize,
    pub max_parse_retries: u32,
    pub skip_analysis: bool,

    // Namespaces
    pub namespace_mappings: Vec<NamespaceMapping>,
    pub namespace_exclusions: Vec<String>,

    // Apply
    pub apply: bool,
    pub backup_dir: Option<Utf8PathBuf>,

    // Version control
    pub git: bool,
    pub push: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            repo_root: Utf8PathBuf::from("."),
            out_dir: Utf8PathBuf::from("migrafix-out"),
            project: None,
            include: DEFAULT_INCLUDE.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect(),
            max_file_size: 1024 * 1024,
            max_files: None,
            max_analyzable_bytes: 20_000,
            budgets: PromptBudgets::default(),
            workers: 4,
            max_parse_retries: 1,
            skip_analysis: false,
            namespace_mappings: Vec::new(),
            namespace_exclusions: Vec::new(),
            apply: false,
            backup_dir: None,
            git: false,
            push: false,
        }
    }
}

impl MigrationSettings {
    pub fn project_name(&self) -> String {
        if let Some(p) = self.project.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            return p.to_string();
        }
        project_name_from_root(&self.repo_root)
    }

    pub fn namespace_table(&self) -> NamespaceTable {
        let mut table = NamespaceTable::default();
        for m in &self.namespace_mappings {
            table = table.with_mapping(&m.from, &m.to);
        }
        for e in &self.namespace_exclusions {
            table = table.with_exclusion(e);
        }
        table
    }

    pub fn backup_root(&self) -> Utf8PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| self.out_dir.join("backups"))
    }

    pub fn cache_path(&self) -> Utf8PathBuf {
        self.out_dir.join("cache").join("responses.json")
    }

    /// Exclude patterns plus the out and backup directories when they live
    /// inside the repository, so a later run never reads its own artifacts.
    pub fn fetch_excludes(&self) -> Vec<String> {
        let mut out = self.exclude.clone();
        for dir in [self.out_dir.clone(), self.backup_root()] {
            if let Some(rel) = relative_inside(&self.repo_root, &dir) {
                let pattern = format!("./{}/*", glob::Pattern::escape(&rel));
                if !out.contains(&pattern) {
                    out.push(pattern);
                }
            }
        }
        out
    }
}

fn absolute(p: &Utf8Path) -> Option<Utf8PathBuf> {
    if p.is_absolute() {
        return Some(p.to_path_buf());
    }
    let cwd = std::env::current_dir().ok()?;
    Utf8PathBuf::from_path_buf(cwd).ok().map(|c| c.join(p))
}

fn relative_inside(root: &Utf8Path, dir: &Utf8Path) -> Option<String> {
    let root = absolute(root)?;
    let dir = absolute(dir)?;
    let rel = dir.strip_prefix(&root).ok()?;
    let rel = rel.as_str().replace('\\', "/");
    (!rel.is_empty()).then_some(rel)
}

fn project_name_from_root(root: &Utf8Path) -> String {
    let canonical = root.canonicalize_utf8().unwrap_or_else(|_| root.to_path_buf());
    canonical
        .file_name()
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or("project")
        .to_string()
}

/// Settings for the generation service.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    /// Chosen from the available API keys when `None`.
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// Environment variable holding the API key; provider default when `None`.
    pub api_key_env: Option<String>,
    pub retry: RetryPolicy,
    pub max_in_flight: usize,
    pub min_interval: Duration,
    pub cache: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            base_url: None,
            api_key_env: None,
            retry: RetryPolicy::default(),
            max_in_flight: 4,
            min_interval: Duration::ZERO,
            cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_project_name_wins() {
        let s = MigrationSettings {
            project: Some(" demo ".into()),
            ..MigrationSettings::default()
        };
        assert_eq!(s.project_name(), "demo");
    }

    #[test]
    fn project_name_from_directory() {
        assert_eq!(
            project_name_from_root(Utf8Path::new("/definitely/not/here/shop-api")),
            "shop-api"
        );
    }

    #[test]
    fn extra_mappings_extend_the_table() {
        let s = MigrationSettings {
            namespace_mappings: vec![NamespaceMapping {
                from: "javax.old".into(),
                to: "jakarta.old".into(),
            }],
            namespace_exclusions: vec!["javax.servlet.legacy".into()],
            ..MigrationSettings::default()
        };
        let t = s.namespace_table();
        assert_eq!(t.rewrite("javax.old.Thing").as_deref(), Some("jakarta.old.Thing"));
        assert_eq!(t.rewrite("javax.servlet.legacy.X"), None);
        assert_eq!(t.rewrite("javax.servlet.Filter").as_deref(), Some("jakarta.servlet.Filter"));
    }

    #[test]
    fn artifacts_inside_the_repo_are_excluded() {
        let s = MigrationSettings {
            repo_root: Utf8PathBuf::from("/work/shop"),
            out_dir: Utf8PathBuf::from("/work/shop/migrafix-out"),
            ..MigrationSettings::default()
        };
        let ex = s.fetch_excludes();
        assert!(ex.contains(&"./migrafix-out/*".to_string()));
        assert!(ex.contains(&"./migrafix-out/backups/*".to_string()));

        let outside = MigrationSettings {
            repo_root: Utf8PathBuf::from("/work/shop"),
            out_dir: Utf8PathBuf::from("/tmp/out"),
            ..MigrationSettings::default()
        };
        assert_eq!(outside.fetch_excludes(), outside.exclude);
    }

    #[test]
    fn derived_paths() {
        let s = MigrationSettings::default();
        assert_eq!(s.backup_root(), Utf8PathBuf::from("migrafix-out/backups"));
        assert_eq!(s.cache_path(), Utf8PathBuf::from("migrafix-out/cache/responses.json"));
    }
}
