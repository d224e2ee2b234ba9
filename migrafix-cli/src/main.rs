mod config;
mod confirm;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::{CliOverrides, ConfigMerger};
use confirm::ConsoleConfirm;
use migrafix_core::adapters::{
    AutoConfirm, DeclineConfirm, FsRepoView, FsSourceFetcher, FsWritePort, ShellGitPort,
    http_generation_context,
};
use migrafix_core::pipeline::write_migration_artifacts;
use migrafix_core::ports::{ConfirmPort, VcsPort};
use migrafix_core::{MigrationOutcome, MigrationPorts, ToolError, run_migration};
use migrafix_llm::Provider;
use migrafix_types::ToolInfo;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "migrafix",
    version,
    about = "LLM-assisted migration of Spring 5 projects to Spring 6 and the jakarta namespace."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze the repository, propose changes and (with --apply) apply them.
    Migrate(MigrateArgs),
    /// Copy files back from a backup manifest.
    Restore(RestoreArgs),
    /// List the namespace renames migrafix verifies against.
    Rules(RulesArgs),
}

#[derive(Debug, Parser)]
struct MigrateArgs {
    /// Repository root (default: current directory).
    #[arg(long, default_value = ".")]
    repo: Utf8PathBuf,

    /// Output directory for artifacts (default: <repo>/migrafix-out).
    #[arg(long)]
    out: Option<Utf8PathBuf>,

    /// Config file (default: <repo>/migrafix.toml when present).
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Write confirmed changes to the working tree. Without it, only a
    /// preview patch is produced.
    #[arg(long, default_value_t = false)]
    apply: bool,

    /// Confirm automatic changes without asking.
    #[arg(long, short, default_value_t = false)]
    yes: bool,

    /// Commit applied changes on a new branch.
    #[arg(long, default_value_t = false)]
    git: bool,

    /// Push the new branch to `origin` (implies --git).
    #[arg(long, default_value_t = false)]
    push: bool,

    /// Generation provider (openai, anthropic).
    #[arg(long)]
    provider: Option<Provider>,

    #[arg(long)]
    model: Option<String>,

    /// Files processed concurrently.
    #[arg(long)]
    workers: Option<usize>,

    /// Attempts per generation request, including the first.
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Analyze at most N files, Spring-relevant paths first (N >= 10).
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(10..))]
    max_files: Option<u64>,

    /// Project name used in prompts and reports (default: directory name).
    #[arg(long)]
    project: Option<String>,

    /// Go straight to change generation.
    #[arg(long, default_value_t = false)]
    skip_analysis: bool,

    /// Do not read or write the response cache.
    #[arg(long, default_value_t = false)]
    no_cache: bool,
}

#[derive(Debug, Parser)]
struct RestoreArgs {
    /// Path to a backup manifest.json.
    #[arg(long)]
    manifest: Utf8PathBuf,

    /// Restore into this directory instead of the original repository.
    #[arg(long)]
    target: Option<Utf8PathBuf>,

    /// Verify backup copies and list what would be restored.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Parser)]
struct RulesArgs {
    #[arg(long, default_value = ".")]
    repo: Utf8PathBuf,

    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = real_main(cli) {
        eprintln!("migrafix: {e}");
        return ExitCode::from(e.exit_code());
    }
    ExitCode::from(0)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(cli: Cli) -> Result<(), ToolError> {
    match cli.cmd {
        Command::Migrate(args) => cmd_migrate(args),
        Command::Restore(args) => cmd_restore(args),
        Command::Rules(args) => cmd_rules(args),
    }
}

fn cmd_migrate(args: MigrateArgs) -> Result<(), ToolError> {
    let file_config = config::load_or_default(&args.repo, args.config.as_deref())
        .context("load migrafix.toml config")?;
    let overrides = CliOverrides {
        repo_root: args.repo.clone(),
        out_dir: args.out.clone(),
        project: args.project.clone(),
        apply: args.apply,
        git: args.git || args.push,
        push: args.push,
        provider: args.provider,
        model: args.model.clone(),
        workers: args.workers,
        max_attempts: args.max_attempts,
        max_files: args.max_files.map(|n| usize::try_from(n).unwrap_or(usize::MAX)),
        no_cache: args.no_cache,
        skip_analysis: args.skip_analysis,
    };
    let (settings, llm) = ConfigMerger::new(file_config).merge_migrate_args(&overrides);
    debug!(?settings, ?llm, "merged config");

    let cache_path = settings.cache_path();
    let ctx = http_generation_context(&llm, Some(&cache_path))
        .context("configure generation service")?;

    let fetcher = FsSourceFetcher::from_settings(&settings)?;
    let repo = FsRepoView::new(settings.repo_root.clone());
    let writer = FsWritePort;
    let git = ShellGitPort::new(settings.repo_root.clone());
    let vcs = settings.git.then_some(&git as &dyn VcsPort);

    let auto = AutoConfirm;
    let decline = DeclineConfirm;
    let console = ConsoleConfirm::new(
        std::io::stdin().lock(),
        std::io::stderr(),
        settings.project_name(),
    );
    let confirm: &dyn ConfirmPort = if args.yes {
        &auto
    } else if std::io::stdin().is_terminal() {
        &console
    } else {
        if settings.apply {
            warn!("stdin is not a terminal; declining all changes (pass --yes to apply)");
        }
        &decline
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    let outcome = runtime.block_on(run_migration(
        &settings,
        &ctx,
        MigrationPorts {
            fetcher: &fetcher,
            repo: &repo,
            writer: &writer,
            confirm,
            vcs,
        },
        tool_info(),
    ))?;

    write_migration_artifacts(&outcome, &settings.out_dir, &writer)
        .with_context(|| format!("write artifacts to {}", settings.out_dir))?;
    print_summary(&outcome, &settings.out_dir);
    info!("wrote migration artifacts to {}", settings.out_dir);

    outcome.status()
}

fn print_summary(outcome: &MigrationOutcome, out_dir: &Utf8Path) {
    let s = &outcome.changes.summary;
    println!(
        "{} changes proposed ({} automatic, {} manual review, {} downgraded)",
        s.total, s.automatic, s.manual, s.downgraded
    );
    let report = &outcome.report;
    if !report.failed_files.is_empty() {
        println!("{} files failed generation", report.failed_files.len());
    }
    if let Some(reason) = &report.apply_aborted {
        println!("apply aborted: {reason}");
    }
    if let Some(app) = &outcome.application {
        println!(
            "applied {}, skipped {}, failed {}, files modified {}",
            app.summary.applied, app.summary.skipped, app.summary.failed, app.summary.files_modified
        );
    }
    if let Some(manifest) = &outcome.backup_manifest {
        println!("backup: {}", manifest.backup_dir);
    }
    println!("artifacts: {out_dir}");
}

fn cmd_restore(args: RestoreArgs) -> Result<(), ToolError> {
    let report = migrafix_edit::restore(&args.manifest, args.target.as_deref(), args.dry_run)
        .with_context(|| format!("restore from {}", args.manifest))?;

    let verb = if report.dry_run { "would restore" } else { "restored" };
    for path in &report.restored {
        println!("{verb} {path}");
    }
    for failure in &report.failed {
        println!("failed {}: {}", failure.path, failure.reason);
    }

    if report.is_clean() {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{} of {} files could not be restored",
            report.failed.len(),
            report.failed.len() + report.restored.len()
        )
        .into())
    }
}

fn cmd_rules(args: RulesArgs) -> Result<(), ToolError> {
    let file_config = config::load_or_default(&args.repo, args.config.as_deref())
        .context("load migrafix.toml config")?;
    let (settings, _) = ConfigMerger::new(file_config).merge_migrate_args(&CliOverrides {
        repo_root: args.repo.clone(),
        ..CliOverrides::default()
    });
    let table = settings.namespace_table();

    match args.format {
        OutputFormat::Text => {
            println!("Namespace renames:");
            for m in table.mappings() {
                println!("  {} -> {}", m.from, m.to);
            }
            println!();
            println!("Never renamed:");
            for e in table.exclusions() {
                println!("  {e}");
            }
        }
        OutputFormat::Json => {
            let value = serde_json::json!({
                "mappings": table.mappings(),
                "exclusions": table.exclusions(),
            });
            let s = serde_json::to_string_pretty(&value).context("serialize rules")?;
            println!("{s}");
        }
    }
    Ok(())
}

fn tool_info() -> ToolInfo {
    ToolInfo::migrafix(env!("CARGO_PKG_VERSION"))
}
