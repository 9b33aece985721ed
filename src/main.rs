mod analysis;
mod config;
mod diff;
mod patch;
mod planner;
mod report;
mod semantic;
mod targets;

use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use report::{PatchOutcome, PatchStatus, TaskReportEntry};

/// docsmith — turns a code diff into a documentation plan: structured
/// changes, prioritized doc tasks, target files, and optional patches.
#[derive(Parser, Debug)]
#[command(name = "docsmith", version, about)]
struct Cli {
    /// Path to a unified diff file
    ///
    /// Not required when --demo is used.
    diff_file: Option<PathBuf>,

    /// Repository root containing the documentation
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    /// Commit message accompanying the diff, used as a categorization hint
    #[arg(short, long)]
    message: Option<String>,

    /// Maximum target files per task (overrides config)
    #[arg(long)]
    max_files: Option<usize>,

    /// Write auto-generated patches to the repository
    #[arg(long)]
    apply: bool,

    /// Validate patches without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Optional output file path for markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use a built-in sample diff for demo purposes (no API key needed)
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (diff_text, diff_source) = if cli.demo {
        info!("using built-in sample diff for demo");
        (
            include_str!("../tests/fixtures/sample_diff.patch").to_string(),
            "built-in demo diff".to_string(),
        )
    } else {
        let path = cli.diff_file.as_deref().ok_or(
            "A diff file is required unless --demo is used. Usage: docsmith <DIFF_FILE> or docsmith --demo",
        )?;
        (std::fs::read_to_string(path)?, path.display().to_string())
    };

    let _main_span = info_span!("docsmith", source = %diff_source).entered();

    info!("loading configuration");
    let config = config::Config::load(&cli.repo)?;
    let max_files = cli.max_files.unwrap_or(config.selector.max_files);

    info!("analyzing diff");
    let changes = analysis::ChangeAnalyzer::new().analyze(&diff_text, cli.message.as_deref());
    info!(changes = changes.len(), "extracted structured changes");

    info!("planning documentation tasks");
    let tasks = planner::DocumentationTaskPlanner::new().plan(&changes);
    info!(tasks = tasks.len(), "planned tasks");

    // Semantic matching needs an embedding client; without one the selector
    // degrades to convention matching.
    let store = semantic::InMemoryDocumentStore::new();
    let embeddings: Option<Box<dyn semantic::EmbeddingClient>> = if cli.demo {
        Some(Box::new(semantic::FakeEmbeddingClient::new(256)))
    } else if let Some(api_key) = config.embedding_api_key() {
        Some(Box::new(semantic::HttpEmbeddingClient::new(
            &config.embedding.endpoint,
            &api_key,
            &config.embedding.model,
        )))
    } else {
        info!("no embedding API key configured, using convention matching only");
        None
    };

    let repo_id = cli.repo.to_string_lossy().to_string();
    if let Some(client) = embeddings.as_deref() {
        let framework = targets::DocFramework::detect(&cli.repo);
        let docs_root = cli.repo.join(framework.docs_root(&cli.repo));
        match semantic::index_docs(&store, client, &repo_id, &cli.repo, &docs_root).await {
            Ok(indexed) => info!(chunks = indexed, %framework, "indexed documentation"),
            Err(err) => warn!(%err, "doc indexing failed, selection degrades to conventions"),
        }
    }

    info!("selecting target files");
    let selector = targets::TargetFileSelector::new(
        embeddings.as_deref(),
        Some(&store as &dyn semantic::DocumentStore),
    )
    .with_thresholds(
        config.selector.similarity_threshold,
        config.selector.duplicate_threshold,
    );
    let mut entries = Vec::new();
    for task in tasks {
        let selected = selector.select(&task, &cli.repo, max_files).await;
        entries.push(TaskReportEntry {
            task,
            targets: selected,
        });
    }

    let outcomes = if cli.apply || cli.dry_run {
        let dry_run = cli.dry_run || !cli.apply;
        info!(dry_run, "generating patches");
        let history = if dry_run {
            patch::PatchHistory::in_memory()
        } else {
            patch::PatchHistory::at(&cli.repo.join(&config.history.path))?
        };
        let mut generator = patch::PatchGenerator::with_history(&cli.repo, history);
        apply_entries(&mut generator, &entries, &cli.repo, dry_run)
    } else {
        Vec::new()
    };

    info!("generating report");
    let built = report::build(&diff_source, changes, entries, outcomes);
    report::output(&built, cli.output.as_deref())?;
    info!("done");

    Ok(())
}

/// Generate and apply one patch per target of every auto-generatable task.
/// Navigation targets are structurally edited; content targets get the
/// task's template created or appended.
fn apply_entries(
    generator: &mut patch::PatchGenerator,
    entries: &[TaskReportEntry],
    repo_root: &Path,
    dry_run: bool,
) -> Vec<PatchOutcome> {
    let mut outcomes = Vec::new();
    for entry in entries {
        if !entry.task.auto_generate {
            for target in &entry.targets {
                outcomes.push(PatchOutcome {
                    file_path: target.path.clone(),
                    action: "-".to_string(),
                    status: PatchStatus::Skipped("manual review required".to_string()),
                });
            }
            continue;
        }
        for target in &entry.targets {
            let new_content = match patch_content(&entry.task, target, repo_root) {
                Some(content) => content,
                None => continue,
            };
            let mut generated = match generator.generate(&target.path, Some(new_content.as_str())) {
                Ok(generated) => generated,
                Err(err) => {
                    outcomes.push(PatchOutcome {
                        file_path: target.path.clone(),
                        action: "-".to_string(),
                        status: PatchStatus::Failed(err.to_string()),
                    });
                    continue;
                }
            };
            let status = match generator.apply(&mut generated, dry_run) {
                Ok(()) if dry_run => PatchStatus::Validated,
                Ok(()) => PatchStatus::Applied,
                Err(err) => PatchStatus::Failed(err.to_string()),
            };
            outcomes.push(PatchOutcome {
                file_path: target.path.clone(),
                action: generated.action.to_string(),
                status,
            });
        }
    }
    outcomes
}

/// Desired full content of a target file, or None when nothing changes.
fn patch_content(
    task: &planner::DocumentationTask,
    target: &targets::TargetFile,
    repo_root: &Path,
) -> Option<String> {
    let current = std::fs::read_to_string(repo_root.join(&target.path)).ok();

    if target.metadata.contains_key("new_entries") {
        let existing = current.unwrap_or_default();
        let updated = targets::apply_navigation_update(&existing, target);
        if updated == existing {
            return None;
        }
        return Some(updated);
    }

    match current {
        None => Some(task.content_template.clone()),
        Some(existing) => {
            let mut updated = existing;
            if !updated.is_empty() && !updated.ends_with('\n') {
                updated.push('\n');
            }
            updated.push('\n');
            updated.push_str(&task.content_template);
            Some(updated)
        }
    }
}
