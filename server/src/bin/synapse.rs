//! `synapse` CLI: thin wrapper over `services::query::QueryEngine`. Every
//! subcommand runs the full pipeline against a repository path and prints
//! one JSON document to stdout; nothing here contains analysis logic.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use synapse_graph::{analyze_repository, find_repo_root};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "synapse", version, about = "Living knowledge graph for source repositories")]
struct Cli {
    /// Repository root. Defaults to `SYNAPSE_REPO_ROOT` or the nearest
    /// ancestor containing `.git`.
    #[arg(long, global = true)]
    repo: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline and print a summary of what was found.
    Analyze,
    /// Print the full entity/relationship graph as JSON.
    Graph,
    /// Print the directory/file/entity condensed graph as JSON.
    Condensed,
    /// Blast-radius and risk assessment for one entity.
    BlastRadius { entity_id: String },
    /// Primary/secondary experts for one file.
    Expert { file_path: String },
    /// Per-module bus-factor / knowledge-gap heatmap.
    Heatmap,
    /// Per-file bus-factor summary.
    BusFactor {
        #[arg(long, default_value_t = 2)]
        warning_threshold: usize,
    },
    /// Architectural governance.
    Governance {
        #[command(subcommand)]
        action: GovernanceAction,
    },
}

#[derive(Subcommand)]
enum GovernanceAction {
    Validate,
    Layers,
    Drift {
        #[arg(long)]
        baseline: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let repo_root = cli.repo.unwrap_or_else(|| find_repo_root(&cwd));

    let (engine, summary) = analyze_repository(&repo_root, 1)?;
    if !summary.parse_failures.is_empty() {
        tracing::warn!(count = summary.parse_failures.len(), "some files failed to parse");
    }
    for warning in &summary.resolver_warnings {
        tracing::warn!("{warning}");
    }

    match cli.command {
        Command::Analyze => {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "entities": engine.graph.len(),
                    "relationships": engine.graph.relationships.len(),
                    "parse_failures": summary.parse_failures,
                    "resolver_warnings": summary.resolver_warnings,
                }))?
            );
        }
        Command::Graph => {
            println!("{}", serde_json::to_string_pretty(&engine.get_graph())?);
        }
        Command::Condensed => {
            println!(
                "{}",
                serde_json::to_string_pretty(&engine.get_condensed_graph())?
            );
        }
        Command::BlastRadius { entity_id } => {
            let response = engine.blast_radius(&entity_id)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Expert { file_path } => {
            let response = engine.expert_for(&file_path)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Heatmap => {
            println!("{}", serde_json::to_string_pretty(&engine.heatmap())?);
        }
        Command::BusFactor { warning_threshold } => {
            println!(
                "{}",
                serde_json::to_string_pretty(&engine.bus_factor_summary(warning_threshold))?
            );
        }
        Command::Governance { action } => match action {
            GovernanceAction::Validate => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&engine.governance_validate())?
                );
            }
            GovernanceAction::Layers => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&engine.governance_layers())?
                );
            }
            GovernanceAction::Drift { baseline } => {
                let response = engine.governance_drift(baseline.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        },
    }

    Ok(())
}
