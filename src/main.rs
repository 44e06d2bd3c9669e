//! chainkb CLI: forward-chaining knowledge base with truth maintenance.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use chainkb::config::{KbConfig, Verbosity};
use chainkb::export::{AnswerExport, KbSnapshot, RetractionExport};
use chainkb::kb::KnowledgeBase;
use chainkb::parse::{parse_item, read_items};

#[derive(Parser)]
#[command(name = "chainkb", version, about = "Forward-chaining knowledge base with truth maintenance")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log assertions (-v) or every inference attempt (-vv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a knowledge file and print the resulting knowledge base.
    Show {
        /// Knowledge file with `fact:` / `rule:` lines.
        file: PathBuf,
    },

    /// Load a knowledge file and ask a query.
    Ask {
        /// Knowledge file with `fact:` / `rule:` lines.
        file: PathBuf,
        /// Query, e.g. "(isa ?x block)".
        query: String,
    },

    /// Load a knowledge file, retract items in order, and print the result.
    Retract {
        /// Knowledge file with `fact:` / `rule:` lines.
        file: PathBuf,
        /// Items to retract, e.g. "fact: (isa cube block)".
        #[arg(required = true)]
        items: Vec<String>,
    },
}

fn load(config: KbConfig, file: &Path) -> Result<KnowledgeBase> {
    let items = read_items(file)?;
    let kb = KnowledgeBase::from_items(config, items)?;
    tracing::info!(
        facts = kb.fact_count(),
        rules = kb.rule_count(),
        file = %file.display(),
        "knowledge base loaded"
    );
    Ok(kb)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => KbConfig::load(path)?,
        None => KbConfig::default(),
    };
    if cli.verbose > 0 {
        config.verbosity = Verbosity::from_count(cli.verbose);
    }

    match cli.command {
        Commands::Show { file } => {
            let kb = load(config, &file)?;
            if cli.json {
                print_json(&KbSnapshot::from_kb(&kb))?;
            } else {
                print!("{kb}");
            }
        }

        Commands::Ask { file, query } => {
            let kb = load(config, &file)?;
            let parsed = parse_item(&query)?;
            let answers = kb.ask(&parsed)?;

            if cli.json {
                let exported: Vec<AnswerExport> = answers
                    .iter()
                    .map(|a| AnswerExport::from_answer(&kb, a))
                    .collect();
                print_json(&exported)?;
            } else if answers.is_empty() {
                println!("No matches for {query}");
            } else {
                for answer in &answers {
                    let export = AnswerExport::from_answer(&kb, answer);
                    println!("{}  <-  {}", export.bindings, export.facts.join(", "));
                }
            }
        }

        Commands::Retract { file, items } => {
            let mut kb = load(config, &file)?;
            let mut outcomes = Vec::new();
            for text in &items {
                let item = parse_item(text)?;
                match kb.retract(&item) {
                    Ok(result) => outcomes.push(RetractionExport::from(&result)),
                    // Denied or missing retractions leave the store unchanged.
                    Err(e) => eprintln!("{:?}", miette::Report::new(e)),
                }
            }

            if cli.json {
                print_json(&serde_json::json!({
                    "retractions": outcomes,
                    "knowledge_base": KbSnapshot::from_kb(&kb),
                }))?;
            } else {
                for outcome in &outcomes {
                    if outcome.unasserted {
                        println!("Withdrew assertion (still supported)");
                    } else {
                        println!(
                            "Removed {} fact(s), {} rule(s), cascade depth {}",
                            outcome.removed_facts.len(),
                            outcome.removed_rules.len(),
                            outcome.cascade_depth
                        );
                    }
                }
                print!("{kb}");
            }
        }
    }

    Ok(())
}
