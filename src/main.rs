//! tree-complete CLI: typeahead search over TREE hypermedia indexes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use tree_complete::autocomplete::AutoComplete;
use tree_complete::config::{PresetName, SearchConfig};
use tree_complete::event::{ChannelSink, QueryEmitter, SearchEvent};
use tree_complete::ranking::RankedEntry;

#[derive(Parser)]
#[command(name = "tree-complete", version, about = "Typeahead search over TREE hypermedia indexes")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root document of a tree (repeatable). Replaces the configured sources.
    #[arg(long = "source", short = 's', global = true)]
    sources: Vec<String>,

    /// Number of results to keep.
    #[arg(long, global = true)]
    size: Option<usize>,

    /// Similarity preset.
    #[arg(long, value_enum, global = true)]
    preset: Option<PresetName>,

    /// Load every root's relations before the first query.
    #[arg(long, global = true)]
    prefetch: bool,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one query and print the final results.
    Query {
        /// The text typed so far.
        text: String,
    },

    /// Read queries from stdin, one per line, and print every finished result list.
    ///
    /// Lines are dispatched without waiting, so a fast typist supersedes
    /// earlier queries exactly like keystrokes would.
    Interactive,

    /// Run a query, then print every fact seen about one subject.
    Resolve {
        /// The text to search for.
        text: String,
        /// IRI of the subject to describe.
        subject: String,
    },

    /// Write the effective configuration to a TOML file.
    SaveConfig {
        /// Destination path.
        path: PathBuf,
    },
}

fn effective_config(cli: &Cli) -> Result<SearchConfig> {
    let mut config = match &cli.config {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::default(),
    };
    if !cli.sources.is_empty() {
        config.sources = cli.sources.clone();
    }
    if let Some(size) = cli.size {
        config.size = size;
    }
    if let Some(preset) = cli.preset {
        config.preset = preset;
    }
    config.prefetch |= cli.prefetch;
    Ok(config)
}

async fn build(config: &SearchConfig) -> Result<Arc<AutoComplete>> {
    let search = AutoComplete::new(config.to_autocomplete_config(), Arc::new(config.http_fetcher()))?;
    if config.prefetch {
        let relations = search.prefetch().await;
        tracing::info!(relations, "prefetch complete");
    }
    Ok(Arc::new(search))
}

/// Wrap the matched character ranges of `value` in brackets.
fn highlight(value: &str, overlap: &[(usize, usize)]) -> String {
    let mut out = String::with_capacity(value.len() + 2 * overlap.len());
    for (i, c) in value.chars().enumerate() {
        if overlap.iter().any(|(start, _)| *start == i) {
            out.push('[');
        }
        out.push(c);
        if overlap.iter().any(|(_, end)| *end == i) {
            out.push(']');
        }
    }
    out
}

fn print_results(query: &str, results: &[RankedEntry], json: bool) -> Result<()> {
    if json {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|e| {
                serde_json::json!({
                    "value": e.fact.object.value(),
                    "subject": e.fact.subject.value(),
                    "predicate": e.fact.predicate,
                    "similarity": e.scores.as_slice(),
                    "overlap": e.overlap,
                })
            })
            .collect();
        let out = serde_json::json!({ "query": query, "results": rows });
        println!("{}", serde_json::to_string(&out).into_diagnostic()?);
        return Ok(());
    }

    println!("{query:?}: {} result(s)", results.len());
    for (rank, entry) in results.iter().enumerate() {
        println!(
            "  {:>2}. {}  <{}>",
            rank + 1,
            highlight(entry.fact.object.value(), &entry.overlap),
            entry.fact.subject.value()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
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
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = effective_config(&cli)?;

    match &cli.command {
        Commands::Query { text } => {
            let search = build(&config).await?;
            search.query(text).await;
            print_results(text, &search.results(), cli.json)?;
        }

        Commands::Interactive => {
            let search = build(&config).await?;
            let (sink, mut events) = ChannelSink::new();
            let _sub = search.subscribe(sink);

            // Print whenever the query that is still current finishes.
            let printer = {
                let search = search.clone();
                let json = cli.json;
                tokio::spawn(async move {
                    while let Some(event) = events.recv().await {
                        if let SearchEvent::End { metadata } = event {
                            if search.current_query().as_deref() == Some(metadata.query.as_str()) {
                                if let Err(error) = print_results(&metadata.query, &search.results(), json) {
                                    tracing::warn!(%error, "failed to print results");
                                }
                            }
                        }
                    }
                })
            };

            let mut queries = JoinSet::new();
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await.into_diagnostic()? {
                let search = search.clone();
                queries.spawn(async move { search.query(&line).await });
            }
            while queries.join_next().await.is_some() {}
            drop(_sub);
            printer.abort();
        }

        Commands::Resolve { text, subject } => {
            let search = build(&config).await?;
            if !search.has_store() {
                miette::bail!("resolve needs the result store; set `use_store = true`");
            }
            search.query(text).await;
            let facts = search.resolve_subject(subject);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&facts).into_diagnostic()?);
            } else {
                for fact in &facts {
                    println!("{fact}");
                }
                eprintln!("{} fact(s) about <{subject}>", facts.len());
            }
        }

        Commands::SaveConfig { path } => {
            config.save(path)?;
            println!("Wrote configuration to {}", path.display());
        }
    }

    Ok(())
}
