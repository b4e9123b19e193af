#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use tierlog_core::{Classification, Router, Tier, TriageConfig};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod bootstrap;
mod demo;

fn parse_tier(s: &str) -> std::result::Result<Tier, String> {
    s.parse()
}

#[derive(Parser, Debug)]
#[command(name = "tierlog")]
#[command(version)]
#[command(about = "Classify log lines with regex rules, an embedding classifier and an LLM fallback.", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override `general.log_level` (RUST_LOG still wins).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(long_about = "\
Classify messages through the full tier chain.

Rules are tried first, then the embedding classifier, then the LLM. \
Messages come from the arguments, or one per line on stdin.

Examples:
  tierlog classify \"Backup completed successfully.\"
  tail -f app.log | tierlog classify --json")]
    Classify {
        /// Messages to classify; read from stdin when empty.
        messages: Vec<String>,

        /// One JSON object per result.
        #[arg(long)]
        json: bool,

        /// Print router counters (Prometheus text) to stderr when done.
        #[arg(long)]
        stats: bool,
    },

    #[command(long_about = "\
Run a single tier on its own.

Examples:
  tierlog tier regex \"User User42 logged in.\"
  tierlog tier llm \"Escalation rule execution failed for ticket ID 3242.\"")]
    Tier {
        /// regex | embedding | llm
        #[arg(value_parser = parse_tier)]
        tier: Tier,

        /// Messages to classify; read from stdin when empty.
        messages: Vec<String>,

        /// One JSON object per result.
        #[arg(long)]
        json: bool,
    },

    /// Run each tier over its bundled sample messages.
    Demo,

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TriageConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TriageConfig::default(),
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.general.log_level.clone());
    init_tracing(&level, cli.log_json)?;

    match cli.command {
        Commands::Classify {
            messages,
            json,
            stats,
        } => {
            let router = bootstrap::build_router(&config, Tier::all())?;
            let messages = collect_messages(messages)?;
            let failures = run(&router, None, &messages, json).await?;
            if stats {
                eprint!("{}", router.counters().snapshot().to_prometheus());
            }
            finish(failures, messages.len())
        }

        Commands::Tier {
            tier,
            messages,
            json,
        } => {
            let router = bootstrap::build_router(&config, &[tier])?;
            let messages = collect_messages(messages)?;
            let failures = run(&router, Some(tier), &messages, json).await?;
            finish(failures, messages.len())
        }

        Commands::Demo => run_demo(&config).await,

        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        let subscriber = fmt::Subscriber::builder()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("setting default subscriber failed")
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .context("setting default subscriber failed")
    }
}

fn collect_messages(args: Vec<String>) -> Result<Vec<String>> {
    if !args.is_empty() {
        return Ok(args);
    }
    let mut messages = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if !line.trim().is_empty() {
            messages.push(line);
        }
    }
    Ok(messages)
}

/// Classify every message, printing one line per result. Returns how many
/// calls failed.
async fn run(router: &Router, tier: Option<Tier>, messages: &[String], json: bool) -> Result<usize> {
    let mut failures = 0;

    for message in messages {
        let result = match tier {
            Some(tier) => router.classify_with(tier, message).await,
            None => router.classify(message).await,
        };
        match result {
            Ok(classification) => emit(format_result(message, &classification, json))?,
            Err(e) => {
                failures += 1;
                if json {
                    emit(json!({ "message": message, "error": e.to_string() }))?;
                } else {
                    eprintln!("error: {e}: {message}");
                }
            }
        }
    }
    Ok(failures)
}

/// One output line for a classified message.
fn format_result(message: &str, classification: &Classification, json: bool) -> String {
    if json {
        json!({
            "message": message,
            "label": classification.label,
            "tier": classification.tier,
            "confidence": classification.confidence,
        })
        .to_string()
    } else {
        format!("{classification}\t{message}")
    }
}

/// Write one line to stdout, holding the lock only for the write.
fn emit(line: impl std::fmt::Display) -> Result<()> {
    writeln!(std::io::stdout().lock(), "{line}")?;
    Ok(())
}

fn finish(failures: usize, total: usize) -> Result<()> {
    if failures > 0 {
        bail!("{failures} of {total} messages could not be classified");
    }
    Ok(())
}

async fn run_demo(config: &TriageConfig) -> Result<()> {
    for &tier in Tier::all() {
        emit(format_args!("== {tier} =="))?;
        let router = match bootstrap::build_router(config, &[tier]) {
            Ok(router) if router.has_tier(tier) => router,
            Ok(_) => {
                emit("(tier disabled in configuration)")?;
                continue;
            }
            Err(e) => {
                warn!("skipping {tier} tier: {e}");
                emit(format_args!("(unavailable: {e})"))?;
                continue;
            }
        };

        for message in demo::samples(tier) {
            match router.classify_with(tier, message).await {
                Ok(classification) => emit(format_result(message, &classification, false))?,
                Err(e) => emit(format_args!("error: {e}\t{message}"))?,
            }
        }
    }
    info!("demo finished");
    Ok(())
}
