//! Hookwork CLI - rule management and manual triggering

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use hookwork_hooks::{
    cli::{format_history_table, OutputFormat},
    ConfigLoader, ConfigValidator, ContextOverrides, HookEngine, HookworkConfig,
    JsonFileRuleStore, RuleCli, RuleCommand, TriggerKind,
};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hookwork")]
#[command(about = "Manage and trigger event-driven automation rules")]
#[command(version)]
struct Cli {
    /// Directory of the rule store
    #[arg(long, global = true, default_value = ".hookwork")]
    store: PathBuf,

    /// Configuration file
    #[arg(long, global = true, default_value = "hookwork.yaml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the rules in the configuration file
    Validate,
    /// Create every rule from the configuration file in the store
    Import,
    /// List stored rules
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one rule
    Inspect {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Enable a rule
    Enable { id: String },
    /// Disable a rule
    Disable { id: String },
    /// Delete a rule
    Delete { id: String },
    /// Report an event and wait for the matched rules to finish
    Trigger {
        /// Trigger kind, e.g. post.published
        kind: String,

        /// Event data as JSON
        #[arg(short, long, default_value = "{}")]
        data: String,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        session: Option<String>,
    },
    /// Show recent executions
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ConfigLoader::load_from_path(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    match cli.command {
        Commands::Validate => validate(&config),
        Commands::Import => {
            let engine = build_engine(&cli.store, &config)?;
            import(&engine, config).await
        }
        Commands::Trigger {
            kind,
            data,
            user,
            session,
        } => {
            let engine = build_engine(&cli.store, &config)?;
            engine.start().await;
            trigger(&engine, &kind, &data, user, session).await
        }
        Commands::List { json } => {
            run_rule_command(&cli.store, &config, RuleCommand::List {
                format: OutputFormat::json(json),
            })
            .await
        }
        Commands::Inspect { id, json } => {
            run_rule_command(&cli.store, &config, RuleCommand::Inspect {
                id,
                format: OutputFormat::json(json),
            })
            .await
        }
        Commands::Enable { id } => {
            run_rule_command(&cli.store, &config, RuleCommand::Enable { id }).await
        }
        Commands::Disable { id } => {
            run_rule_command(&cli.store, &config, RuleCommand::Disable { id }).await
        }
        Commands::Delete { id } => {
            run_rule_command(&cli.store, &config, RuleCommand::Delete { id }).await
        }
        Commands::History { limit, json } => {
            run_rule_command(&cli.store, &config, RuleCommand::History {
                limit,
                format: OutputFormat::json(json),
            })
            .await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_engine(store: &Path, config: &HookworkConfig) -> anyhow::Result<HookEngine> {
    let engine = HookEngine::builder(Arc::new(JsonFileRuleStore::new(store)))
        .config(config.engine.clone())
        .with_builtin_handlers()
        .build()?;
    Ok(engine)
}

fn validate(config: &HookworkConfig) -> anyhow::Result<()> {
    ConfigValidator::validate_engine(&config.engine)?;

    let mut invalid = 0;
    for rule in &config.rules {
        match ConfigValidator::validate_new_rule(rule) {
            Ok(()) => println!("✓ {}", rule.name),
            Err(e) => {
                invalid += 1;
                println!("✗ {}: {}", rule.name, e);
            }
        }
    }

    if invalid > 0 {
        bail!("{} of {} rules are invalid", invalid, config.rules.len());
    }
    println!("{} rules valid", config.rules.len());
    Ok(())
}

async fn import(engine: &HookEngine, config: HookworkConfig) -> anyhow::Result<()> {
    if config.rules.is_empty() {
        warn!("No rules to import");
        return Ok(());
    }

    for rule in config.rules {
        let name = rule.name.clone();
        let created = engine
            .create_rule(rule)
            .await
            .with_context(|| format!("Failed to import rule '{}'", name))?;
        println!("Imported rule '{}' ({})", created.name, created.id);
    }
    engine.shutdown().await;
    Ok(())
}

async fn trigger(
    engine: &HookEngine,
    kind: &str,
    data: &str,
    user: Option<String>,
    session: Option<String>,
) -> anyhow::Result<()> {
    let trigger = TriggerKind::from(kind);
    if !trigger.is_known() {
        warn!(trigger = %trigger, "Not a built-in trigger kind");
    }

    let event_data: Value = serde_json::from_str(data).context("--data must be valid JSON")?;

    let mut overrides = ContextOverrides::default();
    if let Some(user) = user {
        overrides = overrides.with_user(user);
    }
    if let Some(session) = session {
        overrides = overrides.with_session(session);
    }

    let matched = engine.trigger(trigger, event_data, overrides)?;
    engine.wait_idle().await?;
    info!(matched = matched, "Trigger processed");

    println!("Matched {} rule(s)", matched);
    if matched > 0 {
        let mut entries = engine.recent_executions(matched).await?;
        entries.reverse();
        println!("{}", format_history_table(&entries));
    }

    engine.shutdown().await;
    Ok(())
}

async fn run_rule_command(
    store: &Path,
    config: &HookworkConfig,
    command: RuleCommand,
) -> anyhow::Result<()> {
    let engine = build_engine(store, config)?;
    let output = RuleCli::new(engine.manager().clone())
        .execute(command)
        .await?;
    println!("{}", output);
    engine.shutdown().await;
    Ok(())
}
