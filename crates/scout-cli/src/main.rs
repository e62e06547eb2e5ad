//! Scout CLI - run research tools and sub-agents from the command line
//!
//! Every invocation opens a fresh task-board session, runs one tool call
//! against it, then prints the tool output, the board and the nested usage.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use scout_core::config::ConfigManager;
use scout_core::context::DEFAULT_RUN_LABEL;
use scout_core::tools::ToolRegistry;
use scout_core::{
    GenAiBackend, TaskBoardStore, ToolContext, ToolProfile, ToolsetBuilder, UsageLedger,
};

#[derive(Parser)]
#[command(name = "scout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Research tools and sub-agents with a live task board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Tool profile: all, telegram or minimal (defaults to config setting)
    #[arg(short, long)]
    profile: Option<String>,

    /// Default model for research sub-agents
    #[arg(short, long)]
    model: Option<String>,

    /// Print board updates as they happen
    #[arg(long)]
    watch: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available tools
    Tools,

    /// Show configuration
    Config,

    /// Invoke one tool with JSON parameters
    Run {
        /// Tool name (see `scout tools`)
        tool: String,

        /// Tool parameters as a JSON object
        #[arg(default_value = "{}")]
        params: String,

        /// Run label on the task board
        #[arg(long, default_value = DEFAULT_RUN_LABEL)]
        run_label: String,
    },

    /// Run a research sub-agent on a prompt
    Research {
        /// Research request
        prompt: String,

        /// Sub-agent to use: web or scientific
        #[arg(short, long, default_value = "web")]
        agent: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(manager.config().general.log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let mut config = manager.config().clone();
    if let Some(model) = &cli.model {
        config.general.default_model = Some(model.clone());
    }
    let profile: ToolProfile = match &cli.profile {
        Some(p) => p.parse()?,
        None => config.general.tool_profile.parse()?,
    };

    let store = Arc::new(TaskBoardStore::new());
    let usage = Arc::new(UsageLedger::new());
    let backend = Arc::new(GenAiBackend::new(config.general.default_model.clone()));
    let registry = ToolsetBuilder::new(config.clone(), store.clone(), usage.clone())
        .with_profile(profile)
        .with_backend(backend)
        .build();

    match cli.command {
        Commands::Tools => show_tools(&registry),
        Commands::Config => show_config(&manager)?,
        Commands::Run {
            tool,
            params,
            run_label,
        } => {
            let params: Value =
                serde_json::from_str(&params).context("Tool parameters must be a JSON object")?;
            run_tool(&registry, &store, &usage, &tool, params, &run_label, cli.watch).await?;
        }
        Commands::Research { prompt, agent } => {
            let tool = match agent.to_lowercase().as_str() {
                "web" | "websearcher" => "websearcher_research",
                "scientific" | "science" => "scientific_research",
                other => bail!("Unknown research agent: {}", other),
            };
            let params = json!({ "prompt": prompt });
            run_tool(&registry, &store, &usage, tool, params, DEFAULT_RUN_LABEL, cli.watch).await?;
        }
    }

    Ok(())
}

async fn run_tool(
    registry: &ToolRegistry,
    store: &Arc<TaskBoardStore>,
    usage: &UsageLedger,
    tool: &str,
    params: Value,
    run_label: &str,
    watch: bool,
) -> anyhow::Result<()> {
    if registry.get(tool).is_none() {
        bail!(
            "Tool '{}' is not available with the current configuration. Available: {}",
            tool,
            registry.names().join(", ")
        );
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    store.create_session(&session_id, "Scout");
    let listener = watch.then(|| {
        store.register_listener(
            &session_id,
            Arc::new(|board: &str| eprintln!("{}\n", board)),
        )
    });

    let ctx = ToolContext::new(session_id.clone(), run_label)
        .with_tool_call_id(uuid::Uuid::new_v4().to_string());
    let output = registry.invoke(tool, params, ctx).await;

    if let Some(id) = listener {
        store.unregister_listener(&session_id, id);
    }

    println!("{}", output);
    println!();
    println!("{}", store.render(&session_id));
    println!();
    println!("{}", usage.summary());

    store.close_session(&session_id);
    Ok(())
}

fn show_tools(registry: &ToolRegistry) {
    println!("Available Tools:");
    println!();
    let mut definitions = registry.list();
    definitions.sort_by(|a, b| a.name.cmp(&b.name));
    for def in definitions {
        println!("  {:<24} {}", def.name, def.description);
    }
}

fn show_config(manager: &ConfigManager) -> anyhow::Result<()> {
    let config = manager.config();
    println!("Config file: {}", manager.path().display());
    println!();
    println!(
        "Brave API key:   {}",
        if config.brave.get_api_key().is_some() { "configured" } else { "missing" }
    );
    println!(
        "SerpAPI key(s):  {}",
        if config.serpapi.get_api_key().is_some() { "configured" } else { "missing" }
    );
    println!();

    let mut redacted = config.clone();
    redacted.brave.api_key = redacted.brave.api_key.map(|_| "***".to_string());
    redacted.serpapi.api_key = redacted.serpapi.api_key.map(|_| "***".to_string());
    println!("{}", toml::to_string_pretty(&redacted)?);
    Ok(())
}
