use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use agent_connections::action::{Action, ParamType};
use agent_connections::connection::config_schema;
use agent_connections::credential::EnvFileCredentialStore;
use agent_connections::generative::GenerativeTextConfig;
use agent_connections::http::HttpConnectionConfig;
use agent_connections::prompt::StdioPrompter;
use agent_connections::{AgentConfig, ConnectionFactory, ConnectionManager};

#[derive(Parser, Debug)]
#[command(name = "agent-connections", version, about = "Configure and exercise agent connections")]
struct Cli {
    /// Agent configuration file (YAML or JSON)
    #[arg(short, long, default_value = "agents/default.yaml")]
    config: PathBuf,

    /// Env file credentials are read from and written to
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List configured connections and whether they are ready
    ListConnections,

    /// List the actions a connection supports
    ListActions { connection: String },

    /// Interactively set up a connection's credentials
    Configure { connection: String },

    /// Run an action; arguments are key=value pairs
    Action {
        connection: String,
        action: String,
        args: Vec<String>,
    },

    /// Print the JSON schema of a connection type's configuration
    Schema { kind: String },
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string()))
        .with_writer(std::io::stderr)
        .init();
}

/// `key=value`; the value is JSON when it parses, a plain string otherwise.
/// Parameters `action` declares as strings always keep the raw text.
fn parse_args(pairs: &[String], action: Option<&Action>) -> Result<Map<String, Value>> {
    let mut args = Map::new();
    for pair in pairs {
        let Some((key, raw)) = pair.split_once('=') else {
            bail!("argument `{}` is not in key=value form", pair);
        };
        if key.is_empty() {
            bail!("argument `{}` has an empty key", pair);
        }
        let wants_string = action
            .and_then(|a| a.parameter(key))
            .is_some_and(|p| p.param_type == ParamType::String);
        let value = if wants_string {
            Value::String(raw.to_string())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        args.insert(key.to_string(), value);
    }
    Ok(args)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_manager(cli: &Cli) -> Result<ConnectionManager> {
    let config = AgentConfig::from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let factory =
        ConnectionFactory::new(Arc::new(EnvFileCredentialStore::new(cli.env_file.clone())));
    Ok(ConnectionManager::from_config(&config, &factory)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("agent_connections=info");

    let cli = Cli::parse();

    match &cli.command {
        Command::ListConnections => {
            let manager = load_manager(&cli)?;
            print_json(&manager.list_connections().await)?;
        }
        Command::ListActions { connection } => {
            let manager = load_manager(&cli)?;
            print_json(&manager.list_actions(connection)?)?;
        }
        Command::Configure { connection } => {
            let manager = load_manager(&cli)?;
            let configured = manager
                .configure_connection(connection, &StdioPrompter)
                .await?;
            if !configured {
                bail!("{} was not configured", connection);
            }
            println!("{} is configured", connection);
        }
        Command::Action {
            connection,
            action,
            args,
        } => {
            let manager = load_manager(&cli)?;
            let actions = manager.list_actions(connection)?;
            let target = actions.iter().find(|a| a.name == *action);
            let result = manager
                .perform_action(connection, action, parse_args(args, target)?)
                .await?;
            print_json(&result)?;
        }
        Command::Schema { kind } => {
            let schema = match kind.as_str() {
                "http" | "custom" => config_schema::<HttpConnectionConfig>(),
                "gemini" => config_schema::<GenerativeTextConfig>(),
                other => bail!("Unknown connection type: {}", other),
            };
            print_json(&schema)?;
        }
    }

    Ok(())
}
