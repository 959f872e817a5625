use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::config::{Config, config_path};
use crate::content;
use crate::ipc::client::IpcClient;
use crate::ipc::protocol::{
    METHOD_CONTENT_GET, METHOD_MODE_GET, METHOD_MODE_NEXT, METHOD_MODE_PREV, METHOD_OPEN_IN,
    OpenInParams,
};

/// Every action call gets one bounded attempt; a wedged launcher must not
/// hang key bindings inside the picker.
const ACTION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(name = "mpk", version, about = "tmux session launcher with a live picker")]
pub struct Cli {
    /// Control socket path (overrides the configured one)
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Start the control server and the interactive picker (the default)
    Launch,
    /// Send one request to a running launcher
    #[command(subcommand)]
    Action(ActionCommand),
    /// Inspect or edit the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ActionCommand {
    /// Switch the picker to the next mode
    ModeNext,
    /// Switch the picker to the previous mode
    ModePrevious,
    /// Print the current mode
    ModeGet,
    /// Print the current entry list
    ContentGet,
    /// Open a picker selection (`category|identifier`)
    OpenIn {
        selection: String,
        /// Open a directory in a `pane` or `window` of the current session
        /// instead of its own session
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration file path
    Path,
    /// Write a default configuration file
    Init,
    /// Open the configuration in $EDITOR
    Edit,
    /// Add a directory root
    Add {
        path: String,
        /// Levels of subdirectories to offer beneath the root
        #[arg(long, default_value_t = 0)]
        depth: u32,
    },
    /// Remove a directory root
    Remove { path: String },
    /// List configured directory roots
    List,
}

/// Run one action against a running launcher and print its result.
pub async fn run_action(command: &ActionCommand, socket_path: &Path) -> anyhow::Result<()> {
    let client = IpcClient::new(socket_path);

    match command {
        ActionCommand::ModeNext => {
            let result = call(&client, METHOD_MODE_NEXT, Value::Null).await?;
            print_mode(&result);
        }
        ActionCommand::ModePrevious => {
            let result = call(&client, METHOD_MODE_PREV, Value::Null).await?;
            print_mode(&result);
        }
        ActionCommand::ModeGet => {
            let result = call(&client, METHOD_MODE_GET, Value::Null).await?;
            print_mode(&result);
        }
        ActionCommand::ContentGet => {
            let result = call(&client, METHOD_CONTENT_GET, Value::Null).await?;
            print!("{}", result["content"].as_str().unwrap_or_default());
        }
        ActionCommand::OpenIn { selection, target } => {
            let (category, path) = content::parse_selection(selection)?;
            let params = serde_json::to_value(OpenInParams {
                category: category.to_string(),
                path,
                target: target.clone(),
            })?;
            call(&client, METHOD_OPEN_IN, params).await?;
        }
    }

    Ok(())
}

async fn call(client: &IpcClient, method: &str, params: Value) -> anyhow::Result<Value> {
    let result = tokio::time::timeout(ACTION_TIMEOUT, client.call(method, params))
        .await
        .context("timed out waiting for the launcher")??;
    Ok(result)
}

fn print_mode(result: &Value) {
    println!("{}", result["mode"].as_str().unwrap_or_default());
}

/// Run one config subcommand against the file on disk.
pub fn run_config(command: &ConfigCommand) -> anyhow::Result<()> {
    match command {
        ConfigCommand::Path => {
            println!("{}", config_path().display());
        }
        ConfigCommand::Init => {
            let path = config_path();
            anyhow::ensure!(
                !path.exists(),
                "configuration already exists at {}",
                path.display()
            );
            Config::default().save()?;
            println!("wrote default configuration to {}", path.display());
        }
        ConfigCommand::Edit => {
            let path = config_path();
            if !path.exists() {
                Config::default().save()?;
            }
            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vim".to_string());
            let status = std::process::Command::new(&editor)
                .arg(&path)
                .status()
                .with_context(|| format!("failed to run editor {}", editor))?;
            anyhow::ensure!(status.success(), "editor exited with {}", status);
        }
        ConfigCommand::Add { path, depth } => {
            let mut config = Config::load()?;
            config.add_directory(path, *depth)?;
            config.save()?;
            println!("added {}", path);
        }
        ConfigCommand::Remove { path } => {
            let mut config = Config::load()?;
            config.remove_directory(path)?;
            config.save()?;
            println!("removed {}", path);
        }
        ConfigCommand::List => {
            let config = Config::load()?;
            for dir in &config.directories {
                println!("{} (depth {})", dir.path, dir.depth);
            }
        }
    }

    Ok(())
}
