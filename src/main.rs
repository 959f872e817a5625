use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use muxpick::cli;
use muxpick::cli::{Cli, Commands};
use muxpick::config::Config;
use muxpick::launcher::Launcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is reserved for command output and the
    // picker pipeline.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let socket_path = cli.socket.clone().unwrap_or_else(|| config.socket_path());

    match cli.command.unwrap_or(Commands::Launch) {
        Commands::Launch => {
            let shutdown = CancellationToken::new();
            {
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("interrupt received, shutting down");
                        shutdown.cancel();
                    }
                });
            }
            Launcher::new(config, socket_path).run(shutdown).await
        }
        Commands::Action(action) => cli::run_action(&action, &socket_path).await,
        Commands::Config(command) => cli::run_config(&command),
    }
}
