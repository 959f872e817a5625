use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::content::{self, Category};
use crate::ipc::protocol::{
    METHOD_CONTENT_GET, METHOD_MODE_GET, METHOD_MODE_NEXT, METHOD_MODE_PREV, METHOD_OPEN_IN,
    OpenInParams,
};
use crate::ipc::server::IpcServer;
use crate::mode::{Mode, ModeState};
use crate::{picker, tmux, workspace};

/// Long-lived side of the launcher: owns the mode state, serves the control
/// socket, and runs the picker to completion.
pub struct Launcher {
    config: Arc<Config>,
    mode: Arc<ModeState>,
    socket_path: PathBuf,
    port: u16,
}

impl Launcher {
    pub fn new(config: Config, socket_path: PathBuf) -> Self {
        let port = config.picker_port();
        Self {
            config: Arc::new(config),
            mode: Arc::new(ModeState::default()),
            socket_path,
            port,
        }
    }

    /// Serve the control socket and run the picker until the user accepts a
    /// selection, cancels, or `shutdown` fires. The socket file is removed
    /// before this returns.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut server = IpcServer::new(&self.socket_path);
        self.register_handlers(&mut server);
        server.start()?;

        let mode = self.mode.get();
        let (header, content) = assemble(&self.config, mode).await;

        let selection = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("shutdown requested, closing picker");
                None
            }
            result = picker::run(self.port, &header, &content) => result?,
        };

        server.stop().await;

        if let Some(selection) = selection {
            let (category, identifier) = content::parse_selection(&selection)?;
            open_in(category, &identifier, OpenTarget::Session).await?;
        }
        Ok(())
    }

    fn register_handlers(&self, server: &mut IpcServer) {
        let port = self.port;

        let state = Arc::clone(&self.mode);
        let config = Arc::clone(&self.config);
        server.register_handler(METHOD_MODE_NEXT, move |_| {
            let state = Arc::clone(&state);
            let config = Arc::clone(&config);
            async move {
                let mode = state.next();
                refresh_picker(port, &config, mode).await?;
                Ok(json!({"mode": mode}))
            }
        });

        let state = Arc::clone(&self.mode);
        let config = Arc::clone(&self.config);
        server.register_handler(METHOD_MODE_PREV, move |_| {
            let state = Arc::clone(&state);
            let config = Arc::clone(&config);
            async move {
                let mode = state.previous();
                refresh_picker(port, &config, mode).await?;
                Ok(json!({"mode": mode}))
            }
        });

        let state = Arc::clone(&self.mode);
        server.register_handler(METHOD_MODE_GET, move |_| {
            let state = Arc::clone(&state);
            async move { Ok(json!({"mode": state.get()})) }
        });

        let state = Arc::clone(&self.mode);
        let config = Arc::clone(&self.config);
        server.register_handler(METHOD_CONTENT_GET, move |_| {
            let state = Arc::clone(&state);
            let config = Arc::clone(&config);
            async move {
                let (_, content) = assemble(&config, state.get()).await;
                Ok(json!({"content": content}))
            }
        });

        server.register_handler(METHOD_OPEN_IN, move |params| async move {
            let (category, identifier, target) = parse_open_in(params)?;
            open_in(category, &identifier, target).await?;
            Ok(Value::Null)
        });
    }
}

/// Build the header and entry list for a mode. tmux being unreachable
/// degrades to an empty session list instead of failing the build.
async fn assemble(config: &Config, mode: Mode) -> (String, String) {
    let sessions = match tmux::sessions().await {
        Ok(sessions) => sessions,
        Err(err) => {
            warn!(%err, "could not list tmux sessions");
            Vec::new()
        }
    };
    let dirs = workspace::directories(config);

    let header = content::build_header(mode);
    let content = content::build_content(mode, &sessions, &dirs);
    (header, content)
}

/// Rebuild content for the new mode and push it into the running picker.
/// The mode is already committed by the time this runs; a failed refresh
/// surfaces as the handler's error without rolling the mode back.
async fn refresh_picker(port: u16, config: &Config, mode: Mode) -> anyhow::Result<()> {
    let (header, content) = assemble(config, mode).await;
    picker::refresh(port, &header, &content).await
}

/// Where an accepted directory opens: a full session, or a pane/window of
/// the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenTarget {
    #[default]
    Session,
    Pane,
    Window,
}

impl OpenTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenTarget::Session => "session",
            OpenTarget::Pane => "pane",
            OpenTarget::Window => "window",
        }
    }
}

impl fmt::Display for OpenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(OpenTarget::Session),
            "pane" => Ok(OpenTarget::Pane),
            "window" => Ok(OpenTarget::Window),
            other => Err(anyhow::anyhow!("unknown open target: {}", other)),
        }
    }
}

/// Validate `launcher.openIn` params. All fields are trimmed; an unknown
/// category, empty path, or bad target is rejected before any tmux command
/// runs. Pane and window targets need a directory to root them in.
pub fn parse_open_in(params: Value) -> anyhow::Result<(Category, String, OpenTarget)> {
    let params: OpenInParams =
        serde_json::from_value(params).context("invalid openIn parameters")?;
    let category = params.category.trim().parse::<Category>()?;
    let path = params.path.trim().to_string();
    anyhow::ensure!(!path.is_empty(), "openIn path must not be empty");

    let target = match params.target.as_deref() {
        None => OpenTarget::Session,
        Some(raw) => raw.trim().parse::<OpenTarget>()?,
    };
    if target != OpenTarget::Session {
        anyhow::ensure!(
            category == Category::Directory,
            "open target {} requires a directory selection",
            target
        );
    }

    Ok((category, path, target))
}

/// Act on an accepted entry: attach to the session, create-or-attach a
/// session named after the directory, or split a pane/window of the current
/// session rooted at the directory.
pub async fn open_in(
    category: Category,
    identifier: &str,
    target: OpenTarget,
) -> anyhow::Result<()> {
    match (category, target) {
        (Category::Session, _) => tmux::attach(identifier).await,
        (Category::Directory, OpenTarget::Session) => {
            let name = tmux::session_name_from_path(identifier);
            tmux::create_or_attach(&name, identifier).await
        }
        (Category::Directory, OpenTarget::Pane) => tmux::pane_create(identifier).await,
        (Category::Directory, OpenTarget::Window) => tmux::window_create(identifier).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_open_in_accepts_valid_params() {
        let (category, path, target) =
            parse_open_in(json!({"category": "directory", "path": "/tmp/work"})).unwrap();
        assert_eq!(category, Category::Directory);
        assert_eq!(path, "/tmp/work");
        assert_eq!(target, OpenTarget::Session);
    }

    #[test]
    fn parse_open_in_trims_whitespace() {
        let (category, path, _) =
            parse_open_in(json!({"category": " session ", "path": "$3 \n"})).unwrap();
        assert_eq!(category, Category::Session);
        assert_eq!(path, "$3");
    }

    #[test]
    fn parse_open_in_rejects_bogus_category() {
        let err = parse_open_in(json!({"category": "bogus", "path": "/tmp"})).unwrap_err();
        assert!(err.to_string().contains("unknown category"));
    }

    #[test]
    fn parse_open_in_rejects_missing_fields() {
        assert!(parse_open_in(json!({"category": "session"})).is_err());
        assert!(parse_open_in(json!({"category": "session", "path": "  "})).is_err());
        assert!(parse_open_in(Value::Null).is_err());
    }

    #[test]
    fn parse_open_in_accepts_pane_and_window_targets() {
        let (_, _, target) = parse_open_in(
            json!({"category": "directory", "path": "/tmp/work", "target": "pane"}),
        )
        .unwrap();
        assert_eq!(target, OpenTarget::Pane);

        let (_, _, target) = parse_open_in(
            json!({"category": "directory", "path": "/tmp/work", "target": " window "}),
        )
        .unwrap();
        assert_eq!(target, OpenTarget::Window);
    }

    #[test]
    fn parse_open_in_rejects_bogus_target() {
        let err = parse_open_in(
            json!({"category": "directory", "path": "/tmp/work", "target": "tab"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown open target"));
    }

    #[test]
    fn parse_open_in_rejects_pane_target_for_sessions() {
        let err =
            parse_open_in(json!({"category": "session", "path": "$3", "target": "pane"}))
                .unwrap_err();
        assert!(err.to_string().contains("requires a directory"));
    }
}
