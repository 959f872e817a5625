use std::path::Path;
use std::process::Output;

use anyhow::Context;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::workspace::truncate_home_path;

const SESSION_FORMAT: &str = "#{session_id}|#{session_name}|#{session_path}";

/// One tmux session as reported by `list-sessions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub name: String,
    /// Home-relative working directory of the session.
    pub path: String,
    pub is_current: bool,
}

/// Conditions callers need to distinguish, classified from tmux stderr.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TmuxError {
    #[error("tmux server is not running")]
    NotRunning,
    #[error("tmux session already exists")]
    SessionExists,
    #[error("tmux session not found")]
    SessionNotFound,
}

fn classify(output: &str) -> Option<TmuxError> {
    if output.starts_with("no server running") {
        Some(TmuxError::NotRunning)
    } else if output.starts_with("duplicate session") {
        Some(TmuxError::SessionExists)
    } else if output.starts_with("can't find session") {
        Some(TmuxError::SessionNotFound)
    } else {
        None
    }
}

/// True when running inside a tmux client.
pub fn is_in_session() -> bool {
    std::env::var_os("TMUX").is_some_and(|v| !v.is_empty())
}

async fn run_tmux(args: &[&str]) -> anyhow::Result<Output> {
    Command::new("tmux")
        .args(args)
        .output()
        .await
        .context("failed to run tmux")
}

fn check_output(output: &Output, what: &str) -> anyhow::Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if let Some(err) = classify(stderr.trim_start()) {
        return Err(err.into());
    }
    anyhow::bail!("{} failed: {}", what, stderr.trim())
}

/// The session this process is attached to, if any.
pub async fn current_session() -> anyhow::Result<Session> {
    let output = run_tmux(&["display-message", "-p", SESSION_FORMAT]).await?;
    check_output(&output, "tmux display-message")?;
    let line = String::from_utf8_lossy(&output.stdout);
    let mut session = parse_session(line.trim())?;
    session.is_current = true;
    Ok(session)
}

/// All sessions, current one first and never duplicated. An absent tmux
/// server yields an empty list rather than an error.
pub async fn sessions() -> anyhow::Result<Vec<Session>> {
    let output = run_tmux(&["list-sessions", "-F", SESSION_FORMAT]).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        match classify(stderr.trim_start()) {
            Some(TmuxError::NotRunning) => return Ok(Vec::new()),
            Some(err) => return Err(err.into()),
            None => anyhow::bail!("tmux list-sessions failed: {}", stderr.trim()),
        }
    }

    let current = if is_in_session() {
        current_session().await.ok()
    } else {
        None
    };

    let mut result = Vec::new();
    if let Some(current) = &current {
        result.push(current.clone());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    for line in stdout.lines() {
        let Ok(session) = parse_session(line) else {
            continue;
        };
        if current.as_ref().is_some_and(|c| c.id == session.id) {
            continue;
        }
        result.push(session);
    }

    Ok(result)
}

/// Create a detached session rooted at `path`.
pub async fn create(name: &str, path: &str) -> anyhow::Result<()> {
    debug!(name, path, "creating tmux session");
    let output = run_tmux(&["new-session", "-d", "-s", name, "-c", path]).await?;
    check_output(&output, "tmux new-session")
}

/// Attach to a session by name or id. Outside tmux this replaces the current
/// process with `tmux attach-session`; inside, it switches the client.
pub async fn attach(target: &str) -> anyhow::Result<()> {
    if !is_in_session() {
        // On success this never returns.
        let err = exec::Command::new("tmux")
            .args(&["attach-session", "-t", target])
            .exec();
        return Err(anyhow::anyhow!("failed to exec tmux attach: {}", err));
    }

    let output = run_tmux(&["switch-client", "-t", target]).await?;
    check_output(&output, "tmux switch-client")
}

/// Create the session if it does not exist, then attach to it.
pub async fn create_or_attach(name: &str, path: &str) -> anyhow::Result<()> {
    if let Err(err) = create(name, path).await {
        match err.downcast_ref::<TmuxError>() {
            Some(TmuxError::SessionExists) => {}
            _ => return Err(err.context(format!("failed to create session {}", name))),
        }
    }
    attach(name)
        .await
        .with_context(|| format!("failed to attach to session {}", name))
}

pub async fn pane_create(path: &str) -> anyhow::Result<()> {
    let output = run_tmux(&["split-window", "-c", path]).await?;
    check_output(&output, "tmux split-window")
}

pub async fn window_create(path: &str) -> anyhow::Result<()> {
    let output = run_tmux(&["new-window", "-c", path]).await?;
    check_output(&output, "tmux new-window")
}

/// Derive a session name from a directory path: basename with spaces and
/// dots replaced, since tmux rejects `.` in session names.
pub fn session_name_from_path(path: &str) -> String {
    let base = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    base.replace([' ', '.'], "_")
}

fn parse_session(line: &str) -> anyhow::Result<Session> {
    let mut parts = line.splitn(3, '|');
    let (Some(id), Some(name), Some(path)) = (parts.next(), parts.next(), parts.next()) else {
        anyhow::bail!("unexpected output from list-sessions: {}", line);
    };
    Ok(Session {
        id: id.trim().to_string(),
        name: name.trim().to_string(),
        path: truncate_home_path(Path::new(path.trim())),
        is_current: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_tmux_stderr() {
        assert_eq!(
            classify("no server running on /tmp/tmux-1000/default"),
            Some(TmuxError::NotRunning)
        );
        assert_eq!(
            classify("duplicate session: api"),
            Some(TmuxError::SessionExists)
        );
        assert_eq!(
            classify("can't find session: gone"),
            Some(TmuxError::SessionNotFound)
        );
        assert_eq!(classify("protocol version mismatch"), None);
    }

    #[test]
    fn parses_session_line() {
        let session = parse_session("$3|api|/tmp/work/api").unwrap();
        assert_eq!(session.id, "$3");
        assert_eq!(session.name, "api");
        assert_eq!(session.path, "/tmp/work/api");
        assert!(!session.is_current);
    }

    #[test]
    fn parse_rejects_short_lines() {
        assert!(parse_session("$3|api").is_err());
        assert!(parse_session("").is_err());
    }

    #[test]
    fn session_name_replaces_awkward_characters() {
        assert_eq!(session_name_from_path("/home/u/my project"), "my_project");
        assert_eq!(session_name_from_path("/home/u/api.v2"), "api_v2");
        assert_eq!(session_name_from_path("/home/u/plain"), "plain");
    }
}
