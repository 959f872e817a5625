use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use futures::future::join_all;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::content::{KEY_MODE_NEXT, KEY_MODE_PREV, SEPARATOR};

/// Upper bound on each individual picker-control call.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(2);

/// fzf exit code when the user cancels with Esc or Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

/// Run fzf to completion with the given header and initial content.
///
/// Returns the accepted payload (`category|identifier`), or `None` when the
/// user cancelled or accepted nothing. The listen port is how the refresh
/// coordinator reaches the running picker.
pub async fn run(port: u16, header: &str, content: &str) -> anyhow::Result<Option<String>> {
    let action_cmd = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "mpk".to_string());

    let mut cmd = Command::new("fzf");
    cmd.args([
        "--ansi",
        "--no-sort",
        "--no-hscroll",
        "--delimiter",
        SEPARATOR,
        // Lines carry four fields: show 1-2, search 2, emit 3-4 on accept.
        "--with-nth",
        "1,2",
        "--nth",
        "2",
        "--accept-nth",
        "3,4",
    ]);
    cmd.arg("--header").arg(header);
    cmd.arg("--listen").arg(port.to_string());
    cmd.arg("--bind").arg(format!(
        "{}:execute-silent({} action mode-next)",
        KEY_MODE_NEXT, action_cmd
    ));
    cmd.arg("--bind").arg(format!(
        "{}:execute-silent({} action mode-previous)",
        KEY_MODE_PREV, action_cmd
    ));
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().context("failed to start fzf (is it installed?)")?;

    let mut stdin = child
        .stdin
        .take()
        .context("failed to open fzf stdin")?;
    stdin.write_all(content.as_bytes()).await?;
    drop(stdin);

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        if output.status.code() == Some(EXIT_CANCELLED) {
            info!("picker cancelled by user");
            return Ok(None);
        }
        anyhow::bail!(
            "fzf exited with status {}",
            output.status.code().unwrap_or(-1)
        );
    }

    let selection = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!selection.is_empty()).then_some(selection))
}

/// Push a new header and entry list into the running picker.
///
/// The picker's control channel takes one command per call, so three
/// independent calls go out concurrently: replace the header, reload the
/// content, move the cursor to the first row. All three are always
/// attempted; any failures are aggregated into one error. The committed
/// mode change is never rolled back on a refresh failure.
pub async fn refresh(port: u16, header: &str, content: &str) -> anyhow::Result<()> {
    // The listen API takes a command for reload rather than inline content,
    // so the entries go through a temp file the picker can cat.
    let file = NamedTempFile::new().context("failed to create picker content file")?;
    std::fs::write(file.path(), content).context("failed to write picker content file")?;

    let commands = [
        format!("change-header({})", header),
        format!("reload-sync(cat {})", file.path().display()),
        "first".to_string(),
    ];

    let results = join_all(commands.into_iter().map(|body| send_command(port, body))).await;

    // Keep the file around briefly; reload-sync may still be reading it.
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(file);
    });

    let failures: Vec<String> = results
        .into_iter()
        .filter_map(|result| result.err())
        .map(|err| format!("{:#}", err))
        .collect();

    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("picker refresh failed: {}", failures.join("; "))
    }
}

async fn send_command(port: u16, body: String) -> anyhow::Result<()> {
    debug!(port, command = %body.lines().next().unwrap_or(""), "sending picker command");
    tokio::task::spawn_blocking(move || {
        let agent = ureq::AgentBuilder::new().timeout(REFRESH_TIMEOUT).build();
        agent
            .post(&format!("http://localhost:{}", port))
            .send_string(&body)
            .map_err(|err| anyhow::anyhow!("picker command failed: {}", err))?;
        Ok(())
    })
    .await
    .context("picker command task failed")?
}
