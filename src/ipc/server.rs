use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Context as _;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::protocol::{Request, Response};

type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;
type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

/// Request/response server on a Unix socket.
///
/// Each accepted connection is handled on its own task and carries exactly
/// one request and at most one response. Handlers are registered before
/// `start` and must be safe to call concurrently; the only shared mutable
/// state they touch is whatever they capture.
pub struct IpcServer {
    socket_path: PathBuf,
    handlers: HashMap<String, Handler>,
    shutdown: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
}

impl IpcServer {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            handlers: HashMap::new(),
            shutdown: CancellationToken::new(),
            accept_task: None,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Associate a method name with a handler. Must be called before `start`.
    pub fn register_handler<F, Fut>(&mut self, method: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.handlers.insert(
            method.to_string(),
            Arc::new(move |params| Box::pin(handler(params))),
        );
    }

    /// Bind the socket and spawn the accept loop. Returns once listening.
    /// A stale socket file at the path is removed first; bind failure is
    /// reported to the caller.
    pub fn start(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(self.accept_task.is_none(), "server already started");

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).with_context(|| {
                format!("failed to remove stale socket {}", self.socket_path.display())
            })?;
        }

        let listener = UnixListener::bind(&self.socket_path).with_context(|| {
            format!("failed to bind socket at {}", self.socket_path.display())
        })?;
        debug!(socket = %self.socket_path.display(), "listening for connections");

        let handlers = Arc::new(self.handlers.clone());
        let shutdown = self.shutdown.clone();
        self.accept_task = Some(tokio::spawn(accept_loop(listener, handlers, shutdown)));

        Ok(())
    }

    /// Stop accepting, wait for the accept loop to exit, and remove the
    /// socket file. Idempotent; safe after a failed `start`.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.accept_task.take() {
            let _ = task.await;
        }
        self.remove_socket_file();
    }

    fn remove_socket_file(&self) {
        if self.socket_path.exists() {
            if let Err(err) = std::fs::remove_file(&self.socket_path) {
                warn!(%err, "failed to remove socket file");
            }
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.remove_socket_file();
    }
}

async fn accept_loop(
    listener: UnixListener,
    handlers: Arc<HashMap<String, Handler>>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("accept loop stopping");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let handlers = Arc::clone(&handlers);
                    tokio::spawn(handle_connection(stream, handlers));
                }
                Err(err) => {
                    // Per-connection failures never take down the loop.
                    error!(%err, "failed to accept connection");
                }
            },
        }
    }
}

async fn handle_connection(stream: UnixStream, handlers: Arc<HashMap<String, Handler>>) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    match reader.read_line(&mut line).await {
        Ok(0) => return,
        Ok(_) => {}
        Err(err) => {
            warn!(%err, "failed to read request");
            return;
        }
    }

    let request: Request = match serde_json::from_str(&line) {
        Ok(request) => request,
        Err(err) => {
            warn!(%err, "malformed request dropped");
            return;
        }
    };

    // Unknown methods close the connection without a response; the client
    // observes EOF. Kept from the original wire contract.
    let Some(handler) = handlers.get(&request.method) else {
        warn!(method = %request.method, "unknown method");
        return;
    };

    debug!(method = %request.method, "dispatching request");
    let response = match handler(request.params).await {
        Ok(result) => Response::ok(result),
        Err(err) => {
            debug!(method = %request.method, %err, "handler returned error");
            Response::err(err.to_string())
        }
    };

    let mut json = match serde_json::to_string(&response) {
        Ok(json) => json,
        Err(err) => {
            error!(%err, "failed to serialize response");
            return;
        }
    };
    json.push('\n');

    let stream = reader.get_mut();
    if let Err(err) = stream.write_all(json.as_bytes()).await {
        warn!(%err, "failed to write response");
        return;
    }
    let _ = stream.flush().await;
}
