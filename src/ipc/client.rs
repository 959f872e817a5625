use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::protocol::{Request, Response};

/// Transport failures are distinct from errors the launcher itself reports.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to {path}: {source} (is the launcher running?)")]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("malformed response: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("{0}")]
    Application(String),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        !matches!(self, ClientError::Application(_))
    }
}

/// One-shot client for the launcher control socket.
///
/// Each `call` owns exactly one connection: dial, write the request line,
/// read the response line, close. Used by short-lived CLI invocations.
pub struct IpcClient {
    socket_path: PathBuf,
}

impl IpcClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| ClientError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;
        let mut reader = BufReader::new(stream);

        let mut line = serde_json::to_string(&Request::with_params(method, params))?;
        line.push('\n');
        debug!(method, "sending request");
        reader.get_mut().write_all(line.as_bytes()).await?;
        reader.get_mut().flush().await?;

        let mut response_line = String::new();
        let n = reader.read_line(&mut response_line).await?;
        if n == 0 {
            return Err(ClientError::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed connection without a response",
            )));
        }

        let response: Response = serde_json::from_str(&response_line)?;
        response.into_result().map_err(ClientError::Application)
    }
}
