// Control plane for the launcher: short-lived CLI invocations talk to the
// long-lived picker process over a Unix socket.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{ClientError, IpcClient};
pub use protocol::{OpenInParams, Request, Response};
pub use server::IpcServer;
