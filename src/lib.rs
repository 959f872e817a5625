pub mod cli;
pub mod config;
pub mod content;
pub mod ipc;
pub mod launcher;
pub mod mode;
pub mod picker;
pub mod tmux;
pub mod workspace;
