//! Side-effecting layer: filesystem, configuration and agent processes.

pub mod agent;
pub mod config;
pub mod init;
pub mod instructions;
pub mod process;
pub mod prompt;
pub mod run_log;
pub mod skills;
pub mod workspace;
