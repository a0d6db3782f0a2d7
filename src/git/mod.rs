//! Git command construction and execution.

pub mod command;
pub mod service;

pub use command::GitCommand;
pub use service::{GitService, ShellGitService};
