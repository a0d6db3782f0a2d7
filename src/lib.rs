//! Terminal git client: keybinding registry, context stack, dispatcher,
//! background task coordination, and the git command layer underneath.

pub mod cli;
pub mod config;
pub mod git;
pub mod tui;
