//! Typed errors for the runtime core
//!
//! Only `ConfigError` is allowed to be fatal, and only during startup.
//! Everything else is converted to a status-line message at the
//! dispatcher/coordinator boundary.

use thiserror::Error;

/// A defect in binding registration or configuration. Halts initialization.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("global keybinding '{key}' is already registered")]
    DuplicateGlobalBinding { key: String },

    #[error("unrecognized key name '{name}' in config")]
    UnknownKeyName { name: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackError {
    #[error("context '{0}' is already on the stack")]
    AlreadyOnStack(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("a '{0}' operation is already in progress")]
    OperationInProgress(String),
}
