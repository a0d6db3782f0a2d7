//! Interactive runtime: contexts, keybindings, dispatch, background tasks.

pub mod app;
pub mod automation;
pub mod binding;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod keys;
pub mod menu;
pub mod registry;
pub mod status;
pub mod tasks;
pub mod ui;

pub use app::App;
pub use context::{Context, ContextKind, ContextStack, SharedContext};
pub use keys::Key;
