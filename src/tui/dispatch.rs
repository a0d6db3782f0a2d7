//! Keypress dispatch
//!
//! Resolves one key event at a time: focused scope first, then global, then
//! guard chain, then the disabled-reason check, then the handler. A miss is
//! silent; a handler failure becomes a status message and the loop carries
//! on. Nothing here suspends; slow work is handed to the task coordinator by
//! the handler itself.

use std::cell::Cell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::debug;
use ratatui::crossterm::event::{KeyCode, KeyModifiers};

use crate::git::service::GitService;

use super::binding::{GuardCtx, GuardVerdict, Scope};
use super::context::{ContextKind, ContextStack};
use super::keys::Key;
use super::registry::KeybindingRegistry;
use super::status::{MessageKind, StatusSink};
use super::tasks::TaskCoordinator;

/// What a handler sees. Handlers mutate UI state through the stack and
/// status sink only; repository work goes through `tasks`/`git`.
pub struct ActionContext<'a> {
    pub stack: &'a mut ContextStack,
    pub tasks: &'a TaskCoordinator,
    pub git: &'a Arc<dyn GitService>,
    pub registry: &'a KeybindingRegistry,
    pub status: &'a mut StatusSink,
    pub quit: &'a mut bool,
}

/// Single-threaded cooperative dispatch cycle. One key event is fully
/// resolved before the next is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Idle,
    Resolving,
    Executing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran (its own failure is surfaced, not returned).
    Handled,
    /// No binding matched; silently ignored.
    Unhandled,
    /// A guard denied execution.
    Denied,
    /// The binding's disabled reason refused execution.
    Disabled,
}

pub struct Dispatcher {
    registry: KeybindingRegistry,
    phase: Cell<DispatchPhase>,
}

impl Dispatcher {
    pub fn new(registry: KeybindingRegistry) -> Self {
        Self {
            registry,
            phase: Cell::new(DispatchPhase::Idle),
        }
    }

    pub fn registry(&self) -> &KeybindingRegistry {
        &self.registry
    }

    pub fn phase(&self) -> DispatchPhase {
        self.phase.get()
    }

    pub fn dispatch(&self, key: Key, ctx: &mut ActionContext) -> DispatchOutcome {
        debug_assert_eq!(self.phase.get(), DispatchPhase::Idle);
        self.phase.set(DispatchPhase::Resolving);
        let outcome = self.resolve(key, ctx);
        self.phase.set(DispatchPhase::Idle);
        outcome
    }

    fn resolve(&self, key: Key, ctx: &mut ActionContext) -> DispatchOutcome {
        // Prompt contexts consume plain text keys before binding lookup, so
        // typing into them cannot trigger panel or global actions.
        if ctx.stack.top().borrow().kind() == ContextKind::Prompt && feed_prompt(key, ctx) {
            return DispatchOutcome::Handled;
        }

        let scope = Scope::View(ctx.stack.top().borrow().name().to_string());
        let binding = self
            .registry
            .lookup(&scope, key)
            .or_else(|| self.registry.lookup(&Scope::Global, key));

        let Some(binding) = binding else {
            debug!("no binding for {} in scope {scope:?}", key.label());
            return DispatchOutcome::Unhandled;
        };

        // detach from the registry borrow before running anything
        let guards = binding.guards.clone();
        let handler = binding.handler.clone();
        let disabled = self.registry.compute_disabled_reason(binding);

        for guard in &guards {
            let verdict = guard(&GuardCtx {
                stack: ctx.stack,
                tasks: ctx.tasks,
            });
            if let GuardVerdict::Deny(message) = verdict {
                if let Some(text) = message {
                    ctx.status.set(text, MessageKind::Warning);
                }
                return DispatchOutcome::Denied;
            }
        }

        if let Some(reason) = disabled {
            ctx.status.set(reason.text, MessageKind::Warning);
            return DispatchOutcome::Disabled;
        }

        self.phase.set(DispatchPhase::Executing);
        match catch_unwind(AssertUnwindSafe(|| handler(ctx))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                ctx.status.set(format!("{err}"), MessageKind::Error);
            }
            Err(_) => {
                ctx.status
                    .set("action panicked".to_string(), MessageKind::Error);
            }
        }
        DispatchOutcome::Handled
    }
}

/// Feed a text key into the focused prompt's input buffer. Returns false for
/// keys the prompt does not consume (enter, esc, bound combos).
fn feed_prompt(key: Key, ctx: &mut ActionContext) -> bool {
    if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
        return false;
    }
    match key.code {
        KeyCode::Char(c) => {
            ctx.stack.top().borrow_mut().input_mut().push(c);
            true
        }
        KeyCode::Backspace => {
            ctx.stack.top().borrow_mut().input_mut().pop();
            true
        }
        _ => false,
    }
}

#[cfg(test)]
pub mod test_support {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use crate::git::service::GitService;
    use crate::tui::context::{Context, ContextKind, ContextStack};
    use crate::tui::registry::KeybindingRegistry;
    use crate::tui::status::StatusSink;
    use crate::tui::tasks::TaskCoordinator;

    use super::ActionContext;

    /// No-op git service for dispatch-level tests.
    pub struct NullGitService;

    impl GitService for NullGitService {
        fn execute(&self, _cmd: &crate::git::command::GitCommand) -> eyre::Result<String> {
            Ok(String::new())
        }
    }

    /// Owns everything an `ActionContext` borrows.
    pub struct TestHarness {
        pub stack: ContextStack,
        pub tasks: TaskCoordinator,
        pub git: Arc<dyn GitService>,
        pub registry: KeybindingRegistry,
        pub status: StatusSink,
        pub quit: bool,
    }

    impl TestHarness {
        pub fn new() -> Self {
            Self::with_root("files")
        }

        pub fn with_root(name: &str) -> Self {
            let root = Rc::new(RefCell::new(Context::new(name, ContextKind::Panel)));
            Self {
                stack: ContextStack::new(root),
                tasks: TaskCoordinator::new(),
                git: Arc::new(NullGitService),
                registry: KeybindingRegistry::new(),
                status: StatusSink::new(),
                quit: false,
            }
        }

        pub fn with_ctx<R>(&mut self, f: impl FnOnce(&mut ActionContext) -> R) -> R {
            let mut ctx = ActionContext {
                stack: &mut self.stack,
                tasks: &self.tasks,
                git: &self.git,
                registry: &self.registry,
                status: &mut self.status,
                quit: &mut self.quit,
            };
            f(&mut ctx)
        }
    }

    impl Default for TestHarness {
        fn default() -> Self {
            Self::new()
        }
    }
}
