//! Keybinding records
//!
//! A `Binding` maps a key within a scope to a handler, plus the metadata the
//! legend and cheatsheet need. Handlers and the dynamic providers are plain
//! closures on the dispatch thread; providers must be cheap and must not do
//! I/O, since they run on every legend refresh and dispatch pass.

use std::rc::Rc;

use ratatui::style::Style;

use super::dispatch::ActionContext;
use super::keys::Key;
use super::tasks::TaskCoordinator;

/// The keybinding namespace a binding belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    View(String),
}

impl Scope {
    pub fn view(name: impl Into<String>) -> Self {
        Scope::View(name.into())
    }
}

/// A user-facing explanation for why a bound action is currently unavailable.
/// Absence means the binding is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledReason {
    pub text: String,
}

impl DisabledReason {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub type Handler = Rc<dyn Fn(&mut ActionContext) -> eyre::Result<()>>;
pub type DescriptionFn = Rc<dyn Fn() -> String>;
pub type DisabledFn = Rc<dyn Fn() -> Option<DisabledReason>>;

/// Read-only view of cross-cutting state, handed to guards.
pub struct GuardCtx<'a> {
    pub stack: &'a super::context::ContextStack,
    pub tasks: &'a TaskCoordinator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Allow,
    Deny(Option<String>),
}

/// A precondition check evaluated before a handler runs. Guards are stored
/// outer-to-inner; the first denial stops resolution.
pub type Guard = Rc<dyn Fn(&GuardCtx) -> GuardVerdict>;

/// Deny when an ephemeral context (menu, confirmation, prompt) is focused.
pub fn no_popup_guard() -> Guard {
    Rc::new(|ctx: &GuardCtx| {
        if ctx.stack.top().borrow().kind().is_ephemeral() {
            GuardVerdict::Deny(None)
        } else {
            GuardVerdict::Allow
        }
    })
}

/// Deny while any background operation is still running.
pub fn not_busy_guard() -> Guard {
    Rc::new(|ctx: &GuardCtx| {
        if ctx.tasks.has_inflight_work() {
            GuardVerdict::Deny(Some("an operation is still running".to_string()))
        } else {
            GuardVerdict::Allow
        }
    })
}

/// A key-to-handler mapping within one scope.
///
/// Built with `Binding::new` plus the builder methods; the struct itself is
/// immutable once registered.
#[derive(Clone)]
pub struct Binding {
    pub scope: Scope,
    pub key: Key,
    pub alternative: Option<Key>,
    pub handler: Handler,
    pub description: String,
    pub description_fn: Option<DescriptionFn>,
    pub short_description: String,
    pub short_description_fn: Option<DescriptionFn>,
    pub tag: String,
    pub opens_menu: bool,
    pub display_on_screen: bool,
    pub display_style: Option<Style>,
    pub tooltip: String,
    pub disabled_fn: Option<DisabledFn>,
    pub guards: Vec<Guard>,
}

impl Binding {
    pub fn new(
        scope: Scope,
        key: Key,
        handler: impl Fn(&mut ActionContext) -> eyre::Result<()> + 'static,
    ) -> Self {
        Self {
            scope,
            key,
            alternative: None,
            handler: Rc::new(handler),
            description: String::new(),
            description_fn: None,
            short_description: String::new(),
            short_description_fn: None,
            tag: String::new(),
            opens_menu: false,
            display_on_screen: false,
            display_style: None,
            tooltip: String::new(),
            disabled_fn: None,
            guards: Vec::new(),
        }
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    pub fn description_fn(mut self, f: impl Fn() -> String + 'static) -> Self {
        self.description_fn = Some(Rc::new(f));
        self
    }

    pub fn short_description(mut self, text: impl Into<String>) -> Self {
        self.short_description = text.into();
        self
    }

    pub fn short_description_fn(mut self, f: impl Fn() -> String + 'static) -> Self {
        self.short_description_fn = Some(Rc::new(f));
        self
    }

    pub fn alternative(mut self, key: Key) -> Self {
        self.alternative = Some(key);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn opens_menu(mut self) -> Self {
        self.opens_menu = true;
        self
    }

    pub fn display_on_screen(mut self) -> Self {
        self.display_on_screen = true;
        self
    }

    pub fn display_style(mut self, style: Style) -> Self {
        self.display_style = Some(style);
        self
    }

    pub fn tooltip(mut self, text: impl Into<String>) -> Self {
        self.tooltip = text.into();
        self
    }

    pub fn disabled_if(mut self, f: impl Fn() -> Option<DisabledReason> + 'static) -> Self {
        self.disabled_fn = Some(Rc::new(f));
        self
    }

    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Dynamic description wins over the static one when present.
    pub fn describe(&self) -> String {
        match &self.description_fn {
            Some(f) => f(),
            None => self.description.clone(),
        }
    }

    /// Short description for the on-screen legend; falls back to the full one.
    pub fn describe_short(&self) -> String {
        if let Some(f) = &self.short_description_fn {
            return f();
        }
        if !self.short_description.is_empty() {
            return self.short_description.clone();
        }
        self.describe()
    }

    pub fn matches(&self, key: Key) -> bool {
        self.key == key || self.alternative == Some(key)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("scope", &self.scope)
            .field("key", &self.key)
            .field("description", &self.description)
            .field("tag", &self.tag)
            .field("opens_menu", &self.opens_menu)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(scope: Scope, key: Key) -> Binding {
        Binding::new(scope, key, |_| Ok(()))
    }

    #[test]
    fn test_dynamic_description_wins() {
        let binding = noop(Scope::Global, Key::char('q'))
            .description("static")
            .description_fn(|| "dynamic".to_string());
        assert_eq!(binding.describe(), "dynamic");
    }

    #[test]
    fn test_short_description_falls_back_to_full() {
        let binding = noop(Scope::Global, Key::char('q')).description("quit");
        assert_eq!(binding.describe_short(), "quit");

        let binding = noop(Scope::Global, Key::char('q'))
            .description("quit the application")
            .short_description("quit");
        assert_eq!(binding.describe_short(), "quit");
    }

    #[test]
    fn test_alternative_key_matches() {
        let binding = noop(Scope::view("files"), Key::char('j')).alternative(Key::new(
            ratatui::crossterm::event::KeyCode::Down,
        ));
        assert!(binding.matches(Key::char('j')));
        assert!(binding.matches(Key::new(ratatui::crossterm::event::KeyCode::Down)));
        assert!(!binding.matches(Key::char('k')));
    }
}
