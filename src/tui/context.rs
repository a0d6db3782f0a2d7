//! Focusable UI regions and the context stack
//!
//! A `Context` is one focusable region: a persistent panel, or an ephemeral
//! menu/confirmation/prompt pushed by an action. The stack decides focus: the
//! top context receives key input, lower ones stay visible but inert. The
//! root context is created at startup and can never be popped.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::error::StackError;
use super::menu::MenuState;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Panel,
    List,
    Menu,
    Confirmation,
    Prompt,
}

impl ContextKind {
    /// Ephemeral contexts are created by an action and destroyed when popped.
    pub fn is_ephemeral(&self) -> bool {
        matches!(
            self,
            ContextKind::Menu | ContextKind::Confirmation | ContextKind::Prompt
        )
    }
}

pub type SharedContext = Rc<RefCell<Context>>;

type FocusHook = Rc<dyn Fn()>;

pub struct Context {
    id: u64,
    name: String,
    kind: ContextKind,
    title: String,
    lines: Vec<String>,
    menu: Option<MenuState>,
    /// Selected line in panel and list contexts.
    cursor: usize,
    /// Text buffer for prompt contexts.
    input: String,
    on_focus_gained: Option<FocusHook>,
    on_focus_lost: Option<FocusHook>,
}

impl Context {
    pub fn new(name: impl Into<String>, kind: ContextKind) -> Self {
        let name = name.into();
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            title: name.clone(),
            name,
            kind,
            lines: Vec::new(),
            menu: None,
            cursor: 0,
            input: String::new(),
            on_focus_gained: None,
            on_focus_lost: None,
        }
    }

    pub fn panel(name: impl Into<String>) -> SharedContext {
        Rc::new(RefCell::new(Self::new(name, ContextKind::Panel)))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Scope name used to look up this context's bindings.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Rendered content, one entry per on-screen line.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn set_lines(&mut self, lines: Vec<String>) {
        self.lines = lines;
        if self.cursor >= self.lines.len() {
            self.cursor = self.lines.len().saturating_sub(1);
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor + 1 < self.lines.len() {
            self.cursor += 1;
        }
    }

    /// Line under the cursor, for actions that operate on the selection.
    pub fn selected_line(&self) -> Option<&str> {
        self.lines.get(self.cursor).map(String::as_str)
    }

    pub fn menu(&self) -> Option<&MenuState> {
        self.menu.as_ref()
    }

    pub fn menu_mut(&mut self) -> Option<&mut MenuState> {
        self.menu.as_mut()
    }

    pub fn set_menu(&mut self, menu: MenuState) {
        self.menu = Some(menu);
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn on_focus_gained(&mut self, hook: impl Fn() + 'static) {
        self.on_focus_gained = Some(Rc::new(hook));
    }

    pub fn on_focus_lost(&mut self, hook: impl Fn() + 'static) {
        self.on_focus_lost = Some(Rc::new(hook));
    }

    fn handle_focus_gained(&self) {
        if let Some(hook) = &self.on_focus_gained {
            hook();
        }
    }

    fn handle_focus_lost(&self) {
        if let Some(hook) = &self.on_focus_lost {
            hook();
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("lines", &self.lines.len())
            .finish()
    }
}

/// Non-empty ordered stack of contexts; the top element has focus.
pub struct ContextStack {
    stack: Vec<SharedContext>,
}

impl ContextStack {
    pub fn new(root: SharedContext) -> Self {
        root.borrow().handle_focus_gained();
        Self { stack: vec![root] }
    }

    /// Push a context and move focus to it. Pushing an instance that is
    /// already somewhere on the stack fails.
    pub fn push(&mut self, ctx: SharedContext) -> Result<(), StackError> {
        let id = ctx.borrow().id();
        if self.stack.iter().any(|c| c.borrow().id() == id) {
            return Err(StackError::AlreadyOnStack(ctx.borrow().name().to_string()));
        }
        self.top().borrow().handle_focus_lost();
        ctx.borrow().handle_focus_gained();
        self.stack.push(ctx);
        Ok(())
    }

    /// Remove the top context. Popping when only the root remains is a no-op;
    /// the stack never empties.
    pub fn pop(&mut self) -> Option<SharedContext> {
        if self.stack.len() == 1 {
            return None;
        }
        let popped = self.stack.pop()?;
        popped.borrow().handle_focus_lost();
        self.top().borrow().handle_focus_gained();
        Some(popped)
    }

    /// Atomic pop-then-push, used for non-modal panel switches. Works on the
    /// root too: the stack depth is unchanged, so the never-empty invariant
    /// holds throughout.
    pub fn replace(&mut self, ctx: SharedContext) -> Result<(), StackError> {
        let id = ctx.borrow().id();
        let top_id = self.top().borrow().id();
        if id == top_id {
            return Ok(());
        }
        if self.stack.iter().any(|c| c.borrow().id() == id) {
            return Err(StackError::AlreadyOnStack(ctx.borrow().name().to_string()));
        }
        self.top().borrow().handle_focus_lost();
        ctx.borrow().handle_focus_gained();
        *self.stack.last_mut().expect("stack is never empty") = ctx;
        Ok(())
    }

    pub fn top(&self) -> &SharedContext {
        self.stack.last().expect("stack is never empty")
    }

    /// Pop the top context if it is the given one. Used by actions that must
    /// close a specific popup without disturbing anything pushed after it.
    pub fn pop_if_top(&mut self, id: u64) -> bool {
        if self.top().borrow().id() == id {
            self.pop().is_some()
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedContext> {
        self.stack.iter()
    }

    /// Topmost context with the given scope name, if any.
    pub fn find(&self, name: &str) -> Option<SharedContext> {
        self.stack
            .iter()
            .rev()
            .find(|c| c.borrow().name() == name)
            .cloned()
    }
}
