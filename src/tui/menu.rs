//! Menus and confirmation popups
//!
//! Builds ephemeral list contexts from item sets. Selecting an enabled item
//! invokes its handler and closes the menu; selecting a disabled one surfaces
//! its reason and leaves the menu open; escape closes without invoking
//! anything. Confirmations are two-item menus with the same semantics.
//!
//! Menu contexts share the `menu` scope, so their navigation bindings are
//! registered once at startup.

use std::cell::RefCell;
use std::rc::Rc;

use super::binding::{Binding, DisabledReason, Handler, Scope};
use super::context::{Context, ContextKind, SharedContext};
use super::dispatch::ActionContext;
use super::error::{ConfigError, StackError};
use super::keys::Key;
use super::registry::KeybindingRegistry;
use super::status::MessageKind;

/// Scope name shared by all menu and confirmation contexts.
pub const MENU_SCOPE: &str = "menu";

pub struct MenuItem {
    pub label: String,
    pub on_select: Handler,
    pub disabled_reason: Option<DisabledReason>,
}

impl MenuItem {
    pub fn new(
        label: impl Into<String>,
        on_select: impl Fn(&mut ActionContext) -> eyre::Result<()> + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            on_select: Rc::new(on_select),
            disabled_reason: None,
        }
    }

    pub fn disabled(mut self, reason: impl Into<String>) -> Self {
        self.disabled_reason = Some(DisabledReason::new(reason));
        self
    }
}

pub struct MenuState {
    pub items: Vec<MenuItem>,
    pub cursor: usize,
}

impl MenuState {
    pub fn selected(&self) -> Option<&MenuItem> {
        self.items.get(self.cursor)
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.items.len() {
            self.cursor += 1;
        }
    }
}

/// Build a menu context from an ordered item set; one line per item.
pub fn build_menu(title: impl Into<String>, items: Vec<MenuItem>) -> SharedContext {
    let mut ctx = Context::new(MENU_SCOPE, ContextKind::Menu);
    ctx.set_title(title);
    ctx.set_lines(items.iter().map(|i| i.label.clone()).collect());
    ctx.set_menu(MenuState { items, cursor: 0 });
    Rc::new(RefCell::new(ctx))
}

/// Two-item confirmation specialization.
pub fn build_confirmation(
    title: impl Into<String>,
    prompt: impl Into<String>,
    on_confirm: impl Fn(&mut ActionContext) -> eyre::Result<()> + 'static,
) -> SharedContext {
    let items = vec![
        MenuItem::new("confirm", on_confirm),
        MenuItem::new("cancel", |_| Ok(())),
    ];

    let mut ctx = Context::new(MENU_SCOPE, ContextKind::Confirmation);
    ctx.set_title(title);
    let mut lines = vec![prompt.into(), String::new()];
    lines.extend(items.iter().map(|i| i.label.clone()));
    ctx.set_lines(lines);
    ctx.set_menu(MenuState { items, cursor: 0 });
    Rc::new(RefCell::new(ctx))
}

/// Push a menu onto the stack.
pub fn open(ctx: &mut ActionContext, menu: SharedContext) -> Result<(), StackError> {
    ctx.stack.push(menu)
}

/// Register the shared navigation bindings for menu contexts.
pub fn register_menu_bindings(registry: &mut KeybindingRegistry) -> Result<(), ConfigError> {
    let scope = Scope::view(MENU_SCOPE);

    registry.register(
        Binding::new(scope.clone(), Key::char('k'), |ctx| {
            if let Some(menu) = ctx.stack.top().borrow_mut().menu_mut() {
                menu.move_up();
            }
            Ok(())
        })
        .alternative(Key::new(ratatui::crossterm::event::KeyCode::Up))
        .description("previous item")
        .tag("navigation"),
    )?;

    registry.register(
        Binding::new(scope.clone(), Key::char('j'), |ctx| {
            if let Some(menu) = ctx.stack.top().borrow_mut().menu_mut() {
                menu.move_down();
            }
            Ok(())
        })
        .alternative(Key::new(ratatui::crossterm::event::KeyCode::Down))
        .description("next item")
        .tag("navigation"),
    )?;

    registry.register(
        Binding::new(
            scope.clone(),
            Key::new(ratatui::crossterm::event::KeyCode::Enter),
            select_current,
        )
        .description("select")
        .tag("navigation"),
    )?;

    registry.register(
        Binding::new(
            scope,
            Key::new(ratatui::crossterm::event::KeyCode::Esc),
            |ctx| {
                ctx.stack.pop();
                Ok(())
            },
        )
        .description("cancel")
        .tag("navigation"),
    )?;

    Ok(())
}

/// Select the highlighted item of the focused menu.
pub fn select_current(ctx: &mut ActionContext) -> eyre::Result<()> {
    let top = ctx.stack.top().clone();
    let (menu_id, selected) = {
        let borrowed = top.borrow();
        let Some(menu) = borrowed.menu() else {
            return Ok(());
        };
        let Some(item) = menu.selected() else {
            return Ok(());
        };
        (
            borrowed.id(),
            (item.on_select.clone(), item.disabled_reason.clone()),
        )
    };

    let (on_select, disabled) = selected;
    if let Some(reason) = disabled {
        ctx.status.set(reason.text, MessageKind::Warning);
        return Ok(());
    }

    let result = on_select(ctx);
    // the handler may have pushed a submenu on top; only close this menu if
    // it is still focused
    ctx.stack.pop_if_top(menu_id);
    result
}
