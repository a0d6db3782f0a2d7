//! Rendering
//!
//! Draws the context stack bottom-up: the base panel fills the frame,
//! ephemeral contexts render as popups on top of it, then the legend line and
//! finally the status toast. Rendering is pure over the passed-in state.

use itertools::Itertools;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use tui_popup::Popup;
use unicode_width::UnicodeWidthStr;

use super::binding::Scope;
use super::context::{Context, ContextKind, ContextStack};
use super::registry::KeybindingRegistry;
use super::status::{MessageKind, StatusMessage, StatusSink};

pub fn render(
    frame: &mut Frame,
    stack: &ContextStack,
    registry: &KeybindingRegistry,
    status: &StatusSink,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let mut contexts = stack.iter();
    if let Some(base) = contexts.next() {
        render_panel(frame, &base.borrow(), chunks[0]);
    }
    for overlay in contexts {
        render_overlay(frame, &overlay.borrow());
    }

    render_legend(frame, stack, registry, chunks[1]);

    // toast goes on top of everything
    if let Some(msg) = status.current() {
        if !msg.is_expired() {
            render_toast(frame, msg);
        }
    }
}

fn render_panel(frame: &mut Frame, ctx: &Context, area: Rect) {
    let block = Block::default()
        .title(format!(" {} ", ctx.title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = ctx
        .lines()
        .iter()
        .enumerate()
        .take(inner.height as usize)
        .map(|(i, l)| {
            let style = if i == ctx.cursor() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(l.as_str(), style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_overlay(frame: &mut Frame, ctx: &Context) {
    match ctx.kind() {
        ContextKind::Prompt => render_prompt(frame, ctx),
        _ => render_menu_popup(frame, ctx),
    }
}

fn render_menu_popup(frame: &mut Frame, ctx: &Context) {
    let cursor = ctx.menu().map(|m| m.cursor);
    // menu items occupy the tail of the line list; confirmations carry a
    // prompt before them
    let item_offset = match (ctx.menu(), ctx.lines().len()) {
        (Some(menu), total) => total - menu.items.len(),
        (None, _) => usize::MAX,
    };

    let lines: Vec<Line> = ctx
        .lines()
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let selected = cursor.is_some_and(|c| i >= item_offset && i - item_offset == c);
            let disabled = ctx
                .menu()
                .and_then(|m| m.items.get(i.wrapping_sub(item_offset)))
                .is_some_and(|item| item.disabled_reason.is_some());

            let style = if selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else if disabled {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(Span::styled(text.clone(), style))
        })
        .collect();

    let popup = Popup::new(Text::from(lines))
        .title(format!(" {} ", ctx.title()))
        .style(Style::default().bg(Color::Rgb(30, 30, 40)));
    frame.render_widget(popup, frame.area());
}

fn render_prompt(frame: &mut Frame, ctx: &Context) {
    let body = Text::from(vec![Line::from(vec![
        Span::raw(ctx.input().to_string()),
        Span::styled("▏", Style::default().fg(Color::Cyan)),
    ])]);

    let popup = Popup::new(body)
        .title(format!(" {} ", ctx.title()))
        .style(Style::default().bg(Color::Rgb(30, 30, 40)));
    frame.render_widget(popup, frame.area());
}

fn render_legend(frame: &mut Frame, stack: &ContextStack, registry: &KeybindingRegistry, area: Rect) {
    let scope = Scope::view(stack.top().borrow().name().to_string());
    let text = legend_text(registry, &scope, area.width as usize);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(paragraph, area);
}

/// Legend line for a scope: on-screen bindings of the scope plus the globals,
/// grouped by tag, truncated to fit.
pub fn legend_text(registry: &KeybindingRegistry, scope: &Scope, max_width: usize) -> String {
    let bindings = registry
        .list_for_scope(scope)
        .into_iter()
        .chain(registry.list_for_scope(&Scope::Global))
        .filter(|b| b.display_on_screen)
        .filter(|b| registry.compute_disabled_reason(b).is_none());

    let grouped = bindings.chunk_by(|b| b.tag.clone());
    let text = (&grouped)
        .into_iter()
        .map(|(_, group)| {
            group
                .map(|b| format!("{}: {}", b.key.label(), b.describe_short()))
                .join(", ")
        })
        .join(" | ");

    truncate_to_width(&text, max_width)
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        if out.width() + 1 >= max_width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}

fn render_toast(frame: &mut Frame, msg: &StatusMessage) {
    let color = match msg.kind {
        MessageKind::Info => Color::Blue,
        MessageKind::Success => Color::Green,
        MessageKind::Warning => Color::Yellow,
        MessageKind::Error => Color::Red,
    };

    let popup = Popup::new(msg.text.clone())
        .style(Style::default().fg(color).bg(Color::Rgb(30, 30, 40)));
    frame.render_widget(popup, frame.area());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::binding::{Binding, DisabledReason};
    use crate::tui::dispatch::ActionContext;
    use crate::tui::keys::Key;

    fn noop(scope: Scope, key: Key) -> Binding {
        Binding::new(scope, key, |_: &mut ActionContext| Ok(()))
    }

    #[test]
    fn test_legend_includes_scope_then_globals() {
        let mut registry = KeybindingRegistry::new();
        registry
            .register(
                noop(Scope::view("files"), Key::char('s'))
                    .description("stage")
                    .tag("files")
                    .display_on_screen(),
            )
            .unwrap();
        registry
            .register(
                noop(Scope::Global, Key::char('q'))
                    .description("quit")
                    .tag("app")
                    .display_on_screen(),
            )
            .unwrap();

        let text = legend_text(&registry, &Scope::view("files"), 120);
        assert_eq!(text, "s: stage | q: quit");
    }

    #[test]
    fn test_legend_hides_disabled_and_off_screen_bindings() {
        let mut registry = KeybindingRegistry::new();
        registry
            .register(
                noop(Scope::view("files"), Key::char('c'))
                    .description("commit")
                    .display_on_screen()
                    .disabled_if(|| Some(DisabledReason::new("nothing to commit"))),
            )
            .unwrap();
        registry
            .register(noop(Scope::view("files"), Key::char('x')).description("hidden"))
            .unwrap();

        assert_eq!(legend_text(&registry, &Scope::view("files"), 120), "");
    }

    #[test]
    fn test_legend_groups_by_tag() {
        let mut registry = KeybindingRegistry::new();
        for (key, desc) in [('j', "down"), ('k', "up")] {
            registry
                .register(
                    noop(Scope::view("files"), Key::char(key))
                        .description(desc)
                        .tag("move")
                        .display_on_screen(),
                )
                .unwrap();
        }
        registry
            .register(
                noop(Scope::view("files"), Key::char('s'))
                    .description("stage")
                    .tag("files")
                    .display_on_screen(),
            )
            .unwrap();

        assert_eq!(
            legend_text(&registry, &Scope::view("files"), 120),
            "j: down, k: up | s: stage"
        );
    }

    #[test]
    fn test_legend_truncates_to_width() {
        let mut registry = KeybindingRegistry::new();
        registry
            .register(
                noop(Scope::view("files"), Key::char('s'))
                    .description("stage the selected file")
                    .display_on_screen(),
            )
            .unwrap();

        let text = legend_text(&registry, &Scope::view("files"), 10);
        assert!(text.ends_with('…'));
        assert!(text.width() <= 10);
    }
}
