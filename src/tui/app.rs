//! Application wiring and event loop
//!
//! Owns the long-lived pieces (panels, registry, coordinator, git service),
//! registers the default bindings, and runs the dispatch loop: drain
//! completed background work, redraw, read one key, resolve it. Panels are
//! switched by replacing the bottom stack entry, so exactly one panel is ever
//! on the stack.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eyre::Result;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind};

use crate::config::{Config, Keymap};
use crate::git::{GitCommand, GitService};

use super::binding::{Binding, DisabledReason, Scope, no_popup_guard};
use super::context::{Context, SharedContext};
use super::dispatch::{ActionContext, DispatchOutcome, Dispatcher};
use super::keys::Key;
use super::menu::{self, MenuItem};
use super::registry::KeybindingRegistry;
use super::status::{MessageKind, StatusSink};
use super::tasks::{Completion, RefreshWork, TaskCoordinator};
use super::{ContextStack, ui};

pub const FILES_PANEL: &str = "files";
pub const BRANCHES_PANEL: &str = "branches";
pub const STATUS_PANEL: &str = "status";

const PANELS: [&str; 3] = [FILES_PANEL, BRANCHES_PANEL, STATUS_PANEL];

pub struct App {
    dispatcher: Dispatcher,
    stack: ContextStack,
    tasks: TaskCoordinator,
    git: Arc<dyn GitService>,
    status: StatusSink,
    quit: bool,
    panels: Vec<SharedContext>,
    refresh_interval: Duration,
}

impl App {
    pub fn new(config: &Config, git: Arc<dyn GitService>) -> Result<Self> {
        let keymap = config.keymap()?;

        let panels: Vec<SharedContext> = PANELS.iter().map(|name| Context::panel(*name)).collect();

        let mut registry = KeybindingRegistry::new();
        menu::register_menu_bindings(&mut registry)?;
        register_default_bindings(&mut registry, &keymap, config.confirm_on_quit, &panels)?;

        Ok(Self {
            dispatcher: Dispatcher::new(registry),
            stack: ContextStack::new(panels[0].clone()),
            tasks: TaskCoordinator::new(),
            git,
            status: StatusSink::new(),
            quit: false,
            panels,
            refresh_interval: Duration::from_millis(config.refresh_interval_ms),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = ratatui::init();
        let result = self.run_loop(&mut terminal);
        ratatui::restore();
        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        self.refresh_all_panels();
        let mut last_periodic = Instant::now();

        while !self.quit {
            self.drain_and_apply();
            self.status.clear_expired();

            terminal.draw(|frame| {
                ui::render(frame, &self.stack, self.dispatcher.registry(), &self.status)
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.dispatch_key(Key::from_event(key));
                    }
                }
            }

            if last_periodic.elapsed() >= self.refresh_interval {
                self.refresh_all_panels();
                last_periodic = Instant::now();
            }
        }

        Ok(())
    }

    /// Resolve one key through the dispatcher.
    pub fn dispatch_key(&mut self, key: Key) -> DispatchOutcome {
        let mut ctx = ActionContext {
            stack: &mut self.stack,
            tasks: &self.tasks,
            git: &self.git,
            registry: self.dispatcher.registry(),
            status: &mut self.status,
            quit: &mut self.quit,
        };
        self.dispatcher.dispatch(key, &mut ctx)
    }

    /// Apply all queued background results. Returns how many were applied.
    pub fn drain_and_apply(&mut self) -> usize {
        let completions = self.tasks.drain_completions();
        let count = completions.len();
        for completion in completions {
            self.apply_completion(completion);
        }
        count
    }

    fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Refresh { target, result } => match result {
                Ok(lines) => {
                    if let Some(panel) = self.panel(&target) {
                        panel.borrow_mut().set_lines(lines);
                    }
                }
                Err(err) => self
                    .status
                    .set(format!("refresh of {target} failed: {err}"), MessageKind::Error),
            },
            Completion::Operation { kind, result, .. } => {
                match result {
                    Ok(msg) if msg.is_empty() => {
                        self.status.set(format!("{kind} complete"), MessageKind::Success);
                    }
                    Ok(msg) => self.status.set(msg, MessageKind::Success),
                    Err(err) => self
                        .status
                        .set(format!("{kind} failed: {err}"), MessageKind::Error),
                }
                for target in refresh_targets_for(&kind) {
                    self.tasks
                        .request_refresh(target, refresh_work(self.git.clone(), target));
                }
            }
        }
    }

    /// Queue a refresh of every panel.
    pub fn refresh_all_panels(&self) {
        for target in PANELS {
            self.tasks
                .request_refresh(target, refresh_work(self.git.clone(), target));
        }
    }

    fn panel(&self, name: &str) -> Option<&SharedContext> {
        self.panels.iter().find(|p| p.borrow().name() == name)
    }

    pub fn panel_lines(&self, name: &str) -> Option<Vec<String>> {
        self.panel(name).map(|p| p.borrow().lines().to_vec())
    }

    pub fn stack(&self) -> &ContextStack {
        &self.stack
    }

    pub fn tasks(&self) -> &TaskCoordinator {
        &self.tasks
    }

    pub fn status(&self) -> &StatusSink {
        &self.status
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }
}

/// Which panels go stale when a mutation of the given kind lands.
fn refresh_targets_for(kind: &str) -> &'static [&'static str] {
    match kind {
        "stage" | "unstage" => &[FILES_PANEL, STATUS_PANEL],
        "commit" => &[FILES_PANEL, STATUS_PANEL],
        "fetch" => &[BRANCHES_PANEL, STATUS_PANEL],
        "checkout" => &[FILES_PANEL, BRANCHES_PANEL, STATUS_PANEL],
        _ => &[],
    }
}

/// Read-only work that recomputes one panel's lines.
fn refresh_work(git: Arc<dyn GitService>, target: &str) -> RefreshWork {
    match target {
        FILES_PANEL => Box::new(move || git.status_lines()),
        BRANCHES_PANEL => Box::new(move || git.branch_lines()),
        STATUS_PANEL => Box::new(move || {
            let branch = git.current_branch()?;
            let head = git.head_message()?;
            let mut lines = vec![format!("On branch {branch}"), String::new()];
            lines.extend(head.lines().map(str::to_string));
            Ok(lines)
        }),
        _ => Box::new(|| Ok(Vec::new())),
    }
}

/// Path component of a `git status --porcelain` line.
fn porcelain_path(line: &str) -> Option<&str> {
    line.get(3..).map(str::trim).filter(|p| !p.is_empty())
}

fn spawn_mutation_or_warn(
    ctx: &mut ActionContext,
    kind: &str,
    work: impl FnOnce() -> eyre::Result<String> + Send + 'static,
) {
    if let Err(err) = ctx.tasks.spawn_mutation(kind, work) {
        ctx.status.set(err.to_string(), MessageKind::Warning);
    }
}

fn register_default_bindings(
    registry: &mut KeybindingRegistry,
    keymap: &Keymap,
    confirm_on_quit: bool,
    panels: &[SharedContext],
) -> Result<()> {
    register_global_bindings(registry, keymap, confirm_on_quit, panels)?;
    register_panel_navigation(registry)?;
    register_files_bindings(registry, keymap, panels)?;
    register_branches_bindings(registry, keymap)?;
    register_prompt_bindings(registry)?;
    Ok(())
}

fn register_global_bindings(
    registry: &mut KeybindingRegistry,
    keymap: &Keymap,
    confirm_on_quit: bool,
    panels: &[SharedContext],
) -> Result<()> {
    registry.register(
        Binding::new(Scope::Global, keymap.quit, move |ctx| {
            if confirm_on_quit {
                let confirm = menu::build_confirmation("quit", "Really quit?", |ctx| {
                    *ctx.quit = true;
                    Ok(())
                });
                ctx.stack.push(confirm)?;
            } else {
                *ctx.quit = true;
            }
            Ok(())
        })
        .description("quit")
        .tag("app")
        .display_on_screen()
        .guard(no_popup_guard()),
    )?;

    registry.register(
        Binding::new(Scope::Global, keymap.help, |ctx| {
            let scope = Scope::view(ctx.stack.top().borrow().name().to_string());
            let items: Vec<MenuItem> = ctx
                .registry
                .list_for_scope(&scope)
                .into_iter()
                .chain(ctx.registry.list_for_scope(&Scope::Global))
                .map(|b| {
                    let mut label = format!("{:>10}  {}", b.key.label(), b.describe());
                    if !b.tooltip.is_empty() {
                        label.push_str(&format!("  ({})", b.tooltip));
                    }
                    MenuItem::new(label, |_| Ok(()))
                })
                .collect();
            ctx.stack.push(menu::build_menu("keybindings", items))?;
            Ok(())
        })
        .description("keybindings")
        .tag("app")
        .display_on_screen()
        .opens_menu()
        .guard(no_popup_guard()),
    )?;

    registry.register(
        Binding::new(Scope::Global, keymap.fetch, |ctx| {
            let git = ctx.git.clone();
            spawn_mutation_or_warn(ctx, "fetch", move || {
                git.execute(&GitCommand::fetch())?;
                Ok("fetch complete".to_string())
            });
            Ok(())
        })
        .description("fetch from remote")
        .tooltip("runs git fetch against the default remote")
        .tag("repo")
        .display_on_screen()
        .guard(no_popup_guard()),
    )?;

    registry.register(
        Binding::new(Scope::Global, keymap.refresh, |ctx| {
            let git = ctx.git.clone();
            for target in PANELS {
                ctx.tasks.request_refresh(target, refresh_work(git.clone(), target));
            }
            Ok(())
        })
        .description("refresh panels")
        .tag("repo")
        .guard(no_popup_guard()),
    )?;

    let cycle: Vec<SharedContext> = panels.to_vec();
    registry.register(
        Binding::new(Scope::Global, Key::new(KeyCode::Tab), move |ctx| {
            let current = ctx.stack.top().borrow().name().to_string();
            let at = cycle
                .iter()
                .position(|p| p.borrow().name() == current)
                .unwrap_or(0);
            let next = cycle[(at + 1) % cycle.len()].clone();
            ctx.stack.replace(next)?;
            Ok(())
        })
        .description("next panel")
        .tag("app")
        .display_on_screen()
        .guard(no_popup_guard()),
    )?;

    Ok(())
}

/// j/k selection movement, shared by the list panels.
fn register_panel_navigation(registry: &mut KeybindingRegistry) -> Result<()> {
    for panel in [FILES_PANEL, BRANCHES_PANEL] {
        registry.register(
            Binding::new(Scope::view(panel), Key::char('k'), |ctx| {
                ctx.stack.top().borrow_mut().move_cursor_up();
                Ok(())
            })
            .alternative(Key::new(KeyCode::Up))
            .description("up")
            .tag("move"),
        )?;
        registry.register(
            Binding::new(Scope::view(panel), Key::char('j'), |ctx| {
                ctx.stack.top().borrow_mut().move_cursor_down();
                Ok(())
            })
            .alternative(Key::new(KeyCode::Down))
            .description("down")
            .tag("move"),
        )?;
    }
    Ok(())
}

fn register_files_bindings(
    registry: &mut KeybindingRegistry,
    keymap: &Keymap,
    panels: &[SharedContext],
) -> Result<()> {
    let scope = Scope::view(FILES_PANEL);

    registry.register(
        Binding::new(scope.clone(), keymap.stage, |ctx| {
            let Some(path) = ctx
                .stack
                .top()
                .borrow()
                .selected_line()
                .and_then(porcelain_path)
                .map(str::to_string)
            else {
                ctx.status.set("no file selected", MessageKind::Info);
                return Ok(());
            };
            let git = ctx.git.clone();
            spawn_mutation_or_warn(ctx, "stage", move || {
                git.execute(&GitCommand::stage(&path))?;
                Ok(format!("staged {path}"))
            });
            Ok(())
        })
        .description("stage file")
        .tag("files")
        .display_on_screen(),
    )?;

    registry.register(
        Binding::new(scope.clone(), keymap.unstage, |ctx| {
            let Some(path) = ctx
                .stack
                .top()
                .borrow()
                .selected_line()
                .and_then(porcelain_path)
                .map(str::to_string)
            else {
                ctx.status.set("no file selected", MessageKind::Info);
                return Ok(());
            };
            let git = ctx.git.clone();
            spawn_mutation_or_warn(ctx, "unstage", move || {
                git.execute(&GitCommand::unstage(&path))?;
                Ok(format!("unstaged {path}"))
            });
            Ok(())
        })
        .description("unstage file")
        .tag("files"),
    )?;

    let files = panels[0].clone();
    registry.register(
        Binding::new(scope, keymap.commit, |ctx| {
            let mut prompt = Context::new("commit-message", super::context::ContextKind::Prompt);
            prompt.set_title("commit message");
            ctx.stack
                .push(std::rc::Rc::new(std::cell::RefCell::new(prompt)))?;
            Ok(())
        })
        .description("commit staged changes")
        .tag("files")
        .display_on_screen()
        .disabled_if(move || {
            if files.borrow().lines().is_empty() {
                Some(DisabledReason::new("nothing to commit"))
            } else {
                None
            }
        }),
    )?;

    Ok(())
}

fn register_branches_bindings(registry: &mut KeybindingRegistry, keymap: &Keymap) -> Result<()> {
    registry.register(
        Binding::new(Scope::view(BRANCHES_PANEL), keymap.checkout, |ctx| {
            let Some(branch) = ctx
                .stack
                .top()
                .borrow()
                .selected_line()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
            else {
                ctx.status.set("no branch selected", MessageKind::Info);
                return Ok(());
            };
            let git = ctx.git.clone();
            spawn_mutation_or_warn(ctx, "checkout", move || {
                git.execute(&GitCommand::checkout(&branch))?;
                Ok(format!("checked out {branch}"))
            });
            Ok(())
        })
        .description("checkout branch")
        .tag("branches")
        .display_on_screen(),
    )?;
    Ok(())
}

fn register_prompt_bindings(registry: &mut KeybindingRegistry) -> Result<()> {
    let scope = Scope::view("commit-message");

    registry.register(
        Binding::new(scope.clone(), Key::new(KeyCode::Enter), |ctx| {
            let prompt = ctx.stack.top().clone();
            let id = prompt.borrow().id();
            let message = prompt.borrow().input().to_string();
            if message.trim().is_empty() {
                ctx.status.set("empty commit message", MessageKind::Warning);
                return Ok(());
            }

            let git = ctx.git.clone();
            let summary = message.lines().next().unwrap_or_default().to_string();
            spawn_mutation_or_warn(ctx, "commit", move || {
                git.execute(&GitCommand::commit(&message, &[]))?;
                Ok(format!("committed: {summary}"))
            });
            ctx.stack.pop_if_top(id);
            Ok(())
        })
        .description("confirm commit"),
    )?;

    registry.register(
        Binding::new(scope, Key::new(KeyCode::Esc), |ctx| {
            ctx.stack.pop();
            Ok(())
        })
        .description("cancel"),
    )?;

    Ok(())
}
