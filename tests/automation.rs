//! End-to-end scripts through the automation interface: synthetic key
//! presses against a fake git service, with every assertion made at idle.

use std::sync::{Arc, Mutex, mpsc};

use grit::config::Config;
use grit::git::{GitCommand, GitService};
use grit::tui::app::{App, BRANCHES_PANEL, FILES_PANEL};
use grit::tui::automation::Automation;
use grit::tui::dispatch::DispatchOutcome;
use grit::tui::keys::Key;
use ratatui::crossterm::event::KeyCode;

/// Fake repository: records every executed command, answers reads from a
/// canned table, and can block one command kind on a gate.
struct FakeGit {
    executed: Mutex<Vec<String>>,
    status_output: Mutex<String>,
    gate: Mutex<Option<(String, mpsc::Receiver<()>)>>,
}

impl FakeGit {
    fn new(status_output: &str) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            status_output: Mutex::new(status_output.to_string()),
            gate: Mutex::new(None),
        }
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn count_of(&self, rendered: &str) -> usize {
        self.executed().iter().filter(|c| *c == rendered).count()
    }

    /// Block the next command whose first argument matches, until released.
    fn gate_next(&self, first_arg: &str) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel();
        *self.gate.lock().unwrap() = Some((first_arg.to_string(), rx));
        tx
    }
}

impl GitService for FakeGit {
    fn execute(&self, cmd: &GitCommand) -> eyre::Result<String> {
        let first = cmd.args().first().cloned().unwrap_or_default();
        {
            let mut gate = self.gate.lock().unwrap();
            if gate.as_ref().is_some_and(|(kind, _)| *kind == first) {
                let (_, rx) = gate.take().unwrap();
                drop(gate);
                let _ = rx.recv();
            }
        }

        self.executed.lock().unwrap().push(cmd.to_string());
        match first.as_str() {
            "status" => Ok(self.status_output.lock().unwrap().clone()),
            "branch" => Ok("main\nfeature\n".to_string()),
            "rev-parse" => Ok("main\n".to_string()),
            "log" => Ok("initial commit\n".to_string()),
            _ => Ok(String::new()),
        }
    }
}

fn started(status_output: &str) -> (Automation, Arc<FakeGit>) {
    let git = Arc::new(FakeGit::new(status_output));
    let app = App::new(&Config::default(), git.clone()).expect("app construction");
    let mut automation = Automation::new(app);
    automation.start().expect("initial settle");
    (automation, git)
}

#[test]
fn test_commit_flow_runs_rendered_commit_command() {
    let (mut automation, git) = started(" M src/main.rs\n");

    automation.press(Key::char('c'));
    automation.type_text("fix parser");
    automation.press(Key::new(KeyCode::Enter));
    automation.settle().unwrap();

    assert_eq!(git.count_of(r#"git commit -m "fix parser""#), 1);
    assert_eq!(automation.focused().unwrap(), FILES_PANEL);
    assert_eq!(
        automation.status_text().unwrap(),
        "committed: fix parser"
    );
}

#[test]
fn test_commit_refused_with_reason_on_clean_tree() {
    let (mut automation, git) = started("");

    let outcome = automation.press(Key::char('c'));
    assert_eq!(outcome, DispatchOutcome::Disabled);
    assert_eq!(automation.status_text().unwrap(), "nothing to commit");
    assert!(!git.executed().iter().any(|c| c.starts_with("git commit")));
}

#[test]
fn test_second_fetch_rejected_while_first_runs() {
    let (mut automation, git) = started("");
    let release = git.gate_next("fetch");

    assert_eq!(automation.press(Key::char('f')), DispatchOutcome::Handled);
    assert_eq!(automation.press(Key::char('f')), DispatchOutcome::Handled);
    assert_eq!(
        automation.status_text().unwrap(),
        "a 'fetch' operation is already in progress"
    );

    release.send(()).unwrap();
    automation.settle().unwrap();
    assert_eq!(git.count_of("git fetch"), 1);
}

#[test]
fn test_refreshes_behind_mutation_coalesce() {
    let (mut automation, git) = started(" M src/main.rs\n");
    let baseline = git.count_of("git status --porcelain");
    let release = git.gate_next("fetch");

    automation.press(Key::char('f'));
    // three refresh requests while the fetch holds the repository
    for _ in 0..3 {
        automation.press(Key::char('r'));
    }

    release.send(()).unwrap();
    automation.settle().unwrap();

    // the files panel is refreshed once for all three requests
    assert_eq!(git.count_of("git status --porcelain"), baseline + 1);
}

#[test]
fn test_checkout_from_branches_panel() {
    let (mut automation, git) = started("");

    automation.press(Key::new(KeyCode::Tab));
    assert_eq!(automation.focused().unwrap(), BRANCHES_PANEL);

    automation.press(Key::char('j'));
    automation.press(Key::char('o'));
    automation.settle().unwrap();

    assert_eq!(git.count_of("git checkout feature"), 1);
    assert_eq!(automation.status_text().unwrap(), "checked out feature");
}

#[test]
fn test_quit_requires_confirmation() {
    let (mut automation, _git) = started("");

    automation.press(Key::char('q'));
    assert!(!automation.app().should_quit());

    // escape backs out, quit again and confirm
    automation.press(Key::new(KeyCode::Esc));
    automation.press(Key::char('q'));
    automation.press(Key::new(KeyCode::Enter));
    assert!(automation.app().should_quit());
}

#[test]
fn test_typing_in_prompt_never_triggers_panel_actions() {
    let (mut automation, git) = started(" M src/main.rs\n");

    automation.press(Key::char('c'));
    // 's' and 'q' are bound in other scopes; inside the prompt they are text
    automation.type_text("squash");
    automation.press(Key::new(KeyCode::Esc));
    automation.settle().unwrap();

    assert!(!automation.app().should_quit());
    assert!(!git.executed().iter().any(|c| c.starts_with("git add")));
    assert_eq!(automation.focused().unwrap(), FILES_PANEL);
}
