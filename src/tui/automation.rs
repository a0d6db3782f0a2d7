//! Scripted driving of the app
//!
//! Lets tests and scripts feed synthetic key presses through the real
//! dispatcher and then block until the coordinator goes idle before reading
//! any state. Content queries refuse to answer while work is in flight, so a
//! script can never observe a half-applied refresh.

use std::time::Duration;

use eyre::{Result, bail};

use super::app::App;
use super::dispatch::DispatchOutcome;
use super::keys::Key;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Automation {
    app: App,
}

impl Automation {
    pub fn new(app: App) -> Self {
        Self { app }
    }

    /// Start background refreshes the way the interactive loop does.
    pub fn start(&mut self) -> Result<()> {
        self.app.refresh_all_panels();
        self.settle()
    }

    /// Feed one key press through the dispatcher.
    pub fn press(&mut self, key: Key) -> DispatchOutcome {
        self.app.dispatch_key(key)
    }

    /// Feed a run of plain character presses.
    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.app.dispatch_key(Key::char(c));
        }
    }

    /// Block until no work is in flight, deferred, or queued. Applying a
    /// completion can trigger follow-up refreshes, so this loops until the
    /// coordinator is genuinely idle.
    pub fn settle(&mut self) -> Result<()> {
        while !self.app.tasks().is_idle() {
            if !self.app.tasks().wait_quiescent(SETTLE_TIMEOUT) {
                bail!("background work did not settle within {SETTLE_TIMEOUT:?}");
            }
            self.app.drain_and_apply();
        }
        Ok(())
    }

    /// A panel's rendered lines. Only answers at idle.
    pub fn panel_lines(&self, name: &str) -> Result<Vec<String>> {
        self.ensure_idle()?;
        match self.app.panel_lines(name) {
            Some(lines) => Ok(lines),
            None => bail!("no panel named '{name}'"),
        }
    }

    /// The focused context's name. Only answers at idle.
    pub fn focused(&self) -> Result<String> {
        self.ensure_idle()?;
        Ok(self.app.stack().top().borrow().name().to_string())
    }

    pub fn status_text(&self) -> Option<String> {
        self.app.status().current().map(|m| m.text.clone())
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    fn ensure_idle(&self) -> Result<()> {
        if !self.app.tasks().is_idle() {
            bail!("background work is still in flight; settle first");
        }
        Ok(())
    }
}
