//! Background operation coordination
//!
//! Actions must return from dispatch promptly; anything slow is handed here
//! as a tracked operation and runs on a worker thread. The coordinator
//! enforces the repository exclusion rules:
//!
//! - mutating operations never overlap each other or a read-only refresh
//!   (write/read halves of one `RwLock`),
//! - a second mutation of the same kind is rejected up front rather than
//!   queued,
//! - refreshes requested during a mutation are deferred and coalesced,
//!   latest-wins per target,
//! - a superseded refresh runs to completion but its result is discarded.
//!
//! Workers never touch UI state. Results travel over a single channel that
//! the dispatch loop drains between key events; the idle signal holds once
//! nothing is in flight, nothing is deferred, and the channel is empty.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use log::debug;

use super::error::TaskError;

/// Identifies one in-flight background unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationToken(pub u64);

pub type MutationWork = Box<dyn FnOnce() -> eyre::Result<String> + Send>;
pub type RefreshWork = Box<dyn FnOnce() -> eyre::Result<Vec<String>> + Send>;

/// Completed background work, handed back to the dispatch loop.
#[derive(Debug)]
pub enum Completion {
    Operation {
        token: OperationToken,
        kind: String,
        result: eyre::Result<String>,
    },
    Refresh {
        target: String,
        result: eyre::Result<Vec<String>>,
    },
}

struct PendingRefresh {
    generation: u64,
    work: RefreshWork,
}

struct State {
    /// Kinds of mutations admitted but not yet finished.
    mutations: HashSet<String>,
    refreshes_in_flight: usize,
    /// Latest requested generation per refresh target; older results are
    /// discarded on completion.
    generations: HashMap<String, u64>,
    /// Refreshes deferred while a mutation is in flight, coalesced per target.
    deferred: HashMap<String, PendingRefresh>,
    /// Completions sent but not yet drained by the dispatch loop.
    queued: usize,
}

impl State {
    fn is_idle(&self) -> bool {
        self.mutations.is_empty()
            && self.refreshes_in_flight == 0
            && self.deferred.is_empty()
            && self.queued == 0
    }

    fn is_quiescent(&self) -> bool {
        self.mutations.is_empty() && self.refreshes_in_flight == 0 && self.deferred.is_empty()
    }
}

struct Inner {
    /// Repository exclusion: mutations hold the write half, refreshes the
    /// read half.
    repo_lock: RwLock<()>,
    state: Mutex<State>,
    changed: Condvar,
    tx: Sender<Completion>,
    next_token: AtomicU64,
}

pub struct TaskCoordinator {
    inner: Arc<Inner>,
    rx: Receiver<Completion>,
}

impl Default for TaskCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskCoordinator {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self {
            inner: Arc::new(Inner {
                repo_lock: RwLock::new(()),
                state: Mutex::new(State {
                    mutations: HashSet::new(),
                    refreshes_in_flight: 0,
                    generations: HashMap::new(),
                    deferred: HashMap::new(),
                    queued: 0,
                }),
                changed: Condvar::new(),
                tx,
                next_token: AtomicU64::new(1),
            }),
            rx,
        }
    }

    /// Start a mutating operation on a worker thread.
    ///
    /// Rejected immediately if a mutation of the same kind is already in
    /// flight; a different kind is admitted and serializes on the repository
    /// exclusion instead.
    pub fn spawn_mutation(
        &self,
        kind: &str,
        work: impl FnOnce() -> eyre::Result<String> + Send + 'static,
    ) -> Result<OperationToken, TaskError> {
        let token = {
            let mut state = self.inner.state.lock().expect("coordinator state poisoned");
            if state.mutations.contains(kind) {
                return Err(TaskError::OperationInProgress(kind.to_string()));
            }
            state.mutations.insert(kind.to_string());
            OperationToken(self.inner.next_token.fetch_add(1, Ordering::Relaxed))
        };

        let inner = self.inner.clone();
        let kind = kind.to_string();
        thread::spawn(move || {
            let result = {
                let _exclusive = inner.repo_lock.write().expect("repo lock poisoned");
                run_caught(work)
            };

            let mut state = inner.state.lock().expect("coordinator state poisoned");
            state.mutations.remove(&kind);
            state.queued += 1;
            let _ = inner.tx.send(Completion::Operation { token, kind, result });

            // Launch refreshes that were deferred behind the mutation once no
            // mutation remains admitted.
            if state.mutations.is_empty() {
                for (target, pending) in state.deferred.drain().collect::<Vec<_>>() {
                    state.refreshes_in_flight += 1;
                    spawn_refresh_worker(&inner, target, pending.generation, pending.work);
                }
            }
            inner.changed.notify_all();
        });

        Ok(token)
    }

    /// Request a read-only refresh of a named target.
    ///
    /// Runs immediately (concurrently with other refreshes) unless a mutation
    /// is in flight, in which case it is deferred; repeated requests for the
    /// same target coalesce into the latest one.
    pub fn request_refresh(
        &self,
        target: &str,
        work: impl FnOnce() -> eyre::Result<Vec<String>> + Send + 'static,
    ) {
        let mut state = self.inner.state.lock().expect("coordinator state poisoned");
        let generation = state
            .generations
            .entry(target.to_string())
            .and_modify(|g| *g += 1)
            .or_insert(1);
        let generation = *generation;

        if !state.mutations.is_empty() {
            debug!("deferring refresh of '{target}' behind mutation");
            state.deferred.insert(
                target.to_string(),
                PendingRefresh {
                    generation,
                    work: Box::new(work),
                },
            );
            return;
        }

        state.refreshes_in_flight += 1;
        spawn_refresh_worker(&self.inner, target.to_string(), generation, Box::new(work));
    }

    /// Drain completed work. Superseded refresh results have already been
    /// discarded by their workers; everything returned here should be applied.
    pub fn drain_completions(&self) -> Vec<Completion> {
        let drained: Vec<Completion> = self.rx.try_iter().collect();
        if !drained.is_empty() {
            let mut state = self.inner.state.lock().expect("coordinator state poisoned");
            state.queued -= drained.len();
            self.inner.changed.notify_all();
        }
        drained
    }

    /// True iff nothing is in flight, nothing is deferred, and every
    /// completion has been drained. This is the synchronization point for
    /// automated verification.
    pub fn is_idle(&self) -> bool {
        self.inner
            .state
            .lock()
            .expect("coordinator state poisoned")
            .is_idle()
    }

    /// True while any operation or refresh is running or deferred. Used by
    /// guards; unlike `is_idle` this ignores undrained completions.
    pub fn has_inflight_work(&self) -> bool {
        !self
            .inner
            .state
            .lock()
            .expect("coordinator state poisoned")
            .is_quiescent()
    }

    /// Block until all workers have finished and nothing is deferred, or the
    /// timeout passes. Completions may still need draining afterwards.
    pub fn wait_quiescent(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock().expect("coordinator state poisoned");
        while !state.is_quiescent() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next, _) = self
                .inner
                .changed
                .wait_timeout(state, deadline - now)
                .expect("coordinator state poisoned");
            state = next;
        }
        true
    }
}

fn run_caught<T>(work: impl FnOnce() -> eyre::Result<T>) -> eyre::Result<T> {
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(_) => Err(eyre::eyre!("background operation panicked")),
    }
}

fn spawn_refresh_worker(inner: &Arc<Inner>, target: String, generation: u64, work: RefreshWork) {
    let inner = inner.clone();
    thread::spawn(move || {
        let result = {
            let _shared = inner.repo_lock.read().expect("repo lock poisoned");
            run_caught(work)
        };

        let mut state = inner.state.lock().expect("coordinator state poisoned");
        state.refreshes_in_flight -= 1;

        let latest = state.generations.get(&target).copied().unwrap_or(0);
        if generation == latest {
            state.queued += 1;
            let _ = inner.tx.send(Completion::Refresh { target, result });
        } else {
            debug!("discarding superseded refresh of '{target}'");
        }
        inner.changed.notify_all();
    });
}
