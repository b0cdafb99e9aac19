// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! [`Domain`]: the unit of isolation spec §2 describes — one arena, one
//! turn counter, one engine. Multiple domains may coexist in a process;
//! they never share nodes, matching the teacher's own "no global state,
//! `ProcessorMap`/`DependencyGraph` are explicit arguments" stance.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::{DomainConfig, EngineKind, MergePolicy};
use crate::engine::parallel::ParallelEngine;
use crate::engine::sequential::SequentialEngine;
use crate::engine::Engine;
use crate::errors::EngineError;
use crate::events::CommitQueue;
use crate::graph::{NodeId, NodeKind, Storage};
use crate::nodes::handle::{EventStream, Signal};
use crate::turn::{ContinuationQueue, Transaction, TransactionMode, Turn, TurnReport};

/// Shared state backing every handle cloned from a [`Domain`]. Kept
/// separate from `Domain` itself so handles can hold an `Arc<DomainInner>`
/// without holding a `Domain` (and its `Drop`, if one is ever added).
pub struct DomainInner {
    storage: Arc<RwLock<Storage>>,
    turn_counter: AtomicU64,
    config: DomainConfig,
    poisoned: AtomicBool,
    engine: Box<dyn Engine>,
    runtime: tokio::runtime::Runtime,
    commit_queue: Mutex<CommitQueue>,
    continuations: Mutex<ContinuationQueue>,
    pending_merge: Mutex<Option<PendingMerge>>,
}

struct PendingMerge {
    transaction: Transaction,
    waiters: Vec<oneshot::Sender<TurnReport>>,
}

/// A live, `Arc`-shared reactive domain: one propagation engine plus the
/// arena of nodes bound to it.
#[derive(Clone)]
pub struct Domain {
    inner: Arc<DomainInner>,
}

/// What a [`Domain::transaction`] call hands back, depending on the
/// requested [`TransactionMode`].
pub enum TransactionOutcome {
    /// `Sync` mode: the turn has already committed.
    Report(Result<TurnReport, EngineError>),
    /// `Async`/`Merged` mode: await this handle for the eventual report.
    Handle(TransactionHandle),
}

/// A pending turn's eventual [`TurnReport`], for `Async`/`Merged`-mode
/// transactions.
pub struct TransactionHandle {
    receiver: oneshot::Receiver<TurnReport>,
    /// `Some` only for plain `Async` transactions: a `Merged` transaction
    /// may already be coalesced with another caller's staged changes by
    /// the time this handle exists, and cancelling it would silently drop
    /// that caller's changes too, so `cancel` is a no-op for those.
    cancel: Option<CancellationToken>,
}

impl TransactionHandle {
    /// Await the turn's commit. Returns `None` if [`Self::cancel`] was
    /// called before propagation began (spec §5: "a pending async
    /// transaction may be cancelled before it begins propagation").
    pub async fn wait(self) -> Option<TurnReport> {
        self.receiver.await.ok()
    }

    /// Request cancellation. Best-effort: if propagation has already
    /// started, the turn runs to completion regardless — spec §5 is
    /// explicit that a half-propagated graph would violate glitch freedom,
    /// so there is no "cancel mid-turn."
    pub fn cancel(&self) {
        if let Some(token) = &self.cancel {
            token.cancel();
        }
    }
}

impl Domain {
    /// Build a domain with the given configuration, sizing the parallel
    /// engine's worker pool (if selected) and its dedicated `tokio` runtime
    /// from `config.resolved_worker_count()`.
    pub fn new(config: DomainConfig) -> Self {
        let worker_count = config.resolved_worker_count();
        let engine: Box<dyn Engine> = match config.engine {
            EngineKind::Sequential => Box::new(SequentialEngine::new()),
            EngineKind::Parallel => Box::new(ParallelEngine::new(worker_count)),
        };
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_count.max(1))
            .enable_all()
            .build()
            .expect("failed to build domain's tokio runtime");

        Domain {
            inner: Arc::new(DomainInner {
                storage: Arc::new(RwLock::new(Storage::new())),
                turn_counter: AtomicU64::new(0),
                config,
                poisoned: AtomicBool::new(false),
                engine,
                runtime,
                commit_queue: Mutex::new(CommitQueue::new()),
                continuations: Mutex::new(ContinuationQueue::new()),
                pending_merge: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &DomainConfig {
        &self.inner.config
    }

    pub(crate) fn inner(&self) -> &Arc<DomainInner> {
        &self.inner
    }

    /// Bind an input signal with an initial value.
    pub fn var<T>(&self, initial: T) -> crate::nodes::var::Var<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        crate::nodes::var::var(self, initial)
    }

    /// Build a computed signal from a closure over already-typed upstream
    /// handles, wired as a dependent of `deps`.
    pub fn signal<T, F>(&self, deps: &[NodeId], compute: F) -> Signal<T>
    where
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        crate::nodes::lift::lift_raw(self, deps, compute)
    }

    /// Build a signal that reads `a` or `b` depending on `sel`'s current
    /// value (spec §8 scenario 4, "dynamic switch").
    pub fn switch<S, T, F>(
        &self,
        sel: &Signal<S>,
        a: &Signal<T>,
        b: &Signal<T>,
        choose_a: F,
    ) -> Signal<T>
    where
        S: Clone + Send + Sync + 'static,
        T: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        crate::nodes::switch::switch(self, sel, a, b, choose_a)
    }

    /// Bind an input event stream: pushed values are visible to dependents
    /// only during the turn they were pushed in.
    pub fn event_source<T>(&self) -> crate::nodes::event_source::EventSource<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        crate::nodes::event_source::event_source(self)
    }

    /// Register an observer that runs whenever `signal`'s value changes.
    pub fn observe<T, F>(&self, signal: &Signal<T>, callback: F) -> crate::nodes::observe::Observer
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        crate::nodes::observe::observe_signal(self, signal, callback)
    }

    /// Register an observer that runs whenever `stream` buffers events.
    pub fn observe_events<T, F>(
        &self,
        stream: &EventStream<T>,
        callback: F,
    ) -> crate::nodes::observe::Observer
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        crate::nodes::observe::observe_events(self, stream, callback)
    }

    /// Run a transaction: stage writes inside `body`, then commit according
    /// to `mode` (spec §4.3).
    pub fn transaction<F>(&self, mode: TransactionMode, body: F) -> TransactionOutcome
    where
        F: FnOnce(&Transaction),
    {
        if self.inner.poisoned.load(Ordering::SeqCst) {
            return TransactionOutcome::Report(Err(EngineError::DomainPoisoned {
                reason: "domain is poisoned by a previous unrecoverable failure".to_string(),
            }));
        }

        let txn = Transaction::new();
        body(&txn);

        match mode {
            TransactionMode::Sync => {
                let inner = self.inner.clone();
                let report = inner.runtime.block_on(inner.commit(txn));
                TransactionOutcome::Report(Ok(report))
            }
            TransactionMode::Async => {
                let inner = self.inner.clone();
                TransactionOutcome::Handle(inner.spawn_commit(txn))
            }
            TransactionMode::Merged => {
                let inner = self.inner.clone();
                TransactionOutcome::Handle(inner.spawn_merged_commit(txn))
            }
        }
    }
}

impl DomainInner {
    pub(crate) fn storage(&self) -> &Arc<RwLock<Storage>> {
        &self.storage
    }

    pub(crate) fn allocate(&self, kind: Box<dyn NodeKind>, predecessors: Vec<NodeId>) -> NodeId {
        let mut guard = self.storage.write().expect("storage lock poisoned");
        guard.allocate(kind, predecessors)
    }

    pub(crate) fn read_value<T: Clone + 'static>(
        &self,
        id: NodeId,
        reader: &Arc<dyn Fn(&dyn Any) -> T + Send + Sync>,
    ) -> T {
        let guard = self.storage.read().expect("storage lock poisoned");
        let meta = guard
            .meta(id)
            .expect("stale node handle: node was detached and reclaimed");
        let kind = meta.kind.lock().expect("node mutex poisoned");
        reader(kind.as_any())
    }

    pub(crate) fn enqueue_commit_job(&self, node: NodeId, job: Box<dyn FnOnce() + Send>) {
        self.commit_queue
            .lock()
            .expect("commit queue mutex poisoned")
            .enqueue(node, job);
    }

    async fn commit(self: Arc<Self>, txn: Transaction) -> TurnReport {
        let turn_id = self.turn_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let turn = Turn::new(turn_id);

        let dirty_roots = {
            let guard = self.storage.read().expect("storage lock poisoned");
            // Clear last turn's event buffers before staging this turn's
            // writes, so a turn's own buffers stay readable by the caller
            // up until the next turn starts (spec §4.7: cleared "at end of
            // turn" means the *next* turn's start, not this one's).
            guard.end_turn_all();
            turn.apply_staged(&guard, txn)
        };

        let (ticked, mut failures) = self.engine.run_turn(&self.storage, turn_id, dirty_roots).await;

        {
            let mut queue = self.commit_queue.lock().expect("commit queue mutex poisoned");
            failures.extend(turn.run_commit_queue(&mut queue));
        }

        self.drain_continuations();

        turn.report(ticked, failures)
    }

    fn drain_continuations(&self) {
        let mut continuations = self
            .continuations
            .lock()
            .expect("continuation queue mutex poisoned");
        while let Some(pending) = continuations.pop() {
            (pending.apply)();
        }
    }

    fn spawn_commit(self: Arc<Self>, txn: Transaction) -> TransactionHandle {
        let (tx, rx) = oneshot::channel();
        let token = CancellationToken::new();
        let cancel_check = token.clone();
        self.runtime.spawn(async move {
            if cancel_check.is_cancelled() {
                return;
            }
            let report = self.clone().commit(txn).await;
            let _ = tx.send(report);
        });
        TransactionHandle {
            receiver: rx,
            cancel: Some(token),
        }
    }

    fn spawn_merged_commit(self: Arc<Self>, txn: Transaction) -> TransactionHandle {
        if self.config.merge_policy != MergePolicy::Adjacent {
            return self.spawn_commit(txn);
        }

        let (tx, rx) = oneshot::channel();
        let mut slot = self
            .pending_merge
            .lock()
            .expect("pending merge mutex poisoned");

        if let Some(pending) = slot.as_mut() {
            txn.drain_into(&pending.transaction);
            pending.waiters.push(tx);
            return TransactionHandle {
                receiver: rx,
                cancel: None,
            };
        }

        *slot = Some(PendingMerge {
            transaction: txn,
            waiters: vec![tx],
        });
        drop(slot);

        let inner = self.clone();
        self.runtime.spawn(async move {
            // Give any transaction submitted in this same scheduling tick a
            // chance to merge in before this window closes.
            tokio::task::yield_now().await;
            let pending = inner
                .pending_merge
                .lock()
                .expect("pending merge mutex poisoned")
                .take();
            let Some(pending) = pending else { return };
            let report = inner.clone().commit(pending.transaction).await;
            for waiter in pending.waiters {
                let _ = waiter.send(report.clone());
            }
        });

        TransactionHandle {
            receiver: rx,
            cancel: None,
        }
    }

    pub(crate) fn poison(&self, reason: String) {
        self.poisoned.store(true, Ordering::SeqCst);
        tracing::error!("domain poisoned: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DomainConfig;
    use std::sync::Mutex;

    #[test]
    fn fresh_domain_is_not_poisoned() {
        let domain = Domain::new(DomainConfig::sequential());
        assert!(!domain.inner.poisoned.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn async_transaction_commits_and_reports() {
        let domain = Domain::new(DomainConfig::sequential());
        let counter = domain.var(0i64);
        let signal = counter.as_signal();

        let outcome = domain.transaction(TransactionMode::Async, move |txn| {
            counter.set(txn, 7);
        });
        let handle = match outcome {
            TransactionOutcome::Handle(handle) => handle,
            _ => panic!("expected an async handle"),
        };

        let report = handle.wait().await.expect("uncancelled handle resolves");
        assert!(report.is_ok());
        assert_eq!(signal.get(), 7);
    }

    #[tokio::test]
    async fn cancel_before_spawn_observes_prevents_commit() {
        let domain = Domain::new(DomainConfig::sequential());
        let counter = domain.var(0i64);
        let signal = counter.as_signal();

        let outcome = domain.transaction(TransactionMode::Async, move |txn| {
            counter.set(txn, 9);
        });
        let handle = match outcome {
            TransactionOutcome::Handle(handle) => handle,
            _ => panic!("expected an async handle"),
        };
        handle.cancel();

        let report = handle.wait().await;
        if report.is_none() {
            assert_eq!(signal.get(), 0);
        }
    }

    #[tokio::test]
    async fn cancel_after_propagation_has_started_does_not_undo_the_commit() {
        let domain = Domain::new(DomainConfig::sequential());
        let counter = domain.var(0i64);
        let signal = counter.as_signal();

        let committed = Arc::new(Mutex::new(false));
        let committed_clone = committed.clone();
        let _observer = domain.observe(&signal, move |_| {
            *committed_clone.lock().unwrap() = true;
        });

        let outcome = domain.transaction(TransactionMode::Async, move |txn| {
            counter.set(txn, 11);
        });
        let handle = match outcome {
            TransactionOutcome::Handle(handle) => handle,
            _ => panic!("expected an async handle"),
        };

        while !*committed.lock().unwrap() {
            tokio::task::yield_now().await;
        }
        handle.cancel();

        let report = handle.wait().await.expect("already-started commit still resolves");
        assert!(report.is_ok());
        assert_eq!(signal.get(), 11);
    }
}
