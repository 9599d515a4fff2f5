//! Owned watch service: one active recursive watch, many subscribers
//!
//! The `notify` callback forwards raw events into a tokio task which
//! debounces them per path and fans settled changes out to subscribers with
//! `try_send`. A subscriber whose queue is full or closed is dropped. When
//! the last subscriber goes away the watch is torn down; the activation
//! target is remembered so the next subscriber restarts it.

use crate::debounce::Debouncer;
use crate::event::{ChangeEvent, ChangeNotice, classify};
use crate::filter::is_ignored;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use trellis_core::paths::node_id;

/// Quiet period before a write is considered settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Bounded queue length per subscriber.
pub const SUBSCRIBER_QUEUE: usize = 256;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("no tokio runtime available to drive the watcher")]
    NoRuntime,
    #[error("cannot watch {}: {source}", path.display())]
    Backend {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, Clone)]
struct WatchTarget {
    root: PathBuf,
    run_token: String,
}

/// A running watch. Dropping it stops the backend and the forwarding task.
struct ActiveWatch {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl Drop for ActiveWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Default)]
struct Registry {
    target: Option<WatchTarget>,
    active: Option<ActiveWatch>,
    subscribers: HashMap<u64, mpsc::Sender<ChangeNotice>>,
    next_id: u64,
    /// Bumped on every start so a superseded task stops fanning out.
    generation: u64,
}

impl Registry {
    /// Deliver `notice` to every subscriber, dropping those that cannot
    /// accept it. Tears the watch down once nobody is left.
    fn fan_out(&mut self, notice: &ChangeNotice) {
        self.subscribers.retain(|id, sink| match sink.try_send(notice.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Subscriber {} is not keeping up, dropping it", id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscriber {} went away", id);
                false
            }
        });
        if self.subscribers.is_empty() && self.active.take().is_some() {
            info!("No subscribers left, stopping watch");
        }
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The Change Propagator.
#[derive(Clone)]
pub struct ChangePropagator {
    registry: Arc<Mutex<Registry>>,
    debounce: Duration,
}

impl Default for ChangePropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangePropagator {
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    pub fn with_debounce(debounce: Duration) -> Self {
        ChangePropagator {
            registry: Arc::new(Mutex::new(Registry::default())),
            debounce,
        }
    }

    /// Switch the watched subtree to `root`, tagging future notices with
    /// `run_token`. Any previous watch is torn down first. The watch only
    /// runs while somebody is subscribed.
    pub fn activate(&self, root: impl AsRef<Path>, run_token: impl Into<String>) {
        let root = root.as_ref();
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let target = WatchTarget {
            root,
            run_token: run_token.into(),
        };
        let mut registry = lock(&self.registry);
        registry.active = None;
        info!("Activating watch on {} ({})", target.root.display(), target.run_token);
        registry.target = Some(target);
        if !registry.subscribers.is_empty() {
            self.start(&mut registry);
        }
    }

    /// Register a subscriber. Restarts the remembered watch if it is not
    /// running.
    pub fn subscribe(&self) -> Subscription {
        let (sink, receiver) = mpsc::channel(SUBSCRIBER_QUEUE);
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, sink);
        if registry.active.is_none() && registry.target.is_some() {
            self.start(&mut registry);
        }
        Subscription {
            id,
            receiver,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Stop watching and forget the target. Subscribers stay registered and
    /// receive notices again after the next [`activate`](Self::activate).
    pub fn teardown(&self) {
        let mut registry = lock(&self.registry);
        registry.target = None;
        if registry.active.take().is_some() {
            info!("Watch torn down");
        }
    }

    pub fn is_watching(&self) -> bool {
        lock(&self.registry).active.is_some()
    }

    pub fn run_token(&self) -> Option<String> {
        lock(&self.registry).target.as_ref().map(|t| t.run_token.clone())
    }

    pub fn root(&self) -> Option<PathBuf> {
        lock(&self.registry).target.as_ref().map(|t| t.root.clone())
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }

    /// Start the watch for the current target. A failure is reported to
    /// subscribers as a `watchError` notice.
    fn start(&self, registry: &mut Registry) {
        let Some(target) = registry.target.clone() else {
            return;
        };
        registry.generation += 1;
        match self.spawn_watch(&target, registry.generation) {
            Ok(active) => registry.active = Some(active),
            Err(err) => {
                warn!("Failed to start watch: {}", err);
                registry.fan_out(&ChangeNotice::watch_error(err.to_string(), target.run_token));
            }
        }
    }

    fn spawn_watch(&self, target: &WatchTarget, generation: u64) -> Result<ActiveWatch, WatchError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // The receiver is gone once the watch is torn down.
            let _ = raw_tx.send(res);
        })
        .map_err(|source| WatchError::Backend {
            path: target.root.clone(),
            source,
        })?;
        watcher
            .watch(&target.root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Backend {
                path: target.root.clone(),
                source,
            })?;

        let forwarder = Forwarder {
            registry: Arc::downgrade(&self.registry),
            target: target.clone(),
            generation,
            debouncer: Debouncer::new(self.debounce),
        };
        let task = handle.spawn(forwarder.run(raw_rx));
        Ok(ActiveWatch {
            _watcher: watcher,
            task,
        })
    }
}

/// State of the task between the backend callback and the subscribers.
struct Forwarder {
    registry: Weak<Mutex<Registry>>,
    target: WatchTarget,
    generation: u64,
    debouncer: Debouncer,
}

impl Forwarder {
    async fn run(mut self, mut raw: mpsc::UnboundedReceiver<notify::Result<notify::Event>>) {
        loop {
            let deadline = self.debouncer.next_deadline();
            tokio::select! {
                received = raw.recv() => match received {
                    Some(Ok(event)) => {
                        let now = Instant::now();
                        for (path, kind) in classify(&event) {
                            if !is_ignored(&self.target.root, &path) {
                                self.debouncer.push(path, kind, now);
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn!("Watch backend error: {}", err);
                        let notice = ChangeNotice::watch_error(err.to_string(), self.target.run_token.clone());
                        if !self.deliver(&notice) {
                            return;
                        }
                    }
                    None => return,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {}
            }

            for (path, kind) in self.debouncer.drain_settled(Instant::now()) {
                let Some(id) = node_id(&self.target.root, &path) else {
                    continue;
                };
                let notice = ChangeNotice::Fs(ChangeEvent::now(id, kind, self.target.run_token.clone()));
                if !self.deliver(&notice) {
                    return;
                }
            }
        }
    }

    /// Fan out one notice. False once this task has nothing left to serve.
    fn deliver(&self, notice: &ChangeNotice) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = lock(&registry);
        if registry.generation != self.generation || registry.active.is_none() {
            return false;
        }
        registry.fan_out(notice);
        registry.active.is_some()
    }
}

/// A subscriber's end of the change stream. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<ChangeNotice>,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next notice; `None` once the propagator has dropped this subscriber.
    pub async fn recv(&mut self) -> Option<ChangeNotice> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ChangeNotice> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        registry.subscribers.remove(&self.id);
        if registry.subscribers.is_empty() && registry.active.take().is_some() {
            info!("Last subscriber left, stopping watch");
        }
    }
}
