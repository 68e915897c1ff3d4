//! In-memory cache of board partitions.
//!
//! One store lives for one session. It holds the tasks of each loaded week
//! plan, the archive, and the category list. Values are replaced whole.
//! There are no field-level updates, so a reader always sees a complete
//! snapshot. Every change is broadcast to subscribers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use crate::model::{Category, Task};

const EVENT_CAPACITY: usize = 256;

/// Cache key for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// All tasks of a week plan, grouped implicitly by day.
    Week(String),
    /// The singleton archive partition.
    Archive,
    Categories,
}

impl CacheKey {
    pub fn week(week_id: impl Into<String>) -> Self {
        CacheKey::Week(week_id.into())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Week(id) => write!(f, "week:{id}"),
            CacheKey::Archive => f.write_str("archive"),
            CacheKey::Categories => f.write_str("categories"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Tasks(Vec<Task>),
    Categories(Vec<Category>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventKind {
    /// Optimistic local write.
    Written,
    /// Value discarded; the next read must fetch.
    Invalidated,
    /// Fresh value installed from the backend.
    Refreshed,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: CacheKey,
    pub kind: StoreEventKind,
    pub generation: u64,
}

#[derive(Debug, Default)]
struct Entry {
    snapshot: Option<Snapshot>,
    generation: u64,
    stale: bool,
}

#[derive(Debug)]
struct State {
    entries: HashMap<CacheKey, Entry>,
}

/// Shared handle to the session cache. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct TaskStore {
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
            })),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, key: CacheKey, kind: StoreEventKind, generation: u64) {
        // No subscribers is fine.
        let _ = self.events.send(StoreEvent {
            key,
            kind,
            generation,
        });
    }

    /// Receive every change made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Current snapshot, or `None` if never loaded or invalidated.
    pub fn read(&self, key: &CacheKey) -> Option<Snapshot> {
        self.lock()
            .entries
            .get(key)
            .and_then(|entry| entry.snapshot.clone())
    }

    /// Replace the value at `key` with whatever `updater` returns.
    ///
    /// The updater sees the full old value and must return the full new one.
    /// It runs under the store lock, so writes to a key never interleave.
    pub fn write<F>(&self, key: &CacheKey, updater: F)
    where
        F: FnOnce(Option<&Snapshot>) -> Snapshot,
    {
        let generation = {
            let mut state = self.lock();
            let entry = state.entries.entry(key.clone()).or_default();
            let next = updater(entry.snapshot.as_ref());
            entry.snapshot = Some(next);
            entry.generation += 1;
            entry.generation
        };
        self.notify(key.clone(), StoreEventKind::Written, generation);
    }

    /// Discard the value at `key` and mark it for refetch.
    pub fn invalidate(&self, key: &CacheKey) {
        let generation = {
            let mut state = self.lock();
            let entry = state.entries.entry(key.clone()).or_default();
            entry.snapshot = None;
            entry.stale = true;
            entry.generation += 1;
            entry.generation
        };
        self.notify(key.clone(), StoreEventKind::Invalidated, generation);
    }

    /// Install a value fetched from the backend.
    pub fn replace(&self, key: &CacheKey, snapshot: Snapshot) {
        let generation = {
            let mut state = self.lock();
            let entry = state.entries.entry(key.clone()).or_default();
            entry.snapshot = Some(snapshot);
            entry.stale = false;
            entry.generation += 1;
            entry.generation
        };
        self.notify(key.clone(), StoreEventKind::Refreshed, generation);
    }

    /// True once `key` was invalidated and not yet refreshed.
    pub fn is_stale(&self, key: &CacheKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.stale)
            .unwrap_or(false)
    }

    /// Number of changes applied to `key` so far.
    pub fn generation(&self, key: &CacheKey) -> u64 {
        self.lock()
            .entries
            .get(key)
            .map(|entry| entry.generation)
            .unwrap_or(0)
    }

    /// Drop every entry. Used at session teardown.
    pub fn clear(&self) {
        let keys: Vec<CacheKey> = {
            let mut state = self.lock();
            state.entries.drain().map(|(key, _)| key).collect()
        };
        for key in keys {
            self.notify(key, StoreEventKind::Cleared, 0);
        }
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    pub fn read_tasks(&self, key: &CacheKey) -> Option<Vec<Task>> {
        match self.read(key)? {
            Snapshot::Tasks(tasks) => Some(tasks),
            Snapshot::Categories(_) => None,
        }
    }

    /// Whole-partition write for task keys.
    pub fn write_tasks<F>(&self, key: &CacheKey, updater: F)
    where
        F: FnOnce(Option<&[Task]>) -> Vec<Task>,
    {
        self.write(key, |old| {
            let current = match old {
                Some(Snapshot::Tasks(tasks)) => Some(tasks.as_slice()),
                _ => None,
            };
            Snapshot::Tasks(updater(current))
        });
    }

    pub fn read_categories(&self) -> Option<Vec<Category>> {
        match self.read(&CacheKey::Categories)? {
            Snapshot::Categories(categories) => Some(categories),
            Snapshot::Tasks(_) => None,
        }
    }

    pub fn write_categories<F>(&self, updater: F)
    where
        F: FnOnce(Option<&[Category]>) -> Vec<Category>,
    {
        self.write(&CacheKey::Categories, |old| {
            let current = match old {
                Some(Snapshot::Categories(categories)) => Some(categories.as_slice()),
                _ => None,
            };
            Snapshot::Categories(updater(current))
        });
    }
}
