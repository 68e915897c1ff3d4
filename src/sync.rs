//! Sync coordinator: mirrors optimistic board changes to the backend.
//!
//! Moves are debounced per task. A newer move for the same task replaces the
//! pending arguments and restarts the timer, so a drag that crosses several
//! days sends one call. Every other operation is sent at once. When a call
//! fires, it reads the task's *current* cached state, not the state at submit
//! time, so the server converges on the latest local order.
//!
//! Failures never propagate to callers. The affected cache entries are
//! invalidated and refetched, which replaces the optimistic state with the
//! backend's. If that refetch fails as well the entry stays stale, and the
//! next read through [`SyncCoordinator::refresh_if_stale`] tries again.
//!
//! Each submitted call walks a small state machine:
//!
//! ```text
//! Idle -> Applied -> [Pending] -> InFlight -> Idle
//!                                    \-> Failed -> Invalidated -> Idle
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::model::{CreateTask, MoveTaskPayload, Task, TaskId, UpdateTask};
use crate::position;
use crate::store::{CacheKey, Snapshot, TaskStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    /// Written to the cache, not yet scheduled.
    Applied,
    /// Waiting out the debounce window.
    Pending,
    InFlight,
    Failed,
    /// Cache entries discarded, refetch running.
    Invalidated,
}

impl SyncState {
    /// Transitions allowed within one submitted call.
    pub fn can_transition_to(self, next: SyncState) -> bool {
        use SyncState::*;
        matches!(
            (self, next),
            (Idle, Applied)
                | (Applied, Pending)
                | (Applied, InFlight)
                | (Pending, InFlight)
                | (InFlight, Idle)
                | (InFlight, Failed)
                | (Failed, Invalidated)
                | (Invalidated, Idle)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    Move {
        task_id: TaskId,
        target_task_id: Option<TaskId>,
    },
    Archive {
        task_id: TaskId,
        reason: Option<String>,
    },
    Unarchive {
        task_id: TaskId,
        target_task_id: Option<TaskId>,
    },
    Create {
        temp_id: TaskId,
        input: CreateTask,
    },
    Update {
        task_id: TaskId,
        changes: UpdateTask,
    },
    Delete {
        task_id: TaskId,
        /// Whether the task sat in the archive when deleted.
        archived: bool,
    },
}

impl SyncOp {
    pub fn task_id(&self) -> &TaskId {
        match self {
            SyncOp::Move { task_id, .. }
            | SyncOp::Archive { task_id, .. }
            | SyncOp::Unarchive { task_id, .. }
            | SyncOp::Update { task_id, .. }
            | SyncOp::Delete { task_id, .. } => task_id,
            SyncOp::Create { temp_id, .. } => temp_id,
        }
    }

    /// Only plain moves are coalesced.
    pub fn is_debounced(&self) -> bool {
        matches!(self, SyncOp::Move { .. })
    }

    pub fn touches_archive(&self) -> bool {
        match self {
            SyncOp::Archive { .. } | SyncOp::Unarchive { .. } => true,
            SyncOp::Delete { archived, .. } => *archived,
            SyncOp::Move { .. } | SyncOp::Create { .. } | SyncOp::Update { .. } => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SyncOp::Move { .. } => "move",
            SyncOp::Archive { .. } => "archive",
            SyncOp::Unarchive { .. } => "unarchive",
            SyncOp::Create { .. } => "create",
            SyncOp::Update { .. } => "update",
            SyncOp::Delete { .. } => "delete",
        }
    }
}

/// One operation to mirror, scoped to the week it was made on.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub week_id: String,
    pub op: SyncOp,
    /// Category actual times were adjusted optimistically.
    pub touches_categories: bool,
}

impl SyncRequest {
    pub fn new(week_id: impl Into<String>, op: SyncOp) -> Self {
        Self {
            week_id: week_id.into(),
            op,
            touches_categories: false,
        }
    }

    pub fn with_categories(mut self, touched: bool) -> Self {
        self.touches_categories = touched;
        self
    }

    /// Cache entries to discard if this call fails.
    pub fn affected_keys(&self) -> Vec<CacheKey> {
        let mut keys = vec![CacheKey::week(self.week_id.clone())];
        if self.op.touches_archive() {
            keys.push(CacheKey::Archive);
        }
        if self.touches_categories {
            keys.push(CacheKey::Categories);
        }
        keys
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub submitted: u64,
    pub superseded: u64,
    pub sent: u64,
    pub confirmed: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub task_id: TaskId,
    pub op: &'static str,
    pub message: String,
}

struct PendingCall {
    generation: u64,
    request: SyncRequest,
    timer: AbortHandle,
}

struct Inner {
    backend: Arc<dyn Backend>,
    store: TaskStore,
    debounce: Duration,
    runtime: Handle,
    generation: AtomicU64,
    pending: Mutex<HashMap<TaskId, PendingCall>>,
    states: Mutex<HashMap<TaskId, (u64, SyncState)>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Keys with a refetch running.
    refreshing: Mutex<HashSet<CacheKey>>,
    stats: Mutex<SyncStats>,
    failures: Mutex<Vec<SyncFailure>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the coordinator. Clones share pending calls and state.
#[derive(Clone)]
pub struct SyncCoordinator {
    inner: Arc<Inner>,
}

impl SyncCoordinator {
    /// Build a coordinator on the current tokio runtime.
    pub fn new(backend: Arc<dyn Backend>, store: TaskStore, debounce: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|err| Error::Runtime(err.to_string()))?;
        Ok(Self {
            inner: Arc::new(Inner {
                backend,
                store,
                debounce,
                runtime,
                generation: AtomicU64::new(0),
                pending: Mutex::new(HashMap::new()),
                states: Mutex::new(HashMap::new()),
                tasks: Mutex::new(Vec::new()),
                refreshing: Mutex::new(HashSet::new()),
                stats: Mutex::new(SyncStats::default()),
                failures: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.inner.store
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.inner.backend)
    }

    pub fn debounce(&self) -> Duration {
        self.inner.debounce
    }

    /// Queue an operation whose optimistic effect is already in the store.
    pub fn submit(&self, request: SyncRequest) {
        let task_id = request.op.task_id().clone();
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.transition(&task_id, generation, SyncState::Applied);
        self.inner.bump(|stats| stats.submitted += 1);

        if request.op.is_debounced() {
            self.schedule(task_id, generation, request);
            return;
        }

        debug!(task = %task_id, op = request.op.label(), "sending immediately");
        let inner = Arc::clone(&self.inner);
        let handle = self
            .inner
            .runtime
            .spawn(async move { inner.execute(generation, request).await });
        self.inner.track(handle);
    }

    fn schedule(&self, task_id: TaskId, generation: u64, request: SyncRequest) {
        let delay = self.inner.debounce;
        // Held until the slot is filled so the timer cannot fire first.
        let mut pending = lock(&self.inner.pending);

        let inner = Arc::clone(&self.inner);
        let handle = self.inner.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(request) = inner.take_pending(generation) else {
                return;
            };
            inner.execute(generation, request).await;
        });

        let previous = pending.insert(
            task_id.clone(),
            PendingCall {
                generation,
                request,
                timer: handle.abort_handle(),
            },
        );
        if let Some(previous) = previous {
            previous.timer.abort();
            self.inner.bump(|stats| stats.superseded += 1);
            debug!(task = %task_id, superseded = previous.generation, "pending move replaced");
        }
        self.inner.transition(&task_id, generation, SyncState::Pending);
        drop(pending);

        debug!(task = %task_id, delay_ms = delay.as_millis() as u64, "move debounced");
        self.inner.track(handle);
    }

    /// State of the most recent call for `task_id`.
    pub fn state(&self, task_id: &TaskId) -> SyncState {
        lock(&self.inner.states)
            .get(task_id)
            .map(|(_, state)| *state)
            .unwrap_or(SyncState::Idle)
    }

    /// Moves waiting out their debounce window.
    pub fn pending_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    pub fn stats(&self) -> SyncStats {
        *lock(&self.inner.stats)
    }

    /// Failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<SyncFailure> {
        std::mem::take(&mut *lock(&self.inner.failures))
    }

    /// Wait for every scheduled and in-flight call, including recoveries.
    pub async fn drain(&self) {
        loop {
            let handles = std::mem::take(&mut *lock(&self.inner.tasks));
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(err) = handle.await {
                    if err.is_panic() {
                        warn!(error = %err, "sync task panicked");
                    }
                }
            }
        }
    }

    /// Fetch `key` from the backend into the store.
    pub async fn refresh(&self, key: &CacheKey) -> Result<()> {
        self.inner.refresh(key).await
    }

    /// Refetch `key` in the background if an earlier refetch left it stale.
    ///
    /// Does nothing while a refetch of `key` is already running. A failed
    /// attempt leaves the entry stale, so the next read tries again.
    pub fn refresh_if_stale(&self, key: &CacheKey) {
        if !self.inner.store.is_stale(key) || !self.inner.begin_refresh(key) {
            return;
        }
        debug!(key = %key, "stale entry read, refetching");
        let inner = Arc::clone(&self.inner);
        let key = key.clone();
        let handle = self.inner.runtime.spawn(async move {
            if let Err(err) = inner.refresh(&key).await {
                warn!(key = %key, error = %err, "refetch failed, entry stays invalidated");
            }
            inner.end_refresh(&key);
        });
        self.inner.track(handle);
    }

    /// Fetch `key` unless the store already holds a value for it.
    pub async fn ensure_loaded(&self, key: &CacheKey) -> Result<()> {
        if self.inner.store.read(key).is_some() {
            return Ok(());
        }
        self.inner.refresh(key).await
    }
}

impl Inner {
    fn bump(&self, update: impl FnOnce(&mut SyncStats)) {
        update(&mut lock(&self.stats));
    }

    /// Mark `key` as being refetched. Returns `false` if it already was.
    fn begin_refresh(&self, key: &CacheKey) -> bool {
        lock(&self.refreshing).insert(key.clone())
    }

    fn end_refresh(&self, key: &CacheKey) {
        lock(&self.refreshing).remove(key);
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut tasks = lock(&self.tasks);
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Claim the pending call scheduled as `generation`, unless superseded.
    ///
    /// Looked up by generation since a reconciled create re-keys its slot.
    fn take_pending(&self, generation: u64) -> Option<SyncRequest> {
        let mut pending = lock(&self.pending);
        let task_id = pending
            .iter()
            .find(|(_, call)| call.generation == generation)
            .map(|(task_id, _)| task_id.clone())?;
        pending.remove(&task_id).map(|call| call.request)
    }

    fn transition(&self, task_id: &TaskId, generation: u64, next: SyncState) {
        let mut states = lock(&self.states);
        if let Some((current_generation, current)) = states.get(task_id) {
            if *current_generation > generation {
                return;
            }
            if *current_generation == generation && !current.can_transition_to(next) {
                warn!(task = %task_id, from = ?current, to = ?next, "unexpected sync state transition");
            }
        }
        if next == SyncState::Idle {
            states.remove(task_id);
        } else {
            states.insert(task_id.clone(), (generation, next));
        }
    }

    fn cached_task(&self, key: &CacheKey, task_id: &TaskId) -> Option<Task> {
        self.store
            .read_tasks(key)?
            .into_iter()
            .find(|task| task.id == *task_id)
    }

    async fn execute(self: Arc<Self>, generation: u64, request: SyncRequest) {
        let task_id = request.op.task_id().clone();
        let span = info_span!(
            "sync",
            task = %task_id,
            op = request.op.label(),
            week = %request.week_id
        );
        async move {
            self.transition(&task_id, generation, SyncState::InFlight);
            self.bump(|stats| stats.sent += 1);

            match self.send(&request).await {
                Ok(created) => {
                    self.bump(|stats| stats.confirmed += 1);
                    self.transition(&task_id, generation, SyncState::Idle);
                    info!("sync confirmed");
                    if let Some(created) = created {
                        self.reconcile_created(&request.week_id, &task_id, created)
                            .await;
                    }
                }
                Err(err) => {
                    self.bump(|stats| stats.failed += 1);
                    self.transition(&task_id, generation, SyncState::Failed);
                    warn!(error = %err, "sync failed, discarding optimistic state");
                    lock(&self.failures).push(SyncFailure {
                        task_id: task_id.clone(),
                        op: request.op.label(),
                        message: err.to_string(),
                    });
                    self.recover(&task_id, generation, &request).await;
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Perform the backend call. Returns the created task for creates.
    async fn send(&self, request: &SyncRequest) -> Result<Option<Task>> {
        let week_key = CacheKey::week(request.week_id.clone());
        match &request.op {
            SyncOp::Move {
                task_id,
                target_task_id,
            } => {
                let Some(task) = self.cached_task(&week_key, task_id) else {
                    debug!("task left the week before the move fired, skipping");
                    return Ok(None);
                };
                let payload = MoveTaskPayload {
                    week_plan_id: Some(request.week_id.clone()),
                    day: Some(task.day),
                    date: Some(task.date),
                    position: Some(task.position),
                    target_task_id: target_task_id.clone(),
                    is_archive: Some(false),
                    archive_reason: None,
                };
                self.backend.move_task(task_id, &payload).await?;
                Ok(None)
            }
            SyncOp::Archive { task_id, reason } => {
                let archived = self.cached_task(&CacheKey::Archive, task_id);
                let payload = MoveTaskPayload {
                    week_plan_id: Some(request.week_id.clone()),
                    position: archived.map(|task| task.position),
                    is_archive: Some(true),
                    archive_reason: reason.clone(),
                    ..Default::default()
                };
                self.backend.move_task(task_id, &payload).await?;
                Ok(None)
            }
            SyncOp::Unarchive {
                task_id,
                target_task_id,
            } => {
                let placed = self.cached_task(&week_key, task_id);
                let payload = MoveTaskPayload {
                    week_plan_id: Some(request.week_id.clone()),
                    day: placed.as_ref().map(|task| task.day),
                    date: placed.as_ref().map(|task| task.date),
                    position: placed.as_ref().map(|task| task.position),
                    target_task_id: target_task_id.clone(),
                    is_archive: Some(false),
                    archive_reason: None,
                };
                self.backend.move_task(task_id, &payload).await?;
                Ok(None)
            }
            SyncOp::Create { temp_id, input } => {
                let mut body = input.clone();
                if let Some(task) = self.cached_task(&week_key, temp_id) {
                    body.day = task.day;
                    body.date = task.date;
                    body.position = task.position;
                }
                let created = self.backend.create_task(&request.week_id, &body).await?;
                Ok(Some(created))
            }
            SyncOp::Update { task_id, changes } => {
                self.backend.update_task(task_id, changes).await?;
                Ok(None)
            }
            SyncOp::Delete { task_id, .. } => {
                self.backend.delete_task(task_id).await?;
                Ok(None)
            }
        }
    }

    /// Swap the temporary id for the server id, keeping day and position.
    async fn reconcile_created(&self, week_id: &str, temp_id: &TaskId, created: Task) {
        let key = CacheKey::week(week_id.to_string());
        if self.cached_task(&key, temp_id).is_none() {
            // The optimistic entry is gone (week unloaded or refetched).
            debug!(server_id = %created.id, "no optimistic entry to reconcile, refreshing week");
            if let Err(err) = self.refresh(&key).await {
                warn!(error = %err, "refresh after create failed");
                self.store.invalidate(&key);
            }
            return;
        }

        let server_id = created.id.clone();
        self.store.write_tasks(&key, |old| {
            old.unwrap_or_default()
                .iter()
                .map(|task| {
                    if task.id == *temp_id {
                        let mut confirmed = task.clone();
                        confirmed.id = created.id.clone();
                        confirmed.created_at = created.created_at;
                        confirmed
                    } else {
                        task.clone()
                    }
                })
                .collect()
        });

        // A move made before the create was confirmed still waits under the
        // temporary id.
        {
            let mut pending = lock(&self.pending);
            if let Some(mut call) = pending.remove(temp_id) {
                if let SyncOp::Move { task_id, .. } = &mut call.request.op {
                    *task_id = server_id.clone();
                }
                pending.insert(server_id.clone(), call);
            }
        }
        let mut states = lock(&self.states);
        if let Some(entry) = states.remove(temp_id) {
            states.insert(server_id.clone(), entry);
        }
        debug!(temp = %temp_id, server_id = %server_id, "temporary id reconciled");
    }

    async fn recover(&self, task_id: &TaskId, generation: u64, request: &SyncRequest) {
        let keys = request.affected_keys();
        // Claimed before invalidating so reads in between do not refetch too.
        let claimed: Vec<bool> = keys.iter().map(|key| self.begin_refresh(key)).collect();
        for key in &keys {
            self.store.invalidate(key);
        }
        self.transition(task_id, generation, SyncState::Invalidated);

        for (key, claimed) in keys.iter().zip(claimed) {
            match self.refresh(key).await {
                Ok(()) => debug!(key = %key, "refetched after failure"),
                Err(err) => {
                    warn!(key = %key, error = %err, "refetch failed, entry stays invalidated")
                }
            }
            if claimed {
                self.end_refresh(key);
            }
        }
        self.transition(task_id, generation, SyncState::Idle);
    }

    async fn refresh(&self, key: &CacheKey) -> Result<()> {
        let snapshot = match key {
            CacheKey::Week(week_id) => {
                let mut tasks = self.backend.week_tasks(week_id).await?;
                position::sort_week(&mut tasks);
                Snapshot::Tasks(tasks)
            }
            CacheKey::Archive => {
                let mut tasks = self.backend.archived_tasks().await?;
                position::sort_by_position(&mut tasks);
                Snapshot::Tasks(tasks)
            }
            CacheKey::Categories => Snapshot::Categories(self.backend.categories().await?),
        };
        self.store.replace(key, snapshot);
        Ok(())
    }
}
