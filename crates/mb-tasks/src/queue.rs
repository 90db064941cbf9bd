//! Cancellable concurrent task queue.
//!
//! Every submitted task starts right away on the ambient tokio runtime; there
//! is no admission limit. Each task gets a child of the queue's current
//! cancellation token. `cancel_all` cancels that token and installs a fresh
//! one, so later submissions are unaffected.
//!
//! Per task: `Queued → Running → Completed | Failed | Cancelled`.
//!
//! Records of unsettled tasks are always kept. Settled ones are kept up to the
//! queue's history limit; past it the oldest submissions are forgotten first
//! (never the one that just settled), and `status` returns `None` for them.
//!
//! A task that errors or panics is logged and recorded as failed. It never
//! touches its siblings or the queue. Cancellation is cooperative: the queue
//! signals, and the task is expected to stop at its next suspension point.

use futures::FutureExt;
use futures::future::BoxFuture;
use mb_core::ObservableCell;
use mb_core::cell::Subscription;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::generation::GenerationError;

pub type TaskId = u64;

/// Settled records a queue keeps unless told otherwise.
pub const DEFAULT_TASK_HISTORY: usize = 64;

#[derive(Debug, Error)]
pub enum TaskError {
    /// Stopped because cancellation was requested. Not a failure.
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("{0}")]
    Other(String),
}

pub type TaskResult = Result<(), TaskError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed(String),
    Cancelled,
}

impl TaskStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_) | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
}

type Work = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, TaskResult> + Send>;

/// A named unit of asynchronous work.
pub struct Task {
    name: String,
    work: Work,
}

impl Task {
    pub fn new<F, Fut>(name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            work: Box::new(move |token| work(token).boxed()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

struct Inner {
    token: Mutex<CancellationToken>,
    records: ObservableCell<Vec<TaskRecord>>,
    next_id: AtomicU64,
    in_flight: AtomicUsize,
    idle: Notify,
    history: usize,
}

/// Shared handle to the queue. Cloning shares the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_TASK_HISTORY)
    }

    /// Queue that remembers at most `history` settled records.
    pub fn with_history(history: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: Mutex::new(CancellationToken::new()),
                records: ObservableCell::default(),
                next_id: AtomicU64::new(1),
                in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
                history,
            }),
        }
    }

    /// Start `task` and return immediately.
    ///
    /// Must be called from within a tokio runtime; outside one the task is
    /// recorded as failed and never runs.
    pub fn submit(&self, task: Task) -> TaskId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let Task { name, work } = task;
        self.inner.records.update(|records| {
            let mut next = records.clone();
            next.push(TaskRecord {
                id,
                name: name.clone(),
                status: TaskStatus::Queued,
            });
            next
        });

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("task {id} ({name}) not started: {e}");
                self.set_status(id, TaskStatus::Failed(e.to_string()));
                return id;
            }
        };

        let token = self.current_token().child_token();
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        log::info!("task {id} ({name}) submitted");

        let queue = self.clone();
        handle.spawn(async move {
            queue.set_status(id, TaskStatus::Running);
            let outcome = AssertUnwindSafe(work(token.clone())).catch_unwind().await;
            let status = match outcome {
                Ok(Ok(())) if token.is_cancelled() => TaskStatus::Cancelled,
                Ok(Ok(())) => TaskStatus::Completed,
                Ok(Err(TaskError::Cancelled)) => TaskStatus::Cancelled,
                Ok(Err(e)) => {
                    log::warn!("task {id} ({name}) failed: {e}");
                    TaskStatus::Failed(e.to_string())
                }
                Err(_) => {
                    log::warn!("task {id} ({name}) panicked");
                    TaskStatus::Failed("task panicked".to_string())
                }
            };
            if status == TaskStatus::Cancelled {
                log::debug!("task {id} ({name}) cancelled");
            } else {
                log::debug!("task {id} ({name}) settled: {status:?}");
            }
            queue.set_status(id, status);
            queue.settle_one();
        });
        id
    }

    /// Signal every running task to stop. Settled tasks are unaffected and
    /// tasks submitted afterwards start with a fresh token.
    pub fn cancel_all(&self) {
        let old = {
            let mut slot = self
                .inner
                .token
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *slot, CancellationToken::new())
        };
        log::info!("cancel_all: signalling {} task(s)", self.running_count());
        old.cancel();
    }

    /// Tasks submitted and not yet settled.
    pub fn running_count(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once no task is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.running_count() == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn records(&self) -> Vec<TaskRecord> {
        self.inner.records.get().as_ref().clone()
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.inner
            .records
            .get()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.status.clone())
    }

    /// Forget records of tasks that have settled.
    pub fn clear_settled(&self) {
        self.inner.records.update(|records| {
            records
                .iter()
                .filter(|r| !r.status.is_settled())
                .cloned()
                .collect()
        });
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&Vec<TaskRecord>) + Send + Sync + 'static) -> Subscription {
        self.inner.records.subscribe(callback)
    }

    fn current_token(&self) -> CancellationToken {
        self.inner
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_status(&self, id: TaskId, status: TaskStatus) {
        let settled = status.is_settled();
        let history = self.inner.history;
        self.inner.records.update(|records| {
            let mut next: Vec<TaskRecord> = records
                .iter()
                .map(|r| {
                    if r.id == id {
                        TaskRecord {
                            status: status.clone(),
                            ..r.clone()
                        }
                    } else {
                        r.clone()
                    }
                })
                .collect();
            if settled {
                trim_settled(&mut next, history, id);
            }
            next
        });
    }

    fn settle_one(&self) {
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Drop the oldest settled records until at most `keep` remain. The record of
/// `just_settled` is never dropped.
fn trim_settled(records: &mut Vec<TaskRecord>, keep: usize, just_settled: TaskId) {
    let settled = records.iter().filter(|r| r.status.is_settled()).count();
    let mut excess = settled.saturating_sub(keep);
    if excess == 0 {
        return;
    }
    log::trace!("forgetting {excess} settled task record(s)");
    records.retain(|r| {
        if excess > 0 && r.id != just_settled && r.status.is_settled() {
            excess -= 1;
            false
        } else {
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn completed_and_failed_tasks_are_isolated() {
        let queue = TaskQueue::new();
        let ok = queue.submit(Task::new("ok", |_| async { Ok(()) }));
        let bad = queue.submit(Task::new("bad", |_| async {
            Err(TaskError::Generation(GenerationError::Network("timeout".into())))
        }));
        let boom = queue.submit(Task::new("boom", |_| async {
            let reply: Option<u32> = None;
            let _ = reply.expect("provider exploded");
            Ok(())
        }));
        queue.wait_idle().await;

        assert_eq!(queue.status(ok), Some(TaskStatus::Completed));
        assert_eq!(
            queue.status(bad),
            Some(TaskStatus::Failed("network error: timeout".into()))
        );
        assert_eq!(queue.status(boom), Some(TaskStatus::Failed("task panicked".into())));

        // The queue keeps accepting work after failures.
        let again = queue.submit(Task::new("again", |_| async { Ok(()) }));
        queue.wait_idle().await;
        assert_eq!(queue.status(again), Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn cancel_all_settles_running_tasks_as_cancelled() {
        let queue = TaskQueue::new();
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(queue.submit(Task::new(format!("wait-{i}"), |token| async move {
                token.cancelled().await;
                Err(TaskError::Cancelled)
            })));
        }
        assert_eq!(queue.running_count(), 3);

        queue.cancel_all();
        queue.wait_idle().await;
        for id in ids {
            assert_eq!(queue.status(id), Some(TaskStatus::Cancelled));
        }
    }

    #[tokio::test]
    async fn cancel_all_does_not_touch_later_submissions() {
        let queue = TaskQueue::new();
        queue.cancel_all();
        let (tx, rx) = oneshot::channel::<()>();
        let id = queue.submit(Task::new("after", |token| async move {
            assert!(!token.is_cancelled());
            let _ = rx.await;
            Ok(())
        }));
        tx.send(()).unwrap();
        queue.wait_idle().await;
        assert_eq!(queue.status(id), Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn settled_records_can_be_cleared() {
        let queue = TaskQueue::new();
        queue.submit(Task::new("quick", |_| async { Ok(()) }));
        queue.wait_idle().await;
        assert_eq!(queue.records().len(), 1);
        queue.clear_settled();
        assert!(queue.records().is_empty());
    }

    #[test]
    fn submit_outside_runtime_records_failure() {
        let queue = TaskQueue::new();
        let id = queue.submit(Task::new("orphan", |_| async { Ok(()) }));
        assert!(matches!(queue.status(id), Some(TaskStatus::Failed(_))));
        assert_eq!(queue.running_count(), 0);
    }

    #[tokio::test]
    async fn long_runs_keep_a_bounded_history() {
        let queue = TaskQueue::with_history(16);
        let (tx, rx) = oneshot::channel::<()>();
        let held = queue.submit(Task::new("held", |_| async move {
            let _ = rx.await;
            Ok(())
        }));

        let mut last = 0;
        for i in 0..500 {
            last = queue.submit(Task::new(format!("quick-{i}"), |_| async { Ok(()) }));
            while queue.status(last) != Some(TaskStatus::Completed) {
                tokio::task::yield_now().await;
            }
        }

        let records = queue.records();
        assert_eq!(records.len(), 17);
        assert_eq!(queue.status(held), Some(TaskStatus::Running));
        assert_eq!(queue.status(last), Some(TaskStatus::Completed));
        assert_eq!(queue.status(last - 16), None);

        tx.send(()).unwrap();
        queue.wait_idle().await;
        assert_eq!(queue.records().len(), 16);
        assert_eq!(queue.status(held), Some(TaskStatus::Completed));
    }
}
