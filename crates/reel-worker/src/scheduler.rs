//! Keyed deferred actions.
//!
//! Run cleanup and cache eviction both need "do this later unless told
//! otherwise". Each pending action lives in a spawned task keyed by a
//! string; scheduling the same key again replaces the pending action and
//! cancelling a key aborts it, so no timer outlives the state it refers to.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

type TaskMap = HashMap<String, ScheduledTask>;

struct ScheduledTask {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Owner of keyed, cancellable delayed tasks.
///
/// Must be used from within a tokio runtime.
pub struct DelayScheduler {
    tasks: Arc<Mutex<TaskMap>>,
    next_generation: AtomicU64,
}

impl DelayScheduler {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Run `action` after `delay`, replacing any action pending under `key`.
    ///
    /// Once the delay elapses the key is released before `action` starts,
    /// so an action may schedule or cancel its own key.
    pub fn schedule<F>(&self, key: impl Into<String>, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let key = key.into();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        // Held across spawn + insert so the task cannot claim its key early
        let mut tasks = lock(&self.tasks);

        let shared = Arc::clone(&self.tasks);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut tasks = lock(&shared);
                match tasks.get(&task_key) {
                    Some(task) if task.generation == generation => {
                        tasks.remove(&task_key);
                    }
                    _ => return,
                }
            }
            action.await;
        });

        if let Some(previous) = tasks.insert(key, ScheduledTask { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Abort the action pending under `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match lock(&self.tasks).remove(key) {
            Some(task) => {
                task.handle.abort();
                debug!("Cancelled scheduled task '{}'", key);
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, key: &str) -> bool {
        lock(&self.tasks).contains_key(key)
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every pending action.
    pub fn shutdown(&self) {
        let drained: Vec<_> = lock(&self.tasks).drain().collect();
        if !drained.is_empty() {
            debug!("Aborting {} scheduled tasks", drained.len());
        }
        for (_, task) in drained {
            task.handle.abort();
        }
    }
}

impl Default for DelayScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DelayScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(tasks: &Mutex<TaskMap>) -> MutexGuard<'_, TaskMap> {
    tasks.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::oneshot;

    fn flag() -> (Arc<AtomicBool>, impl Future<Output = ()> + Send + 'static) {
        let fired = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&fired);
        (fired, async move { setter.store(true, Ordering::SeqCst) })
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_after_delay() {
        let scheduler = DelayScheduler::new();
        let (tx, rx) = oneshot::channel();
        let started = tokio::time::Instant::now();

        scheduler.schedule("run-1", Duration::from_secs(600), async move {
            let _ = tx.send(());
        });
        assert!(scheduler.is_scheduled("run-1"));

        rx.await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(600));
        assert!(!scheduler.is_scheduled("run-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_action() {
        let scheduler = DelayScheduler::new();
        let (fired, action) = flag();

        scheduler.schedule("run-1", Duration::from_secs(10), action);
        assert!(scheduler.cancel("run-1"));
        assert!(!scheduler.cancel("run-1"));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_action() {
        let scheduler = DelayScheduler::new();
        let (first, first_action) = flag();
        let (second, second_action) = flag();

        scheduler.schedule("source-1", Duration::from_secs(10), first_action);
        scheduler.schedule("source-1", Duration::from_secs(20), second_action);
        assert_eq!(scheduler.len(), 1);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(!first.load(Ordering::SeqCst));
        assert!(!second.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_everything() {
        let scheduler = DelayScheduler::new();
        let (a, action_a) = flag();
        let (b, action_b) = flag();

        scheduler.schedule("a", Duration::from_secs(1), action_a);
        scheduler.schedule("b", Duration::from_secs(2), action_b);
        scheduler.shutdown();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!a.load(Ordering::SeqCst));
        assert!(!b.load(Ordering::SeqCst));
    }
}
