//! Keyed registry of recurring background tasks with idempotent start.
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug)]
pub struct TaskRegistry<K> {
    tasks: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K> Default for TaskRegistry<K> {
    fn default() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Copy + Debug> TaskRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the future built by `task` unless a task for `key` is still
    /// running. Returns whether a new task was spawned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_if_idle<F, Fut>(&self, key: K, task: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if tasks.get(&key).is_some_and(|h| !h.is_finished()) {
            debug!(?key, "task already running");
            return false;
        }
        tasks.insert(key, tokio::spawn(task()));
        true
    }

    pub fn is_running(&self, key: K) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&self, key: K) {
        if let Some(handle) = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
        {
            handle.abort();
        }
    }

    pub fn stop_all(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn running_count(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl<K> Drop for TaskRegistry<K> {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}
