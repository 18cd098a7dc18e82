//! In-memory run table.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use reel_models::{Run, RunId};
use tokio::sync::RwLock;

#[derive(Debug)]
struct RunRecord {
    run: Run,
    /// Uploaded input owned by the run, deleted at cleanup
    owned_input: Option<PathBuf>,
}

/// A run taken out of the store, with the files it owned.
#[derive(Debug)]
pub struct RemovedRun {
    pub run: Run,
    pub owned_input: Option<PathBuf>,
}

/// Shared map of live runs.
///
/// Cloning shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct RunStore {
    runs: Arc<RwLock<HashMap<RunId, RunRecord>>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, run: Run, owned_input: Option<PathBuf>) {
        let id = run.id.clone();
        self.runs
            .write()
            .await
            .insert(id, RunRecord { run, owned_input });
    }

    /// Snapshot of a run.
    pub async fn get(&self, id: &RunId) -> Option<Run> {
        self.runs.read().await.get(id).map(|record| record.run.clone())
    }

    /// Mutate a run in place, returning the updated snapshot.
    pub async fn update<F>(&self, id: &RunId, f: F) -> Option<Run>
    where
        F: FnOnce(&mut Run),
    {
        let mut runs = self.runs.write().await;
        let record = runs.get_mut(id)?;
        f(&mut record.run);
        Some(record.run.clone())
    }

    pub async fn remove(&self, id: &RunId) -> Option<RemovedRun> {
        self.runs.write().await.remove(id).map(|record| RemovedRun {
            run: record.run,
            owned_input: record.owned_input,
        })
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}
