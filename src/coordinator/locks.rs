use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes operations that target the same image id.
///
/// The snapshot race between a delete and a concurrent read of the same id
/// is not coordinated by the wider design; holding one of these guards for
/// the full operation (including compensation) closes it locally. Distinct
/// ids never contend.
#[derive(Default)]
pub struct IdLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, image_id: &str) -> OwnedMutexGuard<()> {
        if self.locks.len() > 10_000 {
            // Uncontended entries are just garbage from finished operations.
            self.locks
                .retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        let lock = self
            .locks
            .entry(image_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
