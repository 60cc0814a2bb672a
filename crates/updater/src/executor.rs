use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// A counting gate bounding concurrent updates against one data
/// directory, so co-located partitions do not thrash the same disk.
pub struct ConcurrencyGate {
    permits: Mutex<usize>,
    released: Condvar,
}

impl ConcurrencyGate {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Mutex::new(limit.max(1)),
            released: Condvar::new(),
        }
    }

    /// Blocks until a permit is free, then takes it. The permit returns
    /// to the gate when dropped.
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut permits = self.permits.lock().unwrap_or_else(|e| e.into_inner());
        while *permits == 0 {
            permits = self
                .released
                .wait(permits)
                .unwrap_or_else(|e| e.into_inner());
        }
        *permits -= 1;
        Permit {
            gate: Arc::clone(self),
        }
    }

    /// Permits currently free, for tests and diagnostics.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.permits.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An acquired slot on one data directory's gate.
pub struct Permit {
    gate: Arc<ConcurrencyGate>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let mut permits = self.gate.permits.lock().unwrap_or_else(|e| e.into_inner());
        *permits += 1;
        self.gate.released.notify_one();
    }
}

/// Thread-per-update scheduler with one [`ConcurrencyGate`] per data
/// directory.
///
/// Updates for partitions on different disks run freely in parallel;
/// updates sharing a disk queue on that disk's gate. There is no queue
/// ordering guarantee beyond what the gate's wakeups provide.
pub struct UpdateExecutor {
    max_per_data_dir: usize,
    gates: Mutex<HashMap<PathBuf, Arc<ConcurrencyGate>>>,
}

impl UpdateExecutor {
    #[must_use]
    pub fn new(max_per_data_dir: usize) -> Self {
        Self {
            max_per_data_dir,
            gates: Mutex::new(HashMap::new()),
        }
    }

    fn gate_for(&self, data_dir: &Path) -> Arc<ConcurrencyGate> {
        let mut gates = self.gates.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            gates
                .entry(data_dir.to_path_buf())
                .or_insert_with(|| Arc::new(ConcurrencyGate::new(self.max_per_data_dir))),
        )
    }

    /// Runs `task` on its own thread once `data_dir`'s gate admits it.
    pub fn execute<F, T>(&self, data_dir: &Path, task: F) -> JoinHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let gate = self.gate_for(data_dir);
        thread::spawn(move || {
            let _permit = gate.acquire();
            task()
        })
    }
}
