//! Bounded cache of live methylomes.
//!
//! The set keeps at most `capacity` methylomes resident, evicting in LRU
//! order. An entry that some request still holds a reference to is skipped
//! at eviction time without being re-promoted; it becomes evictable again
//! once the last outside reference drops. Concurrent requests for the same
//! cold name share a single disk load: the first caller inserts a loading
//! slot and reads the file on a blocking thread, later callers park on the
//! slot's notifier and pick up the loaded instance.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, Notify};

use methq_methylome::{Methylome, MethylomeError};

#[derive(Error, Debug)]
pub enum MethylomeSetError {
    #[error("Invalid methylome name: {0}")]
    InvalidName(String),

    #[error("Methylome not found: {0}")]
    NotFound(String),

    #[error("Failed to load methylome {name}: {source}")]
    Load {
        name: String,
        source: MethylomeError,
    },
}

/// Accession-style names only: no path separators, nothing hidden. These
/// names are joined onto the methylome directory, so the check is what
/// keeps requests inside it.
pub fn is_valid_methylome_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

#[derive(Clone)]
enum Slot {
    Ready(Arc<Methylome>),
    Loading(Arc<Notify>),
}

#[derive(Default)]
struct SetState {
    slots: HashMap<String, Slot>,
    /// Names of Ready slots, least recently used first.
    order: VecDeque<String>,
}

pub struct MethylomeSet {
    dir: PathBuf,
    capacity: usize,
    state: Mutex<SetState>,
    n_loads: AtomicUsize,
}

impl MethylomeSet {
    pub fn new(dir: &Path, capacity: usize) -> Self {
        MethylomeSet {
            dir: dir.to_path_buf(),
            capacity: capacity.max(1),
            state: Mutex::new(SetState::default()),
            n_loads: AtomicUsize::new(0),
        }
    }

    /// Get a methylome by name, loading it from disk on a miss. The
    /// returned reference stays valid for as long as the caller holds it,
    /// even if the entry is evicted meanwhile.
    pub async fn get(&self, name: &str) -> Result<Arc<Methylome>, MethylomeSetError> {
        if !is_valid_methylome_name(name) {
            return Err(MethylomeSetError::InvalidName(name.to_string()));
        }
        loop {
            let mut state = self.state.lock().await;
            match state.slots.get(name).cloned() {
                Some(Slot::Ready(methylome)) => {
                    promote(&mut state.order, name);
                    return Ok(methylome);
                }
                Some(Slot::Loading(notify)) => {
                    // register interest while still holding the lock, so
                    // the loader's notify_waiters cannot slip in between
                    let mut notified = std::pin::pin!(notify.notified());
                    notified.as_mut().enable();
                    drop(state);
                    notified.await;
                }
                None => {
                    let notify = Arc::new(Notify::new());
                    state
                        .slots
                        .insert(name.to_string(), Slot::Loading(notify.clone()));
                    drop(state);
                    return self.load_slot(name, notify).await;
                }
            }
        }
    }

    async fn load_slot(
        &self,
        name: &str,
        notify: Arc<Notify>,
    ) -> Result<Arc<Methylome>, MethylomeSetError> {
        self.n_loads.fetch_add(1, Ordering::Relaxed);
        let dir = self.dir.clone();
        let owned_name = name.to_string();
        let loaded = tokio::task::spawn_blocking(move || Methylome::read(&dir, &owned_name))
            .await
            .unwrap_or_else(|join_error| {
                Err(MethylomeError::Io(std::io::Error::other(join_error)))
            });

        let mut state = self.state.lock().await;
        match loaded {
            Ok(methylome) => {
                let methylome = Arc::new(methylome);
                state
                    .slots
                    .insert(name.to_string(), Slot::Ready(methylome.clone()));
                state.order.push_back(name.to_string());
                evict_excess(&mut state, self.capacity);
                drop(state);
                notify.notify_waiters();
                Ok(methylome)
            }
            Err(error) => {
                // failed loads leave no trace; waiters retry and see the
                // absent slot, typically failing the same way
                state.slots.remove(name);
                drop(state);
                notify.notify_waiters();
                Err(classify_load_error(name, error))
            }
        }
    }

    /// Number of resident (fully loaded) methylomes.
    pub async fn resident(&self) -> usize {
        self.state.lock().await.order.len()
    }

    /// Number of disk loads performed since construction.
    pub fn n_loads(&self) -> usize {
        self.n_loads.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn classify_load_error(name: &str, error: MethylomeError) -> MethylomeSetError {
    match &error {
        MethylomeError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            MethylomeSetError::NotFound(name.to_string())
        }
        _ => MethylomeSetError::Load {
            name: name.to_string(),
            source: error,
        },
    }
}

fn promote(order: &mut VecDeque<String>, name: &str) {
    if let Some(at) = order.iter().position(|n| n == name) {
        let name = order.remove(at).unwrap();
        order.push_back(name);
    }
}

fn evict_excess(state: &mut SetState, capacity: usize) {
    let mut scanned = 0;
    while state.order.len() > capacity && scanned < state.order.len() {
        let name = &state.order[scanned];
        let evictable = matches!(
            state.slots.get(name),
            Some(Slot::Ready(m)) if Arc::strong_count(m) == 1
        );
        if evictable {
            let name = state.order.remove(scanned).unwrap();
            state.slots.remove(&name);
        } else {
            // still referenced by some request: skip, keep LRU position
            scanned += 1;
        }
    }
}
