//! Data-store capability.
//!
//! The dispatch layer never queries data itself. It only needs to know
//! whether the shared store handle is live before running a handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

#[async_trait]
pub trait DataStore: Send + Sync {
    /// True when the store can serve requests.
    async fn is_available(&self) -> bool;
}

/// Keyed in-memory store backing the demo routes and tests.
#[derive(Debug)]
pub struct MemoryStore<T> {
    available: AtomicBool,
    items: RwLock<Vec<T>>,
}

impl<T: Clone> MemoryStore<T> {
    pub fn new(items: Vec<T>) -> Arc<Self> {
        Arc::new(Self {
            available: AtomicBool::new(true),
            items: RwLock::new(items),
        })
    }

    /// Simulate losing or regaining the connection.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.items
            .read()
            .map(|items| items.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.snapshot().into_iter().find(|item| pred(item))
    }

    pub fn insert(&self, item: T) {
        let mut items = self
            .items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        items.push(item);
    }

    /// Remove every item matching `pred`, returning how many were removed.
    pub fn remove(&self, pred: impl Fn(&T) -> bool) -> usize {
        let mut items = self
            .items
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = items.len();
        items.retain(|item| !pred(item));
        before - items.len()
    }
}

#[async_trait]
impl<T: Send + Sync> DataStore for MemoryStore<T> {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }
}
