use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// URLs whose traversal has begun in one crawl run.
#[derive(Debug, Default)]
pub struct Frontier {
    visited: Mutex<HashSet<String>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically marks `url` as visited. Returns `true` only for the first
    /// entry of `url`; callers must skip the URL otherwise.
    pub fn try_enter(&self, url: &str) -> bool {
        let mut visited = self.visited.lock().unwrap_or_else(PoisonError::into_inner);
        if visited.contains(url) {
            return false;
        }
        visited.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.visited.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
