use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one call issued through a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    pub fn new(value: u64) -> Self {
        CallId(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        CallId::new(value)
    }
}

/// Hands out call ids starting at 1. Each transport owns its own allocator.
#[derive(Debug)]
pub struct CallIdAllocator {
    next: AtomicU64,
}

impl CallIdAllocator {
    pub fn new() -> Self {
        CallIdAllocator {
            next: AtomicU64::new(1),
        }
    }

    pub fn allocate(&self) -> CallId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        CallId::new(id)
    }

    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for CallIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_call_id_creation() {
        let id = CallId::new(42);
        assert_eq!(id.as_u64(), 42);
        assert_eq!(format!("{}", id), "CallId(42)");
        assert_eq!(CallId::from(7), CallId::new(7));
    }

    #[test]
    fn test_allocator_starts_at_one() {
        let allocator = CallIdAllocator::new();
        assert_eq!(allocator.peek_next(), 1);
        assert_eq!(allocator.allocate(), CallId::new(1));
        assert_eq!(allocator.allocate(), CallId::new(2));
        assert_eq!(allocator.peek_next(), 3);
    }

    #[test]
    fn test_allocator_thread_safety() {
        let allocator = Arc::new(CallIdAllocator::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let allocator = Arc::clone(&allocator);
            handles.push(thread::spawn(move || {
                (0..100).map(|_| allocator.allocate()).collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
