//! Bound on simultaneous upstream model calls

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared counting limiter; clones share the same permits
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Held for the lifetime of one upstream call; releases on drop
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter; capacity is at least one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> LimiterPermit {
        // The semaphore is owned here and never closed.
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("limiter semaphore closed"),
        };
        LimiterPermit { _permit: permit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_capacity_floor() {
        assert_eq!(ConcurrencyLimiter::new(0).capacity(), 1);
        assert_eq!(ConcurrencyLimiter::new(3).capacity(), 3);
    }

    #[tokio::test]
    async fn test_permits_release_on_drop() {
        let limiter = ConcurrencyLimiter::new(2);
        let a = limiter.acquire().await;
        let _b = limiter.clone().acquire().await;
        assert_eq!(limiter.available(), 0);

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(a);
        let _c = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(limiter.available(), 0);
    }
}
