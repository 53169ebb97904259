//! Concurrency Management Module
//!
//! This module provides the bounded worker pool that fans image tasks out
//! across tokio tasks, plus the counters used to summarise a batch.
//!
//! ## Usage Example
//!
//! ```no_run
//! use registry_sync::concurrency::WorkerPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = WorkerPool::new(4)?;
//! let outcomes = pool
//!     .run(vec!["a", "b", "c"], |index, job| async move {
//!         Ok(format!("{}:{}", index, job))
//!     })
//!     .await;
//! assert_eq!(outcomes.len(), 3);
//! # Ok(())
//! # }
//! ```
//!
//! Every job gets its own outcome: a failing or panicking job is reported in
//! its slot and never cancels the rest of the batch.

pub mod stats;

pub use stats::SyncStats;

use crate::error::{Result, SyncError};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Concurrency error types
#[derive(Debug, thiserror::Error)]
pub enum ConcurrencyError {
    #[error("Failed to acquire permit: {0}")]
    PermitAcquisitionFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<ConcurrencyError> for SyncError {
    fn from(err: ConcurrencyError) -> Self {
        SyncError::Worker(err.to_string())
    }
}

/// Fixed-size pool bounding how many jobs run at once
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> std::result::Result<Self, ConcurrencyError> {
        if workers == 0 {
            return Err(ConcurrencyError::InvalidConfiguration(
                "worker count must be greater than 0".to_string(),
            ));
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task(index, job)` for every job with at most `workers` in flight.
    ///
    /// Outcomes are returned in submission order.
    pub async fn run<J, T, F, Fut>(&self, jobs: Vec<J>, task: F) -> Vec<Result<T>>
    where
        J: Send + 'static,
        T: Send + 'static,
        F: Fn(usize, J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let task = Arc::new(task);

        let handles: Vec<_> = jobs
            .into_iter()
            .enumerate()
            .map(|(index, job)| {
                let semaphore = Arc::clone(&semaphore);
                let task = Arc::clone(&task);

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return Err(SyncError::from(
                                ConcurrencyError::PermitAcquisitionFailed(e.to_string()),
                            ));
                        }
                    };
                    task(index, job).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.map_err(SyncError::from).and_then(|outcome| outcome))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(WorkerPool::new(0).is_err());
        assert_eq!(WorkerPool::new(3).unwrap().workers(), 3);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        let outcomes = pool
            .run((0..8).collect::<Vec<u32>>(), move |_, job| {
                let running = Arc::clone(&r);
                let peak = Arc::clone(&p);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(job * 2)
                }
            })
            .await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
        let values: Vec<u32> = outcomes.into_iter().map(|o| o.unwrap()).collect();
        assert_eq!(values, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[tokio::test]
    async fn test_failures_do_not_cancel_batch() {
        let pool = WorkerPool::new(3).unwrap();
        let outcomes = pool
            .run(vec![1, 2, 3, 4], |_, job| async move {
                if job == 2 {
                    Err(SyncError::Image("broken".to_string()))
                } else {
                    Ok(job)
                }
            })
            .await;

        assert_eq!(outcomes.len(), 4);
        assert!(outcomes[1].is_err());
        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 3);
    }

    #[tokio::test]
    async fn test_panicking_job_becomes_failure() {
        let pool = WorkerPool::new(2).unwrap();
        let outcomes = pool
            .run(vec![true, false], |_, explode| async move {
                if explode {
                    panic!("job exploded");
                }
                Ok(())
            })
            .await;

        assert!(matches!(outcomes[0], Err(SyncError::Worker(_))));
        assert!(outcomes[1].is_ok());
    }
}
