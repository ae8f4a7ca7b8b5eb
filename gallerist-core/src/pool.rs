//! Bounded-concurrency job execution shared by every crawl.

use std::{future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::sync::{Semaphore, mpsc};
use tracing::error;

/// A job that panicked instead of producing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPanicked;

/// Output of one job, tagged with the position of its input.
#[derive(Debug)]
pub struct Completed<T> {
    pub index: usize,
    pub outcome: Result<T, JobPanicked>,
}

/// Runs jobs with at most `width` in flight.
///
/// Clones share the same permits, so the bound holds across every crawl
/// using the pool.
#[derive(Debug, Clone)]
pub struct TaskPool {
    permits: Arc<Semaphore>,
    width: usize,
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

impl TaskPool {
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            permits: Arc::new(Semaphore::new(width)),
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Permits not currently held by a running job.
    pub fn idle(&self) -> usize {
        self.permits.available_permits()
    }

    /// Queue `inputs` and run `job` on each.
    ///
    /// Results arrive in completion order. The receiver yields `None` once
    /// every job has finished. Jobs keep running if the receiver is dropped.
    pub fn run<I, T, F, Fut>(
        &self,
        inputs: Vec<I>,
        job: F,
    ) -> mpsc::UnboundedReceiver<Completed<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let permits = Arc::clone(&self.permits);
        let job = Arc::new(job);

        tokio::spawn(async move {
            for (index, input) in inputs.into_iter().enumerate() {
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await
                else {
                    error!("task pool closed with {index} jobs dispatched");
                    break;
                };
                let tx = tx.clone();
                let job = Arc::clone(&job);

                tokio::spawn(async move {
                    let outcome = AssertUnwindSafe(job(input))
                        .catch_unwind()
                        .await
                        .map_err(|_| JobPanicked);
                    drop(permit);
                    let _ = tx.send(Completed { index, outcome });
                });
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    #[tokio::test]
    async fn never_exceeds_width() {
        let pool = TaskPool::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (job_in_flight, job_peak) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let mut rx = pool.run((0..20).collect(), move |n: u64| {
            let in_flight = Arc::clone(&job_in_flight);
            let peak = Arc::clone(&job_peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2 + n % 3)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n * 2
            }
        });

        let mut seen = Vec::new();
        while let Some(done) = rx.recv().await {
            assert_eq!(done.outcome, Ok(done.index as u64 * 2));
            seen.push(done.index);
        }
        seen.sort_unstable();

        assert_eq!(seen, (0..20).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.idle(), 3);
    }

    #[tokio::test]
    async fn empty_input_closes_immediately() {
        let pool = TaskPool::new(2);
        let mut rx = pool.run(Vec::<u8>::new(), |n| async move { n });
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn panicking_job_is_reported() {
        let pool = TaskPool::new(1);
        let mut rx = pool.run(vec![1u8, 2, 3], |n| async move {
            if n == 2 {
                panic!("probe exploded");
            }
            n
        });

        let mut outcomes = Vec::new();
        while let Some(done) = rx.recv().await {
            outcomes.push((done.index, done.outcome));
        }
        outcomes.sort_by_key(|(index, _)| *index);

        assert_eq!(
            outcomes,
            vec![(0, Ok(1)), (1, Err(JobPanicked)), (2, Ok(3))]
        );
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn zero_width_is_clamped() {
        assert_eq!(TaskPool::new(0).width(), 1);
    }
}
