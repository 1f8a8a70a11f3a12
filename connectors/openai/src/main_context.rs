//! The single context on which task events are delivered
//!
//! Transport callbacks run on runtime worker threads. Everything observers
//! see is posted here and runs wherever the host drains the queue.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::trace;

/// Work scheduled onto the main context
pub type MainJob = Box<dyn FnOnce() + Send + 'static>;

/// Something that can run jobs on the host's main thread
pub trait MainContext: Send + Sync {
    /// Schedule `job`. Jobs run in the order they were posted.
    fn post(&self, job: MainJob);
}

/// FIFO queue drained explicitly by the host loop
#[derive(Default)]
pub struct MainQueue {
    pending: Mutex<VecDeque<MainJob>>,
}

impl MainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every job posted so far; returns how many ran.
    ///
    /// Jobs posted while pumping wait for the next call.
    pub fn pump(&self) -> usize {
        let jobs: Vec<MainJob> = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };

        let count = jobs.len();
        for job in jobs {
            job();
        }

        if count > 0 {
            trace!("Ran {} main-context jobs", count);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MainContext for MainQueue {
    fn post(&self, job: MainJob) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(job);
    }
}

impl std::fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainQueue").field("pending", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_pump_runs_in_post_order() {
        let queue = MainQueue::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            queue.post(Box::new(move || seen.lock().unwrap().push(i)));
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pump(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert!(queue.is_empty());
        assert_eq!(queue.pump(), 0);
    }

    #[test]
    fn test_jobs_posted_while_pumping_wait() {
        let queue = Arc::new(MainQueue::new());
        let inner = queue.clone();
        queue.post(Box::new(move || inner.post(Box::new(|| {}))));

        assert_eq!(queue.pump(), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pump(), 1);
    }

    #[test]
    fn test_post_from_other_thread() {
        let queue = Arc::new(MainQueue::new());
        let poster = queue.clone();
        std::thread::spawn(move || poster.post(Box::new(|| {})))
            .join()
            .unwrap();
        assert_eq!(queue.pump(), 1);
    }
}
