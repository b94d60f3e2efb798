//! Serial worker queue.
//!
//! Every pump iteration, finalize and cancellation of one export attempt
//! runs on the same dedicated thread, so none of them ever overlap.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, ThreadId};

use clipexport_common::error::{ExportError, ExportResult, MediaError};
use crossbeam_channel::{unbounded, Sender};

use crate::hook::panic_message;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a dedicated worker thread fed by an unbounded channel.
///
/// The thread exits once every clone of the sender is gone and the
/// remaining jobs have run.
#[derive(Debug)]
pub struct WorkerQueue {
    name: String,
    tx: Sender<Job>,
    thread_id: ThreadId,
}

impl WorkerQueue {
    pub fn spawn(name: impl Into<String>) -> ExportResult<Self> {
        let name = name.into();
        let (tx, rx) = unbounded::<Job>();
        let thread_name = name.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for job in rx.iter() {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        tracing::error!(
                            queue = %thread_name,
                            panic = %panic_message(payload.as_ref()),
                            "Worker job panicked"
                        );
                    }
                }
                tracing::debug!(queue = %thread_name, "Worker queue drained");
            })
            .map_err(|e| ExportError::initialization("worker queue", MediaError::from(e)))?;

        Ok(Self {
            name,
            tx,
            thread_id: handle.thread().id(),
        })
    }

    /// Queue `job` behind everything already posted. Returns `false` if the
    /// worker is gone.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(job)).is_ok()
    }

    /// Whether the caller is running on this queue's thread.
    pub fn is_worker_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_jobs_run_in_order_on_one_thread() {
        let queue = WorkerQueue::spawn("test-queue").unwrap();
        let (tx, rx) = crossbeam_channel::unbounded();
        for i in 0..16 {
            let tx = tx.clone();
            queue.post(move || {
                tx.send((i, thread::current().name().map(str::to_string)))
                    .unwrap();
            });
        }
        let seen: Vec<_> = (0..16)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(
            seen.iter().map(|(i, _)| *i).collect::<Vec<_>>(),
            (0..16).collect::<Vec<_>>()
        );
        assert!(seen
            .iter()
            .all(|(_, name)| name.as_deref() == Some("test-queue")));
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let queue = WorkerQueue::spawn("panic-queue").unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        queue.post(|| panic!("job exploded"));
        let (tx, rx) = crossbeam_channel::bounded(1);
        let c = Arc::clone(&counter);
        queue.post(move || {
            c.fetch_add(1, Ordering::SeqCst);
            tx.send(()).unwrap();
        });
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_worker_thread_detection() {
        let queue = Arc::new(WorkerQueue::spawn("detect-queue").unwrap());
        assert!(!queue.is_worker_thread());
        let (tx, rx) = crossbeam_channel::bounded(1);
        let q = Arc::clone(&queue);
        queue.post(move || tx.send(q.is_worker_thread()).unwrap());
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }
}
