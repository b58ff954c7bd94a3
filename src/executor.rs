//! Fixed-size worker pool with a bounded, blocking work queue.
//!
//! Producers enqueue closures; when the queue is full the producing thread
//! blocks until a worker frees a slot, which is the pipeline's only
//! backpressure mechanism. Tasks are never cancelled: shutdown drains the
//! queue, then joins the workers with a bounded wait.

use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pending jobs allowed before `execute` blocks the producer.
const QUEUE_SIZE: usize = 1000;

/// A fixed pool of worker threads fed from a bounded queue.
pub struct WorkerPool {
    sender: Option<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
    termination_wait: Duration,
}

impl WorkerPool {
    /// A pool with one worker per available hardware core.
    pub fn with_default_workers(termination_wait_millis: u64) -> WorkerPool {
        let threads = thread::available_parallelism().map_or(1, |n| n.get());
        WorkerPool::new(threads, termination_wait_millis)
    }

    pub fn new(threads: usize, termination_wait_millis: u64) -> WorkerPool {
        let (sender, receiver) = mpsc::sync_channel::<Job>(QUEUE_SIZE);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..threads.max(1))
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("geodex-worker-{i}"))
                    .spawn(move || worker_loop(&receiver))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkerPool {
            sender: Some(sender),
            workers,
            termination_wait: Duration::from_millis(termination_wait_millis),
        }
    }

    /// Enqueues a job, blocking while the queue is full.
    pub fn execute<F: FnOnce() + Send + 'static>(&self, job: F) {
        if let Some(sender) = &self.sender {
            // send only fails when every worker has died; jobs never panic
            // through the worker loop, so treat it as unreachable.
            sender
                .send(Box::new(job))
                .expect("worker pool has no live workers");
        }
    }

    /// Signals end-of-input, waits for the queue to drain and joins the
    /// workers. Fails if the pool does not terminate within the configured
    /// wait; the abandoned workers keep the process alive until exit.
    pub fn join(mut self) -> Result<()> {
        self.sender.take();

        let deadline = Instant::now() + self.termination_wait;
        while self.workers.iter().any(|w| !w.is_finished()) {
            if Instant::now() >= deadline {
                return Err(Error::ExecutorTimeout(
                    self.termination_wait.as_millis() as u64
                ));
            }
            thread::sleep(Duration::from_millis(10));
        }

        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        Ok(())
    }
}

fn worker_loop(receiver: &Mutex<Receiver<Job>>) {
    loop {
        let job = {
            let guard = receiver.lock();
            guard.recv()
        };
        match job {
            Ok(job) => job(),
            // The sender is gone and the queue is drained.
            Err(_) => break,
        }
    }
}
