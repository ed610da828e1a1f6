//! Fixed-size worker pool with FIFO dispatch.
//!
//! Workers are plain threads fed by a crossbeam channel. The queue is
//! unbounded by default; with a configured capacity, submission fails with
//! `QueueFull` when saturated. Dropping the pool closes the queue and joins
//! every worker.

use std::thread::JoinHandle;

use veridown_types::{Result, VerificationError};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<crossbeam_channel::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    capacity: Option<usize>,
}

impl WorkerPool {
    /// Spawn `size` workers. `queue_capacity` bounds the job queue; `None`
    /// leaves it unbounded.
    pub fn new(size: usize, queue_capacity: Option<usize>) -> Self {
        let (sender, receiver) = match queue_capacity {
            Some(capacity) => crossbeam_channel::bounded::<Job>(capacity),
            None => crossbeam_channel::unbounded::<Job>(),
        };

        let workers = (0..size.max(1))
            .map(|index| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("veridown-worker-{index}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                        }
                    })
                    .unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"))
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
            capacity: queue_capacity,
        }
    }

    /// Enqueue a job; FIFO per worker. Fails with `QueueFull` when a bounded
    /// queue is saturated.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        let Some(sender) = &self.sender else {
            return Err(VerificationError::Verification(
                "worker pool is shut down".to_string(),
            ));
        };
        match self.capacity {
            Some(capacity) => sender.try_send(Box::new(job)).map_err(|e| match e {
                crossbeam_channel::TrySendError::Full(_) => {
                    VerificationError::QueueFull { capacity }
                }
                crossbeam_channel::TrySendError::Disconnected(_) => {
                    VerificationError::Verification("worker pool is shut down".to_string())
                }
            }),
            None => sender.send(Box::new(job)).map_err(|_| {
                VerificationError::Verification("worker pool is shut down".to_string())
            }),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // closing the channel lets every worker drain and exit
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
