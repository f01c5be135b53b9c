//! A small thread pool with a LIFO job queue.
//!
//! Grounded on `tpool.c`, whose `tpool_add_work` inserts new work at the
//! *front* of the queue (a change the original dates to 2022-04-08) so a
//! freshly submitted job — almost always triggered by the user just moving
//! the cursor — preempts whatever background refresh jobs are still
//! queued. The result side follows the teacher's `app/fs_runtime.rs`
//! pattern instead: a worker thread just calls `.send()` on a cloned
//! `tokio::sync::mpsc::UnboundedSender`, no async runtime needed on the
//! worker side at all.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    queue: Mutex<VecDeque<Job>>,
    cond: Condvar,
    shutdown: AtomicBool,
}

pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });

        let handles = (0..num_threads.max(1))
            .map(|i| {
                let shared = shared.clone();
                std::thread::Builder::new()
                    .name(format!("dir-engine-worker-{i}"))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self { shared, handles }
    }

    /// Enqueue `job` to run next (LIFO: ahead of anything already queued).
    pub fn submit(&self, job: Job) {
        let mut queue = self.shared.queue.lock();
        queue.push_front(job);
        self.shared.cond.notify_one();
    }

    pub fn queued_len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn shutdown(mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.cond.notify_all();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let job = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if shared.shutdown.load(Ordering::SeqCst) {
                    break None;
                }
                shared.cond.wait(&mut queue);
            }
        };
        match job {
            Some(job) => job(),
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn lifo_runs_newest_submission_first() {
        let pool = WorkerPool::new(1);
        let (tx, rx) = mpsc::channel();

        // Block the single worker so both jobs are queued before either runs.
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        pool.submit(Box::new(move || {
            let _ = gate_rx.recv();
        }));
        std::thread::sleep(std::time::Duration::from_millis(20));

        let tx1 = tx.clone();
        pool.submit(Box::new(move || tx1.send(1).unwrap()));
        let tx2 = tx.clone();
        pool.submit(Box::new(move || tx2.send(2).unwrap()));

        gate_tx.send(()).unwrap();

        assert_eq!(rx.recv().unwrap(), 2);
        assert_eq!(rx.recv().unwrap(), 1);
        pool.shutdown();
    }

    #[test]
    fn all_jobs_eventually_run() {
        let pool = WorkerPool::new(4);
        let (tx, rx) = mpsc::channel();
        for i in 0..20 {
            let tx = tx.clone();
            pool.submit(Box::new(move || tx.send(i).unwrap()));
        }
        drop(tx);
        let mut got: Vec<i32> = rx.iter().collect();
        got.sort_unstable();
        assert_eq!(got, (0..20).collect::<Vec<_>>());
        pool.shutdown();
    }
}
