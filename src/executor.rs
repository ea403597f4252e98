//! Executor / thread model (C10): three interchangeable strategies for
//! dispatching one job per partition across `T` workers.
//!
//! All three give the same observable contract (spec.md §5): every
//! partition's job has completed before the dispatch call returns, so a
//! caller sees a single atomic before→after transition of whatever output
//! buffer the jobs wrote into.

#![cfg(feature = "std")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

/// A per-partition job: takes the partition (worker) index.
pub type Job = Arc<dyn Fn(usize) + Send + Sync>;

/// Spawn one OS thread per partition, run the job, join all before
/// returning. Lowest implementation complexity, highest per-call overhead
/// — the model a caller would pick for a one-off or rarely-repeated call.
pub fn dispatch_per_call<F>(num_partitions: usize, job: F)
where
    F: Fn(usize) + Sync,
{
    thread::scope(|scope| {
        for p in 0..num_partitions {
            scope.spawn(|| job(p));
        }
    });
}

/// A persistent pool of `T` workers synchronized by a start and an end
/// barrier. Each worker loops: wait on start, run the current job (or
/// notice shutdown), wait on end. Amortizes thread-spawn cost across many
/// calls at the price of keeping `T` threads alive for the pool's
/// lifetime.
pub struct ThreadPool {
    thread_count: usize,
    start_barrier: Arc<Barrier>,
    end_barrier: Arc<Barrier>,
    done: Arc<AtomicBool>,
    job: Arc<Mutex<Option<Job>>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl ThreadPool {
    /// Spawn `thread_count` workers (minimum 1).
    pub fn new(thread_count: usize) -> Self {
        let thread_count = thread_count.max(1);
        let start_barrier = Arc::new(Barrier::new(thread_count + 1));
        let end_barrier = Arc::new(Barrier::new(thread_count + 1));
        let done = Arc::new(AtomicBool::new(false));
        let job: Arc<Mutex<Option<Job>>> = Arc::new(Mutex::new(None));

        let workers = (0..thread_count)
            .map(|worker_id| {
                let start_barrier = Arc::clone(&start_barrier);
                let end_barrier = Arc::clone(&end_barrier);
                let done = Arc::clone(&done);
                let job = Arc::clone(&job);
                thread::spawn(move || loop {
                    start_barrier.wait();
                    if done.load(Ordering::Acquire) {
                        break;
                    }
                    let current = job.lock().expect("thread pool job lock poisoned").clone();
                    if let Some(f) = current {
                        f(worker_id);
                    }
                    end_barrier.wait();
                })
            })
            .collect();

        Self {
            thread_count,
            start_barrier,
            end_barrier,
            done,
            job,
            workers,
        }
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Run `job` on every worker and block until all have finished.
    ///
    /// `job` need not be `'static`: the end barrier guarantees every
    /// worker has returned from `job` before this call does, so it cannot
    /// be invoked after `dispatch` returns even though workers keep
    /// running past the end of this stack frame.
    pub fn dispatch<'a, F>(&'a self, job: F)
    where
        F: Fn(usize) + Send + Sync + 'a,
    {
        let scoped: Arc<dyn Fn(usize) + Send + Sync + 'a> = Arc::new(job);
        // SAFETY: the end barrier below blocks until every worker has
        // finished calling the job for this dispatch, and the slot is
        // cleared before we return, so no worker observes `scoped` past
        // the lifetime `'a` actually borrows.
        let scoped: Arc<dyn Fn(usize) + Send + Sync + 'static> = unsafe { core::mem::transmute(scoped) };
        *self.job.lock().expect("thread pool job lock poisoned") = Some(scoped);
        self.start_barrier.wait();
        self.end_barrier.wait();
        *self.job.lock().expect("thread pool job lock poisoned") = None;
    }

    /// Set the shutdown flag, release the start barrier so every worker
    /// observes it, and join all workers.
    pub fn shutdown(mut self) {
        log::debug!("shutting down thread pool ({} workers)", self.thread_count);
        self.done.store(true, Ordering::Release);
        self.start_barrier.wait();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if !self.done.swap(true, Ordering::AcqRel) {
            self.start_barrier.wait();
            for worker in self.workers.drain(..) {
                let _ = worker.join();
            }
        }
    }
}

/// Task-parallel fork-join dispatch via a data-parallel scheduler.
/// Semantics match the barrier model: this call blocks until every
/// partition's job has run.
#[cfg(feature = "parallel")]
pub fn dispatch_fork_join<F>(num_partitions: usize, job: F)
where
    F: Fn(usize) + Sync,
{
    use rayon::prelude::*;
    (0..num_partitions).into_par_iter().for_each(|p| job(p));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn per_call_threads_run_every_partition() {
        let counter = AtomicUsize::new(0);
        dispatch_per_call(4, |_p| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn thread_pool_dispatches_and_can_be_reused() {
        let pool = ThreadPool::new(3);
        let results: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

        let r = Arc::clone(&results);
        pool.dispatch(move |worker_id| {
            r.lock().unwrap().push(worker_id);
        });

        let mut collected = results.lock().unwrap().clone();
        collected.sort_unstable();
        assert_eq!(collected, vec![0, 1, 2]);

        // Dispatch again to confirm the pool is reusable.
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        pool.dispatch(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        pool.shutdown();
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn fork_join_runs_every_partition() {
        let counter = AtomicUsize::new(0);
        dispatch_fork_join(5, |_p| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
