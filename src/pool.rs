//! Fixed worker-thread pool with condvar-based go/quit signaling, modeled
//! on a pthread worker pool that is spawned once per command and reused for
//! every chunk of the shared work cursor rather than recreated.
//!
//! `T = 1` bypasses the pool entirely: the caller runs the same per-worker
//! closure directly, so no mutex is ever locked on the single-thread path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Work {
    Wait,
    Go,
    Quit,
}

struct Shared {
    work: Mutex<Work>,
    cond: Condvar,
}

struct Worker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

/// A pool of `thread_count` workers, each running `body(t)` once per `run()`
/// call where `t` is the worker's 0-based index.
pub struct WorkerPool {
    workers: Vec<Worker>,
}

impl WorkerPool {
    pub fn new<F>(thread_count: usize, body: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        let workers = (0..thread_count)
            .map(|t| {
                let shared = Arc::new(Shared {
                    work: Mutex::new(Work::Wait),
                    cond: Condvar::new(),
                });
                let worker_shared = Arc::clone(&shared);
                let body = Arc::clone(&body);
                let handle = std::thread::spawn(move || {
                    let mut guard = worker_shared.work.lock().unwrap();
                    loop {
                        while *guard == Work::Wait {
                            guard = worker_shared.cond.wait(guard).unwrap();
                        }
                        match *guard {
                            Work::Go => {
                                drop(guard);
                                body(t);
                                guard = worker_shared.work.lock().unwrap();
                                *guard = Work::Wait;
                                worker_shared.cond.notify_all();
                            }
                            Work::Quit => break,
                            Work::Wait => unreachable!(),
                        }
                    }
                });
                Worker {
                    shared,
                    handle: Some(handle),
                }
            })
            .collect();
        Self { workers }
    }

    /// Wake every worker, run one round of `body`, and block until all of
    /// them have returned to `Wait`.
    pub fn run(&self) {
        for worker in &self.workers {
            let mut guard = worker.shared.work.lock().unwrap();
            *guard = Work::Go;
            worker.shared.cond.notify_all();
        }
        for worker in &self.workers {
            let mut guard = worker.shared.work.lock().unwrap();
            while *guard == Work::Go {
                guard = worker.shared.cond.wait(guard).unwrap();
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            let mut guard = worker.shared.work.lock().unwrap();
            *guard = Work::Quit;
            worker.shared.cond.notify_all();
        }
        for worker in &mut self.workers.iter_mut() {
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

/// A cursor over `0..len` shared by all workers, handed out in chunks so
/// that each worker claims a contiguous block of indices under one lock
/// acquisition rather than contending per-item.
///
/// `completed` is the one piece of shared mutable state workers touch on
/// the hot path: each worker bumps it by a chunk's length once that chunk
/// is done. It is never used for control flow, only observed by the
/// coordinator thread for progress narration.
pub struct ChunkCursor {
    next: Mutex<usize>,
    len: usize,
    chunk_size: usize,
    completed: AtomicU64,
}

impl ChunkCursor {
    pub fn new(len: usize, chunk_size: usize) -> Self {
        Self {
            next: Mutex::new(0),
            len,
            chunk_size,
            completed: AtomicU64::new(0),
        }
    }

    /// Claim the next chunk, returning its `[start, end)` range, or `None`
    /// once the cursor is exhausted.
    pub fn claim(&self) -> Option<std::ops::Range<usize>> {
        let mut next = self.next.lock().unwrap();
        if *next >= self.len {
            return None;
        }
        let start = *next;
        let end = (start + self.chunk_size).min(self.len);
        *next = end;
        Some(start..end)
    }

    /// Record that a worker finished processing a chunk of `n` indices.
    pub fn advance(&self, n: usize) {
        self.completed.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Runs `pool` to completion, logging `cursor`'s progress from this
/// (coordinator) thread at chunk granularity via `tracing::info!`. Workers
/// only ever bump the counter; narration is the coordinator's job alone.
pub fn run_with_progress(pool: &WorkerPool, cursor: &ChunkCursor, label: &str) {
    let total = cursor.len();
    if total == 0 {
        pool.run();
        return;
    }
    let stop = AtomicBool::new(false);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            while !stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(250));
                let done = cursor.completed().min(total as u64);
                tracing::info!("{label}: {done}/{total} sequences processed");
            }
        });
        pool.run();
        stop.store(true, Ordering::Relaxed);
    });
    tracing::info!("{label}: {}/{total} sequences processed", cursor.completed());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use pretty_assertions::assert_eq;

    #[test]
    fn all_workers_run_each_round() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let pool = WorkerPool::new(4, move |_t| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        pool.run();
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        pool.run();
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn chunk_cursor_covers_every_index_exactly_once() {
        let cursor = ChunkCursor::new(23, 5);
        let mut seen = vec![false; 23];
        while let Some(range) = cursor.claim() {
            for i in range {
                assert!(!seen[i], "index {i} claimed twice");
                seen[i] = true;
            }
        }
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn advance_accumulates_up_to_the_full_length() {
        let cursor = ChunkCursor::new(23, 5);
        while let Some(range) = cursor.claim() {
            cursor.advance(range.len());
        }
        assert_eq!(cursor.completed(), 23);
    }

    #[test]
    fn run_with_progress_still_runs_every_worker() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cursor = Arc::new(ChunkCursor::new(8, 2));
        let c = Arc::clone(&counter);
        let cc = Arc::clone(&cursor);
        let pool = WorkerPool::new(2, move |_t| {
            while let Some(range) = cc.claim() {
                c.fetch_add(range.len(), Ordering::SeqCst);
                cc.advance(range.len());
            }
        });
        run_with_progress(&pool, &cursor, "test");
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert_eq!(cursor.completed(), 8);
    }

    #[test]
    fn single_thread_pool_runs_inline_work() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let pool = WorkerPool::new(1, move |_t| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        pool.run();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
