// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The worker pool.  Workers are stateless and interchangeable: each
//! one sits on a shared injection channel, takes whatever chunk comes
//! off it next, runs the submitted work function over the chunk's
//! coordinates, and sends the answer back on the submission's own
//! result channel.  Nothing here assumes anything about completion
//! order; the gather restores order by chunk index afterwards.
//!
//! The same submit/gather contract would hold for workers on remote
//! machines — the transport would change, the ordering and failure
//! semantics would not.

use std::cmp;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use chunk::Chunk;
use errors::RenderError;

/// How often a blocked gather wakes up to re-check its deadline and
/// its cancellation predicate.
const GATHER_POLL: Duration = Duration::from_millis(10);

/// The single function shipped to every worker: evaluate every
/// coordinate of a chunk, in order, producing one iteration count per
/// coordinate.  A returned `Err` is reported as a worker fault for
/// that chunk.  Wrapped in an `Arc` so one submission can share it
/// across all its chunks.
pub type WorkFn = Arc<dyn Fn(&Chunk) -> Result<Vec<u64>, String> + Send + Sync>;

/// One completed chunk: the iteration counts for its coordinates, in
/// chunk order, plus the identity needed to put them back in place.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkResult {
    /// Index of the chunk within its render pass.
    pub index: usize,
    /// Offset of the chunk's first value in the flattened matrix.
    pub offset: usize,
    /// One iteration count per coordinate, in chunk order.
    pub values: Vec<u64>,
}

/// A unit of work on the injection channel: the chunk, the function
/// to run over it, and where to send the answer.
struct Job {
    chunk: Chunk,
    work: WorkFn,
    results: Sender<Result<ChunkResult, RenderError>>,
}

/// Handle to the outstanding chunks of one submission.  Consumed by
/// the gather.
pub struct PendingGather {
    expected: usize,
    results: Receiver<Result<ChunkResult, RenderError>>,
}

impl PendingGather {
    /// How many chunk results this submission is waiting for.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Blocks until every chunk has resolved, then returns the
    /// results sorted by chunk index.  Fails with `Worker` if any
    /// worker reported a fault, `Timeout` if the deadline passes
    /// first, or `Incomplete` if the result channel closed with
    /// results still missing (a worker disappeared without
    /// reporting).
    pub fn gather(self, timeout: Duration) -> Result<Vec<ChunkResult>, RenderError> {
        match self.gather_unless(timeout, || false) {
            Some(outcome) => outcome,
            // Unreachable: the predicate above never fires.
            None => Err(RenderError::Incomplete {
                missing: 0,
                expected: 0,
            }),
        }
    }

    /// Like `gather`, but re-checks `superseded` while waiting and
    /// returns `None` the moment it reports true, abandoning whatever
    /// results have arrived.  This is the cooperative-cancellation
    /// hook: workers keep grinding on chunks already dispatched, and
    /// their answers fall on the floor when this handle drops.
    pub fn gather_unless<F>(
        self,
        timeout: Duration,
        mut superseded: F,
    ) -> Option<Result<Vec<ChunkResult>, RenderError>>
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;
        let mut slots: Vec<Option<ChunkResult>> = (0..self.expected).map(|_| None).collect();
        let mut received = 0;

        while received < self.expected {
            if superseded() {
                trace!("gather abandoned with {} of {} results", received, self.expected);
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return Some(Err(RenderError::Timeout(timeout)));
            }
            let wait = cmp::min(deadline - now, GATHER_POLL);
            match self.results.recv_timeout(wait) {
                Ok(Ok(result)) => {
                    if result.index >= self.expected {
                        return Some(Err(RenderError::Worker {
                            index: result.index,
                            message: format!(
                                "chunk index out of range (expected at most {})",
                                self.expected - 1
                            ),
                        }));
                    }
                    let slot = &mut slots[result.index];
                    if slot.is_none() {
                        received += 1;
                    }
                    *slot = Some(result);
                }
                Ok(Err(fault)) => return Some(Err(fault)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Some(Err(RenderError::Incomplete {
                        missing: self.expected - received,
                        expected: self.expected,
                    }));
                }
            }
        }

        Some(Ok(slots.into_iter().flatten().collect()))
    }
}

/// A fixed roster of stateless worker threads fed from one shared
/// channel.  Created once at startup and reused across render
/// passes; workers carry no per-pass state, so no per-pass
/// acquisition is needed.
pub struct WorkerPool {
    injector: Sender<Job>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` threads.  Panics if asked for zero.
    pub fn new(workers: usize) -> WorkerPool {
        assert!(workers > 0, "a worker pool needs at least one worker");
        let (injector, jobs) = channel::unbounded::<Job>();
        let handles = (0..workers)
            .map(|id| {
                let jobs = jobs.clone();
                thread::Builder::new()
                    .name(format!("mandelpool-worker-{}", id))
                    .spawn(move || worker_loop(id, jobs))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        debug!("worker pool started with {} workers", workers);
        WorkerPool { injector, handles }
    }

    /// Number of worker threads in the roster.
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Fire-and-forget submission: every chunk goes onto the shared
    /// injection channel tagged with this submission's result
    /// channel.  Any worker may pick up any chunk, in any order.
    pub fn submit(&self, chunks: Vec<Chunk>, work: WorkFn) -> PendingGather {
        let (tx, rx) = channel::unbounded();
        let expected = chunks.len();
        for chunk in chunks {
            let job = Job {
                chunk,
                work: work.clone(),
                results: tx.clone(),
            };
            if self.injector.send(job).is_err() {
                // Every worker has exited; the dropped job's result
                // channel clone makes the gather report the gap.
                warn!("no live workers; chunk dropped at submission");
            }
        }
        PendingGather {
            expected,
            results: rx,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the injector lets each worker drain it and exit.
        let (closed, _) = channel::bounded(0);
        drop(mem::replace(&mut self.injector, closed));
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// The body of one worker thread: take a job, run the work function
/// over the chunk, report the answer.  A panic inside the work
/// function is caught and reported as a fault so the thread stays in
/// the roster.  Send failures mean the gather hung up first — a
/// superseded pass — and the answer is simply discarded.
fn worker_loop(id: usize, jobs: Receiver<Job>) {
    while let Ok(job) = jobs.recv() {
        let index = job.chunk.index;
        let offset = job.chunk.offset;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| (job.work)(&job.chunk)));
        let report = match outcome {
            Ok(Ok(values)) => Ok(ChunkResult {
                index,
                offset,
                values,
            }),
            Ok(Err(message)) => Err(RenderError::Worker { index, message }),
            Err(_) => Err(RenderError::Worker {
                index,
                message: "worker panicked".to_string(),
            }),
        };
        if job.results.send(report).is_err() {
            trace!("worker {}: result for chunk {} discarded", id, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunk::partition;
    use grid::{build_grid, Viewport};
    use kernel::escape;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn chunks(width: u32, height: u32) -> Vec<Chunk> {
        let vp = Viewport::new(-2.0, 1.0, -1.0, 1.0, width, height).unwrap();
        partition(&build_grid(&vp), 1)
    }

    fn kernel_work(max_iterations: u64) -> WorkFn {
        Arc::new(move |chunk: &Chunk| {
            Ok(chunk.points.iter().map(|&c| escape(c, max_iterations)).collect())
        })
    }

    #[test]
    fn gather_returns_results_in_chunk_order() {
        let pool = WorkerPool::new(4);
        let work = chunks(16, 12);
        let pending = pool.submit(work.clone(), kernel_work(100));
        let results = pending.gather(Duration::from_secs(10)).unwrap();
        assert_eq!(results.len(), work.len());
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert_eq!(result.offset, work[i].offset);
            assert_eq!(result.values.len(), work[i].len());
        }
    }

    #[test]
    fn unordered_completion_still_gathers_in_order() {
        // Earlier chunks sleep longer, so completion order is roughly
        // the reverse of submission order.
        let pool = WorkerPool::new(4);
        let work = chunks(4, 8);
        let total = work.len() as u64;
        let slow: WorkFn = Arc::new(move |chunk: &Chunk| {
            let delay = (total - chunk.index as u64) * 5;
            thread::sleep(Duration::from_millis(delay));
            Ok(vec![chunk.index as u64; chunk.len()])
        });
        let results = pool
            .submit(work, slow)
            .gather(Duration::from_secs(10))
            .unwrap();
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert!(result.values.iter().all(|&v| v == i as u64));
        }
    }

    #[test]
    fn a_worker_fault_surfaces_as_an_error() {
        let pool = WorkerPool::new(2);
        let failing: WorkFn = Arc::new(|chunk: &Chunk| {
            if chunk.index == 3 {
                Err("injected fault".to_string())
            } else {
                Ok(vec![0; chunk.len()])
            }
        });
        let outcome = pool.submit(chunks(4, 6), failing).gather(Duration::from_secs(10));
        match outcome {
            Err(RenderError::Worker { index, message }) => {
                assert_eq!(index, 3);
                assert_eq!(message, "injected fault");
            }
            other => panic!("expected a worker fault, got {:?}", other),
        }
    }

    #[test]
    fn a_panicking_work_function_is_reported_not_fatal() {
        let pool = WorkerPool::new(2);
        let panicking: WorkFn = Arc::new(|chunk: &Chunk| {
            if chunk.index == 0 {
                panic!("orbit decayed");
            }
            Ok(vec![0; chunk.len()])
        });
        let outcome = pool.submit(chunks(4, 3), panicking).gather(Duration::from_secs(10));
        match outcome {
            Err(RenderError::Worker { message, .. }) => {
                assert_eq!(message, "worker panicked");
            }
            other => panic!("expected a worker fault, got {:?}", other),
        }
        // The thread that caught the panic is still serving jobs.
        let results = pool
            .submit(chunks(4, 3), kernel_work(10))
            .gather(Duration::from_secs(10))
            .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn gather_times_out_instead_of_blocking_forever() {
        let pool = WorkerPool::new(1);
        let stall: WorkFn = Arc::new(|chunk: &Chunk| {
            thread::sleep(Duration::from_millis(300));
            Ok(vec![0; chunk.len()])
        });
        let outcome = pool
            .submit(chunks(2, 2), stall)
            .gather(Duration::from_millis(50));
        match outcome {
            Err(RenderError::Timeout(_)) => {}
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[test]
    fn gather_unless_abandons_when_superseded() {
        let pool = WorkerPool::new(1);
        let stall: WorkFn = Arc::new(|chunk: &Chunk| {
            thread::sleep(Duration::from_millis(100));
            Ok(vec![0; chunk.len()])
        });
        let calls = AtomicUsize::new(0);
        let outcome = pool
            .submit(chunks(2, 4), stall)
            .gather_unless(Duration::from_secs(10), || {
                calls.fetch_add(1, Ordering::SeqCst) >= 2
            });
        assert!(outcome.is_none());
    }

    #[test]
    fn pool_survives_across_submissions() {
        let pool = WorkerPool::new(3);
        for _ in 0..4 {
            let results = pool
                .submit(chunks(8, 4), kernel_work(50))
                .gather(Duration::from_secs(10))
                .unwrap();
            assert_eq!(results.len(), 4);
        }
        assert_eq!(pool.worker_count(), 3);
    }
}
