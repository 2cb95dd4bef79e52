// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Drives the pipeline end to end, once per viewport.  The
//! orchestrator owns the worker pool and an event queue that the
//! plotting surface pushes viewport changes onto.  At most one render
//! pass is current at a time; a newer event supersedes the pass in
//! flight, whose results are quietly discarded.  Supersession is the
//! normal course of rapid interaction, not an error, and it never
//! reaches the error channel.

extern crate num_cpus;

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use assemble::assemble;
use chunk::{partition, Chunk};
use color::{colorize, ColorRamp, Raster};
use errors::RenderError;
use grid::{build_grid, Viewport};
use kernel::escape;
use pool::{WorkFn, WorkerPool};

/// Static configuration for the orchestrator.  Set once at startup;
/// nothing here is runtime-mutable.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// The view rendered first, before any pan/zoom event arrives.
    pub initial_viewport: Viewport,
    /// Iteration bound for the escape kernel; doubles as the "did not
    /// escape" sentinel.
    pub max_iterations: u64,
    /// Chunk granularity, in grid rows per chunk.
    pub rows_per_chunk: usize,
    /// Number of worker threads in the pool.
    pub workers: usize,
    /// How long a gather may block before the pass fails.
    pub gather_timeout: Duration,
    /// The palette iteration counts are mapped through.
    pub ramp: ColorRamp,
}

impl RenderConfig {
    /// Defaults for everything but the initial viewport: a thousand
    /// iterations, one row per chunk, one worker per CPU, a thirty
    /// second gather deadline, and the standard ramp.
    pub fn new(initial_viewport: Viewport) -> RenderConfig {
        RenderConfig {
            initial_viewport,
            max_iterations: 1000,
            rows_per_chunk: 1,
            workers: num_cpus::get(),
            gather_timeout: Duration::from_secs(30),
            ramp: ColorRamp::default(),
        }
    }
}

/// The display-side collaborator.  Whatever presents frames on
/// screen implements this; the orchestrator calls it exactly once
/// per completed pass, and once per pass that failed even after its
/// retry.
pub trait RasterSink {
    /// A completed, non-superseded pass delivering its frame.
    fn raster_ready(&mut self, raster: Raster, viewport: &Viewport);

    /// A pass that failed twice.  The previous frame, if any, is
    /// still the right thing to display.
    fn render_failed(&mut self, viewport: &Viewport, error: &RenderError);
}

/// Where a render pass is in its life.  `Superseded` can be entered
/// from any state short of `Done`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PassState {
    /// Grid and chunks being built, synchronously.
    Building,
    /// Chunks handed to the worker pool.
    Dispatched,
    /// Blocked on the gather.
    Gathering,
    /// Matrix complete, raster delivered.
    Done,
    /// A newer viewport arrived; this pass's results are discarded.
    Superseded,
}

/// Cloneable handle the plotting surface uses to publish pan/zoom
/// events from any thread.  Validation happens here, synchronously,
/// so the queue only ever holds viewports worth rendering.
#[derive(Clone)]
pub struct ViewportEvents {
    tx: Sender<Viewport>,
}

impl ViewportEvents {
    /// Publishes a viewport change.  A malformed viewport is rejected
    /// here and now, and nothing is queued.
    pub fn viewport_changed(&self, viewport: Viewport) -> Result<(), RenderError> {
        viewport.validate()?;
        // Send only fails once the orchestrator is gone, at which
        // point there is nobody left to render for anyway.
        let _ = self.tx.send(viewport);
        Ok(())
    }
}

/// One render pass: a generation id, the viewport it serves, and
/// where it is in its lifecycle.
struct RenderPass {
    generation: u64,
    state: PassState,
}

impl RenderPass {
    fn new(generation: u64) -> RenderPass {
        debug!("pass {}: building", generation);
        RenderPass {
            generation,
            state: PassState::Building,
        }
    }

    fn advance(&mut self, next: PassState) {
        debug!("pass {}: {:?} -> {:?}", self.generation, self.state, next);
        self.state = next;
    }
}

/// How one attempt at a pass ended.
enum Outcome {
    Completed(Raster),
    Superseded,
    Failed(RenderError),
}

/// Reacts to viewport changes and drives the grid → chunks → workers
/// → gather → colorize pipeline for each one.  Owns the worker pool
/// for its whole life; workers are stateless and reused across
/// passes.
pub struct Orchestrator<S: RasterSink> {
    pool: WorkerPool,
    config: RenderConfig,
    events: Receiver<Viewport>,
    handle: ViewportEvents,
    sink: S,
    work: WorkFn,
    generation: u64,
}

impl<S: RasterSink> Orchestrator<S> {
    /// Builds the orchestrator, spawns its worker pool, and queues
    /// the configured initial viewport as the first event.  Fails if
    /// that viewport is malformed.
    pub fn new(config: RenderConfig, sink: S) -> Result<Orchestrator<S>, RenderError> {
        let (tx, rx) = channel::unbounded();
        let handle = ViewportEvents { tx };
        handle.viewport_changed(config.initial_viewport)?;
        let max_iterations = config.max_iterations;
        let work: WorkFn = Arc::new(move |chunk: &Chunk| {
            Ok(chunk
                .points
                .iter()
                .map(|&c| escape(c, max_iterations))
                .collect())
        });
        Ok(Orchestrator {
            pool: WorkerPool::new(config.workers),
            config,
            events: rx,
            handle,
            sink,
            work,
            generation: 0,
        })
    }

    /// A handle the plotting surface can keep (and clone across
    /// threads) to publish viewport changes.
    pub fn events(&self) -> ViewportEvents {
        self.handle.clone()
    }

    /// Synchronous inbound event: validates, then queues.  Identical
    /// to going through the `ViewportEvents` handle.
    pub fn on_viewport_change(&self, viewport: Viewport) -> Result<(), RenderError> {
        self.handle.viewport_changed(viewport)
    }

    /// The display collaborator, for callers that need it back.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Renders until the event queue is empty.  When several events
    /// are already queued, only the newest survives — the older ones
    /// are superseded before any work is dispatched.  An event that
    /// arrives while a pass is gathering supersedes that pass
    /// mid-flight.
    pub fn run_until_idle(&mut self) {
        while let Some(viewport) = self.next_event() {
            self.render(viewport);
        }
    }

    /// Drains the queue, keeping only the most recent event.
    fn next_event(&self) -> Option<Viewport> {
        let mut latest = None;
        loop {
            match self.events.try_recv() {
                Ok(viewport) => {
                    if latest.is_some() {
                        debug!("viewport superseded before building");
                    }
                    latest = Some(viewport);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return latest,
            }
        }
    }

    /// One viewport, rendered with the whole-pass retry policy: a
    /// worker fault, timeout, or incomplete gather is retried exactly
    /// once, and a second failure is reported to the sink.  Chunks
    /// are cheap and independent, so re-running the whole pass is
    /// simpler than tracking which chunk to re-dispatch.
    fn render(&mut self, viewport: Viewport) {
        self.generation += 1;
        let generation = self.generation;
        info!(
            "pass {}: {}x{} pixels over re [{}, {}] im [{}, {}]",
            generation,
            viewport.width_px,
            viewport.height_px,
            viewport.x_min,
            viewport.x_max,
            viewport.y_min,
            viewport.y_max
        );
        let mut retried = false;
        loop {
            match self.attempt(generation, &viewport) {
                Outcome::Completed(raster) => {
                    self.sink.raster_ready(raster, &viewport);
                    return;
                }
                Outcome::Superseded => return,
                Outcome::Failed(error) => {
                    if !retried && error.is_retryable() {
                        warn!("pass {} failed ({}); retrying once", generation, error);
                        retried = true;
                        continue;
                    }
                    error!("pass {} failed after retry: {}", generation, error);
                    self.sink.render_failed(&viewport, &error);
                    return;
                }
            }
        }
    }

    /// One attempt at a pass, walking the state machine from
    /// `Building` to `Done` or out through `Superseded`.
    fn attempt(&self, generation: u64, viewport: &Viewport) -> Outcome {
        let mut pass = RenderPass::new(generation);

        let grid = build_grid(viewport);
        let chunks = partition(&grid, self.config.rows_per_chunk);
        if !self.events.is_empty() {
            pass.advance(PassState::Superseded);
            return Outcome::Superseded;
        }

        pass.advance(PassState::Dispatched);
        let pending = self.pool.submit(chunks, self.work.clone());

        pass.advance(PassState::Gathering);
        let events = &self.events;
        let gathered = pending.gather_unless(self.config.gather_timeout, || !events.is_empty());
        let results = match gathered {
            None => {
                pass.advance(PassState::Superseded);
                return Outcome::Superseded;
            }
            Some(Err(error)) => return Outcome::Failed(error),
            Some(Ok(results)) => results,
        };

        match assemble(grid.width, grid.height, &results) {
            Ok(matrix) => {
                pass.advance(PassState::Done);
                Outcome::Completed(colorize(&matrix, &self.config.ramp, self.config.max_iterations))
            }
            Err(error) => Outcome::Failed(error),
        }
    }

    /// Swap in a different work function.  Tests use this to inject
    /// slow or failing workers.
    #[cfg(test)]
    fn set_work(&mut self, work: WorkFn) {
        self.work = work;
    }
}
