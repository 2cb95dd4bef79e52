#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Viewport-driven Mandelbrot renderer
//!
//! The Mandelbrot set takes a point on the complex plane and
//! repeatedly multiplies it by itself, measuring how quickly that
//! number goes to infinity.  This "velocity" is the number used to
//! render the image.  An interactive view of the set is nothing more
//! than re-running that measurement for every pixel of the current
//! viewport, every time the user pans or zooms.
//!
//! This crate is the compute side of such a viewer.  The plotting
//! surface (whatever draws on screen and emits pan/zoom events) is a
//! collaborator, not part of this crate.  What lives here is the
//! pipeline between the two: a viewport is turned into a grid of
//! complex coordinates, the grid is split into indexed chunks, the
//! chunks are farmed out to a pool of stateless workers, the results
//! are gathered back in chunk order regardless of which worker
//! finished first, and the resulting iteration matrix is mapped
//! through a logarithmic color ramp into an RGBA raster.  The
//! orchestrator drives that pipeline once per viewport and throws
//! away any pass that a newer viewport has made stale.

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;

#[cfg(test)]
extern crate rand;

pub mod assemble;
pub mod chunk;
pub mod color;
pub mod errors;
pub mod grid;
pub mod kernel;
pub mod orchestrator;
pub mod pool;

pub use assemble::{assemble, IterationMatrix};
pub use chunk::{partition, Chunk};
pub use color::{colorize, ColorRamp, Raster, Rgba};
pub use errors::RenderError;
pub use grid::{build_grid, ComplexGrid, Viewport};
pub use kernel::escape;
pub use orchestrator::{Orchestrator, PassState, RasterSink, RenderConfig, ViewportEvents};
pub use pool::{ChunkResult, PendingGather, WorkFn, WorkerPool};
