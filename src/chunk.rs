//! Splits the coordinate grid into indexed chunks of work.  The
//! partition is the load-bearing invariant of the whole gather: the
//! chunks' index ranges must cover the flattened grid exactly, with
//! no overlap and no gap, so that results can be written back by
//! offset no matter which worker finished first.

use std::ops::Range;

use num::Complex;

use grid::ComplexGrid;

/// A contiguous, ordered run of grid coordinates, tagged with its
/// position in the partition and its offset into the flattened grid.
/// Chunks own their coordinates so they can cross a thread or
/// process boundary without borrowing the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// Position of this chunk in the partition, counted from 0.
    pub index: usize,
    /// Offset of the chunk's first coordinate in the flattened grid.
    pub offset: usize,
    /// The coordinates themselves, in grid order.
    pub points: Vec<Complex<f64>>,
}

impl Chunk {
    /// Number of coordinates in the chunk.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the chunk carries no coordinates.  The partitioner
    /// never produces one of these.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The half-open range of flattened grid indices this chunk
    /// covers.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.points.len()
    }
}

/// Splits a grid into chunks of `rows_per_chunk` rows each; the last
/// chunk takes whatever rows remain.  One row per chunk is the
/// default granularity — enough pieces for load balancing without
/// tying the chunk count to the worker count.  Chunk indices are
/// contiguous from 0 and the union of all ranges is exactly
/// `[0, width * height)`.
pub fn partition(grid: &ComplexGrid, rows_per_chunk: usize) -> Vec<Chunk> {
    assert!(rows_per_chunk > 0, "rows_per_chunk must be nonzero");
    let mut chunks = Vec::with_capacity((grid.height + rows_per_chunk - 1) / rows_per_chunk);
    let mut row = 0;
    while row < grid.height {
        let end = usize::min(row + rows_per_chunk, grid.height);
        let offset = row * grid.width;
        chunks.push(Chunk {
            index: chunks.len(),
            offset,
            points: grid.points()[offset..end * grid.width].to_vec(),
        });
        row = end;
    }
    chunks
}
