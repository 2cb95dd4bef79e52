//! Rebuilds the iteration matrix from chunk results.  Delivery order
//! means nothing here: every result carries its own offset, and each
//! one is written straight into its slice of a pre-allocated matrix.
//! Anything short of exact coverage — a missing chunk, an overlap, a
//! result running past the end — is an error, never a partially
//! filled image.

use errors::RenderError;
use pool::ChunkResult;

/// Escape times for every pixel of a render pass, row-major, same
/// shape as the grid it was computed from.  Values range over
/// `[0, max_iterations]`, with `max_iterations` itself meaning the
/// coordinate never escaped.
#[derive(Clone, Debug, PartialEq)]
pub struct IterationMatrix {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    values: Vec<u64>,
}

impl IterationMatrix {
    /// The flattened row-major values.
    pub fn values(&self) -> &[u64] {
        &self.values
    }

    /// The escape time at a given row and column.
    pub fn value(&self, row: usize, column: usize) -> u64 {
        self.values[row * self.width + column]
    }
}

/// Writes each chunk result into its slice of a `width` × `height`
/// matrix, keyed purely by the result's offset.  Fails if a result
/// runs past the matrix, lands on a cell another result already
/// filled, or if the results taken together do not cover every cell.
pub fn assemble(
    width: usize,
    height: usize,
    results: &[ChunkResult],
) -> Result<IterationMatrix, RenderError> {
    let total = width * height;
    let mut values = vec![0u64; total];
    let mut filled = vec![false; total];

    for result in results {
        let end = result.offset + result.values.len();
        if end > total {
            return Err(RenderError::Worker {
                index: result.index,
                message: format!(
                    "result covers {}..{} but the matrix has {} cells",
                    result.offset, end, total
                ),
            });
        }
        for (cell, value) in result.values.iter().enumerate() {
            let position = result.offset + cell;
            if filled[position] {
                return Err(RenderError::Worker {
                    index: result.index,
                    message: format!("result overlaps cell {}", position),
                });
            }
            filled[position] = true;
            values[position] = *value;
        }
    }

    let missing = filled.iter().filter(|f| !**f).count();
    if missing > 0 {
        return Err(RenderError::Incomplete {
            missing,
            expected: total,
        });
    }

    Ok(IterationMatrix {
        width,
        height,
        values,
    })
}
