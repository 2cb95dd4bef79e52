//! Contains the Viewport, which describes the rectangle of the
//! complex plane currently on screen and the pixel resolution it is
//! rendered at, and the ComplexGrid built from it: one complex
//! coordinate per pixel, row-major, derived by linear interpolation
//! along each axis.  The same viewport always yields the same grid.

use itertools::iproduct;
use num::Complex;

use errors::RenderError;

/// A rectangle on the complex plane plus the pixel resolution to
/// render it at.  Replaced wholesale on every pan/zoom event and
/// immutable once captured for a render pass.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Left edge (smallest real component).
    pub x_min: f64,
    /// Right edge (largest real component).
    pub x_max: f64,
    /// Bottom edge (smallest imaginary component).
    pub y_min: f64,
    /// Top edge (largest imaginary component).
    pub y_max: f64,
    /// Output width in pixels.
    pub width_px: u32,
    /// Output height in pixels.
    pub height_px: u32,
}

impl Viewport {
    /// Constructor that validates its arguments.  Use this at the
    /// edges of the system; internal code that already holds a
    /// Viewport can assume it passed.
    pub fn new(
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
        width_px: u32,
        height_px: u32,
    ) -> Result<Viewport, RenderError> {
        let viewport = Viewport {
            x_min,
            x_max,
            y_min,
            y_max,
            width_px,
            height_px,
        };
        viewport.validate()?;
        Ok(viewport)
    }

    /// Checks the invariants: finite bounds, `x_min < x_max`,
    /// `y_min < y_max`, and both pixel dimensions nonzero.
    pub fn validate(&self) -> Result<(), RenderError> {
        let finite = self.x_min.is_finite()
            && self.x_max.is_finite()
            && self.y_min.is_finite()
            && self.y_max.is_finite();
        if !finite {
            return Err(RenderError::InvalidViewport(
                "bounds must be finite".to_string(),
            ));
        }
        if self.x_min >= self.x_max {
            return Err(RenderError::InvalidViewport(format!(
                "x_min {} is not below x_max {}",
                self.x_min, self.x_max
            )));
        }
        if self.y_min >= self.y_max {
            return Err(RenderError::InvalidViewport(format!(
                "y_min {} is not below y_max {}",
                self.y_min, self.y_max
            )));
        }
        if self.width_px == 0 || self.height_px == 0 {
            return Err(RenderError::InvalidViewport(format!(
                "resolution {}x{} has a zero dimension",
                self.width_px, self.height_px
            )));
        }
        Ok(())
    }

    /// The number of pixels, and therefore of grid coordinates, this
    /// viewport resolves to.
    pub fn pixel_count(&self) -> usize {
        (self.width_px as usize) * (self.height_px as usize)
    }
}

/// A row-major grid of complex coordinates, one per pixel of the
/// viewport it was built from.  Row `i` carries imaginary component
/// `y[i]`, column `j` real component `x[j]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexGrid {
    /// Number of columns.
    pub width: usize,
    /// Number of rows.
    pub height: usize,
    points: Vec<Complex<f64>>,
}

impl ComplexGrid {
    /// Total number of coordinates in the grid.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the grid holds no coordinates.  Cannot happen for a
    /// grid built from a validated viewport.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The flattened row-major coordinate list.
    pub fn points(&self) -> &[Complex<f64>] {
        &self.points
    }

    /// The coordinate at a given row and column.
    pub fn point(&self, row: usize, column: usize) -> Complex<f64> {
        self.points[row * self.width + column]
    }
}

/// `count` evenly spaced values covering `[start, stop]`, both
/// endpoints included.  A single-element axis takes the lower bound.
fn linspace(start: f64, stop: f64, count: u32) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let step = (stop - start) / f64::from(count - 1);
    (0..count).map(|i| start + step * f64::from(i)).collect()
}

/// Maps a viewport to its coordinate grid: `width_px` evenly spaced
/// real values, `height_px` evenly spaced imaginary values, and the
/// outer sum `c[i][j] = x[j] + y[i]*i`.  Deterministic and
/// side-effect-free; the caller is expected to have validated the
/// viewport already.
pub fn build_grid(viewport: &Viewport) -> ComplexGrid {
    let xs = linspace(viewport.x_min, viewport.x_max, viewport.width_px);
    let ys = linspace(viewport.y_min, viewport.y_max, viewport.height_px);
    let points = iproduct!(ys.iter().cloned(), xs.iter().cloned())
        .map(|(im, re)| Complex::new(re, im))
        .collect();
    ComplexGrid {
        width: xs.len(),
        height: ys.len(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::{INFINITY, NAN};

    fn viewport(x: (f64, f64), y: (f64, f64), px: (u32, u32)) -> Viewport {
        Viewport::new(x.0, x.1, y.0, y.1, px.0, px.1).unwrap()
    }

    #[test]
    fn validation_rejects_inverted_bounds() {
        assert!(Viewport::new(1.0, -1.0, 0.0, 1.0, 4, 4).is_err());
        assert!(Viewport::new(-1.0, 1.0, 1.0, -1.0, 4, 4).is_err());
        assert!(Viewport::new(-1.0, -1.0, 0.0, 1.0, 4, 4).is_err());
    }

    #[test]
    fn validation_rejects_zero_resolution() {
        assert!(Viewport::new(-1.0, 1.0, -1.0, 1.0, 0, 4).is_err());
        assert!(Viewport::new(-1.0, 1.0, -1.0, 1.0, 4, 0).is_err());
    }

    #[test]
    fn validation_rejects_non_finite_bounds() {
        assert!(Viewport::new(NAN, 1.0, -1.0, 1.0, 4, 4).is_err());
        assert!(Viewport::new(-1.0, INFINITY, -1.0, 1.0, 4, 4).is_err());
    }

    #[test]
    fn grid_includes_both_endpoints() {
        let grid = build_grid(&viewport((-2.0, 1.0), (-1.0, 1.0), (4, 3)));
        assert_eq!(grid.point(0, 0), Complex::new(-2.0, -1.0));
        assert_eq!(grid.point(2, 3), Complex::new(1.0, 1.0));
    }

    #[test]
    fn grid_is_row_major() {
        let grid = build_grid(&viewport((-2.0, 1.0), (-1.0, 1.0), (4, 3)));
        assert_eq!(grid.len(), 12);
        // All of row 1 shares the middle imaginary value.
        for column in 0..4 {
            assert_eq!(grid.point(1, column).im, 0.0);
        }
        // Real values repeat per row.
        assert_eq!(grid.points()[0].re, grid.points()[4].re);
        assert_eq!(grid.points()[3].re, grid.points()[7].re);
    }

    #[test]
    fn grid_contains_the_origin_when_the_axes_cross_it() {
        let grid = build_grid(&viewport((-2.0, 1.0), (-1.0, 1.0), (4, 3)));
        assert_eq!(grid.point(1, 2), Complex::new(0.0, 0.0));
    }

    #[test]
    fn single_pixel_grid_takes_the_lower_corner() {
        let grid = build_grid(&viewport((-2.0, 1.0), (-1.0, 1.0), (1, 1)));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.point(0, 0), Complex::new(-2.0, -1.0));
    }

    #[test]
    fn same_viewport_same_grid() {
        let vp = viewport((-2.5, 1.0), (-1.25, 1.25), (64, 48));
        assert_eq!(build_grid(&vp), build_grid(&vp));
    }
}
