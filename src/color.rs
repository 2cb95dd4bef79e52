//! Turns iteration counts into colors.  Raw escape times band badly
//! near the set boundary, so the count is normalized logarithmically
//! before it is looked up on the ramp; points that never escaped take
//! the ramp's terminal color.

use assemble::IterationMatrix;

/// A single color, RGBA, 8 bits per channel.
pub type Rgba = [u8; 4];

/// An ordered palette of color stops plus a linear interpolation rule
/// between them.  Static configuration; build it once, never mutate
/// it.  The last stop doubles as the "inside the set" color.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorRamp {
    stops: Vec<Rgba>,
}

impl ColorRamp {
    /// Builds a ramp from at least two stops.  Panics on fewer — a
    /// ramp with nothing to interpolate between is a configuration
    /// bug, not a runtime condition.
    pub fn new(stops: Vec<Rgba>) -> ColorRamp {
        assert!(stops.len() >= 2, "a color ramp needs at least two stops");
        ColorRamp { stops }
    }

    /// The color for coordinates that never escaped: the terminal
    /// stop of the ramp.
    pub fn inside(&self) -> Rgba {
        self.stops[self.stops.len() - 1]
    }

    /// Samples the ramp at `t`, clamped to `[0, 1]`, interpolating
    /// linearly between the two stops bracketing `t`.
    pub fn sample(&self, t: f64) -> Rgba {
        let t = t.max(0.0).min(1.0);
        let scaled = t * ((self.stops.len() - 1) as f64);
        let index = (scaled as usize).min(self.stops.len() - 2);
        let fraction = scaled - (index as f64);
        lerp(self.stops[index], self.stops[index + 1], fraction)
    }
}

impl Default for ColorRamp {
    /// Blue through red and yellow to black, the black end marking
    /// the interior of the set.
    fn default() -> ColorRamp {
        ColorRamp::new(vec![
            [0, 0, 255, 255],
            [255, 0, 0, 255],
            [255, 255, 0, 255],
            [0, 0, 0, 255],
        ])
    }
}

fn lerp(a: Rgba, b: Rgba, t: f64) -> Rgba {
    let mut out = [0u8; 4];
    for channel in 0..4 {
        let low = f64::from(a[channel]);
        let high = f64::from(b[channel]);
        out[channel] = (low + (high - low) * t).round() as u8;
    }
    out
}

/// A finished frame: row-major RGBA8 pixels plus the dimensions they
/// were rendered at.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    pixels: Vec<u8>,
}

impl Raster {
    /// The raw pixel buffer, 4 bytes per pixel, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The color of one pixel.
    pub fn pixel(&self, row: usize, column: usize) -> Rgba {
        let at = (row * self.width + column) * 4;
        [
            self.pixels[at],
            self.pixels[at + 1],
            self.pixels[at + 2],
            self.pixels[at + 3],
        ]
    }
}

/// Maps every cell of the matrix through the ramp.  The sentinel
/// value `max_iterations` takes the ramp's inside color; every other
/// count is normalized as `ln(v + 1) / ln(max + 1)` and sampled.
/// Total over `[0, max_iterations]` and deterministic: the same
/// matrix and ramp always produce byte-identical output.
pub fn colorize(matrix: &IterationMatrix, ramp: &ColorRamp, max_iterations: u64) -> Raster {
    let denominator = ((max_iterations + 1) as f64).ln();
    let mut pixels = Vec::with_capacity(matrix.values().len() * 4);
    for &value in matrix.values() {
        let color = if value >= max_iterations {
            ramp.inside()
        } else {
            let t = ((value + 1) as f64).ln() / denominator;
            ramp.sample(t)
        };
        pixels.extend_from_slice(&color);
    }
    Raster {
        width: matrix.width,
        height: matrix.height,
        pixels,
    }
}
