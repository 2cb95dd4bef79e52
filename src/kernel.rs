// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time kernel.  Everything else in this crate exists to
//! get coordinates to this function and colors out of its answers.

use num::Complex;

/// Measures how quickly the orbit of `c` under `z = z*z + c` leaves
/// the disk of radius 2.  Returns the first iteration index at which
/// the magnitude strictly exceeds 2, or `max_iterations` itself if
/// that never happens — the sentinel meaning "presumed inside the
/// set".  Index 0 means `c` itself was already outside.
///
/// The comparison uses the squared magnitude so we never take a
/// square root, and it is strict: a point sitting exactly on the
/// radius-2 circle has not escaped yet.
///
/// Pure and deterministic, so it is safe to run concurrently and
/// redundantly; a superseded render pass re-evaluating the same
/// coordinate costs nothing but time.
pub fn escape(c: Complex<f64>, max_iterations: u64) -> u64 {
    let mut z = c;
    for i in 0..max_iterations {
        if z.norm_sqr() > 4.0 {
            return i;
        }
        z = z * z + c;
    }
    max_iterations
}
