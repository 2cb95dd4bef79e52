//! End-to-end exercise of the public pipeline, stage by stage: grid,
//! partition, pool, gather, assemble, colorize.

extern crate mandelpool;
extern crate num;

use std::sync::Arc;
use std::time::Duration;

use num::Complex;

use mandelpool::{
    assemble, build_grid, colorize, escape, partition, Chunk, ColorRamp, Viewport, WorkFn,
    WorkerPool,
};

fn kernel_work(max_iterations: u64) -> WorkFn {
    Arc::new(move |chunk: &Chunk| {
        Ok(chunk
            .points
            .iter()
            .map(|&c| escape(c, max_iterations))
            .collect())
    })
}

#[test]
fn the_full_pipeline_resolves_the_origin_to_the_sentinel() {
    // x spans [-2, 1] over 4 columns and y spans [-1, 1] over 3 rows,
    // so the grid contains c = 0 at row 1, column 2.
    let viewport = Viewport::new(-2.0, 1.0, -1.0, 1.0, 4, 3).unwrap();
    let max_iterations = 50;

    let grid = build_grid(&viewport);
    assert_eq!(grid.len(), 12);
    assert_eq!(grid.point(1, 2), Complex::new(0.0, 0.0));

    let chunks = partition(&grid, 1);
    let pool = WorkerPool::new(2);
    let results = pool
        .submit(chunks, kernel_work(max_iterations))
        .gather(Duration::from_secs(10))
        .unwrap();

    let matrix = assemble(grid.width, grid.height, &results).unwrap();
    assert_eq!(matrix.value(1, 2), max_iterations);

    let raster = colorize(&matrix, &ColorRamp::default(), max_iterations);
    assert_eq!(raster.pixel(1, 2), [0, 0, 0, 255]);
    // The corner at -2 - 1i escapes immediately and lands on the
    // blue end of the ramp.
    assert_eq!(raster.pixel(0, 0), [0, 0, 255, 255]);
}

#[test]
fn chunk_granularity_does_not_change_the_matrix() {
    let viewport = Viewport::new(-2.5, 1.0, -1.25, 1.25, 32, 24).unwrap();
    let grid = build_grid(&viewport);
    let pool = WorkerPool::new(4);

    let mut matrices = Vec::new();
    for rows_per_chunk in &[1usize, 3, 7, 24] {
        let results = pool
            .submit(partition(&grid, *rows_per_chunk), kernel_work(200))
            .gather(Duration::from_secs(30))
            .unwrap();
        matrices.push(assemble(grid.width, grid.height, &results).unwrap());
    }
    for matrix in &matrices[1..] {
        assert_eq!(matrix, &matrices[0]);
    }
}

#[test]
fn a_rerun_is_byte_identical() {
    let viewport = Viewport::new(-2.0, 0.5, -1.0, 1.0, 16, 16).unwrap();
    let grid = build_grid(&viewport);
    let pool = WorkerPool::new(3);
    let ramp = ColorRamp::default();

    let mut rasters = Vec::new();
    for _ in 0..2 {
        let results = pool
            .submit(partition(&grid, 1), kernel_work(100))
            .gather(Duration::from_secs(30))
            .unwrap();
        let matrix = assemble(grid.width, grid.height, &results).unwrap();
        rasters.push(colorize(&matrix, &ramp, 100));
    }
    assert_eq!(rasters[0].pixels(), rasters[1].pixels());
}
