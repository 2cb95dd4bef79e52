extern crate clap;
extern crate env_logger;
extern crate image;
extern crate mandelpool;
extern crate num;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use image::png::PNGEncoder;
use image::ColorType;
use num::Complex;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use mandelpool::{Orchestrator, Raster, RasterSink, RenderConfig, RenderError, Viewport};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const TIMEOUT: &str = "timeout";

fn args<'a>() -> ArgMatches<'a> {
    let max_threads = num_cpus::get();

    App::new("mandelview")
        .version("0.1.0")
        .about("Renders one viewport of the Mandelbrot set to a PNG")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<u32>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .required(false)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2.5,-1.25")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Left lower corner of the viewport"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .required(false)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1.0,1.25")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Right upper corner of the viewport"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .default_value("0")
                .validator(move |s| {
                    validate_range(
                        &s,
                        0,
                        max_threads,
                        "Could not parse thread count",
                        &format!("Thread count must be between 0 and {}", max_threads),
                    )
                })
                .help("Number of worker threads (0 means one per CPU)"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1000")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        1_000_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 1000000",
                    )
                })
                .help("Escape iteration bound"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .required(false)
                .long(TIMEOUT)
                .takes_value(true)
                .default_value("30")
                .validator(|s| {
                    validate_range(
                        &s,
                        1u64,
                        3600,
                        "Could not parse gather timeout",
                        "Gather timeout must be between 1 and 3600 seconds",
                    )
                })
                .help("Gather timeout, in seconds"),
        )
        .get_matches()
}

fn write_image(outfile: &str, raster: &Raster) -> Result<(), std::io::Error> {
    let output = File::create(Path::new(outfile))?;
    let encoder = PNGEncoder::new(output);
    encoder.encode(
        raster.pixels(),
        raster.width as u32,
        raster.height as u32,
        ColorType::RGBA(8),
    )?;
    Ok(())
}

/// Writes each finished frame to the output path.  One-shot rendering
/// only ever sees a single frame, but the sink contract is the same
/// one an interactive shell would implement.
struct FileSink {
    path: String,
    failed: bool,
}

impl RasterSink for FileSink {
    fn raster_ready(&mut self, raster: Raster, _viewport: &Viewport) {
        if let Err(e) = write_image(&self.path, &raster) {
            eprintln!("Write failure: {}", e);
            self.failed = true;
        }
    }

    fn render_failed(&mut self, _viewport: &Viewport, error: &RenderError) {
        eprintln!("Render failure: {}", error);
        self.failed = true;
    }
}

fn main() {
    env_logger::init();
    let matches = args();

    let size: (u32, u32) =
        parse_pair(matches.value_of(SIZE).unwrap(), 'x').expect("Error parsing image dimensions");
    let leftlower = parse_complex(matches.value_of(LEFTLOWER).unwrap())
        .expect("Error parsing left lower point");
    let rightupper = parse_complex(matches.value_of(RIGHTUPPER).unwrap())
        .expect("Error parsing right upper point");
    let threads =
        usize::from_str(matches.value_of(THREADS).unwrap()).expect("Could not parse thread count");
    let iterations = u64::from_str(matches.value_of(ITERATIONS).unwrap())
        .expect("Could not parse iteration count");
    let timeout =
        u64::from_str(matches.value_of(TIMEOUT).unwrap()).expect("Could not parse gather timeout");

    let viewport = match Viewport::new(
        leftlower.re,
        rightupper.re,
        leftlower.im,
        rightupper.im,
        size.0,
        size.1,
    ) {
        Ok(viewport) => viewport,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let mut config = RenderConfig::new(viewport);
    config.max_iterations = iterations;
    config.gather_timeout = Duration::from_secs(timeout);
    if threads > 0 {
        config.workers = threads;
    }

    let sink = FileSink {
        path: matches.value_of(OUTPUT).unwrap().to_string(),
        failed: false,
    };
    let mut orchestrator = match Orchestrator::new(config, sink) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    orchestrator.run_until_idle();

    if orchestrator.sink().failed {
        std::process::exit(1);
    }
}
