//! The ways a render pass can go wrong.  There are deliberately few
//! of them: a viewport that never should have been accepted, and the
//! three flavors of "the workers did not come back with everything we
//! asked for."

use std::time::Duration;

/// Failure taxonomy for the render pipeline.  An `InvalidViewport` is
/// rejected synchronously, before any work is dispatched; the other
/// three abort only the render pass they occurred in, and the
/// orchestrator retries that pass once before reporting it.
#[derive(Debug, Fail)]
pub enum RenderError {
    /// The viewport had malformed bounds or a zero pixel dimension.
    #[fail(display = "invalid viewport: {}", _0)]
    InvalidViewport(String),

    /// A worker reported a fault while executing one chunk.
    #[fail(display = "worker failed on chunk {}: {}", index, message)]
    Worker {
        /// Index of the chunk the worker was executing.
        index: usize,
        /// What the worker had to say about it.
        message: String,
    },

    /// The gather deadline passed with results still outstanding.
    #[fail(display = "gather timed out after {:?}", _0)]
    Timeout(Duration),

    /// The gather finished early but some results never arrived,
    /// usually because a worker disappeared without reporting.
    #[fail(display = "gather incomplete: missing {} of {} expected results", missing, expected)]
    Incomplete {
        /// How many expected results were never delivered.
        missing: usize,
        /// How many results were expected in total.
        expected: usize,
    },
}

impl RenderError {
    /// Whether re-running the whole render pass could plausibly
    /// succeed.  A malformed viewport will be just as malformed the
    /// second time; a missing worker may well have been transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            RenderError::InvalidViewport(_) => false,
            RenderError::Worker { .. } => true,
            RenderError::Timeout(_) => true,
            RenderError::Incomplete { .. } => true,
        }
    }
}
