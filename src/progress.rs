//! Progress reporting for intermediate pipeline values.
//!
//! Reporters receive diagnostic events (the assembled context, the final
//! prompt) while a question is being answered. They cannot fail: `emit`
//! returns nothing, so a reporter can never change the pipeline's outcome.

use tracing::debug;

/// Receiver of diagnostic pipeline events.
pub trait ProgressReporter: Send + Sync {
    /// Records an event with named string fields.
    fn emit(&self, event: &str, payload: &[(&str, &str)]);
}

/// Logs each event through `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn emit(&self, event: &str, payload: &[(&str, &str)]) {
        for (field, value) in payload {
            debug!(target: "citeqa::progress", event = %event, field = %field, value = %value, "progress");
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn emit(&self, _event: &str, _payload: &[(&str, &str)]) {}
}
