//! In-process fallback trackers
//!
//! A fallback tracker estimates gaze without the external source and
//! reports each estimate through a callback. The recorder wires that
//! callback into the event loop, so implementations only need to call it.

pub mod simulated;

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::Result;

pub use simulated::{SimulatedConfig, SimulatedTracker};

/// Receives `(x, y)` screen coordinates from a tracker
pub type GazeCallback = Arc<dyn Fn(f64, f64) + Send + Sync + 'static>;

#[async_trait]
pub trait FallbackTracker: Send {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Install the estimate callback; replaces any previous one
    fn configure_callback(&mut self, callback: GazeCallback);

    /// Start producing estimates
    async fn begin(&mut self) -> Result<()>;

    /// Stop producing estimates until the next `begin`
    fn pause(&mut self);
}
