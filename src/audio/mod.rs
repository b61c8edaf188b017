pub mod decode;
pub mod fetch;
pub mod output;
pub mod resample;

use std::sync::Arc;

use crate::error::{AudioError, LoadError};
use crate::models::AudioBuffer;

// Re-export fetcher implementations
pub use fetch::{DirFetcher, HttpFetcher};

// Re-export the device-backed output
pub use output::CpalOutput;

/// Resolves a track locator to its raw audio bytes.
///
/// Fetch failures are reported as errors here; the playlist layer recovers
/// by substituting a placeholder buffer, so a broken source never takes the
/// rest of the catalog down.
#[async_trait::async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, LoadError>;
}

/// Renders decoded buffers through a persistent gain stage and exposes the
/// hardware clock the position math is derived from.
///
/// One render run is active at a time; `start` replaces any existing run and
/// `stop` must be a guarded no-op when nothing is rendering.
pub trait AudioOutput {
    /// Seconds since the output clock started. Monotonically increasing,
    /// advances in real time independent of call timing.
    fn now(&self) -> f64;

    /// Begin rendering `buffer` at `offset` seconds from its start.
    fn start(&mut self, buffer: Arc<AudioBuffer>, offset: f64) -> Result<(), AudioError>;

    /// Tear down the active render run, if any.
    fn stop(&mut self);

    /// Set the persistent output gain. Applies to the active run immediately
    /// and to any future run.
    fn set_gain(&mut self, gain: f32);

    /// Get the current output gain
    fn gain(&self) -> f32;
}
