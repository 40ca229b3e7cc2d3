use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::models::{PositionError, PositionOptions, PositionReading};

/// Stream of fixes produced by a continuous watch
pub type PositionStream = BoxStream<'static, std::result::Result<PositionReading, PositionError>>;

/// Port for the platform geolocation service
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Resolve a single position
    ///
    /// # Arguments
    /// * `options` - Accuracy, deadline, and cache age for this request
    async fn current_position(
        &self,
        options: PositionOptions,
    ) -> std::result::Result<PositionReading, PositionError>;

    /// Start watching the position
    ///
    /// The subscription lasts until the returned stream is dropped. Errors are
    /// delivered in-band; the stream ending means the platform closed the watch.
    fn watch_position(&self, options: PositionOptions) -> PositionStream;
}
