//! Media layer collaborator
//!
//! The interaction never touches RTP/RTCP itself. It asks the media layer for
//! transport samples and tells it when video or mute state changes.

use async_trait::async_trait;

use crate::error::InteractionResult;
use crate::quality::TransportSample;

/// Media layer backing one interaction
#[async_trait]
pub trait MediaController: Send + Sync {
    /// Fetch the latest transport metrics
    ///
    /// Fails with [`InteractionError::TransportUnavailable`](crate::InteractionError::TransportUnavailable)
    /// while metrics are not yet available; the sampler skips that tick.
    async fn transport_sample(&self) -> InteractionResult<TransportSample>;

    /// Start or stop sending and receiving video
    async fn set_video_enabled(&self, enabled: bool);

    /// Mute or unmute the local microphone
    async fn set_audio_muted(&self, _muted: bool) {}

    /// Mute or unmute the local camera
    async fn set_video_muted(&self, _muted: bool) {}
}
