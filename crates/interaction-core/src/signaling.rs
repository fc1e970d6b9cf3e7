//! Signaling collaborator and the lifecycle events it reports
//!
//! Outbound requests go through [`SignalingChannel`]; whatever protocol sits
//! behind it reports the far end's answers back as [`SignalingEvent`]s, which
//! the embedding code feeds into
//! [`Interaction::handle_signaling_event`](crate::Interaction::handle_signaling_event).

use async_trait::async_trait;

use crate::error::InteractionResult;
use crate::types::DtmfTone;

/// Outbound signaling for one interaction
///
/// Errors returned from `start` and `end` are treated as fatal and move the
/// interaction to `Failed`. Errors from `hold`, `unhold` and `send_dtmf` are
/// reported only through the completion of that operation.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Place the call towards `destination`
    async fn start(&self, destination: Option<String>) -> InteractionResult<()>;

    /// Tear the call down
    async fn end(&self) -> InteractionResult<()>;

    /// Put the far end on hold; resolves when the far end acknowledges
    async fn hold(&self) -> InteractionResult<()>;

    /// Take the far end off hold; resolves when the far end acknowledges
    async fn unhold(&self) -> InteractionResult<()>;

    /// Send one DTMF tone; resolves when the tone is acknowledged
    async fn send_dtmf(&self, tone: DtmfTone) -> InteractionResult<()>;
}

/// Lifecycle events reported by the signaling layer
#[derive(Debug, Clone, PartialEq)]
pub enum SignalingEvent {
    /// Far end is ringing; may repeat
    RemoteAlerting,
    /// Far end answered
    RemoteAccepted,
    /// Far end hung up
    RemoteEnded,
    /// Far end put the call on hold
    RemoteHeld,
    /// Far end took the call off hold
    RemoteUnheld,
    /// Unrecoverable signaling failure
    Failed { reason: String },
}

impl SignalingEvent {
    /// Short name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoteAlerting => "remote_alerting",
            Self::RemoteAccepted => "remote_accepted",
            Self::RemoteEnded => "remote_ended",
            Self::RemoteHeld => "remote_held",
            Self::RemoteUnheld => "remote_unheld",
            Self::Failed { .. } => "signaling_failed",
        }
    }
}
