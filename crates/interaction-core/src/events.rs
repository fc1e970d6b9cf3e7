//! Event handling for interactions
//!
//! Every application callback is modelled as an [`InteractionEvent`]. Events
//! reach the application two ways, in the same order:
//!
//! - an optional [`InteractionListener`] whose methods all default to no-ops,
//!   driven by one dispatcher task per interaction
//! - a broadcast channel, see [`Interaction::subscribe`](crate::Interaction::subscribe)
//!   and [`Interaction::event_stream`](crate::Interaction::event_stream)
//!
//! Once `interactionEnded` or `interactionFailed` has been emitted, only
//! `discardComplete` is delivered.
//!
//! # Usage Examples
//!
//! ```rust
//! use rvoip_interaction_core::events::InteractionListener;
//! use rvoip_interaction_core::QualityBucket;
//! use async_trait::async_trait;
//!
//! struct QualityBanner;
//!
//! #[async_trait]
//! impl InteractionListener for QualityBanner {
//!     async fn on_quality_changed(&self, quality: QualityBucket) {
//!         println!("call quality is now {:?}", quality);
//!     }
//!
//!     async fn on_video_disabled_below_threshold(&self, quality: QualityBucket) {
//!         println!("video paused, quality {:?}", quality);
//!     }
//! }
//! ```

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, trace};

use crate::error::InteractionError;
use crate::quality::QualityBucket;
use crate::types::InteractionId;

/// Capacity of the per-interaction broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Stream of interaction events
pub type EventStream = Pin<Box<dyn Stream<Item = InteractionEvent> + Send>>;

/// Events emitted by an interaction
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    // Lifecycle
    /// Start requested, waiting for the far end
    Initiating,
    /// Far end is alerting; may repeat
    RemoteAlerting,
    /// Interaction established
    Active,
    /// Interaction ended
    Ended,
    /// Interaction failed; emitted at most once
    Failed { error: InteractionError },
    /// Local resources released
    DiscardComplete,

    // Hold
    /// Local hold finished; `error` is `None` on success
    HoldComplete { error: Option<InteractionError> },
    /// Local unhold finished; `error` is `None` on success
    UnholdComplete { error: Option<InteractionError> },
    /// Far end put the interaction on hold
    RemoteHoldComplete,
    /// Far end took the interaction off hold
    RemoteUnholdComplete,

    // Mute / video
    AudioMuteStatusChanged { muted: bool },
    VideoMuteStatusChanged { muted: bool },
    VideoEnabledStatusChanged { enabled: bool },

    // Quality
    /// Quality bucket changed
    QualityChanged { quality: QualityBucket },
    /// Adaptive policy disabled video after sustained poor quality
    VideoDisabledBelowThreshold { quality: QualityBucket },
    /// Quality recovered above the threshold; video re-enabled
    VideoCanBeEnabledThresholdCrossed { quality: QualityBucket },
}

impl InteractionEvent {
    /// Whether this event ends the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed { .. })
    }

    /// Whether this is one of the advisory quality events
    pub fn is_quality_event(&self) -> bool {
        matches!(
            self,
            Self::QualityChanged { .. }
                | Self::VideoDisabledBelowThreshold { .. }
                | Self::VideoCanBeEnabledThresholdCrossed { .. }
        )
    }
}

/// Application-facing callback interface
///
/// All methods default to no-ops; implement only what the application needs.
/// [`on_event`](Self::on_event) routes each event to its specific method and
/// can be overridden to handle everything in one place.
#[async_trait]
pub trait InteractionListener: Send + Sync {
    async fn on_interaction_initiating(&self) {}

    async fn on_interaction_remote_alerting(&self) {}

    async fn on_interaction_active(&self) {}

    async fn on_interaction_ended(&self) {}

    async fn on_interaction_failed(&self, _error: InteractionError) {}

    async fn on_discard_complete(&self) {}

    async fn on_hold_complete(&self, _error: Option<InteractionError>) {}

    async fn on_unhold_complete(&self, _error: Option<InteractionError>) {}

    async fn on_remote_hold_complete(&self) {}

    async fn on_remote_unhold_complete(&self) {}

    async fn on_audio_mute_status_changed(&self, _muted: bool) {}

    async fn on_video_mute_status_changed(&self, _muted: bool) {}

    async fn on_video_enabled_status_changed(&self, _enabled: bool) {}

    async fn on_quality_changed(&self, _quality: QualityBucket) {}

    async fn on_video_disabled_below_threshold(&self, _quality: QualityBucket) {}

    async fn on_video_can_be_enabled_threshold_crossed(&self, _quality: QualityBucket) {}

    /// Route an event to its specific handler
    async fn on_event(&self, event: InteractionEvent) {
        match event {
            InteractionEvent::Initiating => self.on_interaction_initiating().await,
            InteractionEvent::RemoteAlerting => self.on_interaction_remote_alerting().await,
            InteractionEvent::Active => self.on_interaction_active().await,
            InteractionEvent::Ended => self.on_interaction_ended().await,
            InteractionEvent::Failed { error } => self.on_interaction_failed(error).await,
            InteractionEvent::DiscardComplete => self.on_discard_complete().await,
            InteractionEvent::HoldComplete { error } => self.on_hold_complete(error).await,
            InteractionEvent::UnholdComplete { error } => self.on_unhold_complete(error).await,
            InteractionEvent::RemoteHoldComplete => self.on_remote_hold_complete().await,
            InteractionEvent::RemoteUnholdComplete => self.on_remote_unhold_complete().await,
            InteractionEvent::AudioMuteStatusChanged { muted } => {
                self.on_audio_mute_status_changed(muted).await
            }
            InteractionEvent::VideoMuteStatusChanged { muted } => {
                self.on_video_mute_status_changed(muted).await
            }
            InteractionEvent::VideoEnabledStatusChanged { enabled } => {
                self.on_video_enabled_status_changed(enabled).await
            }
            InteractionEvent::QualityChanged { quality } => self.on_quality_changed(quality).await,
            InteractionEvent::VideoDisabledBelowThreshold { quality } => {
                self.on_video_disabled_below_threshold(quality).await
            }
            InteractionEvent::VideoCanBeEnabledThresholdCrossed { quality } => {
                self.on_video_can_be_enabled_threshold_crossed(quality).await
            }
        }
    }
}

/// Shared slot holding the registered listener
type ListenerSlot = Arc<RwLock<Option<Arc<dyn InteractionListener>>>>;

/// Ordered, gated event fan-out for one interaction
pub(crate) struct EventEmitter {
    interaction_id: InteractionId,
    listener: ListenerSlot,
    channels: Mutex<EmitterChannels>,
}

struct EmitterChannels {
    dispatch_tx: mpsc::UnboundedSender<InteractionEvent>,
    broadcast_tx: broadcast::Sender<InteractionEvent>,
    terminal_emitted: bool,
}

impl EventEmitter {
    /// Create the emitter and spawn its dispatcher on the current runtime
    pub(crate) fn spawn(interaction_id: InteractionId) -> Self {
        let listener: ListenerSlot = Arc::new(RwLock::new(None));
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(dispatch_loop(interaction_id, listener.clone(), dispatch_rx));

        Self {
            interaction_id,
            listener,
            channels: Mutex::new(EmitterChannels {
                dispatch_tx,
                broadcast_tx,
                terminal_emitted: false,
            }),
        }
    }

    pub(crate) fn set_listener(&self, listener: Arc<dyn InteractionListener>) {
        *self.listener.write() = Some(listener);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<InteractionEvent> {
        self.channels.lock().broadcast_tx.subscribe()
    }

    pub(crate) fn event_stream(&self) -> EventStream {
        let stream = BroadcastStream::new(self.subscribe())
            .filter_map(|event| futures::future::ready(event.ok()));
        Box::pin(stream)
    }

    /// Emit an event; returns false if the terminal gate dropped it
    pub(crate) fn emit(&self, event: InteractionEvent) -> bool {
        let mut channels = self.channels.lock();
        if channels.terminal_emitted && event != InteractionEvent::DiscardComplete {
            debug!(
                "Interaction {} already terminal, dropping {:?}",
                self.interaction_id, event
            );
            return false;
        }
        if event.is_terminal() {
            channels.terminal_emitted = true;
        }

        trace!("Interaction {} emitting {:?}", self.interaction_id, event);
        // Nobody listening is fine for both channels
        let _ = channels.broadcast_tx.send(event.clone());
        let _ = channels.dispatch_tx.send(event);
        true
    }
}

async fn dispatch_loop(
    interaction_id: InteractionId,
    listener: ListenerSlot,
    mut events: mpsc::UnboundedReceiver<InteractionEvent>,
) {
    while let Some(event) = events.recv().await {
        let current = listener.read().clone();
        if let Some(listener) = current {
            listener.on_event(event).await;
        }
    }
    debug!("Event dispatcher for interaction {} stopped", interaction_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recorder {
        qualities: Mutex<Vec<QualityBucket>>,
        ended: Mutex<u32>,
    }

    #[async_trait]
    impl InteractionListener for Recorder {
        async fn on_quality_changed(&self, quality: QualityBucket) {
            self.qualities.lock().push(quality);
        }

        async fn on_interaction_ended(&self) {
            *self.ended.lock() += 1;
        }
    }

    #[tokio::test]
    async fn test_events_after_terminal_are_dropped_except_discard() {
        let emitter = EventEmitter::spawn(Uuid::new_v4());
        let mut rx = emitter.subscribe();

        assert!(emitter.emit(InteractionEvent::Ended));
        assert!(!emitter.emit(InteractionEvent::QualityChanged { quality: QualityBucket::Good }));
        assert!(!emitter.emit(InteractionEvent::Failed {
            error: InteractionError::signaling("late"),
        }));
        assert!(emitter.emit(InteractionEvent::DiscardComplete));

        assert_eq!(rx.recv().await.unwrap(), InteractionEvent::Ended);
        assert_eq!(rx.recv().await.unwrap(), InteractionEvent::DiscardComplete);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_listener_receives_events_in_order() {
        let emitter = EventEmitter::spawn(Uuid::new_v4());
        let recorder = Arc::new(Recorder::default());
        emitter.set_listener(recorder.clone());

        emitter.emit(InteractionEvent::QualityChanged { quality: QualityBucket::Good });
        emitter.emit(InteractionEvent::QualityChanged { quality: QualityBucket::Poor });
        emitter.emit(InteractionEvent::Ended);

        timeout(Duration::from_secs(1), async {
            while *recorder.ended.lock() == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("listener never saw Ended");

        assert_eq!(
            *recorder.qualities.lock(),
            vec![QualityBucket::Good, QualityBucket::Poor]
        );
    }

    #[tokio::test]
    async fn test_event_stream_yields_broadcast_events() {
        let emitter = EventEmitter::spawn(Uuid::new_v4());
        let mut stream = emitter.event_stream();
        emitter.emit(InteractionEvent::AudioMuteStatusChanged { muted: true });

        let event = timeout(Duration::from_secs(1), stream.next()).await.unwrap();
        assert_eq!(event, Some(InteractionEvent::AudioMuteStatusChanged { muted: true }));
    }
}
