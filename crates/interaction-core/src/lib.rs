//! # Interaction Core - Call Lifecycle and Quality Monitoring
//!
//! This crate models one audio or audio+video call ("interaction") and keeps
//! an eye on its transport quality while it is established:
//!
//! - **Interaction State Machine**: `Idle -> Initiating -> RemoteAlerting ->
//!   Established -> Ending -> Ended`, with `Failed` reachable from any
//!   non-terminal state
//! - **Quality Calculator**: a simplified E-model scoring transport samples
//!   into a MOS and a [`QualityBucket`]
//! - **Quality Sampler**: one periodic tokio task per established call
//! - **Quality State Tracker**: asymmetric hysteresis over successive scores
//! - **Adaptive Video Controller**: disables video under sustained poor
//!   quality and re-enables it on recovery
//!
//! Signaling and media transport are external collaborators reached through
//! the [`SignalingChannel`] and [`MediaController`] traits.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use rvoip_interaction_core::{
//!     AdaptivePolicyConfig, InteractionConfig, InteractionEvent, MediaController,
//!     QualityBucket, SignalingChannel, SignalingEvent, Work,
//! };
//!
//! # async fn example(
//! #     media: Arc<dyn MediaController>,
//! #     signaling: Arc<dyn SignalingChannel>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let work = Work::new()
//!     .with_topic("support")
//!     .with_video_config(
//!         InteractionConfig::video()
//!             .with_destination("sip:support@example.com")
//!             .with_adaptive_policy(AdaptivePolicyConfig::enabled(
//!                 QualityBucket::Poor,
//!                 Duration::from_secs(10),
//!             )),
//!     );
//!
//! let call = work.create_video_interaction(media, signaling)?;
//! let mut events = call.subscribe();
//! call.start()?;
//! call.handle_signaling_event(SignalingEvent::RemoteAccepted)?;
//!
//! while let Ok(event) = events.recv().await {
//!     if let InteractionEvent::QualityChanged { quality } = event {
//!         println!("quality: {}", quality.description());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub(crate) mod adaptive;
pub mod config;
pub mod error;
pub mod events;
pub mod interaction;
pub mod media;
pub mod quality;
pub mod signaling;
pub mod types;
pub mod work;

// Re-export main types
pub use config::{AdaptivePolicyConfig, InteractionConfig, QualityModelConfig, QualityMonitorConfig};
pub use error::{InteractionError, InteractionResult};
pub use events::{EventStream, InteractionEvent, InteractionListener};
pub use interaction::{Interaction, PendingOperation};
pub use media::MediaController;
pub use quality::{
    QualityBucket, QualityCalculator, QualityMonitorState, QualityScore, TransportSample,
    VideoStats,
};
pub use signaling::{SignalingChannel, SignalingEvent};
pub use types::{
    AudioDetails, DtmfTone, InteractionId, InteractionKind, InteractionState, MonitorStats,
    VideoDetails,
};
pub use work::{Resource, Service, Work};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
