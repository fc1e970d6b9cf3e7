//! Bandwidth-adaptive video control
//!
//! Turns the tracker's [`VideoAction`]s into video commands and the matching
//! application events. Commands go through the same enable-video primitive the
//! application uses, so policy and user share one piece of state and the most
//! recent write wins.

use tracing::{debug, info};

use crate::error::InteractionResult;
use crate::events::InteractionEvent;
use crate::quality::VideoAction;

/// Target of adaptive video commands
pub(crate) trait VideoControl {
    /// Same effect as the application calling `enable_video(enabled)`
    fn set_video_enabled(&self, enabled: bool) -> InteractionResult<()>;
}

/// Applies tracker decisions to an interaction's video
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AdaptiveVideoController;

impl AdaptiveVideoController {
    /// Apply one action; returns the advisory event to emit, if any
    ///
    /// A target that rejects the command (for example an interaction that has
    /// already ended) turns the action into a no-op.
    pub(crate) fn apply(&self, action: VideoAction, target: &dyn VideoControl) -> Option<InteractionEvent> {
        let (enabled, event) = match action {
            VideoAction::Disable(quality) => {
                (false, InteractionEvent::VideoDisabledBelowThreshold { quality })
            }
            VideoAction::Enable(quality) => {
                (true, InteractionEvent::VideoCanBeEnabledThresholdCrossed { quality })
            }
        };

        match target.set_video_enabled(enabled) {
            Ok(()) => {
                info!("Adaptive policy set video enabled={} ({:?})", enabled, action);
                Some(event)
            }
            Err(e) => {
                debug!("Adaptive video action {:?} ignored: {}", action, e);
                None
            }
        }
    }
}
