//! Arming, disarming and feeding the quality monitor
//!
//! The monitor slot is the serialization point between sampler ticks and
//! teardown: a tick applies its result only while holding the slot and only if
//! its epoch is still current. Disarming bumps the epoch under the same lock,
//! so a fetch that completes afterwards is counted and dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::InteractionInner;
use crate::adaptive::{AdaptiveVideoController, VideoControl};
use crate::config::AdaptivePolicyConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::events::InteractionEvent;
use crate::quality::sampler::{QualitySampler, SampleSink};
use crate::quality::{QualityMonitorState, QualityStateTracker, TransportSample};
use crate::types::{AudioDetails, InteractionState, MonitorStats, VideoDetails};

/// Monitor state owned by one interaction
#[derive(Debug, Default)]
pub(crate) struct MonitorSlot {
    /// Bumped on every arm and disarm
    epoch: u64,
    /// Present only while armed
    tracker: Option<QualityStateTracker>,
    task: Option<JoinHandle<()>>,
    stats: MonitorStats,
}

impl MonitorSlot {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.tracker.is_some()
    }
}

impl InteractionInner {
    /// Start sampling; called after entering `Established`
    pub(super) fn arm_monitor(self: &Arc<Self>) {
        if !self.config.monitor.enabled {
            debug!("Quality monitor disabled for interaction {}", self.id);
            return;
        }

        let mut slot = self.monitor.lock();
        if slot.tracker.is_some() || self.state() != InteractionState::Established {
            return;
        }

        slot.epoch += 1;
        slot.tracker = Some(QualityStateTracker::new(self.adaptive_policy()));
        if let Some(previous) = slot.task.take() {
            previous.abort();
        }

        let sampler = QualitySampler::new(
            self.config.monitor.sample_interval(),
            self.config.monitor.sample_timeout(),
        );
        slot.task = Some(sampler.spawn(slot.epoch, self.media.clone(), Arc::downgrade(self)));
        info!(
            "Quality monitor armed for interaction {} (epoch {}, every {}ms)",
            self.id, slot.epoch, self.config.monitor.sample_interval_ms
        );
    }

    /// Stop applying samples; called on leaving `Established`
    pub(super) fn disarm_monitor(&self) {
        let mut slot = self.monitor.lock();
        if slot.tracker.take().is_some() {
            slot.epoch += 1;
            info!("Quality monitor disarmed for interaction {}", self.id);
        }
    }

    /// Disarm and stop the sampler task outright
    pub(super) fn release_monitor(&self) {
        self.disarm_monitor();
        if let Some(task) = self.monitor.lock().task.take() {
            task.abort();
        }
    }

    pub(super) fn monitor_state(&self) -> Option<QualityMonitorState> {
        self.monitor.lock().tracker.as_ref().map(|tracker| tracker.state().clone())
    }

    pub(super) fn monitor_stats(&self) -> MonitorStats {
        self.monitor.lock().stats
    }

    /// Adaptive policy actually applied; audio calls never run it
    fn adaptive_policy(&self) -> AdaptivePolicyConfig {
        let mut policy = self.config.adaptive_policy.clone();
        if !self.config.kind.has_video() {
            policy.enabled = false;
        }
        policy
    }
}

impl SampleSink for InteractionInner {
    fn tick_started(&self, epoch: u64) -> bool {
        let mut slot = self.monitor.lock();
        if !slot.is_current(epoch) {
            return false;
        }
        slot.stats.ticks += 1;
        true
    }

    fn deliver(&self, epoch: u64, sample: TransportSample) -> bool {
        let score = self.calculator.score(&sample);

        let mut slot = self.monitor.lock();
        if !slot.is_current(epoch) || self.state() != InteractionState::Established {
            slot.stats.late_samples_discarded += 1;
            warn!(
                "Discarding sample for interaction {} that completed after teardown",
                self.id
            );
            return false;
        }

        slot.stats.samples_applied += 1;
        let Some(tracker) = slot.tracker.as_mut() else {
            return false;
        };
        let decision = tracker.on_score(score, Instant::now());

        let sampled_at = Utc::now();
        {
            let mut details = self.details.write();
            details.audio = Some(AudioDetails::from_sample(&sample, score, sampled_at));
            if let Some(video) = VideoDetails::from_sample(&sample, sampled_at) {
                details.video = Some(video);
            }
        }
        debug!(
            "Interaction {} sample: mos {:.2}, r {:.1}, {:?}",
            self.id, score.mos, score.r_factor, score.bucket
        );

        // Emitted while the slot is held so quality events stay in tick order
        if let Some(quality) = decision.quality_changed {
            info!("Interaction {} quality changed to {:?}", self.id, quality);
            self.emitter.emit(InteractionEvent::QualityChanged { quality });
        }
        if let Some(action) = decision.video_action {
            if let Some(event) = AdaptiveVideoController.apply(action, self) {
                self.emitter.emit(event);
            }
        }
        true
    }

    fn unavailable(&self, epoch: u64, error: InteractionError) -> bool {
        let mut slot = self.monitor.lock();
        if !slot.is_current(epoch) {
            return false;
        }
        slot.stats.samples_unavailable += 1;
        warn!("Interaction {} skipping quality tick: {}", self.id, error);
        true
    }
}

impl VideoControl for InteractionInner {
    fn set_video_enabled(&self, enabled: bool) -> InteractionResult<()> {
        self.enable_video(enabled)
    }
}
