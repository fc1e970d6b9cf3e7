//! Quality state tracking with asymmetric hysteresis
//!
//! The tracker consumes one [`QualityScore`] per sampling tick and decides:
//!
//! 1. whether the quality bucket changed (reported on every change, no debounce)
//! 2. whether sustained poor quality should disable video
//! 3. whether a recovered sample should re-enable video disabled by policy
//!
//! Degradation needs the bucket to stay at or below the threshold for the whole
//! `sustained_poor_duration`; recovery happens on the first sample above it.
//!
//! The tracker is plain data plus logic and takes the current time as an
//! argument, so it can be driven deterministically.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::AdaptivePolicyConfig;
use crate::quality::estimation::{QualityBucket, QualityScore};

/// Per-interaction monitor state, owned by exactly one interaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityMonitorState {
    /// Score of the last applied sample
    pub previous_score: Option<QualityScore>,
    /// Bucket of the last applied sample
    pub previous_bucket: Option<QualityBucket>,
    /// When the current run of poor-quality samples started
    pub poor_quality_onset: Option<Instant>,
    /// Whether the policy (not the user) turned video off
    pub video_disabled_by_policy: bool,
}

/// Video command decided by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoAction {
    /// Disable video; quality has been poor for the sustained window
    Disable(QualityBucket),
    /// Re-enable video previously disabled by policy
    Enable(QualityBucket),
}

/// Outcome of feeding one score to the tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerDecision {
    /// New bucket, when it differs from the previous one
    pub quality_changed: Option<QualityBucket>,
    /// Video command for the adaptive controller
    pub video_action: Option<VideoAction>,
}

/// Hysteresis state machine over successive quality scores
#[derive(Debug, Clone)]
pub struct QualityStateTracker {
    policy: AdaptivePolicyConfig,
    state: QualityMonitorState,
}

impl QualityStateTracker {
    /// Create a tracker with fresh state
    pub fn new(policy: AdaptivePolicyConfig) -> Self {
        Self {
            policy,
            state: QualityMonitorState::default(),
        }
    }

    /// Current monitor state
    pub fn state(&self) -> &QualityMonitorState {
        &self.state
    }

    /// Policy this tracker applies
    pub fn policy(&self) -> &AdaptivePolicyConfig {
        &self.policy
    }

    /// Apply one score observed at `now`
    pub fn on_score(&mut self, score: QualityScore, now: Instant) -> TrackerDecision {
        let bucket = score.bucket;
        let mut decision = TrackerDecision::default();

        if self.state.previous_bucket != Some(bucket) {
            decision.quality_changed = Some(bucket);
        }

        if bucket <= self.policy.disable_threshold {
            if self.policy.enabled {
                let onset = *self.state.poor_quality_onset.get_or_insert(now);
                let sustained = now.saturating_duration_since(onset);
                if sustained >= self.policy.sustained_poor_duration()
                    && !self.state.video_disabled_by_policy
                {
                    debug!(
                        "Quality {:?} sustained for {:?}, disabling video",
                        bucket, sustained
                    );
                    self.state.video_disabled_by_policy = true;
                    decision.video_action = Some(VideoAction::Disable(bucket));
                }
            }
        } else {
            self.state.poor_quality_onset = None;
            if self.state.video_disabled_by_policy {
                debug!("Quality recovered to {:?}, re-enabling video", bucket);
                self.state.video_disabled_by_policy = false;
                decision.video_action = Some(VideoAction::Enable(bucket));
            }
        }

        self.state.previous_score = Some(score);
        self.state.previous_bucket = Some(bucket);
        decision
    }

    /// How long quality has been poor as of `now`, if it currently is
    pub fn poor_for(&self, now: Instant) -> Option<Duration> {
        self.state
            .poor_quality_onset
            .map(|onset| now.saturating_duration_since(onset))
    }

    /// Forget everything observed so far
    pub fn reset(&mut self) {
        self.state = QualityMonitorState::default();
    }
}
