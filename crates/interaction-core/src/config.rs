//! Interaction configuration structures and presets
//!
//! Configuration is constructor-injected and immutable once an interaction has
//! been created. Every structure derives `Serialize`/`Deserialize` with
//! `#[serde(default)]`, so partial documents load with defaults filled in.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │      InteractionConfig       │
//! │ ┌──────────────────────────┐ │
//! │ │ QualityMonitorConfig     │ │  • sample period & fetch timeout
//! │ │ AdaptivePolicyConfig     │ │  • video disable threshold & hysteresis
//! │ │ QualityModelConfig       │ │  • E-model tunables & bucket cut points
//! │ └──────────────────────────┘ │
//! └──────────────────────────────┘
//! ```
//!
//! # Usage Examples
//!
//! ```rust
//! use rvoip_interaction_core::{AdaptivePolicyConfig, InteractionConfig, QualityBucket};
//! use std::time::Duration;
//!
//! let config = InteractionConfig::video()
//!     .with_destination("sip:agent@example.com")
//!     .with_sample_interval(Duration::from_secs(2))
//!     .with_adaptive_policy(AdaptivePolicyConfig::enabled(
//!         QualityBucket::Poor,
//!         Duration::from_secs(10),
//!     ));
//!
//! assert!(config.validate().is_ok());
//! assert!(config.adaptive_policy.enabled);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{InteractionError, InteractionResult};
use crate::quality::QualityBucket;
use crate::types::InteractionKind;

/// Settings for the periodic quality sampler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityMonitorConfig {
    /// Whether the sampler is armed when the interaction is established
    pub enabled: bool,
    /// Sampling period in milliseconds
    pub sample_interval_ms: u64,
    /// Upper bound on one sample fetch; a slower fetch counts as unavailable
    pub sample_timeout_ms: u64,
}

impl Default for QualityMonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_interval_ms: 5_000,
            sample_timeout_ms: 2_000,
        }
    }
}

impl QualityMonitorConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

/// Bandwidth-adaptive video policy
///
/// Video is disabled once the quality bucket has stayed at or below
/// `disable_threshold` for `sustained_poor_duration_ms`, and re-enabled on the
/// first sample above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptivePolicyConfig {
    /// Whether the policy runs at all
    pub enabled: bool,
    /// Buckets at or below this one count as poor
    pub disable_threshold: QualityBucket,
    /// How long poor quality must persist before video is disabled
    pub sustained_poor_duration_ms: u64,
}

impl Default for AdaptivePolicyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            disable_threshold: QualityBucket::Poor,
            sustained_poor_duration_ms: 10_000,
        }
    }
}

impl AdaptivePolicyConfig {
    /// An enabled policy with the given threshold and hysteresis window
    pub fn enabled(disable_threshold: QualityBucket, sustained_poor_duration: Duration) -> Self {
        Self {
            enabled: true,
            disable_threshold,
            sustained_poor_duration_ms: sustained_poor_duration.as_millis() as u64,
        }
    }

    pub fn sustained_poor_duration(&self) -> Duration {
        Duration::from_millis(self.sustained_poor_duration_ms)
    }
}

/// Tunables of the simplified E-model used to score transport samples
///
/// Cut points are MOS lower bounds for Excellent, Good, Fair and Poor; anything
/// below the last one is Bad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityModelConfig {
    /// Codec base R-factor (G.711: 93.2, G.722: 94.3, G.729: 82.0, Opus: 93.5)
    pub base_r_factor: f32,
    /// Packet loss percentage above which the loss penalty steepens
    pub loss_knee_percent: f32,
    /// Frame rate a healthy video stream is expected to reach
    pub target_frame_rate: f32,
    /// MOS lower bounds for Excellent, Good, Fair, Poor
    pub bucket_cut_points: [f32; 4],
}

impl Default for QualityModelConfig {
    fn default() -> Self {
        Self {
            base_r_factor: 93.2,
            loss_knee_percent: 2.0,
            target_frame_rate: 30.0,
            bucket_cut_points: [4.0, 3.5, 3.0, 2.0],
        }
    }
}

impl QualityModelConfig {
    /// Check that the model stays within the score range
    pub fn validate(&self) -> InteractionResult<()> {
        if !(0.0..=100.0).contains(&self.base_r_factor) {
            return Err(InteractionError::config(format!(
                "base_r_factor {} outside 0-100",
                self.base_r_factor
            )));
        }
        if self.loss_knee_percent < 0.0 || self.target_frame_rate <= 0.0 {
            return Err(InteractionError::config(
                "loss_knee_percent must be >= 0 and target_frame_rate > 0",
            ));
        }
        let cuts = &self.bucket_cut_points;
        if cuts.iter().any(|c| !(1.0..=5.0).contains(c)) {
            return Err(InteractionError::config("bucket cut points must lie in [1.0, 5.0]"));
        }
        if cuts.windows(2).any(|w| w[0] <= w[1]) {
            return Err(InteractionError::config("bucket cut points must be strictly descending"));
        }
        Ok(())
    }
}

/// Complete configuration of one interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Audio-only or audio+video
    pub kind: InteractionKind,
    /// Remote address (for SIP, the unescaped URI of the far end)
    pub destination_address: Option<String>,
    /// Timeout for hold, unhold, DTMF and end acknowledgements
    pub operation_timeout_ms: u64,
    /// Initial video enabled state for video interactions
    pub start_with_video: bool,
    /// Quality sampler settings
    pub monitor: QualityMonitorConfig,
    /// Adaptive video policy
    pub adaptive_policy: AdaptivePolicyConfig,
    /// Scoring model
    pub model: QualityModelConfig,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            kind: InteractionKind::Audio,
            destination_address: None,
            operation_timeout_ms: 10_000,
            start_with_video: false,
            monitor: QualityMonitorConfig::default(),
            adaptive_policy: AdaptivePolicyConfig::default(),
            model: QualityModelConfig::default(),
        }
    }
}

impl InteractionConfig {
    /// Audio-only interaction with default settings
    pub fn audio() -> Self {
        Self::default()
    }

    /// Video interaction, video on at start, adaptive policy off
    pub fn video() -> Self {
        Self {
            kind: InteractionKind::Video,
            start_with_video: true,
            ..Self::default()
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination_address = Some(destination.into());
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.monitor.sample_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_sample_timeout(mut self, timeout: Duration) -> Self {
        self.monitor.sample_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_monitor(mut self, monitor: QualityMonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_adaptive_policy(mut self, policy: AdaptivePolicyConfig) -> Self {
        self.adaptive_policy = policy;
        self
    }

    pub fn with_model(mut self, model: QualityModelConfig) -> Self {
        self.model = model;
        self
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Reject configurations the monitor cannot run with
    pub fn validate(&self) -> InteractionResult<()> {
        if self.operation_timeout_ms == 0 {
            return Err(InteractionError::config("operation_timeout_ms must be > 0"));
        }
        if self.monitor.sample_interval_ms == 0 {
            return Err(InteractionError::config("sample_interval_ms must be > 0"));
        }
        if self.monitor.sample_timeout_ms == 0
            || self.monitor.sample_timeout_ms > self.monitor.sample_interval_ms
        {
            return Err(InteractionError::config(
                "sample_timeout_ms must be > 0 and no longer than sample_interval_ms",
            ));
        }
        self.model.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(InteractionConfig::audio().validate().is_ok());
        assert!(InteractionConfig::video().validate().is_ok());
        assert!(!InteractionConfig::default().adaptive_policy.enabled);
    }

    #[test]
    fn test_sample_timeout_longer_than_interval_is_rejected() {
        let config = InteractionConfig::audio()
            .with_sample_interval(Duration::from_secs(1))
            .with_sample_timeout(Duration::from_secs(2));
        assert!(matches!(
            config.validate(),
            Err(InteractionError::Configuration { .. })
        ));
    }

    #[test]
    fn test_cut_points_must_descend() {
        let model = QualityModelConfig {
            bucket_cut_points: [4.0, 3.0, 3.5, 2.0],
            ..Default::default()
        };
        assert!(model.validate().is_err());

        let model = QualityModelConfig {
            bucket_cut_points: [5.5, 3.5, 3.0, 2.0],
            ..Default::default()
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "kind": "Video",
            "adaptive_policy": { "enabled": true, "disable_threshold": "Fair" }
        }"#;
        let config: InteractionConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.kind, InteractionKind::Video);
        assert!(config.adaptive_policy.enabled);
        assert_eq!(config.adaptive_policy.disable_threshold, QualityBucket::Fair);
        assert_eq!(config.adaptive_policy.sustained_poor_duration_ms, 10_000);
        assert_eq!(config.monitor.sample_interval_ms, 5_000);
        assert!(config.validate().is_ok());
    }
}
