//! Call quality estimation (simplified ITU-T G.107 E-model)
//!
//! The calculator is pure: the same [`TransportSample`] always yields the same
//! [`QualityScore`], and a single calculator can be shared by any number of
//! interactions without coordination.
//!
//! # Model
//!
//! ```text
//! d    = rtt / 2 + (jitter_rx + jitter_tx) / 2          effective one-way delay
//! Id   = d / 40                       if d < 160
//!        (d - 120) / 10               otherwise
//! Ie   = 2.5 * loss                   if loss <= knee
//!        2.5 * knee + 4 * x + 0.5 * x^2, x = loss - knee
//! R    = clamp(R0 - Id - Ie, 0, 100)
//! MOS  = 1 + 0.035 R + 7e-6 R (R - 60) (100 - R)
//! ```
//!
//! When video statistics are present a video ceiling is derived from the
//! frame-rate and bitrate shortfall against their targets, and the final score
//! is the lower of the audio and video scores. Scores are clamped to
//! [`MIN_MOS`, `MAX_MOS`].

use serde::{Deserialize, Serialize};

use crate::config::QualityModelConfig;
use crate::quality::metrics::{TransportSample, VideoStats};

/// Lowest possible score
pub const MIN_MOS: f32 = 1.0;
/// Highest possible score
pub const MAX_MOS: f32 = 5.0;

/// Score produced by the E-model at R = 100
const MOS_CEILING: f32 = 4.5;

/// Discrete quality category, ordered `Bad < Poor < Fair < Good < Excellent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityBucket {
    /// Nearly all users dissatisfied
    Bad,
    /// Many users dissatisfied
    Poor,
    /// Some users dissatisfied
    Fair,
    /// Satisfied
    Good,
    /// Very satisfied
    Excellent,
}

impl QualityBucket {
    /// Numeric level used by the vendor call-quality enumeration
    pub fn level(&self) -> u8 {
        match self {
            Self::Bad => 0,
            Self::Poor => 1,
            Self::Fair => 3,
            Self::Good => 4,
            Self::Excellent => 5,
        }
    }

    /// Get a description of the quality bucket
    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent quality, very satisfied",
            Self::Good => "Good quality, satisfied",
            Self::Fair => "Fair quality, some users dissatisfied",
            Self::Poor => "Poor quality, many users dissatisfied",
            Self::Bad => "Bad quality, nearly all users dissatisfied",
        }
    }
}

/// Score computed from one transport sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Mean Opinion Score in [1.0, 5.0]
    pub mos: f32,
    /// Audio R-factor (0-100)
    pub r_factor: f32,
    /// Video ceiling, when the sample carried video statistics
    pub video_mos: Option<f32>,
    /// Bucket derived from `mos`
    pub bucket: QualityBucket,
}

/// Quality calculator using a simplified E-model
#[derive(Debug, Clone, Default)]
pub struct QualityCalculator {
    model: QualityModelConfig,
}

impl QualityCalculator {
    /// Create a calculator with the given model tunables
    pub fn new(model: QualityModelConfig) -> Self {
        Self { model }
    }

    /// Model tunables in use
    pub fn model(&self) -> &QualityModelConfig {
        &self.model
    }

    /// Score a transport sample
    ///
    /// ```rust
    /// use rvoip_interaction_core::quality::{QualityBucket, QualityCalculator, TransportSample};
    ///
    /// let calculator = QualityCalculator::default();
    /// let score = calculator.score(&TransportSample::audio(20, 5, 5, 0.0));
    /// assert!(score.mos >= 4.2 && score.mos <= 4.5);
    /// assert_eq!(score.bucket, QualityBucket::Excellent);
    /// ```
    pub fn score(&self, sample: &TransportSample) -> QualityScore {
        let r_factor = self.r_factor(sample);
        let audio_mos = r_factor_to_mos(r_factor);
        let video_mos = sample.video.as_ref().map(|video| self.video_ceiling(video));

        let mos = match video_mos {
            Some(video) => audio_mos.min(video),
            None => audio_mos,
        }
        .clamp(MIN_MOS, MAX_MOS);

        QualityScore {
            mos,
            r_factor,
            video_mos,
            bucket: self.bucket(mos),
        }
    }

    /// Map a MOS value onto a bucket using the configured cut points
    pub fn bucket(&self, mos: f32) -> QualityBucket {
        let [excellent, good, fair, poor] = self.model.bucket_cut_points;
        if mos >= excellent {
            QualityBucket::Excellent
        } else if mos >= good {
            QualityBucket::Good
        } else if mos >= fair {
            QualityBucket::Fair
        } else if mos >= poor {
            QualityBucket::Poor
        } else {
            QualityBucket::Bad
        }
    }

    /// Calculate the audio R-factor: R = R0 - Id - Ie
    fn r_factor(&self, sample: &TransportSample) -> f32 {
        let id = delay_impairment(sample.effective_delay_ms());
        let ie = self.loss_impairment(sanitize_percent(sample.packet_loss_percent));
        (self.model.base_r_factor - id - ie).clamp(0.0, 100.0)
    }

    /// Loss impairment, linear up to the knee and quadratic beyond it
    fn loss_impairment(&self, loss_percent: f32) -> f32 {
        let knee = self.model.loss_knee_percent;
        if loss_percent <= knee {
            return 2.5 * loss_percent;
        }
        let excess = loss_percent - knee;
        2.5 * knee + 4.0 * excess + 0.5 * excess * excess
    }

    /// Video ceiling from frame-rate and bitrate shortfall
    fn video_ceiling(&self, video: &VideoStats) -> f32 {
        let frame_ratio = ratio(video.frame_rate, self.model.target_frame_rate);
        let bitrate_ratio = ratio(video.bitrate_kbps as f32, video.expected_bitrate_kbps() as f32);
        let delivered = 0.6 * frame_ratio + 0.4 * bitrate_ratio;
        MIN_MOS + (MOS_CEILING - MIN_MOS) * delivered
    }
}

/// Score a sample with the default model
pub fn score(sample: &TransportSample) -> QualityScore {
    QualityCalculator::default().score(sample)
}

/// Delay impairment factor for an effective one-way delay
fn delay_impairment(delay_ms: f32) -> f32 {
    if delay_ms < 160.0 {
        delay_ms / 40.0
    } else {
        (delay_ms - 120.0) / 10.0
    }
}

/// Convert R-factor to MOS using the standard G.107 mapping
fn r_factor_to_mos(r: f32) -> f32 {
    if r <= 0.0 {
        return MIN_MOS;
    }
    if r >= 100.0 {
        return MOS_CEILING;
    }
    let mos = 1.0 + 0.035 * r + r * (r - 60.0) * (100.0 - r) * 7.0e-6;
    // The polynomial dips just below 1.0 for R < 6.5
    mos.max(MIN_MOS)
}

fn sanitize_percent(value: f32) -> f32 {
    if value.is_nan() {
        100.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

fn ratio(actual: f32, target: f32) -> f32 {
    if target <= 0.0 || actual.is_nan() {
        return 0.0;
    }
    (actual / target).clamp(0.0, 1.0)
}
