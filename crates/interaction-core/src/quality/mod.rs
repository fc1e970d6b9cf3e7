//! Call-quality monitoring
//!
//! - [`metrics`] - transport samples supplied by the media layer
//! - [`estimation`] - pure scoring of a sample into a MOS and a bucket
//! - [`tracker`] - hysteresis over successive scores
//! - `sampler` - the periodic task that feeds the tracker

pub mod estimation;
pub mod metrics;
pub(crate) mod sampler;
pub mod tracker;

pub use estimation::{QualityBucket, QualityCalculator, QualityScore, MAX_MOS, MIN_MOS};
pub use metrics::{TransportSample, VideoStats};
pub use tracker::{QualityMonitorState, QualityStateTracker, TrackerDecision, VideoAction};
