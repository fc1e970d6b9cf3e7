//! Transport metrics sampled from the media layer

use serde::{Deserialize, Serialize};

/// One transport-metrics sample, produced by the media layer per sampling tick
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransportSample {
    /// Round-trip time in milliseconds (RFC 3550)
    pub round_trip_time_ms: u32,
    /// Average jitter on the receive path in milliseconds
    pub jitter_rx_ms: u32,
    /// Average jitter on the transmit path in milliseconds
    pub jitter_tx_ms: u32,
    /// Packet loss percentage (0.0-100.0)
    pub packet_loss_percent: f32,
    /// Video stream statistics, when the interaction carries video
    pub video: Option<VideoStats>,
}

/// Video statistics carried by a [`TransportSample`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoStats {
    pub width: u32,
    pub height: u32,
    /// Actual frames per second
    pub frame_rate: f32,
    /// Actual bitrate in kbps
    pub bitrate_kbps: u32,
    /// Target bitrate negotiated for the stream, if known
    pub target_bitrate_kbps: Option<u32>,
}

impl TransportSample {
    /// Audio-only sample
    pub fn audio(round_trip_time_ms: u32, jitter_rx_ms: u32, jitter_tx_ms: u32, packet_loss_percent: f32) -> Self {
        Self {
            round_trip_time_ms,
            jitter_rx_ms,
            jitter_tx_ms,
            packet_loss_percent,
            video: None,
        }
    }

    /// Attach video statistics
    pub fn with_video(mut self, video: VideoStats) -> Self {
        self.video = Some(video);
        self
    }

    /// Mean of receive and transmit jitter
    pub fn average_jitter_ms(&self) -> f32 {
        (self.jitter_rx_ms as f32 + self.jitter_tx_ms as f32) / 2.0
    }

    /// Effective one-way delay: half the round trip plus average jitter
    pub fn effective_delay_ms(&self) -> f32 {
        self.round_trip_time_ms as f32 / 2.0 + self.average_jitter_ms()
    }
}

impl VideoStats {
    pub fn new(width: u32, height: u32, frame_rate: f32, bitrate_kbps: u32) -> Self {
        Self {
            width,
            height,
            frame_rate,
            bitrate_kbps,
            target_bitrate_kbps: None,
        }
    }

    /// Target bitrate, falling back to a resolution-based default
    pub fn expected_bitrate_kbps(&self) -> u32 {
        if let Some(target) = self.target_bitrate_kbps {
            return target;
        }
        match self.width.saturating_mul(self.height) {
            p if p >= 1920 * 1080 => 2_500,
            p if p >= 1280 * 720 => 1_500,
            p if p >= 640 * 360 => 600,
            _ => 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_delay_is_half_rtt_plus_average_jitter() {
        let sample = TransportSample::audio(100, 10, 30, 0.0);
        assert_eq!(sample.average_jitter_ms(), 20.0);
        assert_eq!(sample.effective_delay_ms(), 70.0);
    }

    #[test]
    fn test_expected_bitrate_prefers_negotiated_target() {
        let mut video = VideoStats::new(1280, 720, 30.0, 900);
        assert_eq!(video.expected_bitrate_kbps(), 1_500);
        video.target_bitrate_kbps = Some(1_000);
        assert_eq!(video.expected_bitrate_kbps(), 1_000);
        assert_eq!(VideoStats::new(320, 240, 15.0, 200).expected_bitrate_kbps(), 300);
    }
}
