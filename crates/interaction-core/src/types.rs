//! Core types shared across interaction-core
//!
//! - **Lifecycle** - [`InteractionState`], [`InteractionKind`], [`InteractionId`]
//! - **Signaling payloads** - [`DtmfTone`]
//! - **Detail snapshots** - [`AudioDetails`], [`VideoDetails`], [`MonitorStats`]

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quality::{QualityScore, TransportSample};

/// Unique identifier for an interaction
pub type InteractionId = Uuid;

/// Lifecycle state of one interaction
///
/// ```text
/// Idle -> Initiating -> RemoteAlerting -> Established -> Ending -> Ended
///            \________________\________________\___________\-> Failed
/// ```
///
/// `Ended` and `Failed` are terminal. Any non-terminal state may move to
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionState {
    /// Created, not started
    Idle,
    /// Start requested, no response from the far end yet
    Initiating,
    /// Far end is alerting
    RemoteAlerting,
    /// Media is flowing
    Established,
    /// Local end requested, waiting for the far end
    Ending,
    /// Ended by either side
    Ended,
    /// Unrecoverable failure
    Failed,
}

impl InteractionState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Failed)
    }

    /// Whether the interaction is on its way out (ending or already terminal)
    pub fn is_tearing_down(&self) -> bool {
        matches!(self, Self::Ending | Self::Ended | Self::Failed)
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Initiating => "Initiating",
            Self::RemoteAlerting => "RemoteAlerting",
            Self::Established => "Established",
            Self::Ending => "Ending",
            Self::Ended => "Ended",
            Self::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Media kind of an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionKind {
    /// Audio only; video operations are rejected
    Audio,
    /// Audio plus video; adaptive video policy applies
    Video,
}

impl InteractionKind {
    /// Whether video operations are available
    pub fn has_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

/// DTMF tone (RFC 4733 event codes 0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DtmfTone {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Star,
    Pound,
    A,
    B,
    C,
    D,
}

impl DtmfTone {
    /// Parse a keypad character
    ///
    /// ```rust
    /// use rvoip_interaction_core::DtmfTone;
    ///
    /// assert_eq!(DtmfTone::from_char('#'), Some(DtmfTone::Pound));
    /// assert_eq!(DtmfTone::from_char('x'), None);
    /// ```
    pub fn from_char(c: char) -> Option<Self> {
        let tone = match c.to_ascii_uppercase() {
            '0' => Self::Zero,
            '1' => Self::One,
            '2' => Self::Two,
            '3' => Self::Three,
            '4' => Self::Four,
            '5' => Self::Five,
            '6' => Self::Six,
            '7' => Self::Seven,
            '8' => Self::Eight,
            '9' => Self::Nine,
            '*' => Self::Star,
            '#' => Self::Pound,
            'A' => Self::A,
            'B' => Self::B,
            'C' => Self::C,
            'D' => Self::D,
            _ => return None,
        };
        Some(tone)
    }

    /// Keypad character for this tone
    pub fn as_char(&self) -> char {
        match self {
            Self::Zero => '0',
            Self::One => '1',
            Self::Two => '2',
            Self::Three => '3',
            Self::Four => '4',
            Self::Five => '5',
            Self::Six => '6',
            Self::Seven => '7',
            Self::Eight => '8',
            Self::Nine => '9',
            Self::Star => '*',
            Self::Pound => '#',
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }

    /// RFC 4733 event code
    pub fn event_code(&self) -> u8 {
        *self as u8
    }
}

/// Latest audio-side snapshot derived from a transport sample
///
/// Kept after the interaction ends, so the last values seen before teardown
/// remain readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioDetails {
    /// Round-trip time in milliseconds
    pub round_trip_time_ms: u32,
    /// Average receive jitter in milliseconds
    pub jitter_rx_ms: u32,
    /// Average transmit jitter in milliseconds
    pub jitter_tx_ms: u32,
    /// Packet loss percentage (0.0-100.0)
    pub packet_loss_percent: f32,
    /// Score computed from this sample
    pub score: QualityScore,
    /// When the sample was applied
    pub sampled_at: DateTime<Utc>,
}

/// Latest video-side snapshot derived from a transport sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub width: u32,
    pub height: u32,
    /// Frames per second
    pub frame_rate: f32,
    /// Bitrate in kbps
    pub bitrate_kbps: u32,
    /// When the sample was applied
    pub sampled_at: DateTime<Utc>,
}

impl AudioDetails {
    pub(crate) fn from_sample(sample: &TransportSample, score: QualityScore, at: DateTime<Utc>) -> Self {
        Self {
            round_trip_time_ms: sample.round_trip_time_ms,
            jitter_rx_ms: sample.jitter_rx_ms,
            jitter_tx_ms: sample.jitter_tx_ms,
            packet_loss_percent: sample.packet_loss_percent,
            score,
            sampled_at: at,
        }
    }
}

impl VideoDetails {
    pub(crate) fn from_sample(sample: &TransportSample, at: DateTime<Utc>) -> Option<Self> {
        sample.video.as_ref().map(|video| Self {
            width: video.width,
            height: video.height,
            frame_rate: video.frame_rate,
            bitrate_kbps: video.bitrate_kbps,
            sampled_at: at,
        })
    }
}

/// Counters kept by the quality monitor of one interaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    /// Timer ticks that started a sample fetch
    pub ticks: u64,
    /// Samples scored and applied to the tracker
    pub samples_applied: u64,
    /// Ticks that found metrics unavailable or timed out
    pub samples_unavailable: u64,
    /// Samples that completed after teardown and were dropped
    pub late_samples_discarded: u64,
}
