//! Property tests for the quality calculator

use proptest::prelude::*;
use rvoip_interaction_core::quality::{MAX_MOS, MIN_MOS};
use rvoip_interaction_core::{QualityBucket, QualityCalculator, TransportSample, VideoStats};

/// Float slack for comparisons across f32 rounding
const EPSILON: f32 = 1e-4;

fn sample_strategy() -> impl Strategy<Value = TransportSample> {
    (0u32..2_000, 0u32..500, 0u32..500, 0.0f32..100.0)
        .prop_map(|(rtt, jrx, jtx, loss)| TransportSample::audio(rtt, jrx, jtx, loss))
}

fn video_strategy() -> impl Strategy<Value = VideoStats> {
    (prop_oneof![Just((640, 360)), Just((1280, 720)), Just((1920, 1080))], 0.0f32..60.0, 0u32..4_000)
        .prop_map(|((w, h), fps, kbps)| VideoStats::new(w, h, fps, kbps))
}

proptest! {
    #[test]
    fn score_is_bounded_and_deterministic(sample in sample_strategy()) {
        let calc = QualityCalculator::default();
        let first = calc.score(&sample);
        let second = calc.score(&sample);

        prop_assert!(first.mos >= MIN_MOS && first.mos <= MAX_MOS, "mos = {}", first.mos);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first.bucket, calc.bucket(first.mos));
    }

    #[test]
    fn lower_delay_never_lowers_the_score(sample in sample_strategy(), cut in 0u32..2_000) {
        let calc = QualityCalculator::default();
        let mut better = sample.clone();
        better.round_trip_time_ms = sample.round_trip_time_ms.saturating_sub(cut);
        better.jitter_rx_ms = sample.jitter_rx_ms.saturating_sub(cut / 4);
        better.jitter_tx_ms = sample.jitter_tx_ms.saturating_sub(cut / 4);

        prop_assert!(calc.score(&better).mos + EPSILON >= calc.score(&sample).mos);
    }

    #[test]
    fn lower_loss_never_lowers_the_score(sample in sample_strategy(), cut in 0.0f32..100.0) {
        let calc = QualityCalculator::default();
        let mut better = sample.clone();
        better.packet_loss_percent = (sample.packet_loss_percent - cut).max(0.0);

        prop_assert!(calc.score(&better).mos + EPSILON >= calc.score(&sample).mos);
    }

    #[test]
    fn video_only_ever_caps_the_audio_score(sample in sample_strategy(), video in video_strategy()) {
        let calc = QualityCalculator::default();
        let audio = calc.score(&sample);
        let with_video = calc.score(&sample.clone().with_video(video));

        prop_assert!(with_video.mos <= audio.mos + EPSILON);
        prop_assert!(with_video.mos >= MIN_MOS);
    }

    #[test]
    fn bucket_is_a_non_decreasing_step_function(a in 1.0f32..=5.0, b in 1.0f32..=5.0) {
        let calc = QualityCalculator::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(calc.bucket(low) <= calc.bucket(high));
    }
}

#[test]
fn bucket_edges_follow_cut_points() {
    let calc = QualityCalculator::default();
    assert_eq!(calc.bucket(4.0), QualityBucket::Excellent);
    assert_eq!(calc.bucket(3.999), QualityBucket::Good);
    assert_eq!(calc.bucket(3.5), QualityBucket::Good);
    assert_eq!(calc.bucket(3.0), QualityBucket::Fair);
    assert_eq!(calc.bucket(2.0), QualityBucket::Poor);
    assert_eq!(calc.bucket(1.999), QualityBucket::Bad);
    assert_eq!(calc.bucket(MIN_MOS), QualityBucket::Bad);
}
