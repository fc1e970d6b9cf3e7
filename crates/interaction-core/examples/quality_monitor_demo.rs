//! Quality Monitoring & Adaptive Video Demo
//!
//! Runs one simulated video call whose network degrades and then recovers,
//! printing the quality and video events the interaction raises.
//!
//! ```text
//! RUST_LOG=rvoip_interaction_core=debug cargo run --example quality_monitor_demo
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rvoip_interaction_core::{
    AdaptivePolicyConfig, DtmfTone, InteractionConfig, InteractionListener, InteractionResult,
    MediaController, QualityBucket, SignalingChannel, SignalingEvent, TransportSample, VideoStats,
    Work,
};
use tokio::time::sleep;

/// Media layer replaying a scripted network: good, congested, then good again
struct SimulatedNetwork {
    tick: AtomicU32,
}

#[async_trait]
impl MediaController for SimulatedNetwork {
    async fn transport_sample(&self) -> InteractionResult<TransportSample> {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst);
        let sample = match tick {
            0..=2 => TransportSample::audio(40, 4, 6, 0.2),
            3..=8 => TransportSample::audio(380, 70, 90, 7.5),
            _ => TransportSample::audio(60, 8, 8, 0.5),
        };
        let video = if (3..=8).contains(&tick) {
            VideoStats::new(1280, 720, 9.0, 400)
        } else {
            VideoStats::new(1280, 720, 30.0, 1_400)
        };
        Ok(sample.with_video(video))
    }

    async fn set_video_enabled(&self, enabled: bool) {
        println!("   🎥 media layer: video {}", if enabled { "on" } else { "off" });
    }
}

/// Signaling that accepts everything immediately
struct LoopbackSignaling;

#[async_trait]
impl SignalingChannel for LoopbackSignaling {
    async fn start(&self, destination: Option<String>) -> InteractionResult<()> {
        println!("   📡 INVITE {}", destination.unwrap_or_default());
        Ok(())
    }

    async fn end(&self) -> InteractionResult<()> {
        println!("   📡 BYE");
        Ok(())
    }

    async fn hold(&self) -> InteractionResult<()> {
        Ok(())
    }

    async fn unhold(&self) -> InteractionResult<()> {
        Ok(())
    }

    async fn send_dtmf(&self, tone: DtmfTone) -> InteractionResult<()> {
        println!("   📡 DTMF {}", tone.as_char());
        Ok(())
    }
}

struct ConsoleListener;

#[async_trait]
impl InteractionListener for ConsoleListener {
    async fn on_interaction_active(&self) {
        println!("✅ Call active");
    }

    async fn on_interaction_ended(&self) {
        println!("👋 Call ended");
    }

    async fn on_quality_changed(&self, quality: QualityBucket) {
        println!("📊 Quality: {:?} ({})", quality, quality.description());
    }

    async fn on_video_disabled_below_threshold(&self, quality: QualityBucket) {
        println!("⚠️  Video disabled, quality stuck at {:?}", quality);
    }

    async fn on_video_can_be_enabled_threshold_crossed(&self, quality: QualityBucket) {
        println!("🔄 Video restored, quality back to {:?}", quality);
    }

    async fn on_discard_complete(&self) {
        println!("🧹 Resources released");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    println!("📊 Quality Monitoring & Adaptive Video Demo");
    println!("===========================================");

    let config = InteractionConfig::video()
        .with_destination("sip:support@example.com")
        .with_sample_interval(Duration::from_secs(1))
        .with_sample_timeout(Duration::from_millis(500))
        .with_adaptive_policy(AdaptivePolicyConfig::enabled(
            QualityBucket::Poor,
            Duration::from_secs(3),
        ));

    let work = Work::new()
        .with_topic("support")
        .with_locale("en_US")
        .with_video_config(config);

    let call = work.create_video_interaction(
        Arc::new(SimulatedNetwork { tick: AtomicU32::new(0) }),
        Arc::new(LoopbackSignaling),
    )?;
    call.set_listener(Arc::new(ConsoleListener));

    call.start()?;
    call.handle_signaling_event(SignalingEvent::RemoteAlerting)?;
    call.handle_signaling_event(SignalingEvent::RemoteAccepted)?;
    call.send_dtmf(DtmfTone::One)?.await?;

    sleep(Duration::from_secs(14)).await;

    if let Some(audio) = call.audio_details() {
        println!(
            "\n📈 Last sample: rtt {}ms, loss {:.1}%, MOS {:.2}",
            audio.round_trip_time_ms, audio.packet_loss_percent, audio.score.mos
        );
    }
    let stats = call.monitor_stats();
    println!(
        "📈 Monitor: {} ticks, {} applied, {} unavailable",
        stats.ticks, stats.samples_applied, stats.samples_unavailable
    );
    println!("⏱️  Call time: {:?}", call.time_elapsed());

    call.end()?;
    work.discard_all();
    sleep(Duration::from_millis(200)).await;

    Ok(())
}
