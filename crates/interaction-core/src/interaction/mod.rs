//! Interaction lifecycle state machine
//!
//! An [`Interaction`] models one audio or audio+video call. Public operations
//! validate against the current [`InteractionState`] synchronously and return
//! [`InteractionError::InvalidState`] without side effects when they do not
//! apply. Accepted operations update local state immediately, emit their
//! status event, and queue any signaling or media side effect on a per-
//! interaction command worker, so callers never wait on the network or on the
//! quality monitor.
//!
//! Entering `Established` arms the quality monitor; leaving it disarms the
//! monitor unconditionally, and samples still in flight are discarded.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rvoip_interaction_core::{
//!     Interaction, InteractionConfig, MediaController, SignalingChannel, SignalingEvent,
//! };
//!
//! # async fn example(
//! #     media: Arc<dyn MediaController>,
//! #     signaling: Arc<dyn SignalingChannel>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let call = Interaction::new(
//!     InteractionConfig::audio().with_destination("sip:support@example.com"),
//!     media,
//!     signaling,
//! )?;
//!
//! call.start()?;
//! // ...the signaling layer later reports the answer
//! call.handle_signaling_event(SignalingEvent::RemoteAccepted)?;
//!
//! call.hold()?.await?;
//! call.unhold()?.await?;
//! call.end()?;
//! # Ok(())
//! # }
//! ```

mod commands;
mod monitor;
mod operation;

pub use operation::PendingOperation;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::InteractionConfig;
use crate::error::{InteractionError, InteractionResult};
use crate::events::{EventEmitter, EventStream, InteractionEvent, InteractionListener};
use crate::media::MediaController;
use crate::quality::{QualityBucket, QualityCalculator, QualityMonitorState};
use crate::signaling::{SignalingChannel, SignalingEvent};
use crate::types::{
    AudioDetails, DtmfTone, InteractionId, InteractionKind, InteractionState, MonitorStats,
    VideoDetails,
};

use commands::Command;
use monitor::MonitorSlot;

/// Handle to one interaction
///
/// Cheap to clone; all clones drive the same interaction.
#[derive(Clone)]
pub struct Interaction {
    inner: Arc<InteractionInner>,
}

/// Local call state guarded by the core lock
#[derive(Debug)]
struct CoreState {
    state: InteractionState,
    held: bool,
    remote_held: bool,
    audio_muted: bool,
    video_muted: bool,
    video_enabled: bool,
    established_at: Option<Instant>,
    ended_at: Option<Instant>,
}

/// Latest detail snapshots; kept after the interaction ends
#[derive(Debug, Default)]
struct MediaDetails {
    audio: Option<AudioDetails>,
    video: Option<VideoDetails>,
}

/// Shared state behind an [`Interaction`]
///
/// Lock order is `monitor`, then `core`, then the emitter's internal lock.
/// `core` is never held while acquiring `monitor`.
pub(crate) struct InteractionInner {
    id: InteractionId,
    config: InteractionConfig,
    calculator: QualityCalculator,
    core: Mutex<CoreState>,
    state_tx: watch::Sender<InteractionState>,
    emitter: EventEmitter,
    media: Arc<dyn MediaController>,
    signaling: Arc<dyn SignalingChannel>,
    command_tx: mpsc::UnboundedSender<Command>,
    monitor: Mutex<MonitorSlot>,
    details: RwLock<MediaDetails>,
    discard_requested: AtomicBool,
}

impl Interaction {
    /// Create an interaction in `Idle`
    ///
    /// Must be called from within a tokio runtime; the interaction spawns its
    /// command worker and event dispatcher on it.
    pub fn new(
        config: InteractionConfig,
        media: Arc<dyn MediaController>,
        signaling: Arc<dyn SignalingChannel>,
    ) -> InteractionResult<Self> {
        config.validate()?;
        Handle::try_current()
            .map_err(|_| InteractionError::internal("interactions must be created inside a tokio runtime"))?;

        let id = Uuid::new_v4();
        let (state_tx, _) = watch::channel(InteractionState::Idle);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let video_enabled = config.kind.has_video() && config.start_with_video;

        let inner = Arc::new(InteractionInner {
            id,
            calculator: QualityCalculator::new(config.model.clone()),
            core: Mutex::new(CoreState {
                state: InteractionState::Idle,
                held: false,
                remote_held: false,
                audio_muted: false,
                video_muted: false,
                video_enabled,
                established_at: None,
                ended_at: None,
            }),
            state_tx,
            emitter: EventEmitter::spawn(id),
            media,
            signaling,
            command_tx,
            monitor: Mutex::new(MonitorSlot::default()),
            details: RwLock::new(MediaDetails::default()),
            discard_requested: AtomicBool::new(false),
            config,
        });

        tokio::spawn(commands::run_worker(Arc::downgrade(&inner), command_rx));
        debug!("Created {:?} interaction {}", inner.config.kind, id);

        Ok(Self { inner })
    }

    // ===== Identity and configuration =====

    pub fn id(&self) -> InteractionId {
        self.inner.id
    }

    pub fn kind(&self) -> InteractionKind {
        self.inner.config.kind
    }

    /// Remote address this interaction was created for
    pub fn destination_address(&self) -> Option<&str> {
        self.inner.config.destination_address.as_deref()
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.inner.config
    }

    // ===== Events =====

    /// Register the application listener, replacing any previous one
    pub fn set_listener(&self, listener: Arc<dyn InteractionListener>) {
        self.inner.emitter.set_listener(listener);
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<InteractionEvent> {
        self.inner.emitter.subscribe()
    }

    /// Events emitted from now on, as a stream
    pub fn event_stream(&self) -> EventStream {
        self.inner.emitter.event_stream()
    }

    // ===== Lifecycle =====

    /// Place the call: `Idle -> Initiating`
    pub fn start(&self) -> InteractionResult<()> {
        {
            let mut core = self.inner.core.lock();
            if core.state != InteractionState::Idle {
                return Err(InteractionError::invalid_state("start", core.state));
            }
            self.inner.set_state(&mut core, InteractionState::Initiating);
            self.inner.emitter.emit(InteractionEvent::Initiating);
        }
        info!("Interaction {} starting", self.inner.id);
        self.inner.send(Command::Start)
    }

    /// End the call: `-> Ending -> Ended`
    ///
    /// An interaction that was never started ends at once without signaling.
    /// Calling `end` while already `Ending` is a no-op.
    pub fn end(&self) -> InteractionResult<()> {
        self.inner.end()
    }

    /// End the call if needed and release local resources
    ///
    /// Idempotent: only the first call has any effect, and `discardComplete`
    /// is emitted once the interaction has finished ending.
    pub fn discard(&self) -> InteractionResult<()> {
        self.inner.discard()
    }

    /// Feed a lifecycle event reported by the signaling layer
    pub fn handle_signaling_event(&self, event: SignalingEvent) -> InteractionResult<()> {
        self.inner.handle_signaling_event(event)
    }

    // ===== Call control =====

    /// Put the far end on hold; valid only while `Established`
    pub fn hold(&self) -> InteractionResult<PendingOperation> {
        self.inner.require_established("hold")?;
        let (operation, completion) = PendingOperation::new("hold");
        self.inner.send(Command::Hold(completion))?;
        Ok(operation)
    }

    /// Take the far end off hold; valid only while `Established`
    pub fn unhold(&self) -> InteractionResult<PendingOperation> {
        self.inner.require_established("unhold")?;
        let (operation, completion) = PendingOperation::new("unhold");
        self.inner.send(Command::Unhold(completion))?;
        Ok(operation)
    }

    /// Send one DTMF tone; valid only while `Established`
    pub fn send_dtmf(&self, tone: DtmfTone) -> InteractionResult<PendingOperation> {
        self.inner.require_established("send_dtmf")?;
        let (operation, completion) = PendingOperation::new("send_dtmf");
        self.inner.send(Command::SendDtmf(tone, completion))?;
        Ok(operation)
    }

    /// Mute or unmute the local microphone
    pub fn mute_audio(&self, muted: bool) -> InteractionResult<()> {
        {
            let mut core = self.inner.core.lock();
            if core.state.is_terminal() {
                return Err(InteractionError::invalid_state("mute_audio", core.state));
            }
            core.audio_muted = muted;
            self.inner.emitter.emit(InteractionEvent::AudioMuteStatusChanged { muted });
        }
        self.inner.send(Command::MuteAudio(muted))
    }

    /// Mute or unmute the local camera
    pub fn mute_video(&self, muted: bool) -> InteractionResult<()> {
        self.inner.require_video("mute_video")?;
        {
            let mut core = self.inner.core.lock();
            if core.state.is_terminal() {
                return Err(InteractionError::invalid_state("mute_video", core.state));
            }
            core.video_muted = muted;
            self.inner.emitter.emit(InteractionEvent::VideoMuteStatusChanged { muted });
        }
        self.inner.send(Command::MuteVideo(muted))
    }

    /// Enable or disable video
    ///
    /// Shares state with the adaptive policy; the most recent write wins.
    pub fn enable_video(&self, enabled: bool) -> InteractionResult<()> {
        self.inner.enable_video(enabled)
    }

    // ===== Queries =====

    pub fn state(&self) -> InteractionState {
        self.inner.state()
    }

    /// Time since the interaction was established, frozen once it ends
    pub fn time_elapsed(&self) -> Duration {
        let core = self.inner.core.lock();
        match core.established_at {
            Some(established) => core
                .ended_at
                .unwrap_or_else(Instant::now)
                .saturating_duration_since(established),
            None => Duration::ZERO,
        }
    }

    pub fn is_held(&self) -> bool {
        self.inner.core.lock().held
    }

    pub fn is_remote_held(&self) -> bool {
        self.inner.core.lock().remote_held
    }

    pub fn is_audio_muted(&self) -> bool {
        self.inner.core.lock().audio_muted
    }

    pub fn is_video_muted(&self) -> bool {
        self.inner.core.lock().video_muted
    }

    pub fn is_video_enabled(&self) -> bool {
        self.inner.core.lock().video_enabled
    }

    /// Latest audio snapshot derived from a transport sample
    pub fn audio_details(&self) -> Option<AudioDetails> {
        self.inner.details.read().audio.clone()
    }

    /// Latest video snapshot derived from a transport sample
    pub fn video_details(&self) -> Option<VideoDetails> {
        self.inner.details.read().video.clone()
    }

    /// Bucket of the most recently applied sample
    pub fn quality(&self) -> Option<QualityBucket> {
        self.inner.details.read().audio.as_ref().map(|a| a.score.bucket)
    }

    /// Monitor state, while the monitor is armed
    pub fn monitor_state(&self) -> Option<QualityMonitorState> {
        self.inner.monitor_state()
    }

    /// Counters accumulated by the quality monitor
    pub fn monitor_stats(&self) -> MonitorStats {
        self.inner.monitor_stats()
    }
}

impl std::fmt::Debug for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interaction")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.config.kind)
            .field("state", &self.inner.state())
            .finish()
    }
}

impl InteractionInner {
    fn state(&self) -> InteractionState {
        self.core.lock().state
    }

    fn set_state(&self, core: &mut CoreState, next: InteractionState) {
        debug!("Interaction {} {} -> {}", self.id, core.state, next);
        core.state = next;
        if next.is_terminal() && core.ended_at.is_none() {
            core.ended_at = Some(Instant::now());
        }
        self.state_tx.send_replace(next);
    }

    fn send(&self, command: Command) -> InteractionResult<()> {
        self.command_tx
            .send(command)
            .map_err(|_| InteractionError::internal("interaction command worker has stopped"))
    }

    fn require_established(&self, operation: &'static str) -> InteractionResult<()> {
        match self.state() {
            InteractionState::Established => Ok(()),
            state => Err(InteractionError::invalid_state(operation, state)),
        }
    }

    fn require_video(&self, operation: &'static str) -> InteractionResult<()> {
        if self.config.kind.has_video() {
            Ok(())
        } else {
            Err(InteractionError::Unsupported { operation })
        }
    }

    fn end(&self) -> InteractionResult<()> {
        let notify_remote = {
            let mut core = self.core.lock();
            let current = core.state;
            match current {
                InteractionState::Ended | InteractionState::Failed => {
                    return Err(InteractionError::invalid_state("end", current));
                }
                InteractionState::Ending => return Ok(()),
                InteractionState::Idle => {
                    self.set_state(&mut core, InteractionState::Ended);
                    self.emitter.emit(InteractionEvent::Ended);
                    false
                }
                _ => {
                    self.set_state(&mut core, InteractionState::Ending);
                    true
                }
            }
        };

        self.disarm_monitor();
        if notify_remote {
            info!("Interaction {} ending", self.id);
            self.send(Command::End)?;
        } else {
            info!("Interaction {} ended before it was started", self.id);
        }
        Ok(())
    }

    fn discard(&self) -> InteractionResult<()> {
        if self.discard_requested.swap(true, Ordering::SeqCst) {
            debug!("Interaction {} already discarded", self.id);
            return Ok(());
        }
        if !self.state().is_terminal() {
            if let Err(e) = self.end() {
                debug!("Interaction {} end during discard: {}", self.id, e);
            }
        }
        self.send(Command::Discard)
    }

    /// Apply a video enable request from the application or the policy
    fn enable_video(&self, enabled: bool) -> InteractionResult<()> {
        self.require_video("enable_video")?;
        {
            let mut core = self.core.lock();
            if core.state.is_terminal() {
                return Err(InteractionError::invalid_state("enable_video", core.state));
            }
            core.video_enabled = enabled;
            self.emitter.emit(InteractionEvent::VideoEnabledStatusChanged { enabled });
        }
        self.send(Command::EnableVideo(enabled))
    }

    fn handle_signaling_event(self: &Arc<Self>, event: SignalingEvent) -> InteractionResult<()> {
        let name = event.name();
        let result = match event {
            SignalingEvent::RemoteAlerting => {
                let mut core = self.core.lock();
                let current = core.state;
                match current {
                    InteractionState::Initiating | InteractionState::RemoteAlerting => {
                        self.set_state(&mut core, InteractionState::RemoteAlerting);
                        self.emitter.emit(InteractionEvent::RemoteAlerting);
                        Ok(())
                    }
                    state => Err(InteractionError::invalid_state(name, state)),
                }
            }
            SignalingEvent::RemoteAccepted => {
                let accepted = {
                    let mut core = self.core.lock();
                    let current = core.state;
                    match current {
                        InteractionState::Initiating | InteractionState::RemoteAlerting => {
                            self.set_state(&mut core, InteractionState::Established);
                            core.established_at = Some(Instant::now());
                            self.emitter.emit(InteractionEvent::Active);
                            Ok(())
                        }
                        state => Err(InteractionError::invalid_state(name, state)),
                    }
                };
                if accepted.is_ok() {
                    info!("Interaction {} established", self.id);
                    self.arm_monitor();
                }
                accepted
            }
            SignalingEvent::RemoteEnded => {
                let ended = {
                    let mut core = self.core.lock();
                    let current = core.state;
                    match current {
                        InteractionState::Idle | InteractionState::Ended | InteractionState::Failed => {
                            Err(InteractionError::invalid_state(name, current))
                        }
                        _ => {
                            self.set_state(&mut core, InteractionState::Ended);
                            self.emitter.emit(InteractionEvent::Ended);
                            Ok(())
                        }
                    }
                };
                if ended.is_ok() {
                    info!("Interaction {} ended by the far end", self.id);
                    self.disarm_monitor();
                }
                ended
            }
            SignalingEvent::RemoteHeld => self.set_remote_held(name, true),
            SignalingEvent::RemoteUnheld => self.set_remote_held(name, false),
            SignalingEvent::Failed { reason } => {
                let state = self.state();
                if state.is_terminal() {
                    Err(InteractionError::invalid_state(name, state))
                } else {
                    self.fail(InteractionError::signaling(reason));
                    Ok(())
                }
            }
        };

        if let Err(e) = &result {
            warn!("Interaction {} rejected signaling event: {}", self.id, e);
        }
        result
    }

    fn set_remote_held(&self, operation: &'static str, held: bool) -> InteractionResult<()> {
        let mut core = self.core.lock();
        if core.state != InteractionState::Established {
            return Err(InteractionError::invalid_state(operation, core.state));
        }
        core.remote_held = held;
        self.emitter.emit(if held {
            InteractionEvent::RemoteHoldComplete
        } else {
            InteractionEvent::RemoteUnholdComplete
        });
        Ok(())
    }

    /// Force the interaction into `Failed`; a no-op once terminal
    fn fail(&self, err: InteractionError) {
        {
            let mut core = self.core.lock();
            if core.state.is_terminal() {
                debug!("Interaction {} already {}, ignoring failure: {}", self.id, core.state, err);
                return;
            }
            error!("Interaction {} failed: {}", self.id, err);
            self.set_state(&mut core, InteractionState::Failed);
            self.emitter.emit(InteractionEvent::Failed { error: err });
        }
        self.disarm_monitor();
    }

    /// Finish a local end once signaling has acknowledged it
    fn finish_end(&self) {
        let mut core = self.core.lock();
        if core.state == InteractionState::Ending {
            self.set_state(&mut core, InteractionState::Ended);
            self.emitter.emit(InteractionEvent::Ended);
            info!("Interaction {} ended", self.id);
        }
    }

    /// Run a signaling request bounded by the operation timeout and cancelled
    /// when the interaction starts tearing down
    async fn run_guarded<F>(&self, operation: &'static str, request: F) -> InteractionResult<()>
    where
        F: Future<Output = InteractionResult<()>>,
    {
        let limit = self.config.operation_timeout();
        let torn_down = wait_for_teardown(self.state_tx.subscribe());

        tokio::select! {
            biased;
            _ = torn_down => Err(InteractionError::Cancelled { operation }),
            result = timeout(limit, request) => result.unwrap_or(Err(InteractionError::Timeout {
                operation,
                timeout_ms: limit.as_millis() as u64,
            })),
        }
    }
}

async fn wait_for_teardown(mut state_rx: watch::Receiver<InteractionState>) {
    let _ = state_rx.wait_for(|state| state.is_tearing_down()).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::TransportSample;
    use async_trait::async_trait;
    use tracing_test::traced_test;

    struct IdleMedia;

    #[async_trait]
    impl MediaController for IdleMedia {
        async fn transport_sample(&self) -> InteractionResult<TransportSample> {
            Err(InteractionError::transport_unavailable("no media"))
        }

        async fn set_video_enabled(&self, _enabled: bool) {}
    }

    struct AcceptAll;

    #[async_trait]
    impl SignalingChannel for AcceptAll {
        async fn start(&self, _destination: Option<String>) -> InteractionResult<()> {
            Ok(())
        }

        async fn end(&self) -> InteractionResult<()> {
            Ok(())
        }

        async fn hold(&self) -> InteractionResult<()> {
            Ok(())
        }

        async fn unhold(&self) -> InteractionResult<()> {
            Ok(())
        }

        async fn send_dtmf(&self, _tone: DtmfTone) -> InteractionResult<()> {
            Ok(())
        }
    }

    fn interaction(config: InteractionConfig) -> Interaction {
        Interaction::new(config, Arc::new(IdleMedia), Arc::new(AcceptAll)).unwrap()
    }

    #[test]
    fn test_new_outside_runtime_is_rejected() {
        let result = Interaction::new(InteractionConfig::audio(), Arc::new(IdleMedia), Arc::new(AcceptAll));
        assert!(matches!(result, Err(InteractionError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = InteractionConfig::audio().with_operation_timeout(Duration::ZERO);
        let result = Interaction::new(config, Arc::new(IdleMedia), Arc::new(AcceptAll));
        assert!(matches!(result, Err(InteractionError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_start_twice_is_invalid() {
        let call = interaction(InteractionConfig::audio());
        call.start().unwrap();
        assert_eq!(
            call.start(),
            Err(InteractionError::invalid_state("start", InteractionState::Initiating))
        );
        assert_eq!(call.state(), InteractionState::Initiating);
    }

    #[tokio::test]
    async fn test_accept_requires_a_started_call() {
        let call = interaction(InteractionConfig::audio());
        assert!(call.handle_signaling_event(SignalingEvent::RemoteAccepted).is_err());
        assert_eq!(call.state(), InteractionState::Idle);

        call.start().unwrap();
        call.handle_signaling_event(SignalingEvent::RemoteAlerting).unwrap();
        call.handle_signaling_event(SignalingEvent::RemoteAlerting).unwrap();
        call.handle_signaling_event(SignalingEvent::RemoteAccepted).unwrap();
        assert_eq!(call.state(), InteractionState::Established);
        assert!(call.handle_signaling_event(SignalingEvent::RemoteAlerting).is_err());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_rejected_signaling_event_is_logged() {
        let call = interaction(InteractionConfig::audio());
        assert!(call.handle_signaling_event(SignalingEvent::RemoteHeld).is_err());
        assert_eq!(call.state(), InteractionState::Idle);
        assert!(logs_contain("rejected signaling event"));
    }

    #[tokio::test]
    async fn test_end_from_idle_skips_signaling() {
        let call = interaction(InteractionConfig::audio());
        let mut events = call.subscribe();
        call.end().unwrap();
        assert_eq!(call.state(), InteractionState::Ended);
        assert_eq!(events.recv().await.unwrap(), InteractionEvent::Ended);
        assert!(call.end().is_err());
    }

    #[tokio::test]
    async fn test_video_operations_on_audio_call_are_unsupported() {
        let call = interaction(InteractionConfig::audio());
        assert_eq!(
            call.enable_video(true),
            Err(InteractionError::Unsupported { operation: "enable_video" })
        );
        assert_eq!(
            call.mute_video(true),
            Err(InteractionError::Unsupported { operation: "mute_video" })
        );
        assert!(!call.is_video_enabled());
    }

    #[tokio::test]
    async fn test_mute_applies_locally_and_emits() {
        let call = interaction(InteractionConfig::video());
        let mut events = call.subscribe();
        assert!(call.is_video_enabled());

        call.mute_audio(true).unwrap();
        call.enable_video(false).unwrap();

        assert!(call.is_audio_muted());
        assert!(!call.is_video_enabled());
        assert_eq!(
            events.recv().await.unwrap(),
            InteractionEvent::AudioMuteStatusChanged { muted: true }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            InteractionEvent::VideoEnabledStatusChanged { enabled: false }
        );
    }

    #[tokio::test]
    async fn test_remote_hold_tracks_flag() {
        let call = interaction(InteractionConfig::audio());
        call.start().unwrap();
        assert!(call.handle_signaling_event(SignalingEvent::RemoteHeld).is_err());

        call.handle_signaling_event(SignalingEvent::RemoteAccepted).unwrap();
        call.handle_signaling_event(SignalingEvent::RemoteHeld).unwrap();
        assert!(call.is_remote_held());
        call.handle_signaling_event(SignalingEvent::RemoteUnheld).unwrap();
        assert!(!call.is_remote_held());
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_elapsed_freezes_after_end() {
        let call = interaction(InteractionConfig::audio());
        assert_eq!(call.time_elapsed(), Duration::ZERO);

        call.start().unwrap();
        call.handle_signaling_event(SignalingEvent::RemoteAccepted).unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        call.handle_signaling_event(SignalingEvent::RemoteEnded).unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(call.time_elapsed(), Duration::from_secs(30));
    }
}
