//! Scriptable media and signaling collaborators shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use rvoip_interaction_core::{
    DtmfTone, Interaction, InteractionConfig, InteractionError, InteractionEvent,
    InteractionListener, InteractionResult, MediaController, SignalingChannel, SignalingEvent,
    TransportSample,
};

/// Clean network, scores Excellent
pub fn good_sample() -> TransportSample {
    TransportSample::audio(20, 5, 5, 0.0)
}

/// Congested network, scores Bad
pub fn bad_sample() -> TransportSample {
    TransportSample::audio(400, 80, 80, 8.0)
}

/// Media layer whose next sample can be changed at any time
pub struct MockMedia {
    sample: Mutex<Option<TransportSample>>,
    delay: Mutex<Duration>,
    fetches: AtomicUsize,
    video_commands: Mutex<Vec<bool>>,
    audio_mutes: Mutex<Vec<bool>>,
}

impl MockMedia {
    pub fn new(sample: TransportSample) -> Arc<Self> {
        Arc::new(Self {
            sample: Mutex::new(Some(sample)),
            delay: Mutex::new(Duration::ZERO),
            fetches: AtomicUsize::new(0),
            video_commands: Mutex::new(Vec::new()),
            audio_mutes: Mutex::new(Vec::new()),
        })
    }

    /// Media layer with no metrics yet
    pub fn unavailable() -> Arc<Self> {
        let media = Self::new(good_sample());
        media.set_unavailable();
        media
    }

    pub fn set_sample(&self, sample: TransportSample) {
        *self.sample.lock() = Some(sample);
    }

    pub fn set_unavailable(&self) {
        *self.sample.lock() = None;
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn video_commands(&self) -> Vec<bool> {
        self.video_commands.lock().clone()
    }

    pub fn audio_mutes(&self) -> Vec<bool> {
        self.audio_mutes.lock().clone()
    }
}

#[async_trait]
impl MediaController for MockMedia {
    async fn transport_sample(&self) -> InteractionResult<TransportSample> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.sample
            .lock()
            .clone()
            .ok_or_else(|| InteractionError::transport_unavailable("no RTCP report yet"))
    }

    async fn set_video_enabled(&self, enabled: bool) {
        self.video_commands.lock().push(enabled);
    }

    async fn set_audio_muted(&self, muted: bool) {
        self.audio_mutes.lock().push(muted);
    }
}

/// How a scripted signaling request behaves
#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Fail(InteractionError),
    /// Never answers
    Hang,
    /// Answers `Ok` after the delay
    After(Duration),
}

impl Reply {
    async fn play(self) -> InteractionResult<()> {
        match self {
            Reply::Ok => Ok(()),
            Reply::Fail(e) => Err(e),
            Reply::Hang => std::future::pending().await,
            Reply::After(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

/// Signaling channel with a scripted reply per request
pub struct MockSignaling {
    start: Mutex<Reply>,
    end: Mutex<Reply>,
    hold: Mutex<Reply>,
    unhold: Mutex<Reply>,
    dtmf: Mutex<Reply>,
    requests: Mutex<Vec<String>>,
}

impl MockSignaling {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            start: Mutex::new(Reply::Ok),
            end: Mutex::new(Reply::Ok),
            hold: Mutex::new(Reply::Ok),
            unhold: Mutex::new(Reply::Ok),
            dtmf: Mutex::new(Reply::Ok),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn on_start(&self, reply: Reply) {
        *self.start.lock() = reply;
    }

    pub fn on_end(&self, reply: Reply) {
        *self.end.lock() = reply;
    }

    pub fn on_hold(&self, reply: Reply) {
        *self.hold.lock() = reply;
    }

    pub fn on_unhold(&self, reply: Reply) {
        *self.unhold.lock() = reply;
    }

    pub fn on_dtmf(&self, reply: Reply) {
        *self.dtmf.lock() = reply;
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn record(&self, request: impl Into<String>) {
        self.requests.lock().push(request.into());
    }
}

#[async_trait]
impl SignalingChannel for MockSignaling {
    async fn start(&self, destination: Option<String>) -> InteractionResult<()> {
        self.record(format!("start {}", destination.unwrap_or_default()));
        let reply = self.start.lock().clone();
        reply.play().await
    }

    async fn end(&self) -> InteractionResult<()> {
        self.record("end");
        let reply = self.end.lock().clone();
        reply.play().await
    }

    async fn hold(&self) -> InteractionResult<()> {
        self.record("hold");
        let reply = self.hold.lock().clone();
        reply.play().await
    }

    async fn unhold(&self) -> InteractionResult<()> {
        self.record("unhold");
        let reply = self.unhold.lock().clone();
        reply.play().await
    }

    async fn send_dtmf(&self, tone: DtmfTone) -> InteractionResult<()> {
        self.record(format!("dtmf {}", tone.as_char()));
        let reply = self.dtmf.lock().clone();
        reply.play().await
    }
}

/// Listener that records every event it receives
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<InteractionEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<InteractionEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl InteractionListener for RecordingListener {
    async fn on_event(&self, event: InteractionEvent) {
        self.events.lock().push(event);
    }
}

/// Everything a test needs to drive one interaction
pub struct Harness {
    pub call: Interaction,
    pub media: Arc<MockMedia>,
    pub signaling: Arc<MockSignaling>,
    pub events: broadcast::Receiver<InteractionEvent>,
}

impl Harness {
    pub fn new(config: InteractionConfig, media: Arc<MockMedia>) -> Self {
        let signaling = MockSignaling::new();
        let call = Interaction::new(config, media.clone(), signaling.clone())
            .expect("valid interaction config");
        let events = call.subscribe();
        Self {
            call,
            media,
            signaling,
            events,
        }
    }

    /// Start and accept the call, leaving it `Established`
    pub fn establish(&self) {
        self.call.start().expect("start");
        self.call
            .handle_signaling_event(SignalingEvent::RemoteAccepted)
            .expect("accept");
    }

    /// Events received since the last drain
    pub fn drain(&mut self) -> Vec<InteractionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Quality events received since the last drain
    pub fn drain_quality(&mut self) -> Vec<InteractionEvent> {
        self.drain()
            .into_iter()
            .filter(|event| event.is_quality_event())
            .collect()
    }
}

/// Let spawned tasks run without moving the clock
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Wait until the interaction reaches `state`
pub async fn wait_for_state(call: &Interaction, state: rvoip_interaction_core::InteractionState) {
    let reached = tokio::time::timeout(Duration::from_secs(30), async {
        while call.state() != state {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(reached.is_ok(), "interaction stuck in {} waiting for {}", call.state(), state);
}

/// Receive the next event, failing the test if none arrives
pub async fn next_event(events: &mut broadcast::Receiver<InteractionEvent>) -> InteractionEvent {
    tokio::time::timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("no event arrived")
        .expect("event channel closed")
}
