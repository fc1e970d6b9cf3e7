//! Periodic transport-metrics sampler
//!
//! One sampler task runs per established interaction. Each tick fetches a
//! sample from the media layer and hands it to a [`SampleSink`]. The fetch is
//! awaited inside the tick, so a tick never overlaps the previous one; ticks
//! that come due while a fetch is outstanding are skipped, not queued.
//!
//! The sampler only holds a weak reference to its sink and never holds a lock
//! while awaiting the media layer. Every hand-off carries the epoch the task
//! was spawned with so the sink can drop results that arrive after teardown.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::error::InteractionError;
use crate::media::MediaController;
use crate::quality::metrics::TransportSample;

/// Receiver of sampler output
///
/// Every method returns whether the sampler should keep running; `false`
/// means the epoch is stale and the task exits.
pub(crate) trait SampleSink: Send + Sync + 'static {
    /// A tick fired and a fetch is about to start
    fn tick_started(&self, epoch: u64) -> bool;

    /// A fetch produced a sample
    fn deliver(&self, epoch: u64, sample: TransportSample) -> bool;

    /// A fetch failed or timed out
    fn unavailable(&self, epoch: u64, error: InteractionError) -> bool;
}

/// Timing of a sampler task
#[derive(Debug, Clone, Copy)]
pub(crate) struct QualitySampler {
    period: Duration,
    fetch_timeout: Duration,
}

impl QualitySampler {
    pub(crate) fn new(period: Duration, fetch_timeout: Duration) -> Self {
        Self {
            period,
            fetch_timeout,
        }
    }

    /// Spawn the sampling loop; the first tick fires one period from now
    pub(crate) fn spawn<S: SampleSink>(
        self,
        epoch: u64,
        media: Arc<dyn MediaController>,
        sink: Weak<S>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(epoch, media, sink).await })
    }

    async fn run<S: SampleSink>(self, epoch: u64, media: Arc<dyn MediaController>, sink: Weak<S>) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last_fetch_done = Instant::now();

        loop {
            let scheduled = ticker.tick().await;
            if scheduled < last_fetch_done {
                trace!("Sampler epoch {} skipping tick due during previous fetch", epoch);
                continue;
            }

            match sink.upgrade() {
                Some(sink) if sink.tick_started(epoch) => {}
                _ => break,
            }
            trace!("Sampler epoch {} fetching transport sample", epoch);

            let result = timeout(self.fetch_timeout, media.transport_sample()).await;
            last_fetch_done = Instant::now();

            let Some(sink) = sink.upgrade() else { break };
            let keep_running = match result {
                Ok(Ok(sample)) => sink.deliver(epoch, sample),
                Ok(Err(error)) => sink.unavailable(epoch, error),
                Err(_) => sink.unavailable(
                    epoch,
                    InteractionError::transport_unavailable(format!(
                        "sample fetch exceeded {}ms",
                        self.fetch_timeout.as_millis()
                    )),
                ),
            };
            if !keep_running {
                break;
            }
        }

        debug!("Sampler epoch {} stopped", epoch);
    }
}
