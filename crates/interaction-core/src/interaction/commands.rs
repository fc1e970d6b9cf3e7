//! Per-interaction command worker
//!
//! Signaling and media side effects run here one at a time, in the order the
//! application issued them. The worker holds only a weak reference to the
//! interaction and stops after `Discard` or once the interaction is dropped.

use std::sync::Weak;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::operation::Completion;
use super::InteractionInner;
use crate::error::{InteractionError, InteractionResult};
use crate::events::InteractionEvent;
use crate::types::DtmfTone;

/// Side effects queued by the public operations
#[derive(Debug)]
pub(crate) enum Command {
    Start,
    End,
    Hold(Completion),
    Unhold(Completion),
    SendDtmf(DtmfTone, Completion),
    MuteAudio(bool),
    MuteVideo(bool),
    EnableVideo(bool),
    Discard,
}

pub(crate) async fn run_worker(inner: Weak<InteractionInner>, mut commands: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = commands.recv().await {
        let Some(inner) = inner.upgrade() else { break };
        if inner.execute(command).await == WorkerFlow::Stop {
            break;
        }
    }
    debug!("Interaction command worker stopped");
}

#[derive(Debug, PartialEq, Eq)]
enum WorkerFlow {
    Continue,
    Stop,
}

impl InteractionInner {
    async fn execute(&self, command: Command) -> WorkerFlow {
        match command {
            Command::Start => {
                let destination = self.config.destination_address.clone();
                match self.run_guarded("start", self.signaling.start(destination)).await {
                    Ok(()) => debug!("Interaction {} start request sent", self.id),
                    Err(InteractionError::Cancelled { .. }) => {
                        debug!("Interaction {} torn down before start was sent", self.id)
                    }
                    Err(e) => self.fail(e),
                }
            }
            Command::End => {
                // Already tearing down, so only the timeout applies
                let limit = self.config.operation_timeout();
                match tokio::time::timeout(limit, self.signaling.end()).await {
                    Ok(Ok(())) => self.finish_end(),
                    Ok(Err(e)) => self.fail(e),
                    Err(_) => self.fail(InteractionError::Timeout {
                        operation: "end",
                        timeout_ms: limit.as_millis() as u64,
                    }),
                }
            }
            Command::Hold(completion) => {
                let result = self.run_guarded("hold", self.signaling.hold()).await;
                self.complete_hold(completion, true, result);
            }
            Command::Unhold(completion) => {
                let result = self.run_guarded("unhold", self.signaling.unhold()).await;
                self.complete_hold(completion, false, result);
            }
            Command::SendDtmf(tone, completion) => {
                let result = self.run_guarded("send_dtmf", self.signaling.send_dtmf(tone)).await;
                debug!("Interaction {} DTMF {} finished: {:?}", self.id, tone.as_char(), result);
                completion.complete(result);
            }
            Command::MuteAudio(muted) => self.media.set_audio_muted(muted).await,
            Command::MuteVideo(muted) => self.media.set_video_muted(muted).await,
            Command::EnableVideo(enabled) => self.media.set_video_enabled(enabled).await,
            Command::Discard => {
                self.release_monitor();
                self.emitter.emit(InteractionEvent::DiscardComplete);
                info!("Interaction {} discarded", self.id);
                return WorkerFlow::Stop;
            }
        }
        WorkerFlow::Continue
    }

    fn complete_hold(&self, completion: Completion, hold: bool, result: InteractionResult<()>) {
        if result.is_ok() {
            let mut core = self.core.lock();
            if !core.state.is_terminal() {
                core.held = hold;
            }
        }
        debug!(
            "Interaction {} {} finished: {:?}",
            self.id,
            completion.operation(),
            result
        );

        let error = result.clone().err();
        self.emitter.emit(if hold {
            InteractionEvent::HoldComplete { error }
        } else {
            InteractionEvent::UnholdComplete { error }
        });
        completion.complete(result);
    }
}
