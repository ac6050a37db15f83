//! Supervision session runtime executor

use super::traits::LogStore;
use crate::protocol::{ServerMessage, PROCESSING_ERROR_MESSAGE};
use crate::state_machine::{
    transition, Effect, Event, FrameRejection, SessionContext, SessionState, TransitionError,
};
use crate::sync::{LogReference, ProgressSync};
use chrono::NaiveDate;
use tokio::sync::mpsc;

/// Runs one supervision session: seeds progress, then applies events in
/// arrival order until the client goes away.
pub struct SessionRuntime<S>
where
    S: LogStore + Clone + 'static,
{
    context: SessionContext,
    state: SessionState,
    sync: ProgressSync<S>,
    /// Day whose log this session reads and writes
    today: NaiveDate,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so the loop ends once the transport drops its sender
    event_tx: mpsc::WeakSender<Event>,
    outbound_tx: mpsc::Sender<ServerMessage>,
}

impl<S> SessionRuntime<S>
where
    S: LogStore + Clone + 'static,
{
    pub fn new(
        context: SessionContext,
        store: S,
        today: NaiveDate,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        outbound_tx: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            context,
            state: SessionState::Uninitialized,
            sync: ProgressSync::new(store),
            today,
            event_rx,
            event_tx,
            outbound_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            user_id = self.context.user_id,
            exercise_id = %self.context.exercise_param,
            "Starting supervision session"
        );

        self.send(ServerMessage::connection_established()).await;

        // Frames that arrive meanwhile wait in the channel
        let loaded = match self
            .sync
            .initialize(self.context.user_id, &self.context.exercise_param, self.today)
            .await
        {
            Ok(progress) => Event::ProgressLoaded(progress),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    error = %e,
                    "Could not seed session progress"
                );
                Event::ProgressUnavailable {
                    message: e.client_message().to_string(),
                }
            }
        };
        self.process_event(loaded).await;

        // Process events in a loop - no recursion
        while !self.state.is_terminal() {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    self.process_event(event).await;
                }
                else => break,
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Supervision session stopped");
    }

    async fn process_event(&mut self, event: Event) {
        let event_name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                self.handle_transition_error(event_name, &e);
                return;
            }
        };

        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect).await;
        }
    }

    fn handle_transition_error(&self, event_name: &str, error: &TransitionError) {
        tracing::debug!(
            session_id = %self.context.session_id,
            event = event_name,
            error = %error,
            "Ignoring event"
        );
    }

    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Notify(message) => self.send(message).await,

            Effect::CommitSets {
                log_reference: Some(reference),
                sets_completed,
            } => self.spawn_commit(reference, sets_completed),

            Effect::CommitSets {
                log_reference: None,
                sets_completed,
            } => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    sets_completed,
                    "Set completed but no daily log to record it in"
                );
            }

            Effect::RejectFrame(FrameRejection::Malformed { reason, snippet }) => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    reason = %reason,
                    payload = %snippet,
                    "Dropping malformed landmark frame"
                );
            }

            Effect::RejectFrame(FrameRejection::Unprocessable(e)) => {
                tracing::error!(
                    session_id = %self.context.session_id,
                    error = %e,
                    "Error processing pose"
                );
                self.send(ServerMessage::error(PROCESSING_ERROR_MESSAGE))
                    .await;
            }
        }
    }

    /// Record the set in the background; the result comes back as an event.
    /// The write is not cancelled if the session closes first.
    fn spawn_commit(&self, reference: LogReference, sets_completed: u32) {
        let sync = self.sync.clone();
        let event_tx = self.event_tx.upgrade();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            match sync.commit(&reference, sets_completed).await {
                Ok(entry) => {
                    if let Some(event_tx) = event_tx {
                        let _ = event_tx
                            .send(Event::SetsCommitted {
                                persisted_sets: entry.actual_sets_completed,
                            })
                            .await;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %session_id,
                        log_id = reference.log_id,
                        exercise_id = reference.exercise_id,
                        sets_completed,
                        error = %e,
                        "Failed to record completed set"
                    );
                }
            }
        });
    }

    async fn send(&self, message: ServerMessage) {
        tracing::debug!(
            session_id = %self.context.session_id,
            kind = message.kind(),
            "Sending to client"
        );
        if self.outbound_tx.send(message).await.is_err() {
            tracing::debug!(session_id = %self.context.session_id, "Client channel closed");
        }
    }
}
