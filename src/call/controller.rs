use super::context::{CallTargets, SessionContext, SessionKind};
use super::snapshot::{CallSnapshot, CallStatus};
use super::transcript::{Transcript, TranscriptEntry};
use crate::feedback::{CreateFeedbackRequest, CreateFeedbackResponse, FeedbackGenerator};
use crate::navigation::{Navigator, Route};
use crate::transport::{EventSubscription, TranscriptKind, TransportEvent, VoiceTransport};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why the post-call feedback step sent the user home
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    #[error("missing required parameters (interview_id: {interview_id:?}, user_id: {user_id:?})")]
    MissingIdentity {
        interview_id: Option<String>,
        user_id: Option<String>,
    },

    #[error("feedback was not saved: {0}")]
    Rejected(String),

    #[error("feedback submission failed: {0:#}")]
    Submission(anyhow::Error),
}

/// Collaborators a controller drives
#[derive(Clone)]
pub struct CallServices {
    pub transport: Arc<dyn VoiceTransport>,
    pub feedback: Arc<dyn FeedbackGenerator>,
    pub navigator: Arc<dyn Navigator>,
}

/// Owns the state of one interview call and reacts to transport events
///
/// Every mutation goes through `start_call`, `end_call` or `handle_event`.
/// The feedback step runs as the action of entering `Finished`, once per
/// attempt, on its own task.
pub struct CallSessionController {
    context: Arc<SessionContext>,
    targets: CallTargets,
    services: CallServices,

    status: CallStatus,
    transcript: Transcript,
    is_speaking: bool,

    /// Incremented on every `start_call` transition
    attempt: u64,

    /// Last attempt whose finalize step has been fired
    finalized_attempt: Option<u64>,

    /// Held for the controller's lifetime once the first call starts
    subscription: Option<EventSubscription>,

    finalize_task: Option<JoinHandle<Route>>,

    snapshot: Arc<watch::Sender<CallSnapshot>>,
}

impl CallSessionController {
    pub fn new(context: SessionContext, targets: CallTargets, services: CallServices) -> Self {
        let (snapshot, _) = watch::channel(CallSnapshot::default());

        Self {
            context: Arc::new(context),
            targets,
            services,
            status: CallStatus::Inactive,
            transcript: Transcript::new(),
            is_speaking: false,
            attempt: 0,
            finalized_attempt: None,
            subscription: None,
            finalize_task: None,
            snapshot: Arc::new(snapshot),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_speaking(&self) -> bool {
        self.is_speaking
    }

    /// Current published snapshot
    pub fn snapshot(&self) -> CallSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Register an observer for snapshot changes
    pub fn watch(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot.subscribe()
    }

    /// Begin a new call attempt
    ///
    /// No-op while a call is connecting or active. Transport failures are
    /// logged; the connection outcome arrives through transport events.
    pub async fn start_call(&mut self) {
        if !self.status.can_start() {
            warn!("Call is {}, ignoring start request", self.status);
            return;
        }

        self.attempt += 1;
        self.transcript.reset();
        self.is_speaking = false;
        self.snapshot.send_modify(|s| s.route = None);
        self.set_status(CallStatus::Connecting);

        if self.subscription.is_none() {
            debug!("Registering transport event subscription");
            self.subscription = Some(self.services.transport.subscribe());
        }

        let (target, params) = self.context.call_request(&self.targets);
        if target.is_empty() {
            error!("No voice target configured for {:?} sessions", self.context.kind);
        }

        info!(
            "Starting {:?} call (attempt {}, target={})",
            self.context.kind, self.attempt, target
        );

        if let Err(e) = self.services.transport.start(&target, params).await {
            error!("Failed to start call: {:#}", e);
        }
    }

    /// End the call without waiting for the transport to confirm
    pub async fn end_call(&mut self) {
        if !self.status.is_live() {
            warn!("Call is {}, ignoring end request", self.status);
            return;
        }

        info!("Ending call on request");
        self.enter_finished();

        if let Err(e) = self.services.transport.stop().await {
            error!("Failed to stop call: {:#}", e);
        }
    }

    /// Apply one transport event
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CallStart => {
                if self.status == CallStatus::Connecting {
                    info!("Call connected");
                    self.set_status(CallStatus::Active);
                } else {
                    debug!("Ignoring call-start while {}", self.status);
                }
            }
            TransportEvent::CallEnd => match self.status {
                CallStatus::Connecting | CallStatus::Active => {
                    info!("Call ended, setting status to FINISHED");
                    self.enter_finished();
                }
                status => debug!("Ignoring call-end while {}", status),
            },
            TransportEvent::Transcript {
                role,
                transcript,
                transcript_type: TranscriptKind::Final,
            } => {
                if self.status == CallStatus::Active {
                    debug!("Final transcript received ({:?}): {}", role, transcript);
                    self.transcript.push(TranscriptEntry::new(role, transcript));
                    self.publish();
                } else {
                    debug!("Dropping final transcript received while {}", self.status);
                }
            }
            TransportEvent::Transcript {
                transcript,
                transcript_type: TranscriptKind::Partial,
                ..
            } => {
                debug!("Partial transcript received: {}", transcript);
            }
            TransportEvent::SpeechStart => self.set_speaking(true),
            TransportEvent::SpeechEnd => self.set_speaking(false),
            TransportEvent::Error { message } => {
                error!("Voice transport error: {}", message);
            }
        }
    }

    /// Wait for the next transport event
    ///
    /// Pends forever before the first call has subscribed.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Wait for the most recent finalize step to navigate
    ///
    /// Returns `None` if no finalize step is pending.
    pub async fn wait_finalized(&mut self) -> Option<Route> {
        let task = self.finalize_task.take()?;
        match task.await {
            Ok(route) => Some(route),
            Err(e) => {
                error!("Finalize task failed: {}", e);
                None
            }
        }
    }

    /// Move the controller onto its own task
    pub fn spawn(self) -> (CallHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(32);
        let handle = CallHandle {
            commands: commands_tx,
            snapshot: self.watch(),
        };

        let task = tokio::spawn(self.run(commands_rx));

        (handle, task)
    }

    /// Serve commands and transport events until every handle is dropped
    pub async fn run(mut self, mut commands: mpsc::Receiver<CallCommand>) {
        debug!("Call session task started");

        loop {
            tokio::select! {
                biased;

                event = self.next_event() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        warn!("Transport event stream closed");
                        self.subscription = None;
                    }
                },
                command = commands.recv() => match command {
                    Some(CallCommand::Start(ack)) => {
                        self.start_call().await;
                        let _ = ack.send(self.status);
                    }
                    Some(CallCommand::End(ack)) => {
                        self.end_call().await;
                        let _ = ack.send(self.status);
                    }
                    Some(CallCommand::Transcript(reply)) => {
                        let _ = reply.send(self.transcript.entries().to_vec());
                    }
                    None => break,
                },
            }
        }

        if self.status.is_live() {
            info!("Call session disposed while {}, stopping transport", self.status);
            if let Err(e) = self.services.transport.stop().await {
                error!("Failed to stop call: {:#}", e);
            }
        }

        debug!("Call session task stopped");
    }

    fn set_status(&mut self, status: CallStatus) {
        if self.status != status {
            debug!("Call status {} -> {}", self.status, status);
        }
        self.status = status;
        self.publish();
    }

    fn set_speaking(&mut self, speaking: bool) {
        if self.is_speaking != speaking {
            debug!("Speaking: {}", speaking);
            self.is_speaking = speaking;
            self.publish();
        }
    }

    fn publish(&self) {
        let status = self.status;
        let is_speaking = self.is_speaking;
        let message_count = self.transcript.len();
        let last_message = self.transcript.last_message().map(str::to_string);
        let attempt = self.attempt;

        self.snapshot.send_modify(|s| {
            s.status = status;
            s.is_speaking = is_speaking;
            s.message_count = message_count;
            s.last_message = last_message;
            s.attempt = attempt;
        });
    }

    /// Transition into `Finished` and fire the finalize step for this attempt
    fn enter_finished(&mut self) {
        self.is_speaking = false;
        self.set_status(CallStatus::Finished);

        if self.finalized_attempt == Some(self.attempt) {
            debug!("Finalize already fired for attempt {}", self.attempt);
            return;
        }
        self.finalized_attempt = Some(self.attempt);

        let context = Arc::clone(&self.context);
        let transcript = self.transcript.entries().to_vec();
        let services = self.services.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let attempt = self.attempt;

        self.finalize_task = Some(tokio::spawn(async move {
            let route = finalize(&context, transcript, &services).await;

            snapshot.send_modify(|s| {
                if s.attempt == attempt {
                    s.route = Some(route.clone());
                }
            });

            route
        }));
    }
}

/// Requests served by a spawned controller
#[derive(Debug)]
pub enum CallCommand {
    Start(oneshot::Sender<CallStatus>),
    End(oneshot::Sender<CallStatus>),
    Transcript(oneshot::Sender<Vec<TranscriptEntry>>),
}

/// Cloneable handle to a spawned controller
#[derive(Clone)]
pub struct CallHandle {
    commands: mpsc::Sender<CallCommand>,
    snapshot: watch::Receiver<CallSnapshot>,
}

impl CallHandle {
    /// Start a call, returning the status once the request is applied
    pub async fn start_call(&self) -> Result<CallStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(CallCommand::Start(tx)).await?;
        rx.await.map_err(|_| anyhow!("Call session stopped"))
    }

    /// End a call, returning the status once the request is applied
    pub async fn end_call(&self) -> Result<CallStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(CallCommand::End(tx)).await?;
        rx.await.map_err(|_| anyhow!("Call session stopped"))
    }

    pub async fn transcript(&self) -> Result<Vec<TranscriptEntry>> {
        let (tx, rx) = oneshot::channel();
        self.send(CallCommand::Transcript(tx)).await?;
        rx.await.map_err(|_| anyhow!("Call session stopped"))
    }

    pub fn snapshot(&self) -> CallSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot.clone()
    }

    async fn send(&self, command: CallCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("Call session stopped"))
    }
}

/// Decide where to send the user after a call, then navigate there
async fn finalize(
    context: &SessionContext,
    transcript: Vec<TranscriptEntry>,
    services: &CallServices,
) -> Route {
    info!("Call finished, type: {:?}", context.kind);

    let route = match context.kind {
        SessionKind::Generate => Route::Home,
        SessionKind::Evaluate => {
            match submit_feedback(context, transcript, services.feedback.as_ref()).await {
                Ok(route) => route,
                Err(e) => {
                    error!("Finalize failed: {}", e);
                    Route::Home
                }
            }
        }
    };

    services.navigator.navigate(&route);
    route
}

async fn submit_feedback(
    context: &SessionContext,
    transcript: Vec<TranscriptEntry>,
    feedback: &dyn FeedbackGenerator,
) -> Result<Route, FinalizeError> {
    let (interview_id, user_id) = match (
        non_empty(context.interview_id.as_deref()),
        non_empty(context.user_id.as_deref()),
    ) {
        (Some(interview_id), Some(user_id)) => (interview_id.to_string(), user_id.to_string()),
        _ => {
            return Err(FinalizeError::MissingIdentity {
                interview_id: context.interview_id.clone(),
                user_id: context.user_id.clone(),
            })
        }
    };

    let request = CreateFeedbackRequest {
        interview_id: interview_id.clone(),
        user_id,
        transcript,
        feedback_id: context.feedback_id.clone(),
    };

    let response = feedback
        .create_feedback(request)
        .await
        .map_err(FinalizeError::Submission)?;

    match response {
        CreateFeedbackResponse {
            success: true,
            feedback_id: Some(feedback_id),
            ..
        } => {
            info!("Feedback {} saved for interview {}", feedback_id, interview_id);
            Ok(Route::Feedback { interview_id })
        }
        CreateFeedbackResponse { error, .. } => Err(FinalizeError::Rejected(
            error.unwrap_or_else(|| "no feedback id returned".to_string()),
        )),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
