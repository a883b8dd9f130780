// Integration tests for the call session lifecycle
//
// These tests drive a spawned controller through its handle, with the
// loopback transport standing in for the voice gateway.

use anyhow::Result;
use interview_agent::call::{
    CallHandle, CallServices, CallSessionController, CallSnapshot, CallStatus, CallTargets, Role,
    SessionContext, TranscriptEntry,
};
use interview_agent::feedback::{CreateFeedbackRequest, CreateFeedbackResponse, FeedbackGenerator};
use interview_agent::navigation::{Navigator, Route};
use interview_agent::transport::{
    LoopbackTransport, TranscriptKind, TransportEvent, TransportRequest,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct RecordingFeedback {
    requests: Mutex<Vec<CreateFeedbackRequest>>,
    response: CreateFeedbackResponse,
}

impl RecordingFeedback {
    fn new(response: CreateFeedbackResponse) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            response,
        }
    }

    fn requests(&self) -> Vec<CreateFeedbackRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl FeedbackGenerator for RecordingFeedback {
    async fn create_feedback(
        &self,
        request: CreateFeedbackRequest,
    ) -> Result<CreateFeedbackResponse> {
        self.requests.lock().unwrap().push(request);
        Ok(self.response.clone())
    }
}

#[derive(Default)]
struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        self.routes.lock().unwrap().push(route.clone());
    }
}

struct Harness {
    transport: Arc<LoopbackTransport>,
    feedback: Arc<RecordingFeedback>,
    navigator: Arc<RecordingNavigator>,
    handle: CallHandle,
    task: tokio::task::JoinHandle<()>,
}

fn spawn_call(context: SessionContext, response: CreateFeedbackResponse) -> Harness {
    let transport = Arc::new(LoopbackTransport::new());
    let feedback = Arc::new(RecordingFeedback::new(response));
    let navigator = Arc::new(RecordingNavigator::default());

    let controller = CallSessionController::new(
        context,
        CallTargets {
            workflow_id: "wf-1".to_string(),
            interviewer_id: "interviewer".to_string(),
        },
        CallServices {
            transport: transport.clone(),
            feedback: feedback.clone(),
            navigator: navigator.clone(),
        },
    );
    assert_eq!(controller.status(), CallStatus::Inactive);

    let (handle, task) = controller.spawn();

    Harness {
        transport,
        feedback,
        navigator,
        handle,
        task,
    }
}

async fn wait_for(handle: &CallHandle, check: impl FnMut(&CallSnapshot) -> bool) -> CallSnapshot {
    let mut rx = handle.watch();
    let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(check))
        .await
        .expect("timed out waiting for call snapshot")
        .expect("call session stopped")
        .clone();
    snapshot
}

fn final_utterance(role: Role, text: &str) -> TransportEvent {
    TransportEvent::Transcript {
        role,
        transcript: text.to_string(),
        transcript_type: TranscriptKind::Final,
    }
}

fn evaluate_context() -> SessionContext {
    SessionContext::evaluate(
        "Ada",
        "user-1",
        "iv-1",
        vec!["Tell me about yourself".to_string()],
    )
}

#[tokio::test]
async fn test_evaluate_call_end_to_end() -> Result<()> {
    let h = spawn_call(evaluate_context(), CreateFeedbackResponse::created("fb-1"));

    assert_eq!(h.handle.start_call().await?, CallStatus::Connecting);
    assert_eq!(
        h.transport.requests(),
        vec![TransportRequest::Start {
            target: "interviewer".to_string(),
            params: {
                let mut params = interview_agent::CallParams::default();
                params.set("questions", "- Tell me about yourself");
                params
            },
        }]
    );

    h.transport.emit(TransportEvent::CallStart);
    wait_for(&h.handle, |s| s.status == CallStatus::Active).await;

    h.transport
        .emit(final_utterance(Role::Assistant, "Tell me about yourself"));
    h.transport.emit(TransportEvent::CallEnd);
    h.transport.emit(TransportEvent::CallEnd);

    let snapshot = wait_for(&h.handle, |s| s.route.is_some()).await;
    assert_eq!(snapshot.status, CallStatus::Finished);
    assert_eq!(snapshot.message_count, 1);

    let expected = vec![TranscriptEntry::new(Role::Assistant, "Tell me about yourself")];
    assert_eq!(h.handle.transcript().await?, expected);

    let requests = h.feedback.requests();
    assert_eq!(requests.len(), 1, "feedback must be submitted exactly once");
    assert_eq!(requests[0].interview_id, "iv-1");
    assert_eq!(requests[0].user_id, "user-1");
    assert_eq!(requests[0].transcript, expected);

    assert_eq!(
        h.navigator.routes(),
        vec![Route::Feedback {
            interview_id: "iv-1".to_string()
        }]
    );

    drop(h.handle);
    h.task.await?;

    Ok(())
}

#[tokio::test]
async fn test_generate_call_goes_home_without_feedback() -> Result<()> {
    let h = spawn_call(
        SessionContext::generate("Ada", "user-1"),
        CreateFeedbackResponse::created("fb-1"),
    );

    h.handle.start_call().await?;
    h.transport.emit(TransportEvent::CallStart);
    wait_for(&h.handle, |s| s.status == CallStatus::Active).await;

    assert_eq!(h.handle.end_call().await?, CallStatus::Finished);

    let snapshot = wait_for(&h.handle, |s| s.route.is_some()).await;
    assert_eq!(snapshot.route, Some(Route::Home));
    assert!(h.feedback.requests().is_empty());
    assert_eq!(h.navigator.routes(), vec![Route::Home]);
    assert_eq!(h.transport.stop_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_failed_feedback_goes_home_once() -> Result<()> {
    let h = spawn_call(
        evaluate_context(),
        CreateFeedbackResponse::failed("model unavailable"),
    );

    h.handle.start_call().await?;
    h.transport.emit(TransportEvent::CallStart);
    h.transport.emit(TransportEvent::CallEnd);

    let snapshot = wait_for(&h.handle, |s| s.route.is_some()).await;
    assert_eq!(snapshot.route, Some(Route::Home));
    assert_eq!(h.feedback.requests().len(), 1);

    // Nothing left to retry after the terminal transition
    assert_eq!(h.handle.end_call().await?, CallStatus::Finished);
    assert_eq!(h.feedback.requests().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_missing_interview_id_goes_home() -> Result<()> {
    let mut context = evaluate_context();
    context.interview_id = None;
    let h = spawn_call(context, CreateFeedbackResponse::created("fb-1"));

    h.handle.start_call().await?;
    h.transport.emit(TransportEvent::CallStart);
    h.transport.emit(TransportEvent::CallEnd);

    let snapshot = wait_for(&h.handle, |s| s.route.is_some()).await;
    assert_eq!(snapshot.route, Some(Route::Home));
    assert!(h.feedback.requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_repeated_start_keeps_one_transport_session() -> Result<()> {
    let h = spawn_call(evaluate_context(), CreateFeedbackResponse::created("fb-1"));

    assert_eq!(h.handle.start_call().await?, CallStatus::Connecting);
    assert_eq!(h.handle.start_call().await?, CallStatus::Connecting);

    assert_eq!(h.transport.start_count(), 1);
    assert_eq!(h.transport.subscriber_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_restart_does_not_leak_previous_transcript() -> Result<()> {
    let h = spawn_call(evaluate_context(), CreateFeedbackResponse::created("fb-1"));

    h.handle.start_call().await?;
    h.transport.emit(TransportEvent::CallStart);
    h.transport.emit(final_utterance(Role::User, "old answer"));
    h.transport.emit(TransportEvent::CallEnd);
    wait_for(&h.handle, |s| s.route.is_some()).await;

    assert_eq!(h.handle.start_call().await?, CallStatus::Connecting);
    assert!(h.handle.transcript().await?.is_empty());

    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.attempt, 2);
    assert_eq!(snapshot.message_count, 0);
    assert_eq!(snapshot.last_message, None);
    assert_eq!(snapshot.route, None);

    h.transport.emit(TransportEvent::CallStart);
    h.transport.emit(final_utterance(Role::User, "new answer"));
    h.transport.emit(TransportEvent::CallEnd);
    wait_for(&h.handle, |s| s.route.is_some()).await;

    let requests = h.feedback.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].transcript,
        vec![TranscriptEntry::new(Role::User, "new answer")]
    );

    Ok(())
}

#[tokio::test]
async fn test_disposal_stops_live_call_and_releases_subscription() -> Result<()> {
    let h = spawn_call(evaluate_context(), CreateFeedbackResponse::created("fb-1"));

    h.handle.start_call().await?;
    h.transport.emit(TransportEvent::CallStart);
    wait_for(&h.handle, |s| s.status == CallStatus::Active).await;
    assert_eq!(h.transport.subscriber_count(), 1);

    drop(h.handle);
    h.task.await?;

    assert_eq!(h.transport.stop_count(), 1);
    assert_eq!(h.transport.subscriber_count(), 0);
    assert!(h.feedback.requests().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_lagging_behind_the_transport_finishes_the_call() -> Result<()> {
    let h = spawn_call(evaluate_context(), CreateFeedbackResponse::created("fb-1"));

    h.handle.start_call().await?;
    h.transport.emit(TransportEvent::CallStart);
    h.transport.emit(final_utterance(Role::User, "first answer"));
    assert_eq!(h.handle.transcript().await?.len(), 1);

    // Overrun the event buffer before the session gets a chance to drain it
    for _ in 0..300 {
        h.transport.emit(TransportEvent::SpeechStart);
    }

    let snapshot = wait_for(&h.handle, |s| s.route.is_some()).await;
    assert_eq!(snapshot.status, CallStatus::Finished);

    let requests = h.feedback.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].transcript,
        vec![TranscriptEntry::new(Role::User, "first answer")]
    );

    Ok(())
}
