//! Integration tests for [`RequestExecutor`] retry, timeout and
//! classification behavior.
//!
//! Every test runs on a paused tokio clock so backoff delays and deadlines
//! are observed exactly, without real waiting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio::time::Instant;
use tripkit_client::{
    HttpRequest, HttpResponse, RequestError, RequestExecutor, RequestSpec, Transport,
    TransportError,
};
use tripkit_core::retry::BackoffPolicy;
use tripkit_core::telemetry::{Reporter, TelemetryEvent};

// ---------------------------------------------------------------------------
// Scripted transport
// ---------------------------------------------------------------------------

enum Step {
    Respond(u16, &'static str),
    Fail(&'static str),
    Hang,
}

/// Plays back a fixed script, one step per call, recording each call.
#[derive(Default)]
struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(Instant, HttpRequest)>>,
    completed: AtomicUsize,
    aborted: Arc<AtomicUsize>,
}

/// Counts exchanges dropped before they finished.
struct AbortGuard {
    finished: bool,
    aborted: Arc<AtomicUsize>,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.aborted.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            ..Default::default()
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Time between consecutive calls.
    fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }

    fn request(&self, index: usize) -> HttpRequest {
        self.calls.lock().unwrap()[index].1.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push((Instant::now(), request));
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more often than scripted");

        let mut guard = AbortGuard {
            finished: false,
            aborted: Arc::clone(&self.aborted),
        };

        let result = match step {
            Step::Respond(status, body) => Ok(HttpResponse {
                status,
                request_id: None,
                body: body.as_bytes().to_vec(),
            }),
            Step::Fail(message) => Err(TransportError::Other(message.to_string())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(HttpResponse {
                    status: 200,
                    request_id: None,
                    body: b"{}".to_vec(),
                })
            }
        };

        guard.finished = true;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl Reporter for RecordingReporter {
    fn report(&self, event: TelemetryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn executor(transport: &Arc<ScriptedTransport>) -> RequestExecutor {
    RequestExecutor::new(
        Arc::clone(transport) as Arc<dyn Transport>,
        "http://backend.test/api",
    )
}

fn assert_gap_within(gap: Duration, floor_ms: u64) {
    assert!(
        gap >= Duration::from_millis(floor_ms),
        "gap {gap:?} below {floor_ms} ms"
    );
    assert!(
        gap <= Duration::from_millis(floor_ms + 1000),
        "gap {gap:?} above {floor_ms} ms + jitter"
    );
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn first_attempt_success_makes_exactly_one_call() {
    let transport = ScriptedTransport::new(vec![Step::Respond(200, r#"{"ok":true}"#)]);
    let value: serde_json::Value = executor(&transport)
        .execute(&RequestSpec::get("/reports/1/status"))
        .await
        .unwrap();

    assert_eq!(value["ok"], true);
    assert_eq!(transport.call_count(), 1);
    assert_eq!(transport.request(0).url, "http://backend.test/api/reports/1/status");
}

#[tokio::test(start_paused = true)]
async fn success_on_second_attempt_stops_retrying() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(500, ""),
        Step::Respond(200, "{}"),
        Step::Respond(200, "{}"),
    ]);
    let result: Result<serde_json::Value, _> = executor(&transport)
        .execute(&RequestSpec::get("/x"))
        .await;

    assert!(result.is_ok());
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn no_content_returns_empty_payload() {
    let transport = ScriptedTransport::new(vec![Step::Respond(204, "")]);
    let result: Result<(), _> = executor(&transport)
        .execute(&RequestSpec::post("/trips/3/share", serde_json::json!({})))
        .await;

    assert!(result.is_ok());
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn server_error_is_retried_with_exponential_backoff() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(500, ""),
        Step::Respond(500, ""),
        Step::Respond(500, ""),
        Step::Respond(200, "{}"),
    ]);
    let result = executor(&transport).send(&RequestSpec::get("/x")).await;

    assert!(result.is_ok());
    assert_eq!(transport.call_count(), 4);

    let gaps = transport.gaps();
    assert_eq!(gaps.len(), 3);
    assert_gap_within(gaps[0], 2000);
    assert_gap_within(gaps[1], 4000);
    assert_gap_within(gaps[2], 8000);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_returns_last_observed_error() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(503, ""),
        Step::Respond(502, ""),
        Step::Respond(504, ""),
        Step::Respond(500, r#"{"detail":"Planner crashed","code":"PLANNER_DOWN"}"#),
    ]);
    let err = executor(&transport)
        .send(&RequestSpec::get("/x"))
        .await
        .unwrap_err();

    assert_eq!(transport.call_count(), 4);
    assert_matches!(
        err,
        RequestError::Response { status: 500, ref detail, ref code, .. }
            if detail == "Planner crashed" && code.as_deref() == Some("PLANNER_DOWN")
    );
}

#[tokio::test(start_paused = true)]
async fn unauthorized_and_not_found_are_never_retried() {
    for status in [401u16, 404] {
        let transport = ScriptedTransport::new(vec![Step::Respond(status, "")]);
        let err = executor(&transport)
            .send(&RequestSpec::get("/x").with_max_retries(5))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(status));
        assert_eq!(transport.call_count(), 1, "status {status} was retried");
    }
}

#[tokio::test(start_paused = true)]
async fn rate_limit_and_request_timeout_are_retried() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(429, ""),
        Step::Respond(408, ""),
        Step::Respond(200, "{}"),
    ]);
    let result = executor(&transport).send(&RequestSpec::get("/x")).await;

    assert!(result.is_ok());
    assert_eq!(transport.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn network_failure_is_retried() {
    let transport = ScriptedTransport::new(vec![
        Step::Fail("connection refused"),
        Step::Respond(200, "{}"),
    ]);
    let result = executor(&transport).send(&RequestSpec::get("/x")).await;

    assert!(result.is_ok());
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn disabled_retry_makes_single_attempt() {
    let transport = ScriptedTransport::new(vec![Step::Respond(503, "")]);
    let err = executor(&transport)
        .send(&RequestSpec::get("/x").without_retry())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(transport.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn network_failure_surfaces_when_retries_exhausted() {
    let transport = ScriptedTransport::new(vec![
        Step::Fail("dns lookup failed"),
        Step::Fail("connection reset"),
    ]);
    let err = executor(&transport)
        .send(&RequestSpec::get("/x").with_max_retries(1))
        .await
        .unwrap_err();

    assert_matches!(err, RequestError::Network(ref msg) if msg.contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn delay_is_capped_at_max() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(503, ""),
        Step::Respond(503, ""),
        Step::Respond(200, "{}"),
    ]);
    let executor = executor(&transport).with_backoff(BackoffPolicy {
        base_delay: Duration::from_secs(10),
        ..Default::default()
    });
    executor.send(&RequestSpec::get("/x")).await.unwrap();

    let gaps = transport.gaps();
    assert_gap_within(gaps[0], 20_000);
    // 40 s + jitter, capped.
    assert!(gaps[1] >= Duration::from_secs(30));
    assert!(gaps[1] <= Duration::from_millis(30_001));
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn deadline_yields_timeout_and_aborts_transport() {
    let transport = ScriptedTransport::new(vec![Step::Hang]);
    let started = Instant::now();
    let err = executor(&transport)
        .send(
            &RequestSpec::get("/slow")
                .with_timeout(Duration::from_millis(250))
                .without_retry(),
        )
        .await
        .unwrap_err();

    assert_eq!(err, RequestError::Timeout { timeout_ms: 250 });
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(transport.aborted.load(Ordering::SeqCst), 1);

    // Long after the hung exchange would have finished, nothing completes.
    tokio::time::sleep(Duration::from_secs(7200)).await;
    assert_eq!(transport.completed.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn timeout_is_retried() {
    let transport = ScriptedTransport::new(vec![Step::Hang, Step::Respond(200, "{}")]);
    let result = executor(&transport)
        .send(&RequestSpec::get("/slow").with_timeout(Duration::from_secs(1)))
        .await;

    assert!(result.is_ok());
    assert_eq!(transport.call_count(), 2);
    assert_eq!(transport.aborted.load(Ordering::SeqCst), 1);
    // One deadline plus the first backoff.
    assert_gap_within(transport.gaps()[0], 3000);
}

// ---------------------------------------------------------------------------
// Headers, error bodies, reporting
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn bearer_token_is_attached_when_configured() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(200, "{}"),
        Step::Respond(200, "{}"),
    ]);

    executor(&transport)
        .send(&RequestSpec::get("/public"))
        .await
        .unwrap();
    executor(&transport)
        .with_bearer_token("tok-123")
        .send(&RequestSpec::post("/private", serde_json::json!({"a": 1})))
        .await
        .unwrap();

    let public = transport.request(0);
    assert!(public.headers.iter().all(|(k, _)| k != "Authorization"));

    let private = transport.request(1);
    assert!(private
        .headers
        .contains(&("Authorization".to_string(), "Bearer tok-123".to_string())));
    assert!(private
        .headers
        .contains(&("Content-Type".to_string(), "application/json".to_string())));
    assert_eq!(private.body, Some(serde_json::json!({"a": 1})));
}

#[tokio::test(start_paused = true)]
async fn error_body_is_surfaced_with_request_id() {
    let transport = ScriptedTransport::new(vec![Step::Respond(
        403,
        r#"{"detail":"Trip belongs to another user","code":"FORBIDDEN","request_id":"r-99"}"#,
    )]);
    let err = executor(&transport)
        .send(&RequestSpec::get("/trips/8"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RequestError::Response {
            status: 403,
            detail: "Trip belongs to another user".into(),
            code: Some("FORBIDDEN".into()),
            request_id: Some("r-99".into()),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn reporter_sees_each_retry_and_final_failure() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(502, ""),
        Step::Respond(502, ""),
        Step::Respond(502, ""),
    ]);
    let reporter = Arc::new(RecordingReporter::default());
    let _ = executor(&transport)
        .with_reporter(reporter.clone())
        .send(&RequestSpec::get("/x").with_max_retries(2))
        .await;

    let events = reporter.events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_matches!(&events[0], TelemetryEvent::RequestRetried { attempt: 1, .. });
    assert_matches!(&events[1], TelemetryEvent::RequestRetried { attempt: 2, .. });
    assert_matches!(&events[2], TelemetryEvent::RequestFailed { attempts: 3, .. });
}
