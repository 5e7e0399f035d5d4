//! Integration tests for the session engine
//!
//! These drive a full session against in-memory collaborators, without
//! network access.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;

use tokio_util::sync::CancellationToken;

use globalping::history_log::MeasurementLog;
use globalping::measurement::{
    ClientError, CommandKind, CreatedMeasurement, Location, MeasurementClient, MeasurementRequest,
};
use globalping::session::{ContinuousSession, SessionError, SessionState};
use globalping::share::ShareLink;
use globalping::state::{MeasurementStats, ProbeSample, SessionContext};
use globalping::view::{RenderError, Renderer};

/// Client returning queued responses and recording every request
#[derive(Default)]
struct MockClient {
    requests: RefCell<Vec<MeasurementRequest>>,
    responses: RefCell<VecDeque<Result<CreatedMeasurement, ClientError>>>,
}

impl MockClient {
    fn with_ids(ids: &[&str], probes: u32) -> Self {
        let client = Self::default();
        for id in ids {
            client.push_ok(id, probes);
        }
        client
    }

    fn push_ok(&self, id: &str, probes: u32) {
        self.responses.borrow_mut().push_back(Ok(CreatedMeasurement {
            id: id.to_string(),
            probes_count: probes,
        }));
    }

    fn push_err(&self, status: u16) {
        self.responses.borrow_mut().push_back(Err(ClientError::Api {
            status,
            message: "request failed".to_string(),
        }));
    }

    fn requests(&self) -> Vec<MeasurementRequest> {
        self.requests.borrow().clone()
    }
}

impl MeasurementClient for MockClient {
    async fn create(&self, request: &MeasurementRequest) -> Result<CreatedMeasurement, ClientError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses.borrow_mut().pop_front().unwrap_or(Err(ClientError::Api {
            status: 500,
            message: "unexpected request".to_string(),
        }))
    }
}

/// Renderer recording calls, with optional cancel/failure hooks
#[derive(Default)]
struct MockRenderer {
    calls: Vec<String>,
    samples: Vec<ProbeSample>,
    incremental_runs: u32,
    cancel_during_run: Option<(u32, CancellationToken)>,
    fail_on_run: Option<u32>,
    summary: Option<Vec<MeasurementStats>>,
    share: Option<(ShareLink, u16)>,
}

impl MockRenderer {
    fn with_samples(samples: Vec<ProbeSample>) -> Self {
        Self {
            samples,
            ..Default::default()
        }
    }
}

fn broken_pipe() -> RenderError {
    RenderError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"))
}

impl Renderer for MockRenderer {
    async fn render_initial(
        &mut self,
        run_id: &str,
        _request: &MeasurementRequest,
    ) -> Result<(), RenderError> {
        self.calls.push(format!("initial:{}", run_id));
        if self.fail_on_run == Some(1) {
            return Err(broken_pipe());
        }
        Ok(())
    }

    async fn render_incremental(
        &mut self,
        run_id: &str,
        _aggregate: &[MeasurementStats],
    ) -> Result<Vec<ProbeSample>, RenderError> {
        self.incremental_runs += 1;
        self.calls.push(format!("incremental:{}", run_id));

        if let Some((run, cancel)) = &self.cancel_during_run
            && *run == self.incremental_runs
        {
            cancel.cancel();
        }
        if self.fail_on_run == Some(self.incremental_runs) {
            return Err(broken_pipe());
        }
        Ok(self.samples.clone())
    }

    fn render_summary(
        &mut self,
        _target: &str,
        runs: u32,
        aggregate: &[MeasurementStats],
    ) -> Result<(), RenderError> {
        self.calls.push(format!("summary:{}", runs));
        self.summary = Some(aggregate.to_vec());
        Ok(())
    }

    fn render_share_link(
        &mut self,
        link: &ShareLink,
        packets_per_run: u16,
    ) -> Result<(), RenderError> {
        self.calls.push("share".to_string());
        self.share = Some((link.clone(), packets_per_run));
        Ok(())
    }
}

#[derive(Default)]
struct MockLog {
    ids: Vec<String>,
}

impl MeasurementLog for MockLog {
    fn append(&mut self, id: &str) -> io::Result<()> {
        self.ids.push(id.to_string());
        Ok(())
    }
}

fn sample(location: &str, rcv: u64, avg: f64) -> ProbeSample {
    ProbeSample {
        location: location.to_string(),
        sent: 16,
        rcv,
        last: avg,
        min: avg - 1.0,
        avg,
        max: avg + 1.0,
        time: 15000.0,
    }
}

fn ping_context() -> SessionContext {
    SessionContext::new(CommandKind::Ping, "jsdelivr.com", 1)
}

type TestSession = ContinuousSession<MockClient, MockRenderer, MockLog>;

fn session(ctx: SessionContext, client: MockClient, renderer: MockRenderer) -> (TestSession, CancellationToken) {
    let cancel = CancellationToken::new();
    let session = ContinuousSession::new(ctx, client, renderer, MockLog::default(), cancel.clone());
    (session, cancel)
}

#[tokio::test]
async fn test_single_run_session() {
    let (mut session, _) = session(
        ping_context(),
        MockClient::with_ids(&["id1"], 1),
        MockRenderer::default(),
    );

    session.run().await.unwrap();

    let requests = session.client().requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, "jsdelivr.com");
    assert_eq!(requests[0].limit, 1);
    assert_eq!(requests[0].locations, vec![Location::new("world")]);

    assert_eq!(session.renderer().calls, vec!["initial:id1"]);
    assert_eq!(session.log().ids, vec!["id1"]);
    assert_eq!(session.context().call_count, 1);
    assert_eq!(session.context().chain_anchor, None);
    assert_eq!(session.state(), SessionState::Terminated);
}

#[tokio::test]
async fn test_continuous_runs_are_chained() {
    let ctx = ping_context()
        .with_continuous(true)
        .with_max_runs(Some(3));
    let (mut session, _) = session(
        ctx,
        MockClient::with_ids(&["id1", "id2", "id3"], 1),
        MockRenderer::with_samples(vec![sample("Berlin", 16, 10.0)]),
    );

    session.run().await.unwrap();

    let requests = session.client().requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].locations, vec![Location::new("world")]);
    assert_eq!(requests[0].measurement_options.packets, None);
    assert_eq!(requests[1].locations, vec![Location::new("id1")]);
    assert_eq!(requests[1].measurement_options.packets, Some(16));
    assert_eq!(requests[2].locations, vec![Location::new("id2")]);
    assert_eq!(requests[2].measurement_options.packets, Some(16));

    assert_eq!(
        session.renderer().calls,
        vec!["incremental:id1", "incremental:id2", "incremental:id3", "summary:3"]
    );
    assert_eq!(session.context().call_count, 3);
    assert_eq!(session.context().chain_anchor.as_deref(), Some("id2"));
}

#[tokio::test]
async fn test_continuous_session_logs_only_first_run() {
    let ctx = ping_context()
        .with_continuous(true)
        .with_max_runs(Some(3));
    let (mut session, _) = session(
        ctx,
        MockClient::with_ids(&["id1", "id2", "id3"], 1),
        MockRenderer::default(),
    );

    session.run().await.unwrap();

    assert_eq!(session.log().ids, vec!["id1"]);
}

#[tokio::test]
async fn test_cancellation_waits_for_current_run() {
    let ctx = ping_context().with_continuous(true);
    let client = MockClient::with_ids(&["id1", "id2", "id3", "id4", "id5"], 1);
    let cancel = CancellationToken::new();
    let renderer = MockRenderer {
        cancel_during_run: Some((3, cancel.clone())),
        ..MockRenderer::with_samples(vec![sample("Berlin", 16, 10.0)])
    };
    let mut session = ContinuousSession::new(ctx, client, renderer, MockLog::default(), cancel);

    session.run().await.unwrap();

    assert_eq!(session.context().call_count, 3);
    assert!(session.context().cancelled);
    assert_eq!(session.client().requests().len(), 3);
    assert_eq!(session.renderer().calls.last().map(String::as_str), Some("summary:3"));
    assert_eq!(session.state(), SessionState::Terminated);

    // All three runs were folded in before stopping
    let summary = session.renderer().summary.clone().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].sent, 48);
}

#[tokio::test]
async fn test_cancelled_before_start_still_completes_first_run() {
    let ctx = ping_context().with_continuous(true);
    let (mut session, cancel) = session(ctx, MockClient::with_ids(&["id1", "id2"], 1), MockRenderer::default());
    cancel.cancel();
    cancel.cancel();

    session.run().await.unwrap();

    assert_eq!(session.context().call_count, 1);
    assert_eq!(session.renderer().calls, vec!["incremental:id1", "summary:1"]);
}

#[tokio::test]
async fn test_share_link_truncated_to_history() {
    let ctx = ping_context()
        .with_continuous(true)
        .with_max_runs(Some(2))
        .with_max_history(1)
        .with_share(true);
    let (mut session, _) = session(
        ctx,
        MockClient::with_ids(&["id1", "id2"], 2),
        MockRenderer::with_samples(vec![sample("Berlin", 16, 10.0), sample("Tokyo", 16, 200.0)]),
    );

    session.run().await.unwrap();

    let (link, packets) = session.renderer().share.clone().unwrap();
    assert_eq!(link.url, "https://globalping.io?measurement=id2");
    assert!(link.truncated);
    assert!(!link.single_probe);
    assert_eq!(packets, 16);
    assert_eq!(
        session.renderer().calls,
        vec!["incremental:id1", "incremental:id2", "summary:2", "share"]
    );
}

#[tokio::test]
async fn test_share_link_single_probe() {
    let ctx = ping_context()
        .with_continuous(true)
        .with_max_runs(Some(2))
        .with_share(true);
    let (mut session, _) = session(
        ctx,
        MockClient::with_ids(&["id1", "id2"], 1),
        MockRenderer::with_samples(vec![sample("Berlin", 16, 10.0)]),
    );

    session.run().await.unwrap();

    let (link, _) = session.renderer().share.clone().unwrap();
    assert_eq!(link.url, "https://globalping.io?measurement=id2");
    assert!(link.single_probe);
    assert!(!link.truncated);
}

#[tokio::test]
async fn test_one_shot_share_without_summary() {
    let ctx = ping_context().with_share(true);
    let (mut session, _) = session(ctx, MockClient::with_ids(&["id1"], 3), MockRenderer::default());

    session.run().await.unwrap();

    assert_eq!(session.renderer().calls, vec!["initial:id1", "share"]);
    let (link, _) = session.renderer().share.clone().unwrap();
    assert_eq!(link.url, "https://globalping.io?measurement=id1");
    assert!(!link.truncated);
}

#[tokio::test]
async fn test_first_request_failure_is_fatal() {
    let client = MockClient::default();
    client.push_err(400);
    let ctx = ping_context().with_continuous(true).with_share(true);
    let (mut session, _) = session(ctx, client, MockRenderer::default());

    let err = session.run().await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::Request {
            run: 1,
            source: ClientError::Api { status: 400, .. }
        }
    ));
    assert!(session.renderer().calls.is_empty());
    assert!(session.log().ids.is_empty());
    assert_eq!(session.context().call_count, 0);
    assert_eq!(session.state(), SessionState::Terminated);
}

#[tokio::test]
async fn test_later_request_failure_keeps_partial_results() {
    let client = MockClient::with_ids(&["id1", "id2"], 1);
    client.push_err(429);
    let ctx = ping_context().with_continuous(true);
    let (mut session, _) = session(
        ctx,
        client,
        MockRenderer::with_samples(vec![sample("Berlin", 8, 10.0)]),
    );

    let err = session.run().await.unwrap_err();

    assert_eq!(err.run(), 3);
    assert!(matches!(err, SessionError::Request { .. }));
    assert_eq!(
        session.renderer().calls,
        vec!["incremental:id1", "incremental:id2", "summary:2"]
    );

    let summary = session.renderer().summary.clone().unwrap();
    assert_eq!(summary[0].sent, 32);
    assert_eq!(summary[0].rcv, 16);
    assert_eq!(summary[0].loss, 50.0);
    assert_eq!(session.state(), SessionState::Terminated);
}

#[tokio::test]
async fn test_render_failure_aborts_without_summary() {
    let ctx = ping_context().with_continuous(true).with_share(true);
    let renderer = MockRenderer {
        fail_on_run: Some(2),
        ..Default::default()
    };
    let (mut session, _) = session(ctx, MockClient::with_ids(&["id1", "id2", "id3"], 1), renderer);

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, SessionError::Render { run: 2, .. }));
    assert_eq!(session.client().requests().len(), 2);
    assert_eq!(session.renderer().calls, vec!["incremental:id1", "incremental:id2"]);
    assert!(session.renderer().summary.is_none());
    assert!(session.renderer().share.is_none());
}

#[tokio::test]
async fn test_one_shot_render_failure() {
    let renderer = MockRenderer {
        fail_on_run: Some(1),
        ..Default::default()
    };
    let (mut session, _) = session(ping_context().with_share(true), MockClient::with_ids(&["id1"], 1), renderer);

    let err = session.run().await.unwrap_err();

    assert!(matches!(err, SessionError::Render { run: 1, .. }));
    assert_eq!(session.renderer().calls, vec!["initial:id1"]);
    assert_eq!(session.log().ids, vec!["id1"]);
}

#[tokio::test]
async fn test_stats_aggregate_across_runs() {
    let ctx = ping_context()
        .with_continuous(true)
        .with_max_runs(Some(3));
    let (mut session, _) = session(
        ctx,
        MockClient::with_ids(&["id1", "id2", "id3"], 2),
        MockRenderer::with_samples(vec![sample("Berlin", 16, 10.0), sample("Tokyo", 0, 0.0)]),
    );

    session.run().await.unwrap();

    let stats = &session.context().aggregated_stats;
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].location, "Berlin");
    assert_eq!(stats[0].sent, 48);
    assert_eq!(stats[0].rcv, 48);
    assert_eq!(stats[0].avg, 10.0);
    assert_eq!(stats[0].time, 45000.0);

    assert_eq!(stats[1].loss, 100.0);
    assert!(!stats[1].has_data());
    assert_eq!(stats[1].avg, -1.0);
}

#[tokio::test]
async fn test_session_runs_once() {
    let (mut session, _) = session(ping_context(), MockClient::with_ids(&["id1", "id2"], 1), MockRenderer::default());

    session.run().await.unwrap();
    session.run().await.unwrap();

    assert_eq!(session.client().requests().len(), 1);
    assert_eq!(session.context().call_count, 1);
}
