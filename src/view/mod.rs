//! Result rendering, one view per command kind.

pub mod format;
pub mod ping;
pub mod raw;

use log::debug;
use std::io::{self, Write};
use std::time::Duration;
use thiserror::Error;

use crate::measurement::{
    ClientError, CommandKind, Measurement, MeasurementRequest, MeasurementStatus,
    ProbeMeasurement, ResultFetcher,
};
use crate::share::ShareLink;
use crate::state::{MeasurementStats, ProbeSample};

pub use ping::PingView;
pub use raw::RawView;

/// Default delay between result polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to fetch results: {0}")]
    Fetch(#[from] ClientError),
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
    #[error("measurement {id} {status} on every probe")]
    MeasurementFailed { id: String, status: MeasurementStatus },
}

/// Output capability consumed by the session
#[allow(async_fn_in_trait)]
pub trait Renderer {
    /// Render a one-shot run
    async fn render_initial(
        &mut self,
        run_id: &str,
        request: &MeasurementRequest,
    ) -> Result<(), RenderError>;

    /// Render one run of a continuous session and return its per-probe samples.
    ///
    /// `aggregate` holds the running figures before this run.
    async fn render_incremental(
        &mut self,
        run_id: &str,
        aggregate: &[MeasurementStats],
    ) -> Result<Vec<ProbeSample>, RenderError>;

    /// Render the final aggregated view
    fn render_summary(&mut self, target: &str, runs: u32, aggregate: &[MeasurementStats])
    -> Result<(), RenderError>;

    /// Render the share notice
    fn render_share_link(&mut self, link: &ShareLink, packets_per_run: u16)
    -> Result<(), RenderError>;
}

/// Output sinks for the views
pub struct Printer {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
    styled: bool,
}

impl Printer {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>, styled: bool) -> Self {
        Self { out, err, styled }
    }

    /// stdout/stderr
    pub fn stdio(styled: bool) -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()), styled)
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    pub fn err(&mut self) -> &mut dyn Write {
        &mut *self.err
    }

    pub fn styled(&self) -> bool {
        self.styled
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

/// Poll a measurement until it finishes, calling `on_done` once per probe as
/// each probe's result completes.
///
/// Fails with `MeasurementFailed` once finished if no probe produced a result.
pub(crate) async fn stream_results<F, P>(
    fetcher: &F,
    id: &str,
    poll: Duration,
    mut on_done: P,
) -> Result<Measurement, RenderError>
where
    F: ResultFetcher,
    P: FnMut(usize, &ProbeMeasurement) -> Result<(), RenderError>,
{
    let mut done: Vec<bool> = Vec::new();
    loop {
        let measurement = fetcher.fetch(id).await?;
        if done.len() < measurement.results.len() {
            done.resize(measurement.results.len(), false);
        }

        let finished = measurement.status.is_done();
        for (i, result) in measurement.results.iter().enumerate() {
            if !done[i] && (finished || result.result.status.is_done()) {
                done[i] = true;
                on_done(i, result)?;
            }
        }

        if finished {
            return match failure_status(&measurement) {
                Some(status) => Err(RenderError::MeasurementFailed {
                    id: id.to_string(),
                    status,
                }),
                None => Ok(measurement),
            };
        }

        debug!("measurement {} in progress, polling again", id);
        tokio::time::sleep(poll).await;
    }
}

/// Failed/offline status of a finished measurement where every probe failed
fn failure_status(measurement: &Measurement) -> Option<MeasurementStatus> {
    if measurement.status.is_failure() {
        return Some(measurement.status);
    }
    let results = &measurement.results;
    if results.is_empty() || !results.iter().all(|r| r.result.status.is_failure()) {
        return None;
    }
    if results.iter().all(|r| r.result.status == MeasurementStatus::Offline) {
        Some(MeasurementStatus::Offline)
    } else {
        Some(MeasurementStatus::Failed)
    }
}

/// View selected once per session from the command kind
pub enum AnyView<F> {
    Ping(PingView<F>),
    Raw(RawView<F>),
}

impl<F: ResultFetcher> AnyView<F> {
    pub fn for_kind(kind: CommandKind, fetcher: F, printer: Printer, poll: Duration) -> Self {
        match kind {
            CommandKind::Ping => Self::Ping(PingView::new(fetcher, printer, poll)),
            _ => Self::Raw(RawView::new(kind, fetcher, printer, poll)),
        }
    }
}

impl<F: ResultFetcher> Renderer for AnyView<F> {
    async fn render_initial(
        &mut self,
        run_id: &str,
        request: &MeasurementRequest,
    ) -> Result<(), RenderError> {
        match self {
            Self::Ping(v) => v.render_initial(run_id, request).await,
            Self::Raw(v) => v.render_initial(run_id, request).await,
        }
    }

    async fn render_incremental(
        &mut self,
        run_id: &str,
        aggregate: &[MeasurementStats],
    ) -> Result<Vec<ProbeSample>, RenderError> {
        match self {
            Self::Ping(v) => v.render_incremental(run_id, aggregate).await,
            Self::Raw(v) => v.render_incremental(run_id, aggregate).await,
        }
    }

    fn render_summary(
        &mut self,
        target: &str,
        runs: u32,
        aggregate: &[MeasurementStats],
    ) -> Result<(), RenderError> {
        match self {
            Self::Ping(v) => v.render_summary(target, runs, aggregate),
            Self::Raw(v) => v.render_summary(target, runs, aggregate),
        }
    }

    fn render_share_link(
        &mut self,
        link: &ShareLink,
        packets_per_run: u16,
    ) -> Result<(), RenderError> {
        match self {
            Self::Ping(v) => v.render_share_link(link, packets_per_run),
            Self::Raw(v) => v.render_share_link(link, packets_per_run),
        }
    }
}
