//! The measurement session engine.
//!
//! A session issues one run (one-shot mode) or a chain of runs (continuous
//! mode). Every chained run targets the probe set of the run before it, so
//! per-probe statistics stay aligned across runs. Cancellation is only
//! observed between runs; an in-flight request is never abandoned.

use log::{debug, info, warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::history_log::MeasurementLog;
use crate::measurement::{ClientError, MeasurementClient, MeasurementRequest};
use crate::share::ShareLinkBuilder;
use crate::state::SessionContext;
use crate::view::{RenderError, Renderer};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Stopping,
    Terminated,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("measurement request for run {run} failed: {source}")]
    Request { run: u32, source: ClientError },
    #[error("rendering run {run} failed: {source}")]
    Render { run: u32, source: RenderError },
}

impl SessionError {
    /// 1-based run the failure occurred on
    pub fn run(&self) -> u32 {
        match self {
            Self::Request { run, .. } | Self::Render { run, .. } => *run,
        }
    }
}

/// Drives the request → render → aggregate loop for one invocation
pub struct ContinuousSession<C, R, L> {
    ctx: SessionContext,
    client: C,
    renderer: R,
    log: L,
    cancel: CancellationToken,
    share: ShareLinkBuilder,
    state: SessionState,
}

impl<C, R, L> ContinuousSession<C, R, L>
where
    C: MeasurementClient,
    R: Renderer,
    L: MeasurementLog,
{
    pub fn new(
        ctx: SessionContext,
        client: C,
        renderer: R,
        log: L,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            client,
            renderer,
            log,
            cancel,
            share: ShareLinkBuilder::default(),
            state: SessionState::Idle,
        }
    }

    pub fn with_share_builder(mut self, share: ShareLinkBuilder) -> Self {
        self.share = share;
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Run the session to completion.
    ///
    /// A failure on the first run returns immediately with no summary. A
    /// request failure on a later run renders the summary of the runs that
    /// did succeed before returning the error. A render failure aborts at once.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            warn!("session already started, ignoring run()");
            return Ok(());
        }
        self.state = SessionState::Running;

        let request = self.ctx.first_request();
        let id = match self.issue(&request).await {
            Ok(id) => id,
            Err(source) => {
                self.state = SessionState::Terminated;
                return Err(SessionError::Request { run: 1, source });
            }
        };

        if let Err(e) = self.log.append(&id) {
            warn!("failed to save measurement ID {}: {}", id, e);
        }

        if !self.ctx.continuous {
            if let Err(source) = self.renderer.render_initial(&id, &request).await {
                self.state = SessionState::Terminated;
                return Err(SessionError::Render { run: 1, source });
            }
            let result = self.render_share();
            self.state = SessionState::Terminated;
            return result;
        }

        self.render_run(&id).await?;

        loop {
            if self.cancellation_observed() {
                info!("cancelled after {} runs", self.ctx.call_count);
                break;
            }
            if self.ctx.run_limit_reached() {
                debug!("run limit of {} reached", self.ctx.call_count);
                break;
            }

            self.ctx.chain_anchor = self.ctx.last_run().map(String::from);
            let request = self.ctx.next_request();
            let id = match self.issue(&request).await {
                Ok(id) => id,
                Err(source) => {
                    let run = self.ctx.call_count + 1;
                    if let Err(e) = self.finish() {
                        warn!("failed to render summary after request failure: {}", e);
                    }
                    return Err(SessionError::Request { run, source });
                }
            };

            self.render_run(&id).await?;
        }

        self.finish()
    }

    /// Create a run and record it
    async fn issue(&mut self, request: &MeasurementRequest) -> Result<String, ClientError> {
        let created = self.client.create(request).await?;
        self.ctx.record_run(&created.id);
        debug!(
            "run {}: measurement {} on {} probes",
            self.ctx.call_count, created.id, created.probes_count
        );
        Ok(created.id)
    }

    /// Incremental render of a continuous run, folding its samples in
    async fn render_run(&mut self, id: &str) -> Result<(), SessionError> {
        match self
            .renderer
            .render_incremental(id, &self.ctx.aggregated_stats)
            .await
        {
            Ok(samples) => {
                self.ctx.merge_samples(&samples);
                Ok(())
            }
            Err(source) => {
                self.state = SessionState::Terminated;
                Err(SessionError::Render {
                    run: self.ctx.call_count,
                    source,
                })
            }
        }
    }

    /// Poll the cancellation source; once seen it sticks
    fn cancellation_observed(&mut self) -> bool {
        if !self.ctx.cancelled && self.cancel.is_cancelled() {
            self.ctx.cancelled = true;
        }
        self.ctx.cancelled
    }

    /// Stopping → Terminated: summary, then the share link
    fn finish(&mut self) -> Result<(), SessionError> {
        self.state = SessionState::Stopping;
        let result = self
            .renderer
            .render_summary(
                &self.ctx.target,
                self.ctx.call_count,
                &self.ctx.aggregated_stats,
            )
            .map_err(|source| SessionError::Render {
                run: self.ctx.call_count,
                source,
            })
            .and_then(|_| self.render_share());
        self.state = SessionState::Terminated;
        result
    }

    fn render_share(&mut self) -> Result<(), SessionError> {
        if !self.ctx.share {
            return Ok(());
        }

        let link = self.share.build(
            &self.ctx.history,
            self.ctx.call_count,
            self.ctx.aggregated_stats.len(),
        );
        match link {
            Some(link) => self
                .renderer
                .render_share_link(&link, self.ctx.packets_per_run)
                .map_err(|source| SessionError::Render {
                    run: self.ctx.call_count,
                    source,
                }),
            None => Ok(()),
        }
    }
}
