use std::time::Duration;

use super::format::{write_raw_result, write_share_notice};
use super::{stream_results, Printer, RenderError, Renderer};
use crate::measurement::{CommandKind, MeasurementRequest, ResultFetcher};
use crate::share::ShareLink;
use crate::state::{MeasurementStats, ProbeSample};

/// Raw per-probe output for traceroute, DNS, MTR and HTTP
pub struct RawView<F> {
    kind: CommandKind,
    fetcher: F,
    printer: Printer,
    poll: Duration,
}

impl<F: ResultFetcher> RawView<F> {
    pub fn new(kind: CommandKind, fetcher: F, printer: Printer, poll: Duration) -> Self {
        Self {
            kind,
            fetcher,
            printer,
            poll,
        }
    }

    async fn stream(&mut self, run_id: &str) -> Result<(), RenderError> {
        let printer = &mut self.printer;
        let styled = printer.styled();
        let measurement = stream_results(&self.fetcher, run_id, self.poll, |_, result| {
            write_raw_result(printer.out(), result, styled)?;
            Ok(())
        })
        .await?;

        if measurement.results.is_empty() {
            writeln!(self.printer.err(), "No {} results for {}", self.kind, measurement.target)?;
        }
        self.printer.flush()?;
        Ok(())
    }
}

impl<F: ResultFetcher> Renderer for RawView<F> {
    async fn render_initial(
        &mut self,
        run_id: &str,
        _request: &MeasurementRequest,
    ) -> Result<(), RenderError> {
        self.stream(run_id).await
    }

    async fn render_incremental(
        &mut self,
        run_id: &str,
        _aggregate: &[MeasurementStats],
    ) -> Result<Vec<ProbeSample>, RenderError> {
        self.stream(run_id).await?;
        Ok(Vec::new())
    }

    fn render_summary(
        &mut self,
        _target: &str,
        _runs: u32,
        _aggregate: &[MeasurementStats],
    ) -> Result<(), RenderError> {
        Ok(())
    }

    fn render_share_link(
        &mut self,
        link: &ShareLink,
        packets_per_run: u16,
    ) -> Result<(), RenderError> {
        let styled = self.printer.styled();
        write_share_notice(self.printer.err(), link, packets_per_run, styled)?;
        Ok(())
    }
}
