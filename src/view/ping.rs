use std::time::Duration;

use super::format::{
    ping_sample, write_failed_row, write_raw_result, write_share_notice, write_stats_header,
    write_stats_row, write_summary,
};
use super::{stream_results, Printer, RenderError, Renderer};
use crate::measurement::{MeasurementRequest, ResultFetcher};
use crate::share::ShareLink;
use crate::state::{merge, MeasurementStats, ProbeSample};

/// Ping output: raw per-probe output for one-shot runs, a running table for
/// continuous sessions
pub struct PingView<F> {
    fetcher: F,
    printer: Printer,
    poll: Duration,
    header_printed: bool,
}

impl<F: ResultFetcher> PingView<F> {
    pub fn new(fetcher: F, printer: Printer, poll: Duration) -> Self {
        Self {
            fetcher,
            printer,
            poll,
            header_printed: false,
        }
    }
}

impl<F: ResultFetcher> Renderer for PingView<F> {
    async fn render_initial(
        &mut self,
        run_id: &str,
        _request: &MeasurementRequest,
    ) -> Result<(), RenderError> {
        let printer = &mut self.printer;
        let styled = printer.styled();
        stream_results(&self.fetcher, run_id, self.poll, |_, result| {
            write_raw_result(printer.out(), result, styled)?;
            Ok(())
        })
        .await?;
        self.printer.flush()?;
        Ok(())
    }

    async fn render_incremental(
        &mut self,
        run_id: &str,
        aggregate: &[MeasurementStats],
    ) -> Result<Vec<ProbeSample>, RenderError> {
        if !self.header_printed {
            write_stats_header(self.printer.out())?;
            self.header_printed = true;
        }

        // Each finished probe is shown with this run already folded in
        let printer = &mut self.printer;
        let measurement = stream_results(&self.fetcher, run_id, self.poll, |i, result| {
            let sample = ping_sample(result);
            if result.result.status.is_failure() {
                write_failed_row(printer.out(), &sample.location, result.result.status)?;
                return Ok(());
            }
            let base = aggregate
                .get(i)
                .cloned()
                .unwrap_or_else(|| MeasurementStats::new(&sample.location));
            write_stats_row(printer.out(), &merge(&base, &sample))?;
            Ok(())
        })
        .await?;
        self.printer.flush()?;

        Ok(measurement.results.iter().map(ping_sample).collect())
    }

    fn render_summary(
        &mut self,
        target: &str,
        runs: u32,
        aggregate: &[MeasurementStats],
    ) -> Result<(), RenderError> {
        write_summary(self.printer.out(), target, runs, aggregate)?;
        self.printer.flush()?;
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
