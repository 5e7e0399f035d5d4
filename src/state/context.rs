use chrono::{DateTime, Utc};

use crate::measurement::{CommandKind, Location, MeasurementOptions, MeasurementRequest};
use crate::state::history::HistoryBuffer;
use crate::state::stats::{merge_run, MeasurementStats, ProbeSample};

/// Packets per probe for every chained run of a continuous session
pub const DEFAULT_PACKETS_PER_RUN: u16 = 16;

/// Number of run IDs kept for the share link
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Mutable state threaded through one session
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub target: String,
    pub kind: CommandKind,
    /// Probe count requested for the first run
    pub limit: u32,
    /// Probe selectors for the first run
    pub locations: Vec<Location>,
    /// Options as given by the user
    pub options: MeasurementOptions,
    pub continuous: bool,
    pub share: bool,
    /// Stop after this many runs in continuous mode (None = until cancelled)
    pub max_runs: Option<u32>,
    /// Runs completed so far
    pub call_count: u32,
    /// ID the next run chains onto
    pub chain_anchor: Option<String>,
    pub packets_per_run: u16,
    /// Per-probe running figures, index-aligned across runs
    pub aggregated_stats: Vec<MeasurementStats>,
    pub history: HistoryBuffer,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(kind: CommandKind, target: impl Into<String>, limit: u32) -> Self {
        Self {
            target: target.into(),
            kind,
            limit,
            locations: vec![Location::new("world")],
            options: MeasurementOptions::default(),
            continuous: false,
            share: false,
            max_runs: None,
            call_count: 0,
            chain_anchor: None,
            packets_per_run: DEFAULT_PACKETS_PER_RUN,
            aggregated_stats: Vec::new(),
            history: HistoryBuffer::new(DEFAULT_MAX_HISTORY),
            cancelled: false,
            started_at: Utc::now(),
        }
    }

    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = locations;
        self
    }

    pub fn with_options(mut self, options: MeasurementOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_continuous(mut self, continuous: bool) -> Self {
        self.continuous = continuous;
        self
    }

    pub fn with_share(mut self, share: bool) -> Self {
        self.share = share;
        self
    }

    pub fn with_max_runs(mut self, max_runs: Option<u32>) -> Self {
        self.max_runs = max_runs;
        self
    }

    pub fn with_packets_per_run(mut self, packets: u16) -> Self {
        self.packets_per_run = packets;
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.history = HistoryBuffer::new(max_history);
        self
    }

    /// Request for the first run: user locations, user options, no anchor
    pub fn first_request(&self) -> MeasurementRequest {
        MeasurementRequest {
            kind: self.kind,
            target: self.target.clone(),
            limit: self.limit,
            locations: self.locations.clone(),
            measurement_options: self.options.clone(),
            in_progress_updates: true,
        }
    }

    /// Request for a chained run: the anchor's probe set with `packets_per_run` packets.
    ///
    /// Falls back to the first-run locations while no anchor is set.
    pub fn next_request(&self) -> MeasurementRequest {
        let mut request = self.first_request();
        if let Some(anchor) = &self.chain_anchor {
            request.locations = vec![Location::new(anchor.clone())];
        }
        request.measurement_options.packets = Some(self.packets_per_run);
        request
    }

    /// Book-keeping for a run whose creation succeeded
    pub fn record_run(&mut self, id: &str) {
        self.call_count += 1;
        self.history.push(id);
    }

    /// Fold a run's samples into the aggregate
    pub fn merge_samples(&mut self, samples: &[ProbeSample]) {
        merge_run(&mut self.aggregated_stats, samples);
    }

    /// Latest run ID
    pub fn last_run(&self) -> Option<&str> {
        self.history.last()
    }

    /// Whether the call-count limit has been reached
    pub fn run_limit_reached(&self) -> bool {
        self.max_runs.is_some_and(|max| self.call_count >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_request_has_no_anchor() {
        let ctx = SessionContext::new(CommandKind::Ping, "jsdelivr.com", 1);
        let request = ctx.first_request();

        assert_eq!(request.kind, CommandKind::Ping);
        assert_eq!(request.target, "jsdelivr.com");
        assert_eq!(request.limit, 1);
        assert_eq!(request.locations, vec![Location::new("world")]);
        assert_eq!(request.measurement_options, MeasurementOptions::default());
    }

    #[test]
    fn test_next_request_chains_and_overrides_packets() {
        let mut ctx = SessionContext::new(CommandKind::Ping, "jsdelivr.com", 3)
            .with_locations(vec![Location::new("Berlin"), Location::new("Tokyo")])
            .with_options(MeasurementOptions {
                packets: Some(4),
                ..Default::default()
            })
            .with_packets_per_run(20);
        ctx.chain_anchor = Some("run-1".to_string());

        let request = ctx.next_request();
        assert_eq!(request.locations, vec![Location::new("run-1")]);
        assert_eq!(request.measurement_options.packets, Some(20));
        assert_eq!(request.limit, 3);

        // First-run options are untouched
        assert_eq!(ctx.first_request().measurement_options.packets, Some(4));
    }

    #[test]
    fn test_record_run_and_limit() {
        let mut ctx = SessionContext::new(CommandKind::Ping, "x", 1)
            .with_max_runs(Some(2))
            .with_max_history(1);
        assert!(!ctx.run_limit_reached());

        ctx.record_run("a");
        ctx.record_run("b");
        assert_eq!(ctx.call_count, 2);
        assert!(ctx.run_limit_reached());
        assert_eq!(ctx.last_run(), Some("b"));
        assert_eq!(ctx.history.len(), 1);
    }

    #[test]
    fn test_unlimited_runs() {
        let mut ctx = SessionContext::new(CommandKind::Ping, "x", 1);
        for i in 0..100 {
            ctx.record_run(&format!("id{}", i));
        }
        assert!(!ctx.run_limit_reached());
    }
}
