use chrono::{DateTime, Utc};

/// Latency value meaning "no packet has been received yet"
pub const NO_DATA: f64 = -1.0;

/// Per-probe figures observed in a single run
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeSample {
    /// Human-readable probe location, used as the row label
    pub location: String,
    pub sent: u64,
    pub rcv: u64,
    /// Latency figures in milliseconds (`NO_DATA` / `f64::INFINITY` when nothing came back)
    pub last: f64,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    /// Duration the probe reported for the run, in milliseconds
    pub time: f64,
}

impl ProbeSample {
    /// Sample for a probe that answered nothing
    pub fn empty(location: impl Into<String>, sent: u64) -> Self {
        Self {
            location: location.into(),
            sent,
            rcv: 0,
            last: NO_DATA,
            min: f64::INFINITY,
            avg: NO_DATA,
            max: NO_DATA,
            time: 0.0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.rcv > 0
    }
}

/// Running statistics for one probe across every run of a session
#[derive(Debug, Clone)]
pub struct MeasurementStats {
    pub location: String,
    pub sent: u64,
    pub rcv: u64,
    pub lost: u64,
    /// Loss percentage over the merged totals
    pub loss: f64,
    pub last: f64,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    /// Summed probe-reported duration, in milliseconds
    pub time: f64,
    /// Number of samples folded in so far
    pub runs: u32,
    pub updated_at: DateTime<Utc>,
}

impl MeasurementStats {
    /// Fresh entry with "no data" sentinels
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            sent: 0,
            rcv: 0,
            lost: 0,
            loss: 0.0,
            last: NO_DATA,
            min: f64::INFINITY,
            avg: NO_DATA,
            max: NO_DATA,
            time: 0.0,
            runs: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether any packet has ever been received for this probe
    pub fn has_data(&self) -> bool {
        self.rcv > 0
    }
}

fn loss_pct(sent: u64, rcv: u64) -> f64 {
    if sent == 0 {
        0.0
    } else {
        sent.saturating_sub(rcv) as f64 / sent as f64 * 100.0
    }
}

/// Fold one run's sample into a probe's running statistics.
///
/// Counters and duration are summed, loss is recomputed from the totals and
/// the average is weighted by each side's received count. Latency fields of
/// a side with nothing received never leak into the result.
pub fn merge(existing: &MeasurementStats, sample: &ProbeSample) -> MeasurementStats {
    if existing.runs == 0 {
        let lost = sample.sent.saturating_sub(sample.rcv);
        let (last, min, avg, max) = if sample.has_data() {
            (sample.last, sample.min, sample.avg, sample.max)
        } else {
            (NO_DATA, f64::INFINITY, NO_DATA, NO_DATA)
        };
        return MeasurementStats {
            location: sample.location.clone(),
            sent: sample.sent,
            rcv: sample.rcv,
            lost,
            loss: loss_pct(sample.sent, sample.rcv),
            last,
            min,
            avg,
            max,
            time: sample.time,
            runs: 1,
            updated_at: Utc::now(),
        };
    }

    let sent = existing.sent + sample.sent;
    let rcv = existing.rcv + sample.rcv;
    let mut merged = MeasurementStats {
        location: existing.location.clone(),
        sent,
        rcv,
        lost: sent.saturating_sub(rcv),
        loss: loss_pct(sent, rcv),
        time: existing.time + sample.time,
        runs: existing.runs + 1,
        updated_at: Utc::now(),
        ..existing.clone()
    };

    if sample.has_data() {
        // A run with replies but no per-packet timings keeps the previous last
        if sample.last >= 0.0 {
            merged.last = sample.last;
        }
        merged.min = existing.min.min(sample.min);
        merged.max = existing.max.max(sample.max);
        merged.avg = if existing.has_data() {
            (existing.avg * existing.rcv as f64 + sample.avg * sample.rcv as f64) / rcv as f64
        } else {
            sample.avg
        };
    }

    merged
}

/// Fold a run's per-probe samples into the session aggregate.
///
/// Samples are index-aligned with `aggregate`; positions not seen before get
/// a fresh entry.
pub fn merge_run(aggregate: &mut Vec<MeasurementStats>, samples: &[ProbeSample]) {
    for (i, sample) in samples.iter().enumerate() {
        match aggregate.get_mut(i) {
            Some(stats) => *stats = merge(stats, sample),
            None => aggregate.push(merge(&MeasurementStats::new(&sample.location), sample)),
        }
    }
}
