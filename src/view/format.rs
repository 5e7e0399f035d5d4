//! Plain-text formatting shared by the views.

use std::io::{self, Write};

use crate::measurement::{MeasurementStatus, ProbeMeasurement};
use crate::share::ShareLink;
use crate::state::{MeasurementStats, ProbeSample, NO_DATA};

const HIGHLIGHT: &str = "\x1b[1;38;5;43m";
const RESET: &str = "\x1b[0m";

/// Latency cell: milliseconds, or "-" for the no-data sentinels
pub fn fmt_latency(ms: f64) -> String {
    if !ms.is_finite() || ms < 0.0 {
        "-".to_string()
    } else {
        format!("{:.2} ms", ms)
    }
}

pub fn highlight(s: &str, styled: bool) -> String {
    if styled {
        format!("{}{}{}", HIGHLIGHT, s, RESET)
    } else {
        s.to_string()
    }
}

/// "> location" header followed by the probe's raw output, or a notice for a
/// failed/offline probe
pub fn write_raw_result<W: Write + ?Sized>(
    w: &mut W,
    result: &ProbeMeasurement,
    styled: bool,
) -> io::Result<()> {
    let header = format!("> {}", result.probe.label());
    writeln!(w, "{}", highlight(&header, styled))?;

    let raw = result.result.raw_output.trim_end();
    if result.result.status.is_failure() {
        writeln!(w, "Measurement {} on this probe", result.result.status)?;
        if !raw.is_empty() {
            writeln!(w, "{}", raw)?;
        }
    } else {
        writeln!(w, "{}", raw)?;
    }
    writeln!(w)
}

const ROW_HEADER: [&str; 7] = ["Location", "Sent", "Loss", "Last", "Min", "Avg", "Max"];

fn write_row<W: Write + ?Sized>(w: &mut W, cells: [&str; 7]) -> io::Result<()> {
    writeln!(
        w,
        "{:<50} {:>6} {:>7} {:>10} {:>10} {:>10} {:>10}",
        cells[0], cells[1], cells[2], cells[3], cells[4], cells[5], cells[6]
    )
}

pub fn write_stats_header<W: Write + ?Sized>(w: &mut W) -> io::Result<()> {
    write_row(w, ROW_HEADER)?;
    writeln!(w, "{}", "-".repeat(109))
}

/// One table row for a probe's running statistics
pub fn write_stats_row<W: Write + ?Sized>(w: &mut W, stats: &MeasurementStats) -> io::Result<()> {
    let sent = stats.sent.to_string();
    let loss = format!("{:.1}%", stats.loss);
    let last = fmt_latency(stats.last);
    let min = fmt_latency(stats.min);
    let avg = fmt_latency(stats.avg);
    let max = fmt_latency(stats.max);
    write_row(
        w,
        [
            stats.location.as_str(),
            sent.as_str(),
            loss.as_str(),
            last.as_str(),
            min.as_str(),
            avg.as_str(),
            max.as_str(),
        ],
    )
}

/// Table row for a probe that produced nothing this run; the status sits in the Loss column
pub fn write_failed_row<W: Write + ?Sized>(
    w: &mut W,
    location: &str,
    status: MeasurementStatus,
) -> io::Result<()> {
    write_row(w, [location, "-", status.as_str(), "-", "-", "-", "-"])
}

/// Table of aggregated statistics, similar to `mtr --report`
pub fn write_summary<W: Write + ?Sized>(
    w: &mut W,
    target: &str,
    runs: u32,
    aggregate: &[MeasurementStats],
) -> io::Result<()> {
    writeln!(w)?;
    writeln!(
        w,
        "Summary for {} ({} run{})",
        target,
        runs,
        if runs == 1 { "" } else { "s" }
    )?;
    write_stats_header(w)?;
    for stats in aggregate {
        write_stats_row(w, stats)?;
    }
    Ok(())
}

/// Share notice, written to stderr by the views
pub fn write_share_notice<W: Write + ?Sized>(
    w: &mut W,
    link: &ShareLink,
    packets_per_run: u16,
    styled: bool,
) -> io::Result<()> {
    let message = format!("> View the results online: {}", link.url);
    if link.single_probe {
        return writeln!(w, "{}", highlight(&message, styled));
    }

    writeln!(w)?;
    writeln!(w, "{}", highlight(&message, styled))?;
    if link.truncated {
        writeln!(
            w,
            "For long-running continuous mode measurements, only the last {} packets are shared.",
            packets_per_run
        )?;
    }
    Ok(())
}

/// Total duration from a ping summary line ("..., time 3004ms")
pub fn parse_ping_time(raw: &str) -> f64 {
    raw.lines()
        .filter(|l| l.contains("packets transmitted"))
        .find_map(|l| {
            let rest = l.split("time ").nth(1)?;
            let digits: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            digits.parse::<f64>().ok()
        })
        .unwrap_or(0.0)
}

/// Extract one run's figures for a ping probe
pub fn ping_sample(result: &ProbeMeasurement) -> ProbeSample {
    let location = result.probe.label();
    let Some(stats) = &result.result.stats else {
        return ProbeSample::empty(location, 0);
    };

    let time = parse_ping_time(&result.result.raw_output);
    if stats.rcv == 0 {
        return ProbeSample {
            time,
            ..ProbeSample::empty(location, stats.total)
        };
    }

    let last = result
        .result
        .ping_timings()
        .last()
        .map(|t| t.rtt)
        .unwrap_or(NO_DATA);

    ProbeSample {
        location,
        sent: stats.total,
        rcv: stats.rcv,
        last,
        min: stats.min.unwrap_or(f64::INFINITY),
        avg: stats.avg.unwrap_or(NO_DATA),
        max: stats.max.unwrap_or(NO_DATA),
        time,
    }
}
