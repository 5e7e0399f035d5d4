use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic command executed by the probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Ping,
    Traceroute,
    Dns,
    Mtr,
    Http,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Traceroute => "traceroute",
            Self::Dns => "dns",
            Self::Mtr => "mtr",
            Self::Http => "http",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe selector: a location name, or a previous measurement ID to reuse its probes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub magic: String,
}

impl Location {
    pub fn new(magic: impl Into<String>) -> Self {
        Self {
            magic: magic.into(),
        }
    }
}

/// DNS query options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsQuery {
    #[serde(rename = "type")]
    pub record_type: String,
}

/// HTTP request options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl HttpRequest {
    pub fn is_empty(&self) -> bool {
        self.host.is_none() && self.path.is_none() && self.query.is_none() && self.method.is_none()
    }
}

/// Command-specific options. Unset fields are left to API defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packets: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<DnsQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequest>,
}

/// Body of a measurement creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRequest {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub target: String,
    pub limit: u32,
    pub locations: Vec<Location>,
    pub measurement_options: MeasurementOptions,
    pub in_progress_updates: bool,
}

/// Response to a measurement creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedMeasurement {
    pub id: String,
    pub probes_count: u32,
}

/// Lifecycle status of a measurement or a single probe result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeasurementStatus {
    InProgress,
    Finished,
    Failed,
    Offline,
}

impl MeasurementStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// The probe (or measurement) ended without a usable result
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Offline)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in-progress",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for MeasurementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a probe is located
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeInfo {
    pub continent: String,
    pub region: String,
    pub country: String,
    pub state: Option<String>,
    pub city: String,
    pub asn: u32,
    pub network: String,
}

impl ProbeInfo {
    /// "City (State), CC, EU, Network (ASN)"
    pub fn label(&self) -> String {
        let city = match &self.state {
            Some(state) => format!("{} ({})", self.city, state),
            None => self.city.clone(),
        };
        format!(
            "{}, {}, {}, {} (AS{})",
            city, self.country, self.continent, self.network, self.asn
        )
    }
}

/// Summary figures reported by a ping probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingStats {
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
    pub total: u64,
    pub rcv: u64,
    pub drop: u64,
    pub loss: f64,
}

/// A single ping reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingTiming {
    pub rtt: f64,
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// Result body of one probe. Fields not used by a command are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    pub status: MeasurementStatus,
    #[serde(default)]
    pub raw_output: String,
    #[serde(default)]
    pub resolved_address: Option<String>,
    #[serde(default)]
    pub resolved_hostname: Option<String>,
    #[serde(default)]
    pub stats: Option<PingStats>,
    #[serde(default)]
    pub timings: serde_json::Value,
}

impl ProbeOutcome {
    /// Ping replies, empty for other commands
    pub fn ping_timings(&self) -> Vec<PingTiming> {
        serde_json::from_value(self.timings.clone()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeMeasurement {
    pub probe: ProbeInfo,
    pub result: ProbeOutcome,
}

/// Full measurement as returned by the results endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub status: MeasurementStatus,
    pub target: String,
    #[serde(default)]
    pub probes_count: u32,
    #[serde(default)]
    pub results: Vec<ProbeMeasurement>,
}
