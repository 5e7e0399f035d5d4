use std::time::Duration;

use crate::cli::Args;
use crate::measurement::{
    CommandKind, DnsQuery, HttpRequest, Location, MeasurementOptions,
};
use crate::prefs::Prefs;
use crate::share::DEFAULT_SHARE_BASE;
use crate::state::{SessionContext, DEFAULT_MAX_HISTORY, DEFAULT_PACKETS_PER_RUN};
use crate::view::DEFAULT_POLL_INTERVAL;

/// Default measurement API
pub const DEFAULT_API_URL: &str = "https://api.globalping.io/v1";

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "GLOBALPING_TOKEN";

/// Runtime configuration derived from CLI args and saved preferences
#[derive(Debug, Clone)]
pub struct Config {
    pub command: CommandKind,
    pub target: String,
    pub limit: u32,
    /// Location strings as given; references are resolved by the caller
    pub locations: Vec<String>,
    pub options: MeasurementOptions,
    pub continuous: bool,
    pub max_runs: Option<u32>,
    pub packets_per_run: u16,
    pub share: bool,
    pub max_history: usize,
    pub styled: bool,
    pub api_url: String,
    pub share_url: String,
    pub token: Option<String>,
    pub poll_interval: Duration,
}

impl Config {
    /// Merge CLI args over preferences. `token_env` is the value of `GLOBALPING_TOKEN`.
    pub fn new(args: &Args, prefs: &Prefs, token_env: Option<String>) -> Self {
        Self {
            command: args.command,
            target: args.target.clone(),
            limit: args.limit,
            locations: args.locations(),
            options: options_from(args),
            continuous: args.infinite,
            max_runs: args.runs,
            packets_per_run: args
                .packets_per_run
                .or(prefs.packets_per_run)
                .unwrap_or(DEFAULT_PACKETS_PER_RUN),
            share: args.share,
            max_history: args
                .max_history
                .or(prefs.max_history)
                .unwrap_or(DEFAULT_MAX_HISTORY),
            styled: !args.ci,
            api_url: prefs
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            share_url: DEFAULT_SHARE_BASE.to_string(),
            token: token_env
                .filter(|t| !t.is_empty())
                .or_else(|| prefs.token.clone()),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Session state for this configuration with already-resolved locations
    pub fn session_context(&self, locations: Vec<Location>) -> SessionContext {
        SessionContext::new(self.command, self.target.clone(), self.limit)
            .with_locations(locations)
            .with_options(self.options.clone())
            .with_continuous(self.continuous)
            .with_max_runs(self.max_runs)
            .with_packets_per_run(self.packets_per_run)
            .with_share(self.share)
            .with_max_history(self.max_history)
    }
}

/// Keep only the options that apply to the command
fn options_from(args: &Args) -> MeasurementOptions {
    let protocol = args.protocol.as_ref().map(|p| p.to_uppercase());
    match args.command {
        CommandKind::Ping => MeasurementOptions {
            packets: args.packets,
            ..Default::default()
        },
        CommandKind::Traceroute => MeasurementOptions {
            protocol,
            port: args.port,
            ..Default::default()
        },
        CommandKind::Mtr => MeasurementOptions {
            protocol,
            port: args.port,
            packets: args.packets,
            ..Default::default()
        },
        CommandKind::Dns => MeasurementOptions {
            protocol,
            port: args.port,
            resolver: args.resolver.clone(),
            query: args.query_type.as_ref().map(|t| DnsQuery {
                record_type: t.to_uppercase(),
            }),
            trace: args.trace.then_some(true),
            ..Default::default()
        },
        CommandKind::Http => {
            let request = HttpRequest {
                host: args.host.clone(),
                path: args.path.clone(),
                query: args.query.clone(),
                method: args.method.as_ref().map(|m| m.to_uppercase()),
            };
            MeasurementOptions {
                protocol,
                port: args.port,
                resolver: args.resolver.clone(),
                request: (!request.is_empty()).then_some(request),
                ..Default::default()
            }
        }
    }
}
