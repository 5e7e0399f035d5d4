use clap::Parser;

use crate::measurement::CommandKind;

/// Run network diagnostics from probes around the world and view the results locally
#[derive(Parser, Debug, Clone)]
#[command(name = "globalping")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Command to run on the probes
    #[arg(value_enum)]
    pub command: CommandKind,

    /// Target host (hostname, IP address, or URL for http)
    pub target: String,

    /// Probe locations, comma-separated (city, country, ASN, network, or a previous
    /// measurement: first, last, @N, @-N)
    #[arg(short = 'F', long = "from", default_value = "world")]
    pub from: String,

    /// Number of probes to use
    #[arg(short = 'L', long = "limit", default_value = "1")]
    pub limit: u32,

    /// Packets per probe (ping, mtr)
    #[arg(long = "packets")]
    pub packets: Option<u16>,

    /// Protocol (traceroute/mtr: icmp, tcp, udp; dns: udp, tcp; http: http, https, http2)
    #[arg(long = "protocol")]
    pub protocol: Option<String>,

    /// Destination port
    #[arg(long = "port")]
    pub port: Option<u16>,

    /// Resolver for dns and http
    #[arg(long = "resolver")]
    pub resolver: Option<String>,

    /// DNS record type
    #[arg(long = "type")]
    pub query_type: Option<String>,

    /// Trace DNS delegation path
    #[arg(long = "trace")]
    pub trace: bool,

    /// HTTP method (GET, HEAD)
    #[arg(long = "method")]
    pub method: Option<String>,

    /// HTTP path
    #[arg(long = "path")]
    pub path: Option<String>,

    /// HTTP query string
    #[arg(long = "query")]
    pub query: Option<String>,

    /// HTTP Host header
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Keep measuring until interrupted (ping only)
    #[arg(long = "infinite")]
    pub infinite: bool,

    /// Stop a continuous session after this many runs
    #[arg(long = "runs", requires = "infinite")]
    pub runs: Option<u32>,

    /// Packets per probe for each chained run of a continuous session
    #[arg(long = "packets-per-run")]
    pub packets_per_run: Option<u16>,

    /// Print a link to view the results online
    #[arg(long = "share")]
    pub share: bool,

    /// Number of run IDs kept for the share link
    #[arg(long = "max-history")]
    pub max_history: Option<usize>,

    /// Disable colors and other terminal styling
    #[arg(long = "ci")]
    pub ci: bool,
}

impl Args {
    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.target.trim().is_empty() {
            return Err("Target cannot be empty".into());
        }

        if self.limit == 0 {
            return Err("Limit must be at least 1".into());
        }

        // Upper bound enforced by the API
        const MAX_LIMIT: u32 = 500;
        if self.limit > MAX_LIMIT {
            return Err(format!("Limit cannot exceed {}", MAX_LIMIT));
        }

        if self.infinite && self.command != CommandKind::Ping {
            return Err(format!(
                "--infinite is only supported for ping, not {}",
                self.command
            ));
        }

        if let Some(packets) = self.packets {
            if !(1..=16).contains(&packets) {
                return Err("Packets must be between 1 and 16".into());
            }
            if !matches!(self.command, CommandKind::Ping | CommandKind::Mtr) {
                return Err(format!("--packets is not supported for {}", self.command));
            }
        }

        if self.packets_per_run == Some(0) {
            return Err("Packets per run must be at least 1".into());
        }

        if self.runs == Some(0) {
            return Err("Runs must be at least 1".into());
        }

        if self.max_history == Some(0) {
            return Err("Max history must be at least 1".into());
        }

        if let Some(ref protocol) = self.protocol {
            let allowed: &[&str] = match self.command {
                CommandKind::Traceroute | CommandKind::Mtr => &["icmp", "tcp", "udp"],
                CommandKind::Dns => &["udp", "tcp"],
                CommandKind::Http => &["http", "https", "http2"],
                CommandKind::Ping => &[],
            };
            if !allowed.contains(&protocol.to_lowercase().as_str()) {
                return Err(format!(
                    "Unknown protocol {} for {}",
                    protocol, self.command
                ));
            }
        }

        Ok(())
    }

    /// Location list from `--from`
    pub fn locations(&self) -> Vec<String> {
        self.from
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }
}
