use clap::{Parser, ValueEnum};
use rps_sim::{RunConfig, Severity, TotalItems};

use std::{num::NonZeroU64, path::PathBuf, time::Duration};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Emit items as tracing events
    Tracing,
    /// Print items as JSON lines on stdout
    Json,
    /// Drop items
    Null,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Synthetic telemetry load generator
///
/// Sends items to a sink at a sustained target rate and prints the realized
/// throughput once per second.
///
/// Example usage:
///   rps-sim 500
///   rps-sim 100 --total 1000 --batch-size 10
///   rps-sim --config run.json --sink json
#[derive(Debug, Parser)]
#[command(name = "rps-sim")]
#[command(version, about = "Rate-paced synthetic telemetry load generator", long_about = None)]
pub struct Cli {
    /// Target items per second (defaults to 100 when absent or blank)
    #[arg(env = "RPS_SIM_RATE")]
    pub rate: Option<String>,

    /// Total items to send, or `unbounded`
    #[arg(short, long, env = "RPS_SIM_TOTAL")]
    pub total: Option<TotalItems>,

    /// Items per schedule step
    #[arg(short, long, env = "RPS_SIM_BATCH_SIZE")]
    pub batch_size: Option<NonZeroU64>,

    /// Severity attached to every item
    #[arg(long, env = "RPS_SIM_SEVERITY")]
    pub severity: Option<Severity>,

    /// Extra attempts per item before a sink failure aborts the run
    #[arg(long, env = "RPS_SIM_SINK_RETRIES")]
    pub sink_retries: Option<u32>,

    /// Seed for item identifiers
    #[arg(long, env = "RPS_SIM_SEED")]
    pub seed: Option<u64>,

    /// Milliseconds between throughput reports
    #[arg(long, env = "RPS_SIM_REPORT_INTERVAL_MS")]
    pub report_interval_ms: Option<NonZeroU64>,

    /// JSON run configuration; flags override its values
    #[arg(short, long, env = "RPS_SIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Where generated items go
    #[arg(long, value_enum, default_value = "tracing")]
    pub sink: SinkKind,

    /// Throughput report format on stdout
    #[arg(long, value_enum, default_value = "text")]
    pub report: ReportFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Build the run configuration: file (or defaults) first, then flags.
    pub fn run_config(&self) -> rps_sim::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        // Blank keeps whatever the file said, or the default.
        if let Some(rate) = parse_rate(self.rate.as_deref())? {
            config.target_rate = rate;
        }
        if let Some(total) = self.total {
            config.total_items = total;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(severity) = self.severity {
            config.severity = severity;
        }
        if let Some(retries) = self.sink_retries {
            config.sink_retries = retries;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(ms) = self.report_interval_ms {
            config.report_interval = Duration::from_millis(ms.get());
        }
        Ok(config)
    }
}

/// `None` for a missing or blank argument.
fn parse_rate(raw: Option<&str>) -> rps_sim::Result<Option<NonZeroU64>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<NonZeroU64>()
        .map(Some)
        .map_err(|e| rps_sim::Error::Config(format!("target rate `{raw}`: {e}")))
}
