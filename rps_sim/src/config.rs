use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    error::{Error, Result},
    sink::Severity,
};

use std::{fmt, num::NonZeroU64, path::Path, str::FromStr, time::Duration};

/// Target rate used when none is given on the command line.
pub const DEFAULT_TARGET_RATE: NonZeroU64 = match NonZeroU64::new(100) {
    Some(rate) => rate,
    None => unreachable!(),
};

/// How many items a run issues in total.
///
/// `Unbounded` replaces the old trick of configuring an enormous finite total:
/// the schedule is then anchored on the items issued so far instead of on an
/// estimated end time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalItems {
    Bounded(NonZeroU64),
    #[default]
    Unbounded,
}

impl TotalItems {
    /// `None` when `n` is zero.
    pub fn bounded(n: u64) -> Option<Self> {
        NonZeroU64::new(n).map(Self::Bounded)
    }

    pub fn get(&self) -> Option<u64> {
        match self {
            Self::Bounded(n) => Some(n.get()),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for TotalItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{n}"),
            Self::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl FromStr for TotalItems {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unbounded") || s.eq_ignore_ascii_case("inf") {
            return Ok(Self::Unbounded);
        }
        let n: u64 = s
            .parse()
            .map_err(|e| Error::Config(format!("total items `{s}`: {e}")))?;
        Self::bounded(n).ok_or_else(|| Error::Config("total items must be positive".into()))
    }
}

/// Immutable parameters of one run.
///
/// ```rust
/// use rps_sim::{RunConfig, TotalItems};
/// use std::num::NonZeroU64;
///
/// let config = RunConfig::builder()
///     .total_items(TotalItems::bounded(1000).unwrap())
///     .target_rate(NonZeroU64::new(250).unwrap())
///     .build();
/// assert_eq!(config.batch_size.get(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct RunConfig {
    #[builder(default)]
    pub total_items: TotalItems,
    /// Items grouped into one schedule step; 1 when batching is meaningless.
    #[builder(default = NonZeroU64::MIN)]
    pub batch_size: NonZeroU64,
    /// Items per second
    #[builder(default = DEFAULT_TARGET_RATE)]
    pub target_rate: NonZeroU64,
    /// Severity attached to every generated item.
    #[builder(default = Severity::Error)]
    pub severity: Severity,
    /// Extra attempts per item before a sink failure aborts the run.
    #[builder(default)]
    pub sink_retries: u32,
    /// Seed for item identifiers. Entropy when unset.
    #[builder(default, setter(strip_option))]
    pub seed: Option<u64>,
    #[builder(default = Duration::from_secs(1))]
    pub report_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RunConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)?;
        if config.report_interval.is_zero() {
            return Err(Error::Config("report_interval must be non-zero".into()));
        }
        Ok(config)
    }
}

/// The startup banner.
impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sending {} items in batches of {} at a rate of {} items per second...",
            self.total_items, self.batch_size, self.target_rate
        )
    }
}
