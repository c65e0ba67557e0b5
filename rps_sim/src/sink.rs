//! Where generated items go.
//!
//! The dispatcher hands every item to a [`Sink`] exactly once per attempt.
//! What the sink does with it (forward it to a telemetry backend, print it,
//! drop it) is entirely its own business. Sinks are expected to accept items
//! quickly; there is no back-pressure.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use std::{
    collections::BTreeMap,
    fmt,
    future::Future,
    io::Write,
    str::FromStr,
    sync::{Arc, Mutex},
};

/// Tag key under which every item carries its own identifier.
pub const DIMENSION_TAG: &str = "dimension";

/// Severity levels understood by telemetry backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Verbose => "verbose",
            Self::Information => "information",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" | "trace" | "debug" => Ok(Self::Verbose),
            "information" | "info" => Ok(Self::Information),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(Error::Config(format!("unknown severity `{other}`"))),
        }
    }
}

/// One simulated telemetry event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub message: String,
    pub severity: Severity,
    pub tags: BTreeMap<String, String>,
}

impl Item {
    /// Build an item tagged with its own identifier.
    pub fn new(id: impl fmt::Display, severity: Severity) -> Self {
        let id = id.to_string();
        Self {
            message: format!("sent a trace with id {id}"),
            tags: BTreeMap::from([(DIMENSION_TAG.to_string(), id.clone())]),
            id,
            severity,
        }
    }
}

/// Receives items from the dispatcher.
///
/// # Example
/// ```rust
/// use rps_sim::{Item, Sink};
/// use std::convert::Infallible;
///
/// struct PrintSink;
///
/// impl Sink for PrintSink {
///     type Error = Infallible;
///
///     async fn record(&self, item: &Item) -> Result<(), Self::Error> {
///         println!("{}", item.message);
///         Ok(())
///     }
/// }
/// ```
pub trait Sink: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Record a single item. A failed call may be retried with the same item.
    fn record(
        &self,
        item: &Item,
    ) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send;
}

/// Emits every item as a `tracing` event at the matching level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    type Error = std::convert::Infallible;

    async fn record(&self, item: &Item) -> std::result::Result<(), Self::Error> {
        let dimension = item.tags.get(DIMENSION_TAG).map(String::as_str);
        match item.severity {
            Severity::Verbose => {
                tracing::trace!(target: "rps_sim::item", id = %item.id, dimension, "{}", item.message)
            }
            Severity::Information => {
                tracing::info!(target: "rps_sim::item", id = %item.id, dimension, "{}", item.message)
            }
            Severity::Warning => {
                tracing::warn!(target: "rps_sim::item", id = %item.id, dimension, "{}", item.message)
            }
            Severity::Error | Severity::Critical => {
                tracing::error!(target: "rps_sim::item", id = %item.id, dimension, severity = %item.severity, "{}", item.message)
            }
        }
        Ok(())
    }
}

/// Writes each item as one JSON object per line.
#[derive(Debug)]
pub struct JsonSink<W> {
    out: Mutex<W>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send + 'static> Sink for JsonSink<W> {
    type Error = Error;

    async fn record(&self, item: &Item) -> std::result::Result<(), Self::Error> {
        let line = serde_json::to_string(item)?;
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{line}")?;
        Ok(())
    }
}

/// Accepts and discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    type Error = std::convert::Infallible;

    async fn record(&self, _: &Item) -> std::result::Result<(), Self::Error> {
        Ok(())
    }
}

/// Keeps every item in memory. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    items: Arc<Mutex<Vec<Item>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<Item> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Item>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Sink for MemorySink {
    type Error = std::convert::Infallible;

    async fn record(&self, item: &Item) -> std::result::Result<(), Self::Error> {
        self.lock().push(item.clone());
        Ok(())
    }
}
