use rps_sim::{
    Item, JsonReporter, JsonSink, NullSink, Reporter, Sink, StdoutReporter, ThroughputReport,
    TracingSink,
};

use crate::args::{ReportFormat, SinkKind};

use std::io::{self, Stdout};

/// Sink chosen on the command line.
pub enum CliSink {
    Tracing(TracingSink),
    Json(JsonSink<Stdout>),
    Null(NullSink),
}

impl CliSink {
    pub fn new(kind: SinkKind) -> Self {
        match kind {
            SinkKind::Tracing => Self::Tracing(TracingSink),
            SinkKind::Json => Self::Json(JsonSink::new(io::stdout())),
            SinkKind::Null => Self::Null(NullSink),
        }
    }
}

impl Sink for CliSink {
    type Error = rps_sim::Error;

    async fn record(&self, item: &Item) -> Result<(), Self::Error> {
        match self {
            Self::Tracing(sink) => sink.record(item).await.map_err(|e| match e {}),
            Self::Json(sink) => sink.record(item).await,
            Self::Null(sink) => sink.record(item).await.map_err(|e| match e {}),
        }
    }
}

pub enum CliReporter {
    Text(StdoutReporter),
    Json(JsonReporter<Stdout>),
}

impl CliReporter {
    pub fn new(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Text => Self::Text(StdoutReporter),
            ReportFormat::Json => Self::Json(JsonReporter::stdout()),
        }
    }
}

impl Reporter for CliReporter {
    async fn report(&self, report: &ThroughputReport) -> rps_sim::Result<()> {
        match self {
            Self::Text(reporter) => reporter.report(report).await,
            Self::Json(reporter) => reporter.report(report).await,
        }
    }
}
