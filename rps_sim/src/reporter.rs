//! Throughput reporting.
//!
//! The reporter samples the progress counter once per tick and turns the
//! difference between two samples into a [`ThroughputReport`]. It never
//! writes shared state, so a slow or failing [`Reporter`] cannot disturb the
//! dispatcher's pacing.
//!
//! Ticks use [`MissedTickBehavior::Delay`]: a late or interrupted tick is not
//! made up for, the next window simply covers more time.

use serde::{Deserialize, Serialize};
use tokio::time::{Instant, MissedTickBehavior};

use crate::{
    context::RunContext,
    error::{Error, Result},
    progress::ProgressReader,
};

use std::{
    fmt,
    future::Future,
    io::{self, Write},
    sync::Mutex,
    time::Duration,
};

/// Realized throughput over one reporting window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThroughputReport {
    pub elapsed_secs: f64,
    pub items_per_second: f64,
    pub items_sent: u64,
}

impl fmt::Display for ThroughputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time elapsed {:.3}, Items per second {:.1}, Items sent {}",
            self.elapsed_secs, self.items_per_second, self.items_sent
        )
    }
}

/// The reporter's last observation of the counter.
///
/// `units_per_count` scales counter values into items. The dispatcher's
/// counter already counts items, so runs use 1; a counter that counted
/// batches would use the batch size.
#[derive(Clone, Copy, Debug)]
pub struct ThroughputWindow {
    last_time: Instant,
    last_count: u64,
    units_per_count: u64,
}

impl ThroughputWindow {
    pub fn new(now: Instant, count: u64, units_per_count: u64) -> Self {
        Self {
            last_time: now,
            last_count: count,
            units_per_count,
        }
    }

    /// Close the current window at `now` and start the next one.
    ///
    /// Returns `None` when no time has passed since the previous observation.
    pub fn observe(&mut self, now: Instant, count: u64) -> Option<ThroughputReport> {
        let elapsed = now.saturating_duration_since(self.last_time);
        let delta = count.saturating_sub(self.last_count);

        let report = (!elapsed.is_zero()).then(|| {
            let elapsed_secs = elapsed.as_secs_f64();
            ThroughputReport {
                elapsed_secs,
                items_per_second: delta.saturating_mul(self.units_per_count) as f64 / elapsed_secs,
                items_sent: count.saturating_mul(self.units_per_count),
            }
        });

        self.last_time = now;
        self.last_count = count;
        report
    }
}

/// Sends throughput reports somewhere (stdout, a log, a file).
///
/// # Example
/// ```rust
/// use rps_sim::{Reporter, ThroughputReport};
///
/// struct StderrReporter;
///
/// impl Reporter for StderrReporter {
///     async fn report(&self, report: &ThroughputReport) -> rps_sim::Result<()> {
///         eprintln!("{report}");
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter: Send + Sync + 'static {
    fn report(&self, report: &ThroughputReport) -> impl Future<Output = Result<()>> + Send;
}

/// Prints the human-readable report line.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    async fn report(&self, report: &ThroughputReport) -> Result<()> {
        println!("{report}");
        Ok(())
    }
}

/// Writes each report as a JSON object on its own line.
#[derive(Debug)]
pub struct JsonReporter<W> {
    out: Mutex<W>,
}

impl JsonReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send + 'static> Reporter for JsonReporter<W> {
    async fn report(&self, report: &ThroughputReport) -> Result<()> {
        let line = serde_json::to_string(report).map_err(|e| Error::Report(e.to_string()))?;
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        writeln!(out, "{line}").map_err(|e| Error::Report(e.to_string()))?;
        Ok(())
    }
}

/// Long-lived reporting loop. Returns only once shutdown is signalled, after
/// emitting a last report for the partial window. It never stops on its own.
pub async fn reporter_task<R: Reporter>(
    ctx: RunContext,
    progress: ProgressReader,
    reporter: R,
    interval: Duration,
) {
    let mut shutdown = ctx.shutdown.clone();
    let start = Instant::now();
    let mut window = ThroughputWindow::new(start, progress.get(), 1);
    let mut ticker = tokio::time::interval_at(start + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!(?interval, "Reporter started");
    loop {
        let stopping = tokio::select! {
            _ = ticker.tick() => false,
            _ = ctx.reporter_interrupt.notified() => {
                tracing::warn!("Reporter wait interrupted, resuming");
                continue;
            }
            // A dropped trigger only disables this branch.
            Ok(_) = shutdown.wait_for(|b| *b) => true,
        };

        if let Some(report) = window.observe(Instant::now(), progress.get()) {
            if let Err(e) = reporter.report(&report).await {
                tracing::warn!(error = %e, "Failed to emit throughput report");
            }
        }
        if stopping {
            break;
        }
    }
    tracing::debug!("Reporter stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressCounter;
    use std::sync::Arc;

    /// Collects reports in memory.
    #[derive(Clone, Default)]
    struct CollectingReporter(Arc<Mutex<Vec<ThroughputReport>>>);

    impl CollectingReporter {
        fn reports(&self) -> Vec<ThroughputReport> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Reporter for CollectingReporter {
        async fn report(&self, report: &ThroughputReport) -> Result<()> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    struct BrokenReporter;

    impl Reporter for BrokenReporter {
        async fn report(&self, _: &ThroughputReport) -> Result<()> {
            Err(Error::Report("stdout closed".into()))
        }
    }

    mod observe {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn rate_is_delta_over_elapsed() {
            let t0 = Instant::now();
            let mut window = ThroughputWindow::new(t0, 0, 1);

            let samples = [(1000, 100), (2000, 250), (4000, 250), (4500, 400)];
            let expected = [
                (1.0, 100.0, 100),
                (1.0, 150.0, 250),
                (2.0, 0.0, 250),
                (0.5, 300.0, 400),
            ];

            for ((ms, count), (elapsed, rate, sent)) in samples.into_iter().zip(expected) {
                let report = window
                    .observe(t0 + Duration::from_millis(ms), count)
                    .unwrap();
                assert_eq!(report.elapsed_secs, elapsed);
                assert_eq!(report.items_per_second, rate);
                assert_eq!(report.items_sent, sent);
            }
        }

        #[tokio::test(start_paused = true)]
        async fn counts_are_scaled_into_items() {
            let t0 = Instant::now();
            // a counter of batches of 10
            let mut window = ThroughputWindow::new(t0, 3, 10);

            let report = window.observe(t0 + Duration::from_secs(2), 7).unwrap();

            assert_eq!(report.items_per_second, 20.0);
            assert_eq!(report.items_sent, 70);
        }

        #[tokio::test(start_paused = true)]
        async fn zero_elapsed_is_skipped_but_still_advances() {
            let t0 = Instant::now();
            let mut window = ThroughputWindow::new(t0, 0, 1);

            assert!(window.observe(t0, 50).is_none());
            let report = window.observe(t0 + Duration::from_secs(1), 80).unwrap();
            assert_eq!(report.items_per_second, 30.0);
        }
    }

    #[test]
    fn report_line_carries_all_quantities() {
        let report = ThroughputReport {
            elapsed_secs: 1.0,
            items_per_second: 99.5,
            items_sent: 1000,
        };
        assert_eq!(
            report.to_string(),
            "Time elapsed 1.000, Items per second 99.5, Items sent 1000"
        );
    }

    #[tokio::test]
    async fn json_reporter_writes_parseable_lines() {
        let reporter = JsonReporter::new(Vec::new());
        let first = ThroughputReport {
            elapsed_secs: 1.0,
            items_per_second: 100.0,
            items_sent: 100,
        };
        let second = ThroughputReport {
            elapsed_secs: 0.5,
            items_per_second: 300.0,
            items_sent: 250,
        };
        reporter.report(&first).await.unwrap();
        reporter.report(&second).await.unwrap();

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let reports: Vec<ThroughputReport> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(reports, vec![first, second]);
    }

    mod task {
        use super::*;

        fn approx(a: f64, b: f64) -> bool {
            (a - b).abs() < 1e-6
        }

        #[tokio::test(start_paused = true)]
        async fn reports_once_per_tick_and_once_on_shutdown() {
            let (ctx, trigger) = RunContext::new();
            let counter = ProgressCounter::new();
            let reporter = CollectingReporter::default();
            let task = tokio::spawn(reporter_task(
                ctx,
                counter.reader(),
                reporter.clone(),
                Duration::from_secs(1),
            ));

            // Updates land half way between ticks.
            tokio::time::sleep(Duration::from_millis(500)).await;
            for _ in 0..3 {
                counter.advance(100);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            counter.advance(50);
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.trigger();
            task.await.unwrap();

            let reports = reporter.reports();
            assert_eq!(reports.len(), 4);
            for (i, r) in reports[..3].iter().enumerate() {
                assert!(approx(r.elapsed_secs, 1.0));
                assert!(approx(r.items_per_second, 100.0));
                assert_eq!(r.items_sent, 100 * (i as u64 + 1));
            }
            assert!(approx(reports[3].elapsed_secs, 0.7));
            assert_eq!(reports[3].items_sent, 350);
        }

        #[tokio::test(start_paused = true)]
        async fn interrupt_does_not_disturb_cadence() {
            let (ctx, trigger) = RunContext::new();
            let interrupt = ctx.reporter_interrupt.clone();
            let counter = ProgressCounter::new();
            let reporter = CollectingReporter::default();
            let task = tokio::spawn(reporter_task(
                ctx,
                counter.reader(),
                reporter.clone(),
                Duration::from_secs(1),
            ));

            tokio::time::sleep(Duration::from_millis(500)).await;
            counter.advance(10);
            interrupt.notify_one();
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.trigger();
            task.await.unwrap();

            let reports = reporter.reports();
            assert_eq!(reports.len(), 2);
            assert!(approx(reports[0].elapsed_secs, 1.0));
            assert_eq!(reports[0].items_sent, 10);
            assert!(approx(reports[1].elapsed_secs, 0.5));
        }

        #[tokio::test(start_paused = true)]
        async fn failing_reporter_keeps_running() {
            let (ctx, trigger) = RunContext::new();
            let counter = ProgressCounter::new();
            let task = tokio::spawn(reporter_task(
                ctx,
                counter.reader(),
                BrokenReporter,
                Duration::from_secs(1),
            ));

            tokio::time::sleep(Duration::from_secs(3)).await;
            assert!(!task.is_finished());
            trigger.trigger();
            task.await.unwrap();
        }
    }
}
