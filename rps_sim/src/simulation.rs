use tokio::task::JoinHandle;
use typed_builder::TypedBuilder;

use crate::{
    config::RunConfig,
    context::{RunContext, ShutdownTrigger},
    dispatcher::{DispatchSummary, Dispatcher},
    error::Result,
    progress::{ProgressCounter, ProgressReader},
    reporter::{reporter_task, Reporter},
    sink::Sink,
};

/// A configured run: what to send, where, and where to report throughput.
///
/// ```rust,no_run
/// use rps_sim::{NullSink, RunConfig, Simulation, StdoutReporter, TotalItems};
///
/// # async fn demo() -> rps_sim::Result<()> {
/// let summary = Simulation::builder()
///     .config(
///         RunConfig::builder()
///             .total_items(TotalItems::bounded(1000).unwrap())
///             .build(),
///     )
///     .sink(NullSink)
///     .reporter(StdoutReporter)
///     .build()
///     .run()
///     .await?;
/// assert_eq!(summary.items, 1000);
/// # Ok(())
/// # }
/// ```
#[derive(TypedBuilder)]
pub struct Simulation<S, R> {
    #[builder(default)]
    pub config: RunConfig,
    pub sink: S,
    pub reporter: R,
}

impl<S: Sink, R: Reporter> Simulation<S, R> {
    /// Spawn the dispatcher and the reporter and return at once.
    ///
    /// Dropping the handle detaches both tasks; an unbounded run then never
    /// stops.
    #[must_use = "dropping the handle leaves the run with no way to stop it"]
    pub fn start(self) -> RunHandle {
        let (ctx, shutdown) = RunContext::new();
        let progress = ProgressCounter::new();
        let reader = progress.reader();

        tracing::info!("Spawning throughput reporter...");
        let reporter = tokio::spawn(reporter_task(
            ctx.clone(),
            reader.clone(),
            self.reporter,
            self.config.report_interval,
        ));

        tracing::info!("Spawning dispatcher...");
        let dispatcher = tokio::spawn(
            Dispatcher::new(&self.config, self.sink, progress, ctx.clone()).run(),
        );

        RunHandle {
            ctx,
            shutdown,
            progress: reader,
            dispatcher,
            reporter,
        }
    }

    /// Run until the dispatcher is done, then stop the reporter.
    pub async fn run(self) -> Result<DispatchSummary> {
        self.start().wait().await
    }
}

/// Control over a started [`Simulation`].
#[must_use = "a run keeps going until it is shut down or waited on"]
pub struct RunHandle {
    ctx: RunContext,
    shutdown: ShutdownTrigger,
    progress: ProgressReader,
    dispatcher: JoinHandle<Result<DispatchSummary>>,
    reporter: JoinHandle<()>,
}

impl RunHandle {
    pub fn progress(&self) -> ProgressReader {
        self.progress.clone()
    }

    /// Wake the dispatcher out of its current (or next) pacing sleep.
    pub fn interrupt_dispatcher(&self) {
        self.ctx.dispatcher_interrupt.notify_one();
    }

    /// Wake the reporter out of its current (or next) tick wait.
    pub fn interrupt_reporter(&self) {
        self.ctx.reporter_interrupt.notify_one();
    }

    /// Ask both tasks to stop at their next step or tick boundary.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// A trigger that outlives the handle, e.g. for a signal handler.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.shutdown.clone()
    }

    /// Wait for the dispatcher to finish, then stop and join the reporter.
    ///
    /// A reporter panic is logged; it never costs the dispatcher's summary.
    pub async fn wait(self) -> Result<DispatchSummary> {
        let summary = self.dispatcher.await;
        tracing::info!("Dispatcher done, stopping reporter...");
        self.shutdown.trigger();
        if let Err(e) = self.reporter.await {
            tracing::error!("Reporter panicked with error: {e}");
        }
        summary?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::TotalItems,
        dispatcher::Outcome,
        reporter::ThroughputReport,
        sink::MemorySink,
    };
    use std::{
        num::NonZeroU64,
        sync::{Arc, Mutex},
        time::Duration,
    };

    #[derive(Clone, Default)]
    struct CollectingReporter(Arc<Mutex<Vec<ThroughputReport>>>);

    impl Reporter for CollectingReporter {
        async fn report(&self, report: &ThroughputReport) -> Result<()> {
            self.0.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn simulation(
        total: TotalItems,
        rate: u64,
    ) -> (
        Simulation<MemorySink, CollectingReporter>,
        MemorySink,
        CollectingReporter,
    ) {
        let sink = MemorySink::new();
        let reporter = CollectingReporter::default();
        let sim = Simulation::builder()
            .config(
                RunConfig::builder()
                    .total_items(total)
                    .target_rate(NonZeroU64::new(rate).unwrap())
                    // off the whole-second grid the dispatcher sleeps on
                    .report_interval(Duration::from_millis(700))
                    .build(),
            )
            .sink(sink.clone())
            .reporter(reporter.clone())
            .build();
        (sim, sink, reporter)
    }

    #[tokio::test(start_paused = true)]
    async fn run_completes_and_final_report_sees_everything() {
        let (sim, sink, reporter) = simulation(TotalItems::bounded(300).unwrap(), 100);

        let summary = sim.run().await.unwrap();

        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.items, 300);
        assert_eq!(sink.len(), 300);

        let reports = reporter.0.lock().unwrap().clone();
        assert!(!reports.is_empty());
        assert_eq!(reports.last().unwrap().items_sent, 300);
        let mut last = 0;
        for r in &reports {
            assert!(r.items_sent >= last);
            last = r.items_sent;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_an_unbounded_run() {
        let (sim, sink, _reporter) = simulation(TotalItems::Unbounded, 100);
        let handle = sim.start();
        let progress = handle.progress();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        handle.shutdown();
        let summary = handle.wait().await.unwrap();

        assert_eq!(summary.outcome, Outcome::Cancelled);
        assert_eq!(summary.items, progress.get());
        assert_eq!(sink.len() as u64, summary.items);
        // Whole seconds 0..=3 each release a second's worth of items.
        assert_eq!(summary.items, 400);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_leaves_the_reporter_running() {
        let (sim, _sink, reporter) = simulation(TotalItems::Unbounded, 100);
        let progress = sim.start().progress();

        tokio::time::sleep(Duration::from_millis(5500)).await;

        assert_eq!(progress.get(), 600);
        let reports = reporter.0.lock().unwrap().clone();
        // Ticks at 0.7s, 1.4s, ..., 4.9s.
        assert_eq!(reports.len(), 7);
        assert_eq!(reports.last().unwrap().items_sent, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn reporter_panic_keeps_the_summary() {
        struct PanickingReporter;

        impl Reporter for PanickingReporter {
            async fn report(&self, _: &ThroughputReport) -> Result<()> {
                panic!("report backend crashed");
            }
        }

        let summary = Simulation::builder()
            .config(
                RunConfig::builder()
                    .total_items(TotalItems::bounded(300).unwrap())
                    .report_interval(Duration::from_millis(700))
                    .build(),
            )
            .sink(MemorySink::new())
            .reporter(PanickingReporter)
            .build()
            .run()
            .await
            .unwrap();

        assert_eq!(summary.outcome, Outcome::Completed);
        assert_eq!(summary.items, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_reaches_the_dispatcher() {
        let (sim, _sink, _reporter) = simulation(TotalItems::bounded(500).unwrap(), 100);
        let handle = sim.start();
        handle.interrupt_dispatcher();
        handle.interrupt_reporter();

        let summary = handle.wait().await.unwrap();

        assert_eq!(summary.interrupted_sleeps, 1);
        assert_eq!(summary.items, 500);
    }
}
