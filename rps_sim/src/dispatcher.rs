use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use tokio::time::Instant;

use crate::{
    config::RunConfig,
    context::RunContext,
    error::{Error, Result},
    progress::ProgressCounter,
    schedule::{PacingDecision, Schedule},
    sink::{Item, Severity, Sink},
};

use std::time::Duration;

/// How a dispatcher run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every step of a bounded run was issued.
    Completed,
    /// Shutdown was requested before the last step.
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub steps: u64,
    pub items: u64,
    pub elapsed: Duration,
    pub interrupted_sleeps: u64,
    pub outcome: Outcome,
}

/// Issues items to a sink, sleeping whenever the run gets ahead of its
/// ideal schedule.
///
/// Steps are strictly sequential: every item of step `i` is recorded and the
/// progress counter advanced before step `i + 1` is considered. The counter
/// only ever moves at step boundaries.
pub struct Dispatcher<S> {
    schedule: Schedule,
    severity: Severity,
    sink_retries: u32,
    sink: S,
    progress: ProgressCounter,
    ctx: RunContext,
    rng: StdRng,
}

impl<S: Sink> Dispatcher<S> {
    pub fn new(config: &RunConfig, sink: S, progress: ProgressCounter, ctx: RunContext) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            schedule: Schedule::new(config),
            severity: config.severity,
            sink_retries: config.sink_retries,
            sink,
            progress,
            ctx,
            rng,
        }
    }

    pub async fn run(mut self) -> Result<DispatchSummary> {
        let mut shutdown = self.ctx.shutdown.clone();
        let mut steps = 0u64;
        let mut interrupted_sleeps = 0u64;

        let start = Instant::now();
        tracing::info!(
            steps = ?self.schedule.num_steps(),
            expected = ?self.schedule.expected_duration(),
            "Dispatcher started"
        );

        let outcome = loop {
            if self.schedule.num_steps().is_some_and(|n| steps >= n) {
                break Outcome::Completed;
            }
            if self.ctx.is_shutdown() {
                break Outcome::Cancelled;
            }

            match self.schedule.decide(steps, start.elapsed()) {
                PacingDecision::Sleep(delay) => {
                    tracing::debug!(step = steps, ?delay, "Ahead of schedule, slowing down");
                    let cancelled = tokio::select! {
                        _ = tokio::time::sleep(delay) => false,
                        _ = self.ctx.dispatcher_interrupt.notified() => {
                            interrupted_sleeps += 1;
                            tracing::warn!(step = steps, "Pacing sleep interrupted, issuing now");
                            false
                        }
                        Ok(_) = shutdown.wait_for(|b| *b) => true,
                    };
                    if cancelled {
                        break Outcome::Cancelled;
                    }
                }
                // Keep a single-threaded runtime responsive while running flat out.
                PacingDecision::Proceed => tokio::task::yield_now().await,
            }

            let size = self.schedule.step_size(steps);
            self.issue_step(size).await?;
            self.progress.advance(size);
            steps += 1;
        };

        let items = self.progress.get();
        let summary = DispatchSummary {
            steps,
            items,
            elapsed: start.elapsed(),
            interrupted_sleeps,
            outcome,
        };
        tracing::info!(
            steps,
            items,
            elapsed = ?summary.elapsed,
            outcome = ?outcome,
            "Dispatcher finished"
        );
        Ok(summary)
    }

    async fn issue_step(&mut self, size: u64) -> Result<()> {
        for _ in 0..size {
            let item = Item::new(self.rng.gen::<i32>(), self.severity);
            self.record(&item).await?;
        }
        Ok(())
    }

    /// Hand one item to the sink, retrying up to `sink_retries` times before
    /// giving up on the whole run.
    async fn record(&self, item: &Item) -> Result<()> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.sink.record(item).await {
                Ok(()) => return Ok(()),
                Err(e) if attempts <= self.sink_retries => {
                    tracing::warn!(id = %item.id, attempts, error = %e, "Sink rejected item, retrying");
                }
                Err(e) => {
                    return Err(Error::Sink {
                        id: item.id.clone(),
                        attempts,
                        source: Box::new(e),
                    })
                }
            }
        }
    }
}
