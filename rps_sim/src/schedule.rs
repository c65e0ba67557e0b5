//! Pure pacing math for the dispatcher.
//!
//! A run is split into schedule steps of `batch_size` items. Before step `i`
//! the dispatcher compares two estimates of the time left:
//!
//! ```text
//! by_schedule = expected_total - floor(elapsed)
//! by_progress = floor((num_steps - i) * batch_size / target_rate)
//! ```
//!
//! If `by_progress < by_schedule` the run is ahead and sleeps for the
//! difference. Otherwise it proceeds at once. Work is never dropped to catch
//! up; being behind only shortens or removes sleeps.
//!
//! Unbounded runs have no end time, so step `i` is instead due at
//! `floor(i * batch_size / target_rate)` seconds and the dispatcher sleeps
//! until then if it got there early.
//!
//! All products are computed in `u128`.

use std::time::Duration;

use crate::config::{RunConfig, TotalItems};

/// What the dispatcher should do before issuing a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacingDecision {
    /// On schedule or behind it.
    Proceed,
    /// Ahead of schedule by this much.
    Sleep(Duration),
}

#[derive(Clone, Copy, Debug)]
enum Horizon {
    Bounded {
        total_items: u64,
        num_steps: u64,
        expected_total_secs: u128,
    },
    Unbounded,
}

/// Ideal schedule derived once from a [`RunConfig`].
#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    batch_size: u64,
    target_rate: u64,
    horizon: Horizon,
}

impl Schedule {
    pub fn new(config: &RunConfig) -> Self {
        let batch_size = config.batch_size.get();
        let target_rate = config.target_rate.get();
        let horizon = match config.total_items {
            TotalItems::Bounded(total) => {
                let total_items = total.get();
                let num_steps = total_items.div_ceil(batch_size);
                let expected_total_secs =
                    num_steps as u128 * batch_size as u128 / target_rate as u128;
                Horizon::Bounded {
                    total_items,
                    num_steps,
                    expected_total_secs,
                }
            }
            TotalItems::Unbounded => Horizon::Unbounded,
        };
        Self {
            batch_size,
            target_rate,
            horizon,
        }
    }

    /// `ceil(total / batch_size)`, or `None` for an unbounded run.
    pub fn num_steps(&self) -> Option<u64> {
        match self.horizon {
            Horizon::Bounded { num_steps, .. } => Some(num_steps),
            Horizon::Unbounded => None,
        }
    }

    /// How long the whole run should take, truncated to whole seconds.
    pub fn expected_duration(&self) -> Option<Duration> {
        match self.horizon {
            Horizon::Bounded {
                expected_total_secs,
                ..
            } => Some(Duration::from_secs(
                expected_total_secs.min(u64::MAX as u128) as u64,
            )),
            Horizon::Unbounded => None,
        }
    }

    /// Number of items step `step` issues. The last step of a bounded run
    /// carries the remainder when the total is not a multiple of the batch.
    pub fn step_size(&self, step: u64) -> u64 {
        match self.horizon {
            Horizon::Bounded { total_items, .. } => {
                let issued = step as u128 * self.batch_size as u128;
                let left = (total_items as u128).saturating_sub(issued);
                left.min(self.batch_size as u128) as u64
            }
            Horizon::Unbounded => self.batch_size,
        }
    }

    /// Seconds left if the remaining steps ran exactly at the target rate.
    pub fn time_left_by_progress(&self, step: u64) -> u128 {
        match self.horizon {
            Horizon::Bounded { num_steps, .. } => {
                let items_left = num_steps.saturating_sub(step) as u128 * self.batch_size as u128;
                items_left / self.target_rate as u128
            }
            Horizon::Unbounded => u128::MAX,
        }
    }

    /// Seconds left until the estimated end time. Negative once it has passed.
    pub fn time_left_by_schedule(&self, elapsed: Duration) -> i128 {
        match self.horizon {
            Horizon::Bounded {
                expected_total_secs,
                ..
            } => expected_total_secs as i128 - elapsed.as_secs() as i128,
            Horizon::Unbounded => i128::MAX,
        }
    }

    /// Decide whether step `step` must wait, `elapsed` after the run started.
    pub fn decide(&self, step: u64, elapsed: Duration) -> PacingDecision {
        let ahead_secs = match self.horizon {
            Horizon::Bounded { .. } => {
                self.time_left_by_schedule(elapsed) - self.time_left_by_progress(step) as i128
            }
            Horizon::Unbounded => {
                let due_secs =
                    step as u128 * self.batch_size as u128 / self.target_rate as u128;
                due_secs as i128 - elapsed.as_secs() as i128
            }
        };
        if ahead_secs > 0 {
            PacingDecision::Sleep(Duration::from_secs(ahead_secs.min(u64::MAX as i128) as u64))
        } else {
            PacingDecision::Proceed
        }
    }
}
