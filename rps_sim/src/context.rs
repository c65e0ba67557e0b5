use std::sync::Arc;

use tokio::sync::{
    watch::{self, Receiver, Sender},
    Notify,
};

/// Signals shared by the dispatcher and the reporter.
#[derive(Clone, Debug)]
pub struct RunContext {
    /// Flips to `true` once the run must stop.
    pub shutdown: Receiver<bool>,
    /// Wakes the dispatcher out of its pacing sleep.
    pub dispatcher_interrupt: Arc<Notify>,
    /// Wakes the reporter out of its tick wait.
    pub reporter_interrupt: Arc<Notify>,
}

impl RunContext {
    pub fn new() -> (Self, ShutdownTrigger) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                shutdown: rx,
                dispatcher_interrupt: Arc::new(Notify::new()),
                reporter_interrupt: Arc::new(Notify::new()),
            },
            ShutdownTrigger(Arc::new(tx)),
        )
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Cloneable handle that stops a run.
#[derive(Clone, Debug)]
pub struct ShutdownTrigger(Arc<Sender<bool>>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.0.send_replace(true);
    }
}
