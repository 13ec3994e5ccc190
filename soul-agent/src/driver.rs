//! Background driver: sleep a random interval, tick, report, repeat.
//!
//! The loop checks for shutdown while sleeping and after each tick, so a
//! tick already in flight always completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use soul_core::config::SchedulerConfig;

use crate::scheduler::ActionOutcome;
use crate::soul::Soul;

/// Chance that a silent thought is voiced.
const THINK_ALOUD: f32 = 0.1;

/// Something the driver wants the front end to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// A scheduled action fired.
    Action(ActionOutcome),
    /// Nothing fired; the soul thought quietly instead.
    Thought {
        /// The thought.
        text: String,
        /// Whether it should be shown to the user.
        aloud: bool,
    },
}

/// Running driver task.
#[derive(Debug)]
pub struct DriverHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Signal shutdown and wait for the current tick to finish.
    pub async fn stop(self) {
        if self.shutdown.send(true).is_err() {
            debug!("Driver already exited");
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Driver task ended abnormally");
        }
    }
}

/// Start the driver loop on the current runtime.
#[must_use]
pub fn spawn(soul: Arc<Soul>, config: &SchedulerConfig, events: mpsc::Sender<DriverEvent>) -> DriverHandle {
    let (shutdown, mut stop) = watch::channel(false);
    let min = config.tick_min_secs;
    let max = config.tick_max_secs.max(min);
    let silent_thoughts = config.silent_thoughts;

    let task = tokio::spawn(async move {
        info!(min, max, "Driver started");
        let shared = soul.shared();
        let span = usize::try_from(max - min + 1).unwrap_or(1);

        loop {
            let wait = {
                let mut state = shared.lock();
                min + u64::try_from(state.rng.index(span)).unwrap_or(0)
            };

            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(wait)) => {}
                _ = stop.changed() => break,
            }

            let event = match soul.tick().await {
                Some(outcome) => Some(DriverEvent::Action(outcome)),
                None if silent_thoughts => {
                    let text = soul.generate_thought().await;
                    let aloud = shared.lock().rng.unit() < THINK_ALOUD;
                    Some(DriverEvent::Thought { text, aloud })
                }
                None => None,
            };

            if let Some(event) = event {
                if events.send(event).await.is_err() {
                    debug!("Event receiver gone, stopping driver");
                    break;
                }
            }
            if *stop.borrow() {
                break;
            }
        }
        info!("Driver stopped");
    });

    DriverHandle { shutdown, task }
}
