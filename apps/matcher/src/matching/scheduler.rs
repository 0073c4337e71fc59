//! Scheduler — background sweep that re-runs matching for every known profile.
//!
//! ```text
//! Idle ──(interval elapsed)──► Running ──(all profiles visited)──► Idle
//! ```
//!
//! The scheduler shares nothing with request handlers except the store
//! behind the pipeline. Shutdown is honoured mid-sweep: the run in flight is
//! abandoned and no further profiles are visited.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::matching::pipeline::{MatchPipeline, PipelineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Upper bound on a single user's run so one hung call cannot stall the sweep.
    pub run_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            run_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunOutcome {
    Matched(usize),
    Failed { stage: &'static str, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<(String, RunOutcome)>,
    /// Set when shutdown cut the sweep short.
    pub interrupted: bool,
}

impl SweepReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, RunOutcome::Matched(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    #[cfg(test)]
    pub fn outcome_for(&self, email: &str) -> Option<&RunOutcome> {
        self.outcomes
            .iter()
            .find(|(e, _)| e == email)
            .map(|(_, o)| o)
    }
}

pub struct Scheduler {
    pipeline: MatchPipeline,
    config: SchedulerConfig,
    state: watch::Sender<SchedulerState>,
}

impl Scheduler {
    pub fn new(pipeline: MatchPipeline, config: SchedulerConfig) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            pipeline,
            config,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    /// One full pass over every known profile, sequential and failure-isolated.
    pub async fn sweep(&self) -> SweepReport {
        let (_never, mut shutdown) = watch::channel(false);
        self.sweep_until(&mut shutdown).await
    }

    async fn sweep_until(&self, shutdown: &mut watch::Receiver<bool>) -> SweepReport {
        self.state.send_replace(SchedulerState::Running);
        let started_at = Utc::now();

        let emails = match self.pipeline.store().list_emails().await {
            Ok(emails) => emails,
            Err(e) => {
                error!("Sweep could not enumerate profiles: {e}");
                Vec::new()
            }
        };
        info!("Sweep started over {} profiles", emails.len());

        let mut outcomes = Vec::with_capacity(emails.len());
        let mut interrupted = false;
        for email in emails {
            if *shutdown.borrow() {
                interrupted = true;
                break;
            }
            let result = tokio::select! {
                result = self.run_with_timeout(&email) => Some(result),
                _ = stop_requested(shutdown) => None,
            };
            let Some(result) = result else {
                warn!("Shutdown requested; abandoning sweep run for {email}");
                interrupted = true;
                break;
            };
            let outcome = match result {
                Ok(matches) => RunOutcome::Matched(matches),
                Err(e) => {
                    warn!("Sweep run for {email} failed at {}: {e}", e.stage());
                    RunOutcome::Failed {
                        stage: e.stage(),
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push((email, outcome));
        }

        let report = SweepReport {
            started_at,
            outcomes,
            interrupted,
        };
        info!(
            "Sweep finished: {} succeeded, {} failed{}",
            report.succeeded(),
            report.failed(),
            if interrupted { " (interrupted)" } else { "" }
        );
        self.state.send_replace(SchedulerState::Idle);
        report
    }

    async fn run_with_timeout(&self, email: &str) -> Result<usize, PipelineError> {
        match tokio::time::timeout(self.config.run_timeout, self.pipeline.run(email)).await {
            Ok(result) => result.map(|matches| matches.len()),
            Err(_) => Err(PipelineError::TimedOut {
                email: email.to_string(),
                after: self.config.run_timeout,
            }),
        }
    }

    /// Starts the background loop. The first sweep happens one interval after
    /// start. Setting `shutdown` to `true` stops the loop, including a sweep
    /// that is already under way.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // completes immediately

            info!("Scheduler started (interval {:?})", self.config.interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                let report = self.sweep_until(&mut shutdown).await;
                if report.interrupted || *shutdown.borrow() {
                    break;
                }
            }
            info!("Scheduler stopping");
        })
    }
}

/// Resolves once shutdown is set. A closed channel never resolves here; the
/// outer loop treats that case on its own.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let closed = shutdown.wait_for(|stop| *stop).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
