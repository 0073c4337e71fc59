use std::sync::Arc;

use tokio::sync::watch;

use crate::matching::pipeline::MatchPipeline;
use crate::matching::scheduler::SchedulerState;
use crate::store::ProfileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    /// Same pipeline the scheduler runs; both only meet at the store.
    pub pipeline: MatchPipeline,
    /// `None` when the scheduler is disabled.
    pub scheduler: Option<watch::Receiver<SchedulerState>>,
}
