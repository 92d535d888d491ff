use std::sync::Arc;

use sqlx::PgPool;

use crate::audit::AuditLogger;
use crate::context::ContextGatherer;
use crate::engine::DecisionEngine;
use crate::judge::Judge;
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub engine: Arc<DecisionEngine>,
    pub gatherer: Arc<ContextGatherer>,
    pub audit: Arc<AuditLogger>,
    /// Kept alongside the engine's handle for health readiness probes
    pub judge: Arc<dyn Judge>,
    pub metrics: Arc<Metrics>,
    /// None = no key configured, auth skipped (dev mode)
    pub api_key: Option<String>,
    pub model: String,
}
