//! Per-query compilation session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, debug_span};
use ulid::Ulid;

use crate::config::ReorderConfig;
use crate::error::Result;
use crate::expr::ExprIdAllocator;
use crate::planner::Plan;
use crate::reorder::JoinReorderer;
use crate::statistics::StatisticsStore;

/// State shared by everything that rewrites one query.
///
/// Owns the id allocator, so every expression built during the session gets
/// an id no other expression in the session has.
pub struct CompilationSession {
    id: Ulid,
    started_at: DateTime<Utc>,
    allocator: ExprIdAllocator,
    statistics: Arc<StatisticsStore>,
    reorderer: JoinReorderer,
}

impl CompilationSession {
    /// Start a session with an empty statistics store.
    pub fn new(config: ReorderConfig) -> Self {
        Self::with_statistics(config, Arc::new(StatisticsStore::new()))
    }

    /// Start a session that shares an existing statistics store.
    pub fn with_statistics(config: ReorderConfig, statistics: Arc<StatisticsStore>) -> Self {
        let id = Ulid::new();
        debug!(session = %id, "compilation session started");
        Self {
            id,
            started_at: Utc::now(),
            allocator: ExprIdAllocator::new(),
            statistics,
            reorderer: JoinReorderer::new(config),
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn allocator(&self) -> &ExprIdAllocator {
        &self.allocator
    }

    pub fn statistics(&self) -> &Arc<StatisticsStore> {
        &self.statistics
    }

    pub fn config(&self) -> &ReorderConfig {
        self.reorderer.config()
    }

    pub fn reorderer(&self) -> &JoinReorderer {
        &self.reorderer
    }

    /// Validate `plan` and enumerate its join reorder alternatives.
    pub fn explore(&self, plan: &Arc<Plan>) -> Result<Vec<Arc<Plan>>> {
        let span = debug_span!("session", id = %self.id);
        let _enter = span.enter();

        plan.validate()?;
        Ok(self.reorderer.explore(plan)?)
    }
}
