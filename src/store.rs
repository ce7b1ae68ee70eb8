use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{AnalysisReport, GraphData};

/// One completed analysis run, as published for readers.
#[derive(Debug, Clone)]
pub struct StoredResult {
    pub report: AnalysisReport,
    pub graph: GraphData,
}

/// The latest-result slot.
///
/// A single overwritten slot with last-writer-wins semantics: `publish`
/// swaps the whole result atomically, so a reader always observes either
/// the previous complete run or the new one, never a mix.
#[derive(Clone, Default)]
pub struct ResultStore {
    inner: Arc<RwLock<Option<Arc<StoredResult>>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, result: StoredResult) {
        *self.inner.write().await = Some(Arc::new(result));
    }

    pub async fn latest(&self) -> Option<Arc<StoredResult>> {
        self.inner.read().await.clone()
    }
}
