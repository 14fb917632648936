//! Trait for the remote source of per-instructor statistics rows.

use serde_json::Value;

use crate::error::Result;

/// Abstraction over the backend statistics view.
///
/// Rows come back untyped; [`crate::parser`] is the boundary that turns them
/// into records.
#[async_trait::async_trait]
pub trait StatsSource: Send + Sync {
    /// Returns every statistics row for `instructor_id`.
    async fn fetch_rows(&self, instructor_id: &str) -> Result<Vec<Value>>;
}

#[async_trait::async_trait]
impl<S: StatsSource + ?Sized> StatsSource for std::sync::Arc<S> {
    async fn fetch_rows(&self, instructor_id: &str) -> Result<Vec<Value>> {
        (**self).fetch_rows(instructor_id).await
    }
}
