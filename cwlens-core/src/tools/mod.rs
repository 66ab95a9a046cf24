//! Operations exposed to callers. Each one returns a JSON value and never fails;
//! errors come back as the envelope built in [`envelope`].

pub mod analysis;
pub mod correlation;
pub mod envelope;
pub mod resources;
pub mod search;

pub use analysis::AnalysisTools;
pub use correlation::CorrelationTools;
pub use envelope::{error_envelope, respond, timeout_envelope};
pub use resources::LogsResource;
pub use search::SearchTools;

use std::sync::Arc;

use crate::config::QuerySettings;
use crate::error::Result;
use crate::query::QueryExecutor;
use crate::session::SessionProvider;

/// Executor bound to a freshly obtained backend.
pub(crate) async fn executor_for(
    session: &Arc<dyn SessionProvider>,
    settings: QuerySettings,
) -> Result<QueryExecutor> {
    let backend = session.logs_backend().await?;
    Ok(QueryExecutor::new(backend, settings))
}
