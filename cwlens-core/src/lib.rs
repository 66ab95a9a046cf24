// CWLens Library - CloudWatch Logs query coordination
//
// This library holds everything the MCP server and the CLI share: time range
// resolution, the Insights polling loop, result shaping, correlation and the
// browsing operations behind the logs:// resources.

pub mod backend;
pub mod config;
pub mod correlator;
pub mod error;
pub mod projector;
pub mod prompts;
pub mod query;
pub mod session;
pub mod structure;
pub mod time_range;
pub mod tools;

pub use backend::{LogsBackend, QueryScope, QueryStatus};
pub use config::{AwsSettings, Config, QuerySettings};
pub use correlator::{CorrelationReport, MultiGroupCorrelator};
pub use error::{CwLensError, Result};
pub use query::{QueryExecutor, QueryResult, RowRecord};
pub use session::{SessionProvider, StaticSessionProvider};
pub use time_range::{TimeRangeArgs, TimeWindow};
pub use tools::{AnalysisTools, CorrelationTools, LogsResource, SearchTools};

#[cfg(feature = "aws")]
pub use session::AwsSessionProvider;

use std::sync::Arc;

/// All tool components sharing one session provider.
#[derive(Clone)]
pub struct Toolset {
    pub search: SearchTools,
    pub analysis: AnalysisTools,
    pub correlation: CorrelationTools,
    pub resources: LogsResource,
}

impl Toolset {
    pub fn new(session: Arc<dyn SessionProvider>, settings: QuerySettings) -> Self {
        Self {
            search: SearchTools::new(session.clone(), settings),
            analysis: AnalysisTools::new(session.clone(), settings),
            correlation: CorrelationTools::new(session.clone(), settings),
            resources: LogsResource::new(session, settings),
        }
    }
}
