//! `logs://` resource routing.
//!
//! Log group names contain `/`, so routing can't split the URI on every slash.
//! A stream URI is recognised by its first `/streams/` segment; everything else
//! is matched on its fixed suffix, and whatever is left is the group name.

use cwlens_core::LogsResource;
use rmcp::model::{AnnotateAble, RawResource, RawResourceTemplate, Resource, ResourceTemplate};
use serde_json::Value;

pub const SCHEME_PREFIX: &str = "logs://groups";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRoute {
    Groups,
    GroupsWithPrefix(String),
    GroupDetails(String),
    Streams(String),
    StreamEvents { group: String, stream: String },
    Sample(String),
    RecentErrors(String),
    Metrics(String),
    Structure(String),
}

const SUFFIX_ROUTES: &[(&str, fn(String) -> ResourceRoute)] = &[
    ("/sample", ResourceRoute::Sample),
    ("/recent-errors", ResourceRoute::RecentErrors),
    ("/metrics", ResourceRoute::Metrics),
    ("/structure", ResourceRoute::Structure),
    ("/streams", ResourceRoute::Streams),
];

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl ResourceRoute {
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix(SCHEME_PREFIX)?;
        if rest.is_empty() || rest == "/" {
            return Some(ResourceRoute::Groups);
        }
        let rest = rest.strip_prefix('/')?;

        if let Some(prefix) = rest.strip_prefix("filter/") {
            return non_empty(prefix).map(ResourceRoute::GroupsWithPrefix);
        }

        if let Some((group, stream)) = rest.split_once("/streams/") {
            return Some(ResourceRoute::StreamEvents {
                group: non_empty(group)?,
                stream: non_empty(stream)?,
            });
        }

        for (suffix, route) in SUFFIX_ROUTES {
            if let Some(group) = rest.strip_suffix(suffix) {
                return non_empty(group).map(route);
            }
        }

        non_empty(rest).map(ResourceRoute::GroupDetails)
    }

    pub async fn read(&self, resources: &LogsResource) -> Value {
        match self {
            ResourceRoute::Groups => resources.list_log_groups(None, None, None).await,
            ResourceRoute::GroupsWithPrefix(prefix) => {
                resources.list_log_groups(Some(prefix), None, None).await
            }
            ResourceRoute::GroupDetails(group) => resources.log_group_details(group).await,
            ResourceRoute::Streams(group) => resources.log_streams(group).await,
            ResourceRoute::StreamEvents { group, stream } => {
                resources.log_events(group, stream).await
            }
            ResourceRoute::Sample(group) => resources.log_sample(group).await,
            ResourceRoute::RecentErrors(group) => resources.recent_errors(group).await,
            ResourceRoute::Metrics(group) => resources.log_metrics(group).await,
            ResourceRoute::Structure(group) => resources.log_structure(group).await,
        }
    }
}

/// Concrete resources offered without parameters.
pub fn resource_list() -> Vec<Resource> {
    let mut groups = RawResource::new(SCHEME_PREFIX, "CloudWatch log groups");
    groups.description = Some("Log groups in the configured account and region".to_string());
    groups.mime_type = Some("application/json".to_string());
    vec![groups.no_annotation()]
}

fn template(uri_template: &str, name: &str, description: &str) -> ResourceTemplate {
    RawResourceTemplate {
        uri_template: uri_template.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        mime_type: Some("application/json".to_string()),
    }
    .no_annotation()
}

pub fn resource_templates() -> Vec<ResourceTemplate> {
    vec![
        template(
            "logs://groups/filter/{prefix}",
            "Log groups by prefix",
            "Log groups whose name starts with the prefix",
        ),
        template(
            "logs://groups/{log_group_name}",
            "Log group details",
            "Retention, encryption and size of a log group",
        ),
        template(
            "logs://groups/{log_group_name}/streams",
            "Log streams",
            "The 20 most recently active streams of a log group",
        ),
        template(
            "logs://groups/{log_group_name}/streams/{log_stream_name}",
            "Log events",
            "The 100 most recent events of a log stream",
        ),
        template(
            "logs://groups/{log_group_name}/sample",
            "Log sample",
            "Recent events from the newest stream of a log group",
        ),
        template(
            "logs://groups/{log_group_name}/recent-errors",
            "Recent errors",
            "Error events of the last 24 hours",
        ),
        template(
            "logs://groups/{log_group_name}/metrics",
            "Log volume",
            "Hourly IncomingBytes and IncomingLogEvents sums over the last 24 hours",
        ),
        template(
            "logs://groups/{log_group_name}/structure",
            "Log structure",
            "Detected format, log levels and common fields",
        ),
    ]
}
