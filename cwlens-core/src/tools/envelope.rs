//! Uniform response wrapping for every exposed operation.

use std::future::Future;

use serde_json::{json, Value};
use tracing::warn;

use crate::error::{CwLensError, Result};

/// `{status: "Error", error, error_type, details}` for a failed operation.
pub fn error_envelope(err: &CwLensError) -> Value {
    json!({
        "status": "Error",
        "error": err.to_string(),
        "error_type": err.kind(),
        "details": err.root_cause_message(),
    })
}

pub fn timeout_envelope(message: &str) -> Value {
    json!({
        "status": "Timeout",
        "error": message,
    })
}

/// Await `operation`, turning any error into the error envelope.
pub async fn respond<F>(name: &str, operation: F) -> Value
where
    F: Future<Output = Result<Value>>,
{
    match operation.await {
        Ok(value) => value,
        Err(e) => {
            warn!("{} failed: {} ({})", name, e, e.kind());
            error_envelope(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_respond_passes_success_through() {
        let value = respond("ok", async { Ok(json!({"fine": true})) }).await;
        assert_eq!(value, json!({"fine": true}));
    }

    #[tokio::test]
    async fn test_respond_wraps_errors() {
        let value = respond("broken", async {
            Err(CwLensError::from(
                anyhow::anyhow!("socket closed").context("Failed to list log groups"),
            ))
        })
        .await;

        assert_eq!(
            value,
            json!({
                "status": "Error",
                "error": "Failed to list log groups",
                "error_type": "BackendError",
                "details": "socket closed",
            })
        );
    }

    #[test]
    fn test_input_error_details_fall_back_to_message() {
        let value = error_envelope(&CwLensError::invalid_input("No search term specified"));
        assert_eq!(value["error_type"], "InvalidInput");
        assert_eq!(value["details"], "Invalid input: No search term specified");
    }
}
