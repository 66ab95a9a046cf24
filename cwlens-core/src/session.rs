//! Session providers hand out a live [`LogsBackend`] per tool invocation.

use std::sync::Arc;

use anyhow::Result;

use crate::backend::LogsBackend;

#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    async fn logs_backend(&self) -> Result<Arc<dyn LogsBackend>>;

    fn describe(&self) -> String;
}

/// Always returns the same backend.
#[derive(Clone)]
pub struct StaticSessionProvider {
    backend: Arc<dyn LogsBackend>,
}

impl StaticSessionProvider {
    pub fn new(backend: Arc<dyn LogsBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait::async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn logs_backend(&self) -> Result<Arc<dyn LogsBackend>> {
        Ok(self.backend.clone())
    }

    fn describe(&self) -> String {
        format!("static ({})", self.backend.backend_name())
    }
}

#[cfg(feature = "aws")]
pub use aws_session::{AssumedCredentials, AwsSessionProvider};

#[cfg(feature = "aws")]
mod aws_session {
    use std::sync::Arc;
    use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};

    use anyhow::{Context, Result};
    use aws_config::BehaviorVersion;
    use aws_credential_types::Credentials;
    use aws_types::region::Region;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tokio::sync::RwLock;
    use tracing::{debug, info};

    use super::SessionProvider;
    use crate::backend::{AwsLogsBackend, LogsBackend};
    use crate::config::AwsSettings;

    /// Temporary credentials obtained from STS AssumeRole.
    #[derive(Debug, Clone)]
    pub struct AssumedCredentials {
        pub credentials: Credentials,
        pub expiration: DateTime<Utc>,
    }

    impl AssumedCredentials {
        /// Expired, or expiring within the next 5 minutes.
        pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
            now + Duration::minutes(5) >= self.expiration
        }

        pub fn is_expired(&self) -> bool {
            self.is_expired_at(Utc::now())
        }
    }

    /// Resolves profile/region from the standard AWS chain and optionally assumes
    /// a cross-account role.
    pub struct AwsSessionProvider {
        settings: AwsSettings,
        assumed: RwLock<Option<AssumedCredentials>>,
    }

    impl AwsSessionProvider {
        pub fn new(settings: AwsSettings) -> Self {
            Self {
                settings,
                assumed: RwLock::new(None),
            }
        }

        pub fn settings(&self) -> &AwsSettings {
            &self.settings
        }

        async fn base_config(&self) -> aws_config::SdkConfig {
            let mut loader = aws_config::defaults(BehaviorVersion::latest());
            if let Some(profile) = &self.settings.profile {
                loader = loader.profile_name(profile);
            }
            if let Some(region) = &self.settings.region {
                loader = loader.region(Region::new(region.clone()));
            }
            loader.load().await
        }

        async fn assumed_role_config(&self, role_arn: &str) -> Result<aws_config::SdkConfig> {
            let base = self.base_config().await;
            let credentials = self.assumed_credentials(&base, role_arn).await?;

            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .credentials_provider(credentials.credentials);
            if let Some(region) = base.region().cloned() {
                loader = loader.region(region);
            }
            Ok(loader.load().await)
        }

        async fn assumed_credentials(
            &self,
            base: &aws_config::SdkConfig,
            role_arn: &str,
        ) -> Result<AssumedCredentials> {
            if let Some(cached) = self.assumed.read().await.as_ref() {
                if !cached.is_expired() {
                    debug!("Using cached credentials for role {}", role_arn);
                    return Ok(cached.clone());
                }
            }

            let mut slot = self.assumed.write().await;
            // Another task may have refreshed while we waited for the lock
            if let Some(cached) = slot.as_ref() {
                if !cached.is_expired() {
                    return Ok(cached.clone());
                }
            }

            let fresh = self.assume_role(base, role_arn).await?;
            *slot = Some(fresh.clone());
            Ok(fresh)
        }

        async fn assume_role(
            &self,
            base: &aws_config::SdkConfig,
            role_arn: &str,
        ) -> Result<AssumedCredentials> {
            info!("Assuming role {}", role_arn);
            let sts = aws_sdk_sts::Client::new(base);
            let session_name = format!("CloudWatchLogs-{}", Utc::now().timestamp());

            let response = sts
                .assume_role()
                .role_arn(role_arn)
                .role_session_name(session_name)
                .set_external_id(self.settings.external_id.clone())
                .send()
                .await
                .with_context(|| format!("Failed to assume role {}", role_arn))?;

            let creds = response
                .credentials
                .ok_or_else(|| anyhow::anyhow!("AssumeRole for {} returned no credentials", role_arn))?;

            let expiry_secs = creds.expiration.secs();
            let expiration = Utc
                .timestamp_opt(expiry_secs, 0)
                .single()
                .ok_or_else(|| anyhow::anyhow!("Invalid credential expiration {}", expiry_secs))?;
            let expires_after: SystemTime = UNIX_EPOCH + StdDuration::from_secs(expiry_secs.max(0) as u64);

            let credentials = Credentials::new(
                creds.access_key_id,
                creds.secret_access_key,
                Some(creds.session_token),
                Some(expires_after),
                "cwlens-assume-role",
            );

            debug!("Assumed role {} until {}", role_arn, expiration);
            Ok(AssumedCredentials {
                credentials,
                expiration,
            })
        }
    }

    #[async_trait::async_trait]
    impl SessionProvider for AwsSessionProvider {
        async fn logs_backend(&self) -> Result<Arc<dyn LogsBackend>> {
            let config = match self.settings.role_arn.as_deref() {
                Some(role_arn) => self.assumed_role_config(role_arn).await?,
                None => self.base_config().await,
            };
            Ok(Arc::new(AwsLogsBackend::from_config(&config)))
        }

        fn describe(&self) -> String {
            format!(
                "aws (profile: {}, region: {}, role: {})",
                self.settings.profile.as_deref().unwrap_or("default"),
                self.settings.region.as_deref().unwrap_or("default"),
                self.settings.role_arn.as_deref().unwrap_or("none"),
            )
        }
    }

}
