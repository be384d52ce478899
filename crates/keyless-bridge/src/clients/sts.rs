//! AWS STS role assumption

use async_trait::async_trait;
use aws_sdk_sts::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sts::types::Tag;
use tracing::debug;

use crate::assumer::RoleAssumer;
use crate::types::{AssumeRoleFailure, AssumeRoleParams, IssuedCredentials};

const ACCESS_DENIED: &str = "AccessDenied";

/// [`RoleAssumer`] backed by `sts:AssumeRole`
#[derive(Clone, Debug)]
pub struct StsRoleAssumer {
    client: aws_sdk_sts::Client,
}

impl StsRoleAssumer {
    pub fn new(client: aws_sdk_sts::Client) -> Self {
        Self { client }
    }

    /// Create an assumer from shared SDK configuration
    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_sts::Client::new(config))
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role(
        &self,
        params: &AssumeRoleParams,
    ) -> Result<IssuedCredentials, AssumeRoleFailure> {
        let tags = params
            .tags
            .iter()
            .map(|tag| {
                Tag::builder()
                    .key(tag.key)
                    .value(tag.value.clone())
                    .build()
                    .map_err(|e| AssumeRoleFailure::Other(format!("invalid session tag: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            role_arn = %params.role_arn,
            with_external_id = params.external_id.is_some(),
            tags = tags.len(),
            "Calling sts:AssumeRole"
        );

        let output = self
            .client
            .assume_role()
            .role_arn(&params.role_arn)
            .role_session_name(&params.session_name)
            .set_duration_seconds(params.duration_seconds)
            .set_external_id(params.external_id.clone())
            .set_tags((!tags.is_empty()).then_some(tags))
            .send()
            .await
            .map_err(|err| match err.as_service_error() {
                Some(service_err) if service_err.code() == Some(ACCESS_DENIED) => {
                    AssumeRoleFailure::AccessDenied {
                        message: service_err.message().unwrap_or_default().to_string(),
                    }
                }
                _ => AssumeRoleFailure::Other(format!(
                    "sts:AssumeRole failed: {}",
                    DisplayErrorContext(&err)
                )),
            })?;

        let credentials = output.credentials().ok_or_else(|| {
            AssumeRoleFailure::Other("sts:AssumeRole returned no credentials".into())
        })?;

        Ok(IssuedCredentials {
            access_key_id: credentials.access_key_id().to_string(),
            secret_access_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().to_string(),
        })
    }

    fn description(&self) -> &str {
        "AWS STS"
    }
}
