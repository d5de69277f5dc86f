//! CloudFormation exports and Secrets Manager through the AWS SDK
//!
//! Credentials come from the named profile; everything about authentication is left to
//! `aws-config`. Each call is bounded by a timeout.
use super::{ExternalResolver, Secret};
use crate::error::ExternalError;
use std::future::Future;
use std::time::Duration;

pub struct AwsResolver {
    runtime: tokio::runtime::Runtime,
    cloudformation: aws_sdk_cloudformation::Client,
    secrets: aws_sdk_secretsmanager::Client,
    timeout: Duration,
}

impl AwsResolver {
    pub fn new(profile: &str, region: &str, timeout: Duration) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()?;

        tracing::info!(profile, region, "loading aws configuration");
        let config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .profile_name(profile)
                .region(aws_config::Region::new(region.to_owned()))
                .load(),
        );

        Ok(Self {
            cloudformation: aws_sdk_cloudformation::Client::new(&config),
            secrets: aws_sdk_secretsmanager::Client::new(&config),
            runtime,
            timeout,
        })
    }

    fn call<T>(
        &self,
        reference: &str,
        future: impl Future<Output = Result<T, ExternalError>>,
    ) -> Result<T, ExternalError> {
        self.runtime.block_on(async {
            tokio::time::timeout(self.timeout, future)
                .await
                .map_err(|_elapsed| ExternalError::Timeout {
                    reference: reference.into(),
                    seconds: self.timeout.as_secs(),
                })?
        })
    }
}

fn failed(reference: &str, error: impl std::error::Error) -> ExternalError {
    ExternalError::Failed {
        reference: reference.into(),
        source: aws_sdk_cloudformation::error::DisplayErrorContext(error)
            .to_string()
            .into(),
    }
}

impl ExternalResolver for AwsResolver {
    #[tracing::instrument(level = "debug", skip(self))]
    fn fetch_import(&self, name: &str) -> Result<String, ExternalError> {
        self.call(name, async {
            let mut next_token = None;
            loop {
                let page = self
                    .cloudformation
                    .list_exports()
                    .set_next_token(next_token)
                    .send()
                    .await
                    .map_err(|error| failed(name, error))?;

                if let Some(export) = page.exports().iter().find(|e| e.name() == Some(name)) {
                    return export
                        .value()
                        .map(str::to_owned)
                        .ok_or_else(|| ExternalError::NotFound {
                            reference: name.into(),
                        });
                }

                match page.next_token() {
                    Some(token) => next_token = Some(token.to_owned()),
                    None => {
                        return Err(ExternalError::NotFound {
                            reference: name.into(),
                        })
                    }
                }
            }
        })
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn fetch_secret(&self, identifier: &str) -> Result<Secret, ExternalError> {
        self.call(identifier, async {
            let output = self
                .secrets
                .get_secret_value()
                .secret_id(identifier)
                .send()
                .await
                .map_err(|error| {
                    let not_found = error
                        .as_service_error()
                        .is_some_and(|e| e.is_resource_not_found_exception());
                    if not_found {
                        ExternalError::NotFound {
                            reference: identifier.into(),
                        }
                    } else {
                        failed(identifier, error)
                    }
                })?;

            if let Some(text) = output.secret_string() {
                return Ok(Secret::Text(text.to_owned()));
            }

            match output.secret_binary() {
                Some(blob) => Ok(Secret::Text(
                    String::from_utf8_lossy(blob.as_ref()).into_owned(),
                )),
                None => Err(ExternalError::NotFound {
                    reference: identifier.into(),
                }),
            }
        })
    }
}
