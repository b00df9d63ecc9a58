use anyhow::anyhow;
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use tracing::debug;

use super::{GetParameterRequest, GetParameterResponse, Parameter, ParameterStore, StoreError};
use crate::context::CallContext;

/// Reads parameters from AWS SSM Parameter Store.
///
/// `SecureString` values come back decrypted when the request asks for it, as
/// long as the process has `ssm:GetParameter` and the matching KMS permissions.
#[derive(Debug, Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    /// Creates a store from an already resolved SDK configuration
    /// (see [`StoreConfig::resolve`](super::StoreConfig::resolve)).
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }

    pub fn from_client(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ParameterStore for SsmParameterStore {
    #[tracing::instrument(skip(self, ctx, request), fields(name = %request.name))]
    async fn get_parameter(
        &self,
        ctx: &CallContext,
        request: GetParameterRequest,
    ) -> Result<GetParameterResponse, StoreError> {
        let send = self
            .client
            .get_parameter()
            .name(&request.name)
            .with_decryption(request.with_decryption)
            .send();

        let result = ctx.run(send).await.map_err(|e| {
            anyhow!(e).context(format!("SSM GetParameter aborted for '{}'", request.name))
        })?;

        match result {
            Ok(output) => {
                debug!(
                    has_parameter = output.parameter.is_some(),
                    "SSM GetParameter succeeded"
                );
                Ok(GetParameterResponse {
                    parameter: output.parameter.map(|p| Parameter {
                        name: p.name,
                        value: p.value,
                        version: p.version,
                    }),
                })
            }
            Err(err) => {
                if matches!(
                    err.as_service_error(),
                    Some(GetParameterError::ParameterNotFound(_))
                ) {
                    return Err(StoreError::ParameterNotFound(request.name));
                }
                Err(StoreError::Other(
                    anyhow!(err).context(format!("SSM GetParameter failed for '{}'", request.name)),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ssm::Client;
    use aws_sdk_ssm::operation::get_parameter::GetParameterOutput;
    use aws_sdk_ssm::types::error::{InternalServerError, ParameterNotFound};
    use aws_smithy_mocks::{mock, mock_client};

    fn request(name: &str) -> GetParameterRequest {
        GetParameterRequest {
            name: name.to_string(),
            with_decryption: true,
        }
    }

    #[tokio::test]
    async fn test_parameter_not_found_maps_to_typed_error() {
        let rule = mock!(Client::get_parameter).then_error(|| {
            GetParameterError::ParameterNotFound(
                ParameterNotFound::builder().message("no such parameter").build(),
            )
        });
        let store = SsmParameterStore::from_client(mock_client!(aws_sdk_ssm, [&rule]));

        let err = store
            .get_parameter(&CallContext::background(), request("/app/missing"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::ParameterNotFound(ref name) if name == "/app/missing"));
        assert_eq!(rule.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_other_service_error_maps_to_other() {
        let rule = mock!(Client::get_parameter).then_error(|| {
            GetParameterError::InternalServerError(
                InternalServerError::builder().message("access denied").build(),
            )
        });
        let store = SsmParameterStore::from_client(mock_client!(aws_sdk_ssm, [&rule]));

        let err = store
            .get_parameter(&CallContext::background(), request("/app/secret"))
            .await
            .unwrap_err();

        match err {
            StoreError::Other(err) => {
                assert!(format!("{err:#}").contains("SSM GetParameter failed for '/app/secret'"));
            }
            StoreError::ParameterNotFound(_) => panic!("expected a fatal store error"),
        }
    }

    #[tokio::test]
    async fn test_value_and_decryption_flag_pass_through() {
        let rule = mock!(Client::get_parameter)
            .match_requests(|req| {
                req.name() == Some("/app/db/password") && req.with_decryption() == Some(true)
            })
            .then_output(|| {
                GetParameterOutput::builder()
                    .parameter(
                        aws_sdk_ssm::types::Parameter::builder()
                            .name("/app/db/password")
                            .value("hunter2")
                            .version(4)
                            .build(),
                    )
                    .build()
            });
        let store = SsmParameterStore::from_client(mock_client!(aws_sdk_ssm, [&rule]));

        let response = store
            .get_parameter(&CallContext::background(), request("/app/db/password"))
            .await
            .unwrap();

        assert_eq!(
            response,
            GetParameterResponse {
                parameter: Some(Parameter {
                    name: Some("/app/db/password".to_string()),
                    value: Some("hunter2".to_string()),
                    version: 4,
                }),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_envelope_maps_to_none() {
        let rule =
            mock!(Client::get_parameter).then_output(|| GetParameterOutput::builder().build());
        let store = SsmParameterStore::from_client(mock_client!(aws_sdk_ssm, [&rule]));

        let response = store
            .get_parameter(&CallContext::background(), request("/app/empty"))
            .await
            .unwrap();

        assert_eq!(response, GetParameterResponse::default());
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_the_call() {
        let rule =
            mock!(Client::get_parameter).then_output(|| GetParameterOutput::builder().build());
        let store = SsmParameterStore::from_client(mock_client!(aws_sdk_ssm, [&rule]));
        let (ctx, handle) = CallContext::background().with_cancel();
        handle.cancel();

        let err = store.get_parameter(&ctx, request("/app/key")).await.unwrap_err();

        assert!(matches!(err, StoreError::Other(_)));
        assert_eq!(rule.num_calls(), 0);
    }
}
