//! Parameter store access.
//!
//! [`ParameterStore`] is the narrow capability a lookuper depends on: fetch
//! one parameter by name, optionally decrypted.
//! [`SsmParameterStore`] implements it with AWS SSM Parameter Store.
//! [`StoreConfig`] carries the region/profile/endpoint overrides used to
//! reach the store.

mod config;
mod ssm;

pub use config::{
    ENV_ENDPOINT_URL, ENV_PROFILE, ENV_REGION, ENV_TIMEOUT_SECS, StoreConfig,
};
pub use ssm::SsmParameterStore;

use std::sync::Arc;

use thiserror::Error;

use crate::context::CallContext;

/// A single `GetParameter` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetParameterRequest {
    pub name: String,
    pub with_decryption: bool,
}

/// The envelope returned by a successful call. `parameter` may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetParameterResponse {
    pub parameter: Option<Parameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<String>,
    pub value: Option<String>,
    pub version: i64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has no parameter under the requested name.
    #[error("parameter not found: {0}")]
    ParameterNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fetches parameters from a remote key/value store.
#[async_trait::async_trait]
pub trait ParameterStore: Send + Sync {
    /// Issues exactly one request, bounded by `ctx`.
    async fn get_parameter(
        &self,
        ctx: &CallContext,
        request: GetParameterRequest,
    ) -> Result<GetParameterResponse, StoreError>;
}

#[async_trait::async_trait]
impl<S: ParameterStore + ?Sized> ParameterStore for Arc<S> {
    async fn get_parameter(
        &self,
        ctx: &CallContext,
        request: GetParameterRequest,
    ) -> Result<GetParameterResponse, StoreError> {
        (**self).get_parameter(ctx, request).await
    }
}
