//! Single-key lookups against a remote parameter store.
//!
//! [`Lookuper`] is the interface configuration code programs against.
//! [`SsmLookuper`] implements it on top of any [`ParameterStore`], AWS SSM by
//! default.

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::context::CallContext;
use crate::infra::keys::{
    GetParameterRequest, ParameterStore, SsmParameterStore, StoreConfig, StoreError,
};

/// Resolves a configuration key to its value.
#[async_trait::async_trait]
pub trait Lookuper: Send + Sync {
    /// Returns `(value, true)` when the key has a value and `("", false)`
    /// when it does not.
    async fn lookup(&self, key: &str) -> (String, bool);
}

/// Looks up decrypted parameters, one store request per call.
///
/// Every request is bounded by the [`CallContext`] given at construction. No
/// results are cached.
pub struct SsmLookuper<S = SsmParameterStore> {
    store: S,
    ctx: CallContext,
}

impl SsmLookuper {
    /// Builds a lookuper from the `SSM_LOOKUPER_*` environment and the
    /// ambient AWS configuration.
    pub async fn new(ctx: CallContext) -> Result<Self> {
        Self::from_vars(ctx, |name| std::env::var(name).ok()).await
    }

    /// Like [`SsmLookuper::new`], reading the `SSM_LOOKUPER_*` settings from
    /// `vars` instead of the process environment.
    pub async fn from_vars<F>(ctx: CallContext, vars: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config =
            StoreConfig::from_lookup(vars).context("failed to load remote store configuration")?;
        Self::from_config(ctx, &config).await
    }

    pub async fn from_config(ctx: CallContext, config: &StoreConfig) -> Result<Self> {
        let sdk_config = config
            .resolve()
            .await
            .context("failed to load remote store configuration")?;
        Ok(Self::with_store(SsmParameterStore::new(&sdk_config), ctx))
    }
}

impl<S: ParameterStore> SsmLookuper<S> {
    pub fn with_store(store: S, ctx: CallContext) -> Self {
        Self { store, ctx }
    }

    /// Fetches `key` with decryption requested.
    ///
    /// Returns `Ok(None)` both when the store reports the parameter as missing
    /// and when it answers without a parameter or value. Any other store
    /// failure is returned as `Err`.
    #[tracing::instrument(skip(self))]
    pub async fn try_lookup(&self, key: &str) -> Result<Option<String>> {
        let request = GetParameterRequest {
            name: key.to_string(),
            with_decryption: true,
        };

        let response = match self.store.get_parameter(&self.ctx, request).await {
            Ok(response) => response,
            Err(StoreError::ParameterNotFound(_)) => {
                debug!("Parameter not found");
                return Ok(None);
            }
            Err(StoreError::Other(err)) => {
                return Err(err.context(format!("ssm GetParameter failed for '{key}'")));
            }
        };

        match response.parameter.and_then(|p| p.value) {
            Some(value) => {
                debug!(found = true, "Parameter resolved");
                Ok(Some(value))
            }
            None => {
                debug!(found = false, "Parameter response carried no value");
                Ok(None)
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: ParameterStore> Lookuper for SsmLookuper<S> {
    /// # Panics
    ///
    /// Panics on any store failure other than a missing parameter. A reachable,
    /// authorized store is a precondition of this call; use
    /// [`SsmLookuper::try_lookup`] to handle failures instead.
    async fn lookup(&self, key: &str) -> (String, bool) {
        match self.try_lookup(key).await {
            Ok(Some(value)) => (value, true),
            Ok(None) => (String::new(), false),
            Err(err) => {
                error!(key, error = %format!("{err:#}"), "Parameter lookup failed");
                panic!("{err:#}");
            }
        }
    }
}
