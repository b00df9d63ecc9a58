use std::time::Duration;

use anyhow::{Context, Result, bail};
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use serde::Deserialize;
use tracing::debug;

pub const ENV_REGION: &str = "SSM_LOOKUPER_REGION";
pub const ENV_PROFILE: &str = "SSM_LOOKUPER_PROFILE";
pub const ENV_ENDPOINT_URL: &str = "SSM_LOOKUPER_ENDPOINT_URL";
pub const ENV_TIMEOUT_SECS: &str = "SSM_LOOKUPER_TIMEOUT_SECS";

/// Overrides applied on top of the ambient AWS configuration.
///
/// Anything left unset falls through to the default `aws-config` chain
/// (`AWS_REGION`, `AWS_PROFILE`, shared config files, instance metadata, ...).
/// Stored as a JSON object on disk:
/// ```json
/// {
///   "region": "eu-west-1",
///   "profile": "prod",
///   "endpoint_url": "http://localhost:4566",
///   "timeout_secs": 5
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub endpoint_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl StoreConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read store config '{path}'"))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse store config '{path}'"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the `SSM_LOOKUPER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any name -> value source shaped like the
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let timeout_secs = match lookup(ENV_TIMEOUT_SECS) {
            Some(raw) => Some(raw.trim().parse::<u64>().with_context(|| {
                format!("{ENV_TIMEOUT_SECS} must be a positive integer, got '{raw}'")
            })?),
            None => None,
        };

        let config = Self {
            region: lookup(ENV_REGION),
            profile: lookup(ENV_PROFILE),
            endpoint_url: lookup(ENV_ENDPOINT_URL),
            timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Layers `other` on top of `self`: every field set in `other` wins.
    pub fn merge(self, other: Self) -> Self {
        Self {
            region: other.region.or(self.region),
            profile: other.profile.or(self.profile),
            endpoint_url: other.endpoint_url.or(self.endpoint_url),
            timeout_secs: other.timeout_secs.or(self.timeout_secs),
        }
    }

    /// Layers the optional JSON file at `file`, then `env`, then `flags`,
    /// and validates the result.
    pub fn layered(file: Option<&str>, env: Self, flags: Self) -> Result<Self> {
        let base = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        let config = base.merge(env).merge(flags);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("region", &self.region),
            ("profile", &self.profile),
            ("endpoint_url", &self.endpoint_url),
        ];
        for (field, value) in fields {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                bail!("{field} must not be empty");
            }
        }

        if let Some(url) = &self.endpoint_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("endpoint_url must be an http(s) URL, got '{url}'");
            }
        }

        if self.timeout_secs == Some(0) {
            bail!("timeout_secs must be greater than zero");
        }

        Ok(())
    }

    /// Resolves the AWS SDK configuration: credentials, region and endpoint.
    ///
    /// # Errors
    ///
    /// Fails when the overrides are invalid or no region can be found in
    /// either the overrides or the ambient configuration.
    pub async fn resolve(&self) -> Result<SdkConfig> {
        self.validate()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(url) = &self.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        if let Some(secs) = self.timeout_secs {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(secs))
                    .build(),
            );
        }

        let sdk_config = loader.load().await;
        let Some(region) = sdk_config.region() else {
            bail!("no AWS region configured; set {ENV_REGION} or AWS_REGION");
        };
        debug!(%region, endpoint_url = ?self.endpoint_url, "Resolved AWS configuration");

        Ok(sdk_config)
    }
}
