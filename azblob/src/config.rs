//! Client configuration.

use std::env;

use azblob_core::{Error, Result};

use crate::constants::{DEVSTORE_ACCOUNT, DEVSTORE_KEY, URL_DEV_BLOB};

/// Environment variable for the blob endpoint.
pub const AZBLOB_ENDPOINT: &str = "AZBLOB_ENDPOINT";
/// Environment variable for the account name.
pub const AZBLOB_ACCOUNT_NAME: &str = "AZBLOB_ACCOUNT_NAME";
/// Environment variable for the base64-encoded account key.
pub const AZBLOB_ACCOUNT_KEY: &str = "AZBLOB_ACCOUNT_KEY";

/// Config carries all the configuration for the blob client.
#[derive(Clone, Default)]
#[cfg_attr(test, derive(Debug, PartialEq, Eq))]
pub struct Config {
    /// Blob service endpoint, e.g. `https://myaccount.blob.core.windows.net`.
    pub endpoint: Option<String>,
    /// Storage account name.
    pub account_name: Option<String>,
    /// Base64-encoded account key.
    pub account_key: Option<String>,
    /// Address the account path-style instead of host-style.
    pub use_path_style_uri: bool,
}

impl Config {
    /// Load config from environment variables, leaving unset fields at
    /// their defaults.
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(AZBLOB_ENDPOINT).ok(),
            account_name: env::var(AZBLOB_ACCOUNT_NAME).ok(),
            account_key: env::var(AZBLOB_ACCOUNT_KEY).ok(),
            use_path_style_uri: false,
        }
    }

    /// Config for local development storage.
    pub fn development_storage() -> Self {
        Self {
            endpoint: Some(format!("{URL_DEV_BLOB}/{DEVSTORE_ACCOUNT}")),
            account_name: Some(DEVSTORE_ACCOUNT.to_string()),
            account_key: Some(DEVSTORE_KEY.to_string()),
            use_path_style_uri: true,
        }
    }

    /// Parse a `key=value;key=value` connection string.
    ///
    /// Recognized keys: `UseDevelopmentStorage`, `DefaultEndpointsProtocol`,
    /// `AccountName`, `AccountKey`, `BlobEndpoint` and `EndpointSuffix`.
    /// An explicit `BlobEndpoint` wins over an endpoint assembled from
    /// protocol, account and suffix.
    pub fn from_connection_string(value: &str) -> Result<Self> {
        let mut protocol = "https".to_string();
        let mut suffix = "core.windows.net".to_string();
        let mut blob_endpoint = None;
        let mut config = Config::default();

        for pair in value.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, val) = pair.split_once('=').ok_or_else(|| {
                Error::config_invalid(format!("connection string segment `{pair}` has no `=`"))
            })?;

            match key.trim() {
                "UseDevelopmentStorage" => {
                    if val.trim().eq_ignore_ascii_case("true") {
                        return Ok(Config::development_storage());
                    }
                }
                "DefaultEndpointsProtocol" => protocol = val.trim().to_string(),
                "AccountName" => config.account_name = Some(val.trim().to_string()),
                // The key is base64 and may itself contain `=` padding, so
                // only the first `=` of the segment splits key and value.
                "AccountKey" => config.account_key = Some(val.trim().to_string()),
                "BlobEndpoint" => blob_endpoint = Some(val.trim().to_string()),
                "EndpointSuffix" => suffix = val.trim().to_string(),
                other => {
                    return Err(Error::config_invalid(format!(
                        "unknown connection string key `{other}`"
                    )))
                }
            }
        }

        config.endpoint = match (blob_endpoint, &config.account_name) {
            (Some(endpoint), _) => Some(endpoint),
            (None, Some(account)) => Some(format!("{protocol}://{account}.blob.{suffix}")),
            (None, None) => None,
        };

        Ok(config)
    }
}
