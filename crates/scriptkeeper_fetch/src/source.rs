//! Script sources: where script bodies come from.

use core::fmt;

use async_trait::async_trait;
use reqwest::Url;
use scriptkeeper_registry::ResourceKey;

use crate::config::FetchConfig;
use crate::error::FetchError;

/// Loads the body of a script.
///
/// Implement this to plug a new transport into
/// [`InjectingFetcher`](crate::InjectingFetcher).
#[async_trait]
pub trait ScriptSource: Send + Sync + 'static {
    /// Loads the script named by `key`.
    async fn load(&self, key: &ResourceKey) -> Result<String, FetchError>;
}

/// Loads scripts over HTTP(S) with `reqwest`.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    config: FetchConfig,
}

impl HttpSource {
    /// Creates a source from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the configuration is invalid or the
    /// client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        config
            .validate()
            .map_err(|err| FetchError::Client(err.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| FetchError::Client(err.to_string()))?;

        Ok(Self { client, config })
    }

    /// Returns the configuration this source was built with.
    #[must_use]
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn parse_url(key: &ResourceKey) -> Result<Url, FetchError> {
        let url = Url::parse(key.as_str()).map_err(|err| FetchError::InvalidUrl {
            url: key.to_string(),
            reason: err.to_string(),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(FetchError::InvalidUrl {
                url: key.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            }),
        }
    }

    fn request_error(&self, err: &reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout())
        } else {
            FetchError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl ScriptSource for HttpSource {
    async fn load(&self, key: &ResourceKey) -> Result<String, FetchError> {
        let url = Self::parse_url(key)?;
        let limit = self.config.max_body_bytes;

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.request_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if let Some(length) = response.content_length()
            && length > limit as u64
        {
            return Err(FetchError::TooLarge { limit });
        }

        // Chunked responses carry no length up front; count while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| self.request_error(&err))?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            bytes.extend_from_slice(&chunk);
        }

        let body = String::from_utf8(bytes).map_err(|err| FetchError::InvalidEncoding {
            url: url.to_string(),
            reason: err.utf8_error().to_string(),
        })?;

        tracing::debug!(%url, bytes = body.len(), "script body received");
        Ok(body)
    }
}

impl fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSource")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
