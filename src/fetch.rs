use std::io::Read;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::VerifyConfig;
use crate::error::FetchError;
use crate::locator;

/// Raw archive bytes and where they came from
#[derive(Debug, Clone)]
pub struct FetchedArchive {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Retrieves content archives for module versions
pub trait ArchiveFetcher: Send + Sync {
    fn fetch(&self, module_path: &str, version: &str) -> Result<FetchedArchive, FetchError>;
}

/// Fetches archives over HTTP(S) from the hosting convention's URL
pub struct HttpFetcher {
    client: Client,
    max_archive_bytes: u64,
}

impl HttpFetcher {
    /// Create a fetcher with the transport settings from `config`
    pub fn new(config: &VerifyConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Client)?;

        Ok(HttpFetcher {
            client,
            max_archive_bytes: config.max_archive_bytes,
        })
    }

    /// Download an archive from an explicit URL
    pub fn fetch_url(&self, url: &str) -> Result<FetchedArchive, FetchError> {
        debug!(url, "downloading archive");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let limit = self.max_archive_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit,
            });
        }

        let mut bytes = Vec::new();
        response
            .take(limit.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?;

        if bytes.len() as u64 > limit {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit,
            });
        }

        debug!(url, size = bytes.len(), "archive downloaded");
        Ok(FetchedArchive {
            url: url.to_string(),
            bytes,
        })
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, module_path: &str, version: &str) -> Result<FetchedArchive, FetchError> {
        let url = locator::archive_url(module_path, version)?;
        self.fetch_url(&url)
    }
}
