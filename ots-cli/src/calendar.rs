use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use ots_core::collaborators::{Calendar, CollabResult};
use reqwest::Client;

use crate::error::{Error, Result};

/// Default calendar servers for `OpenTimestamps`
pub const DEFAULT_CALENDARS: &[&str] = &[
    "https://a.pool.opentimestamps.org",
    "https://b.pool.opentimestamps.org",
    "https://a.pool.eternitywall.com",
];

/// How many calendars a stamp submission must hear back from
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum SubmitStrategy {
    /// Every calendar must respond successfully
    All,
    /// A strict majority of calendars must respond successfully
    Quorum,
    /// The first calendar to respond successfully is enough
    FirstSuccess,
}

impl SubmitStrategy {
    /// Parse a strategy name from config/CLI input, case-insensitively
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "quorum" => Some(Self::Quorum),
            "first_success" | "first-success" => Some(Self::FirstSuccess),
            _ => None,
        }
    }
}

/// HTTP client for interacting with `OpenTimestamps` calendar servers
///
/// Calendar servers accept SHA256 digests and return pending attestations
/// that can later be upgraded to Bitcoin-confirmed attestations.
pub struct CalendarClient {
    client: Client,
}

impl CalendarClient {
    /// Create a new calendar client with the given per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client =
            Client::builder().timeout(timeout).user_agent("ots-cli/0.1.0").build()?;
        Ok(Self { client })
    }

    /// Submit a digest to one calendar server, returning its serialized pending proof tree
    pub async fn submit(&self, calendar_url: &str, digest: &[u8]) -> Result<Vec<u8>> {
        let url = format!("{calendar_url}/digest");
        debug!("Submitting digest to {url}");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-opentimestamps")
            .body(digest.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Calendar(format!(
                "calendar {} returned status {}",
                calendar_url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        info!("Received {} bytes from {}", bytes.len(), calendar_url);
        Ok(bytes.to_vec())
    }

    /// Fetch a (possibly still-pending) upgrade for a previously submitted commitment
    pub async fn get_timestamp(&self, calendar_url: &str, commitment: &[u8]) -> Result<Option<Vec<u8>>> {
        let hex_commitment = hex::encode(commitment);
        let url = format!("{calendar_url}/timestamp/{hex_commitment}");
        debug!("Fetching timestamp from {url}");

        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!("Timestamp not yet available at {calendar_url}");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Calendar(format!(
                "calendar {} returned status {}",
                calendar_url,
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    /// Submit `digest` to every URL in `calendar_urls` per `strategy`, returning
    /// every calendar's serialized response that succeeded
    ///
    /// Each submission runs as an independent task; results merge only after
    /// every task has settled, never partway through.
    ///
    /// # Errors
    ///
    /// Returns an error if too few calendars succeeded: fewer than required
    /// by `strategy` (all of them for [`SubmitStrategy::All`], a strict
    /// majority for [`SubmitStrategy::Quorum`], one for
    /// [`SubmitStrategy::FirstSuccess`]), or fewer than `min_successful`,
    /// whichever is larger.
    pub async fn submit_to_calendars(
        &self,
        calendar_urls: &[String],
        digest: &[u8],
        strategy: SubmitStrategy,
        min_successful: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let urls: Vec<String> = if calendar_urls.is_empty() {
            DEFAULT_CALENDARS.iter().map(|s| (*s).to_string()).collect()
        } else {
            calendar_urls.to_vec()
        };

        let tasks = urls.iter().map(|url| {
            let url = url.clone();
            async move {
                match self.submit(&url, digest).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        warn!("calendar {url} failed: {e}");
                        None
                    }
                }
            }
        });
        let results: Vec<Vec<u8>> = join_all(tasks).await.into_iter().flatten().collect();

        let strategy_required = match strategy {
            SubmitStrategy::All => urls.len(),
            SubmitStrategy::Quorum => urls.len() / 2 + 1,
            SubmitStrategy::FirstSuccess => 1,
        };
        let required = strategy_required.max(min_successful);
        if results.len() < required {
            return Err(Error::Calendar(format!(
                "{} of {} calendars succeeded, needed {required} for {strategy:?} (min_successful={min_successful})",
                results.len(),
                urls.len()
            )));
        }

        Ok(results)
    }
}

#[async_trait]
impl Calendar for CalendarClient {
    async fn fetch_upgrade(&self, uri: &str, commitment: &[u8]) -> CollabResult<Option<Vec<u8>>> {
        self.get_timestamp(uri, commitment).await.map_err(|e| e.to_string())
    }

    async fn submit(&self, uri: &str, digest: &[u8]) -> CollabResult<Vec<u8>> {
        CalendarClient::submit(self, uri, digest).await.map_err(|e| e.to_string())
    }
}

impl std::fmt::Debug for SubmitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Quorum => "quorum",
            Self::FirstSuccess => "first_success",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_calendars_not_empty() {
        assert_eq!(DEFAULT_CALENDARS.len(), 3);
    }

    #[test]
    fn calendar_client_creation() {
        let timeout = Duration::from_secs(10);
        assert!(CalendarClient::new(timeout).is_ok());
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(SubmitStrategy::parse("ALL"), Some(SubmitStrategy::All));
        assert_eq!(SubmitStrategy::parse("Quorum"), Some(SubmitStrategy::Quorum));
        assert_eq!(SubmitStrategy::parse("first-success"), Some(SubmitStrategy::FirstSuccess));
        assert_eq!(SubmitStrategy::parse("bogus"), None);
    }

    #[test]
    fn hex_encoding_is_lowercase() {
        let commitment = vec![0u8; 32];
        let hex = hex::encode(&commitment);
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
