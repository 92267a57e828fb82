use std::time::Duration;

use dealer_engine::errors::ProviderError;
use dealer_engine::provider::ActionProvider;
use dealer_engine::table::Table;
use serde::Deserialize;
use tokio::runtime::Handle;

use crate::errors::ManagementError;

#[derive(Debug, Deserialize)]
struct BetReply {
    bet: i64,
}

/// Adds `http://` to urls given without a scheme and checks the result.
pub fn normalize_url(raw: &str) -> Result<String, ManagementError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ManagementError::InvalidPlayerUrl(raw.to_string()));
    }
    let url = if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    match reqwest::Url::parse(&url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(url),
        _ => Err(ManagementError::InvalidPlayerUrl(raw.to_string())),
    }
}

/// A bot reachable over HTTP. Every decision is a POST of the table as the
/// bot sees it, answered with `{"bet": n}`.
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    runtime: Handle,
}

impl RemotePlayer {
    /// `client` should carry connect and read timeouts; `timeout` bounds the
    /// whole exchange on top of that.
    pub fn new(
        url: &str,
        client: reqwest::Client,
        timeout: Duration,
        runtime: Handle,
    ) -> Result<Self, ManagementError> {
        Ok(Self {
            url: normalize_url(url)?,
            client,
            timeout,
            runtime,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn ask(&self, table: &Table) -> Result<u32, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .json(table)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unreachable(format!(
                "{} answered {}",
                self.url,
                response.status()
            )));
        }

        let reply: BetReply = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        // negative bets fold like any other amount below the call
        Ok(reply.bet.clamp(0, i64::from(u32::MAX)) as u32)
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout.as_millis() as u64)
        } else {
            ProviderError::Unreachable(err.to_string())
        }
    }
}

impl ActionProvider for RemotePlayer {
    /// Must be called from a thread outside the async runtime, such as the
    /// tournament worker.
    fn request_bet(&self, table: &Table) -> Result<u32, ProviderError> {
        let timeout = self.timeout;
        let url = self.url.as_str();
        self.runtime.block_on(async {
            tokio::time::timeout(timeout, self.ask(table))
                .await
                .unwrap_or_else(|_| {
                    tracing::debug!(url, "bet request timed out");
                    Err(ProviderError::Timeout(timeout.as_millis() as u64))
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_added_when_missing() {
        assert_eq!(normalize_url("localhost:8081/bot").unwrap(), "http://localhost:8081/bot");
        assert_eq!(normalize_url(" https://bots.example/a ").unwrap(), "https://bots.example/a");
    }

    #[test]
    fn unusable_urls_are_rejected() {
        for raw in ["", "   ", "http://", "http://exa mple"] {
            assert!(
                matches!(normalize_url(raw), Err(ManagementError::InvalidPlayerUrl(_))),
                "{raw:?}"
            );
        }
    }
}
