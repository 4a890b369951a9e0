//! Outbound call placement against the telephony provider.
//!
//! The store never dials; placing the call is the one outbound HTTP
//! interaction this service performs. It lives behind the [`Dialer`]
//! trait so handler tests can run without a provider account.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Deserialize;
use thiserror::Error;

use crate::config::TelephonyConfig;

/// Errors from placing an outbound call.
#[derive(Debug, Error)]
pub enum DialError {
    /// The HTTP request to the provider failed outright.
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider rejected the call: HTTP {status}: {body}")]
    Rejected {
        /// HTTP status returned by the provider.
        status: u16,
        /// Response body, for the logs.
        body: String,
    },

    /// The provider response did not contain a call SID.
    #[error("provider response missing call sid")]
    MissingSid,
}

/// Places outbound calls and returns the provider-assigned call SID.
pub trait Dialer: Send + Sync {
    /// Dials `to_number`. Resolves to the call SID on success.
    fn place_call<'a>(
        &'a self,
        to_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, DialError>> + Send + 'a>>;
}

/// Real dialer that talks to the provider's REST API.
pub struct HttpDialer {
    client: reqwest::Client,
    config: TelephonyConfig,
}

impl HttpDialer {
    /// Builds a dialer from the telephony section of the config.
    pub fn new(config: TelephonyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProviderCallResponse {
    sid: Option<String>,
}

impl Dialer for HttpDialer {
    fn place_call<'a>(
        &'a self,
        to_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, DialError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/calls", self.config.api_base_url.trim_end_matches('/'));
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_token)
                .json(&serde_json::json!({
                    "from": self.config.from_number,
                    "to": to_number,
                }))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(DialError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }

            let parsed: ProviderCallResponse = response.json().await?;
            parsed.sid.ok_or(DialError::MissingSid)
        })
    }
}

/// Dialer that fakes call placement.
///
/// Used when no telephony provider is configured (local development) and
/// by handler tests. Hands out SIDs from a process-local counter; status
/// and transcript events then have to be driven by hand through the
/// callback endpoints.
#[derive(Default)]
pub struct StaticDialer {
    counter: AtomicU64,
}

impl StaticDialer {
    /// Creates a dialer whose first SID is `CA-local-1`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Dialer for StaticDialer {
    fn place_call<'a>(
        &'a self,
        to_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, DialError>> + Send + 'a>> {
        Box::pin(async move {
            let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            let sid = format!("CA-local-{n}");
            tracing::info!(to_number, sid = %sid, "static dialer faking call placement");
            Ok(sid)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_dialer_hands_out_unique_sids() {
        let dialer = StaticDialer::new();
        let a = dialer.place_call("+15551230001").await.unwrap();
        let b = dialer.place_call("+15551230002").await.unwrap();
        assert_eq!(a, "CA-local-1");
        assert_eq!(b, "CA-local-2");
    }
}
