//! NATS connection management.
//!
//! Thin wrapper around `async-nats` with engine defaults.

use tracing::{info, trace, warn};

use crate::error::NetError;
use crate::messages::ReplicationMessage;

/// Default NATS server URL.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// The environment variable used to override the NATS URL.
pub const NATS_URL_ENV: &str = "NATS_URL";

/// A wrapper around an `async-nats` client with engine-specific helpers.
#[derive(Debug, Clone)]
pub struct NatsConnection {
    /// The underlying NATS client.
    client: async_nats::Client,
}

impl NatsConnection {
    /// Connect to NATS using the URL from the `NATS_URL` environment variable,
    /// falling back to [`DEFAULT_NATS_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect() -> Result<Self, NetError> {
        let url = std::env::var(NATS_URL_ENV).unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());
        Self::connect_to(&url).await
    }

    /// Connect to NATS at the specified URL.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Connect`] if the connection cannot be established.
    pub async fn connect_to(url: &str) -> Result<Self, NetError> {
        info!(url, "connecting to NATS");
        let client = async_nats::connect(url).await?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Returns a reference to the underlying `async-nats` client.
    #[must_use]
    pub fn client(&self) -> &async_nats::Client {
        &self.client
    }

    /// Publish a replication message with its type headers.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding or publishing fails.
    pub async fn publish_replication(
        &self,
        subject: &str,
        message: &ReplicationMessage,
    ) -> Result<(), NetError> {
        let payload = message.payload()?;
        trace!(subject, msg_type = message.msg_type(), bytes = payload.len(), "publishing");
        self.client
            .publish_with_headers(subject.to_string(), message.headers(), payload.into())
            .await?;
        Ok(())
    }

    /// Flush pending publishes to the server. Failures are logged.
    pub async fn flush(&self) {
        if let Err(err) = self.client.flush().await {
            warn!(error = %err, "NATS flush failed");
        }
    }

    /// Subscribe to a subject.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::Subscribe`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, NetError> {
        let sub = self.client.subscribe(subject.to_string()).await?;
        Ok(sub)
    }
}
