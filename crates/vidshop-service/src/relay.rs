//! Chat relay client.
//!
//! The relay is the chat bot process that owns the platform connection. The
//! service hands it purchased files and audit lines over HTTP:
//!
//! - `POST {relay}/v1/deliveries`: multipart with an `envelope` JSON part
//!   (destination + delivery metadata) and a `file` part
//! - `POST {relay}/v1/audit`: JSON [`AuditEvent`]
//!
//! When a relay secret is configured, each request is signed over its JSON
//! payload (see [`crate::crypto`]).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;

use vidshop_core::Destination;
use vidshop_fetch::FetchedAsset;
use vidshop_shop::{
    AuditError, AuditEvent, AuditSink, Delivery, DeliveryError, DeliveryMetadata,
};

use crate::crypto::{sign_payload, SIGNATURE_HEADER};

/// Timeout for one relay request. Uploads can be tens of megabytes.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest relay error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Error type for relay operations.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The relay answered with a non-success status.
    #[error("relay returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading the asset from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The JSON part of a delivery upload.
#[derive(Debug, Serialize)]
struct DeliveryEnvelope<'a> {
    destination: &'a Destination,
    metadata: &'a DeliveryMetadata,
}

/// HTTP client for the relay.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    secret: Option<String>,
}

impl RelayClient {
    /// Create a client for the relay at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, secret: Option<String>) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(RELAY_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret,
        })
    }

    /// Upload a purchased file for delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the relay rejects it.
    pub async fn send_file(
        &self,
        destination: &Destination,
        asset: &FetchedAsset,
        metadata: &DeliveryMetadata,
    ) -> Result<(), RelayError> {
        let envelope = serde_json::to_string(&DeliveryEnvelope {
            destination,
            metadata,
        })?;
        let bytes = tokio::fs::read(asset.path()).await?;

        let file = Part::bytes(bytes)
            .file_name(asset.file_name().to_string())
            .mime_str(asset.content_type().unwrap_or("application/octet-stream"))?;
        let form = Form::new()
            .part(
                "envelope",
                Part::text(envelope.clone()).mime_str("application/json")?,
            )
            .part("file", file);

        let url = format!("{}/v1/deliveries", self.base_url);
        let request = self.sign(self.client.post(&url), &envelope).multipart(form);

        tracing::debug!(
            url = %url,
            destination = %destination,
            purchase_id = %metadata.purchase_id,
            size_bytes = metadata.size_bytes,
            "Uploading delivery to relay"
        );

        Self::check(request.send().await?).await
    }

    /// Post an audit event.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay rejects the event.
    pub async fn send_audit(&self, event: &AuditEvent) -> Result<(), RelayError> {
        let body = serde_json::to_string(event)?;
        let url = format!("{}/v1/audit", self.base_url);

        let request = self
            .sign(self.client.post(&url), &body)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        Self::check(request.send().await?).await
    }

    fn sign(&self, builder: RequestBuilder, payload: &str) -> RequestBuilder {
        match &self.secret {
            Some(secret) => builder.header(
                SIGNATURE_HEADER,
                sign_payload(secret, chrono::Utc::now().timestamp(), payload),
            ),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<(), RelayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }

        Err(RelayError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

// ============================================================================
// Shop collaborators
// ============================================================================

/// Delivers purchases through the relay.
#[derive(Debug, Clone)]
pub struct RelayDelivery {
    relay: RelayClient,
    max_payload_bytes: u64,
}

impl RelayDelivery {
    /// Deliver through `relay`, refusing files over `max_payload_bytes`.
    #[must_use]
    pub fn new(relay: RelayClient, max_payload_bytes: u64) -> Self {
        Self {
            relay,
            max_payload_bytes,
        }
    }
}

#[async_trait]
impl Delivery for RelayDelivery {
    fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    async fn deliver(
        &self,
        destination: &Destination,
        asset: &FetchedAsset,
        metadata: &DeliveryMetadata,
    ) -> Result<(), DeliveryError> {
        self.relay
            .send_file(destination, asset, metadata)
            .await
            .map_err(|e| DeliveryError(e.to_string()))
    }
}

/// Publishes audit events through the relay.
#[derive(Debug, Clone)]
pub struct RelayAudit {
    relay: RelayClient,
}

impl RelayAudit {
    /// Publish through `relay`.
    #[must_use]
    pub fn new(relay: RelayClient) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl AuditSink for RelayAudit {
    async fn emit(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.relay
            .send_audit(event)
            .await
            .map_err(|e| AuditError(e.to_string()))
    }
}

/// Stand-in used when no relay is configured: every delivery fails, so
/// purchases are refunded instead of silently dropped.
#[derive(Debug, Clone, Copy)]
pub struct UnconfiguredDelivery {
    max_payload_bytes: u64,
}

impl UnconfiguredDelivery {
    /// Report `max_payload_bytes` as the limit.
    #[must_use]
    pub const fn new(max_payload_bytes: u64) -> Self {
        Self { max_payload_bytes }
    }
}

#[async_trait]
impl Delivery for UnconfiguredDelivery {
    fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    async fn deliver(
        &self,
        _destination: &Destination,
        _asset: &FetchedAsset,
        _metadata: &DeliveryMetadata,
    ) -> Result<(), DeliveryError> {
        Err(DeliveryError("no delivery relay is configured".into()))
    }
}
