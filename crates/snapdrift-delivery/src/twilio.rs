//! Twilio MMS client.
//!
//! Sends one message per call through the Messages REST API. Transient
//! failures (timeouts, 5xx, rate limits) are retried up to [`MAX_ATTEMPTS`]
//! with linearly growing backoff; permanent failures (bad credentials,
//! unusable numbers) abort immediately.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use snapdrift_core::config::TwilioConfig;

use crate::client::{clamp_body, DeliveryClient, DeliveryReceipt, MediaRef};
use crate::error::{DeliveryError, Result};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct TwilioClient {
    http: reqwest::Client,
    config: TwilioConfig,
    public_base_url: String,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig, public_base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            public_base_url,
        }
    }

    async fn send_once(
        &self,
        recipient: &str,
        media_url: &str,
        description: &str,
    ) -> Result<DeliveryReceipt> {
        let url = format!(
            "{TWILIO_API_BASE}/Accounts/{}/Messages.json",
            self.config.account_sid
        );
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", recipient),
                ("From", self.config.from_number.as_str()),
                ("Body", clamp_body(description)),
                ("MediaUrl", media_url),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let msg: MessageResponse = resp
                .json()
                .await
                .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
            Ok(DeliveryReceipt {
                provider_id: msg.sid,
            })
        } else {
            let err: ErrorResponse = resp.json().await.unwrap_or_default();
            Err(DeliveryError::Provider {
                code: err.code,
                message: err
                    .message
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            })
        }
    }
}

#[async_trait]
impl DeliveryClient for TwilioClient {
    async fn send(
        &self,
        recipient: &str,
        media: &MediaRef,
        description: &str,
    ) -> Result<DeliveryReceipt> {
        let media_url = media.public_url(&self.public_base_url);
        let mut attempt = 1;
        loop {
            match self.send_once(recipient, &media_url, description).await {
                Ok(receipt) => {
                    info!(
                        image_id = media.image_id,
                        provider_id = %receipt.provider_id,
                        attempt,
                        "twilio message accepted"
                    );
                    return Ok(receipt);
                }
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!(image_id = media.image_id, attempt, error = %e,
                        "twilio send failed; retrying");
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    code: Option<u32>,
    message: Option<String>,
}
