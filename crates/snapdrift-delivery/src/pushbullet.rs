//! Pushbullet client.
//!
//! Delivers as a link push: the note body carries the description and the
//! link points at the image's public URL. The file-upload API needs the raw
//! bytes, which live in external storage the scheduler cannot read, so the
//! link form is used instead.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use snapdrift_core::config::PushbulletConfig;

use crate::client::{DeliveryClient, DeliveryReceipt, MediaRef};
use crate::error::{DeliveryError, Result};

const PUSHBULLET_API_BASE: &str = "https://api.pushbullet.com/v2";

pub struct PushbulletClient {
    http: reqwest::Client,
    config: PushbulletConfig,
    public_base_url: String,
}

impl PushbulletClient {
    pub fn new(config: PushbulletConfig, public_base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            public_base_url,
        }
    }
}

#[async_trait]
impl DeliveryClient for PushbulletClient {
    async fn send(
        &self,
        _recipient: &str,
        media: &MediaRef,
        description: &str,
    ) -> Result<DeliveryReceipt> {
        let resp = self
            .http
            .post(format!("{PUSHBULLET_API_BASE}/pushes"))
            .header("Access-Token", &self.config.api_key)
            .json(&json!({
                "type": "link",
                "title": "snapdrift",
                "body": description,
                "url": media.public_url(&self.public_base_url),
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Provider {
                code: None,
                message: format!("HTTP {}: {detail}", status.as_u16()),
            });
        }

        let push: PushResponse = resp
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
        info!(image_id = media.image_id, provider_id = %push.iden, "pushbullet push accepted");
        Ok(DeliveryReceipt {
            provider_id: push.iden,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    iden: String,
}
