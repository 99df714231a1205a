use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use snapdrift_core::config::{DeliveryConfig, DeliveryProvider};

use crate::error::Result;
use crate::pushbullet::PushbulletClient;
use crate::twilio::TwilioClient;

/// Maximum characters Twilio accepts in an SMS/MMS body.
pub const SMS_BODY_MAX_CHARS: usize = 1600;

/// Opaque content reference for an image in external storage.
///
/// Providers resolve it against the configured public base URL:
/// `{public_base_url}/images/{image_id}/{filename}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub image_id: i64,
    pub filename: String,
}

impl MediaRef {
    pub fn public_url(&self, base_url: &str) -> String {
        format!(
            "{}/images/{}/{}",
            base_url.trim_end_matches('/'),
            self.image_id,
            self.filename
        )
    }
}

/// Provider acknowledgement for one delivered message.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    /// Provider-side message id (Twilio SID, Pushbullet iden).
    pub provider_id: String,
}

/// Capability interface for sending one image message to the fixed recipient.
///
/// The scheduler depends only on this trait, so tests substitute an in-memory
/// fake and real messages can never leave a test run.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        media: &MediaRef,
        description: &str,
    ) -> Result<DeliveryReceipt>;
}

/// Construct the configured provider client.
///
/// Assumes `config.validate()` already passed, so the matching credential
/// section is present.
pub fn build_client(cfg: &DeliveryConfig) -> Option<Arc<dyn DeliveryClient>> {
    match cfg.provider {
        DeliveryProvider::Twilio => cfg.twilio.as_ref().map(|t| {
            Arc::new(TwilioClient::new(t.clone(), cfg.public_base_url.clone()))
                as Arc<dyn DeliveryClient>
        }),
        DeliveryProvider::Pushbullet => cfg.pushbullet.as_ref().map(|p| {
            Arc::new(PushbulletClient::new(p.clone(), cfg.public_base_url.clone()))
                as Arc<dyn DeliveryClient>
        }),
    }
}

/// Truncate a description to the SMS body limit on a char boundary.
pub(crate) fn clamp_body(description: &str) -> &str {
    match description.char_indices().nth(SMS_BODY_MAX_CHARS) {
        Some((idx, _)) => &description[..idx],
        None => description,
    }
}
