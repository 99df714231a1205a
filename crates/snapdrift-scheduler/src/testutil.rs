//! In-memory fakes for engine and selector tests.
//!
//! Real delivery must never fire from a test, so everything the engine
//! touches is replaced here: the image library is a `Vec` behind a mutex and
//! the delivery client records what it would have sent.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use snapdrift_delivery::{DeliveryClient, DeliveryError, DeliveryReceipt, MediaRef};
use snapdrift_images::{Image, ImageStore, ImageStoreError};

pub struct InMemoryImageStore {
    images: Mutex<Vec<Image>>,
    fail_mark_sent: AtomicBool,
}

impl InMemoryImageStore {
    /// Build a store from `(filename, is_active, is_sent)` tuples.
    /// Ids are assigned 1..=n in order.
    pub fn with_images(specs: &[(&str, bool, bool)]) -> Self {
        let images = specs
            .iter()
            .enumerate()
            .map(|(i, (name, active, sent))| Image {
                id: i as i64 + 1,
                filename: name.to_string(),
                file_hash: format!("hash-{i}"),
                file_size: 1024,
                mime_type: "image/jpeg".into(),
                description: format!("description of {name}"),
                created_at: Utc::now(),
                last_sent: None,
                send_count: 0,
                is_active: *active,
                is_sent: *sent,
            })
            .collect();
        Self {
            images: Mutex::new(images),
            fail_mark_sent: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `mark_sent` fail (data-consistency path).
    pub fn fail_mark_sent(&self) {
        self.fail_mark_sent.store(true, Ordering::SeqCst);
    }
}

impl ImageStore for InMemoryImageStore {
    fn list_eligible(&self) -> snapdrift_images::Result<Vec<Image>> {
        let images = self.images.lock().unwrap();
        Ok(images.iter().filter(|i| i.is_eligible()).cloned().collect())
    }

    fn get(&self, id: i64) -> snapdrift_images::Result<Option<Image>> {
        let images = self.images.lock().unwrap();
        Ok(images.iter().find(|i| i.id == id).cloned())
    }

    fn mark_sent(&self, id: i64, sent_at: DateTime<Utc>) -> snapdrift_images::Result<Image> {
        if self.fail_mark_sent.load(Ordering::SeqCst) {
            return Err(ImageStoreError::Corrupt {
                id,
                detail: "injected mark_sent failure".into(),
            });
        }
        let mut images = self.images.lock().unwrap();
        let img = images
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(ImageStoreError::NotFound { id })?;
        img.is_sent = true;
        img.send_count += 1;
        img.last_sent = Some(sent_at);
        Ok(img.clone())
    }

    fn reset_all_sent_flags(&self) -> snapdrift_images::Result<usize> {
        let mut images = self.images.lock().unwrap();
        let mut n = 0;
        for img in images.iter_mut().filter(|i| i.is_active && i.is_sent) {
            img.is_sent = false;
            n += 1;
        }
        Ok(n)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub image_id: i64,
    pub filename: String,
    pub description: String,
}

#[derive(Default)]
pub struct RecordingDeliveryClient {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
    counter: AtomicU32,
}

impl RecordingDeliveryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryClient for RecordingDeliveryClient {
    async fn send(
        &self,
        recipient: &str,
        media: &MediaRef,
        description: &str,
    ) -> snapdrift_delivery::Result<DeliveryReceipt> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Provider {
                code: None,
                message: "injected delivery failure".into(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            image_id: media.image_id,
            filename: media.filename.clone(),
            description: description.to_string(),
        });
        Ok(DeliveryReceipt {
            provider_id: format!("msg-{n}"),
        })
    }
}
