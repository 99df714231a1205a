use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Network-level failure before a provider response was received.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider accepted the request but rejected the message.
    #[error("Provider error (code {code:?}): {message}")]
    Provider { code: Option<u32>, message: String },

    /// A 2xx response whose body did not contain what we need.
    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl DeliveryError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Twilio error codes for bad credentials or unusable phone numbers are
    /// permanent; everything else (timeouts, 5xx, rate limits) is worth
    /// another attempt.
    pub fn is_retryable(&self) -> bool {
        // Permanent Twilio failures: 20003 auth, 2121x/2160x bad numbers.
        const NON_RETRYABLE: [u32; 5] = [20003, 21211, 21212, 21606, 21614];
        match self {
            DeliveryError::Provider {
                code: Some(code), ..
            } => !NON_RETRYABLE.contains(code),
            _ => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
