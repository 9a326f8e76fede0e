use thiserror::Error;

/// Result type shared by every driver operation
pub type Result<T> = std::result::Result<T, DriverError>;

#[derive(Error, Debug)]
pub enum DriverError {
    /// The provider refused to open a transaction
    #[error("Purchase failed: {detail}")]
    PurchaseFailed { detail: String },

    /// The provider did not confirm the payment
    #[error("Invalid payment: {message} (code {code})")]
    InvalidPayment { message: String, code: i64 },

    #[error("Provider response is missing field `{0}`")]
    MissingField(&'static str),

    #[error("Amount {0} cannot be converted to the provider currency")]
    InvalidAmount(i64),

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DriverError {
    /// Provider status code carried by a failed verification
    pub fn code(&self) -> Option<i64> {
        match self {
            DriverError::InvalidPayment { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Human-readable message as reported by the provider, without prefix
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            DriverError::PurchaseFailed { detail } => Some(detail),
            DriverError::InvalidPayment { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_payment_exposes_code_and_message() {
        let err = DriverError::InvalidPayment {
            message: "failed".to_string(),
            code: 40002,
        };
        assert_eq!(err.code(), Some(40002));
        assert_eq!(err.provider_message(), Some("failed"));
        assert_eq!(err.to_string(), "Invalid payment: failed (code 40002)");
    }

    #[test]
    fn other_errors_have_no_code() {
        let err = DriverError::MissingField("token");
        assert_eq!(err.code(), None);
        assert_eq!(err.provider_message(), None);
    }
}
