pub mod mock;
pub mod sama;

use crate::config::AppConfig;
use crate::error::{DriverError, Result};
use crate::invoice::Invoice;
use crate::receipt::Receipt;
use crate::redirect::RedirectionForm;
use crate::transport::{HttpTransport, ReqwestTransport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Provider-specific adapter implementing purchase, pay and verify
/// against one gateway's API.
#[async_trait]
pub trait Driver: Send + Sync {
    fn name(&self) -> &str;

    fn invoice(&self) -> &Invoice;

    /// Opens a transaction with the provider and returns its id. The id is
    /// also recorded on the invoice.
    async fn purchase(&mut self) -> Result<String>;

    /// Redirect instruction for the payer's browser. Performs no I/O.
    fn pay(&self) -> RedirectionForm;

    async fn verify(&self) -> Result<Receipt>;
}

pub fn build_transport(config: &AppConfig) -> Result<Arc<dyn HttpTransport>> {
    let transport = match config.timeout_secs {
        Some(secs) => ReqwestTransport::with_timeout(Duration::from_secs(secs))?,
        None => ReqwestTransport::new(),
    };
    Ok(Arc::new(transport))
}

pub fn build_driver(
    name: &str,
    invoice: Invoice,
    config: &AppConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Box<dyn Driver>> {
    match name {
        sama::DRIVER_NAME => Ok(Box::new(sama::SamaDriver::with_transport(
            invoice,
            config.sama.clone(),
            transport,
        ))),
        other => Err(DriverError::UnknownDriver(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psp::mock::MockTransport;

    #[test]
    fn builds_known_driver_by_name() {
        let config = AppConfig::default();
        let driver = build_driver("sama", Invoice::new(10), &config, Arc::new(MockTransport::new())).unwrap();
        assert_eq!(driver.name(), "sama");
        assert_eq!(driver.invoice().amount(), 10);
    }

    #[test]
    fn unknown_driver_is_rejected() {
        let config = AppConfig::default();
        let err = build_driver("zarinpal", Invoice::new(10), &config, Arc::new(MockTransport::new()))
            .err()
            .unwrap();
        assert!(matches!(err, DriverError::UnknownDriver(name) if name == "zarinpal"));
    }

    #[test]
    fn transport_honours_timeout() {
        let config = AppConfig {
            timeout_secs: Some(5),
            ..AppConfig::default()
        };
        assert!(build_transport(&config).is_ok());
    }
}
