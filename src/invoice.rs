use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A payment request owned by the caller.
///
/// Drivers read the amount, uuid and details, and record the provider's
/// transaction id once a purchase succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    uuid: String,
    amount: i64,
    #[serde(default)]
    transaction_id: Option<String>,
    #[serde(default)]
    driver: Option<String>,
    #[serde(default)]
    details: HashMap<String, String>,
}

impl Invoice {
    pub fn new(amount: i64) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            amount,
            transaction_id: None,
            driver: None,
            details: HashMap::new(),
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_details<I, K, V>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.details
            .extend(details.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Name of the driver this invoice should be paid through
    pub fn via(mut self, driver: impl Into<String>) -> Self {
        self.driver = Some(driver.into());
        self
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref()
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    /// Like [`Invoice::detail`], but treats an empty value as absent.
    pub fn non_empty_detail(&self, key: &str) -> Option<&str> {
        self.detail(key).filter(|v| !v.is_empty())
    }

    pub fn details(&self) -> &HashMap<String, String> {
        &self.details
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn set_transaction_id(&mut self, id: impl Into<String>) {
        self.transaction_id = Some(id.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_invoice_gets_unique_uuid() {
        let a = Invoice::new(1000);
        let b = Invoice::new(1000);
        assert_ne!(a.uuid(), b.uuid());
        assert!(uuid::Uuid::parse_str(a.uuid()).is_ok());
        assert_eq!(a.transaction_id(), None);
    }

    #[test]
    fn empty_detail_is_absent_only_for_non_empty_lookup() {
        let invoice = Invoice::new(10)
            .with_detail("mobile", "")
            .with_details([("payment_link", "https://pay.example/")]);

        assert_eq!(invoice.detail("mobile"), Some(""));
        assert_eq!(invoice.non_empty_detail("mobile"), None);
        assert_eq!(
            invoice.non_empty_detail("payment_link"),
            Some("https://pay.example/")
        );
        assert_eq!(invoice.detail("missing"), None);
    }

    #[test]
    fn transaction_id_is_recorded() {
        let mut invoice = Invoice::new(10).with_uuid("order-1").via("sama");
        invoice.set_transaction_id("abc");
        assert_eq!(invoice.transaction_id(), Some("abc"));
        assert_eq!(invoice.uuid(), "order-1");
        assert_eq!(invoice.driver(), Some("sama"));
    }
}
