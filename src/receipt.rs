use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Proof of payment produced by a successful verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    driver: String,
    reference_id: Option<String>,
    date: DateTime<Utc>,
    #[serde(default)]
    details: Map<String, Value>,
}

impl Receipt {
    pub fn new(driver: impl Into<String>, reference_id: Option<String>) -> Self {
        Self {
            driver: driver.into(),
            reference_id,
            date: Utc::now(),
            details: Map::new(),
        }
    }

    pub fn with_details<I>(mut self, details: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.details.extend(details);
        self
    }

    pub fn set_detail(&mut self, key: impl Into<String>, value: Value) {
        self.details.insert(key.into(), value);
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn reference_id(&self) -> Option<&str> {
        self.reference_id.as_deref()
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn details_accumulate() {
        let mut receipt = Receipt::new("sama", Some("R1".to_string()))
            .with_details([("isPaid".to_string(), json!(true))]);
        receipt.set_detail("fee", json!(100));

        assert_eq!(receipt.driver(), "sama");
        assert_eq!(receipt.reference_id(), Some("R1"));
        assert_eq!(receipt.detail("isPaid"), Some(&json!(true)));
        assert_eq!(receipt.detail("fee"), Some(&json!(100)));
        assert!(receipt.date() <= Utc::now());
    }

    #[test]
    fn serializes_with_flat_fields() {
        let receipt = Receipt::new("sama", None);
        let value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(value["driver"], "sama");
        assert!(value["reference_id"].is_null());
        assert!(value["details"].as_object().unwrap().is_empty());
    }
}
