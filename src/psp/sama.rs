//! Sama payment gateway driver
//!
//! Opens a guaranteed-deposit transaction, sends the payer to Sama's hosted
//! payment page and verifies the outcome.

use super::Driver;
use crate::error::{DriverError, Result};
use crate::invoice::Invoice;
use crate::receipt::Receipt;
use crate::redirect::{HttpMethod, RedirectionForm};
use crate::transport::{HttpTransport, ReqwestTransport};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DRIVER_NAME: &str = "sama";

/// Statuses Sama uses for an accepted call.
const ACCEPTED_STATUSES: [u16; 2] = [200, 201];

const VERIFY_ERRORS: &[(i64, &str)] = &[
    (40001, "شماره فروشنده پیدا نشد"),
    (40002, "شماره خریدار پیدا نشد"),
    (40003, "آدرس url توکن یبعانه معتبر نیست"),
];

const VERIFY_FALLBACK: &str = "تراکنش با خطا مواجه شد.";

/// Unit the invoice amounts are expressed in. Sama always expects Rial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CurrencyUnit {
    Toman,
    Rial,
}

impl CurrencyUnit {
    pub fn to_rial(self, amount: i64) -> Result<i64> {
        match self {
            CurrencyUnit::Toman => amount
                .checked_mul(10)
                .ok_or(DriverError::InvalidAmount(amount)),
            CurrencyUnit::Rial => Ok(amount),
        }
    }
}

impl From<String> for CurrencyUnit {
    fn from(code: String) -> Self {
        if code == "T" {
            CurrencyUnit::Toman
        } else {
            CurrencyUnit::Rial
        }
    }
}

impl From<CurrencyUnit> for String {
    fn from(unit: CurrencyUnit) -> Self {
        match unit {
            CurrencyUnit::Toman => "T".to_string(),
            CurrencyUnit::Rial => "R".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SamaSettings {
    pub currency: CurrencyUnit,
    pub callback_url: String,
    pub api_purchase_url: String,
    pub api_verification_url: String,
    pub auth_token: String,
    pub merchant_id: String,
}

impl Default for SamaSettings {
    fn default() -> Self {
        Self {
            currency: CurrencyUnit::Toman,
            callback_url: String::new(),
            api_purchase_url: String::new(),
            api_verification_url: String::new(),
            auth_token: String::new(),
            merchant_id: String::new(),
        }
    }
}

impl SamaSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("callbackUrl", &self.callback_url),
            ("apiPurchaseUrl", &self.api_purchase_url),
            ("apiVerificationUrl", &self.api_verification_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(DriverError::Configuration(format!(
                    "{name} must be an http(s) URL, got {url:?}"
                )));
            }
        }

        if self.auth_token.trim().is_empty() {
            return Err(DriverError::Configuration("authToken cannot be empty".to_string()));
        }

        if self.merchant_id.trim().is_empty() {
            return Err(DriverError::Configuration("merchantId cannot be empty".to_string()));
        }

        Ok(())
    }
}

pub struct SamaDriver {
    invoice: Invoice,
    settings: SamaSettings,
    client: Arc<dyn HttpTransport>,
}

#[derive(Serialize)]
struct PurchaseRequest<'a> {
    price: i64,
    callback_url: &'a str,
    buyer_phone: Option<&'a str>,
    client_id: &'a str,
}

#[derive(Deserialize)]
struct PurchaseResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    token: Option<String>,
}

#[derive(Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifyResponse {
    #[serde(default, deserialize_with = "truthy")]
    is_paid: bool,
    #[serde(default)]
    fee: Option<Value>,
    #[serde(default)]
    payment: Option<VerifiedPayment>,
    #[serde(default, rename = "paymentReqId", deserialize_with = "lenient_string")]
    payment_req_id: Option<String>,
    #[serde(default, rename = "paymentId", deserialize_with = "lenient_string")]
    payment_id: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct VerifiedPayment {
    #[serde(default, deserialize_with = "lenient_string")]
    reference_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    transaction_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    request_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SamaReceiptDetails {
    is_paid: bool,
    fee: Option<Value>,
    transaction_code: Option<String>,
    request_id: Option<String>,
    payment_req_id: Option<String>,
    payment_id: Option<String>,
}

impl SamaDriver {
    pub fn new(invoice: Invoice, settings: SamaSettings) -> Self {
        Self::with_transport(invoice, settings, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(
        invoice: Invoice,
        settings: SamaSettings,
        client: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            invoice,
            settings,
            client,
        }
    }

    pub fn into_invoice(self) -> Invoice {
        self.invoice
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Api-Key {}", self.settings.auth_token)),
            ("Accept", "application/json".to_string()),
        ]
    }

    fn create_receipt(&self, outcome: VerifyResponse) -> Result<Receipt> {
        let payment = outcome.payment.unwrap_or_default();
        let details = SamaReceiptDetails {
            is_paid: outcome.is_paid,
            fee: outcome.fee,
            transaction_code: payment.transaction_code,
            request_id: payment.request_id,
            payment_req_id: outcome.payment_req_id,
            payment_id: outcome.payment_id,
        };

        let details = match serde_json::to_value(details)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        Ok(Receipt::new(DRIVER_NAME, payment.reference_number).with_details(details))
    }
}

#[async_trait]
impl Driver for SamaDriver {
    fn name(&self) -> &str {
        DRIVER_NAME
    }

    fn invoice(&self) -> &Invoice {
        &self.invoice
    }

    async fn purchase(&mut self) -> Result<String> {
        let payload = serde_json::to_value(PurchaseRequest {
            price: self.settings.currency.to_rial(self.invoice.amount())?,
            callback_url: &self.settings.callback_url,
            buyer_phone: self.invoice.non_empty_detail("mobile"),
            client_id: self.invoice.uuid(),
        })?;

        info!(
            "Initiating Sama purchase: client_id={}, amount={}",
            self.invoice.uuid(),
            self.invoice.amount()
        );
        debug!("Sama purchase payload: {}", payload);

        let resp = self
            .client
            .post_json(&self.settings.api_purchase_url, &self.headers(), &payload)
            .await?;

        if !ACCEPTED_STATUSES.contains(&resp.status) {
            let failure: ErrorResponse = serde_json::from_str(&resp.body).unwrap_or_default();
            let detail = detail_text(failure.detail);
            warn!("Sama purchase rejected: status={}, detail={}", resp.status, detail);
            return Err(DriverError::PurchaseFailed { detail });
        }

        let created: PurchaseResponse = serde_json::from_str(&resp.body)?;
        let token = created.token.ok_or(DriverError::MissingField("token"))?;
        self.invoice.set_transaction_id(token.clone());

        info!("Sama purchase created: transaction_id={}", token);

        Ok(token)
    }

    fn pay(&self) -> RedirectionForm {
        let link = self.invoice.detail("payment_link").unwrap_or_default();
        let transaction_id = self.invoice.transaction_id().unwrap_or_default();

        if link.is_empty() || transaction_id.is_empty() {
            warn!(
                "Building Sama redirect with missing parts: payment_link={:?}, transaction_id={:?}",
                link, transaction_id
            );
        }

        RedirectionForm::new(
            format!("{link}{transaction_id}"),
            BTreeMap::new(),
            HttpMethod::Get,
        )
    }

    async fn verify(&self) -> Result<Receipt> {
        // Sama resolves the pending payment from the merchant id alone.
        let payload = serde_json::json!({ "api": self.settings.merchant_id });

        info!("Verifying Sama payment: client_id={}", self.invoice.uuid());

        let resp = self
            .client
            .post_json(&self.settings.api_verification_url, &self.headers(), &payload)
            .await?;

        let accepted = ACCEPTED_STATUSES.contains(&resp.status);
        let outcome: VerifyResponse = match serde_json::from_str(&resp.body) {
            Ok(outcome) => outcome,
            Err(_) if !accepted => VerifyResponse::default(),
            Err(e) => return Err(e.into()),
        };

        if !accepted && !outcome.is_paid {
            let code = detail_code(outcome.detail.as_ref());
            warn!("Sama verification failed: status={}, code={}", resp.status, code);
            return Err(not_verified(code));
        }

        if !outcome.is_paid {
            warn!("Sama verification accepted but payment is not marked paid");
        }

        let receipt = self.create_receipt(outcome)?;
        info!(
            "Sama payment verified: reference_id={:?}",
            receipt.reference_id()
        );

        Ok(receipt)
    }
}

/// Localized message for a verification failure code.
pub fn verify_error_message(code: i64) -> &'static str {
    VERIFY_ERRORS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, message)| *message)
        .unwrap_or(VERIFY_FALLBACK)
}

fn not_verified(code: i64) -> DriverError {
    DriverError::InvalidPayment {
        message: verify_error_message(code).to_string(),
        code,
    }
}

fn detail_text(detail: Option<Value>) -> String {
    match detail {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn detail_code(detail: Option<&Value>) -> i64 {
    match detail {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !(s.is_empty() || s == "0"),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}
