use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::psp::sama::{CurrencyUnit, SamaSettings};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub sama: SamaSettings,
    /// Request timeout; the HTTP client default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.sama.validate().context("invalid sama settings")?;
        if self.timeout_secs == Some(0) {
            anyhow::bail!("timeout_secs must be greater than 0");
        }
        Ok(())
    }

    /// Overlays `SAMA_*` variables on top of the file settings.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SAMA_CURRENCY") {
            self.sama.currency = CurrencyUnit::from(v);
        }
        if let Some(v) = lookup("SAMA_CALLBACK_URL") {
            self.sama.callback_url = v;
        }
        if let Some(v) = lookup("SAMA_API_PURCHASE_URL") {
            self.sama.api_purchase_url = v;
        }
        if let Some(v) = lookup("SAMA_API_VERIFICATION_URL") {
            self.sama.api_verification_url = v;
        }
        if let Some(v) = lookup("SAMA_AUTH_TOKEN") {
            self.sama.auth_token = v;
        }
        if let Some(v) = lookup("SAMA_MERCHANT_ID") {
            self.sama.merchant_id = v;
        }
        if let Some(v) = lookup("SAMA_TIMEOUT_SECS") {
            let secs = v
                .parse()
                .context("SAMA_TIMEOUT_SECS must be a valid number")?;
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sama-pay")
        .join("config.json")
}

/// Reads the config file, falling back to defaults when it does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// File settings with environment overrides applied.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let default_path = config_path();
    let mut config = load_config_from(path.unwrap_or(default_path.as_path()))?;
    config.apply_env(|key| std::env::var(key).ok())?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete() -> AppConfig {
        AppConfig {
            sama: SamaSettings {
                currency: CurrencyUnit::Toman,
                callback_url: "https://shop.example/callback".to_string(),
                api_purchase_url: "https://sama.example/purchase/".to_string(),
                api_verification_url: "https://sama.example/verify/".to_string(),
                auth_token: "token".to_string(),
                merchant_id: "merchant".to_string(),
            },
            timeout_secs: Some(30),
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn saved_config_is_read_back_with_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        save_config_to(&path, &complete()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"apiPurchaseUrl\""));
        assert!(raw.contains("\"currency\": \"T\""));

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, complete());
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("SAMA_CURRENCY", "R"),
            ("SAMA_AUTH_TOKEN", "from-env"),
            ("SAMA_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();

        let mut config = complete();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.sama.currency, CurrencyUnit::Rial);
        assert_eq!(config.sama.auth_token, "from-env");
        assert_eq!(config.sama.merchant_id, "merchant");
        assert_eq!(config.timeout_secs, Some(5));
    }

    #[test]
    fn invalid_timeout_env_is_an_error() {
        let mut config = complete();
        let result = config.apply_env(|key| (key == "SAMA_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn zero_timeout_fails_validation() {
        let mut config = complete();
        config.timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }
}
