//! Desk configuration — business identity and messaging defaults.
//!
//! Loaded from `<data_dir>/desk.json`. In tests, use `DeskConfig::default_test()`.

use crate::{client::DEFAULT_CURRENCY, types::ClientId};
use serde::{Deserialize, Serialize};

/// Who the reminders come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContact {
    pub name:  String,
    pub title: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub contact:           BusinessContact,
    /// Client account pages live at `<account_url_base>/<client id>`.
    pub account_url_base:  String,
    /// Prefix for phone numbers entered without a country code.
    pub default_dial_code: String,
    pub default_currency:  String,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            contact: BusinessContact {
                name:  "Studio Owner".into(),
                title: "Web Consultant".into(),
                phone: "+440000000000".into(),
                email: "hello@example.com".into(),
            },
            account_url_base:  "https://example.com/client".into(),
            default_dial_code: "+44".into(),
            default_currency:  DEFAULT_CURRENCY.into(),
        }
    }
}

impl DeskConfig {
    /// Load from the data/ directory.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/desk.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: DeskConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        if config.account_url_base.trim().is_empty() {
            anyhow::bail!("{path}: account_url_base must not be empty");
        }
        Ok(config)
    }

    /// Config with hardcoded values for use in tests.
    pub fn default_test() -> Self {
        Self {
            contact: BusinessContact {
                name:  "Ada Example".into(),
                title: "IT Consultant".into(),
                phone: "+447700900123".into(),
                email: "ada@example.test".into(),
            },
            account_url_base:  "https://desk.example.test/client".into(),
            default_dial_code: "+44".into(),
            default_currency:  DEFAULT_CURRENCY.into(),
        }
    }

    pub fn account_url(&self, client_id: ClientId) -> String {
        format!("{}/{client_id}", self.account_url_base.trim_end_matches('/'))
    }
}
