use std::collections::BTreeMap;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "USD".to_string()
}

/// Situational context for one calculation. `timestamp` is the instant every time-based
/// check is evaluated against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingContext {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub region: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Carried through to callers; no conversion happens inside the engine.
    #[serde(default)]
    pub exchange_rate: Option<f64>,
}

impl PricingContext {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            channel: String::new(),
            region: String::new(),
            currency: default_currency(),
            timestamp,
            event: None,
            attributes: BTreeMap::new(),
            exchange_rate: None,
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn has_event(&self) -> bool {
        self.event.as_deref().map(|event| !event.trim().is_empty()).unwrap_or(false)
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

impl Default for PricingContext {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}
