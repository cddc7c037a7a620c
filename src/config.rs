use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

fn default_poll_interval_ms() -> u64 {
    100
}

/// Which elements feed the total, and how often form controls are polled.
///
/// Deserializes from the same camelCase shape the widget is mounted with:
///
/// ```json
/// { "priceSelector": "#price", "quantitySelector": "#qty", "pollIntervalMs": 100 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchConfig {
    #[serde(default)]
    pub price_selector: Option<String>,
    #[serde(default)]
    pub quantity_selector: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            price_selector: None,
            quantity_selector: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl WatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| Error::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_price_selector(mut self, selector: impl Into<String>) -> Self {
        self.price_selector = Some(selector.into());
        self
    }

    pub fn with_quantity_selector(mut self, selector: impl Into<String>) -> Self {
        self.quantity_selector = Some(selector.into());
        self
    }

    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Price selector, with an empty string read as absent.
    pub fn price(&self) -> Option<&str> {
        self.price_selector.as_deref().filter(|s| !s.is_empty())
    }

    /// Quantity selector, with an empty string read as absent.
    pub fn quantity(&self) -> Option<&str> {
        self.quantity_selector.as_deref().filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "pollIntervalMs must be at least 1".into(),
            ));
        }
        for (field, selector) in [
            ("priceSelector", &self.price_selector),
            ("quantitySelector", &self.quantity_selector),
        ] {
            if let Some(selector) = selector
                && !selector.is_empty()
                && selector.trim().is_empty()
            {
                return Err(Error::InvalidConfig(format!("{field} is blank")));
            }
        }
        Ok(())
    }
}
