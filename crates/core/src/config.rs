use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// How the matcher chooses between several candidates in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Stop at the first candidate in the order the bank feed yields them.
    #[default]
    FirstInFeedOrder,
    /// Scan the whole window and keep the candidate closest in time.
    NearestTimestamp,
}

/// Widest accepted match window: one week either side.
pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub window_minutes: i64,
    /// Merchant label the bank uses for the retailer.
    pub bank_descriptor: String,
    /// Category passed through to the bank feed; empty disables the filter.
    pub bank_category: String,
    pub partners: Vec<String>,
    pub retailer_utc_offset_minutes: i32,
    pub match_policy: MatchPolicy,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            window_minutes: 10,
            bank_descriptor: "Woolworths".to_string(),
            bank_category: "groceries".to_string(),
            partners: vec!["woolworths".to_string()],
            retailer_utc_offset_minutes: 600,
            match_policy: MatchPolicy::FirstInFeedOrder,
        }
    }
}

impl ReconcileConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ReconcileConfig = toml::from_str(toml_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_WINDOW_MINUTES).contains(&self.window_minutes) {
            return Err(ConfigError::Invalid(format!(
                "window_minutes must be between 0 and {MAX_WINDOW_MINUTES}, got {}",
                self.window_minutes
            )));
        }
        if self.retailer_offset().is_none() {
            return Err(ConfigError::Invalid(format!(
                "retailer_utc_offset_minutes out of range: {}",
                self.retailer_utc_offset_minutes
            )));
        }
        Ok(())
    }

    pub fn window(&self) -> Duration {
        Duration::minutes(self.window_minutes.clamp(0, MAX_WINDOW_MINUTES))
    }

    pub fn category(&self) -> Option<&str> {
        Some(self.bank_category.as_str()).filter(|c| !c.is_empty())
    }

    pub fn retailer_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.retailer_utc_offset_minutes.checked_mul(60)?)
    }

    pub fn reconciles_partner(&self, partner: &str) -> bool {
        self.partners.iter().any(|p| p.eq_ignore_ascii_case(partner))
    }
}
