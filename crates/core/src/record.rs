use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use super::money::Money;

/// One entry from either feed, decoded from a single page item.
///
/// For bank records `amount` is spend-positive: money leaving the account is
/// a positive amount, refunds are negative. Retailer records carry the value
/// the retailer reports and, when the partner issues e-receipts, the key used
/// to fetch one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub amount: Money,
    pub descriptor: String,
    pub receipt_key: Option<String>,
    /// The untouched page entry this record was decoded from.
    pub raw: serde_json::Value,
}

impl FeedRecord {
    pub fn new(id: &str, timestamp: DateTime<FixedOffset>, amount: Money, descriptor: &str) -> Self {
        FeedRecord {
            id: id.to_string(),
            timestamp,
            amount,
            descriptor: descriptor.to_string(),
            receipt_key: None,
            raw: serde_json::Value::Null,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn with_receipt_key(mut self, key: Option<String>) -> Self {
        self.receipt_key = key.filter(|k| !k.is_empty());
        self
    }

    /// A copy of this record carrying a different amount, e.g. the amount
    /// actually paid once the receipt is known.
    pub fn with_amount(&self, amount: Money) -> Self {
        FeedRecord {
            amount,
            ..self.clone()
        }
    }

    /// Category id from a JSON:API `relationships.category` link, if any.
    pub fn category(&self) -> Option<&str> {
        self.raw
            .pointer("/relationships/category/data/id")
            .and_then(|v| v.as_str())
    }

    /// Absolute distance between the two records' instants, in seconds.
    pub fn seconds_apart(&self, other: &FeedRecord) -> i64 {
        (self.timestamp - other.timestamp).num_seconds().abs()
    }
}
