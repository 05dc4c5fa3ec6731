//! Decoding for the bank's JSON:API transaction pages.
//!
//! A page looks like `{"data": [resource, ...], "links": {"next": url|null}}`
//! where each resource is
//! `{"id", "attributes": {"description", "amount": {"value", ...}, "createdAt", ...}, "relationships": {...}}`.

use chrono::{DateTime, FixedOffset};
use reckon_core::{FeedError, FeedRecord, Money};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct MoneyObject {
    /// Signed, e.g. `-10.56`.
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attributes {
    description: String,
    amount: MoneyObject,
    created_at: Option<DateTime<FixedOffset>>,
    settled_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Deserialize)]
struct Links {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Vec<serde_json::Value>,
    links: Option<Links>,
}

#[derive(Debug, Clone)]
pub struct BankPage {
    pub records: Vec<FeedRecord>,
    /// Link to the following page, if the feed has more.
    pub next: Option<String>,
}

impl BankPage {
    pub fn from_json(text: &str) -> Result<Self, FeedError> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, FeedError> {
        let envelope: Envelope = serde_json::from_value(value)?;
        let records = envelope
            .data
            .into_iter()
            .map(bank_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BankPage {
            records,
            next: envelope.links.and_then(|l| l.next),
        })
    }
}

/// Decode one transaction resource. The amount is flipped so that money
/// spent is positive.
pub fn bank_record(resource: serde_json::Value) -> Result<FeedRecord, FeedError> {
    let id = resource
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FeedError::Record {
            id: "<missing>".to_string(),
            reason: "resource has no id".to_string(),
        })?
        .to_string();

    let attributes = resource.get("attributes").cloned().unwrap_or_default();
    let attributes: Attributes = serde_json::from_value(attributes).map_err(|e| FeedError::Record {
        id: id.clone(),
        reason: e.to_string(),
    })?;

    let timestamp = attributes
        .created_at
        .or(attributes.settled_at)
        .ok_or_else(|| FeedError::Record {
            id: id.clone(),
            reason: "no createdAt or settledAt".to_string(),
        })?;

    let value = Money::parse(&attributes.amount.value).map_err(|e| FeedError::Record {
        id: id.clone(),
        reason: e.to_string(),
    })?;

    Ok(FeedRecord::new(&id, timestamp, -value, &attributes.description).with_raw(resource))
}
