//! Decoding for the retailer's rewards activity feed.
//!
//! Entries carry no reliable timestamp field, so one is recovered from the
//! entry id where possible and otherwise from the short display date.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime};
use reckon_core::{FeedError, FeedRecord, Money};
use serde::Deserialize;

const UNKNOWN_PARTNER: &str = "unknown_partner";

// e.g. `S3060W084SN2594T1667017441`: store, register, unix seconds
re!(re_stamped_id, r"^S\d{4}W\d{3}SN\d{4}T\d{10}");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityTransaction {
    origin: String,
    amount_as_dollars: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityReceipt {
    receipt_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityItem {
    id: String,
    display_date: Option<String>,
    transaction: Option<ActivityTransaction>,
    receipt: Option<ActivityReceipt>,
}

#[derive(Debug, Deserialize)]
struct ActivityGroup {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityList {
    #[serde(default)]
    groups: Vec<ActivityGroup>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActivityFeed {
    list: ActivityList,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(rename = "rtlRewardsActivityFeed")]
    feed: ActivityFeed,
}

#[derive(Debug, Clone)]
pub struct RetailerPage {
    pub records: Vec<FeedRecord>,
    pub next_page_token: Option<String>,
}

/// Turns activity-feed pages into [`FeedRecord`]s.
///
/// `offset` is the retailer's local time zone; `now` anchors the year of
/// entries that only carry a day and month.
#[derive(Debug, Clone, Copy)]
pub struct RetailerDecoder {
    offset: FixedOffset,
    now: DateTime<FixedOffset>,
}

impl RetailerDecoder {
    pub fn new(offset: FixedOffset, now: DateTime<FixedOffset>) -> Self {
        Self { offset, now }
    }

    pub fn decode_page(&self, value: serde_json::Value) -> Result<RetailerPage, FeedError> {
        let response: FeedResponse = serde_json::from_value(value)?;
        let mut records = Vec::new();
        for group in response.feed.list.groups {
            for item in group.items {
                if let Some(record) = self.decode_entry(item)? {
                    records.push(record);
                }
            }
        }
        Ok(RetailerPage {
            records,
            next_page_token: response.feed.list.next_page_token,
        })
    }

    /// `Ok(None)` for feed entries that are not purchases, such as points
    /// adjustments with no transaction attached.
    pub fn decode_entry(&self, raw: serde_json::Value) -> Result<Option<FeedRecord>, FeedError> {
        let entry: ActivityItem = serde_json::from_value(raw.clone()).map_err(|e| FeedError::Record {
            id: raw
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or("<missing>")
                .to_string(),
            reason: e.to_string(),
        })?;

        let Some(transaction) = entry.transaction else {
            tracing::debug!(id = %entry.id, "skipping activity entry without a transaction");
            return Ok(None);
        };

        let timestamp = self
            .entry_timestamp(&entry.id, entry.display_date.as_deref())
            .ok_or_else(|| FeedError::Record {
                id: entry.id.clone(),
                reason: "cannot determine transaction time".to_string(),
            })?;

        let amount = Money::parse(&transaction.amount_as_dollars).map_err(|e| FeedError::Record {
            id: entry.id.clone(),
            reason: e.to_string(),
        })?;

        let receipt_key = entry.receipt.and_then(|r| r.receipt_id);

        Ok(Some(
            FeedRecord::new(&entry.id, timestamp, amount, &transaction.origin)
                .with_receipt_key(receipt_key)
                .with_raw(raw),
        ))
    }

    /// Rough purchase time. May sit several minutes away from the card
    /// terminal's time.
    fn entry_timestamp(&self, id: &str, display_date: Option<&str>) -> Option<DateTime<FixedOffset>> {
        if re_stamped_id().is_match(id) {
            let secs: i64 = id.get(id.len() - 10..)?.parse().ok()?;
            return Some(DateTime::from_timestamp(secs, 0)?.with_timezone(&self.offset));
        }
        if let Some(stamp) = id.get(..20).filter(|s| s.bytes().all(|b| b.is_ascii_digit())) {
            return basket_time(stamp)?.and_local_timezone(self.offset).single();
        }
        let date = self.display_date(display_date?)?;
        date.and_hms_opt(0, 0, 0)?.and_local_timezone(self.offset).single()
    }

    /// `Tue 16 Feb` resolved to the latest such date not after `now`.
    fn display_date(&self, display: &str) -> Option<NaiveDate> {
        let parts: Vec<&str> = display.split_whitespace().collect();
        let [.., day, month] = parts.as_slice() else {
            return None;
        };
        let today = self.now.with_timezone(&self.offset).date_naive();
        // Four years back always reaches a 29 Feb.
        (today.year() - 4..=today.year())
            .rev()
            .filter_map(|year| NaiveDate::parse_from_str(&format!("{day} {month} {year}"), "%d %b %Y").ok())
            .find(|date| *date <= today)
    }
}

/// `YYYYMMDDhhmmss` followed by six digits of microseconds.
fn basket_time(stamp: &str) -> Option<NaiveDateTime> {
    let num = |from: usize, to: usize| stamp.get(from..to)?.parse::<u32>().ok();
    let date = NaiveDate::from_ymd_opt(i32::try_from(num(0, 4)?).ok()?, num(4, 6)?, num(6, 8)?)?;
    date.and_hms_micro_opt(num(8, 10)?, num(10, 12)?, num(12, 14)?, num(14, 20)?)
}

/// Which partner brand a raw activity entry belongs to, e.g. `woolworths`,
/// `bws`, `bigw`.
pub fn partner(raw: &serde_json::Value) -> Option<String> {
    let icon = raw.get("icon")?.as_str()?;
    if icon != UNKNOWN_PARTNER {
        return Some(icon.to_string());
    }
    // e.g. `.../supermarkets_division_logo.png`
    let basename = raw.get("iconUrl")?.as_str()?.rsplit('/').next()?;
    let stem = basename.split("_logo.png").next()?;
    let partner = stem.split("_division").next()?;
    if partner == "supermarkets" {
        Some("woolworths".to_string())
    } else {
        Some(partner.to_string())
    }
}
