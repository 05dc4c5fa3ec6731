use chrono::NaiveDateTime;
use reckon_core::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ReceiptError;

/// One row of receipt text as the retailer returns it. Any fields beyond
/// description and amount are kept untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLine {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Empty on rows that only carry a description.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub amount: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RawLine {
    pub fn new(description: &str, amount: &str) -> Self {
        Self {
            description: description.to_string(),
            amount: amount.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn has_amount(&self) -> bool {
        !self.amount.trim().is_empty()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A receipt response split into the sections the parser cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReceipt {
    /// Ordered exactly as printed.
    pub items: Vec<RawLine>,
    pub payments: Vec<RawLine>,
    pub total: String,
    pub footer: Option<String>,
}

#[derive(Deserialize)]
struct ReceiptResponse {
    #[serde(rename = "receiptDetails")]
    receipt_details: ReceiptDetails,
}

#[derive(Deserialize)]
struct ReceiptDetails {
    details: Vec<DetailSection>,
}

#[derive(Deserialize)]
#[serde(tag = "__typename")]
enum DetailSection {
    ReceiptDetailsItems {
        items: Vec<RawLine>,
    },
    ReceiptDetailsPayments {
        payments: Vec<RawLine>,
    },
    ReceiptDetailsTotal {
        total: String,
    },
    ReceiptDetailsFooter {
        #[serde(rename = "transactionDetails", default)]
        transaction_details: Option<String>,
    },
    #[serde(other)]
    Other,
}

impl RawReceipt {
    /// Decode the `data` object of a receipt-details response:
    /// `{"receiptDetails": {"details": [{"__typename": ...}, ...]}}`.
    pub fn from_response(response: serde_json::Value) -> Result<Self, ReceiptError> {
        let response: ReceiptResponse = serde_json::from_value(response)?;

        let mut items = None;
        let mut payments = Vec::new();
        let mut total = None;
        let mut footer = None;
        for section in response.receipt_details.details {
            match section {
                DetailSection::ReceiptDetailsItems { items: rows } => items = Some(rows),
                DetailSection::ReceiptDetailsPayments { payments: rows } => payments = rows,
                DetailSection::ReceiptDetailsTotal { total: text } => total = Some(text),
                DetailSection::ReceiptDetailsFooter { transaction_details } => {
                    footer = transaction_details
                }
                DetailSection::Other => {}
            }
        }

        Ok(RawReceipt {
            items: items.ok_or(ReceiptError::MissingSection("ReceiptDetailsItems"))?,
            payments,
            total: total.ok_or(ReceiptError::MissingSection("ReceiptDetailsTotal"))?,
            footer,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ReceiptError> {
        Self::from_response(serde_json::from_str(text)?)
    }
}

/// How much of a product was bought. A count and a weight never coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseMeasure {
    Count(u32),
    /// Kilograms.
    Weight(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub description: String,
    /// What was paid for the line, after any same-group discount. Always > 0.
    pub amount: Money,
    pub measure: PurchaseMeasure,
}

impl PurchaseItem {
    pub fn single(description: &str, amount: Money) -> Self {
        Self {
            description: description.to_string(),
            amount,
            measure: PurchaseMeasure::Count(1),
        }
    }

    pub fn quantity(&self) -> Option<u32> {
        match self.measure {
            PurchaseMeasure::Count(n) => Some(n),
            PurchaseMeasure::Weight(_) => None,
        }
    }

    pub fn weight(&self) -> Option<Decimal> {
        match self.measure {
            PurchaseMeasure::Count(_) => None,
            PurchaseMeasure::Weight(kg) => Some(kg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PaymentMethod {
    /// Masked card, e.g. `X-1234`.
    Card { suffix: String },
    Eft,
    Unknown,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Card { suffix } => write!(f, "X-{suffix}"),
            PaymentMethod::Eft => write!(f, "EFT"),
            PaymentMethod::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowSection {
    Items,
    Payments,
}

/// Conditions that degrade a receipt without rejecting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ReceiptWarning {
    /// No card or EFT payment row; `amount_paid` fell back to the declared total.
    UnknownPaymentMethod,
    MalformedRow {
        section: RowSection,
        index: usize,
        text: String,
    },
    /// A row or group that resolved to zero or less and was not emitted.
    NonPositiveAmount { index: usize, amount: Money },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReceipt {
    pub items: Vec<PurchaseItem>,
    /// The receipt's own stated total.
    pub declared_total: Money,
    /// Charged to card/EFT; differs from `declared_total` when gift cards or
    /// checkout discounts apply.
    pub amount_paid: Money,
    pub paid_with: PaymentMethod,
    /// Local time printed in the footer, when present.
    pub transaction_time: Option<NaiveDateTime>,
    pub warnings: Vec<ReceiptWarning>,
}

impl ParsedReceipt {
    pub fn has_unknown_payment(&self) -> bool {
        self.warnings.contains(&ReceiptWarning::UnknownPaymentMethod)
    }
}
