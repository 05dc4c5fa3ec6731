use reckon_core::{FeedError, MoneyError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReceiptError {
    /// A row grouping none of the known continuation patterns covers. The
    /// whole receipt is rejected rather than trusted half-parsed.
    #[error("Unrecognized receipt pattern at row {index}: {description:?}")]
    UnrecognizedReceiptPattern { index: usize, description: String },
    #[error("Malformed {field}: {source}")]
    MalformedAmount {
        field: &'static str,
        #[source]
        source: MoneyError,
    },
    #[error("Receipt response has no {0} section")]
    MissingSection(&'static str),
    #[error("Failed to decode receipt response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Record {0} has no receipt")]
    NoReceipt(String),
    #[error("Receipt source error: {0}")]
    Source(#[from] FeedError),
}
