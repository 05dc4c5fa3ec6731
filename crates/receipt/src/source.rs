use std::collections::HashMap;

use reckon_core::FeedError;

use crate::types::RawReceipt;

/// Where receipt responses come from. The retailer feed client implements
/// this over its transport; the parser never sees credentials or sessions.
pub trait ReceiptSource: Send + Sync {
    fn fetch_receipt(&self, receipt_key: &str) -> Result<RawReceipt, FeedError>;
}

// ── Static source (tests and offline runs) ────────────────────────────────────

/// Serves receipts from a fixed map of receipt key to response.
#[derive(Debug, Default, Clone)]
pub struct StaticReceiptSource {
    receipts: HashMap<String, RawReceipt>,
}

impl StaticReceiptSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_receipt(mut self, receipt_key: &str, receipt: RawReceipt) -> Self {
        self.receipts.insert(receipt_key.to_string(), receipt);
        self
    }

    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

impl ReceiptSource for StaticReceiptSource {
    fn fetch_receipt(&self, receipt_key: &str) -> Result<RawReceipt, FeedError> {
        self.receipts
            .get(receipt_key)
            .cloned()
            .ok_or_else(|| FeedError::UnknownReceipt(receipt_key.to_string()))
    }
}
