use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use reckon_core::FeedRecord;

use crate::assembler::parse_receipt;
use crate::error::ReceiptError;
use crate::source::ReceiptSource;
use crate::types::ParsedReceipt;

type Slot = Arc<Mutex<Option<Arc<ParsedReceipt>>>>;

/// Resolves and memoizes parsed receipts per feed record.
///
/// Each record id gets its own slot lock, so concurrent callers asking for
/// the same record wait for a single fetch-and-parse while other records
/// proceed. Failures are not cached; the next call retries.
pub struct ReceiptCache<S: ReceiptSource> {
    source: S,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<S: ReceiptSource> ReceiptCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, record: &FeedRecord) -> Result<Arc<ParsedReceipt>, ReceiptError> {
        let receipt_key = record
            .receipt_key
            .as_deref()
            .ok_or_else(|| ReceiptError::NoReceipt(record.id.clone()))?;

        let slot = self.slot(&record.id);
        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parsed) = cached.as_ref() {
            return Ok(Arc::clone(parsed));
        }

        tracing::debug!(record = %record.id, "fetching receipt");
        let result = self
            .source
            .fetch_receipt(receipt_key)
            .map_err(ReceiptError::from)
            .and_then(|raw| parse_receipt(&raw));
        match result {
            Ok(parsed) => {
                let parsed = Arc::new(parsed);
                *cached = Some(Arc::clone(&parsed));
                Ok(parsed)
            }
            Err(e) => {
                drop(cached);
                self.release(&record.id, &slot);
                Err(e)
            }
        }
    }

    /// The parsed receipt for `record_id`, if one has been resolved.
    pub fn cached(&self, record_id: &str) -> Option<Arc<ParsedReceipt>> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(record_id)
            .map(Arc::clone)?;
        let cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        cached.as_ref().map(Arc::clone)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Number of records currently holding a slot.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop an unfilled slot so failed lookups don't accumulate. A slot
    /// another caller is still filling is left alone.
    fn release(&self, record_id: &str, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let unfilled = matches!(slot.try_lock(), Ok(guard) if guard.is_none());
        if unfilled && slots.get(record_id).is_some_and(|s| Arc::ptr_eq(s, slot)) {
            slots.remove(record_id);
        }
    }

    fn slot(&self, record_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(record_id.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RawLine, RawReceipt};
    use chrono::DateTime;
    use reckon_core::{FeedError, Money};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        receipt: RawReceipt,
    }

    impl CountingSource {
        fn new(receipt: RawReceipt) -> Self {
            Self { calls: AtomicUsize::new(0), receipt }
        }
    }

    impl ReceiptSource for CountingSource {
        fn fetch_receipt(&self, _receipt_key: &str) -> Result<RawReceipt, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.receipt.clone())
        }
    }

    struct FailingSource;

    impl ReceiptSource for FailingSource {
        fn fetch_receipt(&self, receipt_key: &str) -> Result<RawReceipt, FeedError> {
            Err(FeedError::UnknownReceipt(receipt_key.to_string()))
        }
    }

    fn receipt() -> RawReceipt {
        RawReceipt {
            items: vec![RawLine::new("Milk 2L", "3.10")],
            payments: vec![RawLine::new("X-4821", "3.10")],
            total: "3.10".to_string(),
            footer: None,
        }
    }

    fn record(id: &str, key: Option<&str>) -> FeedRecord {
        FeedRecord::new(
            id,
            DateTime::parse_from_rfc3339("2021-02-16T10:00:00+10:00").unwrap(),
            Money::from_cents(310),
            "Balwyn",
        )
        .with_receipt_key(key.map(str::to_string))
    }

    #[test]
    fn resolves_once_per_record() {
        let cache = ReceiptCache::new(CountingSource::new(receipt()));
        let r = record("t1", Some("k1"));

        let first = cache.resolve(&r).unwrap();
        let second = cache.resolve(&r).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.amount_paid, Money::from_cents(310));
    }

    #[test]
    fn different_records_are_resolved_separately() {
        let cache = ReceiptCache::new(CountingSource::new(receipt()));
        cache.resolve(&record("t1", Some("k1"))).unwrap();
        cache.resolve(&record("t2", Some("k2"))).unwrap();
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_callers_share_one_parse() {
        let cache = Arc::new(ReceiptCache::new(CountingSource::new(receipt())));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.resolve(&record("t1", Some("k1"))).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.source().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn record_without_receipt_key_is_rejected() {
        let cache = ReceiptCache::new(CountingSource::new(receipt()));
        assert!(matches!(
            cache.resolve(&record("t1", None)),
            Err(ReceiptError::NoReceipt(id)) if id == "t1"
        ));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ReceiptCache::new(FailingSource);
        let r = record("t1", Some("k1"));
        assert!(matches!(cache.resolve(&r), Err(ReceiptError::Source(_))));
        assert!(cache.cached("t1").is_none());
    }

    #[test]
    fn failed_records_leave_no_slot_behind() {
        let cache = ReceiptCache::new(FailingSource);
        for i in 0..5 {
            assert!(cache.resolve(&record(&format!("t{i}"), Some("k"))).is_err());
        }
        assert!(cache.is_empty());

        let cache = ReceiptCache::new(CountingSource::new(receipt()));
        cache.resolve(&record("t1", Some("k1"))).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cached_reports_resolved_receipts_only() {
        let cache = ReceiptCache::new(CountingSource::new(receipt()));
        assert!(cache.cached("t1").is_none());
        cache.resolve(&record("t1", Some("k1"))).unwrap();
        assert!(cache.cached("t1").is_some());
    }
}
