use std::sync::Arc;

use reckon_core::{FeedError, FeedRecord, ReconcileConfig};
use reckon_receipt::{ParsedReceipt, ReceiptCache, ReceiptError, ReceiptSource};
use thiserror::Error;

use crate::feed::{BankFeed, RetailerFeed};
use crate::matcher::{MatchResult, TransactionMatcher};
use crate::retailer::partner;

/// A per-record failure. Never aborts the batch.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("receipt: {0}")]
    Receipt(#[from] ReceiptError),
    #[error("bank feed: {0}")]
    Feed(#[from] FeedError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Partner not configured for reconciliation (or not recognisable).
    Partner(Option<String>),
    NoReceipt,
}

#[derive(Debug, Clone)]
pub struct ReconciledPair {
    pub retailer: FeedRecord,
    pub bank: FeedRecord,
    pub receipt: Arc<ParsedReceipt>,
    pub partner: String,
}

#[derive(Debug)]
pub struct Failure {
    pub record_id: String,
    pub error: ReconcileError,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub matched: Vec<ReconciledPair>,
    /// Retailer records with a receipt but no bank counterpart in the window.
    pub unmatched: Vec<FeedRecord>,
    pub skipped: Vec<(String, SkipReason)>,
    pub failures: Vec<Failure>,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len() + self.skipped.len() + self.failures.len()
    }
}

/// Walks the retailer history and pairs each receipted purchase with its
/// bank transaction.
pub struct Reconciler {
    config: ReconcileConfig,
    matcher: TransactionMatcher,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        let matcher = TransactionMatcher::from_config(&config);
        Self { config, matcher }
    }

    /// A failure fetching a retailer page ends the run with that error;
    /// anything that goes wrong for a single record lands in
    /// [`ReconcileReport::failures`].
    pub fn run<R, B, S>(
        &self,
        retailer: &R,
        bank: &B,
        receipts: &ReceiptCache<S>,
    ) -> Result<ReconcileReport, FeedError>
    where
        R: RetailerFeed + ?Sized,
        B: BankFeed + ?Sized,
        S: ReceiptSource,
    {
        let mut report = ReconcileReport::default();

        for page in retailer.list_transactions() {
            for record in page? {
                self.reconcile_one(record, bank, receipts, &mut report);
            }
        }

        tracing::info!(
            matched = report.matched.len(),
            unmatched = report.unmatched.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    fn reconcile_one<B, S>(
        &self,
        record: FeedRecord,
        bank: &B,
        receipts: &ReceiptCache<S>,
        report: &mut ReconcileReport,
    ) where
        B: BankFeed + ?Sized,
        S: ReceiptSource,
    {
        let partner = partner(&record.raw);
        let partner = match partner {
            Some(p) if self.config.reconciles_partner(&p) => p,
            other => {
                tracing::debug!(id = %record.id, partner = ?other, "skipping partner");
                report.skipped.push((record.id, SkipReason::Partner(other)));
                return;
            }
        };
        if record.receipt_key.is_none() {
            tracing::warn!(id = %record.id, "skipping transaction without a receipt");
            report.skipped.push((record.id, SkipReason::NoReceipt));
            return;
        }

        match self.pair(&record, bank, receipts) {
            Ok((MatchResult::Matched(bank_record), receipt)) => {
                tracing::debug!(id = %record.id, bank = %bank_record.id, "matched");
                report.matched.push(ReconciledPair {
                    retailer: record,
                    bank: bank_record,
                    receipt,
                    partner,
                });
            }
            Ok((MatchResult::NotFound, _)) => {
                tracing::info!(id = %record.id, "no bank transaction in window");
                report.unmatched.push(record);
            }
            Err(error) => {
                tracing::warn!(id = %record.id, %error, "reconciliation failed");
                report.failures.push(Failure {
                    record_id: record.id,
                    error,
                });
            }
        }
    }

    fn pair<B, S>(
        &self,
        record: &FeedRecord,
        bank: &B,
        receipts: &ReceiptCache<S>,
    ) -> Result<(MatchResult, Arc<ParsedReceipt>), ReconcileError>
    where
        B: BankFeed + ?Sized,
        S: ReceiptSource,
    {
        let receipt = receipts.resolve(record)?;
        // The bank charges what was paid by card, which can differ from the
        // retailer's reported value.
        let target = record.with_amount(receipt.amount_paid);
        let result = self.matcher.match_in(bank, &target)?;
        Ok((result, receipt))
    }
}
