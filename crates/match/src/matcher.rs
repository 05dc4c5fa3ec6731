use chrono::Duration;
use reckon_core::{FeedError, FeedRecord, MatchPolicy, MatchWindow, ReconcileConfig};

use crate::feed::{BankFeed, Page};

/// The outcome of looking for a target's counterpart in the other feed.
/// `NotFound` is an ordinary result, not an error.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum MatchResult {
    Matched(FeedRecord),
    NotFound,
}

impl MatchResult {
    pub fn matched(&self) -> Option<&FeedRecord> {
        match self {
            MatchResult::Matched(record) => Some(record),
            MatchResult::NotFound => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }
}

/// Scan `pages` in the order they are yielded for a record whose descriptor
/// equals `descriptor` and whose amount equals `target.amount` exactly.
///
/// Candidates are expected to be pre-filtered to the time window, so
/// timestamps are only consulted for [`MatchPolicy::NearestTimestamp`].
/// With [`MatchPolicy::FirstInFeedOrder`] no page after the hit is pulled.
pub fn find_match<I>(
    target: &FeedRecord,
    pages: I,
    descriptor: &str,
    policy: MatchPolicy,
) -> Result<MatchResult, FeedError>
where
    I: IntoIterator<Item = Result<Page, FeedError>>,
{
    let mut best: Option<(i64, FeedRecord)> = None;

    for page in pages {
        for record in page? {
            if record.descriptor != descriptor || record.amount != target.amount {
                continue;
            }
            match policy {
                MatchPolicy::FirstInFeedOrder => return Ok(MatchResult::Matched(record)),
                MatchPolicy::NearestTimestamp => {
                    let distance = record.seconds_apart(target);
                    // Strict: the earlier candidate in feed order wins a tie.
                    if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                        best = Some((distance, record));
                    }
                }
            }
        }
    }

    Ok(best.map_or(MatchResult::NotFound, |(_, record)| MatchResult::Matched(record)))
}

/// Joins a retailer record to the bank feed on time window, exact amount and
/// descriptor.
#[derive(Debug, Clone)]
pub struct TransactionMatcher {
    pub window: Duration,
    pub descriptor: String,
    pub category: Option<String>,
    pub policy: MatchPolicy,
}

impl TransactionMatcher {
    pub fn new(window: Duration, descriptor: &str) -> Self {
        Self {
            window,
            descriptor: descriptor.to_string(),
            category: None,
            policy: MatchPolicy::default(),
        }
    }

    pub fn from_config(config: &ReconcileConfig) -> Self {
        Self {
            window: config.window(),
            descriptor: config.bank_descriptor.clone(),
            category: config.category().map(str::to_string),
            policy: config.match_policy,
        }
    }

    pub fn window_for(&self, target: &FeedRecord) -> MatchWindow {
        MatchWindow::around(target.timestamp, self.window)
    }

    pub fn find_match<I>(&self, target: &FeedRecord, pages: I) -> Result<MatchResult, FeedError>
    where
        I: IntoIterator<Item = Result<Page, FeedError>>,
    {
        find_match(target, pages, &self.descriptor, self.policy)
    }

    /// Ask `feed` for the target's window and search what comes back.
    pub fn match_in<B: BankFeed + ?Sized>(
        &self,
        feed: &B,
        target: &FeedRecord,
    ) -> Result<MatchResult, FeedError> {
        let window = self.window_for(target);
        tracing::debug!(id = %target.id, amount = %target.amount, %window, "matching");
        let pages = feed.get_transactions(window, self.category.as_deref());
        self.find_match(target, pages)
    }
}
