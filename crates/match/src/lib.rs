/// Declares a function returning a lazily compiled, process-wide regex.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static R: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            R.get_or_init(|| ::regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod bank;
pub mod feed;
pub mod matcher;
pub mod reconcile;
pub mod retailer;

pub use bank::{bank_record, BankPage};
pub use feed::{narrow, BankFeed, Page, PagedFeed, Pages, RetailerFeed};
pub use matcher::{find_match, MatchResult, TransactionMatcher};
pub use reconcile::{
    Failure, ReconcileError, ReconcileReport, ReconciledPair, Reconciler, SkipReason,
};
pub use retailer::{partner, RetailerDecoder, RetailerPage};
