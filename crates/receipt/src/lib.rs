/// Declares a function returning a lazily compiled, process-wide regex.
macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static ::regex::Regex {
            static R: ::std::sync::OnceLock<::regex::Regex> = ::std::sync::OnceLock::new();
            R.get_or_init(|| ::regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod assembler;
pub mod cache;
pub mod error;
pub mod grouper;
pub mod source;
pub mod types;

pub use assembler::parse_receipt;
pub use cache::ReceiptCache;
pub use error::ReceiptError;
pub use grouper::{group_lines, GroupedLines};
pub use source::{ReceiptSource, StaticReceiptSource};
pub use types::{
    ParsedReceipt, PaymentMethod, PurchaseItem, PurchaseMeasure, RawLine, RawReceipt,
    ReceiptWarning, RowSection,
};
