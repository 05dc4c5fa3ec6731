pub mod config;
pub mod error;
pub mod money;
pub mod record;
pub mod window;

pub use config::{MatchPolicy, ReconcileConfig, MAX_WINDOW_MINUTES};
pub use error::{ConfigError, FeedError, MoneyError};
pub use money::Money;
pub use record::FeedRecord;
pub use window::MatchWindow;
