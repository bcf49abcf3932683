pub mod comparator;
pub mod config;
pub mod exchange;
pub mod log;
pub mod provider;

pub use comparator::{CompareError, DEFAULT_DEADLINE, RateComparator};
pub use exchange::{ComparisonResult, ConversionRequest, Offer};
pub use provider::QuoteProvider;
