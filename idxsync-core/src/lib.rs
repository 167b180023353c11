//! IDX sync core: tickers, categories, provider data and its conversion to
//! storable JSON records.
//!
//! This crate holds everything that does not touch the database:
//! - Ticker normalization (exchange suffix handling)
//! - The seven data categories and their write policies
//! - Provider value model and the Yahoo Finance provider
//! - Sanitizer (provider values to plain JSON) and record shaper
//! - Per-ticker fetch orchestration with per-category failure isolation

pub mod category;
pub mod data;
pub mod sanitize;
pub mod shape;
pub mod ticker;
pub mod value;

pub use category::{Category, CategoryResult, Record, ResultSet, WritePolicy};
pub use data::{fetch_ticker, DataError, FetchOptions, FetchReport, MarketDataProvider, Period};
pub use sanitize::sanitize;
pub use shape::{shape, shape_record};
pub use ticker::Ticker;
pub use value::ProviderValue;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed to the sync pipeline are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Ticker>();
        require_sync::<Ticker>();
        require_send::<ResultSet>();
        require_sync::<ResultSet>();
        require_send::<ProviderValue>();
        require_sync::<ProviderValue>();
        require_send::<FetchReport>();
        require_sync::<FetchReport>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
    }
}
