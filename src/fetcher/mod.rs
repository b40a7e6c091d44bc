pub mod traits;
pub mod yahoo;

pub use traits::MarketDataSource;
pub use yahoo::YahooFetcher;
