pub mod nse;
pub mod yahoo;

pub use nse::NseOptionChainFetcher;
pub use yahoo::YahooClient;
