pub mod coingecko_client;
pub mod retrying_fetcher;

pub use coingecko_client::CoinGeckoClient;
pub use retrying_fetcher::{RetryPolicy, RetryingFetcher};
