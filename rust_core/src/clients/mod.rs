pub mod alpha_vantage;
pub mod binance;
pub mod budget;
pub mod coindesk;
pub mod coingecko;
pub mod coinmarketcap;
pub mod provider;

// Re-export commonly used types
pub use alpha_vantage::AlphaVantageClient;
pub use binance::BinanceClient;
pub use coindesk::CoinDeskClient;
pub use coingecko::CoinGeckoClient;
pub use coinmarketcap::CoinMarketCapClient;
pub use provider::{AdapterError, AdapterResult, ErrorKind, QuoteProvider};
