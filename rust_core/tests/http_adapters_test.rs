//! HTTP Adapter Tests
//!
//! Each adapter is pointed at a local mock server to check request shape,
//! response normalization and error classification.

use cryptsist_core::cache::CacheStore;
use cryptsist_core::clients::alpha_vantage::AlphaVantageClient;
use cryptsist_core::clients::binance::BinanceClient;
use cryptsist_core::clients::coindesk::CoinDeskClient;
use cryptsist_core::clients::coingecko::CoinGeckoClient;
use cryptsist_core::clients::coinmarketcap::CoinMarketCapClient;
use cryptsist_core::clients::provider::{ErrorKind, QuoteProvider};
use cryptsist_core::enrichment::MarketCapSource;
use cryptsist_core::models::ProviderId;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// CoinMarketCap
// ============================================================================

#[tokio::test]
async fn test_coinmarketcap_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cryptocurrency/quotes/latest"))
        .and(query_param("symbol", "ETH"))
        .and(header("X-CMC_PRO_API_KEY", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": {"error_code": 0},
            "data": {
                "ETH": {
                    "name": "Ethereum",
                    "cmc_rank": 2,
                    "quote": {
                        "USD": {
                            "price": 3000.5,
                            "volume_24h": 1.5e10,
                            "percent_change_24h": -2.5,
                            "percent_change_7d": 4.0,
                            "market_cap": 3.6e11
                        }
                    }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CoinMarketCapClient::new(Some("test-key".to_string()))
        .unwrap()
        .with_base_url(server.uri());
    let fragment = client.request("eth").await.unwrap();

    assert_eq!(fragment.symbol, "ETH");
    assert_eq!(fragment.current_price, 3000.5);
    assert_eq!(fragment.price_change_24h_percent, Some(-2.5));
    assert_eq!(fragment.price_change_7d_percent, Some(4.0));
    assert_eq!(fragment.market_cap, Some(3.6e11));
    assert_eq!(fragment.market_cap_rank, Some(2));
    assert!(!fragment.needs_enrichment);
}

#[tokio::test]
async fn test_coinmarketcap_rejected_key_is_unconfigured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"status": {"error_code": 1001, "error_message": "This API Key is invalid."}}"#,
        ))
        .mount(&server)
        .await;

    let client = CoinMarketCapClient::new(Some("bad".to_string()))
        .unwrap()
        .with_base_url(server.uri());
    let err = client.request("BTC").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unconfigured);
}

// ============================================================================
// Binance
// ============================================================================

#[tokio::test]
async fn test_binance_ticker_goes_through_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ticker/24hr"))
        .and(query_param("symbol", "BTCUSDT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "symbol": "BTCUSDT",
            "priceChangePercent": "1.265",
            "lastPrice": "65010.00",
            "highPrice": "65500.00",
            "lowPrice": "63900.00",
            "volume": "20123.5",
            "quoteVolume": "1301234567.89"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = BinanceClient::new(None).unwrap().with_base_url(server.uri());
    let cache = CacheStore::default();

    let first = client.fetch("BTC", &cache).await.unwrap();
    let second = client.fetch("BTC", &cache).await.unwrap();

    assert_eq!(first.source, ProviderId::Binance);
    assert_eq!(first.current_price, 65010.0);
    assert_eq!(first.volume_24h, Some(1301234567.89));
    assert!(first.needs_enrichment);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_binance_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .mount(&server)
        .await;

    let client = BinanceClient::new(None).unwrap().with_base_url(server.uri());
    let err = client.request("BTC").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
}

#[tokio::test]
async fn test_binance_unknown_pair_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"code": -1121, "msg": "Invalid symbol."})),
        )
        .mount(&server)
        .await;

    let client = BinanceClient::new(None).unwrap().with_base_url(server.uri());
    let err = client.request("NOPE").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_binance_garbage_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = BinanceClient::new(None).unwrap().with_base_url(server.uri());
    let err = client.request("BTC").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedResponse);
}

// ============================================================================
// CoinDesk
// ============================================================================

#[tokio::test]
async fn test_coindesk_btc_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bpi/currentprice.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "time": {"updatedISO": "2024-05-01T12:00:00+00:00"},
            "bpi": {"USD": {"code": "USD", "rate": "65,010.1234", "rate_float": 65010.1234}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CoinDeskClient::new().unwrap().with_base_url(server.uri());

    let fragment = client.request("btc").await.unwrap();
    assert_eq!(fragment.current_price, 65010.1234);
    assert!(fragment.needs_enrichment);

    // Other symbols never reach the server
    let err = client.request("ETH").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

// ============================================================================
// Alpha Vantage
// ============================================================================

#[tokio::test]
async fn test_alpha_vantage_exchange_rate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("function", "CURRENCY_EXCHANGE_RATE"))
        .and(query_param("from_currency", "SOL"))
        .and(query_param("apikey", "av-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Realtime Currency Exchange Rate": {
                "1. From_Currency Code": "SOL",
                "3. To_Currency Code": "USD",
                "5. Exchange Rate": "150.25000000",
                "6. Last Refreshed": "2024-05-01 12:00:01"
            }
        })))
        .mount(&server)
        .await;

    let client = AlphaVantageClient::new(Some("av-key".to_string()))
        .unwrap()
        .with_base_url(server.uri());
    let fragment = client.request("SOL").await.unwrap();

    assert_eq!(fragment.source, ProviderId::AlphaVantage);
    assert_eq!(fragment.current_price, 150.25);
    assert!(fragment.price_change_24h_percent.is_none());
    assert!(fragment.needs_enrichment);
}

#[tokio::test]
async fn test_alpha_vantage_note_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
        })))
        .mount(&server)
        .await;

    let client = AlphaVantageClient::new(Some("av-key".to_string()))
        .unwrap()
        .with_base_url(server.uri());
    let err = client.request("BTC").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::RateLimited);
}

#[tokio::test]
async fn test_alpha_vantage_daily_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("function", "DIGITAL_CURRENCY_DAILY"))
        .and(query_param("symbol", "BTC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Meta Data": {"2. Digital Currency Code": "BTC"},
            "Time Series (Digital Currency Daily)": {
                "2024-05-01": {
                    "1. open": "60000.0", "2. high": "61000.0", "3. low": "59000.0",
                    "4. close": "60500.0", "5. volume": "1200.5"
                },
                "2024-04-30": {
                    "1. open": "59000.0", "2. high": "60500.0", "3. low": "58500.0",
                    "4. close": "60000.0", "5. volume": "1100.0"
                },
                "2024-04-29": {
                    "1. open": "58000.0", "2. high": "59500.0", "3. low": "57500.0",
                    "4. close": "59000.0", "5. volume": "900.0"
                }
            }
        })))
        .mount(&server)
        .await;

    let client = AlphaVantageClient::new(Some("av-key".to_string()))
        .unwrap()
        .with_base_url(server.uri());
    let candles = client.get_daily_history("btc", 2).await.unwrap();

    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].date.to_string(), "2024-04-30");
    assert_eq!(candles[1].date.to_string(), "2024-05-01");
    assert_eq!(candles[1].close, 60500.0);
    assert_eq!(candles[1].volume, 1200.5);
}

// ============================================================================
// CoinGecko
// ============================================================================

#[tokio::test]
async fn test_coingecko_market_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/simple/price"))
        .and(query_param("ids", "bitcoin"))
        .and(query_param("include_market_cap", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "bitcoin": {"usd": 65000.0, "usd_market_cap": 1.19e12}
        })))
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new().unwrap().with_base_url(server.uri());
    assert_eq!(client.market_cap("bitcoin").await.unwrap(), 1.19e12);
}

#[tokio::test]
async fn test_coingecko_server_error_is_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let client = CoinGeckoClient::new().unwrap().with_base_url(server.uri());
    let err = client.market_cap("bitcoin").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Network);
}
