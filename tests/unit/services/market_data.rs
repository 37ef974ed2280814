//! Stored market history providers

use chrono::Duration;

use forecast_ledger::models::candle::Candle;
use forecast_ledger::services::market_data::{
    FileMarketDataProvider, InMemoryMarketDataProvider, MarketDataProvider,
};

use crate::common_stubs::{daily_candles, t0};

#[tokio::test]
async fn in_memory_returns_latest_candles_oldest_first() {
    let mut candles = daily_candles(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    candles.reverse();
    let provider = InMemoryMarketDataProvider::new().with_candles("aapl", candles);

    let latest = provider.get_candles("AAPL", 3).await.unwrap();
    let closes: Vec<f64> = latest.iter().map(|c| c.close).collect();
    assert_eq!(closes, vec![3.0, 4.0, 5.0]);
}

#[tokio::test]
async fn in_memory_unknown_symbol_is_empty() {
    let provider = InMemoryMarketDataProvider::new();
    assert!(provider.get_candles("MSFT", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn file_provider_reads_symbol_file() {
    let dir = std::env::temp_dir().join(format!("market-data-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let candles = vec![
        Candle::new(10.0, 11.0, 9.5, 10.5, 1_000.0, t0()),
        Candle::from_close(10.8, t0() + Duration::days(1)),
    ];
    std::fs::write(dir.join("TSLA.json"), serde_json::to_string(&candles).unwrap()).unwrap();

    let provider = FileMarketDataProvider::new(&dir);
    let loaded = provider.get_candles("tsla", 10).await.unwrap();
    std::fs::remove_dir_all(&dir).ok();

    assert_eq!(loaded, candles);
}

#[tokio::test]
async fn file_provider_rejects_path_like_symbols() {
    let provider = FileMarketDataProvider::new(std::env::temp_dir());
    assert!(provider.get_candles("../etc/passwd", 10).await.is_err());
    assert!(provider.get_candles("", 10).await.is_err());
}

#[tokio::test]
async fn file_provider_reports_missing_history() {
    let provider = FileMarketDataProvider::new("/nonexistent/market-data");
    let err = provider.get_candles("AAPL", 10).await.unwrap_err();
    assert!(err.to_string().contains("AAPL.json"));
}

#[test]
fn symbol_validation_accepts_tickers_only() {
    use forecast_ledger::error::ForecastError;
    use forecast_ledger::services::market_data::validate_symbol;

    for symbol in ["AAPL", "BRK.B", "^GSPC", "EURUSD=X", "BTC-USD"] {
        assert!(validate_symbol(symbol).is_ok(), "rejected {}", symbol);
    }
    assert!(matches!(
        validate_symbol("a/b"),
        Err(ForecastError::InvalidSymbol(_))
    ));
}
