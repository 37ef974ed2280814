//! Configuration defaults

use std::time::Duration;

use forecast_ledger::config::{ForecastConfig, LedgerConfig, DEFAULT_RPC_URL};
use forecast_ledger::forecast::engine::EnsembleAggregation;
use forecast_ledger::ledger::abi::PriceEncoding;

#[test]
fn forecast_defaults_match_rollout_constants() {
    let config = ForecastConfig::default();
    assert_eq!(config.seq_len, 20);
    assert_eq!(config.future_days, 30);
    assert_eq!(config.noise_dim, 10);
    assert_eq!(config.ensemble_size, 5);
    assert_eq!(config.step_hours, 24);
    assert_eq!(config.aggregation, EnsembleAggregation::Mean);
    assert_eq!(config.seed, None);
    assert_eq!(config.model_input_dim(), 30);
}

#[test]
fn with_seed_sets_seed() {
    let config = ForecastConfig::default().with_seed(42);
    assert_eq!(config.seed, Some(42));
}

#[test]
fn ledger_defaults_target_local_node() {
    let config = LedgerConfig::default();
    assert_eq!(config.rpc_url, DEFAULT_RPC_URL);
    assert!(config.account.is_none());
    assert!(config.gas_limit.is_none());
    assert_eq!(config.confirmation_timeout, Duration::from_secs(120));
    assert_eq!(config.poll_interval, Duration::from_millis(500));
    assert_eq!(config.price_encoding, PriceEncoding::Truncate);
}

#[test]
fn aggregation_and_encoding_parse_case_insensitively() {
    assert_eq!("Median".parse::<EnsembleAggregation>(), Ok(EnsembleAggregation::Median));
    assert_eq!(" mean ".parse::<EnsembleAggregation>(), Ok(EnsembleAggregation::Mean));
    assert!("mode".parse::<EnsembleAggregation>().is_err());

    assert_eq!("ROUND".parse::<PriceEncoding>(), Ok(PriceEncoding::Round));
    assert_eq!("truncate".parse::<PriceEncoding>(), Ok(PriceEncoding::Truncate));
    assert!("ceil".parse::<PriceEncoding>().is_err());
}

#[test]
fn only_production_names_select_json_logs() {
    use forecast_ledger::logging::is_production;
    assert!(is_production("production"));
    assert!(is_production("prod"));
    assert!(!is_production("sandbox"));
}

#[test]
fn unrecognized_enumerated_settings_keep_defaults() {
    std::env::set_var("PRICE_ENCODING", "rounding");
    std::env::set_var("ENSEMBLE_AGGREGATION", "Median");
    let ledger = LedgerConfig::from_env();
    let forecast = ForecastConfig::from_env();
    std::env::remove_var("PRICE_ENCODING");
    std::env::remove_var("ENSEMBLE_AGGREGATION");

    assert_eq!(ledger.price_encoding, PriceEncoding::Truncate);
    assert_eq!(forecast.aggregation, EnsembleAggregation::Median);
}
