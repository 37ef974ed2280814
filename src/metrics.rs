//! Prometheus metrics for forecast runs, ledger writes and the HTTP surface.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub forecast_runs_total: IntCounter,
    pub forecast_failures_total: IntCounter,
    pub forecast_duration_seconds: Histogram,
    pub ledger_submissions_total: IntCounter,
    pub ledger_confirmed_total: IntCounter,
    pub ledger_failed_total: IntCounter,
    pub ledger_skipped_total: IntCounter,
    pub http_requests_total: IntCounter,
    pub http_requests_in_flight: IntGauge,
    pub http_request_duration_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let forecast_runs_total =
            IntCounter::new("forecast_runs_total", "Pipeline runs started")?;
        let forecast_failures_total =
            IntCounter::new("forecast_failures_total", "Pipeline runs aborted by an error")?;
        let forecast_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "forecast_duration_seconds",
                "Wall time of a pipeline run, ledger stage included",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
        )?;
        let ledger_submissions_total =
            IntCounter::new("ledger_submissions_total", "Transactions sent to the ledger")?;
        let ledger_confirmed_total =
            IntCounter::new("ledger_confirmed_total", "Points confirmed on the ledger")?;
        let ledger_failed_total =
            IntCounter::new("ledger_failed_total", "Points that ended in the failed state")?;
        let ledger_skipped_total =
            IntCounter::new("ledger_skipped_total", "Write stages skipped as unavailable")?;
        let http_requests_total =
            IntCounter::new("http_requests_total", "HTTP requests served")?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests being served")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency",
        ))?;

        registry.register(Box::new(forecast_runs_total.clone()))?;
        registry.register(Box::new(forecast_failures_total.clone()))?;
        registry.register(Box::new(forecast_duration_seconds.clone()))?;
        registry.register(Box::new(ledger_submissions_total.clone()))?;
        registry.register(Box::new(ledger_confirmed_total.clone()))?;
        registry.register(Box::new(ledger_failed_total.clone()))?;
        registry.register(Box::new(ledger_skipped_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            forecast_runs_total,
            forecast_failures_total,
            forecast_duration_seconds,
            ledger_submissions_total,
            ledger_confirmed_total,
            ledger_failed_total,
            ledger_skipped_total,
            http_requests_total,
            http_requests_in_flight,
            http_request_duration_seconds,
        })
    }

    /// Text exposition format for `/metrics`.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
