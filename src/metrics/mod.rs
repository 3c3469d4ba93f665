//! Prometheus metrics for the HTTP layer and the fetch pipeline.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: IntCounter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: IntGauge,
    pub fetch_cycles_total: IntCounter,
    pub fetch_cycle_failures_total: IntCounter,
    pub fetch_cycle_duration_seconds: Histogram,
    pub symbol_fetch_failures_total: IntCounter,
    pub provider_fallbacks_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total =
            IntCounter::new("http_requests_total", "Total number of HTTP requests")?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        ))?;
        let http_requests_in_flight =
            IntGauge::new("http_requests_in_flight", "HTTP requests currently being served")?;
        let fetch_cycles_total =
            IntCounter::new("fetch_cycles_total", "Fetch cycles started")?;
        let fetch_cycle_failures_total = IntCounter::new(
            "fetch_cycle_failures_total",
            "Fetch cycles that could not dispatch their work",
        )?;
        let fetch_cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "fetch_cycle_duration_seconds",
                "Wall-clock duration of a fetch cycle in seconds",
            )
            .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0, 120.0]),
        )?;
        let symbol_fetch_failures_total = IntCounter::new(
            "symbol_fetch_failures_total",
            "Symbols that ended a cycle in the failed bucket",
        )?;
        let provider_fallbacks_total = IntCounter::new(
            "provider_fallbacks_total",
            "Times a symbol moved on to the next provider after exhausting retries",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(fetch_cycles_total.clone()))?;
        registry.register(Box::new(fetch_cycle_failures_total.clone()))?;
        registry.register(Box::new(fetch_cycle_duration_seconds.clone()))?;
        registry.register(Box::new(symbol_fetch_failures_total.clone()))?;
        registry.register(Box::new(provider_fallbacks_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            fetch_cycles_total,
            fetch_cycle_failures_total,
            fetch_cycle_duration_seconds,
            symbol_fetch_failures_total,
            provider_fallbacks_total,
        })
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
