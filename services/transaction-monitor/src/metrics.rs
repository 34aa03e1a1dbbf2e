use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use lazy_static::lazy_static;
use threat_engine::{ScoreResult, ThreatFlag};

lazy_static! {
    // HTTP metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"]
    ).expect("metric can be created");

    // Business metrics - monitoring specific
    pub static ref TRANSACTIONS_MONITORED: IntCounter = IntCounter::new(
        "transactions_monitored_total",
        "Total transactions scored"
    ).expect("metric can be created");

    pub static ref ALERTS_RAISED: IntCounter = IntCounter::new(
        "threat_alerts_raised_total",
        "Total high threat alerts raised"
    ).expect("metric can be created");

    pub static ref SCORE_OVERRIDES: IntCounter = IntCounter::new(
        "threat_score_overrides_total",
        "Total manual threat score overrides"
    ).expect("metric can be created");

    pub static ref FLAGS_TRIGGERED: IntCounterVec = IntCounterVec::new(
        Opts::new("threat_flags_triggered_total", "Rules fired, by flag"),
        &["flag"]
    ).expect("metric can be created");

    pub static ref THREAT_SCORE: Histogram = Histogram::with_opts(
        HistogramOpts::new("threat_score_distribution", "Distribution of threat scores")
            .buckets(vec![0.0, 20.0, 25.0, 30.0, 50.0, 75.0, 100.0])
    ).expect("metric can be created");
}

/// Register all metrics with the given registry
pub fn register_metrics(registry: &Registry) -> Result<(), prometheus::Error> {
    registry.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    registry.register(Box::new(TRANSACTIONS_MONITORED.clone()))?;
    registry.register(Box::new(ALERTS_RAISED.clone()))?;
    registry.register(Box::new(SCORE_OVERRIDES.clone()))?;
    registry.register(Box::new(FLAGS_TRIGGERED.clone()))?;
    registry.register(Box::new(THREAT_SCORE.clone()))?;
    Ok(())
}

pub fn record_evaluation(result: &ScoreResult, alert_raised: bool) {
    TRANSACTIONS_MONITORED.inc();
    THREAT_SCORE.observe(f64::from(result.score.score()));

    for flag in &result.flags {
        FLAGS_TRIGGERED.with_label_values(&[flag.as_str()]).inc();
    }

    if alert_raised {
        ALERTS_RAISED.inc();
    }
}

pub fn record_override(alert_raised: bool) {
    SCORE_OVERRIDES.inc();
    if alert_raised {
        ALERTS_RAISED.inc();
    }
}

/// Generate metrics output in Prometheus text format
pub fn render(registry: &Registry) -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Zero-initialise per-flag series so dashboards see every flag
pub fn init_flag_series() {
    for flag in ThreatFlag::ALL {
        FLAGS_TRIGGERED.with_label_values(&[flag.as_str()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threat_engine::ThreatScore;

    #[test]
    fn test_metrics_registration() {
        let registry = Registry::new();
        let result = register_metrics(&registry);
        assert!(result.is_ok());
    }

    #[test]
    fn test_render_contains_flags() {
        let registry = Registry::new();
        register_metrics(&registry).unwrap();

        record_evaluation(
            &ScoreResult {
                score: ThreatScore::new(45),
                flags: vec![ThreatFlag::NewLocation, ThreatFlag::OddHours],
            },
            false,
        );

        let output = render(&registry).unwrap();
        assert!(output.contains("transactions_monitored_total"));
        assert!(output.contains("flag=\"odd_hours\""));
    }
}
