//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("miroteams_http_requests_total", "Total number of HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "miroteams_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method"]
    ).expect("metric can be created");

    // Auth Metrics
    pub static ref OAUTH_LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("miroteams_oauth_logins_total", "Total number of Miro OAuth callbacks"),
        &["outcome"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref TEAMS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "miroteams_teams_created_total",
        "Total number of teams created"
    ).expect("metric can be created");
    pub static ref USERS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "miroteams_users_created_total",
        "Total number of users created"
    ).expect("metric can be created");
    pub static ref QUESTIONNAIRES_SUBMITTED_TOTAL: IntCounter = IntCounter::new(
        "miroteams_questionnaires_submitted_total",
        "Total number of questionnaires submitted"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("miroteams_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
            .expect("HTTP_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
            .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(OAUTH_LOGINS_TOTAL.clone()))
            .expect("OAUTH_LOGINS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TEAMS_CREATED_TOTAL.clone()))
            .expect("TEAMS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(USERS_CREATED_TOTAL.clone()))
            .expect("USERS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(QUESTIONNAIRES_SUBMITTED_TOTAL.clone()))
            .expect("QUESTIONNAIRES_SUBMITTED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Record one served HTTP request.
pub fn observe_http_request(method: &str, status: u16, elapsed: std::time::Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(elapsed.as_secs_f64());
}
