//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "birdhouse_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("birdhouse_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref TWEETS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "birdhouse_tweets_created_total",
        "Total number of tweets created"
    ).expect("metric can be created");
    pub static ref TWEETS_DELETED_TOTAL: IntCounter = IntCounter::new(
        "birdhouse_tweets_deleted_total",
        "Total number of tweets deleted"
    ).expect("metric can be created");
    pub static ref LIKES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("birdhouse_likes_total", "Like actions by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref FOLLOWS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("birdhouse_follows_total", "Follow graph mutations"),
        &["action"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "birdhouse_media_uploads_total",
        "Total number of media uploads"
    ).expect("metric can be created");
    pub static ref MEDIA_BYTES_UPLOADED: IntCounter = IntCounter::new(
        "birdhouse_media_bytes_uploaded_total",
        "Total bytes of media uploaded"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("birdhouse_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; registration only happens on the first call.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
            .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(DB_QUERIES_TOTAL.clone()))
            .expect("DB_QUERIES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TWEETS_CREATED_TOTAL.clone()))
            .expect("TWEETS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TWEETS_DELETED_TOTAL.clone()))
            .expect("TWEETS_DELETED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(LIKES_TOTAL.clone()))
            .expect("LIKES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(FOLLOWS_TOTAL.clone()))
            .expect("FOLLOWS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(MEDIA_UPLOADS_TOTAL.clone()))
            .expect("MEDIA_UPLOADS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(MEDIA_BYTES_UPLOADED.clone()))
            .expect("MEDIA_BYTES_UPLOADED can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Record one executed query against `table`.
pub fn record_query(operation: &str, table: &str) {
    DB_QUERIES_TOTAL
        .with_label_values(&[operation, table])
        .inc();
}
