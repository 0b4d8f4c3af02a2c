//! Metrics module
//!
//! Prometheus collectors for uploads and object store calls.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_histogram, register_histogram_vec, Counter,
    CounterVec, Encoder, Histogram, HistogramVec, TextEncoder,
};

lazy_static! {
    // Upload metrics
    pub static ref UPLOADS_TOTAL: CounterVec = register_counter_vec!(
        "gateway_uploads_total",
        "Total number of single-file uploads",
        &["status"]
    ).unwrap();

    pub static ref UPLOAD_BYTES_TOTAL: Counter = register_counter!(
        "gateway_upload_bytes_total",
        "Total bytes uploaded"
    ).unwrap();

    pub static ref UPLOAD_DURATION: HistogramVec = register_histogram_vec!(
        "gateway_upload_duration_seconds",
        "Upload duration in seconds",
        &["status"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]
    ).unwrap();

    // Batch metrics
    pub static ref BATCH_FILES: Histogram = register_histogram!(
        "gateway_batch_files",
        "Number of files per multi-file upload",
        vec![0.0, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0]
    ).unwrap();

    // Store metrics
    pub static ref STORE_OPERATIONS: CounterVec = register_counter_vec!(
        "gateway_store_operations_total",
        "Object store calls by operation",
        &["operation", "status"]
    ).unwrap();

    // Error metrics
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "gateway_errors_total",
        "Total errors",
        &["type"]
    ).unwrap();
}

fn status_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record a successful upload
pub fn record_upload_success(bytes: u64, duration_secs: f64) {
    UPLOADS_TOTAL.with_label_values(&["success"]).inc();
    UPLOAD_BYTES_TOTAL.inc_by(bytes as f64);
    UPLOAD_DURATION
        .with_label_values(&["success"])
        .observe(duration_secs);
}

/// Record a failed upload
pub fn record_upload_failure(duration_secs: f64) {
    UPLOADS_TOTAL.with_label_values(&["failure"]).inc();
    UPLOAD_DURATION
        .with_label_values(&["failure"])
        .observe(duration_secs);
}

/// Record the size of a multi-file batch
pub fn record_batch(files: usize) {
    BATCH_FILES.observe(files as f64);
}

/// Record an object store call
pub fn record_store_operation(operation: &str, success: bool) {
    STORE_OPERATIONS
        .with_label_values(&[operation, status_label(success)])
        .inc();
}

/// Record an error
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

/// Encode every registered metric in the Prometheus text format
///
/// Returns the content type alongside the encoded body.
pub fn render() -> Result<(String, Vec<u8>), prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok((encoder.format_type().to_string(), buffer))
}
