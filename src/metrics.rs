use crate::server::error::ServiceError;
use powerocean_rs::{Extraction, MeasurementEndpoint};
use prometheus::{Encoder, GaugeVec, IntGauge, TextEncoder};
use serde_json::Value;

lazy_static! {
    static ref ENDPOINT_GAUGE: GaugeVec = register_gauge_vec!(
        opts!(
            "powerocean_endpoint",
            "numeric endpoint value extracted from the last telemetry document",
        ),
        &["unique_id", "serial", "friendly_name", "unit", "device_class"],
    )
    .unwrap();
    static ref ENDPOINT_COUNT_GAUGE: IntGauge = register_int_gauge!(opts!(
        "powerocean_endpoints",
        "number of endpoints extracted from the last telemetry document",
    ))
    .unwrap();
    static ref DIAGNOSTICS_GAUGE: IntGauge = register_int_gauge!(opts!(
        "powerocean_diagnostics",
        "number of reports, sub-devices and fields skipped in the last extraction",
    ))
    .unwrap();
}

/// Gauge value of an endpoint; switches count as 0/1, text has none.
fn numeric(endpoint: &MeasurementEndpoint) -> Option<f64> {
    match &endpoint.value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn labels(endpoint: &MeasurementEndpoint) -> [&str; 5] {
    [
        endpoint.unique_id.as_str(),
        endpoint.serial.as_str(),
        endpoint.friendly_name.as_str(),
        endpoint.unit.unwrap_or(""),
        endpoint.device_class().map_or("", |class| class.as_str()),
    ]
}

/// Replace all endpoint gauges with the values of `extraction`.
pub fn update(extraction: &Extraction) {
    /* endpoints missing from this pass must not linger with stale values */
    ENDPOINT_GAUGE.reset();

    for endpoint in extraction.endpoints.values() {
        if let Some(value) = numeric(endpoint) {
            ENDPOINT_GAUGE.with_label_values(&labels(endpoint)).set(value);
        }
    }

    ENDPOINT_COUNT_GAUGE.set(extraction.endpoints.len() as i64);
    DIAGNOSTICS_GAUGE.set(extraction.diagnostics.len() as i64);
}

/// Read metrics from Prometheus exporter registry.
pub fn read() -> Result<String, ServiceError> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(ServiceError::FormatError))?;
    String::from_utf8(buffer).or(Err(ServiceError::FormatError))
}
