//! Transport metrics.

use metrics::{counter, describe_counter};

/// Register transport metric descriptions.
pub fn describe_metrics() {
    describe_counter!(
        "transport_requests_total",
        "Requests posted to the host frame, by event"
    );
    describe_counter!(
        "transport_responses_total",
        "Responses delivered to pending requests, by outcome"
    );
    describe_counter!(
        "transport_timeouts_total",
        "Requests that timed out waiting for the host, by event"
    );
    describe_counter!(
        "transport_origin_rejected_total",
        "Inbound messages dropped because of an untrusted origin"
    );
    describe_counter!(
        "transport_disposed_total",
        "Pending requests failed by teardown"
    );
}

/// Transport metrics recorder.
pub struct TransportMetrics;

impl TransportMetrics {
    /// Record a posted request.
    pub fn record_request(event: &str) {
        counter!("transport_requests_total", "event" => event.to_string()).increment(1);
    }

    /// Record a delivered response.
    pub fn record_response(ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        counter!("transport_responses_total", "outcome" => outcome).increment(1);
    }

    /// Record a timed-out request.
    pub fn record_timeout(event: &str) {
        counter!("transport_timeouts_total", "event" => event.to_string()).increment(1);
    }

    /// Record a message dropped by the origin check.
    pub fn record_origin_rejected() {
        counter!("transport_origin_rejected_total").increment(1);
    }

    /// Record requests failed by teardown.
    pub fn record_disposed(count: usize) {
        counter!("transport_disposed_total").increment(u64::try_from(count).unwrap_or(u64::MAX));
    }
}
