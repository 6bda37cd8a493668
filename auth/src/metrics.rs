//! Authentication metrics.

use metrics::{counter, describe_counter};

/// Register authentication metric descriptions.
pub fn describe_metrics() {
    describe_counter!(
        "auth_initializations_total",
        "Initialization attempts started"
    );
    describe_counter!("auth_successes_total", "Initialization attempts that authenticated");
    describe_counter!(
        "auth_failures_total",
        "Initialization attempts that failed, by kind"
    );
    describe_counter!(
        "auth_session_changes_total",
        "Session store change notifications, by kind"
    );
    describe_counter!("auth_sign_outs_total", "Sign-outs");
}

/// Authentication metrics recorder.
pub struct AuthMetrics;

impl AuthMetrics {
    /// Record a started initialization.
    pub fn record_initialization() {
        counter!("auth_initializations_total").increment(1);
    }

    /// Record a successful handshake.
    pub fn record_success() {
        counter!("auth_successes_total").increment(1);
    }

    /// Record a failed handshake.
    pub fn record_failure(kind: &'static str) {
        counter!("auth_failures_total", "kind" => kind).increment(1);
    }

    /// Record a session store notification.
    pub fn record_session_change(kind: &'static str) {
        counter!("auth_session_changes_total", "kind" => kind).increment(1);
    }

    /// Record a sign-out.
    pub fn record_sign_out() {
        counter!("auth_sign_outs_total").increment(1);
    }
}
