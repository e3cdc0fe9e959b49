//! Metrics for observability
//!
//! Counters are labelled with an `outcome`: `ok` or the `kind()` of the error.
//! Nothing is exported unless the binary installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

pub const RELAY_MESSAGES_TOTAL: &str = "onionmesh_relay_messages_total";
pub const SENDS_TOTAL: &str = "onionmesh_sends_total";
pub const REGISTRATIONS_TOTAL: &str = "onionmesh_registrations_total";
pub const SEND_DURATION_MS: &str = "onionmesh_send_duration_ms";

const OK: &str = "ok";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(
        RELAY_MESSAGES_TOTAL,
        "Messages handled by relays, by outcome (delivered, forwarded or error kind)"
    );
    describe_counter!(SENDS_TOTAL, "Circuit sends started by users, by outcome");
    describe_counter!(
        REGISTRATIONS_TOTAL,
        "Directory registration attempts, by outcome"
    );
    describe_histogram!(
        SEND_DURATION_MS,
        "Time to build a circuit and hand it to the entry relay, in milliseconds"
    );
}

/// Count one relay request
pub fn record_relay_outcome(outcome: &'static str) {
    counter!(RELAY_MESSAGES_TOTAL, "outcome" => outcome).increment(1);
}

/// Count one send; `None` means success
pub fn record_send(error_kind: Option<&'static str>) {
    counter!(SENDS_TOTAL, "outcome" => error_kind.unwrap_or(OK)).increment(1);
}

/// Count one directory registration; `None` means accepted
pub fn record_registration(error_kind: Option<&'static str>) {
    counter!(REGISTRATIONS_TOTAL, "outcome" => error_kind.unwrap_or(OK)).increment(1);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}
