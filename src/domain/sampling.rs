use std::time::Duration;

/// Immutable sampling knobs handed to the policy.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingConfig {
    /// Desired update period.
    pub interval: Duration,
    /// Minimum allowed period for coalesced updates.
    pub fastest_interval: Duration,
    /// Maximum accuracy radius that is still accepted. A fix passes the gate iff its
    /// accuracy is less than or equal to this value.
    pub accuracy_threshold_meters: f64,
    /// Movement threshold before a new fix is requested. Declared for parity with the
    /// platform request surface but not wired into any request or filter.
    pub min_displacement_meters: f64,
}

impl SamplingConfig {
    /// Flags suspicious configurations without correcting them. The fastest interval is
    /// meant to be the floor and the interval the target, so fastest > interval is inverted.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.fastest_interval > self.interval {
            warnings.push(format!(
                "fastest_interval_ms ({}) exceeds interval_ms ({}), which inverts the usual meaning of the two knobs",
                self.fastest_interval.as_millis(),
                self.interval.as_millis()
            ));
        }

        warnings
    }
}
