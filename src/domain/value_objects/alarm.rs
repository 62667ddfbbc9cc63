use serde::{Deserialize, Serialize};

/// Latch state of one channel's alarm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmState {
    #[default]
    Normal,
    Triggered,
}

impl std::fmt::Display for AlarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Triggered => write!(f, "TRIGGERED"),
        }
    }
}

/// How a triggered alarm re-arms.
///
/// With `hysteresis == 0.0` the latch re-arms on the first sample at or below the
/// threshold. A positive band requires the temperature to fall to
/// `threshold - hysteresis` before another event can fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmPolicy {
    pub hysteresis: f64,
}

impl AlarmPolicy {
    /// Build a policy, treating negative or non-finite bands as zero.
    #[must_use]
    pub fn with_hysteresis(hysteresis: f64) -> Self {
        let hysteresis = if hysteresis.is_finite() {
            hysteresis.max(0.0)
        } else {
            0.0
        };
        Self { hysteresis }
    }

    #[must_use]
    pub fn rearm_level(&self, threshold: f64) -> f64 {
        threshold - self.hysteresis
    }
}
