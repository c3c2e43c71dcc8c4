use std::fmt;

/// Lifecycle of the log retention task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// Waiting for the next period
    Idle,
    /// Started before the gateway connection was ready
    AwaitingReadiness,
    Sweeping,
}

impl fmt::Display for SweepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SweepState::Idle => "idle",
            SweepState::AwaitingReadiness => "awaiting-readiness",
            SweepState::Sweeping => "sweeping",
        };
        f.write_str(name)
    }
}
