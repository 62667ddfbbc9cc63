use serde::{Deserialize, Serialize};

/// Lifecycle of the acquisition scheduler.
///
/// Transitions only move forward: `Idle → Running → Stopping → Stopped`.
/// `Idle → Stopped` is allowed when a scheduler is stopped before it ever ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchedulerState {
    #[default]
    Idle,
    Running,
    Stopping,
    Stopped,
}

impl SchedulerState {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running | Self::Stopped)
                | (Self::Running, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }

    #[must_use]
    pub const fn accepts_cycles(self) -> bool {
        matches!(self, Self::Running)
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_only() {
        use SchedulerState::{Idle, Running, Stopped, Stopping};
        assert!(Idle.can_transition_to(Running));
        assert!(Idle.can_transition_to(Stopped));
        assert!(Running.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));

        assert!(!Running.can_transition_to(Idle));
        assert!(!Stopped.can_transition_to(Running));
        assert!(!Stopping.can_transition_to(Running));
        assert!(!Running.can_transition_to(Running));
    }

    #[test]
    fn only_running_accepts_cycles() {
        assert!(SchedulerState::Running.accepts_cycles());
        assert!(!SchedulerState::Stopping.accepts_cycles());
        assert!(!SchedulerState::Idle.accepts_cycles());
    }
}
