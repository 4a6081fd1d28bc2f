use serde::{Deserialize, Serialize};

/// Coarse phase of the chat stream for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    #[default]
    Idle,
    Submitted,
    Streaming,
    Success,
    Error,
}

impl LifecycleStatus {
    /// `submitted` or `streaming`: a turn is in flight.
    pub fn is_loading(self) -> bool {
        matches!(self, LifecycleStatus::Submitted | LifecycleStatus::Streaming)
    }

    /// Whether `next` is a legal move from `self`.
    ///
    /// Within a turn the status only moves forward; `submitted` opens a new
    /// turn from anywhere and `idle` resets from anywhere.
    pub fn can_advance_to(self, next: LifecycleStatus) -> bool {
        use LifecycleStatus::*;
        match next {
            Idle | Submitted => true,
            Streaming => matches!(self, Submitted | Streaming),
            Success | Error => matches!(self, Submitted | Streaming),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleStatus::*;

    #[test]
    fn terminal_states_only_follow_in_flight_states() {
        assert!(Submitted.can_advance_to(Success));
        assert!(Streaming.can_advance_to(Error));
        assert!(!Success.can_advance_to(Error));
        assert!(!Idle.can_advance_to(Streaming));
        assert!(Success.can_advance_to(Submitted));
    }
}
