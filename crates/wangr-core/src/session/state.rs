/// Lifecycle of one open view.
///
/// `Idle -> Fetching -> Idle` for every refresh, and any state to `Closed`
/// exactly once. There is no way back from `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Fetching,
    Closed,
}

impl SessionState {
    /// Marks a refresh as started. False when one is already running or the
    /// view is closed.
    pub fn begin_fetch(&mut self) -> bool {
        if *self == SessionState::Idle {
            *self = SessionState::Fetching;
            true
        } else {
            false
        }
    }

    pub fn finish_fetch(&mut self) -> bool {
        if *self == SessionState::Fetching {
            *self = SessionState::Idle;
            true
        } else {
            false
        }
    }

    /// False when already closed.
    pub fn close(&mut self) -> bool {
        if *self == SessionState::Closed {
            false
        } else {
            *self = SessionState::Closed;
            true
        }
    }

    pub fn is_fetching(&self) -> bool {
        *self == SessionState::Fetching
    }

    pub fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_one_fetch_at_a_time() {
        let mut state = SessionState::default();
        assert!(state.begin_fetch());
        assert!(state.is_fetching());
        assert!(!state.begin_fetch());
        assert!(state.finish_fetch());
        assert!(!state.is_fetching());
        assert!(!state.finish_fetch());
        assert!(state.begin_fetch());
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut state = SessionState::Fetching;
        assert!(state.close());
        assert!(!state.close());
        assert!(!state.begin_fetch());
        assert!(!state.finish_fetch());
        assert!(state.is_closed());
    }
}
