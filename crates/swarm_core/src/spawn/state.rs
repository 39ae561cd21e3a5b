use std::fmt;

/// Lifecycle of one spawn call. Transitions only move forward.
///
/// ```text
/// Pending -> Dispatched -> AllChunksDone -> PlayedBack -> Completed
///                 \______________\_______________\______-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnState {
    Pending,
    Dispatched,
    AllChunksDone,
    PlayedBack,
    Completed,
    Failed,
}

impl SpawnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SpawnState::Completed | SpawnState::Failed)
    }

    pub fn can_advance_to(self, next: SpawnState) -> bool {
        use SpawnState::*;
        matches!(
            (self, next),
            (Pending, Dispatched)
                | (Dispatched, AllChunksDone)
                | (AllChunksDone, PlayedBack)
                | (PlayedBack, Completed)
                | (Dispatched, Failed)
                | (AllChunksDone, Failed)
                | (PlayedBack, Failed)
        )
    }
}

impl fmt::Display for SpawnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpawnState::Pending => "pending",
            SpawnState::Dispatched => "dispatched",
            SpawnState::AllChunksDone => "all-chunks-done",
            SpawnState::PlayedBack => "played-back",
            SpawnState::Completed => "completed",
            SpawnState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::SpawnState::*;
    use super::*;

    #[test]
    fn happy_path_is_linear() {
        let path = [Pending, Dispatched, AllChunksDone, PlayedBack, Completed];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(Completed.is_terminal());
    }

    #[test]
    fn no_backward_or_terminal_exits() {
        assert!(!Dispatched.can_advance_to(Pending));
        assert!(!PlayedBack.can_advance_to(AllChunksDone));
        assert!(!Completed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Completed));
        assert!(!Pending.can_advance_to(Failed));
        assert!(Dispatched.can_advance_to(Failed));
        assert!(PlayedBack.can_advance_to(Failed));
    }
}
