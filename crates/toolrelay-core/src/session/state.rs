//! Turn state machine

/// Where a conversation is within its current turn
///
/// ```text
/// AwaitingInput -> RequestSent -> PlainAnswer -> Done
///                       |
///                       v
///               ToolCallsDetected -> ToolsExecuting -> FollowUpSent -> ...
/// ```
///
/// `Aborted` ends a turn early (transport failure, turn limit, cancellation).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnState {
    #[default]
    AwaitingInput,
    RequestSent,
    PlainAnswer,
    ToolCallsDetected,
    ToolsExecuting,
    FollowUpSent,
    Done,
    Aborted,
}

impl TurnState {
    /// Whether the turn has ended and a new one may begin
    pub fn is_idle(self) -> bool {
        matches!(self, TurnState::AwaitingInput | TurnState::Done | TurnState::Aborted)
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: TurnState) -> bool {
        use TurnState::*;
        match (self, next) {
            (_, Aborted) => !self.is_idle(),
            (AwaitingInput | Done | Aborted, RequestSent) => true,
            (RequestSent | FollowUpSent, PlainAnswer | ToolCallsDetected) => true,
            (ToolCallsDetected, ToolsExecuting) => true,
            (ToolsExecuting, FollowUpSent) => true,
            (PlainAnswer, Done) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnState::AwaitingInput => "AwaitingInput",
            TurnState::RequestSent => "RequestSent",
            TurnState::PlainAnswer => "PlainAnswer",
            TurnState::ToolCallsDetected => "ToolCallsDetected",
            TurnState::ToolsExecuting => "ToolsExecuting",
            TurnState::FollowUpSent => "FollowUpSent",
            TurnState::Done => "Done",
            TurnState::Aborted => "Aborted",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_paths() {
        use TurnState::*;
        let plain = [AwaitingInput, RequestSent, PlainAnswer, Done];
        for pair in plain.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }

        let with_tools = [
            Done,
            RequestSent,
            ToolCallsDetected,
            ToolsExecuting,
            FollowUpSent,
            ToolCallsDetected,
            ToolsExecuting,
            FollowUpSent,
            PlainAnswer,
            Done,
        ];
        for pair in with_tools.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_illegal_transitions() {
        use TurnState::*;
        assert!(!AwaitingInput.can_transition_to(ToolsExecuting));
        assert!(!ToolsExecuting.can_transition_to(Done));
        assert!(!Done.can_transition_to(Aborted));
        assert!(RequestSent.can_transition_to(Aborted));
    }
}
