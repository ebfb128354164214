use crate::domain::ReportReason;

/// Actions the local user can take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Start looking for a partner (Idle or Ended)
    StartSearch,

    /// Stop looking (Searching only)
    CancelSearch,

    /// Look for the next partner after a pairing ended (rate-limited after a skip)
    Restart,

    /// Leave the current pairing
    End,

    /// Leave the current pairing and move on
    Skip,

    /// Opt in to revealing video
    MarkReady,

    ToggleMic,
    ToggleCam,
    ToggleScreenShare,

    /// Re-acquire camera/microphone after a failure
    RetryMedia,

    SendChat { text: String },

    Report {
        reason: ReportReason,
        text: Option<String>,
    },

    /// Block the current (or last) peer and end the pairing
    Block,
}

impl UserCommand {
    /// Verb used in error messages
    pub fn action(&self) -> &'static str {
        match self {
            UserCommand::StartSearch => "start search",
            UserCommand::CancelSearch => "cancel search",
            UserCommand::Restart => "restart",
            UserCommand::End => "end",
            UserCommand::Skip => "skip",
            UserCommand::MarkReady => "mark ready",
            UserCommand::ToggleMic => "toggle microphone",
            UserCommand::ToggleCam => "toggle camera",
            UserCommand::ToggleScreenShare => "toggle screen share",
            UserCommand::RetryMedia => "retry media",
            UserCommand::SendChat { .. } => "send chat",
            UserCommand::Report { .. } => "report",
            UserCommand::Block => "block",
        }
    }
}
