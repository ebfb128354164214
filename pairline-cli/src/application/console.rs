use pairline_core::{ReportReason, SessionEvent, UserCommand};

pub const HELP: &str = "\
/search          start searching
/next            skip to the next person
/end             end the session
/ready           reveal your video once the peer is ready too
/mic /cam /share toggle microphone, camera or screen share
/retry           retry camera and microphone
/report REASON [TEXT]  report the peer (nudity, harassment, spam, hate, underage, other)
/block           block the peer
/quit            leave
anything else    chat message";

/// What a console line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(UserCommand),
    Help,
    Quit,
    Invalid(String),
}

/// Parse one line typed by the user
pub fn parse_line(line: &str) -> Option<ConsoleInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Some(ConsoleInput::Command(UserCommand::SendChat {
            text: line.to_string(),
        }));
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default().to_ascii_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let command = match verb.as_str() {
        "search" | "start" => UserCommand::StartSearch,
        "cancel" => UserCommand::CancelSearch,
        "next" | "skip" => UserCommand::Skip,
        "restart" => UserCommand::Restart,
        "end" => UserCommand::End,
        "ready" => UserCommand::MarkReady,
        "mic" => UserCommand::ToggleMic,
        "cam" => UserCommand::ToggleCam,
        "share" => UserCommand::ToggleScreenShare,
        "retry" => UserCommand::RetryMedia,
        "block" => UserCommand::Block,
        "report" => return Some(parse_report(arg)),
        "help" | "?" => return Some(ConsoleInput::Help),
        "quit" | "exit" => return Some(ConsoleInput::Quit),
        other => return Some(ConsoleInput::Invalid(format!("unknown command /{}", other))),
    };
    Some(ConsoleInput::Command(command))
}

fn parse_report(arg: Option<&str>) -> ConsoleInput {
    let Some(arg) = arg else {
        return ConsoleInput::Invalid("usage: /report REASON [TEXT]".to_string());
    };

    let mut parts = arg.splitn(2, char::is_whitespace);
    let reason = parts.next().unwrap_or_default();
    let text = parts
        .next()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    match reason.parse::<ReportReason>() {
        Ok(reason) => ConsoleInput::Command(UserCommand::Report { reason, text }),
        Err(e) => ConsoleInput::Invalid(e.to_string()),
    }
}

/// One line of console output for a session event
pub fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::PhaseChanged { from, to } => format!("· {} → {}", from, to),
        SessionEvent::Matched { peer, role, .. } => {
            let language = peer.language.as_deref().unwrap_or("any language");
            if peer.interests.is_empty() {
                format!("🤝 Matched with a stranger ({}, {:?})", language, role)
            } else {
                format!(
                    "🤝 Matched with a stranger ({}, likes {}, {:?})",
                    language,
                    peer.interests.join(", "),
                    role
                )
            }
        }
        SessionEvent::Connected { .. } => "✅ Connected. Type /ready to reveal video".to_string(),
        SessionEvent::Ended { reason, .. } => format!("🔴 Session ended: {}", reason),
        SessionEvent::RevealChanged { revealed: true } => "👀 Video revealed".to_string(),
        SessionEvent::RevealChanged { revealed: false } => "🙈 Video hidden".to_string(),
        SessionEvent::ChatSent(message) => format!("you: {}", message.text),
        SessionEvent::ChatReceived(message) => format!("stranger: {}", message.text),
        SessionEvent::MediaControlsChanged(controls) => format!(
            "🎛️ mic {} · cam {} · screen {}",
            on_off(controls.mic_enabled),
            on_off(controls.cam_enabled),
            on_off(controls.screen_sharing)
        ),
        SessionEvent::MediaError { reason } => {
            format!("🎥 Media problem: {} (type /retry)", reason)
        }
        SessionEvent::ReportSubmitted { reason, .. } => format!("🚩 Reported for {}", reason),
        SessionEvent::PeerBlocked { .. } => "⛔ Blocked".to_string(),
        SessionEvent::Warning { message } => format!("⚠️ {}", message),
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairline_core::domain::ChatMessage;
    use pairline_core::{EndReason, SessionPhase};

    fn command(line: &str) -> UserCommand {
        match parse_line(line) {
            Some(ConsoleInput::Command(command)) => command,
            other => panic!("Expected command for {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            command("  hello there "),
            UserCommand::SendChat {
                text: "hello there".to_string()
            }
        );
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(command("/next"), UserCommand::Skip);
        assert_eq!(command("/SKIP"), UserCommand::Skip);
        assert_eq!(command("/ready"), UserCommand::MarkReady);
        assert_eq!(command("/share"), UserCommand::ToggleScreenShare);
        assert_eq!(parse_line("/quit"), Some(ConsoleInput::Quit));
        assert_eq!(parse_line("/?"), Some(ConsoleInput::Help));
        assert!(matches!(parse_line("/fly"), Some(ConsoleInput::Invalid(_))));
    }

    #[test]
    fn test_report_parsing() {
        assert_eq!(
            command("/report harassment kept insulting me"),
            UserCommand::Report {
                reason: ReportReason::Harassment,
                text: Some("kept insulting me".to_string()),
            }
        );
        assert_eq!(
            command("/report underage"),
            UserCommand::Report {
                reason: ReportReason::Underage,
                text: None,
            }
        );
        assert!(matches!(parse_line("/report"), Some(ConsoleInput::Invalid(_))));
        assert!(matches!(
            parse_line("/report rudeness"),
            Some(ConsoleInput::Invalid(_))
        ));
    }

    #[test]
    fn test_describe() {
        assert_eq!(
            describe(&SessionEvent::PhaseChanged {
                from: SessionPhase::Idle,
                to: SessionPhase::Searching,
            }),
            format!("· {} → {}", SessionPhase::Idle, SessionPhase::Searching)
        );
        assert_eq!(
            describe(&SessionEvent::ChatReceived(ChatMessage::remote("hi".to_string()))),
            "stranger: hi"
        );
        assert!(describe(&SessionEvent::Ended {
            reason: EndReason::PeerLeft,
            peer_id: None,
        })
        .contains(&EndReason::PeerLeft.to_string()));
    }
}
