use pairline_core::Report;
use tokio::sync::mpsc;

/// Destination for abuse reports
///
/// Submission is fire-and-forget; a sink never blocks the control loop.
pub trait ModerationSink: Send {
    fn submit(&mut self, report: Report);
}

/// Writes reports to the log as structured fields
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ModerationSink for TracingSink {
    fn submit(&mut self, report: Report) {
        tracing::warn!(
            reason = %report.reason,
            peer_id = %report.peer_id,
            reporter_id = %report.reporter_id,
            at_ms = report.at.as_millis(),
            text = report.text.as_deref().unwrap_or(""),
            "🚩 Report submitted"
        );
    }
}

/// Forwards reports to an async consumer
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Report>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Report>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ModerationSink for ChannelSink {
    fn submit(&mut self, report: Report) {
        if self.tx.send(report).is_err() {
            tracing::warn!("⚠️ Moderation consumer gone, report dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pairline_core::{ParticipantId, ReportReason, Timestamp};

    fn report() -> Report {
        Report {
            reason: ReportReason::Spam,
            peer_id: ParticipantId::new(),
            reporter_id: ParticipantId::new(),
            text: None,
            at: Timestamp::now(),
        }
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (mut sink, mut rx) = ChannelSink::new();
        let report = report();

        sink.submit(report.clone());
        assert_eq!(rx.try_recv().unwrap(), report);
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (mut sink, rx) = ChannelSink::new();
        drop(rx);
        sink.submit(report());
    }
}
