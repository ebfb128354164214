use crate::application::UserCommand;
use std::collections::VecDeque;

/// User commands waiting for the next pass of the control loop
///
/// A command equal to the one already at the back is folded into it when
/// applying it twice would only fail the second time (a double-pressed Skip
/// or End). Toggles and chat lines are always kept.
#[derive(Debug)]
pub struct CommandQueue {
    pending: VecDeque<UserCommand>,
    limit: usize,
    folded: u64,
}

impl CommandQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            limit,
            folded: 0,
        }
    }

    /// Queue `command`; returns false when it was folded into the previous one
    pub fn push(&mut self, command: UserCommand) -> Result<bool, QueueError> {
        if is_idempotent(&command) && self.pending.back() == Some(&command) {
            self.folded += 1;
            tracing::debug!("Folded repeated {}", command.action());
            return Ok(false);
        }

        if self.pending.len() >= self.limit {
            return Err(QueueError::Full { max: self.limit });
        }
        self.pending.push_back(command);
        Ok(true)
    }

    pub fn pop(&mut self) -> Option<UserCommand> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Repeated commands dropped so far
    pub fn folded(&self) -> u64 {
        self.folded
    }
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new(64)
    }
}

fn is_idempotent(command: &UserCommand) -> bool {
    matches!(
        command,
        UserCommand::StartSearch
            | UserCommand::CancelSearch
            | UserCommand::Restart
            | UserCommand::End
            | UserCommand::Skip
            | UserCommand::MarkReady
            | UserCommand::RetryMedia
            | UserCommand::Block
    )
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueueError {
    #[error("Too many pending commands (limit {max})")]
    Full { max: usize },
}
