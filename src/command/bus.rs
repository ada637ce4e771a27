use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, warn};

use super::types::GraphCommand;

/// Commands in flight before the sender starts dropping
pub const COMMAND_CAPACITY: usize = 1024;

/// Control-to-audio command channel
pub struct CommandBus {
    tx: Sender<GraphCommand>,
    rx: Receiver<GraphCommand>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::with_capacity(COMMAND_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Get a sender that can be cloned and shared
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Get a receiver (typically for the audio thread)
    pub fn receiver(&self) -> CommandReceiver {
        CommandReceiver {
            rx: self.rx.clone(),
        }
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sender for dispatching commands
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<GraphCommand>,
}

impl CommandSender {
    /// Send a command (non-blocking, drops if buffer full)
    pub fn send(&self, cmd: GraphCommand) -> bool {
        debug!(command = %cmd.description(), "graph command");
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                warn!("command buffer full, dropping {}", cmd.description());
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receiver for consuming commands
#[derive(Clone)]
pub struct CommandReceiver {
    rx: Receiver<GraphCommand>,
}

impl CommandReceiver {
    /// Try to receive a command (non-blocking)
    pub fn try_recv(&self) -> Option<GraphCommand> {
        self.rx.try_recv().ok()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_receive_in_order() {
        let bus = CommandBus::new();
        let tx = bus.sender();
        let rx = bus.receiver();
        assert!(tx.send(GraphCommand::SetDelayMix(0.3)));
        assert!(tx.send(GraphCommand::StopCapture));
        assert_eq!(rx.pending(), 2);
        assert!(matches!(rx.try_recv(), Some(GraphCommand::SetDelayMix(_))));
        assert!(matches!(rx.try_recv(), Some(GraphCommand::StopCapture)));
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_full_buffer_drops() {
        let bus = CommandBus::with_capacity(1);
        let tx = bus.sender();
        assert!(tx.send(GraphCommand::StopCapture));
        assert!(!tx.send(GraphCommand::StopCapture));
    }
}
