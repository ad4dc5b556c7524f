use crate::types::StreamMessage;
use tokio::sync::broadcast;

/// In-process fan-in channel between the ingestion paths and the WebSocket
/// hub. Publishing never blocks; slow subscribers lag and drop.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StreamMessage>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.sender.subscribe()
    }

    pub fn publish(
        &self,
        message: StreamMessage,
    ) -> Result<(), broadcast::error::SendError<StreamMessage>> {
        self.sender.send(message).map(|_| ())
    }
}
