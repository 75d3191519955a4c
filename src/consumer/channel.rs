//! In-process message source over a tokio mpsc channel.
//!
//! Each item is either a message value or a receive error to surface.
//! Dropping every sender closes the source.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{InboundMessage, MessageSource, SourceError};

/// Item accepted by a [`ChannelSource`]: a message value or a simulated
/// receive failure.
pub type ChannelItem = Result<Vec<u8>, String>;

/// [`MessageSource`] fed from a bounded channel. Offsets count up from 0 on
/// a single partition.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<ChannelItem>,
    next_offset: i64,
}

impl ChannelSource {
    /// Creates a source and the sender that feeds it.
    #[must_use]
    pub fn new(capacity: usize) -> (mpsc::Sender<ChannelItem>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            tx,
            Self {
                rx,
                next_offset: 0,
            },
        )
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    async fn recv(&mut self) -> Result<InboundMessage, SourceError> {
        match self.rx.recv().await {
            Some(Ok(payload)) => {
                let offset = self.next_offset;
                self.next_offset += 1;
                Ok(InboundMessage {
                    payload,
                    partition: 0,
                    offset,
                })
            }
            Some(Err(reason)) => Err(SourceError::Receive(reason)),
            None => Err(SourceError::Closed),
        }
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_messages_then_closes() {
        let (tx, mut source) = ChannelSource::new(4);
        let _ = tx.send(Ok(b"a".to_vec())).await;
        let _ = tx.send(Err("boom".to_string())).await;
        let _ = tx.send(Ok(b"b".to_vec())).await;
        drop(tx);

        let Ok(first) = source.recv().await else {
            panic!("expected message");
        };
        assert_eq!(first.offset, 0);
        assert_eq!(
            source.recv().await,
            Err(SourceError::Receive("boom".to_string()))
        );
        let Ok(second) = source.recv().await else {
            panic!("expected message");
        };
        assert_eq!(second.payload, b"b");
        assert_eq!(second.offset, 1);
        assert_eq!(source.recv().await, Err(SourceError::Closed));
    }
}
