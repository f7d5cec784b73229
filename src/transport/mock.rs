//! In-memory transport double for unit tests.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::MessageTransport;

/// What the transport saw, shared with the test body.
#[derive(Debug, Default)]
pub(crate) struct Recorded {
    pub fetches: usize,
    pub sent: Vec<Message>,
    pub closes: Vec<Option<CloseFrame>>,
    pub flushes: usize,
}

/// Scripted transport: replays queued inbound items, records outbound ones.
///
/// Once the inbound queue is empty `recv_message` never resolves, like an
/// idle peer.
pub(crate) struct MockTransport {
    inbound: VecDeque<Option<Result<Message, WsError>>>,
    recorded: Arc<Mutex<Recorded>>,
    stall_sends: bool,
    close_error: Option<WsError>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            inbound: VecDeque::new(),
            recorded: Arc::new(Mutex::new(Recorded::default())),
            stall_sends: false,
            close_error: None,
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.inbound
            .push_back(Some(Ok(Message::text(text.to_owned()))));
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.inbound.push_back(Some(Ok(message)));
        self
    }

    pub fn with_error(mut self, error: WsError) -> Self {
        self.inbound.push_back(Some(Err(error)));
        self
    }

    pub fn with_end(mut self) -> Self {
        self.inbound.push_back(None);
        self
    }

    /// Makes every send hang forever, like a peer that stopped reading.
    pub fn stalled(mut self) -> Self {
        self.stall_sends = true;
        self
    }

    pub fn failing_close(mut self, error: WsError) -> Self {
        self.close_error = Some(error);
        self
    }

    pub fn recorded(&self) -> Arc<Mutex<Recorded>> {
        Arc::clone(&self.recorded)
    }
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn recv_message(&mut self) -> Option<Result<Message, WsError>> {
        self.recorded.lock().fetches += 1;
        match self.inbound.pop_front() {
            Some(item) => item,
            None => pending().await,
        }
    }

    async fn send_message(&mut self, message: Message) -> Result<(), WsError> {
        if self.stall_sends {
            pending::<()>().await;
        }
        self.recorded.lock().sent.push(message);
        Ok(())
    }

    async fn close_with(&mut self, frame: Option<CloseFrame>) -> Result<(), WsError> {
        self.recorded.lock().closes.push(frame);
        match self.close_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn flush_pending(&mut self) -> Result<(), WsError> {
        self.recorded.lock().flushes += 1;
        Ok(())
    }
}
