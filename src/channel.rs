//! Bidirectional byte-link abstraction.
//!
//! The ARQ state machines never touch a modem directly; they talk to a
//! [`Channel`], which delivers whole encoded frames or nothing.  That
//! mirrors the acoustic PHY's behaviour: a transmission either decodes in
//! one piece on the far side or is lost entirely — frames are never merged
//! or split, and bytes within a frame are never reordered.
//!
//! Implementations:
//! - [`memory_link`] — an in-process pair of endpoints with a fixed
//!   one-way latency, used by the test suites and the CLI smoke driver.
//! - [`crate::simulator::LossyChannel`] — wraps any channel with a
//!   drop/corrupt fault model.
//! - A real acoustic modem backend lives outside this crate; it only has
//!   to implement the trait.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

/// Errors that can arise from channel operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// No frame arrived within the requested window.
    #[error("timed out waiting for a frame")]
    Timeout,
    /// The peer endpoint is gone; no further frames will ever arrive.
    #[error("channel closed by peer")]
    Closed,
}

/// One endpoint of a symmetric frame-carrying link.
///
/// `Send` is a supertrait so endpoints can move onto spawned tasks and the
/// returned futures stay `Send` for any implementation.
pub trait Channel: Send {
    /// Transmit one encoded frame.  Completion means "handed to the
    /// medium", not "delivered".
    fn send(
        &mut self,
        frame: &[u8],
    ) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;

    /// Wait up to `timeout` for the next frame.
    fn recv(
        &mut self,
        timeout: Duration,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, ChannelError>> + Send;
}

// ---------------------------------------------------------------------------
// In-memory link
// ---------------------------------------------------------------------------

/// In-flight frame: the instant it becomes receivable, plus its bytes.
type Transit = (Instant, Vec<u8>);

/// One endpoint of an in-process link created by [`memory_link`].
#[derive(Debug)]
pub struct MemoryChannel {
    tx: mpsc::UnboundedSender<Transit>,
    rx: mpsc::UnboundedReceiver<Transit>,
    latency: Duration,
    /// A frame pulled off the queue whose delivery instant lay beyond the
    /// caller's deadline; surfaced on the next `recv`.
    pending: Option<Transit>,
}

/// Create a connected pair of endpoints with the given one-way latency.
///
/// Frames sent on one endpoint become receivable on the other `latency`
/// later, in send order.
pub fn memory_link(latency: Duration) -> (MemoryChannel, MemoryChannel) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    let a = MemoryChannel {
        tx: a_tx,
        rx: a_rx,
        latency,
        pending: None,
    };
    let b = MemoryChannel {
        tx: b_tx,
        rx: b_rx,
        latency,
        pending: None,
    };
    (a, b)
}

impl Channel for MemoryChannel {
    async fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        let due = Instant::now() + self.latency;
        self.tx
            .send((due, frame.to_vec()))
            .map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        let deadline = Instant::now() + timeout;

        let (due, bytes) = match self.pending.take() {
            Some(item) => item,
            None => match time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(item)) => item,
                Ok(None) => return Err(ChannelError::Closed),
                Err(_) => return Err(ChannelError::Timeout),
            },
        };

        if due > deadline {
            // Still in flight when the caller's window ends: keep it for
            // the next call and honour the timeout contract.
            self.pending = Some((due, bytes));
            time::sleep_until(deadline).await;
            return Err(ChannelError::Timeout);
        }

        time::sleep_until(due).await;
        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
