//! Message-level send/receive drivers for both ARQ variants.
//!
//! # Architecture
//!
//! ```text
//!  Application
//!      │  send_message(payload) / recv_message()
//!      ▼
//!  SawLink / GbnLink
//!    ├── SawSender / GbnSender     (outbound state machine)
//!    ├── SawReceiver / GbnReceiver (inbound state machine)
//!    └── RetransmitTimer           (one timer per endpoint)
//!      │ encoded frames
//!      ▼
//!  Channel (acoustic modem, in-memory link, lossy simulator, …)
//! ```
//!
//! Each driver is a single-task cooperative loop: it alternates
//! `channel.recv(timeout = time left on the retransmit timer)` with state
//! transitions, so waiting for a frame and waiting for the timer share one
//! suspension point.  There is no shared-mutable state and no background
//! task.
//!
//! Frames that fail to decode are logged and treated as if they had never
//! arrived; frames a well-behaved peer could not produce are logged and
//! dropped without aborting the session.
//!
//! A receiving endpoint should call [`SawLink::recv_message`] (or the GBN
//! equivalent) in a loop: retransmitted frames of an already-delivered
//! message are re-acknowledged transparently by the next call, which is
//! what lets the sender finish when the final ACK of a message was lost.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::channel::{Channel, ChannelError};
use crate::config::{ArqConfig, ConfigError};
use crate::frame::Frame;
use crate::gbn_receiver::GbnReceiver;
use crate::gbn_sender::GbnSender;
use crate::saw_receiver::SawReceiver;
use crate::saw_sender::SawSender;
use crate::timer::RetransmitTimer;

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

/// Errors surfaced by `send_message` / `recv_message`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArqError {
    /// The message needs more than 255 fragments; split it at a higher
    /// layer.
    #[error("message of {len} bytes exceeds the {max}-byte limit")]
    Oversize { len: usize, max: usize },
    /// The retry budget ran out without full acknowledgement.
    #[error("peer unreachable after {retries} timeouts")]
    Unreachable { retries: u32 },
    /// `recv_message` saw no decodable frame within the idle timeout.
    #[error("no frame arrived before the idle timeout")]
    Timeout,
    /// The peer endpoint is gone.
    #[error("channel closed")]
    Closed,
}

/// Outcome of a successful `send_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    /// Fragments the message was split into.
    pub frames: u8,
    /// Retransmission timeouts survived along the way.
    pub retries: u32,
    /// DATA transmissions, first attempts and retransmissions alike.
    pub data_sent: u32,
    /// High-water mark of simultaneously outstanding frames (always 1 for
    /// Stop-and-Wait).
    pub max_in_flight: u8,
    /// Wall-clock duration of the send.
    pub duration: Duration,
}

impl SendReport {
    fn new(frames: u8) -> Self {
        Self {
            frames,
            retries: 0,
            data_sent: 0,
            max_in_flight: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Allocator for per-message ids.
///
/// Ids only need to distinguish a message from its neighbours in time so
/// stale frames are recognisable, so a wrapping counter is enough.
#[derive(Debug)]
pub struct MsgIdGen {
    next: u8,
}

impl MsgIdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> u8 {
        let id = self.next;
        self.next = self.next.wrapping_add(1);
        id
    }
}

impl Default for MsgIdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Stop-and-Wait driver
// ---------------------------------------------------------------------------

/// A Stop-and-Wait endpoint over an arbitrary [`Channel`].
#[derive(Debug)]
pub struct SawLink<C> {
    channel: C,
    config: ArqConfig,
    ids: MsgIdGen,
    receiver: SawReceiver,
}

impl<C: Channel> SawLink<C> {
    /// Build an endpoint; fails when the configuration is out of range.
    pub fn new(channel: C, config: ArqConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            channel,
            config,
            ids: MsgIdGen::new(),
            receiver: SawReceiver::new(),
        })
    }

    /// Deliver `payload` to the peer, one fragment at a time.
    ///
    /// Returns once every fragment has been acknowledged, or fails with
    /// [`ArqError::Unreachable`] when any single fragment exhausts the
    /// retry budget.
    pub async fn send_message(&mut self, payload: &[u8]) -> Result<SendReport, ArqError> {
        let max = self.config.max_message_len();
        if payload.len() > max {
            return Err(ArqError::Oversize {
                len: payload.len(),
                max,
            });
        }

        let msg_id = self.ids.next_id();
        let mut tx = SawSender::new(msg_id, payload, self.config.max_payload);
        let mut timer = RetransmitTimer::new(self.config.timeout);
        let mut report = SendReport::new(tx.total());
        report.max_in_flight = 1;
        let started = Instant::now();

        log::debug!(
            "[saw] send msg_id={msg_id} len={} total={}",
            payload.len(),
            tx.total()
        );

        while !tx.is_complete() {
            let seq = tx.next_seq;
            self.channel
                .send(tx.current_frame())
                .await
                .map_err(|_| ArqError::Closed)?;
            report.data_sent += 1;
            timer.arm();
            log::debug!("[saw] → DATA seq={seq}");

            let mut timeouts_here = 0u32;
            loop {
                let wait = timer.remaining().unwrap_or(self.config.timeout);
                match self.channel.recv(wait).await {
                    Ok(bytes) => match Frame::decode(&bytes) {
                        Ok(Frame::Ack(ack)) => {
                            if tx.on_ack(&ack) {
                                timer.cancel();
                                log::debug!("[saw] ← ACK seq={}", ack.seq);
                                break;
                            }
                            log::debug!(
                                "[saw] ignoring ACK msg_id={} seq={} (waiting for {seq})",
                                ack.msg_id,
                                ack.seq
                            );
                        }
                        Ok(Frame::Data(data)) => {
                            log::warn!(
                                "[saw] unexpected DATA seq={} while sending — dropped",
                                data.seq
                            );
                        }
                        Err(err) => log::debug!("[saw] dropping frame: {err}"),
                    },
                    Err(ChannelError::Timeout) => {
                        timeouts_here += 1;
                        report.retries += 1;
                        if timeouts_here >= self.config.max_retries {
                            log::warn!("[saw] giving up on seq={seq} after {timeouts_here} timeouts");
                            return Err(ArqError::Unreachable {
                                retries: report.retries,
                            });
                        }
                        log::debug!("[saw] timeout — retransmitting seq={seq}");
                        self.channel
                            .send(tx.current_frame())
                            .await
                            .map_err(|_| ArqError::Closed)?;
                        report.data_sent += 1;
                        timer.arm();
                    }
                    Err(ChannelError::Closed) => return Err(ArqError::Closed),
                }
            }
        }

        report.duration = started.elapsed();
        log::debug!(
            "[saw] done msg_id={msg_id} retries={} data_sent={}",
            report.retries,
            report.data_sent
        );
        Ok(report)
    }

    /// Wait for the next complete message from the peer.
    ///
    /// Fails with [`ArqError::Timeout`] after `idle_timeout` without a
    /// single decodable frame, discarding any partial reassembly state.
    pub async fn recv_message(&mut self) -> Result<Vec<u8>, ArqError> {
        loop {
            match self.channel.recv(self.config.idle_timeout).await {
                Ok(bytes) => match Frame::decode(&bytes) {
                    Ok(Frame::Data(data)) => {
                        match self.receiver.on_data(&data) {
                            Some(ack_seq) => {
                                log::debug!(
                                    "[saw] ← DATA seq={}/{}; → ACK seq={ack_seq}",
                                    data.seq,
                                    data.total - 1
                                );
                                let ack = Frame::ack(data.msg_id, ack_seq).encode();
                                self.channel
                                    .send(&ack)
                                    .await
                                    .map_err(|_| ArqError::Closed)?;
                            }
                            None => log::warn!(
                                "[saw] dropping DATA msg_id={} seq={} (out of session)",
                                data.msg_id,
                                data.seq
                            ),
                        }
                        if let Some(message) = self.receiver.take_message() {
                            return Ok(message);
                        }
                    }
                    Ok(Frame::Ack(ack)) => {
                        log::debug!("[saw] ignoring ACK seq={} while receiving", ack.seq);
                    }
                    Err(err) => log::debug!("[saw] dropping frame: {err}"),
                },
                Err(ChannelError::Timeout) => {
                    self.receiver.reset_partial();
                    return Err(ArqError::Timeout);
                }
                Err(ChannelError::Closed) => return Err(ArqError::Closed),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Go-Back-N driver
// ---------------------------------------------------------------------------

/// A Go-Back-N endpoint over an arbitrary [`Channel`].
#[derive(Debug)]
pub struct GbnLink<C> {
    channel: C,
    config: ArqConfig,
    ids: MsgIdGen,
    receiver: GbnReceiver,
}

impl<C: Channel> GbnLink<C> {
    /// Build an endpoint; fails when the configuration is out of range.
    pub fn new(channel: C, config: ArqConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            channel,
            config,
            ids: MsgIdGen::new(),
            receiver: GbnReceiver::new(),
        })
    }

    /// Deliver `payload` to the peer with a sliding window of `window`
    /// fragments.
    ///
    /// The retry budget is shared across the whole message: every timeout
    /// retransmits the full outstanding window and counts once.
    pub async fn send_message(&mut self, payload: &[u8]) -> Result<SendReport, ArqError> {
        let max = self.config.max_message_len();
        if payload.len() > max {
            return Err(ArqError::Oversize {
                len: payload.len(),
                max,
            });
        }

        let msg_id = self.ids.next_id();
        let mut tx = GbnSender::new(
            msg_id,
            payload,
            self.config.max_payload,
            self.config.window,
        );
        let mut timer = RetransmitTimer::new(self.config.timeout);
        let mut report = SendReport::new(tx.total());
        let started = Instant::now();

        log::debug!(
            "[gbn] send msg_id={msg_id} len={} total={} window={}",
            payload.len(),
            tx.total(),
            self.config.window
        );

        while !tx.is_complete() {
            // Fill the window before listening.
            while tx.can_send() {
                if !tx.has_unacked() {
                    // First frame to enter an empty window starts the timer.
                    timer.arm();
                }
                self.channel
                    .send(tx.next_frame())
                    .await
                    .map_err(|_| ArqError::Closed)?;
                tx.record_sent();
                report.data_sent += 1;
                report.max_in_flight = report.max_in_flight.max(tx.in_flight());
                log::debug!(
                    "[gbn] → DATA seq={} in_flight={}",
                    tx.next_seq - 1,
                    tx.in_flight()
                );
            }

            let wait = timer.remaining().unwrap_or(self.config.timeout);
            match self.channel.recv(wait).await {
                Ok(bytes) => match Frame::decode(&bytes) {
                    Ok(Frame::Ack(ack)) => {
                        let newly_acked = tx.on_ack(&ack);
                        if newly_acked > 0 {
                            log::debug!("[gbn] ← ACK seq={} slid={newly_acked}", ack.seq);
                            if tx.has_unacked() {
                                // Restart the timer for the new oldest frame.
                                timer.arm();
                            } else {
                                timer.cancel();
                            }
                        } else {
                            log::debug!(
                                "[gbn] ignoring ACK msg_id={} seq={} (base={})",
                                ack.msg_id,
                                ack.seq,
                                tx.base
                            );
                        }
                    }
                    Ok(Frame::Data(data)) => {
                        log::warn!(
                            "[gbn] unexpected DATA seq={} while sending — dropped",
                            data.seq
                        );
                    }
                    Err(err) => log::debug!("[gbn] dropping frame: {err}"),
                },
                Err(ChannelError::Timeout) => {
                    report.retries += 1;
                    if report.retries >= self.config.max_retries {
                        log::warn!(
                            "[gbn] giving up at base={} after {} timeouts",
                            tx.base,
                            report.retries
                        );
                        return Err(ArqError::Unreachable {
                            retries: report.retries,
                        });
                    }
                    log::debug!(
                        "[gbn] timeout — retransmitting {} frame(s) from base={}",
                        tx.in_flight(),
                        tx.base
                    );
                    for frame in tx.window_frames() {
                        self.channel
                            .send(frame)
                            .await
                            .map_err(|_| ArqError::Closed)?;
                        report.data_sent += 1;
                    }
                    timer.arm();
                }
                Err(ChannelError::Closed) => return Err(ArqError::Closed),
            }
        }

        report.duration = started.elapsed();
        log::debug!(
            "[gbn] done msg_id={msg_id} retries={} data_sent={} max_in_flight={}",
            report.retries,
            report.data_sent,
            report.max_in_flight
        );
        Ok(report)
    }

    /// Wait for the next complete message from the peer.
    ///
    /// Fails with [`ArqError::Timeout`] after `idle_timeout` without a
    /// single decodable frame, discarding any partial reassembly state.
    pub async fn recv_message(&mut self) -> Result<Vec<u8>, ArqError> {
        loop {
            match self.channel.recv(self.config.idle_timeout).await {
                Ok(bytes) => match Frame::decode(&bytes) {
                    Ok(Frame::Data(data)) => {
                        match self.receiver.on_data(&data) {
                            Some(ack_seq) => {
                                log::debug!(
                                    "[gbn] ← DATA seq={}/{}; → ACK seq={ack_seq}",
                                    data.seq,
                                    data.total - 1
                                );
                                let ack = Frame::ack(data.msg_id, ack_seq).encode();
                                self.channel
                                    .send(&ack)
                                    .await
                                    .map_err(|_| ArqError::Closed)?;
                            }
                            None => log::debug!(
                                "[gbn] dropping DATA msg_id={} seq={} (nothing to acknowledge)",
                                data.msg_id,
                                data.seq
                            ),
                        }
                        if let Some(message) = self.receiver.take_message() {
                            return Ok(message);
                        }
                    }
                    Ok(Frame::Ack(ack)) => {
                        log::debug!("[gbn] ignoring ACK seq={} while receiving", ack.seq);
                    }
                    Err(err) => log::debug!("[gbn] dropping frame: {err}"),
                },
                Err(ChannelError::Timeout) => {
                    self.receiver.reset_partial();
                    return Err(ArqError::Timeout);
                }
                Err(ChannelError::Closed) => return Err(ArqError::Closed),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::memory_link;

    #[test]
    fn msg_id_gen_wraps() {
        let mut ids = MsgIdGen::new();
        let first = ids.next_id();
        for _ in 0..255 {
            ids.next_id();
        }
        assert_eq!(ids.next_id(), first);
    }

    #[tokio::test]
    async fn oversize_is_rejected_before_any_frame() {
        let (a, mut b) = memory_link(Duration::ZERO);
        let config = ArqConfig {
            max_payload: 4,
            ..ArqConfig::default()
        };
        let mut link = SawLink::new(a, config).unwrap();

        let payload = vec![0u8; 4 * 255 + 1];
        let err = link.send_message(&payload).await.unwrap_err();
        assert_eq!(
            err,
            ArqError::Oversize {
                len: 4 * 255 + 1,
                max: 4 * 255
            }
        );

        // Nothing hit the wire.
        assert_eq!(
            b.recv(Duration::ZERO).await,
            Err(ChannelError::Timeout)
        );
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let (a, _b) = memory_link(Duration::ZERO);
        let config = ArqConfig {
            window: 0,
            ..ArqConfig::default()
        };
        assert!(GbnLink::new(a, config).is_err());
    }
}
