//! Stop-and-Wait send-side state machine.
//!
//! [`SawSender`] is Go-Back-N with a window of one: a single DATA frame is
//! outstanding at any time, and the next fragment is released only once
//! the current one is acknowledged.
//!
//! # Protocol contract
//!
//! - Exactly one DATA frame is in flight between `current_frame` and the
//!   matching ACK.
//! - An ACK counts only when it names the current `msg_id` and the current
//!   sequence number; a stale ACK (`seq` below the current fragment) or an
//!   ACK ahead of it is ignored.
//! - On timeout, the caller retransmits `current_frame` unchanged.
//!
//! This module only manages state; all channel I/O is the caller's
//! responsibility (see [`crate::link::SawLink`]).

use crate::frame::{fragment, AckFrame, Frame};

/// Stop-and-Wait send-side state for one message.
///
/// ```text
///   0        next_seq       total
///   ├─ acked ──┤█├─ unsent ──┤
///               └── the one frame in flight
/// ```
#[derive(Debug)]
pub struct SawSender {
    msg_id: u8,
    /// Pre-encoded DATA frames, indexed by sequence number.
    frames: Vec<Vec<u8>>,
    /// Sequence number of the fragment currently awaiting its ACK.
    pub next_seq: u8,
}

impl SawSender {
    /// Fragment `payload` and encode every DATA frame up front.
    ///
    /// The caller must have verified that the message fits in 255
    /// fragments of `max_payload` bytes.
    pub fn new(msg_id: u8, payload: &[u8], max_payload: u8) -> Self {
        let frames = fragment(msg_id, payload, max_payload)
            .into_iter()
            .map(|f| Frame::Data(f).encode())
            .collect();
        Self {
            msg_id,
            frames,
            next_seq: 0,
        }
    }

    /// Message id stamped on every frame of this send.
    pub fn msg_id(&self) -> u8 {
        self.msg_id
    }

    /// Number of fragments in the message.
    pub fn total(&self) -> u8 {
        self.frames.len() as u8
    }

    /// `true` once every fragment has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.next_seq == self.total()
    }

    /// The encoded frame to (re)transmit.
    ///
    /// # Panics
    ///
    /// Panics if the send is already complete; check [`is_complete`] first.
    ///
    /// [`is_complete`]: Self::is_complete
    pub fn current_frame(&self) -> &[u8] {
        debug_assert!(!self.is_complete(), "current_frame on a finished send");
        &self.frames[usize::from(self.next_seq)]
    }

    /// Process an ACK.  Returns `true` when it acknowledged the in-flight
    /// fragment and the sender advanced to the next one.
    pub fn on_ack(&mut self, ack: &AckFrame) -> bool {
        if ack.msg_id != self.msg_id || self.is_complete() {
            return false;
        }
        if ack.seq != self.next_seq {
            // Stale (already acknowledged) or impossible future ACK.
            return false;
        }
        self.next_seq += 1;
        true
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{AckFrame, Frame};

    fn ack(msg_id: u8, seq: u8) -> AckFrame {
        AckFrame { msg_id, seq }
    }

    #[test]
    fn initial_state() {
        let s = SawSender::new(1, b"abcdefghij", 4);
        assert_eq!(s.total(), 3);
        assert_eq!(s.next_seq, 0);
        assert!(!s.is_complete());
    }

    #[test]
    fn ack_advances_one_fragment_at_a_time() {
        let mut s = SawSender::new(1, b"abcdefghij", 4);

        assert!(s.on_ack(&ack(1, 0)));
        assert_eq!(s.next_seq, 1);

        assert!(s.on_ack(&ack(1, 1)));
        assert!(s.on_ack(&ack(1, 2)));
        assert!(s.is_complete());
    }

    #[test]
    fn stale_ack_ignored() {
        let mut s = SawSender::new(1, b"abcdefghij", 4);
        assert!(s.on_ack(&ack(1, 0)));

        // Duplicate ACK for the fragment we already moved past.
        assert!(!s.on_ack(&ack(1, 0)));
        assert_eq!(s.next_seq, 1);
    }

    #[test]
    fn future_ack_ignored() {
        let mut s = SawSender::new(1, b"abcdefghij", 4);
        assert!(!s.on_ack(&ack(1, 2)));
        assert_eq!(s.next_seq, 0);
    }

    #[test]
    fn foreign_msg_id_ignored() {
        let mut s = SawSender::new(1, b"abcdefghij", 4);
        assert!(!s.on_ack(&ack(9, 0)));
        assert_eq!(s.next_seq, 0);
    }

    #[test]
    fn current_frame_decodes_to_the_right_fragment() {
        let mut s = SawSender::new(5, b"abcdefghij", 4);
        s.on_ack(&ack(5, 0));

        match Frame::decode(s.current_frame()).unwrap() {
            Frame::Data(d) => {
                assert_eq!(d.msg_id, 5);
                assert_eq!(d.seq, 1);
                assert_eq!(d.total, 3);
                assert_eq!(d.payload, b"efgh");
            }
            other => panic!("expected DATA, got {other:?}"),
        }
    }

    #[test]
    fn single_byte_message_is_one_fragment() {
        let s = SawSender::new(1, b"z", 32);
        assert_eq!(s.total(), 1);
    }
}
