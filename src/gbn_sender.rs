//! Go-Back-N send-side state machine.
//!
//! [`GbnSender`] maintains a sliding window of up to `N` in-flight DATA
//! frames.  Unlike Stop-and-Wait, multiple frames may be outstanding
//! simultaneously.
//!
//! # Protocol contract
//!
//! - At most `window` frames may be in flight at once.
//! - ACKs are **cumulative**: `ACK(k)` means the receiver has accepted
//!   every fragment up to and including `k`.
//! - On timeout, the caller retransmits **all** unacknowledged frames from
//!   `base` onwards (go back to N).
//! - Invariant at every step: `base ≤ next_seq ≤ min(base + N, total)`,
//!   and `base` never decreases.
//!
//! Sequence numbers never wrap: a message has at most 255 fragments, so
//! the u8 sequence space covers a whole send.
//!
//! This module only manages state; all channel I/O is the caller's
//! responsibility (see [`crate::link::GbnLink`]).

use crate::frame::{fragment, AckFrame, Frame};

/// Go-Back-N send-side state for one message.
///
/// # Sequence-number layout
///
/// ```text
///     base             next_seq
///      │                  │
///  ────┼──────────────────┼──────────────────▶ seq space
///      │ ◀── in flight ──▶│ ◀── sendable ──▶
/// ```
#[derive(Debug)]
pub struct GbnSender {
    msg_id: u8,
    /// Pre-encoded DATA frames, indexed by sequence number.
    frames: Vec<Vec<u8>>,
    /// Oldest unacknowledged sequence number (left window edge).
    pub base: u8,
    /// Next sequence number to transmit for the first time.
    pub next_seq: u8,
    /// Maximum number of frames in flight simultaneously (N).
    window: u8,
}

impl GbnSender {
    /// Fragment `payload` and encode every DATA frame up front.
    ///
    /// The caller must have verified that the message fits in 255
    /// fragments of `max_payload` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn new(msg_id: u8, payload: &[u8], max_payload: u8, window: u8) -> Self {
        assert!(window >= 1, "window must be at least 1");
        let frames: Vec<Vec<u8>> = fragment(msg_id, payload, max_payload)
            .into_iter()
            .map(|f| Frame::Data(f).encode())
            .collect();
        Self {
            msg_id,
            frames,
            base: 0,
            next_seq: 0,
            window,
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

    /// Number of frames currently awaiting acknowledgement.
    pub fn in_flight(&self) -> u8 {
        self.next_seq - self.base
    }

    /// `true` when at least one frame is awaiting acknowledgement.
    pub fn has_unacked(&self) -> bool {
        self.base < self.next_seq
    }

    /// `true` when an unsent fragment exists and the window has room.
    pub fn can_send(&self) -> bool {
        self.next_seq < self.total() && self.in_flight() < self.window
    }

    /// `true` once every fragment has been acknowledged.
    pub fn is_complete(&self) -> bool {
        self.base == self.total()
    }

    /// The encoded frame for `next_seq`.  Call [`record_sent`] after
    /// handing it to the channel.
    ///
    /// # Panics
    ///
    /// Panics when [`can_send`] is false.
    ///
    /// [`record_sent`]: Self::record_sent
    /// [`can_send`]: Self::can_send
    pub fn next_frame(&self) -> &[u8] {
        debug_assert!(self.can_send(), "next_frame outside the send window");
        &self.frames[usize::from(self.next_seq)]
    }

    /// Advance `next_seq` past a just-transmitted frame.
    pub fn record_sent(&mut self) {
        debug_assert!(self.can_send(), "record_sent outside the send window");
        self.next_seq += 1;
    }

    /// Process a cumulative ACK.
    ///
    /// Slides `base` to `ack.seq + 1` when that advances the window and
    /// returns the number of newly acknowledged frames.  Returns `0` for a
    /// foreign `msg_id`, a stale ACK (`seq < base`), or an ACK naming a
    /// fragment that was never transmitted.
    pub fn on_ack(&mut self, ack: &AckFrame) -> u8 {
        if ack.msg_id != self.msg_id {
            return 0;
        }
        if ack.seq >= self.next_seq {
            return 0;
        }
        let new_base = ack.seq + 1;
        if new_base <= self.base {
            return 0;
        }
        let advanced = new_base - self.base;
        self.base = new_base;
        advanced
    }

    /// Iterate over every in-flight frame from oldest to newest, for the
    /// full-window retransmission on timeout.
    pub fn window_frames(&self) -> impl Iterator<Item = &[u8]> {
        self.frames[usize::from(self.base)..usize::from(self.next_seq)]
            .iter()
            .map(Vec::as_slice)
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

    /// Eight 1-byte fragments, window 4.
    fn sender() -> GbnSender {
        GbnSender::new(1, b"ABCDEFGH", 1, 4)
    }

    #[test]
    fn initial_state() {
        let s = sender();
        assert_eq!(s.total(), 8);
        assert_eq!(s.base, 0);
        assert_eq!(s.next_seq, 0);
        assert!(s.can_send());
        assert!(!s.has_unacked());
        assert!(!s.is_complete());
    }

    #[test]
    fn window_fills_and_blocks() {
        let mut s = sender();
        for _ in 0..4 {
            assert!(s.can_send());
            s.record_sent();
        }
        assert!(!s.can_send(), "window should be full");
        assert_eq!(s.in_flight(), 4);
    }

    #[test]
    fn cumulative_ack_slides_multiple() {
        let mut s = sender();
        for _ in 0..4 {
            s.record_sent();
        }

        // One ACK for fragments 0..=2.
        assert_eq!(s.on_ack(&ack(1, 2)), 3);
        assert_eq!(s.base, 3);
        assert_eq!(s.in_flight(), 1);
        assert!(s.can_send(), "three slots should have opened");
    }

    #[test]
    fn stale_ack_returns_zero() {
        let mut s = sender();
        for _ in 0..4 {
            s.record_sent();
        }
        assert_eq!(s.on_ack(&ack(1, 1)), 2);

        // Duplicate cumulative ACK for already-acknowledged fragments.
        assert_eq!(s.on_ack(&ack(1, 1)), 0);
        assert_eq!(s.on_ack(&ack(1, 0)), 0);
        assert_eq!(s.base, 2);
    }

    #[test]
    fn ack_beyond_next_seq_ignored() {
        let mut s = sender();
        s.record_sent();

        // ACK for a fragment that was never transmitted.
        assert_eq!(s.on_ack(&ack(1, 5)), 0);
        assert_eq!(s.base, 0);
    }

    #[test]
    fn foreign_msg_id_ignored() {
        let mut s = sender();
        s.record_sent();
        assert_eq!(s.on_ack(&ack(9, 0)), 0);
    }

    #[test]
    fn base_never_decreases() {
        let mut s = sender();
        for _ in 0..4 {
            s.record_sent();
        }
        s.on_ack(&ack(1, 3));
        let base = s.base;
        s.on_ack(&ack(1, 0));
        s.on_ack(&ack(1, 2));
        assert_eq!(s.base, base);
    }

    #[test]
    fn window_frames_cover_exactly_the_in_flight_range() {
        let mut s = sender();
        for _ in 0..4 {
            s.record_sent();
        }
        s.on_ack(&ack(1, 0));

        let seqs: Vec<u8> = s
            .window_frames()
            .map(|bytes| match Frame::decode(bytes).unwrap() {
                Frame::Data(d) => d.seq,
                other => panic!("expected DATA, got {other:?}"),
            })
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn completes_when_base_reaches_total() {
        let mut s = GbnSender::new(1, b"AB", 1, 4);
        s.record_sent();
        s.record_sent();
        assert_eq!(s.on_ack(&ack(1, 1)), 2);
        assert!(s.is_complete());
        assert!(!s.can_send());
    }

    #[test]
    fn window_invariant_holds_under_interleaving() {
        let mut s = sender();
        let mut acked: i16 = -1;
        while !s.is_complete() {
            while s.can_send() {
                s.record_sent();
            }
            assert!(s.base <= s.next_seq);
            assert!(s.next_seq - s.base <= 4);
            assert!(s.next_seq <= s.total());

            acked += 1;
            s.on_ack(&ack(1, acked as u8));
        }
    }
}
