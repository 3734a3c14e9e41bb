//! Stop-and-Wait receive-side state machine.
//!
//! [`SawReceiver`] accepts fragments strictly in order and tells the
//! caller which ACK to emit:
//!
//! - `seq == expected`: accept the payload, advance, ACK `seq`.
//! - `seq < expected`: a retransmission whose ACK was lost — re-emit
//!   `ACK(seq)` and discard the payload.
//! - `seq > expected`: cannot arise from a well-behaved Stop-and-Wait
//!   peer; dropped without an ACK.
//!
//! After the last fragment lands the assembled message is parked until
//! [`SawReceiver::take_message`] collects it, and the `(msg_id, total)`
//! pair is remembered so retransmitted tail frames of the delivered
//! message are re-ACKed without being delivered twice.
//!
//! This module only manages state; all channel I/O is the caller's
//! responsibility (see [`crate::link::SawLink`]).

use std::collections::BTreeMap;

use crate::frame::{reassemble, DataFrame};

/// Reassembly state for the message currently in progress.
#[derive(Debug)]
struct Reassembly {
    msg_id: u8,
    total: u8,
    expected_seq: u8,
    parts: BTreeMap<u8, Vec<u8>>,
}

/// Stop-and-Wait receive-side state for one endpoint.
#[derive(Debug, Default)]
pub struct SawReceiver {
    current: Option<Reassembly>,
    /// `(msg_id, total)` of the most recently delivered message.
    last_done: Option<(u8, u8)>,
    /// Assembled message awaiting collection.
    done: Option<Vec<u8>>,
}

impl SawReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an inbound DATA frame.
    ///
    /// Returns the sequence number to acknowledge, or `None` when the
    /// frame must be dropped silently (foreign message, fragment ahead of
    /// the expected one, or a `total` that contradicts the session).
    pub fn on_data(&mut self, frame: &DataFrame) -> Option<u8> {
        // Retransmission of a message we already delivered: the final ACK
        // was lost.  Re-ACK, do not deliver again.
        if self.current.is_none() && self.last_done == Some((frame.msg_id, frame.total)) {
            return Some(frame.seq);
        }

        let rx = self.current.get_or_insert_with(|| Reassembly {
            msg_id: frame.msg_id,
            total: frame.total,
            expected_seq: 0,
            parts: BTreeMap::new(),
        });

        if frame.msg_id != rx.msg_id || frame.total != rx.total {
            return None;
        }

        if frame.seq < rx.expected_seq {
            // Duplicate: its ACK was lost in transit.
            return Some(frame.seq);
        }
        if frame.seq > rx.expected_seq {
            return None;
        }

        rx.parts.insert(frame.seq, frame.payload.clone());
        rx.expected_seq += 1;

        if rx.expected_seq == rx.total {
            // reassemble cannot fail here: fragments 0..total all arrived.
            self.done = reassemble(&rx.parts, rx.total);
            self.last_done = Some((rx.msg_id, rx.total));
            self.current = None;
        }
        Some(frame.seq)
    }

    /// Collect a fully reassembled message, if one is ready.
    pub fn take_message(&mut self) -> Option<Vec<u8>> {
        self.done.take()
    }

    /// Drop partial reassembly state (idle garbage collection).  The
    /// record of the last delivered message survives so late duplicates
    /// are still re-ACKed.
    pub fn reset_partial(&mut self) {
        self.current = None;
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn data(msg_id: u8, seq: u8, total: u8, payload: &[u8]) -> DataFrame {
        DataFrame {
            msg_id,
            seq,
            total,
            payload: payload.to_vec(),
        }
    }

    #[test]
    fn in_order_fragments_assemble() {
        let mut r = SawReceiver::new();
        assert_eq!(r.on_data(&data(1, 0, 3, b"ab")), Some(0));
        assert_eq!(r.take_message(), None);

        assert_eq!(r.on_data(&data(1, 1, 3, b"cd")), Some(1));
        assert_eq!(r.on_data(&data(1, 2, 3, b"e")), Some(2));
        assert_eq!(r.take_message(), Some(b"abcde".to_vec()));
    }

    #[test]
    fn duplicate_is_reacked_and_not_delivered_twice() {
        let mut r = SawReceiver::new();
        r.on_data(&data(1, 0, 2, b"xy"));

        // Retransmission of seq 0 after its ACK was lost.
        assert_eq!(r.on_data(&data(1, 0, 2, b"xy")), Some(0));

        r.on_data(&data(1, 1, 2, b"z"));
        assert_eq!(r.take_message(), Some(b"xyz".to_vec()));
        assert_eq!(r.take_message(), None);
    }

    #[test]
    fn fragment_ahead_is_dropped_without_ack() {
        let mut r = SawReceiver::new();
        assert_eq!(r.on_data(&data(1, 1, 3, b"cd")), None);
        assert_eq!(r.on_data(&data(1, 0, 3, b"ab")), Some(0));
    }

    #[test]
    fn foreign_msg_id_is_ignored_mid_message() {
        let mut r = SawReceiver::new();
        r.on_data(&data(1, 0, 2, b"ab"));
        assert_eq!(r.on_data(&data(2, 0, 2, b"zz")), None);
    }

    #[test]
    fn retransmit_after_delivery_is_reacked() {
        let mut r = SawReceiver::new();
        r.on_data(&data(1, 0, 1, b"hi"));
        assert_eq!(r.take_message(), Some(b"hi".to_vec()));

        // The sender never saw the final ACK and retries.
        assert_eq!(r.on_data(&data(1, 0, 1, b"hi")), Some(0));
        assert_eq!(r.take_message(), None);
    }

    #[test]
    fn next_message_starts_a_fresh_session() {
        let mut r = SawReceiver::new();
        r.on_data(&data(1, 0, 1, b"one"));
        assert_eq!(r.take_message(), Some(b"one".to_vec()));

        assert_eq!(r.on_data(&data(2, 0, 1, b"two")), Some(0));
        assert_eq!(r.take_message(), Some(b"two".to_vec()));
    }

    #[test]
    fn reset_partial_discards_unfinished_state() {
        let mut r = SawReceiver::new();
        r.on_data(&data(1, 0, 3, b"ab"));
        r.reset_partial();

        // A new message can now bind the session.
        assert_eq!(r.on_data(&data(7, 0, 1, b"q")), Some(0));
        assert_eq!(r.take_message(), Some(b"q".to_vec()));
    }

    #[test]
    fn total_mismatch_is_dropped() {
        let mut r = SawReceiver::new();
        r.on_data(&data(1, 0, 3, b"ab"));
        assert_eq!(r.on_data(&data(1, 1, 4, b"cd")), None);
    }
}
