//! Go-Back-N receive-side state machine.
//!
//! [`GbnReceiver`] implements the classic Go-Back-N receiver:
//!
//! - Only **in-order** fragments are accepted (`seq == expected`).
//! - Out-of-order or duplicate fragments are discarded without buffering.
//! - After every DATA frame of the current message the caller emits a
//!   **cumulative ACK** for the highest in-order fragment received —
//!   `expected - 1` — except before the first acceptance, when there is
//!   nothing to acknowledge and the frame is dropped silently.
//!
//! Because fragments are only ever accepted in order, reassembly is plain
//! concatenation; the receiver never holds out-of-order data.
//!
//! This module only manages state; all channel I/O is the caller's
//! responsibility (see [`crate::link::GbnLink`]).

use crate::frame::DataFrame;

/// Reassembly state for the message currently in progress.
#[derive(Debug)]
struct Reassembly {
    msg_id: u8,
    total: u8,
    expected_seq: u8,
    /// In-order payload bytes accepted so far.
    assembled: Vec<u8>,
}

/// Go-Back-N receive-side state for one endpoint.
#[derive(Debug, Default)]
pub struct GbnReceiver {
    current: Option<Reassembly>,
    /// `(msg_id, total)` of the most recently delivered message.
    last_done: Option<(u8, u8)>,
    /// Assembled message awaiting collection.
    done: Option<Vec<u8>>,
}

impl GbnReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an inbound DATA frame.
    ///
    /// Returns the cumulative ACK sequence to emit, or `None` when the
    /// frame is dropped silently (foreign message, inconsistent `total`,
    /// or out-of-order before anything was accepted).
    pub fn on_data(&mut self, frame: &DataFrame) -> Option<u8> {
        // Retransmission of a message we already delivered: keep the
        // sender's window moving with the final cumulative ACK.
        if self.current.is_none() && self.last_done == Some((frame.msg_id, frame.total)) {
            return Some(frame.total - 1);
        }

        let rx = self.current.get_or_insert_with(|| Reassembly {
            msg_id: frame.msg_id,
            total: frame.total,
            expected_seq: 0,
            assembled: Vec::new(),
        });

        if frame.msg_id != rx.msg_id || frame.total != rx.total {
            return None;
        }

        if frame.seq == rx.expected_seq {
            rx.assembled.extend_from_slice(&frame.payload);
            rx.expected_seq += 1;

            if rx.expected_seq == rx.total {
                let (msg_id, total) = (rx.msg_id, rx.total);
                self.done = Some(std::mem::take(&mut rx.assembled));
                self.last_done = Some((msg_id, total));
                self.current = None;
                return Some(total - 1);
            }
            return Some(rx.expected_seq - 1);
        }

        // Duplicate or ahead of the window: discard, but re-advertise the
        // highest in-order fragment when there is one.
        if rx.expected_seq > 0 {
            Some(rx.expected_seq - 1)
        } else {
            None
        }
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
    fn in_order_fragments_accepted_and_acked() {
        let mut r = GbnReceiver::new();
        assert_eq!(r.on_data(&data(1, 0, 3, b"ab")), Some(0));
        assert_eq!(r.on_data(&data(1, 1, 3, b"cd")), Some(1));
        assert_eq!(r.on_data(&data(1, 2, 3, b"e")), Some(2));
        assert_eq!(r.take_message(), Some(b"abcde".to_vec()));
    }

    #[test]
    fn out_of_order_before_first_accept_is_silent() {
        let mut r = GbnReceiver::new();
        // Nothing in order yet: no cumulative ACK is possible.
        assert_eq!(r.on_data(&data(1, 2, 4, b"zz")), None);
    }

    #[test]
    fn out_of_order_reacks_highest_in_order() {
        let mut r = GbnReceiver::new();
        r.on_data(&data(1, 0, 4, b"a"));
        r.on_data(&data(1, 1, 4, b"b"));

        // seq 3 arrives while 2 is missing: drop, re-ACK 1.
        assert_eq!(r.on_data(&data(1, 3, 4, b"d")), Some(1));
        // The gap is never buffered.
        assert_eq!(r.on_data(&data(1, 2, 4, b"c")), Some(2));
        assert_eq!(r.on_data(&data(1, 3, 4, b"d")), Some(3));
        assert_eq!(r.take_message(), Some(b"abcd".to_vec()));
    }

    #[test]
    fn duplicate_reacks_without_double_delivery() {
        let mut r = GbnReceiver::new();
        r.on_data(&data(1, 0, 2, b"x"));
        assert_eq!(r.on_data(&data(1, 0, 2, b"x")), Some(0));
        r.on_data(&data(1, 1, 2, b"y"));
        assert_eq!(r.take_message(), Some(b"xy".to_vec()));
        assert_eq!(r.take_message(), None);
    }

    #[test]
    fn foreign_msg_id_is_ignored_mid_message() {
        let mut r = GbnReceiver::new();
        r.on_data(&data(1, 0, 2, b"x"));
        assert_eq!(r.on_data(&data(7, 0, 2, b"q")), None);
    }

    #[test]
    fn retransmit_after_delivery_gets_final_cumulative_ack() {
        let mut r = GbnReceiver::new();
        r.on_data(&data(1, 0, 2, b"x"));
        r.on_data(&data(1, 1, 2, b"y"));
        assert_eq!(r.take_message(), Some(b"xy".to_vec()));

        // The sender missed the last ACK and went back to N.
        assert_eq!(r.on_data(&data(1, 0, 2, b"x")), Some(1));
        assert_eq!(r.on_data(&data(1, 1, 2, b"y")), Some(1));
        assert_eq!(r.take_message(), None);
    }

    #[test]
    fn next_message_starts_a_fresh_session() {
        let mut r = GbnReceiver::new();
        r.on_data(&data(1, 0, 1, b"one"));
        assert_eq!(r.take_message(), Some(b"one".to_vec()));

        assert_eq!(r.on_data(&data(2, 0, 1, b"two")), Some(0));
        assert_eq!(r.take_message(), Some(b"two".to_vec()));
    }

    #[test]
    fn reset_partial_discards_unfinished_state() {
        let mut r = GbnReceiver::new();
        r.on_data(&data(1, 0, 3, b"ab"));
        r.reset_partial();

        assert_eq!(r.on_data(&data(9, 0, 1, b"q")), Some(0));
        assert_eq!(r.take_message(), Some(b"q".to_vec()));
    }
}
