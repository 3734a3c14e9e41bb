//! Wire-format definitions for protocol frames.
//!
//! Every transmission over the acoustic link is one [`Frame`].  This module
//! is responsible for:
//! - Defining the on-wire binary layout (header fields, payload, CRC).
//! - Serialising a [`Frame`] into a byte buffer ready for transmission.
//! - Deserialising a raw byte slice back into a [`Frame`], returning errors
//!   for malformed, truncated, or corrupted input.
//! - Splitting an application message into numbered fragments and putting
//!   it back together on the far side.
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Layout
//!
//! ```text
//! DATA  0x01 | msg_id | seq | total | plen | payload[plen] | crc_hi crc_lo
//! ACK   0x02 | msg_id | seq | crc_hi crc_lo
//! ```
//!
//! The CRC is CRC-16/CCITT-FALSE over every preceding byte of the frame,
//! big-endian on the wire.  A frame whose CRC does not match is treated by
//! callers as if it had never arrived.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::crc::crc16;

/// Frame-type constants for the leading type byte.
pub mod kind {
    /// Payload-carrying frame.
    pub const DATA: u8 = 0x01;
    /// Acknowledgement frame.
    pub const ACK: u8 = 0x02;
}

/// Encoded length of a DATA frame with an empty payload.
pub const DATA_OVERHEAD: usize = 7;
/// Encoded length of an ACK frame.
pub const ACK_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Frame types
// ---------------------------------------------------------------------------

/// One fragment of an application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// Message this fragment belongs to.
    pub msg_id: u8,
    /// Fragment index, `0..total`.
    pub seq: u8,
    /// Number of fragments in the message (≥ 1).
    pub total: u8,
    /// Fragment bytes; every fragment except the last carries exactly
    /// `max_payload` bytes.
    pub payload: Vec<u8>,
}

/// Acknowledgement for a fragment (Stop-and-Wait) or for the highest
/// in-order fragment (Go-Back-N cumulative ACK).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub msg_id: u8,
    pub seq: u8,
}

/// A complete protocol frame, as transmitted over the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(DataFrame),
    Ack(AckFrame),
}

/// Errors that can arise when parsing a raw frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer shorter than the fixed header size.
    #[error("buffer too short for a frame header")]
    BufferTooShort,
    /// Leading type byte is neither DATA nor ACK.
    #[error("unknown frame type 0x{0:02x}")]
    UnknownType(u8),
    /// `plen` field does not match the actual remaining bytes.
    #[error("payload length field does not match buffer size")]
    LengthMismatch,
    /// Recomputed CRC differs from the transmitted one.
    #[error("crc mismatch (expected {expected:#06x}, got {got:#06x})")]
    CrcMismatch { expected: u16, got: u16 },
    /// `total` of zero cannot occur in a well-formed message.
    #[error("data frame with total = 0")]
    ZeroTotal,
    /// `seq` at or beyond `total` cannot arise from a well-behaved peer.
    #[error("data frame with seq {seq} >= total {total}")]
    SeqBeyondTotal { seq: u8, total: u8 },
}

// ---------------------------------------------------------------------------
// Encoding / decoding
// ---------------------------------------------------------------------------

impl Frame {
    /// Build a DATA frame.
    pub fn data(msg_id: u8, seq: u8, total: u8, payload: Vec<u8>) -> Self {
        Self::Data(DataFrame {
            msg_id,
            seq,
            total,
            payload,
        })
    }

    /// Build an ACK frame.
    pub fn ack(msg_id: u8, seq: u8) -> Self {
        Self::Ack(AckFrame { msg_id, seq })
    }

    /// Serialise this frame into a newly allocated byte vector, appending
    /// the CRC over everything that precedes it.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = match self {
            Frame::Data(d) => {
                debug_assert!(d.payload.len() <= usize::from(u8::MAX));
                let mut buf = Vec::with_capacity(DATA_OVERHEAD + d.payload.len());
                buf.push(kind::DATA);
                buf.push(d.msg_id);
                buf.push(d.seq);
                buf.push(d.total);
                buf.push(d.payload.len() as u8);
                buf.extend_from_slice(&d.payload);
                buf
            }
            Frame::Ack(a) => {
                let mut buf = Vec::with_capacity(ACK_LEN);
                buf.push(kind::ACK);
                buf.push(a.msg_id);
                buf.push(a.seq);
                buf
            }
        };
        let crc = crc16(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        buf
    }

    /// Parse a [`Frame`] from a raw byte slice.
    ///
    /// Structural checks (length, type byte) run first, then the CRC, then
    /// field invariants — so a corrupted frame reports [`FrameError::CrcMismatch`]
    /// rather than whatever nonsense its flipped fields would imply.
    pub fn decode(buf: &[u8]) -> Result<Self, FrameError> {
        let type_byte = *buf.first().ok_or(FrameError::BufferTooShort)?;
        match type_byte {
            kind::DATA => {
                if buf.len() < DATA_OVERHEAD {
                    return Err(FrameError::BufferTooShort);
                }
                let plen = usize::from(buf[4]);
                if buf.len() != DATA_OVERHEAD + plen {
                    return Err(FrameError::LengthMismatch);
                }
                check_crc(buf)?;
                let (seq, total) = (buf[2], buf[3]);
                if total == 0 {
                    return Err(FrameError::ZeroTotal);
                }
                if seq >= total {
                    return Err(FrameError::SeqBeyondTotal { seq, total });
                }
                Ok(Frame::Data(DataFrame {
                    msg_id: buf[1],
                    seq,
                    total,
                    payload: buf[5..5 + plen].to_vec(),
                }))
            }
            kind::ACK => {
                if buf.len() < ACK_LEN {
                    return Err(FrameError::BufferTooShort);
                }
                if buf.len() != ACK_LEN {
                    return Err(FrameError::LengthMismatch);
                }
                check_crc(buf)?;
                Ok(Frame::Ack(AckFrame {
                    msg_id: buf[1],
                    seq: buf[2],
                }))
            }
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

/// Verify the trailing big-endian CRC of a structurally valid frame.
fn check_crc(buf: &[u8]) -> Result<(), FrameError> {
    let split = buf.len() - 2;
    let expected = crc16(&buf[..split]);
    let got = u16::from_be_bytes([buf[split], buf[split + 1]]);
    if expected != got {
        return Err(FrameError::CrcMismatch { expected, got });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Fragmentation / reassembly
// ---------------------------------------------------------------------------

/// Split a message into DATA frames of at most `max_payload` bytes each.
///
/// The split is deterministic: `total = ceil(len / max_payload)` fragments
/// numbered `0..total`, the last possibly shorter.  An empty message still
/// produces one (empty) fragment so the receiver has something to deliver.
///
/// Callers must reject messages longer than `255 × max_payload` before
/// calling; `total` has to fit in one byte.
pub fn fragment(msg_id: u8, payload: &[u8], max_payload: u8) -> Vec<DataFrame> {
    debug_assert!(max_payload >= 1);
    if payload.is_empty() {
        return vec![DataFrame {
            msg_id,
            seq: 0,
            total: 1,
            payload: Vec::new(),
        }];
    }

    let chunks: Vec<&[u8]> = payload.chunks(usize::from(max_payload)).collect();
    debug_assert!(chunks.len() <= usize::from(u8::MAX));
    let total = chunks.len() as u8;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| DataFrame {
            msg_id,
            seq: i as u8,
            total,
            payload: chunk.to_vec(),
        })
        .collect()
}

/// Concatenate fragments `0..total` back into the original message.
///
/// Returns `None` while any fragment is still missing.
pub fn reassemble(parts: &BTreeMap<u8, Vec<u8>>, total: u8) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    for seq in 0..total {
        out.extend_from_slice(parts.get(&seq)?);
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
