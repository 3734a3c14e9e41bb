//! `arq-over-sound` — reliable, in-order message delivery over a lossy
//! acoustic byte link.
//!
//! The underlying medium (an acoustic modem, modelled here as an opaque
//! frame pipe) may drop or corrupt any transmission.  This crate layers a
//! CRC-checked framing format and two Automatic-Repeat-reQuest transports
//! on top of it, so a message of up to a few kilobytes is either delivered
//! intact and in order, or the send fails after a bounded number of
//! retries.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐  DATA frames  ┌──────────┐
//!  │  Sender  │──────────────▶│ Receiver │
//!  └────┬─────┘               └─────┬────┘
//!       │          ACKs             │
//!       │◀──────────────────────────┘
//!       │
//!  ┌────▼──────────────────────────────┐
//!  │        SawLink / GbnLink          │
//!  │ (state machines + retransmit timer)│
//!  └────┬──────────────────────────────┘
//!       │ encoded frames
//!  ┌────▼──────┐
//!  │  Channel  │  (modem, in-memory link, lossy simulator)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`crc`]          — CRC-16 frame integrity check
//! - [`frame`]        — wire format, fragmentation, reassembly
//! - [`channel`]      — byte-link abstraction + in-memory implementation
//! - [`simulator`]    — lossy/corrupting channel wrapper for testing
//! - [`timer`]        — retransmission timer
//! - [`saw_sender`]   — Stop-and-Wait outbound state machine
//! - [`saw_receiver`] — Stop-and-Wait inbound state machine
//! - [`gbn_sender`]   — Go-Back-N outbound state machine (sliding window)
//! - [`gbn_receiver`] — Go-Back-N inbound state machine (cumulative ACKs)
//! - [`link`]         — message-level drivers tying it all together
//! - [`config`]       — protocol tuning knobs

pub mod channel;
pub mod config;
pub mod crc;
pub mod frame;
pub mod gbn_receiver;
pub mod gbn_sender;
pub mod link;
pub mod saw_receiver;
pub mod saw_sender;
pub mod simulator;
pub mod timer;
