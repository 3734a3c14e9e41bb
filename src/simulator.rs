//! Fault-injecting channel wrapper for deterministic testing.
//!
//! Real acoustic links drop and corrupt transmissions.  To exercise the
//! reliability mechanisms without a soundcard, [`LossyChannel`] wraps any
//! [`Channel`] and applies a configurable fault model on `send`:
//!
//! | Fault      | Description                                             |
//! |------------|---------------------------------------------------------|
//! | Loss       | Discard the frame with a per-direction probability.     |
//! | Corruption | Flip one random bit of one random byte, so the frame    |
//! |            | arrives but fails its CRC on the far side.              |
//!
//! Direction is inferred from the frame's type byte: DATA frames use the
//! `drop_data` / `corrupt_data` knobs, ACK frames `drop_ack` /
//! `corrupt_ack`.  The wrapper owns a seeded RNG so every simulated run is
//! reproducible from its seed.
//!
//! On top of the probabilistic profile, faults can be scripted against
//! 0-based transmission indices (`drop_data_at(&[0, 1])` kills the first
//! two DATA sends), which is how the deterministic end-to-end scenarios in
//! `tests/` stage "first ACK lost" and similar cases.

use std::collections::HashSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::channel::{Channel, ChannelError};
use crate::frame::kind;

/// Per-direction fault probabilities, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultProfile {
    pub drop_data: f64,
    pub drop_ack: f64,
    pub corrupt_data: f64,
    pub corrupt_ack: f64,
}

impl FaultProfile {
    /// A transparent pass-through profile.
    pub fn lossless() -> Self {
        Self::default()
    }
}

/// A fault-injecting wrapper around another channel endpoint.
///
/// Only outbound frames are touched; `recv` is a pass-through.  Wrap both
/// endpoints of a link to subject DATA and ACK traffic alike to faults.
#[derive(Debug)]
pub struct LossyChannel<C> {
    inner: C,
    profile: FaultProfile,
    rng: StdRng,
    data_sent: u32,
    ack_sent: u32,
    drop_data_at: HashSet<u32>,
    drop_ack_at: HashSet<u32>,
    corrupt_data_at: HashSet<u32>,
    corrupt_ack_at: HashSet<u32>,
}

impl<C: Channel> LossyChannel<C> {
    /// Wrap `inner` with the given fault profile and RNG seed.
    ///
    /// # Panics
    ///
    /// Panics if any probability lies outside `[0, 1]`.
    pub fn new(inner: C, profile: FaultProfile, seed: u64) -> Self {
        for p in [
            profile.drop_data,
            profile.drop_ack,
            profile.corrupt_data,
            profile.corrupt_ack,
        ] {
            assert!((0.0..=1.0).contains(&p), "fault probability {p} out of range");
        }
        Self {
            inner,
            profile,
            rng: StdRng::seed_from_u64(seed),
            data_sent: 0,
            ack_sent: 0,
            drop_data_at: HashSet::new(),
            drop_ack_at: HashSet::new(),
            corrupt_data_at: HashSet::new(),
            corrupt_ack_at: HashSet::new(),
        }
    }

    /// Force the DATA transmissions with these 0-based indices to be lost.
    pub fn drop_data_at(&mut self, sends: &[u32]) {
        self.drop_data_at.extend(sends);
    }

    /// Force the ACK transmissions with these 0-based indices to be lost.
    pub fn drop_ack_at(&mut self, sends: &[u32]) {
        self.drop_ack_at.extend(sends);
    }

    /// Force the DATA transmissions with these indices to arrive corrupted.
    pub fn corrupt_data_at(&mut self, sends: &[u32]) {
        self.corrupt_data_at.extend(sends);
    }

    /// Force the ACK transmissions with these indices to arrive corrupted.
    pub fn corrupt_ack_at(&mut self, sends: &[u32]) {
        self.corrupt_ack_at.extend(sends);
    }

    /// Flip one random bit of one random byte.
    fn corrupt(&mut self, bytes: &mut [u8]) {
        if bytes.is_empty() {
            return;
        }
        let i = self.rng.random_range(0..bytes.len());
        let bit = 1u8 << self.rng.random_range(0..8);
        bytes[i] ^= bit;
    }
}

impl<C: Channel> Channel for LossyChannel<C> {
    async fn send(&mut self, frame: &[u8]) -> Result<(), ChannelError> {
        let is_ack = frame.first() == Some(&kind::ACK);
        let (label, idx, drop_p, corrupt_p) = if is_ack {
            let idx = self.ack_sent;
            self.ack_sent += 1;
            ("ack", idx, self.profile.drop_ack, self.profile.corrupt_ack)
        } else {
            let idx = self.data_sent;
            self.data_sent += 1;
            ("data", idx, self.profile.drop_data, self.profile.corrupt_data)
        };

        let scripted_drop = if is_ack {
            self.drop_ack_at.remove(&idx)
        } else {
            self.drop_data_at.remove(&idx)
        };
        if scripted_drop || (drop_p > 0.0 && self.rng.random_bool(drop_p)) {
            log::debug!("[sim] dropped {label} #{idx} ({} bytes)", frame.len());
            return Ok(());
        }

        let scripted_corrupt = if is_ack {
            self.corrupt_ack_at.remove(&idx)
        } else {
            self.corrupt_data_at.remove(&idx)
        };
        if scripted_corrupt || (corrupt_p > 0.0 && self.rng.random_bool(corrupt_p)) {
            let mut mangled = frame.to_vec();
            self.corrupt(&mut mangled);
            log::debug!("[sim] corrupted {label} #{idx}");
            return self.inner.send(&mangled).await;
        }

        self.inner.send(frame).await
    }

    async fn recv(&mut self, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        self.inner.recv(timeout).await
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
