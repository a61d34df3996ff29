//! Atomic scalars mutated by an external control surface (§5: remote
//! control). This crate only owns the atomics; a caller wires up whatever
//! control-channel transport (ZMQ, a TCP line protocol, a config file
//! watcher) it likes on top, and the PHY encoder reads them once per
//! transmission frame with no locks on the DSP path.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicU32, AtomicU64, Ordering};

/// Gain control strategy (§4.8).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainMode {
    /// Constant scale by `factor`.
    Fix {
        /// Fixed linear scale factor.
        factor: f32,
    },
    /// Scale so the peak magnitude over the accumulated PAPR window equals
    /// `factor`.
    Max {
        /// Target peak magnitude.
        factor: f32,
    },
    /// Scale by `factor / estimated_rms`, `estimated_rms` measured over the
    /// accumulated PAPR window.
    Var {
        /// Target RMS-normalised scale factor.
        factor: f32,
    },
}

impl GainMode {
    fn discriminant(self) -> u8 {
        match self {
            GainMode::Fix { .. } => 0,
            GainMode::Max { .. } => 1,
            GainMode::Var { .. } => 2,
        }
    }

    fn factor(self) -> f32 {
        match self {
            GainMode::Fix { factor } | GainMode::Max { factor } | GainMode::Var { factor } => {
                factor
            }
        }
    }

    fn from_parts(discriminant: u8, factor: f32) -> Self {
        match discriminant {
            0 => GainMode::Fix { factor },
            1 => GainMode::Max { factor },
            _ => GainMode::Var { factor },
        }
    }
}

/// Remote-control state for one running modulator instance.
///
/// Every field is an atomic; `PhyEncoder` samples them once per
/// transmission frame (§5) rather than locking on the DSP path. `gain_mode`
/// and `gain_factor` are split across two atomics because there is no
/// lock-free atomic for a tagged union; readers always read `gain_mode`
/// first, so a torn read at worst uses the previous frame's factor for one
/// frame.
pub struct ControlState {
    gain_mode: AtomicU8,
    gain_factor: AtomicU32,
    tx_frequency: AtomicU64,
    mute: AtomicBool,
    static_delay: AtomicI32,
}

impl ControlState {
    /// Create control state at the given initial gain mode, muted off, zero
    /// static delay, and the given TX frequency in Hz.
    #[must_use]
    pub fn new(gain_mode: GainMode, tx_frequency: u64) -> Self {
        Self {
            gain_mode: AtomicU8::new(gain_mode.discriminant()),
            gain_factor: AtomicU32::new(gain_mode.factor().to_bits()),
            tx_frequency: AtomicU64::new(tx_frequency),
            mute: AtomicBool::new(false),
            static_delay: AtomicI32::new(0),
        }
    }

    /// Current gain mode and factor.
    #[must_use]
    pub fn gain_mode(&self) -> GainMode {
        let discriminant = self.gain_mode.load(Ordering::Relaxed);
        let factor = f32::from_bits(self.gain_factor.load(Ordering::Relaxed));
        GainMode::from_parts(discriminant, factor)
    }

    /// Set the gain mode and factor.
    pub fn set_gain_mode(&self, mode: GainMode) {
        self.gain_factor.store(mode.factor().to_bits(), Ordering::Relaxed);
        self.gain_mode.store(mode.discriminant(), Ordering::Relaxed);
    }

    /// Update just the factor of the current gain mode.
    pub fn set_gain_factor(&self, factor: f32) {
        self.gain_factor.store(factor.to_bits(), Ordering::Relaxed);
    }

    /// Current TX frequency, in Hz.
    #[must_use]
    pub fn tx_frequency(&self) -> u64 {
        self.tx_frequency.load(Ordering::Relaxed)
    }

    /// Set the TX frequency, in Hz.
    pub fn set_tx_frequency(&self, hz: u64) {
        self.tx_frequency.store(hz, Ordering::Relaxed);
    }

    /// True if output should be muted (samples still produced, but zeroed).
    #[must_use]
    pub fn mute(&self) -> bool {
        self.mute.load(Ordering::Relaxed)
    }

    /// Set the mute flag.
    pub fn set_mute(&self, mute: bool) {
        self.mute.store(mute, Ordering::Relaxed);
    }

    /// Static delay, in samples, applied ahead of transmission-time
    /// stamping.
    #[must_use]
    pub fn static_delay(&self) -> i32 {
        self.static_delay.load(Ordering::Relaxed)
    }

    /// Set the static delay, in samples.
    pub fn set_static_delay(&self, delay: i32) {
        self.static_delay.store(delay, Ordering::Relaxed);
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(GainMode::Fix { factor: 1.0 }, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_gain_mode_and_factor() {
        let c = ControlState::default();
        c.set_gain_mode(GainMode::Var { factor: 0.5 });
        assert_eq!(c.gain_mode(), GainMode::Var { factor: 0.5 });
    }

    #[test]
    fn s2_set_then_get_digital_gain() {
        // S2: `["set","gain","digital","0.5"]` then `["get","gain","digital"]`
        // replies `["0.5"]` — exercised here directly on the atomics, since
        // no socket surface lives in this crate.
        let c = ControlState::default();
        c.set_gain_factor(0.5);
        assert_eq!(c.gain_mode().factor(), 0.5);
    }

    #[test]
    fn default_is_unmuted_with_zero_delay() {
        let c = ControlState::default();
        assert!(!c.mute());
        assert_eq!(c.static_delay(), 0);
    }
}
