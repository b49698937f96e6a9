//! Treble enhancer (TE).
//!
//! A first-order high-shelf boost, gated on sample rate, effect level, and
//! bundle operating mode, with instantaneous (non-draining) bypass when any
//! gate fails. Modeled with the RBJ high-shelf biquad at a fixed `Q = 0.707`
//! shelf slope (the closest second-order shelf to a true first-order
//! response) rather than adding a separate first-order shelf form, since
//! `biquad.rs`'s `BiquadCoeffs::high_shelf` already covers the shape shared
//! with the bass enhancer.

use crate::biquad::{BiquadCoeffs, BiquadDf1};
use crate::control::OperatingMode;
use efx_core::Sample;

const MAX_CHANNELS: usize = 8;
const SHELF_Q: f64 = 0.707;
const SHELF_FREQ_HZ: f64 = 8_000.0;

/// Below this sample rate the shelf corner would sit too close to Nyquist
/// to be useful.
pub const TREBLE_BOOST_MIN_RATE_HZ: f64 = 22_050.0;

#[derive(Debug, Clone)]
pub struct TrebleEnhancerModule {
    shelf: [BiquadDf1; MAX_CHANNELS],
    channels: usize,
    sample_rate: f64,
    pub enabled: bool,
    pub active: bool,
}

impl TrebleEnhancerModule {
    pub fn new(sample_rate: f64, channels: usize) -> Self {
        Self {
            shelf: [BiquadDf1::new(); MAX_CHANNELS],
            channels: channels.min(MAX_CHANNELS),
            sample_rate,
            enabled: false,
            active: false,
        }
    }

    pub fn reconfigure(
        &mut self,
        enabled: bool,
        effect_level: u8,
        operating_mode: OperatingMode,
        sample_rate: f64,
        channels: usize,
    ) {
        self.enabled = enabled;
        self.sample_rate = sample_rate;
        self.channels = channels.min(MAX_CHANNELS);

        let gated = enabled
            && effect_level > 0
            && operating_mode == OperatingMode::On
            && sample_rate >= TREBLE_BOOST_MIN_RATE_HZ;

        self.active = gated;
        if gated {
            let gain_db = effect_level as f64 / 100.0 * 9.0;
            let coeffs = BiquadCoeffs::high_shelf(SHELF_FREQ_HZ, SHELF_Q, gain_db, sample_rate);
            for f in &mut self.shelf {
                f.set_coeffs(coeffs);
            }
        } else {
            for f in &mut self.shelf {
                f.set_coeffs(BiquadCoeffs::bypass());
            }
        }
    }

    pub fn clear_state(&mut self) {
        for f in &mut self.shelf {
            f.clear_state();
        }
    }

    /// Instantaneous bypass, no tail drain, unlike EQNB/DBE/CS.
    pub fn process_channel(&mut self, channel: usize, buffer: &mut [Sample]) {
        if channel >= self.channels || !self.active {
            return;
        }
        self.shelf[channel].process_block(buffer);
    }
}

impl crate::Processor for TrebleEnhancerModule {
    fn reset(&mut self) {
        self.clear_state();
    }
}

impl crate::ChannelProcessor for TrebleEnhancerModule {
    fn process_channel(&mut self, channel: usize, buffer: &mut [Sample]) {
        TrebleEnhancerModule::process_channel(self, channel, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gated_off_below_min_rate() {
        let mut m = TrebleEnhancerModule::new(16_000.0, 2);
        m.reconfigure(true, 100, OperatingMode::On, 16_000.0, 2);
        assert!(!m.active);
    }

    #[test]
    fn active_when_all_gates_pass() {
        let mut m = TrebleEnhancerModule::new(48_000.0, 2);
        m.reconfigure(true, 100, OperatingMode::On, 48_000.0, 2);
        assert!(m.active);
    }

    #[test]
    fn gated_off_when_operating_mode_off() {
        let mut m = TrebleEnhancerModule::new(48_000.0, 2);
        m.reconfigure(true, 100, OperatingMode::Off, 48_000.0, 2);
        assert!(!m.active);
    }
}
