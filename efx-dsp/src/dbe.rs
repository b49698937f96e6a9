//! Dynamic bass enhancer (DBE).
//!
//! A low-shelf boost at one of four fixed centre frequencies, with an
//! optional highpass stage ahead of it to stop the boost from piling sub-20
//! Hz rumble onto the shelf. Keeps a concrete shelf filter per channel
//! rather than a generic cascade, since there's only ever the one band.

use crate::biquad::{BiquadCoeffs, BiquadDf1};
use crate::control::BassCentreFreq;
use efx_core::Sample;

const MAX_CHANNELS: usize = 8;
/// Fixed Q for the shelf; the original LVM bundle's bass boost uses a
/// single fixed shelf slope rather than a caller-tunable Q.
const SHELF_Q: f64 = 0.9;
/// Highpass corner well below the lowest centre frequency (55 Hz), to trim
/// content the shelf would otherwise re-boost without adding audible bass.
const HPF_HZ: f64 = 24.0;

#[derive(Debug, Clone)]
pub struct BassEnhancerModule {
    shelf: [BiquadDf1; MAX_CHANNELS],
    hpf: [BiquadDf1; MAX_CHANNELS],
    channels: usize,
    sample_rate: f64,
    pub enabled: bool,
    pub hpf_enabled: bool,
    pub active: bool,
    samples_to_exit: usize,
}

impl BassEnhancerModule {
    pub fn new(sample_rate: f64, channels: usize) -> Self {
        let mut m = Self {
            shelf: [BiquadDf1::new(); MAX_CHANNELS],
            hpf: [BiquadDf1::new(); MAX_CHANNELS],
            channels: channels.min(MAX_CHANNELS),
            sample_rate,
            enabled: false,
            hpf_enabled: true,
            active: false,
            samples_to_exit: 0,
        };
        m.recompute(BassCentreFreq::Hz55, 0);
        m
    }

    fn recompute(&mut self, centre: BassCentreFreq, effect_level: u8) {
        let gain_db = effect_level as f64 / 100.0 * 12.0;
        let shelf_coeffs =
            BiquadCoeffs::low_shelf(centre.as_hz(), SHELF_Q, gain_db, self.sample_rate);
        let hpf_coeffs = BiquadCoeffs::highpass(HPF_HZ, 0.707, self.sample_rate);
        for f in &mut self.shelf {
            f.set_coeffs(shelf_coeffs);
        }
        for f in &mut self.hpf {
            f.set_coeffs(hpf_coeffs);
        }
    }

    pub fn reconfigure(
        &mut self,
        enabled: bool,
        effect_level: u8,
        centre: BassCentreFreq,
        hpf_enabled: bool,
        sample_rate: f64,
        channels: usize,
    ) {
        let was_enabled = self.enabled;
        self.enabled = enabled;
        self.hpf_enabled = hpf_enabled;
        self.sample_rate = sample_rate;
        self.channels = channels.min(MAX_CHANNELS);
        self.recompute(centre, effect_level);
        if enabled {
            self.active = true;
            self.samples_to_exit = 0;
        } else if was_enabled {
            self.samples_to_exit = self.tail_samples();
        }
    }

    pub fn clear_state(&mut self) {
        for f in &mut self.shelf {
            f.clear_state();
        }
        for f in &mut self.hpf {
            f.clear_state();
        }
        self.samples_to_exit = 0;
        self.active = self.enabled;
    }

    /// Bypasses once disabled and the tail has finished draining; otherwise
    /// still runs the filters so a disabled module's ring decays audibly
    /// instead of cutting off.
    pub fn process_channel(&mut self, channel: usize, buffer: &mut [Sample]) {
        if channel >= self.channels || !self.active {
            return;
        }
        if self.hpf_enabled {
            self.hpf[channel].process_block(buffer);
        }
        self.shelf[channel].process_block(buffer);
    }

    /// Advance the tail-drain counter by one block; call once per processed
    /// block, after `process_channel` has run for every channel.
    pub fn advance(&mut self, n_frames: usize) {
        if self.enabled {
            return;
        }
        if self.samples_to_exit > 0 {
            self.samples_to_exit = self.samples_to_exit.saturating_sub(n_frames);
            if self.is_state_silent() {
                self.samples_to_exit = 0;
            }
        }
        self.active = self.samples_to_exit > 0;
    }

    /// Same tail policy as EQNB.
    pub fn tail_samples(&self) -> usize {
        (self.sample_rate * 0.05) as usize
    }

    pub fn is_state_silent(&self) -> bool {
        self.shelf[..self.channels]
            .iter()
            .chain(self.hpf[..self.channels].iter())
            .all(|f| f.state_energy() < 1e-18)
    }
}

impl crate::Processor for BassEnhancerModule {
    fn reset(&mut self) {
        self.clear_state();
    }
}

impl crate::ChannelProcessor for BassEnhancerModule {
    fn process_channel(&mut self, channel: usize, buffer: &mut [Sample]) {
        BassEnhancerModule::process_channel(self, channel, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boosts_low_frequency_content() {
        let mut m = BassEnhancerModule::new(48_000.0, 2);
        m.reconfigure(true, 100, BassCentreFreq::Hz55, false, 48_000.0, 2);
        let mut buf: Vec<Sample> = (0..4000)
            .map(|i| (2.0 * std::f64::consts::PI * 55.0 * i as f64 / 48_000.0).sin() as Sample)
            .collect();
        m.process_channel(0, &mut buf);
        let peak = buf[3000..].iter().fold(0.0_f32, |mx, &x| mx.max(x.abs()));
        assert!(peak > 1.2);
    }

    #[test]
    fn hpf_removes_dc_offset() {
        let mut m = BassEnhancerModule::new(48_000.0, 1);
        m.reconfigure(true, 0, BassCentreFreq::Hz55, true, 48_000.0, 1);
        let mut buf = vec![1.0_f32; 2000];
        m.process_channel(0, &mut buf);
        assert!(buf[1999].abs() < 0.05);
    }

    #[test]
    fn disabled_module_bypasses_even_with_hpf_enabled() {
        // Default params: enabled=false, hpf_enabled=true. A disabled
        // enhancer must not filter at all, not even the HPF leg.
        let mut m = BassEnhancerModule::new(48_000.0, 1);
        let input = vec![1.0_f32; 256];
        let mut buf = input.clone();
        m.process_channel(0, &mut buf);
        assert_eq!(buf, input);
    }

    #[test]
    fn disable_drains_tail_then_bypasses() {
        let mut m = BassEnhancerModule::new(48_000.0, 1);
        m.reconfigure(true, 100, BassCentreFreq::Hz55, false, 48_000.0, 1);
        let mut warm = vec![1.0_f32; 64];
        m.process_channel(0, &mut warm);

        m.reconfigure(false, 100, BassCentreFreq::Hz55, false, 48_000.0, 1);
        assert!(m.active);

        let mut drained = false;
        for _ in 0..200 {
            let input = vec![0.0_f32; 64];
            let mut buf = input.clone();
            m.process_channel(0, &mut buf);
            m.advance(64);
            if !m.active {
                let mut bypassed = vec![0.3_f32; 64];
                let before = bypassed.clone();
                m.process_channel(0, &mut bypassed);
                assert_eq!(bypassed, before);
                drained = true;
                break;
            }
        }
        assert!(drained, "module never finished draining");
    }
}
