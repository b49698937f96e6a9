//! N-band parametric equalizer (EQNB).
//!
//! A cascade of biquad peaking filters, one per configured band, applied
//! independently to every channel. Each band keeps a fixed-size per-channel
//! filter array and only the `Bell`/peaking shape — there's no need for a
//! general filter-type selector here.

use crate::biquad::{BiquadCoeffs, BiquadDf1};
use crate::control::EqBandDef;
use efx_core::Sample;

const MAX_CHANNELS: usize = 8;

/// One band's per-channel filter bank plus its last-known definition, so
/// `reconfigure` can skip recomputing a `BiquadCoeffs` for a band whose
/// frequency/gain/Q did not change.
#[derive(Debug, Clone)]
struct Band {
    def: EqBandDef,
    filters: [BiquadDf1; MAX_CHANNELS],
}

impl Band {
    fn new(def: EqBandDef, sample_rate: f64) -> Self {
        let coeffs = BiquadCoeffs::peaking(def.centre_hz, def.q(), def.gain_db, sample_rate);
        let mut filters = [BiquadDf1::new(); MAX_CHANNELS];
        for f in &mut filters {
            f.set_coeffs(coeffs);
        }
        Self { def, filters }
    }

    fn reconfigure(&mut self, def: EqBandDef, sample_rate: f64) {
        if self.def == def {
            return;
        }
        let coeffs = BiquadCoeffs::peaking(def.centre_hz, def.q(), def.gain_db, sample_rate);
        for f in &mut self.filters {
            f.set_coeffs(coeffs);
        }
        self.def = def;
    }
}

#[derive(Debug, Clone)]
pub struct EqnbModule {
    bands: Vec<Band>,
    channels: usize,
    sample_rate: f64,
    pub enabled: bool,
    pub active: bool,
    samples_to_exit: usize,
}

impl EqnbModule {
    pub fn new(sample_rate: f64, channels: usize) -> Self {
        Self {
            bands: Vec::new(),
            channels: channels.min(MAX_CHANNELS),
            sample_rate,
            enabled: false,
            active: false,
            samples_to_exit: 0,
        }
    }

    /// Reconfigure from a validated band list.
    pub fn reconfigure(&mut self, enabled: bool, defs: &[EqBandDef], sample_rate: f64, channels: usize) {
        let was_enabled = self.enabled;
        self.enabled = enabled;
        self.sample_rate = sample_rate;
        self.channels = channels.min(MAX_CHANNELS);

        if self.bands.len() > defs.len() {
            self.bands.truncate(defs.len());
        }
        for (i, def) in defs.iter().enumerate() {
            match self.bands.get_mut(i) {
                Some(band) => band.reconfigure(*def, sample_rate),
                None => self.bands.push(Band::new(*def, sample_rate)),
            }
        }
        if enabled && !self.bands.is_empty() {
            self.active = true;
            self.samples_to_exit = 0;
        } else if was_enabled {
            self.samples_to_exit = self.tail_samples();
        }
    }

    /// Clear all filter state lines to silence (format or sample-rate
    /// change).
    pub fn clear_state(&mut self) {
        for band in &mut self.bands {
            for f in &mut band.filters {
                f.clear_state();
            }
        }
        self.samples_to_exit = 0;
        self.active = self.enabled && !self.bands.is_empty();
    }

    /// Bypasses once disabled and the tail has finished draining; otherwise
    /// still runs the band cascade so a disabled EQ's ringing decays
    /// audibly instead of cutting off mid-tail.
    pub fn process_channel(&mut self, channel: usize, buffer: &mut [Sample]) {
        if channel >= self.channels || !self.active {
            return;
        }
        for band in &mut self.bands {
            let filter = &mut band.filters[channel];
            for s in buffer.iter_mut() {
                *s = filter.process(*s);
            }
        }
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

    /// Tail-drain length in samples. A biquad's ringing dies off in a
    /// handful of periods of its lowest-frequency band; 50 ms covers the
    /// lowest EQNB band frequency allowed (20 Hz, one period = 50 ms) with
    /// margin for the filter's Q.
    pub fn tail_samples(&self) -> usize {
        (self.sample_rate * 0.05) as usize
    }

    /// Below this, the cascade's combined state energy is considered
    /// silent.
    pub fn is_state_silent(&self) -> bool {
        self.bands
            .iter()
            .all(|b| b.filters[..self.channels].iter().all(|f| f.state_energy() < 1e-18))
    }
}

impl crate::Processor for EqnbModule {
    fn reset(&mut self) {
        self.clear_state();
    }
}

impl crate::ChannelProcessor for EqnbModule {
    fn process_channel(&mut self, channel: usize, buffer: &mut [Sample]) {
        EqnbModule::process_channel(self, channel, buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peaking_band_boosts_signal() {
        let mut m = EqnbModule::new(48_000.0, 2);
        m.reconfigure(
            true,
            &[EqBandDef {
                centre_hz: 1000.0,
                gain_db: 12.0,
                q_centi: 96,
            }],
            48_000.0,
            2,
        );
        let mut buf: Vec<Sample> = (0..2000)
            .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 48_000.0).sin() as Sample)
            .collect();
        m.process_channel(0, &mut buf);
        let peak = buf[1500..].iter().fold(0.0_f32, |m, &x| m.max(x.abs()));
        assert!(peak > 1.5);
    }

    #[test]
    fn unchanged_band_skips_recompute() {
        let def = EqBandDef {
            centre_hz: 200.0,
            gain_db: 3.0,
            q_centi: 100,
        };
        let mut band = Band::new(def, 48_000.0);
        band.filters[0].process(1.0);
        let coeffs_before = band.filters[0].coeffs();
        band.reconfigure(def, 48_000.0);
        assert_eq!(band.filters[0].coeffs(), coeffs_before);
    }

    #[test]
    fn disabled_eqnb_bypasses_despite_populated_bands() {
        // A caller that toggles equalizer.enabled off while keeping a
        // populated band list must still get an untouched signal.
        let mut m = EqnbModule::new(48_000.0, 1);
        m.reconfigure(
            false,
            &[EqBandDef {
                centre_hz: 1000.0,
                gain_db: 12.0,
                q_centi: 96,
            }],
            48_000.0,
            1,
        );
        let input = vec![0.3_f32; 256];
        let mut buf = input.clone();
        m.process_channel(0, &mut buf);
        assert_eq!(buf, input);
    }

    #[test]
    fn disable_drains_tail_then_bypasses() {
        let band = EqBandDef {
            centre_hz: 1000.0,
            gain_db: 12.0,
            q_centi: 96,
        };
        let mut m = EqnbModule::new(48_000.0, 1);
        m.reconfigure(true, &[band], 48_000.0, 1);
        let mut warm: Vec<Sample> = (0..64)
            .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 48_000.0).sin() as Sample)
            .collect();
        m.process_channel(0, &mut warm);

        m.reconfigure(false, &[band], 48_000.0, 1);
        assert!(m.active);

        let mut drained = false;
        for _ in 0..200 {
            let mut buf = vec![0.0_f32; 64];
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
