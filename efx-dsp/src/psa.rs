//! Peak-Spectrum Analyzer (PSA): a post-VC metering tap, not a DSP stage in
//! the signal path — it observes and publishes band levels for the host to
//! read, through atomics a UI thread can poll without locking the audio
//! thread.

use crate::biquad::{BiquadCoeffs, BiquadDf1};
use crate::control::PeakDecaySpeed;
use efx_core::Sample;
use std::sync::atomic::{AtomicU32, Ordering};

/// Log-spaced analysis band centres covering the audible range PSA reports
/// on; five bands is the smallest set that still tracks sub-bass through
/// presence independently.
const BAND_CENTRES_HZ: [f64; 5] = [60.0, 250.0, 1_000.0, 4_000.0, 12_000.0];
const BAND_Q: f64 = 1.4;

/// 1 ms attack: peak meters rise near-instantly and only the *release*
/// ballistic is user-selectable.
const ATTACK_MS: f64 = 1.0;

fn release_ms(speed: PeakDecaySpeed) -> f64 {
    match speed {
        PeakDecaySpeed::Low => 1_500.0,
        PeakDecaySpeed::Medium => 600.0,
        PeakDecaySpeed::High => 200.0,
    }
}

fn coeff_for(time_ms: f64, sample_rate: f64) -> f64 {
    let samples = (time_ms / 1000.0 * sample_rate).max(1.0);
    1.0 - (-1.0 / samples).exp()
}

#[derive(Debug)]
struct Band {
    filter: BiquadDf1,
    envelope: f64,
    attack: f64,
    release: f64,
    level_bits: AtomicU32,
}

impl Band {
    fn new(freq_hz: f64, sample_rate: f64, decay_speed: PeakDecaySpeed) -> Self {
        let mut filter = BiquadDf1::new();
        filter.set_coeffs(BiquadCoeffs::bandpass(freq_hz, BAND_Q, sample_rate));
        Self {
            filter,
            envelope: 0.0,
            attack: coeff_for(ATTACK_MS, sample_rate),
            release: coeff_for(release_ms(decay_speed), sample_rate),
            level_bits: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    #[inline]
    fn process(&mut self, input: Sample) {
        let band_sample = self.filter.process(input).abs() as f64;
        let coeff = if band_sample > self.envelope {
            self.attack
        } else {
            self.release
        };
        self.envelope += coeff * (band_sample - self.envelope);
        self.level_bits
            .store((self.envelope as f32).to_bits(), Ordering::Release);
    }

    fn level(&self) -> f32 {
        f32::from_bits(self.level_bits.load(Ordering::Acquire))
    }
}

#[derive(Debug)]
pub struct PsaModule {
    bands: Vec<Band>,
    sample_rate: f64,
    pub enabled: bool,
}

impl PsaModule {
    pub fn new(sample_rate: f64, decay_speed: PeakDecaySpeed) -> Self {
        Self {
            bands: BAND_CENTRES_HZ
                .iter()
                .map(|&f| Band::new(f, sample_rate, decay_speed))
                .collect(),
            sample_rate,
            enabled: false,
        }
    }

    pub fn reconfigure(&mut self, enabled: bool, decay_speed: PeakDecaySpeed, sample_rate: f64) {
        self.enabled = enabled;
        self.sample_rate = sample_rate;
        for band in &mut self.bands {
            band.filter
                .set_coeffs(BiquadCoeffs::bandpass(0.0, BAND_Q, sample_rate));
        }
        for (band, &freq) in self.bands.iter_mut().zip(BAND_CENTRES_HZ.iter()) {
            band.filter
                .set_coeffs(BiquadCoeffs::bandpass(freq, BAND_Q, sample_rate));
            band.attack = coeff_for(ATTACK_MS, sample_rate);
            band.release = coeff_for(release_ms(decay_speed), sample_rate);
        }
    }

    /// Observe a post-VC mono-summed block; updates per-band peak levels
    /// but never mutates `buffer`.
    pub fn observe(&mut self, buffer: &[Sample]) {
        if !self.enabled {
            return;
        }
        for &s in buffer {
            for band in &mut self.bands {
                band.process(s);
            }
        }
    }

    /// Lock-free snapshot of current per-band peak levels, readable from a
    /// non-realtime thread — the natural publish side of an analyzer with
    /// no DSP output of its own.
    pub fn levels(&self) -> Vec<f32> {
        self.bands.iter().map(Band::level).collect()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_reports_zero_levels() {
        let mut p = PsaModule::new(48_000.0, PeakDecaySpeed::Medium);
        p.reconfigure(true, PeakDecaySpeed::Medium, 48_000.0);
        p.observe(&vec![0.0; 1000]);
        assert!(p.levels().iter().all(|&l| l.abs() < 1e-6));
    }

    #[test]
    fn tone_in_band_raises_that_bands_level() {
        let mut p = PsaModule::new(48_000.0, PeakDecaySpeed::High);
        p.reconfigure(true, PeakDecaySpeed::High, 48_000.0);
        let buf: Vec<Sample> = (0..4000)
            .map(|i| (2.0 * std::f64::consts::PI * 1000.0 * i as f64 / 48_000.0).sin() as Sample)
            .collect();
        p.observe(&buf);
        let levels = p.levels();
        assert!(levels[2] > levels[0]);
        assert!(levels[2] > levels[4]);
    }

    #[test]
    fn disabled_module_does_not_update() {
        let mut p = PsaModule::new(48_000.0, PeakDecaySpeed::Medium);
        p.observe(&vec![1.0; 1000]);
        assert!(p.levels().iter().all(|&l| l == 0.0));
    }
}
