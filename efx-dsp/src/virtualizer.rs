//! Concert-Surround virtualizer (CS).
//!
//! Mid/side decomposition, an HRTF-approximating biquad on the side signal,
//! and a reverb-like comb send whose depth `reverb_level` scales. The comb
//! is a single feedback line rather than a full FDN, since it's a
//! width-widening send, not the late-reflection reverberator itself (that's
//! [`crate::reverb`]).

use crate::biquad::{BiquadCoeffs, BiquadDf1};
use efx_core::{Sample, SpeakerType, StereoSample};

/// A single feedback comb filter over a power-of-two, mask-indexed delay
/// line, the same convention the reverberator uses at larger scale.
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<Sample>,
    mask: usize,
    pos: usize,
    feedback: f64,
}

impl CombFilter {
    fn new(delay_samples: usize, feedback: f64) -> Self {
        let len = delay_samples.max(1).next_power_of_two();
        Self {
            buffer: vec![0.0; len],
            mask: len - 1,
            pos: 0,
            feedback,
        }
    }

    #[inline]
    fn process(&mut self, input: Sample) -> Sample {
        let read = self.buffer[self.pos];
        self.buffer[self.pos] = input + (self.feedback * read as f64) as Sample;
        self.pos = (self.pos + 1) & self.mask;
        read
    }

    fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.pos = 0;
    }
}

/// HRTF-approximating notch/boost centre: 3 kHz sits at the pinna-notch
/// region real HRTF measurements place the dominant lateralization cue.
const HRTF_FREQ_HZ: f64 = 3_000.0;
const HRTF_Q: f64 = 1.2;
/// 12 ms send delay, in the range typical "widener" comb sends use to avoid
/// audible periodicity while staying short enough not to read as a discrete
/// echo.
const COMB_DELAY_MS: f64 = 12.0;

#[derive(Debug, Clone)]
pub struct VirtualizerModule {
    side_filter: BiquadDf1,
    comb: CombFilter,
    side_gain: f64,
    comb_send: f64,
    pub enabled: bool,
    pub active: bool,
    sample_rate: f64,
    samples_to_exit: usize,
}

impl VirtualizerModule {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            side_filter: BiquadDf1::new(),
            comb: CombFilter::new((sample_rate * COMB_DELAY_MS / 1000.0) as usize, 0.3),
            side_gain: 0.0,
            comb_send: 0.0,
            enabled: false,
            active: false,
            sample_rate,
            samples_to_exit: 0,
        }
    }

    /// Reconfigure from validated params. `speaker` gates overall depth: the
    /// effect is meaningless over headphones, which already deliver full
    /// stereo separation.
    pub fn reconfigure(
        &mut self,
        enabled: bool,
        reverb_level: u8,
        effect_level: u8,
        speaker: SpeakerType,
        sample_rate: f64,
    ) {
        let was_enabled = self.enabled;
        self.enabled = enabled;
        self.sample_rate = sample_rate;

        let speaker_scale = match speaker {
            SpeakerType::Headphones | SpeakerType::ExHeadphones => 1.0,
            SpeakerType::Speaker | SpeakerType::MobileSpeaker => 0.6,
        };

        self.side_gain = (effect_level as f64 / 100.0) * speaker_scale;
        self.comb_send = reverb_level as f64 / 100.0;

        let coeffs = BiquadCoeffs::peaking(HRTF_FREQ_HZ, HRTF_Q, 6.0 * self.side_gain, sample_rate);
        self.side_filter.set_coeffs(coeffs);

        if self.comb.buffer.len() != (sample_rate * COMB_DELAY_MS / 1000.0) as usize {
            self.comb = CombFilter::new((sample_rate * COMB_DELAY_MS / 1000.0) as usize, 0.3);
        }

        if enabled {
            self.active = true;
            self.samples_to_exit = 0;
        } else if was_enabled {
            self.samples_to_exit = self.tail_samples();
        }
    }

    pub fn clear_state(&mut self) {
        self.side_filter.clear_state();
        self.comb.clear();
        self.samples_to_exit = 0;
        self.active = self.enabled;
    }

    /// Process one stereo frame in place. CS needs both channels jointly
    /// (mid/side), so unlike the per-channel modules it isn't exposed
    /// through [`crate::ChannelProcessor`].
    #[inline]
    pub fn process_frame(&mut self, frame: StereoSample) -> StereoSample {
        let mid = frame.mid();
        let mut side = frame.side();
        side = self.side_filter.process(side) as Sample;
        let send = self.comb.process(side) as f64 * self.comb_send;
        side = (side as f64 + send) as Sample;
        side = (side as f64 * (1.0 + self.side_gain)) as Sample;
        StereoSample::from_mid_side(mid, side)
    }

    /// Bypasses once disabled and the tail has finished draining; otherwise
    /// still runs the comb/side chain so a disabled CS's ring decays
    /// audibly instead of cutting off mid-tail.
    pub fn process_block(&mut self, left: &mut [Sample], right: &mut [Sample]) {
        if !self.active {
            return;
        }
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let out = self.process_frame(StereoSample::new(*l, *r));
            *l = out.left;
            *r = out.right;
        }
    }

    /// Advance the tail-drain counter by one block; call once per processed
    /// block, after `process_block`.
    pub fn advance(&mut self, n_frames: usize) {
        if self.enabled {
            return;
        }
        if self.samples_to_exit > 0 {
            self.samples_to_exit = self.samples_to_exit.saturating_sub(n_frames);
        }
        self.active = self.samples_to_exit > 0;
    }

    /// Drain length: the comb's delay line plus the side biquad's ring both
    /// need to settle.
    pub fn tail_samples(&self) -> usize {
        self.comb.buffer.len() + (self.sample_rate * 0.05) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_input_passes_through_unwidened() {
        let mut m = VirtualizerModule::new(48_000.0);
        m.reconfigure(true, 0, 0, SpeakerType::Speaker, 48_000.0);
        let out = m.process_frame(StereoSample::new(0.5, 0.5));
        assert!((out.left - 0.5).abs() < 1e-4);
        assert!((out.right - 0.5).abs() < 1e-4);
    }

    #[test]
    fn disabled_module_stays_inactive_until_enabled() {
        let mut m = VirtualizerModule::new(48_000.0);
        assert!(!m.active);
        m.reconfigure(true, 50, 50, SpeakerType::Speaker, 48_000.0);
        assert!(m.active);
    }

    #[test]
    fn disable_drains_tail_then_bypasses() {
        let mut m = VirtualizerModule::new(48_000.0);
        m.reconfigure(true, 80, 80, SpeakerType::Speaker, 48_000.0);
        let mut l = vec![0.3_f32; 64];
        let mut r = vec![-0.3_f32; 64];
        m.process_block(&mut l, &mut r);

        m.reconfigure(false, 80, 80, SpeakerType::Speaker, 48_000.0);
        assert!(m.active);

        let mut drained = false;
        for _ in 0..200 {
            let mut zl = vec![0.0_f32; 64];
            let mut zr = vec![0.0_f32; 64];
            m.process_block(&mut zl, &mut zr);
            m.advance(64);
            if !m.active {
                let mut bl = vec![0.3_f32; 64];
                let mut br = vec![0.3_f32; 64];
                let before_l = bl.clone();
                let before_r = br.clone();
                m.process_block(&mut bl, &mut br);
                assert_eq!(bl, before_l);
                assert_eq!(br, before_r);
                drained = true;
                break;
            }
        }
        assert!(drained, "module never finished draining");
    }
}
