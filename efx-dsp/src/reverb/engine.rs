//! The late-reflection DSP engine: tapped-delay early reflections, a
//! 6-stage diffusion allpass cascade, and a 4-line feedback delay network
//! for the late tail — a Schroeder/Moorer-style late-reflection engine.
//!
//! Early reflections use a 6-tap delay line, and the FDN mixes 4 lines with
//! a Hadamard matrix; both scales are sized for the perceptual
//! T60/damping/density/diffusion control surface this engine exposes,
//! rather than a sound-designer-facing voice count. Delay buffers are
//! power-of-two length and mask-indexed throughout rather than
//! modulo-indexed, trading a little memory for an index wrap that's a
//! single AND.

use super::params::EngineConfig;
use efx_core::Sample;

const MAX_DELAY_SAMPLES: usize = 16_384;

#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f64>,
    mask: usize,
    pos: usize,
    feedback: f64,
}

impl AllpassFilter {
    fn new(delay_samples: usize, feedback: f64) -> Self {
        let len = delay_samples.max(1).next_power_of_two().min(MAX_DELAY_SAMPLES);
        Self {
            buffer: vec![0.0; len],
            mask: len - 1,
            pos: 0,
            feedback,
        }
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let delayed = self.buffer[self.pos];
        let output = delayed - input * self.feedback;
        self.buffer[self.pos] = input + delayed * self.feedback;
        self.pos = (self.pos + 1) & self.mask;
        output
    }

    fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.pos = 0;
    }
}

/// Prime delay lengths in samples @ 48 kHz for the diffusion cascade.
const DIFFUSION_DELAYS: [usize; 6] = [113, 157, 211, 269, 337, 409];
/// Samples of extra delay on the right channel's taps, for stereo
/// decorrelation.
const STEREO_SPREAD: usize = 23;

#[derive(Debug, Clone)]
struct DiffusionStage {
    left: [AllpassFilter; 6],
    right: [AllpassFilter; 6],
}

impl DiffusionStage {
    fn new(sample_rate: f64) -> Self {
        let scale = sample_rate / 48_000.0;
        let left = std::array::from_fn(|i| AllpassFilter::new((DIFFUSION_DELAYS[i] as f64 * scale) as usize, 0.5));
        let right = std::array::from_fn(|i| {
            AllpassFilter::new(((DIFFUSION_DELAYS[i] + STEREO_SPREAD) as f64 * scale) as usize, 0.5)
        });
        Self { left, right }
    }

    /// `density` here is the engine's all-pass gain axis, 0..100 mapped to
    /// feedback `0.30..0.65`.
    fn set_density(&mut self, density: f64) {
        let feedback = 0.30 + (density / 100.0).clamp(0.0, 1.0) * 0.35;
        for ap in &mut self.left {
            ap.feedback = feedback;
        }
        for ap in &mut self.right {
            ap.feedback = feedback;
        }
    }

    #[inline]
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let mut l = left;
        let mut r = right;
        for i in 0..6 {
            l = self.left[i].process(l);
            r = self.right[i].process(r);
        }
        (l, r)
    }

    fn clear(&mut self) {
        for ap in &mut self.left {
            ap.clear();
        }
        for ap in &mut self.right {
            ap.clear();
        }
    }
}

#[derive(Debug, Clone)]
struct FdnLine {
    buffer: Vec<f64>,
    mask: usize,
    pos: usize,
    base_delay: usize,
    lpf_state: f64,
    lpf_coeff: f64,
    feedback_gain: f64,
}

impl FdnLine {
    fn new(base_delay: usize) -> Self {
        let len = (base_delay + 1).next_power_of_two().min(MAX_DELAY_SAMPLES);
        Self {
            buffer: vec![0.0; len],
            mask: len - 1,
            pos: 0,
            base_delay: base_delay.min(len - 1),
            lpf_state: 0.0,
            lpf_coeff: 1.0,
            feedback_gain: 0.0,
        }
    }

    #[inline]
    fn read(&self) -> f64 {
        let read_pos = (self.pos + self.buffer.len() - self.base_delay) & self.mask;
        self.buffer[read_pos]
    }

    #[inline]
    fn write(&mut self, sample: f64) {
        self.buffer[self.pos] = sample;
        self.pos = (self.pos + 1) & self.mask;
    }

    #[inline]
    fn damp(&mut self, sample: f64) -> f64 {
        self.lpf_state += (sample - self.lpf_state) * self.lpf_coeff;
        self.lpf_state
    }

    fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.pos = 0;
        self.lpf_state = 0.0;
    }
}

/// Prime FDN delay lengths in samples @ 48 kHz.
const FDN_PRIMES: [usize; 4] = [1087, 1283, 1669, 2293];

/// Normalized 4x4 Hadamard mixing matrix (1/2).
const HADAMARD_4: [[f64; 4]; 4] = [
    [0.5, 0.5, 0.5, 0.5],
    [0.5, -0.5, 0.5, -0.5],
    [0.5, 0.5, -0.5, -0.5],
    [0.5, -0.5, -0.5, 0.5],
];

#[derive(Debug, Clone)]
struct FeedbackDelayNetwork {
    lines: [FdnLine; 4],
    sample_rate: f64,
    room_size_scale: f64,
}

impl FeedbackDelayNetwork {
    fn new(sample_rate: f64) -> Self {
        let sr_scale = sample_rate / 48_000.0;
        Self {
            lines: std::array::from_fn(|i| FdnLine::new((FDN_PRIMES[i] as f64 * sr_scale) as usize)),
            sample_rate,
            room_size_scale: 1.0,
        }
    }

    /// `t60_ms` drives each line's feedback gain via the standard
    /// Schroeder decay-time formula `g = 10^(-3 * delay / (fs * T60))`;
    /// `lpf_hz` and `damping` (a decay-HF-ratio-derived value) jointly set
    /// the per-line one-pole damping coefficient — `damping` pulls the
    /// effective cutoff down from `lpf_hz` since higher decay-HF-ratio
    /// means faster high-frequency decay.
    fn reconfigure(&mut self, t60_ms: f64, lpf_hz: f64, damping: f64, room_size: f64) {
        self.room_size_scale = (room_size / 100.0).clamp(0.01, 1.0);
        let sr_scale = self.sample_rate / 48_000.0;
        let effective_lpf_hz = (lpf_hz * (1.0 - (damping / 100.0).clamp(0.0, 0.9))).max(50.0);
        let lpf_coeff = 1.0 - (-2.0 * std::f64::consts::PI * effective_lpf_hz / self.sample_rate).exp();

        for (i, line) in self.lines.iter_mut().enumerate() {
            let scaled_delay = (FDN_PRIMES[i] as f64 * sr_scale * self.room_size_scale) as usize;
            line.base_delay = scaled_delay.min(line.buffer.len() - 1).max(1);
            line.lpf_coeff = lpf_coeff;
            let delay_seconds = line.base_delay as f64 / self.sample_rate;
            let t60_seconds = (t60_ms / 1000.0).max(0.001);
            line.feedback_gain = 10f64.powf(-3.0 * delay_seconds / t60_seconds).min(0.999);
        }
    }

    #[inline]
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let mut outputs = [0.0f64; 4];
        for i in 0..4 {
            outputs[i] = self.lines[i].read();
        }

        let mut mixed = [0.0f64; 4];
        for i in 0..4 {
            mixed[i] = (0..4).map(|j| HADAMARD_4[i][j] * outputs[j]).sum();
        }

        let inputs = [(left + right) * 0.5, (left - right) * 0.5, left * 0.3 + right * 0.2, left * 0.2 + right * 0.3];

        for i in 0..4 {
            let damped = self.lines[i].damp(mixed[i]);
            let gain = self.lines[i].feedback_gain;
            self.lines[i].write(damped * gain + inputs[i]);
        }

        (outputs[0] + outputs[2], outputs[1] + outputs[3])
    }

    fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }
}

const ER_TAP_MS: [f64; 6] = [5.0, 13.0, 23.0, 31.0, 43.0, 59.0];
const ER_TAP_GAINS: [f64; 6] = [0.60, 0.50, 0.42, 0.35, 0.28, 0.22];

#[derive(Debug, Clone)]
struct EarlyReflections {
    buffer_l: Vec<f64>,
    buffer_r: Vec<f64>,
    mask: usize,
    pos: usize,
    taps: [usize; 6],
}

impl EarlyReflections {
    fn new(sample_rate: f64) -> Self {
        let max_ms = ER_TAP_MS[5];
        let len = ((max_ms * 0.001 * sample_rate) as usize + 1)
            .next_power_of_two()
            .min(MAX_DELAY_SAMPLES);
        let taps = std::array::from_fn(|i| ((ER_TAP_MS[i] * 0.001 * sample_rate) as usize).min(len - 1));
        Self {
            buffer_l: vec![0.0; len],
            buffer_r: vec![0.0; len],
            mask: len - 1,
            pos: 0,
            taps,
        }
    }

    #[inline]
    fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        self.buffer_l[self.pos] = left;
        self.buffer_r[self.pos] = right;

        let mut out_l = 0.0;
        let mut out_r = 0.0;
        for (tap, gain) in self.taps.iter().zip(ER_TAP_GAINS.iter()) {
            let read_pos = (self.pos + self.buffer_l.len() - tap) & self.mask;
            out_l += self.buffer_l[read_pos] * gain;
            out_r += self.buffer_r[read_pos] * gain;
        }

        self.pos = (self.pos + 1) & self.mask;
        (out_l, out_r)
    }

    fn clear(&mut self) {
        self.buffer_l.iter_mut().for_each(|s| *s = 0.0);
        self.buffer_r.iter_mut().for_each(|s| *s = 0.0);
        self.pos = 0;
    }
}

/// The full late-reflection signal chain: early reflections -> diffusion ->
/// FDN late tail.
#[derive(Debug, Clone)]
pub struct ReverbEngine {
    early: EarlyReflections,
    diffusion: DiffusionStage,
    fdn: FeedbackDelayNetwork,
}

impl ReverbEngine {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            early: EarlyReflections::new(sample_rate),
            diffusion: DiffusionStage::new(sample_rate),
            fdn: FeedbackDelayNetwork::new(sample_rate),
        }
    }

    pub fn reconfigure(&mut self, cfg: &EngineConfig) {
        self.diffusion.set_density(cfg.allpass_density);
        self.fdn.reconfigure(cfg.t60_ms, cfg.lpf_hz, cfg.damping, cfg.room_size);
    }

    pub fn clear_state(&mut self) {
        self.early.clear();
        self.diffusion.clear();
        self.fdn.clear();
    }

    pub fn process_block(&mut self, in_l: &[Sample], in_r: &[Sample], out_l: &mut [Sample], out_r: &mut [Sample]) {
        for i in 0..in_l.len() {
            let (er_l, er_r) = self.early.process(in_l[i] as f64, in_r[i] as f64);
            let (d_l, d_r) = self.diffusion.process(er_l, er_r);
            let (w_l, w_r) = self.fdn.process(d_l, d_r);
            out_l[i] = w_l as Sample;
            out_r[i] = w_r as Sample;
        }
    }
}
