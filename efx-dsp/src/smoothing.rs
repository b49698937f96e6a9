//! Lock-free gain smoothing with a "target reached" edge.
//!
//! An atomically-set target consumed sample-by-sample by a one-pole
//! follower, with the follower edge exposed so a caller can detect exactly
//! the sample where the ramp settles — the bundle uses this to mark the
//! volume control module inactive and fall back to a unity-copy fast path.

use efx_core::Sample;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Epsilon below which the smoother is considered to have reached its
/// target.
const REACHED_EPSILON: f64 = 1e-6;

/// A single smoothed scalar gain with a lock-free target.
#[derive(Debug)]
pub struct GainSmoother {
    target: AtomicU64,
    dirty: AtomicBool,
    current: f64,
    coeff: f64,
}

impl GainSmoother {
    /// `time_constant_s` is the smoother's characteristic time; the default
    /// used for balance moves is `≈ 1024 / fs` seconds.
    pub fn new(initial: f64, time_constant_s: f64, sample_rate: f64) -> Self {
        Self {
            target: AtomicU64::new(initial.to_bits()),
            dirty: AtomicBool::new(false),
            current: initial,
            coeff: Self::coeff_for(time_constant_s, sample_rate),
        }
    }

    fn coeff_for(time_constant_s: f64, sample_rate: f64) -> f64 {
        let samples = (time_constant_s * sample_rate).max(1.0);
        1.0 - (-1.0 / samples).exp()
    }

    /// Re-derive the smoothing coefficient for a new sample rate or time
    /// constant.
    pub fn set_time_constant(&mut self, time_constant_s: f64, sample_rate: f64) {
        self.coeff = Self::coeff_for(time_constant_s, sample_rate);
    }

    /// Set a new target (callable from a non-realtime thread).
    #[inline]
    pub fn set_target(&self, value: f64) {
        self.target.store(value.to_bits(), Ordering::Release);
        self.dirty.store(true, Ordering::Release);
    }

    #[inline]
    pub fn target(&self) -> f64 {
        f64::from_bits(self.target.load(Ordering::Acquire))
    }

    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Snap directly to the target, bypassing the ramp (used by reverb's
    /// `flat` volume mode and by module re-activation after a format
    /// change).
    pub fn set_immediate(&mut self, value: f64) {
        self.current = value;
        self.target.store(value.to_bits(), Ordering::Release);
        self.dirty.store(false, Ordering::Release);
    }

    /// Advance one sample of smoothing, returning the new current value and
    /// whether the target was just reached on this call.
    #[inline]
    pub fn next(&mut self) -> (f64, bool) {
        let target = self.target();
        let was_settled = (self.current - target).abs() <= REACHED_EPSILON;
        self.current += self.coeff * (target - self.current);
        let now_settled = (self.current - target).abs() <= REACHED_EPSILON;
        (self.current, !was_settled && now_settled)
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target()).abs() <= REACHED_EPSILON
    }

    pub fn apply_block(&mut self, buffer: &mut [Sample]) -> bool {
        let mut reached = false;
        for s in buffer.iter_mut() {
            let (gain, just_reached) = self.next();
            *s = (*s as f64 * gain) as Sample;
            reached |= just_reached;
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_and_fires_once() {
        let mut s = GainSmoother::new(0.0, 0.001, 48_000.0);
        s.set_target(1.0);
        let mut fires = 0;
        for _ in 0..10_000 {
            let (_, reached) = s.next();
            if reached {
                fires += 1;
            }
        }
        assert_eq!(fires, 1);
        assert!((s.current() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn immediate_set_has_no_ramp() {
        let mut s = GainSmoother::new(0.0, 0.01, 48_000.0);
        s.set_immediate(0.5);
        assert!((s.current() - 0.5).abs() < 1e-12);
        assert!(s.is_settled());
    }
}
