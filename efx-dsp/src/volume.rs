//! Volume / balance control (VC).
//!
//! Per-channel gain driven by independent left/right [`GainSmoother`]s so
//! balance can move one side while the overall level moves both, using an
//! asymmetric balance-to-gain formula (attenuate the quieter side, leave the
//! louder side at unity) rather than a symmetric pan law.

use crate::smoothing::GainSmoother;
use efx_core::{db_to_linear, six_db_table_lookup, Sample};

/// Named after the original LVM bundle's `LVM_VC_MIXER_TIME`, which the
/// original fixes at a hardware-derived constant; 1.3 ms is fast enough to
/// be inaudible as a zipper but slow enough to avoid a click on a 0 dB
/// level step.
pub const VC_MIXER_TIME_MS: f64 = 1.3;

fn balance_gains(balance_db: f64) -> (f64, f64) {
    // atten_db = balance * 16, expressed in centibel (hence the extra 0.01)
    // so atten_db = balance * 0.16.
    let atten_db = balance_db * 0.16;
    if balance_db < 0.0 {
        (1.0, db_to_linear(atten_db))
    } else if balance_db > 0.0 {
        (db_to_linear(-atten_db), 1.0)
    } else {
        (1.0, 1.0)
    }
}

#[derive(Debug)]
pub struct VolumeModule {
    left: GainSmoother,
    right: GainSmoother,
    pub active: bool,
}

impl VolumeModule {
    pub fn new(sample_rate: f64) -> Self {
        let time_constant_s = VC_MIXER_TIME_MS / 1000.0;
        Self {
            left: GainSmoother::new(1.0, time_constant_s, sample_rate),
            right: GainSmoother::new(1.0, time_constant_s, sample_rate),
            active: false,
        }
    }

    /// Recompute left/right targets from the active (headroom-adjusted)
    /// volume level and balance.
    pub fn reconfigure(&mut self, level_db: f64, balance_db: f64, sample_rate: f64) {
        self.left.set_time_constant(VC_MIXER_TIME_MS / 1000.0, sample_rate);
        self.right.set_time_constant(VC_MIXER_TIME_MS / 1000.0, sample_rate);

        let overall = six_db_table_lookup(level_db);
        let (bal_l, bal_r) = balance_gains(balance_db);
        let target_l = overall * bal_l;
        let target_r = overall * bal_r;

        self.left.set_target(target_l);
        self.right.set_target(target_r);

        let unity = (target_l - 1.0).abs() < 1e-9 && (target_r - 1.0).abs() < 1e-9;
        self.active = !(unity && self.left.is_settled() && self.right.is_settled());
    }

    /// Clear both channels to unity instantly, e.g. on a format change.
    pub fn reset_to_unity(&mut self) {
        self.left.set_immediate(1.0);
        self.right.set_immediate(1.0);
        self.active = false;
    }

    /// Mono path: applies only the left smoother's gain (overall level;
    /// balance has no meaning with a single channel).
    pub fn process_mono(&mut self, buffer: &mut [Sample]) -> bool {
        let reached = self.left.apply_block(buffer);
        if reached && self.left.is_settled() {
            self.active = false;
        }
        reached
    }

    /// Process one stereo-interleaved channel pair. Returns `true` once per
    /// block in which either channel's "reached target" edge fired, which
    /// the bundle uses to mark VC inactive.
    pub fn process(&mut self, left: &mut [Sample], right: &mut [Sample]) -> bool {
        let mut reached = false;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let (gl, rl) = self.left.next();
            let (gr, rr) = self.right.next();
            *l = (*l as f64 * gl) as Sample;
            *r = (*r as f64 * gr) as Sample;
            reached |= rl || rr;
        }
        if reached && self.left.is_settled() && self.right.is_settled() {
            self.active = false;
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_balance_is_unity_both_sides() {
        assert_eq!(balance_gains(0.0), (1.0, 1.0));
    }

    #[test]
    fn negative_balance_attenuates_right_only() {
        let (l, r) = balance_gains(-96.0);
        assert_eq!(l, 1.0);
        assert!(r < 1.0);
        // ratio ~= 10^(-96*16/20*0.01)
        let expected = 10f64.powf(-96.0 * 16.0 / 20.0 * 0.01);
        assert!((r - expected).abs() < 1e-9);
    }

    #[test]
    fn positive_balance_attenuates_left_only() {
        let (l, r) = balance_gains(40.0);
        assert_eq!(r, 1.0);
        assert!(l < 1.0);
    }

    #[test]
    fn settling_marks_inactive_at_unity() {
        let mut v = VolumeModule::new(48_000.0);
        v.reconfigure(0.0, 0.0, 48_000.0);
        assert!(!v.active);
    }

    #[test]
    fn non_unity_target_stays_active_until_settled() {
        let mut v = VolumeModule::new(48_000.0);
        v.reconfigure(-6.0, 0.0, 48_000.0);
        assert!(v.active);
        let mut l = vec![1.0_f32; 20_000];
        let mut r = vec![1.0_f32; 20_000];
        v.process(&mut l, &mut r);
        assert!(!v.active);
    }
}
