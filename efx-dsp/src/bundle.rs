//! The effect-bundle controller: the top-level instance holding
//! active/pending control blocks, a dirty flag, and per-module handles,
//! mediating `set_control` / `apply` / `process`.
//!
//! Pending state lives behind a `Mutex` rather than a raw atomic-plus-
//! unsynchronized-write, which is not a sound pattern in safe Rust (see
//! DESIGN.md); a separate `AtomicU64` generation counter and `AtomicBool`
//! dirty flag give `apply` a bounded-retry snapshot loop without holding the
//! lock across the whole reconfigure pass.

use crate::control::{ControlParams, EngineLimits, HeadroomParams, OperatingMode};
use crate::dbe::BassEnhancerModule;
use crate::eqnb::EqnbModule;
use crate::headroom::derive_headroom_db;
use crate::psa::PsaModule;
use crate::treble::TrebleEnhancerModule;
use crate::virtualizer::VirtualizerModule;
use crate::volume::VolumeModule;
use efx_core::{EfxError, EfxResult, Sample, StereoSample};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Maximum number of snapshot attempts in `apply`'s retry loop before giving
/// up on consistency and taking whatever was last read.
const APPLY_MAX_RETRIES: u32 = 5;

/// Caller-supplied output buffer access mode: overwrite the output buffer, or
/// mix into whatever it already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    #[default]
    Write,
    Accumulate,
}

/// The top-level bundle instance. Owns all effect modules and their scratch
/// state.
pub struct EffectBundle {
    pending_control: Mutex<ControlParams>,
    pending_headroom: Mutex<HeadroomParams>,
    generation: AtomicU64,
    dirty: AtomicBool,

    active_control: ControlParams,
    active_headroom: HeadroomParams,
    limits: EngineLimits,

    eqnb: EqnbModule,
    dbe: BassEnhancerModule,
    cs: VirtualizerModule,
    te: TrebleEnhancerModule,
    vc: VolumeModule,
    psa: PsaModule,

    /// Per-channel scratch, grown monotonically up to the largest block
    /// seen; never shrunk, to avoid reallocating on every smaller callback.
    scratch: Vec<Vec<Sample>>,
    mix_scratch: Vec<Sample>,

    pub access_mode: AccessMode,
}

impl EffectBundle {
    /// Allocate state for all modules from a single control block. Fails
    /// atomically: any invalid field aborts before any module is built.
    pub fn create(control: ControlParams, headroom: HeadroomParams, limits: EngineLimits) -> EfxResult<Self> {
        control.validate(&limits)?;
        headroom.validate(&limits)?;

        let sample_rate = control.sample_rate.as_f64();
        let channels = control.format.channel_count();

        Ok(Self {
            pending_control: Mutex::new(control.clone()),
            pending_headroom: Mutex::new(headroom.clone()),
            generation: AtomicU64::new(0),
            dirty: AtomicBool::new(true),
            eqnb: EqnbModule::new(sample_rate, channels),
            dbe: BassEnhancerModule::new(sample_rate, channels),
            cs: VirtualizerModule::new(sample_rate),
            te: TrebleEnhancerModule::new(sample_rate, channels),
            vc: VolumeModule::new(sample_rate),
            psa: PsaModule::new(sample_rate, control.psa.decay_speed),
            active_control: control,
            active_headroom: headroom,
            limits,
            scratch: (0..channels).map(|_| Vec::new()).collect(),
            mix_scratch: Vec::new(),
            access_mode: AccessMode::Write,
        })
    }

    /// Validate and stage new parameters.
    pub fn set_control(&self, params: ControlParams) -> EfxResult<()> {
        if let Err(e) = params.validate(&self.limits) {
            log::warn!("rejected control-parameter submission: {e}");
            return Err(e);
        }
        *self.pending_control.lock().unwrap() = params;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    /// Returns the *pending* view: a set followed immediately by a get is
    /// consistent, even before the next `apply`.
    pub fn get_control(&self) -> ControlParams {
        self.pending_control.lock().unwrap().clone()
    }

    pub fn set_headroom(&self, params: HeadroomParams) -> EfxResult<()> {
        params.validate(&self.limits)?;
        *self.pending_headroom.lock().unwrap() = params;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    pub fn get_headroom(&self) -> HeadroomParams {
        self.pending_headroom.lock().unwrap().clone()
    }

    /// Reconcile pending -> active and reconfigure every module. Called
    /// implicitly by `process` whenever the dirty flag is set.
    pub fn apply(&mut self) -> EfxResult<()> {
        let mut control;
        let mut headroom;
        let mut attempt = 0;
        loop {
            let gen_before = self.generation.load(Ordering::Acquire);
            control = self.pending_control.lock().unwrap().clone();
            headroom = self.pending_headroom.lock().unwrap().clone();
            let gen_after = self.generation.load(Ordering::Acquire);
            attempt += 1;
            if gen_before == gen_after || attempt >= APPLY_MAX_RETRIES {
                break;
            }
        }

        let sample_rate = control.sample_rate.as_f64();
        let channels = control.format.channel_count();

        let format_changed =
            control.format != self.active_control.format || control.sample_rate != self.active_control.sample_rate;

        if format_changed {
            log::debug!(
                "format changed ({:?}@{:?} -> {:?}@{:?}), clearing filter state",
                self.active_control.format,
                self.active_control.sample_rate,
                control.format,
                control.sample_rate
            );
            self.eqnb.clear_state();
            self.dbe.clear_state();
            self.cs.clear_state();
            self.te.clear_state();
            self.vc.reset_to_unity();
            self.scratch = (0..channels).map(|_| Vec::new()).collect();
        }

        // Recompute treble-boost coefficients iff (sample-rate, TE level, TE
        // mode, operating mode, or speaker type) changed.
        let te_inputs_changed = sample_rate != self.active_control.sample_rate.as_f64()
            || control.treble != self.active_control.treble
            || control.operating_mode != self.active_control.operating_mode
            || control.speaker != self.active_control.speaker;
        if te_inputs_changed || format_changed {
            self.te.reconfigure(
                control.treble.enabled,
                control.treble.effect_level,
                control.operating_mode,
                sample_rate,
                channels,
            );
        }

        let headroom_db = derive_headroom_db(&control.equalizer, &headroom);
        let volume_level_db = (control.volume.level_db - headroom_db).min(0.0);
        self.vc.reconfigure(volume_level_db, control.volume.balance_db, sample_rate);

        self.dbe.reconfigure(
            control.bass.enabled,
            control.bass.effect_level,
            control.bass.centre_freq,
            control.bass.hpf_enabled,
            sample_rate,
            channels,
        );
        self.eqnb
            .reconfigure(control.equalizer.enabled, &control.equalizer.bands, sample_rate, channels);
        self.cs.reconfigure(
            control.virtualizer.enabled,
            control.virtualizer.reverb_level,
            control.virtualizer.effect_level,
            control.speaker,
            sample_rate,
        );
        self.psa
            .reconfigure(control.psa.enabled, control.psa.decay_speed, sample_rate);

        self.active_control = control;
        self.active_headroom = headroom;
        self.dirty.store(false, Ordering::Release);
        log::debug!("applied pending control/headroom after {attempt} snapshot attempt(s)");
        Ok(())
    }

    fn ensure_scratch(&mut self, channels: usize, n_frames: usize) {
        if self.scratch.len() < channels {
            self.scratch.resize_with(channels, Vec::new);
        }
        for buf in &mut self.scratch {
            if buf.len() < n_frames {
                buf.resize(n_frames, 0.0);
            }
        }
        if self.mix_scratch.len() < n_frames {
            self.mix_scratch.resize(n_frames, 0.0);
        }
    }

    /// Perform one block of work. `input`/`output` are per-channel
    /// (deinterleaved) slices, one per active channel.
    pub fn process(&mut self, input: &[&[Sample]], output: &mut [&mut [Sample]], n_frames: usize) -> EfxResult<()> {
        if input.len() != output.len() {
            return Err(EfxError::InvalidArgument(
                "input/output channel count mismatch".into(),
            ));
        }
        for ch in input {
            if ch.len() < n_frames {
                return Err(EfxError::InvalidArgument("input buffer shorter than n_frames".into()));
            }
        }
        for ch in output.iter() {
            if ch.len() < n_frames {
                return Err(EfxError::InvalidArgument("output buffer shorter than n_frames".into()));
            }
        }

        if self.dirty.load(Ordering::Acquire) {
            self.apply()?;
        }

        let channels = input.len();

        if self.active_control.operating_mode == OperatingMode::Off {
            self.write_out(input, output, n_frames);
            return Ok(());
        }

        self.ensure_scratch(channels, n_frames);
        for (ch, src) in input.iter().enumerate() {
            self.scratch[ch][..n_frames].copy_from_slice(&src[..n_frames]);
        }

        for ch in 0..channels {
            let buf = &mut self.scratch[ch][..n_frames];
            self.eqnb.process_channel(ch, buf);
            self.dbe.process_channel(ch, buf);
        }
        self.eqnb.advance(n_frames);
        self.dbe.advance(n_frames);

        if channels >= 2 {
            let (left_rest, right_rest) = self.scratch.split_at_mut(1);
            let left = &mut left_rest[0][..n_frames];
            let right = &mut right_rest[0][..n_frames];
            self.cs.process_block(left, right);
            self.cs.advance(n_frames);
        }

        for ch in 0..channels {
            let buf = &mut self.scratch[ch][..n_frames];
            self.te.process_channel(ch, buf);
        }

        if channels >= 2 {
            let (left_rest, right_rest) = self.scratch.split_at_mut(1);
            let left = &mut left_rest[0][..n_frames];
            let right = &mut right_rest[0][..n_frames];
            self.vc.process(left, right);
        } else {
            self.vc.process_mono(&mut self.scratch[0][..n_frames]);
        }

        for i in 0..n_frames {
            let sum: f64 = (0..channels).map(|ch| self.scratch[ch][i] as f64).sum();
            self.mix_scratch[i] = (sum / channels as f64) as Sample;
        }
        self.psa.observe(&self.mix_scratch[..n_frames]);

        for (ch, dst) in output.iter_mut().enumerate() {
            match self.access_mode {
                AccessMode::Write => dst[..n_frames].copy_from_slice(&self.scratch[ch][..n_frames]),
                AccessMode::Accumulate => {
                    for i in 0..n_frames {
                        dst[i] += self.scratch[ch][i];
                    }
                }
            }
        }

        Ok(())
    }

    fn write_out(&self, input: &[&[Sample]], output: &mut [&mut [Sample]], n_frames: usize) {
        for (src, dst) in input.iter().zip(output.iter_mut()) {
            match self.access_mode {
                AccessMode::Write => dst[..n_frames].copy_from_slice(&src[..n_frames]),
                AccessMode::Accumulate => {
                    for i in 0..n_frames {
                        dst[i] += src[i];
                    }
                }
            }
        }
    }

    pub fn active_control(&self) -> &ControlParams {
        &self.active_control
    }

    pub fn psa_levels(&self) -> Vec<f32> {
        self.psa.levels()
    }
}

impl crate::Processor for EffectBundle {
    fn reset(&mut self) {
        self.eqnb.clear_state();
        self.dbe.clear_state();
        self.cs.clear_state();
        self.te.clear_state();
        self.vc.reset_to_unity();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{EqBandDef, HeadroomRange};
    use efx_core::SourceFormat;

    fn bundle() -> EffectBundle {
        let mut control = ControlParams::default();
        control.format = SourceFormat::Stereo;
        control.operating_mode = OperatingMode::On;
        EffectBundle::create(control, HeadroomParams::default(), EngineLimits::default()).unwrap()
    }

    #[test]
    fn bypass_identity_when_operating_mode_off() {
        let mut control = ControlParams::default();
        control.format = SourceFormat::Stereo;
        control.operating_mode = OperatingMode::Off;
        let mut b = EffectBundle::create(control, HeadroomParams::default(), EngineLimits::default()).unwrap();

        let left_in = vec![0.3_f32; 256];
        let right_in = vec![-0.2_f32; 256];
        let mut left_out = vec![0.0_f32; 256];
        let mut right_out = vec![0.0_f32; 256];
        {
            let input: Vec<&[Sample]> = vec![&left_in, &right_in];
            let mut output: Vec<&mut [Sample]> = vec![&mut left_out, &mut right_out];
            b.process(&input, &mut output, 256).unwrap();
        }
        assert_eq!(left_out, left_in);
        assert_eq!(right_out, right_in);
    }

    #[test]
    fn set_control_then_get_is_consistent() {
        let b = bundle();
        let mut p = b.get_control();
        p.volume.level_db = -6.0;
        b.set_control(p.clone()).unwrap();
        assert_eq!(b.get_control().volume.level_db, -6.0);
    }

    #[test]
    fn invalid_set_control_leaves_pending_untouched() {
        let b = bundle();
        let before = b.get_control();
        let mut bad = before.clone();
        bad.volume.level_db = 10.0;
        assert!(b.set_control(bad).is_err());
        assert_eq!(b.get_control().volume.level_db, before.volume.level_db);
    }

    #[test]
    fn headroom_limits_active_volume() {
        let mut b = bundle();
        let mut p = b.get_control();
        p.equalizer.enabled = true;
        p.equalizer.bands.push(EqBandDef {
            centre_hz: 60.0,
            gain_db: 12.0,
            q_centi: 96,
        });
        b.set_control(p).unwrap();
        b.set_headroom(HeadroomParams {
            ranges: vec![HeadroomRange {
                low_hz: 20.0,
                high_hz: 4999.0,
                offset_db: 0.0,
            }],
        })
        .unwrap();
        b.apply().unwrap();

        let headroom_db = derive_headroom_db(&b.active_control().equalizer, &b.active_headroom);
        assert!((headroom_db - 12.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_buffer_count_is_invalid_argument() {
        let mut b = bundle();
        let left_in = vec![0.0_f32; 64];
        let input: Vec<&[Sample]> = vec![&left_in];
        let mut left_out = vec![0.0_f32; 64];
        let mut right_out = vec![0.0_f32; 64];
        let mut output: Vec<&mut [Sample]> = vec![&mut left_out, &mut right_out];
        assert!(b.process(&input, &mut output, 64).is_err());
    }
}
