//! The standalone late-reflection reverberator: its own control/process
//! surface, consumed either as an insert effect (stereo in -> stereo
//! wet+dry out) or an auxiliary effect (mono send in -> stereo wet out).
//!
//! Uses the same pending/active parameter split as
//! [`crate::bundle::EffectBundle`]: a `Mutex`-guarded pending block plus a
//! generation counter and bounded-retry snapshot loop.

pub mod engine;
pub mod params;
pub mod presets;

pub use params::{EngineConfig, ParamId, ParamValue, ReverbControl};
pub use presets::{Preset, ReverbProperties};

use crate::bundle::AccessMode;
use engine::ReverbEngine;
use efx_core::{EfxError, EfxResult, ReturnCode, Sample};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Q4.12 `0x0C00` in the integer path; kept as the float equivalent here.
pub const REVERB_SEND_LEVEL: f64 = 0.75;
pub const REVERB_UNIT_VOLUME: f64 = 1.0;

const APPLY_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Insert,
    Auxiliary,
}

/// `{uninitialized -> initialized -> active <-> draining}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Initialized,
    Active,
    Draining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeMode {
    Off,
    Flat,
    Ramp,
}

pub struct ReverbInstance {
    io_mode: IoMode,
    state: State,

    pending: Mutex<ReverbControl>,
    generation: AtomicU64,
    dirty: AtomicBool,
    active: ReverbControl,

    engine: ReverbEngine,
    sample_rate: f64,
    wet_gain: f64,
    level_index: usize,
    is_none: bool,

    enabled: bool,
    samples_to_exit: usize,

    volume_mode: VolumeMode,
    vol_left: f64,
    vol_right: f64,
    prev_vol_left: f64,
    prev_vol_right: f64,

    scratch_in_l: Vec<Sample>,
    scratch_in_r: Vec<Sample>,
    scratch_out_l: Vec<Sample>,
    scratch_out_r: Vec<Sample>,

    pub access_mode: AccessMode,
}

impl ReverbInstance {
    /// Allocate from default parameters: T60 = 1490 ms, HF damping level =
    /// 21, density 100, roomsize 100, HPF 50 Hz, LPF 23999 Hz, level = 0;
    /// default volumes to unity, volume-mode = flat.
    pub fn init(io_mode: IoMode, sample_rate: f64) -> Self {
        let control = ReverbControl::default();
        let cfg = EngineConfig::derive(&control);
        let mut engine = ReverbEngine::new(sample_rate);
        engine.reconfigure(&cfg);

        Self {
            io_mode,
            state: State::Initialized,
            pending: Mutex::new(control),
            generation: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            active: control,
            engine,
            sample_rate,
            wet_gain: cfg.wet_gain,
            level_index: cfg.level_index,
            is_none: cfg.is_none,
            enabled: false,
            samples_to_exit: 0,
            volume_mode: VolumeMode::Flat,
            vol_left: REVERB_UNIT_VOLUME,
            vol_right: REVERB_UNIT_VOLUME,
            prev_vol_left: REVERB_UNIT_VOLUME,
            prev_vol_right: REVERB_UNIT_VOLUME,
            scratch_in_l: Vec::new(),
            scratch_in_r: Vec::new(),
            scratch_out_l: Vec::new(),
            scratch_out_r: Vec::new(),
            access_mode: AccessMode::Write,
        }
    }

    /// Validate and adopt a new sample rate. Input channel count is checked
    /// against this instance's fixed `io_mode` (mono iff auxiliary, stereo
    /// iff insert is enforced by the `process_*` wrapper signatures
    /// instead). Clears filter state on any call, from any state.
    pub fn set_config(&mut self, sample_rate: f64) -> EfxResult<()> {
        if sample_rate <= 0.0 {
            return Err(EfxError::OutOfRange("sample rate must be positive".into()));
        }
        log::debug!("reverb set_config: {} Hz -> {} Hz, clearing filter state", self.sample_rate, sample_rate);
        self.sample_rate = sample_rate;
        self.engine = ReverbEngine::new(sample_rate);
        let cfg = EngineConfig::derive(&self.active);
        self.engine.reconfigure(&cfg);
        self.wet_gain = cfg.wet_gain;
        self.level_index = cfg.level_index;
        self.is_none = cfg.is_none;
        self.samples_to_exit = self.tail_length_samples();
        Ok(())
    }

    pub fn set_parameter(&self, id: ParamId, value: ParamValue) -> EfxResult<()> {
        if matches!(id, ParamId::Properties) {
            return Err(EfxError::InvalidArgument(
                "use set_properties for the PROPERTIES id".into(),
            ));
        }
        if let Err(e) = self.pending.lock().unwrap().set(id, value) {
            log::warn!("rejected reverb parameter {id:?}: {e}");
            return Err(e);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    pub fn get_parameter(&self, id: ParamId) -> ParamValue {
        self.pending.lock().unwrap().get(id)
    }

    pub fn set_properties(&self, properties: ReverbProperties) {
        self.pending.lock().unwrap().set_properties(properties);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
    }

    pub fn get_properties(&self) -> ReverbProperties {
        self.pending.lock().unwrap().properties
    }

    pub fn set_preset_mode(&self, preset_mode: bool) {
        self.pending.lock().unwrap().preset_mode = preset_mode;
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
    }

    /// Enable/disable the reverb. Enabling starts the tail-drain countdown
    /// fresh on the next disable; disabling starts it now.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.state = State::Active;
            // The first block after enable always applies flat
            // (instantaneous) gain; only later blocks ramp.
            self.volume_mode = VolumeMode::Flat;
            log::debug!("reverb enabled");
        }
        if !enabled && self.enabled {
            self.samples_to_exit = self.tail_length_samples();
            self.state = State::Draining;
            log::debug!("reverb disabled, draining {} samples", self.samples_to_exit);
        }
        self.enabled = enabled;
    }

    pub fn set_volume(&mut self, left: f64, right: f64) {
        self.vol_left = left;
        self.vol_right = right;
    }

    pub fn state(&self) -> State {
        self.state
    }

    fn tail_length_samples(&self) -> usize {
        let t60_ms = self.active.properties.decay_time_ms.clamp(1, params::MAX_T60_MS) as f64;
        (t60_ms / 1000.0 * self.sample_rate).ceil() as usize
    }

    fn reconcile(&mut self) {
        let mut snapshot;
        let mut attempt = 0;
        loop {
            let gen_before = self.generation.load(Ordering::Acquire);
            snapshot = self.pending.lock().unwrap().clone();
            let gen_after = self.generation.load(Ordering::Acquire);
            attempt += 1;
            if gen_before == gen_after || attempt >= APPLY_MAX_RETRIES {
                break;
            }
        }

        let mut engine_dirty = false;
        self.active.preset_mode = snapshot.preset_mode;
        self.is_none = self.active.cur_preset == Preset::None && self.active.preset_mode;

        if snapshot.preset_mode {
            if snapshot.next_preset != self.active.cur_preset {
                self.active.next_preset = snapshot.next_preset;
                engine_dirty = self.active.apply_pending_preset();
            }
        } else if snapshot.properties != self.active.properties {
            self.active.properties = snapshot.properties;
            engine_dirty = true;
        }

        if engine_dirty {
            let cfg = EngineConfig::derive(&self.active);
            log::debug!(
                "reverb reconfigured: preset={:?} t60_ms={} wet_gain={:.3} level_index={}",
                self.active.cur_preset,
                self.active.properties.decay_time_ms,
                cfg.wet_gain,
                cfg.level_index
            );
            self.engine.reconfigure(&cfg);
            self.wet_gain = cfg.wet_gain;
            self.level_index = cfg.level_index;
            self.is_none = cfg.is_none;
            if self.state != State::Draining {
                self.samples_to_exit = self.tail_length_samples();
            }
        }
    }

    fn ensure_scratch(&mut self, n_frames: usize) {
        if self.scratch_in_l.len() < n_frames {
            self.scratch_in_l.resize(n_frames, 0.0);
            self.scratch_in_r.resize(n_frames, 0.0);
            self.scratch_out_l.resize(n_frames, 0.0);
            self.scratch_out_r.resize(n_frames, 0.0);
        }
    }

    fn apply_volume(&mut self, n_frames: usize) {
        match self.volume_mode {
            VolumeMode::Off => {}
            VolumeMode::Flat => {
                for i in 0..n_frames {
                    self.scratch_out_l[i] = (self.scratch_out_l[i] as f64 * self.vol_left) as Sample;
                    self.scratch_out_r[i] = (self.scratch_out_r[i] as f64 * self.vol_right) as Sample;
                }
                self.prev_vol_left = self.vol_left;
                self.prev_vol_right = self.vol_right;
                self.volume_mode = VolumeMode::Ramp;
            }
            VolumeMode::Ramp => {
                let denom = n_frames.max(1) as f64;
                for i in 0..n_frames {
                    let t = i as f64 / denom;
                    let gl = self.prev_vol_left + (self.vol_left - self.prev_vol_left) * t;
                    let gr = self.prev_vol_right + (self.vol_right - self.prev_vol_right) * t;
                    self.scratch_out_l[i] = (self.scratch_out_l[i] as f64 * gl) as Sample;
                    self.scratch_out_r[i] = (self.scratch_out_r[i] as f64 * gr) as Sample;
                }
                self.prev_vol_left = self.vol_left;
                self.prev_vol_right = self.vol_right;
            }
        }
    }

    /// Shared inner loop both I/O variants delegate to: one engine call, no
    /// runtime branch on I/O shape inside the DSP loop. Assumes
    /// `scratch_in_{l,r}` are already populated by the caller.
    fn process_common(&mut self, n_frames: usize) -> EfxResult<ReturnCode> {
        if self.dirty.swap(false, Ordering::AcqRel) {
            self.reconcile();
        }

        if !self.enabled && self.samples_to_exit == 0 {
            self.scratch_out_l[..n_frames].fill(0.0);
            self.scratch_out_r[..n_frames].fill(0.0);
            return Ok(ReturnCode::NoData);
        }

        if !self.enabled {
            self.scratch_in_l[..n_frames].fill(0.0);
            self.scratch_in_r[..n_frames].fill(0.0);
        }

        if self.is_none {
            self.scratch_out_l[..n_frames].fill(0.0);
            self.scratch_out_r[..n_frames].fill(0.0);
        } else {
            self.engine.process_block(
                &self.scratch_in_l[..n_frames],
                &self.scratch_in_r[..n_frames],
                &mut self.scratch_out_l[..n_frames],
                &mut self.scratch_out_r[..n_frames],
            );
            if self.wet_gain != 1.0 {
                for i in 0..n_frames {
                    self.scratch_out_l[i] = (self.scratch_out_l[i] as f64 * self.wet_gain) as Sample;
                    self.scratch_out_r[i] = (self.scratch_out_r[i] as f64 * self.wet_gain) as Sample;
                }
            }
        }

        self.apply_volume(n_frames);

        if !self.enabled {
            self.samples_to_exit = self.samples_to_exit.saturating_sub(n_frames);
            self.state = if self.samples_to_exit == 0 {
                State::Initialized
            } else {
                State::Draining
            };
        }

        Ok(ReturnCode::Success)
    }

    fn write_output(&self, out_l: &mut [Sample], out_r: &mut [Sample], n_frames: usize) {
        match self.access_mode {
            AccessMode::Write => {
                out_l[..n_frames].copy_from_slice(&self.scratch_out_l[..n_frames]);
                out_r[..n_frames].copy_from_slice(&self.scratch_out_r[..n_frames]);
            }
            AccessMode::Accumulate => {
                for i in 0..n_frames {
                    out_l[i] += self.scratch_out_l[i];
                    out_r[i] += self.scratch_out_r[i];
                }
            }
        }
    }

    /// Insert-mode process: stereo in, stereo wet+dry out. Pre-scales the
    /// send by `REVERB_SEND_LEVEL`, then adds dry back onto the wet output.
    pub fn process_insert(
        &mut self,
        in_l: &[Sample],
        in_r: &[Sample],
        out_l: &mut [Sample],
        out_r: &mut [Sample],
        n_frames: usize,
    ) -> EfxResult<ReturnCode> {
        if self.io_mode != IoMode::Insert {
            return Err(EfxError::InvalidArgument("instance is configured for auxiliary mode".into()));
        }
        if in_l.len() < n_frames || in_r.len() < n_frames || out_l.len() < n_frames || out_r.len() < n_frames {
            return Err(EfxError::InvalidArgument("buffer shorter than n_frames".into()));
        }

        self.ensure_scratch(n_frames);
        for i in 0..n_frames {
            self.scratch_in_l[i] = (in_l[i] as f64 * REVERB_SEND_LEVEL) as Sample;
            self.scratch_in_r[i] = (in_r[i] as f64 * REVERB_SEND_LEVEL) as Sample;
        }

        let code = self.process_common(n_frames)?;

        for i in 0..n_frames {
            self.scratch_out_l[i] += in_l[i];
            self.scratch_out_r[i] += in_r[i];
        }

        self.write_output(out_l, out_r, n_frames);
        Ok(code)
    }

    /// Auxiliary-mode process: mono send in, pure stereo wet out.
    pub fn process_auxiliary(
        &mut self,
        mono_in: &[Sample],
        out_l: &mut [Sample],
        out_r: &mut [Sample],
        n_frames: usize,
    ) -> EfxResult<ReturnCode> {
        if self.io_mode != IoMode::Auxiliary {
            return Err(EfxError::InvalidArgument("instance is configured for insert mode".into()));
        }
        if mono_in.len() < n_frames || out_l.len() < n_frames || out_r.len() < n_frames {
            return Err(EfxError::InvalidArgument("buffer shorter than n_frames".into()));
        }

        self.ensure_scratch(n_frames);
        for i in 0..n_frames {
            self.scratch_in_l[i] = mono_in[i];
            self.scratch_in_r[i] = mono_in[i];
        }

        let code = self.process_common(n_frames)?;
        self.write_output(out_l, out_r, n_frames);
        Ok(code)
    }
}

impl crate::Processor for ReverbInstance {
    fn reset(&mut self) {
        self.engine.clear_state();
        self.vol_left = REVERB_UNIT_VOLUME;
        self.vol_right = REVERB_UNIT_VOLUME;
        self.prev_vol_left = REVERB_UNIT_VOLUME;
        self.prev_vol_right = REVERB_UNIT_VOLUME;
        self.volume_mode = VolumeMode::Flat;
    }
}
