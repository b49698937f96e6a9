//! The control-parameter block: one value set per instance, validated
//! atomically on submission. [`crate::bundle::EffectBundle`] holds two
//! copies (active/pending) and reconciles them under a bounded retry loop;
//! this module only owns the data shape and its validation, separate from
//! the processors that consume it.

use efx_core::{EfxError, EfxResult, SampleRateClass, SourceFormat, SpeakerType};

/// Bundle-wide operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    #[default]
    Off,
    On,
}

/// One parametric EQ band: centre frequency, gain, and Q.
///
/// `q_centi` follows the original LVM bundle's convention of expressing Q
/// in hundredths (so the allowed range `[25, 1200]` means `Q ∈ [0.25,
/// 12.00]`). Band lists are validated and deep-copied into instance-owned
/// storage rather than referenced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqBandDef {
    pub centre_hz: f64,
    pub gain_db: f64,
    pub q_centi: u16,
}

impl EqBandDef {
    pub fn q(&self) -> f64 {
        self.q_centi as f64 / 100.0
    }

    fn validate(&self, nyquist_hz: f64) -> EfxResult<()> {
        if !(20.0..nyquist_hz).contains(&self.centre_hz) {
            return Err(EfxError::OutOfRange(format!(
                "band centre {} Hz not in [20, {})",
                self.centre_hz, nyquist_hz
            )));
        }
        if !(-15.0..=15.0).contains(&self.gain_db) {
            return Err(EfxError::OutOfRange(format!(
                "band gain {} dB not in [-15, 15]",
                self.gain_db
            )));
        }
        if !(25..=1200).contains(&self.q_centi) {
            return Err(EfxError::OutOfRange(format!(
                "band Q {} not in [25, 1200]",
                self.q_centi
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BassCentreFreq {
    Hz55,
    Hz66,
    Hz78,
    Hz90,
}

impl BassCentreFreq {
    pub fn as_hz(self) -> f64 {
        match self {
            Self::Hz55 => 55.0,
            Self::Hz66 => 66.0,
            Self::Hz78 => 78.0,
            Self::Hz90 => 90.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakDecaySpeed {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualizerParams {
    pub enabled: bool,
    /// 0-100.
    pub reverb_level: u8,
    /// "effect level >= min" — min is 0.
    pub effect_level: u8,
}

impl Default for VirtualizerParams {
    fn default() -> Self {
        Self {
            enabled: false,
            reverb_level: 0,
            effect_level: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EqualizerParams {
    pub enabled: bool,
    pub bands: Vec<EqBandDef>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BassEnhancerParams {
    pub enabled: bool,
    pub effect_level: u8,
    pub centre_freq: BassCentreFreq,
    pub hpf_enabled: bool,
}

impl Default for BassEnhancerParams {
    fn default() -> Self {
        Self {
            enabled: false,
            effect_level: 0,
            centre_freq: BassCentreFreq::Hz55,
            hpf_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrebleEnhancerParams {
    pub enabled: bool,
    pub effect_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeParams {
    /// dB, must be <= 0.
    pub level_db: f64,
    /// dB, in [-96, 96].
    pub balance_db: f64,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            level_db: 0.0,
            balance_db: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PsaParams {
    pub enabled: bool,
    pub decay_speed: PeakDecaySpeed,
}

/// Engine-wide limits passed to `EffectBundle::create`.
#[derive(Debug, Clone, Copy)]
pub struct EngineLimits {
    pub max_eq_bands: usize,
    pub max_headroom_bands: usize,
    pub max_block_size: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_eq_bands: 32,
            max_headroom_bands: 5,
            max_block_size: efx_core::MAX_INTERNAL_BLOCK,
        }
    }
}

/// The full control-parameter block.
#[derive(Debug, Clone)]
pub struct ControlParams {
    pub operating_mode: OperatingMode,
    pub sample_rate: SampleRateClass,
    pub format: SourceFormat,
    pub speaker: SpeakerType,
    pub virtualizer: VirtualizerParams,
    pub equalizer: EqualizerParams,
    pub bass: BassEnhancerParams,
    pub treble: TrebleEnhancerParams,
    pub volume: VolumeParams,
    pub psa: PsaParams,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            operating_mode: OperatingMode::default(),
            sample_rate: SampleRateClass::Hz48000,
            format: SourceFormat::Stereo,
            speaker: SpeakerType::default(),
            virtualizer: VirtualizerParams::default(),
            equalizer: EqualizerParams::default(),
            bass: BassEnhancerParams::default(),
            treble: TrebleEnhancerParams::default(),
            volume: VolumeParams::default(),
            psa: PsaParams::default(),
        }
    }
}

impl ControlParams {
    /// Validate every field. Any out-of-range field rejects the whole
    /// submission and leaves the active block untouched; called before the
    /// pending block is overwritten.
    pub fn validate(&self, limits: &EngineLimits) -> EfxResult<()> {
        let nyquist = self.sample_rate.as_f64() / 2.0;

        if self.equalizer.bands.len() > limits.max_eq_bands {
            return Err(EfxError::OutOfRange(format!(
                "{} EQ bands exceeds configured max {}",
                self.equalizer.bands.len(),
                limits.max_eq_bands
            )));
        }
        for band in &self.equalizer.bands {
            band.validate(nyquist)?;
        }

        if self.virtualizer.reverb_level > 100 {
            return Err(EfxError::OutOfRange("virtualizer reverb level > 100".into()));
        }

        if self.volume.level_db > 0.0 {
            return Err(EfxError::OutOfRange("volume level must be <= 0 dB".into()));
        }
        if !(-96.0..=96.0).contains(&self.volume.balance_db) {
            return Err(EfxError::OutOfRange("balance not in [-96, 96] dB".into()));
        }

        match self.format {
            SourceFormat::Mono | SourceFormat::MonoInStereo | SourceFormat::Stereo => {}
            SourceFormat::Multichannel(n) if (3..=8).contains(&n) => {}
            SourceFormat::Multichannel(n) => {
                return Err(EfxError::OutOfRange(format!(
                    "channel count {n} out of [1, 8]"
                )))
            }
        }

        Ok(())
    }
}

/// One headroom sub-range entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadroomRange {
    pub low_hz: f64,
    pub high_hz: f64,
    pub offset_db: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HeadroomParams {
    pub ranges: Vec<HeadroomRange>,
}

impl HeadroomParams {
    pub fn validate(&self, limits: &EngineLimits) -> EfxResult<()> {
        if self.ranges.len() > limits.max_headroom_bands {
            return Err(EfxError::OutOfRange(format!(
                "{} headroom ranges exceeds configured max {}",
                self.ranges.len(),
                limits.max_headroom_bands
            )));
        }
        for r in &self.ranges {
            if r.low_hz >= r.high_hz {
                return Err(EfxError::InvalidArgument(
                    "headroom range low >= high".into(),
                ));
            }
        }
        Ok(())
    }
}
