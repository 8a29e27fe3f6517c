use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::band::{Aggregation, BandDef, Percussion, VisualBand};
use crate::error::CoreError;

/// Configuration complète du moteur d'analyse.
///
/// Sérialisable en TOML. Chaque section et chaque champ a une valeur par
/// défaut saine : un fichier partiel ne surcharge que ce qu'il nomme.
///
/// # Example
/// ```
/// use lk_core::config::EngineConfig;
/// let config = EngineConfig::default();
/// assert_eq!(config.engine.fft_size, 2048);
/// assert_eq!(config.engine.hop_size, 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stream geometry: sample rate, FFT length, hop length.
    pub engine: StreamConfig,
    /// Frequency ranges of the six analysis bands.
    pub bands: BandsConfig,
    /// Peak-hold AGC tunables.
    pub normalizer: NormalizerConfig,
    /// Attack/release pairs of the smoothed channels.
    pub envelopes: EnvelopesConfig,
    /// Onset thresholds, refractory periods and strike decay.
    pub onsets: OnsetsConfig,
    /// Rolling section-energy ("chorus") detector.
    pub section: SectionConfig,
    /// Optional inter-onset tempo estimate.
    pub tempo: TempoConfig,
}

/// Fixed at construction time; `hop_size <= fft_size`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// FFT window length `N`.
    pub fft_size: usize,
    /// Hop length `H`: new samples per channel consumed per update.
    pub hop_size: usize,
    /// Added to the frame RMS so it is never exactly zero.
    pub rms_epsilon: f32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 2048,
            hop_size: 1024,
            rms_epsilon: 1e-12,
        }
    }
}

/// Band ranges. Visual bands feed the envelopes, transient bands feed the
/// onset detectors.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BandsConfig {
    /// Share of the mean in the visual blend; the max gets the rest.
    pub visual_mean_weight: f32,
    pub bass: BandDef,
    pub mid: BandDef,
    pub treble: BandDef,
    pub kick: BandDef,
    pub snare: BandDef,
    pub hihat: BandDef,
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            visual_mean_weight: 0.6,
            bass: BandDef::new(20.0, 250.0, Aggregation::Visual),
            mid: BandDef::new(250.0, 4000.0, Aggregation::Visual),
            treble: BandDef::new(4000.0, 20_000.0, Aggregation::Visual),
            kick: BandDef::new(40.0, 140.0, Aggregation::Transient),
            snare: BandDef::new(1500.0, 4000.0, Aggregation::Transient),
            hihat: BandDef::new(8000.0, 16_000.0, Aggregation::Transient),
        }
    }
}

impl BandsConfig {
    /// Range of a visual band.
    #[must_use]
    pub fn visual(&self, band: VisualBand) -> BandDef {
        match band {
            VisualBand::Bass => self.bass,
            VisualBand::Mid => self.mid,
            VisualBand::Treble => self.treble,
        }
    }

    /// Range of a percussive band.
    #[must_use]
    pub fn percussion(&self, band: Percussion) -> BandDef {
        match band {
            Percussion::Kick => self.kick,
            Percussion::Snare => self.snare,
            Percussion::Hihat => self.hihat,
        }
    }

    fn all(&self) -> [(&'static str, BandDef); 6] {
        [
            ("bass", self.bass),
            ("mid", self.mid),
            ("treble", self.treble),
            ("kick", self.kick),
            ("snare", self.snare),
            ("hihat", self.hihat),
        ]
    }
}

/// Peak trackers: `peak = max(peak * decay, raw, floor)`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Per-hop decay of bass/mid/treble/rms trackers (slow, stable gain).
    pub visual_decay: f32,
    /// Per-hop decay of kick/snare/hihat trackers (fast, responsive).
    pub transient_decay: f32,
    /// Per-hop decay of the section-density tracker.
    pub density_decay: f32,
    /// Initial and minimum peak value.
    pub floor: f32,
    /// Denominator guard in `raw / (peak + epsilon)`.
    pub epsilon: f32,
    /// Exponent applied to normalized band values. 1.0 = linear.
    pub gamma: f32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            visual_decay: 0.998,
            transient_decay: 0.990,
            density_decay: 0.999,
            floor: 0.01,
            epsilon: 1e-6,
            gamma: 1.0,
        }
    }
}

/// Attack/release coefficients of one envelope follower, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct EnvelopeParams {
    pub attack: f32,
    pub release: f32,
}

impl EnvelopeParams {
    #[must_use]
    pub const fn new(attack: f32, release: f32) -> Self {
        Self { attack, release }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvelopesConfig {
    pub bass: EnvelopeParams,
    pub mid: EnvelopeParams,
    pub treble: EnvelopeParams,
    pub loudness: EnvelopeParams,
}

impl Default for EnvelopesConfig {
    fn default() -> Self {
        Self {
            // Near-instant attack, moderate release.
            bass: EnvelopeParams::new(0.90, 0.25),
            mid: EnvelopeParams::new(0.95, 0.10),
            treble: EnvelopeParams::new(0.35, 0.06),
            loudness: EnvelopeParams::new(0.50, 0.20),
        }
    }
}

impl EnvelopesConfig {
    /// Coefficients of a visual band.
    #[must_use]
    pub fn visual(&self, band: VisualBand) -> EnvelopeParams {
        match band {
            VisualBand::Bass => self.bass,
            VisualBand::Mid => self.mid,
            VisualBand::Treble => self.treble,
        }
    }
}

/// Flux threshold and refractory period (in hops) of one onset detector.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct OnsetParams {
    pub threshold: f32,
    pub refractory: u32,
}

impl OnsetParams {
    #[must_use]
    pub const fn new(threshold: f32, refractory: u32) -> Self {
        Self {
            threshold,
            refractory,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OnsetsConfig {
    pub kick: OnsetParams,
    pub snare: OnsetParams,
    pub hihat: OnsetParams,
    /// Per-hop multiplier of the strike envelopes between onsets.
    pub strike_decay: f32,
}

impl Default for OnsetsConfig {
    fn default() -> Self {
        Self {
            kick: OnsetParams::new(0.08, 3),
            snare: OnsetParams::new(0.12, 3),
            hihat: OnsetParams::new(0.12, 2),
            strike_decay: 0.70,
        }
    }
}

impl OnsetsConfig {
    /// Parameters of a percussive band.
    #[must_use]
    pub fn get(&self, band: Percussion) -> OnsetParams {
        match band {
            Percussion::Kick => self.kick,
            Percussion::Snare => self.snare,
            Percussion::Hihat => self.hihat,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SectionConfig {
    /// Length of the RMS history, in seconds.
    pub history_secs: f32,
    /// `is_chorus` fires when the normalized density exceeds this.
    pub threshold: f32,
}

impl Default for SectionConfig {
    fn default() -> Self {
        Self {
            history_secs: 3.0,
            threshold: 0.55,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Désactivé par défaut : `bpm` reste à 0.0.
    pub enabled: bool,
    pub min_bpm: f32,
    pub max_bpm: f32,
    /// Number of inter-onset intervals averaged.
    pub max_intervals: usize,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_bpm: 30.0,
            max_bpm: 200.0,
            max_intervals: 16,
        }
    }
}

impl EngineConfig {
    /// Updates per second: `sample_rate / hop_size`.
    ///
    /// # Example
    /// ```
    /// use lk_core::config::EngineConfig;
    /// let config = EngineConfig::default();
    /// assert!((config.hop_rate() - 46.875).abs() < 1e-4);
    /// ```
    #[must_use]
    pub fn hop_rate(&self) -> f32 {
        self.engine.sample_rate as f32 / self.engine.hop_size.max(1) as f32
    }

    /// Capacity of the section-energy history, in hops (at least 1).
    #[must_use]
    pub fn section_history_len(&self) -> usize {
        ((self.section.history_secs * self.hop_rate()) as usize).max(1)
    }

    /// Reject structurally invalid configurations.
    ///
    /// # Errors
    /// Returns `CoreError::Config` on zero sizes, `hop_size > fft_size`,
    /// inverted band ranges, or non-finite tunables.
    pub fn validate(&self) -> Result<(), CoreError> {
        let e = &self.engine;
        if e.sample_rate == 0 {
            return Err(CoreError::Config("sample_rate doit être > 0".into()));
        }
        if e.fft_size < 2 {
            return Err(CoreError::Config(format!(
                "fft_size doit être >= 2 (reçu {})",
                e.fft_size
            )));
        }
        if e.hop_size == 0 || e.hop_size > e.fft_size {
            return Err(CoreError::Config(format!(
                "hop_size doit être dans [1, fft_size={}] (reçu {})",
                e.fft_size, e.hop_size
            )));
        }

        for (name, band) in self.bands.all() {
            if !band.low_hz.is_finite() || !band.high_hz.is_finite() {
                return Err(CoreError::Config(format!("bande {name} : bornes non finies")));
            }
            if band.low_hz < 0.0 || band.low_hz >= band.high_hz {
                return Err(CoreError::Config(format!(
                    "bande {name} : plage invalide [{}, {})",
                    band.low_hz, band.high_hz
                )));
            }
        }

        let n = &self.normalizer;
        let env = &self.envelopes;
        let on = &self.onsets;
        let scalars = [
            ("engine.rms_epsilon", e.rms_epsilon),
            ("bands.visual_mean_weight", self.bands.visual_mean_weight),
            ("normalizer.visual_decay", n.visual_decay),
            ("normalizer.transient_decay", n.transient_decay),
            ("normalizer.density_decay", n.density_decay),
            ("normalizer.floor", n.floor),
            ("normalizer.epsilon", n.epsilon),
            ("normalizer.gamma", n.gamma),
            ("envelopes.bass.attack", env.bass.attack),
            ("envelopes.bass.release", env.bass.release),
            ("envelopes.mid.attack", env.mid.attack),
            ("envelopes.mid.release", env.mid.release),
            ("envelopes.treble.attack", env.treble.attack),
            ("envelopes.treble.release", env.treble.release),
            ("envelopes.loudness.attack", env.loudness.attack),
            ("envelopes.loudness.release", env.loudness.release),
            ("onsets.kick.threshold", on.kick.threshold),
            ("onsets.snare.threshold", on.snare.threshold),
            ("onsets.hihat.threshold", on.hihat.threshold),
            ("onsets.strike_decay", on.strike_decay),
            ("section.history_secs", self.section.history_secs),
            ("section.threshold", self.section.threshold),
            ("tempo.min_bpm", self.tempo.min_bpm),
            ("tempo.max_bpm", self.tempo.max_bpm),
        ];
        if let Some((name, _)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(CoreError::Config(format!("{name} n'est pas fini")));
        }

        if self.tempo.min_bpm <= 0.0 || self.tempo.min_bpm >= self.tempo.max_bpm {
            return Err(CoreError::Config(format!(
                "tempo : plage BPM invalide [{}, {}]",
                self.tempo.min_bpm, self.tempo.max_bpm
            )));
        }
        Ok(())
    }

    /// Clamp all numeric tunables to their valid ranges.
    /// Called after validation; assumes every value is finite.
    pub fn clamp_all(&mut self) {
        self.engine.rms_epsilon = self.engine.rms_epsilon.clamp(0.0, 1e-3);
        self.bands.visual_mean_weight = self.bands.visual_mean_weight.clamp(0.0, 1.0);

        let n = &mut self.normalizer;
        n.visual_decay = n.visual_decay.clamp(0.0, 1.0);
        n.transient_decay = n.transient_decay.clamp(0.0, 1.0);
        n.density_decay = n.density_decay.clamp(0.0, 1.0);
        n.floor = n.floor.max(f32::MIN_POSITIVE);
        n.epsilon = n.epsilon.max(f32::MIN_POSITIVE);
        n.gamma = n.gamma.clamp(0.1, 4.0);

        for p in [
            &mut self.envelopes.bass,
            &mut self.envelopes.mid,
            &mut self.envelopes.treble,
            &mut self.envelopes.loudness,
        ] {
            p.attack = p.attack.clamp(0.0, 1.0);
            p.release = p.release.clamp(0.0, 1.0);
        }

        for p in [
            &mut self.onsets.kick,
            &mut self.onsets.snare,
            &mut self.onsets.hihat,
        ] {
            p.threshold = p.threshold.clamp(0.0, 1.0);
        }
        self.onsets.strike_decay = self.onsets.strike_decay.clamp(0.0, 0.999);

        self.section.history_secs = self.section.history_secs.clamp(0.1, 60.0);
        self.section.threshold = self.section.threshold.clamp(0.0, 1.0);
        self.tempo.max_intervals = self.tempo.max_intervals.clamp(1, 256);
    }

    /// Validate then clamp, consuming the config.
    ///
    /// # Errors
    /// See [`EngineConfig::validate`].
    pub fn sanitized(mut self) -> Result<Self, CoreError> {
        self.validate()?;
        self.clamp_all();
        Ok(self)
    }

    /// Parse a TOML document, merging it over the defaults.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or the result fails validation.
    ///
    /// # Example
    /// ```
    /// use lk_core::config::EngineConfig;
    /// let config = EngineConfig::from_toml_str("[section]\nthreshold = 0.7\n").unwrap();
    /// assert!((config.section.threshold - 0.7).abs() < f32::EPSILON);
    /// assert_eq!(config.engine.fft_size, 2048);
    /// ```
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Erreur de parsing TOML")?;
        Ok(config.sanitized()?)
    }

    /// Serialize to pretty TOML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Sérialisation TOML impossible")
    }
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or validated.
///
/// # Example
/// ```no_run
/// use lk_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    let config: EngineConfig = toml::from_str(&content)
        .with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))?;

    let config = config
        .sanitized()
        .with_context(|| format!("Configuration rejetée : {}", path.display()))?;
    log::debug!("Config chargée depuis {}", path.display());
    Ok(config)
}
