use serde::Serialize;

use crate::band::{Percussion, VisualBand};
use crate::error::CoreError;

/// Output keys of [`FeatureFrame`], in record order.
pub const FEATURE_NAMES: &[&str] = &[
    "loudness_rms",
    "loudness_peak",
    "bass",
    "mid",
    "treble",
    "beat",
    "perimeter_sparkle",
    "kick",
    "snare",
    "hihat",
    "is_chorus",
    "energy_density",
    "bpm",
];

/// Résultat de l'analyse pour un hop.
///
/// Produit une fois par appel à `FeatureEngine::update`.
/// Taille fixe, Copy, jamais alloué dynamiquement.
///
/// # Example
/// ```
/// use lk_core::features::FeatureFrame;
/// let f = FeatureFrame::default();
/// assert_eq!(f.loudness_rms, 0.0);
/// assert!(!f.is_chorus);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FeatureFrame {
    // === Loudness ===
    /// Loudness lissée [0.0, 1.0].
    pub loudness_rms: f32,
    /// Loudness normalisée instantanée [0.0, 1.0].
    pub loudness_peak: f32,

    // === Bandes visuelles (lissées) ===
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,

    // === Rythme ===
    /// Kick strike envelope: 1.0 on a kick, geometric decay after.
    pub beat: f32,
    /// max(snare strike, hihat strike).
    pub perimeter_sparkle: f32,
    /// Onset flags, exactly 0.0 or 1.0.
    pub kick: f32,
    pub snare: f32,
    pub hihat: f32,

    // === Section ===
    /// Rolling loudness is high relative to its own baseline.
    pub is_chorus: bool,
    /// Rolling loudness normalized by its peak tracker [0.0, 1.0].
    pub energy_density: f32,

    /// BPM estimé (0.0 si inconnu ou désactivé).
    pub bpm: f32,
}

impl FeatureFrame {
    /// Smoothed energy of a visual band.
    #[must_use]
    pub fn visual(&self, band: VisualBand) -> f32 {
        match band {
            VisualBand::Bass => self.bass,
            VisualBand::Mid => self.mid,
            VisualBand::Treble => self.treble,
        }
    }

    /// `true` if the band fired an onset this hop.
    #[must_use]
    pub fn onset(&self, band: Percussion) -> bool {
        let flag = match band {
            Percussion::Kick => self.kick,
            Percussion::Snare => self.snare,
            Percussion::Hihat => self.hihat,
        };
        flag > 0.5
    }

    /// Look a value up by output key. `is_chorus` reads as 0.0 / 1.0.
    ///
    /// # Errors
    /// Returns `CoreError::UnknownFeature` if `name` is not in [`FEATURE_NAMES`].
    ///
    /// # Example
    /// ```
    /// use lk_core::features::FeatureFrame;
    /// let f = FeatureFrame { bass: 0.4, is_chorus: true, ..FeatureFrame::default() };
    /// assert_eq!(f.get("bass").unwrap(), 0.4);
    /// assert_eq!(f.get("is_chorus").unwrap(), 1.0);
    /// assert!(f.get("sub_bass").is_err());
    /// ```
    pub fn get(&self, name: &str) -> Result<f32, CoreError> {
        let value = match name {
            "loudness_rms" => self.loudness_rms,
            "loudness_peak" => self.loudness_peak,
            "bass" => self.bass,
            "mid" => self.mid,
            "treble" => self.treble,
            "beat" => self.beat,
            "perimeter_sparkle" => self.perimeter_sparkle,
            "kick" => self.kick,
            "snare" => self.snare,
            "hihat" => self.hihat,
            "is_chorus" => f32::from(u8::from(self.is_chorus)),
            "energy_density" => self.energy_density,
            "bpm" => self.bpm,
            _ => {
                return Err(CoreError::UnknownFeature {
                    name: name.to_string(),
                });
            }
        };
        Ok(value)
    }

    /// `(key, value)` pairs in record order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_NAMES
            .iter()
            .map(move |&name| (name, self.get(name).unwrap_or(0.0)))
    }

    /// Replace non-finite values by 0, clamp continuous fields to [0, 1] and
    /// snap flags to exactly 0 or 1. `bpm` is only made finite and non-negative.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        for v in [
            &mut self.loudness_rms,
            &mut self.loudness_peak,
            &mut self.bass,
            &mut self.mid,
            &mut self.treble,
            &mut self.beat,
            &mut self.perimeter_sparkle,
            &mut self.energy_density,
        ] {
            *v = unit(*v);
        }
        for flag in [&mut self.kick, &mut self.snare, &mut self.hihat] {
            *flag = if *flag > 0.5 { 1.0 } else { 0.0 };
        }
        if !self.bpm.is_finite() || self.bpm < 0.0 {
            self.bpm = 0.0;
        }
        self
    }
}

#[inline(always)]
fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
