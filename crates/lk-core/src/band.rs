use serde::{Deserialize, Serialize};

/// Bandes "visuelles" : énergie lissée, destinée aux rayons/luminosités des LEDs.
///
/// Chaque variante indexe un tableau `[T; 3]`.
///
/// # Example
/// ```
/// use lk_core::band::VisualBand;
/// assert_eq!(VisualBand::Treble.index(), 2);
/// assert_eq!(VisualBand::ALL.len(), 3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisualBand {
    /// 20–250 Hz par défaut.
    Bass,
    /// 250–4000 Hz par défaut.
    Mid,
    /// 4000–20000 Hz par défaut.
    Treble,
}

impl VisualBand {
    /// All visual bands, in index order.
    pub const ALL: [Self; 3] = [Self::Bass, Self::Mid, Self::Treble];

    /// Position in a `[T; 3]` per-band array.
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Output key of the band.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bass => "bass",
            Self::Mid => "mid",
            Self::Treble => "treble",
        }
    }
}

/// Bandes percussives : plages étroites isolant l'attaque d'un instrument.
///
/// # Example
/// ```
/// use lk_core::band::Percussion;
/// assert_eq!(Percussion::Kick.name(), "kick");
/// assert_eq!(Percussion::Hihat.index(), 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Percussion {
    /// Grosse caisse, 40–140 Hz.
    Kick,
    /// Caisse claire, 1.5–4 kHz.
    Snare,
    /// Charleston, 8–16 kHz.
    Hihat,
}

impl Percussion {
    /// All percussive bands, in index order.
    pub const ALL: [Self; 3] = [Self::Kick, Self::Snare, Self::Hihat];

    /// Position in a `[T; 3]` per-band array.
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Output key of the onset flag.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kick => "kick",
            Self::Snare => "snare",
            Self::Hihat => "hihat",
        }
    }
}

/// How the bin magnitudes inside a band collapse to one scalar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Blend of mean and max (weights in `BandsConfig::visual_mean_weight`).
    #[default]
    Visual,
    /// Max only. Ignores sustain, keeps attacks.
    Transient,
}

/// A frequency range `[low_hz, high_hz)` and its aggregation policy.
///
/// # Example
/// ```
/// use lk_core::band::{Aggregation, BandDef};
/// let kick = BandDef::new(40.0, 140.0, Aggregation::Transient);
/// assert!(kick.contains(100.0));
/// assert!(!kick.contains(140.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct BandDef {
    /// Lower bound, inclusive.
    pub low_hz: f32,
    /// Upper bound, exclusive.
    pub high_hz: f32,
    /// Aggregation policy.
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl BandDef {
    /// Build a band definition.
    #[must_use]
    pub const fn new(low_hz: f32, high_hz: f32, aggregation: Aggregation) -> Self {
        Self {
            low_hz,
            high_hz,
            aggregation,
        }
    }

    /// `true` if `hz` falls in `[low_hz, high_hz)`.
    #[inline]
    #[must_use]
    pub fn contains(&self, hz: f32) -> bool {
        hz >= self.low_hz && hz < self.high_hz
    }
}
