use lk_core::band::{Percussion, VisualBand};
use lk_core::config::NormalizerConfig;

use crate::fft::BandEnergies;

/// Peak-hold décroissant : `peak = max(peak * decay, raw, floor)`.
///
/// Ne descend jamais sous `floor` (jamais zéro), et vaut toujours au moins la
/// dernière valeur brute reçue.
///
/// # Example
/// ```
/// use lk_audio::normalizer::PeakTracker;
/// let mut peak = PeakTracker::new(0.5, 0.01);
/// assert_eq!(peak.update(2.0), 2.0);
/// assert_eq!(peak.update(0.0), 1.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakTracker {
    peak: f32,
    decay: f32,
    floor: f32,
}

impl PeakTracker {
    #[must_use]
    pub fn new(decay: f32, floor: f32) -> Self {
        Self {
            peak: floor,
            decay,
            floor,
        }
    }

    /// Feed one raw value; returns the updated peak.
    #[inline]
    pub fn update(&mut self, raw: f32) -> f32 {
        self.peak = (self.peak * self.decay).max(raw).max(self.floor);
        self.peak
    }

    #[inline]
    #[must_use]
    pub fn peak(&self) -> f32 {
        self.peak
    }

    pub fn reset(&mut self) {
        self.peak = self.floor;
    }
}

/// Normalized energies of one hop, all in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalizedBands {
    pub visual: [f32; 3],
    pub transient: [f32; 3],
    pub rms: f32,
}

/// AGC par peak-hold : une `PeakTracker` par bande, plus le tracker de densité
/// utilisé par la détection de section.
///
/// Les bandes visuelles et le RMS décroissent lentement (gain stable), les
/// bandes transitoires rapidement (réactives aux changements d'intensité).
pub struct AdaptiveNormalizer {
    visual: [PeakTracker; 3],
    rms: PeakTracker,
    transient: [PeakTracker; 3],
    density: PeakTracker,
    epsilon: f32,
    gamma: f32,
}

impl AdaptiveNormalizer {
    #[must_use]
    pub fn new(config: &NormalizerConfig) -> Self {
        let visual = PeakTracker::new(config.visual_decay, config.floor);
        let transient = PeakTracker::new(config.transient_decay, config.floor);
        Self {
            visual: [visual; 3],
            rms: visual,
            transient: [transient; 3],
            density: PeakTracker::new(config.density_decay, config.floor),
            epsilon: config.epsilon,
            gamma: config.gamma,
        }
    }

    /// Update every band tracker with this hop's raw energies and return the
    /// normalized, gamma-shaped values.
    pub fn update(&mut self, raw: &BandEnergies) -> NormalizedBands {
        let (epsilon, gamma) = (self.epsilon, self.gamma);
        let mut out = NormalizedBands::default();
        for ((slot, tracker), &value) in out
            .visual
            .iter_mut()
            .zip(&mut self.visual)
            .zip(&raw.visual)
        {
            *slot = shape(value, tracker.update(value), epsilon, gamma);
        }
        for ((slot, tracker), &value) in out
            .transient
            .iter_mut()
            .zip(&mut self.transient)
            .zip(&raw.transient)
        {
            *slot = shape(value, tracker.update(value), epsilon, gamma);
        }
        out.rms = shape(raw.rms, self.rms.update(raw.rms), epsilon, gamma);
        out
    }

    /// Normalize a section density through the density tracker. Linear, no gamma.
    pub fn normalize_density(&mut self, density: f32) -> f32 {
        let peak = self.density.update(density);
        normalize(density, peak, self.epsilon)
    }

    #[must_use]
    pub fn visual_peak(&self, band: VisualBand) -> f32 {
        self.visual[band.index()].peak()
    }

    #[must_use]
    pub fn transient_peak(&self, band: Percussion) -> f32 {
        self.transient[band.index()].peak()
    }

    #[must_use]
    pub fn rms_peak(&self) -> f32 {
        self.rms.peak()
    }

    #[must_use]
    pub fn density_peak(&self) -> f32 {
        self.density.peak()
    }

    pub fn reset(&mut self) {
        for t in self.visual.iter_mut().chain(self.transient.iter_mut()) {
            t.reset();
        }
        self.rms.reset();
        self.density.reset();
    }
}

/// `clip(raw / (peak + epsilon), 0, 1)`.
#[inline(always)]
#[must_use]
pub fn normalize(raw: f32, peak: f32, epsilon: f32) -> f32 {
    (raw / (peak + epsilon)).clamp(0.0, 1.0)
}

#[inline(always)]
fn shape(raw: f32, peak: f32, epsilon: f32, gamma: f32) -> f32 {
    let n = normalize(raw, peak, epsilon);
    if (gamma - 1.0).abs() < f32::EPSILON {
        n
    } else {
        n.powf(gamma)
    }
}
