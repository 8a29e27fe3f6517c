use crate::normalizer::AdaptiveNormalizer;

/// Section state derived from the rolling loudness.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SectionState {
    /// Mean RMS over the history (unnormalized).
    pub density: f32,
    /// `density` normalized by the density peak tracker, in `[0, 1]`.
    pub energy_density: f32,
    pub is_chorus: bool,
}

/// Détecteur de section "refrain" : moyenne glissante du RMS sur ~3 s,
/// normalisée par son propre peak-hold lent puis seuillée.
///
/// L'historique est un anneau de capacité fixe, réécrit sur place.
///
/// # Example
/// ```
/// use lk_audio::normalizer::AdaptiveNormalizer;
/// use lk_audio::section::SectionEnergyTracker;
/// use lk_core::config::NormalizerConfig;
///
/// let mut norm = AdaptiveNormalizer::new(&NormalizerConfig::default());
/// let mut section = SectionEnergyTracker::new(4, 0.55);
/// let state = section.update(0.5, &mut norm);
/// assert!(state.is_chorus);
/// assert_eq!(section.len(), 1);
/// ```
pub struct SectionEnergyTracker {
    history: Vec<f32>,
    head: usize,
    filled: usize,
    threshold: f32,
}

impl SectionEnergyTracker {
    /// History of `capacity` hops (at least 1).
    #[must_use]
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            history: vec![0.0; capacity.max(1)],
            head: 0,
            filled: 0,
            threshold,
        }
    }

    /// Push this hop's raw RMS and recompute the section state. The density is
    /// normalized through the normalizer's density tracker.
    pub fn update(&mut self, rms: f32, normalizer: &mut AdaptiveNormalizer) -> SectionState {
        self.history[self.head] = rms;
        self.head = (self.head + 1) % self.history.len();
        self.filled = (self.filled + 1).min(self.history.len());

        // Summed fresh each hop: no running-sum drift.
        let density = self.history[..self.filled].iter().sum::<f32>() / self.filled as f32;
        let energy_density = normalizer.normalize_density(density);

        SectionState {
            density,
            energy_density,
            is_chorus: energy_density > self.threshold,
        }
    }

    /// Number of hops currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filled
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.head = 0;
        self.filled = 0;
    }
}
