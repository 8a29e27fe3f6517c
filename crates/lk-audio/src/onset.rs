use lk_core::config::OnsetParams;

/// Détecteur d'onset par flux (montée rapide) avec période réfractaire.
///
/// `flux = now - previous`. Un onset est accepté si `flux > threshold` et si
/// plus de `refractory` appels se sont écoulés depuis le précédent : deux
/// onsets sont donc séparés d'au moins `refractory + 1` appels.
///
/// # Example
/// ```
/// use lk_audio::onset::OnsetDetector;
/// let mut det = OnsetDetector::new(0.1, 3);
/// assert!(det.update(1.0)); // first hit is never suppressed
/// assert!(!det.update(0.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnsetDetector {
    previous: f32,
    /// Calls since the last accepted onset.
    since_onset: u32,
    threshold: f32,
    refractory: u32,
}

impl OnsetDetector {
    #[must_use]
    pub fn new(threshold: f32, refractory: u32) -> Self {
        Self {
            previous: 0.0,
            since_onset: refractory.saturating_add(1),
            threshold,
            refractory,
        }
    }

    #[must_use]
    pub fn from_params(params: OnsetParams) -> Self {
        Self::new(params.threshold, params.refractory)
    }

    /// Feed this hop's normalized band value; `true` if an onset fires.
    #[inline]
    pub fn update(&mut self, now: f32) -> bool {
        let flux = now - self.previous;
        self.previous = now;

        let fired = flux > self.threshold && self.since_onset > self.refractory;
        if fired {
            self.since_onset = 0;
        }
        self.since_onset = self.since_onset.saturating_add(1);
        fired
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn refractory(&self) -> u32 {
        self.refractory
    }

    pub fn reset(&mut self) {
        self.previous = 0.0;
        self.since_onset = self.refractory.saturating_add(1);
    }
}

/// Enveloppe d'impact : 1.0 sur un onset, décroissance géométrique sinon.
///
/// # Example
/// ```
/// use lk_audio::onset::StrikeEnvelope;
/// let mut strike = StrikeEnvelope::new(0.5);
/// assert_eq!(strike.update(true), 1.0);
/// assert_eq!(strike.update(false), 0.5);
/// assert_eq!(strike.update(false), 0.25);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrikeEnvelope {
    value: f32,
    decay: f32,
}

impl StrikeEnvelope {
    #[must_use]
    pub fn new(decay: f32) -> Self {
        Self { value: 0.0, decay }
    }

    #[inline(always)]
    pub fn update(&mut self, fired: bool) -> f32 {
        self.value = if fired { 1.0 } else { self.value * self.decay };
        self.value
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refractory_spaces_onsets_by_refractory_plus_one() {
        // Maximal flux every other call: 0, 1, 0, 1, ...
        let mut det = OnsetDetector::new(0.08, 3);
        let fired: Vec<usize> = (0..40)
            .filter(|&i| det.update(if i % 2 == 1 { 1.0 } else { 0.0 }))
            .collect();

        assert!(!fired.is_empty());
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= 4, "onsets too close: {pair:?}");
        }
    }

    #[test]
    fn alternating_flux_fires_once_every_four_calls() {
        // Flux +0.2 / -0.1 alternating: above threshold on every odd call.
        let mut det = OnsetDetector::new(0.08, 3);
        let mut level = 0.0f32;
        let mut fired = Vec::new();
        for i in 0..32 {
            level += if i % 2 == 0 { 0.2 } else { -0.1 };
            if det.update(level) {
                fired.push(i);
            }
        }
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= 4);
        }
        assert!(fired.len() <= 32 / 4 + 1);
    }

    #[test]
    fn rising_every_call_is_throttled() {
        let mut det = OnsetDetector::new(0.01, 2);
        let hits: Vec<bool> = (0..9).map(|i| det.update(i as f32 * 0.1)).collect();
        // Call 0 has zero flux; then 1, 4, 7 fire.
        assert_eq!(
            hits,
            [false, true, false, false, true, false, false, true, false]
        );
    }

    #[test]
    fn flat_input_never_fires() {
        let mut det = OnsetDetector::new(0.12, 2);
        for _ in 0..100 {
            assert!(!det.update(0.0));
        }
    }

    #[test]
    fn strike_decays_by_factor() {
        let mut strike = StrikeEnvelope::new(0.7);
        strike.update(true);
        let mut expected = 1.0f32;
        for _ in 0..10 {
            expected *= 0.7;
            assert!((strike.update(false) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn from_params_copies_threshold_and_refractory() {
        let det = OnsetDetector::from_params(OnsetParams::new(0.12, 2));
        assert!((det.threshold() - 0.12).abs() < f32::EPSILON);
        assert_eq!(det.refractory(), 2);
    }

    #[test]
    fn strike_value_tracks_last_update() {
        let mut strike = StrikeEnvelope::new(0.5);
        assert_eq!(strike.value(), 0.0);
        strike.update(true);
        strike.update(false);
        assert!((strike.value() - 0.5).abs() < f32::EPSILON);
        strike.reset();
        assert_eq!(strike.value(), 0.0);
    }

    #[test]
    fn reset_rearms_detector() {
        let mut det = OnsetDetector::new(0.1, 5);
        assert!(det.update(1.0));
        det.reset();
        assert!(det.update(1.0));
    }
}
