use std::collections::VecDeque;

use lk_core::config::TempoConfig;

/// Estimation de tempo par moyenne des intervalles inter-onsets du kick.
///
/// Pas de suivi de phase : uniquement la moyenne des derniers intervalles
/// dont le tempo implicite tombe dans `[min_bpm, max_bpm]`.
///
/// # Example
/// ```
/// use lk_audio::tempo::TempoEstimator;
/// use lk_core::config::TempoConfig;
/// let config = TempoConfig { enabled: true, ..TempoConfig::default() };
/// let mut tempo = TempoEstimator::new(&config, 50.0);
/// let mut bpm = 0.0;
/// for hop in 0..200 {
///     bpm = tempo.update(hop % 25 == 0);
/// }
/// assert!((bpm - 120.0).abs() < 0.01);
/// ```
pub struct TempoEstimator {
    enabled: bool,
    /// Hops per second.
    hop_rate: f32,
    min_bpm: f32,
    max_bpm: f32,
    max_intervals: usize,
    /// Onset intervals in hops (VecDeque for O(1) pop_front).
    intervals: VecDeque<u64>,
    hop_count: u64,
    last_onset: Option<u64>,
    bpm: f32,
}

impl TempoEstimator {
    #[must_use]
    pub fn new(config: &TempoConfig, hop_rate: f32) -> Self {
        let max_intervals = config.max_intervals.max(1);
        Self {
            enabled: config.enabled,
            hop_rate,
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
            max_intervals,
            intervals: VecDeque::with_capacity(max_intervals),
            hop_count: 0,
            last_onset: None,
            bpm: 0.0,
        }
    }

    /// Advance one hop. Returns the current estimate (0.0 if unknown or disabled).
    pub fn update(&mut self, onset: bool) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        self.hop_count += 1;
        if !onset {
            return self.bpm;
        }

        if let Some(last) = self.last_onset {
            let interval = self.hop_count - last;
            let implied = 60.0 * self.hop_rate / interval as f32;
            if (self.min_bpm..=self.max_bpm).contains(&implied) {
                if self.intervals.len() == self.max_intervals {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(interval);

                if self.intervals.len() >= 2 {
                    let avg = self.intervals.iter().sum::<u64>() as f32
                        / self.intervals.len() as f32;
                    self.bpm = 60.0 * self.hop_rate / avg;
                }
            }
        }
        self.last_onset = Some(self.hop_count);
        self.bpm
    }

    #[must_use]
    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn reset(&mut self) {
        self.intervals.clear();
        self.hop_count = 0;
        self.last_onset = None;
        self.bpm = 0.0;
    }
}
