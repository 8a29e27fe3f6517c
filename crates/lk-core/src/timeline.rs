use serde::Serialize;

use crate::band::Percussion;
use crate::features::FeatureFrame;

/// Séquence de `FeatureFrame` produite par l'analyse offline d'un buffer.
///
/// Une frame par hop, `hop_duration` secondes entre deux frames.
#[derive(Clone, Debug, Default)]
pub struct FeatureTimeline {
    pub frames: Vec<FeatureFrame>,
    /// Seconds between two consecutive frames (`hop_size / sample_rate`).
    pub hop_duration: f32,
    pub sample_rate: u32,
}

/// Aggregate statistics over a timeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimelineSummary {
    pub frames: usize,
    pub duration_secs: f32,
    pub kicks: usize,
    pub snares: usize,
    pub hihats: usize,
    /// Fraction of frames flagged `is_chorus`.
    pub chorus_ratio: f32,
    pub mean_loudness: f32,
    /// Last non-zero tempo estimate, 0.0 if none.
    pub bpm: f32,
}

impl FeatureTimeline {
    /// Duration covered by the timeline, in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        self.frames.len() as f32 * self.hop_duration
    }

    /// Frame at time `t` (seconds), clamped to the last frame.
    ///
    /// # Example
    /// ```
    /// use lk_core::features::FeatureFrame;
    /// use lk_core::timeline::FeatureTimeline;
    /// let timeline = FeatureTimeline {
    ///     frames: vec![FeatureFrame::default(); 10],
    ///     hop_duration: 0.1,
    ///     sample_rate: 48000,
    /// };
    /// assert!(timeline.frame_at(0.35).is_some());
    /// assert!(timeline.frame_at(99.0).is_some());
    /// ```
    #[must_use]
    pub fn frame_at(&self, t: f32) -> Option<&FeatureFrame> {
        if self.frames.is_empty() || self.hop_duration <= 0.0 {
            return None;
        }
        let idx = (t.max(0.0) / self.hop_duration) as usize;
        self.frames.get(idx.min(self.frames.len() - 1))
    }

    /// Count onsets of one percussive band.
    #[must_use]
    pub fn onset_count(&self, band: Percussion) -> usize {
        self.frames.iter().filter(|f| f.onset(band)).count()
    }

    /// Compute aggregate statistics.
    #[must_use]
    pub fn summary(&self) -> TimelineSummary {
        let n = self.frames.len();
        if n == 0 {
            return TimelineSummary::default();
        }
        let chorus = self.frames.iter().filter(|f| f.is_chorus).count();
        let loudness: f32 = self.frames.iter().map(|f| f.loudness_rms).sum();
        let bpm = self
            .frames
            .iter()
            .rev()
            .map(|f| f.bpm)
            .find(|&b| b > 0.0)
            .unwrap_or(0.0);

        TimelineSummary {
            frames: n,
            duration_secs: self.duration_secs(),
            kicks: self.onset_count(Percussion::Kick),
            snares: self.onset_count(Percussion::Snare),
            hihats: self.onset_count(Percussion::Hihat),
            chorus_ratio: chorus as f32 / n as f32,
            mean_loudness: loudness / n as f32,
            bpm,
        }
    }
}
