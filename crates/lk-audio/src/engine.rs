use lk_core::band::{Percussion, VisualBand};
use lk_core::config::EngineConfig;
use lk_core::features::FeatureFrame;

use crate::envelope::EnvelopeFollower;
use crate::error::AudioError;
use crate::fft::{BandEnergies, SpectralFrontEnd};
use crate::normalizer::{AdaptiveNormalizer, NormalizedBands};
use crate::onset::{OnsetDetector, StrikeEnvelope};
use crate::ring::WindowedRingBuffer;
use crate::section::SectionEnergyTracker;
use crate::tempo::TempoEstimator;

/// Moteur d'extraction de features : un appel à `update` par hop.
///
/// Possède tout l'état d'analyse (fenêtre, peak trackers, enveloppes,
/// détecteurs d'onset, historique de section). Synchrone, non réentrant :
/// un flux audio = une instance. `update` n'alloue pas et ne bloque pas.
///
/// # Example
/// ```
/// use lk_audio::engine::FeatureEngine;
/// use lk_core::config::EngineConfig;
///
/// let mut engine = FeatureEngine::new(EngineConfig::default()).unwrap();
/// let hop = vec![0.0f32; 1024 * 2]; // stereo, interleaved
/// let features = engine.update(&hop, 2).unwrap();
/// assert_eq!(features.kick, 0.0);
/// ```
pub struct FeatureEngine {
    config: EngineConfig,
    ring: WindowedRingBuffer,
    mono: Vec<f32>,
    front_end: SpectralFrontEnd,
    normalizer: AdaptiveNormalizer,
    /// Indexed by [`VisualBand::index`].
    envelopes: [EnvelopeFollower; 3],
    loudness: EnvelopeFollower,
    /// Indexed by [`Percussion::index`].
    onsets: [OnsetDetector; 3],
    strikes: [StrikeEnvelope; 3],
    section: SectionEnergyTracker,
    tempo: TempoEstimator,
    last_raw: BandEnergies,
    last_normalized: NormalizedBands,
    last_output: FeatureFrame,
}

impl FeatureEngine {
    /// Build an engine. The configuration is validated and clamped first.
    ///
    /// # Errors
    /// Returns `AudioError::Config` if the configuration is rejected
    /// (e.g. `hop_size > fft_size`).
    pub fn new(config: EngineConfig) -> Result<Self, AudioError> {
        let config = config.sanitized()?;
        let e = &config.engine;
        let ring = WindowedRingBuffer::new(e.fft_size, e.hop_size);
        let mono = vec![0.0; e.fft_size];
        let front_end = SpectralFrontEnd::new(&config);
        let normalizer = AdaptiveNormalizer::new(&config.normalizer);

        let envelopes =
            VisualBand::ALL.map(|b| EnvelopeFollower::from_params(config.envelopes.visual(b)));
        let onsets = Percussion::ALL.map(|b| OnsetDetector::from_params(config.onsets.get(b)));
        let strikes = [StrikeEnvelope::new(config.onsets.strike_decay); 3];
        let section =
            SectionEnergyTracker::new(config.section_history_len(), config.section.threshold);
        let tempo = TempoEstimator::new(&config.tempo, config.hop_rate());

        log::info!(
            "FeatureEngine: {} Hz, N={}, H={} ({:.1} ms/hop), section={} hops",
            e.sample_rate,
            e.fft_size,
            e.hop_size,
            1000.0 / config.hop_rate(),
            section.capacity()
        );

        Ok(Self {
            ring,
            mono,
            front_end,
            normalizer,
            envelopes,
            loudness: EnvelopeFollower::from_params(config.envelopes.loudness),
            onsets,
            strikes,
            section,
            tempo,
            last_raw: BandEnergies::default(),
            last_normalized: NormalizedBands::default(),
            last_output: FeatureFrame::default(),
            config,
        })
    }

    /// Process one hop of interleaved samples (`hop_size * channels` values,
    /// 1 or 2 channels) and return this hop's features.
    ///
    /// # Errors
    /// `InvalidInputShape` on a length or channel mismatch, `NumericDegenerate`
    /// on NaN/infinite samples. In both cases no state is modified. Finite
    /// samples beyond `±ring::SAMPLE_LIMIT` are clamped, not rejected.
    pub fn update(&mut self, samples: &[f32], channels: usize) -> Result<FeatureFrame, AudioError> {
        if let Err(e) = self.ring.push(samples, channels) {
            log::debug!("Frame rejetée : {e}");
            return Err(e);
        }
        self.ring.mix_mono(&mut self.mono);

        let raw = self.front_end.analyze(&self.mono);
        let norm = self.normalizer.update(&raw);

        let mut smoothed = [0.0f32; 3];
        for ((out, env), &x) in smoothed
            .iter_mut()
            .zip(&mut self.envelopes)
            .zip(&norm.visual)
        {
            *out = env.update(x);
        }
        let loudness = self.loudness.update(norm.rms);

        let mut fired = [false; 3];
        let mut strike = [0.0f32; 3];
        for (i, (det, env)) in self.onsets.iter_mut().zip(&mut self.strikes).enumerate() {
            fired[i] = det.update(norm.transient[i]);
            strike[i] = env.update(fired[i]);
        }

        let section = self.section.update(raw.rms, &mut self.normalizer);
        let bpm = self.tempo.update(fired[Percussion::Kick.index()]);

        let flag = |b: Percussion| if fired[b.index()] { 1.0 } else { 0.0 };
        let frame = FeatureFrame {
            loudness_rms: loudness,
            loudness_peak: norm.rms,
            bass: smoothed[VisualBand::Bass.index()],
            mid: smoothed[VisualBand::Mid.index()],
            treble: smoothed[VisualBand::Treble.index()],
            beat: strike[Percussion::Kick.index()],
            perimeter_sparkle: strike[Percussion::Snare.index()]
                .max(strike[Percussion::Hihat.index()]),
            kick: flag(Percussion::Kick),
            snare: flag(Percussion::Snare),
            hihat: flag(Percussion::Hihat),
            is_chorus: section.is_chorus,
            energy_density: section.energy_density,
            bpm,
        }
        .sanitized();

        self.last_raw = raw;
        self.last_normalized = norm;
        self.last_output = frame;
        Ok(frame)
    }

    /// Mono convenience for [`FeatureEngine::update`].
    ///
    /// # Errors
    /// See [`FeatureEngine::update`].
    pub fn update_mono(&mut self, samples: &[f32]) -> Result<FeatureFrame, AudioError> {
        self.update(samples, 1)
    }

    /// Like [`FeatureEngine::update`], but a rejected frame yields the
    /// previous valid output instead of an error.
    pub fn update_or_hold(&mut self, samples: &[f32], channels: usize) -> FeatureFrame {
        match self.update(samples, channels) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Frame ignorée, sortie précédente conservée : {e}");
                self.last_output
            }
        }
    }

    /// Restore construction-time state (silent window, floor peaks, zero
    /// envelopes, armed onset detectors, empty history).
    pub fn reset(&mut self) {
        self.ring.clear();
        self.mono.fill(0.0);
        self.normalizer.reset();
        for env in &mut self.envelopes {
            env.reset();
        }
        self.loudness.reset();
        for det in &mut self.onsets {
            det.reset();
        }
        for strike in &mut self.strikes {
            strike.reset();
        }
        self.section.reset();
        self.tempo.reset();
        self.last_raw = BandEnergies::default();
        self.last_normalized = NormalizedBands::default();
        self.last_output = FeatureFrame::default();
        log::debug!("FeatureEngine réinitialisé");
    }

    /// Output of the last successful `update`.
    #[must_use]
    pub fn last_output(&self) -> FeatureFrame {
        self.last_output
    }

    /// Raw band energies of the last successful `update`.
    #[must_use]
    pub fn last_raw(&self) -> &BandEnergies {
        &self.last_raw
    }

    /// Normalized (pre-envelope) values of the last successful `update`.
    #[must_use]
    pub fn last_normalized(&self) -> &NormalizedBands {
        &self.last_normalized
    }

    #[must_use]
    pub fn normalizer(&self) -> &AdaptiveNormalizer {
        &self.normalizer
    }

    /// Magnitude spectrum of the last analyzed window.
    #[must_use]
    pub fn spectrum(&self) -> &[f32] {
        self.front_end.magnitudes()
    }

    /// Effective (validated, clamped) configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Samples per channel expected by `update`.
    #[must_use]
    pub fn hop_size(&self) -> usize {
        self.config.engine.hop_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48_000.0;
    const HOP: usize = 1024;

    fn engine() -> FeatureEngine {
        FeatureEngine::new(EngineConfig::default()).expect("default config is valid")
    }

    /// One hop of a sine, phase-continuous from hop index `k`.
    fn sine_hop(freq: f32, amp: f32, k: usize) -> Vec<f32> {
        (0..HOP)
            .map(|i| {
                let t = (k * HOP + i) as f32 / SR;
                amp * (2.0 * std::f32::consts::PI * freq * t).sin()
            })
            .collect()
    }

    fn silence() -> Vec<f32> {
        vec![0.0; HOP]
    }

    fn assert_in_range(f: &FeatureFrame) {
        for (name, v) in f.iter() {
            if matches!(name, "kick" | "snare" | "hihat" | "is_chorus") {
                assert!(v == 0.0 || v == 1.0, "{name} = {v} is not a flag");
            } else if name != "bpm" {
                assert!((0.0..=1.0).contains(&v), "{name} = {v} out of range");
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.engine.hop_size = 4096;
        assert!(matches!(
            FeatureEngine::new(config),
            Err(AudioError::Config(_))
        ));
    }

    #[test]
    fn outputs_stay_in_range_on_mixed_input() {
        let mut engine = engine();
        // Deterministic pseudo-noise + bursts, stereo.
        let mut seed = 0x1234_5678u32;
        for k in 0..300 {
            let gain = if k % 37 < 3 { 1.0 } else { 0.05 };
            let hop: Vec<f32> = (0..HOP * 2)
                .map(|_| {
                    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    gain * ((seed >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0)
                })
                .collect();
            let f = engine.update(&hop, 2).expect("valid hop");
            assert_in_range(&f);
        }
    }

    #[test]
    fn silence_drives_everything_to_zero() {
        let mut engine = engine();
        for k in 0..50 {
            engine.update_mono(&sine_hop(440.0, 0.5, k)).expect("hop");
        }
        // Longer than the 140-hop section history.
        let mut last = FeatureFrame::default();
        for i in 0..200 {
            last = engine.update_mono(&silence()).expect("hop");
            // The window is all zeros from the second silent hop on.
            if i >= 1 {
                assert_eq!(last.kick + last.snare + last.hihat, 0.0);
            }
        }
        assert!(last.loudness_rms < 1e-3);
        assert!(last.bass < 1e-3);
        assert!(last.mid < 1e-3);
        assert!(last.treble < 1e-3);
        assert!(!last.is_chorus);
    }

    #[test]
    fn pure_silence_never_fires() {
        let mut engine = engine();
        for _ in 0..100 {
            let f = engine.update_mono(&silence()).expect("hop");
            assert_eq!(f.kick + f.snare + f.hihat, 0.0);
            assert!(f.loudness_rms < 1e-6);
            assert!(!f.is_chorus);
        }
    }

    #[test]
    fn kick_fires_and_beat_decays() {
        let mut engine = engine();
        for _ in 0..20 {
            engine.update_mono(&silence()).expect("hop");
        }
        let loud = engine.update_mono(&sine_hop(80.0, 0.9, 0)).expect("hop");
        assert_eq!(loud.kick, 1.0);
        assert!((loud.beat - 1.0).abs() < f32::EPSILON);

        let mut expected = 1.0f32;
        for _ in 0..10 {
            let f = engine.update_mono(&silence()).expect("hop");
            expected *= 0.7;
            assert_eq!(f.kick, 0.0);
            assert!((f.beat - expected).abs() < 1e-5, "beat {} != {expected}", f.beat);
        }
    }

    #[test]
    fn kick_refractory_holds_under_alternating_bursts() {
        // Loud/silent every other hop maximises kick flux.
        let mut engine = engine();
        let mut fired = Vec::new();
        for k in 0..60 {
            let hop = if k % 2 == 0 {
                sine_hop(80.0, 0.9, k)
            } else {
                silence()
            };
            if engine.update_mono(&hop).expect("hop").kick > 0.5 {
                fired.push(k);
            }
        }
        assert!(!fired.is_empty());
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= 4, "kicks too close: {pair:?}");
        }
    }

    #[test]
    fn peak_trackers_cover_raw_values() {
        let mut engine = engine();
        for k in 0..80 {
            let amp = 0.1 + 0.8 * ((k * 7) % 11) as f32 / 11.0;
            engine.update_mono(&sine_hop(2500.0, amp, k)).expect("hop");
            let raw = *engine.last_raw();
            let norm = engine.normalizer();
            for b in VisualBand::ALL {
                assert!(norm.visual_peak(b) >= raw.visual(b));
            }
            for b in Percussion::ALL {
                assert!(norm.transient_peak(b) >= raw.transient(b));
            }
            assert!(norm.rms_peak() >= raw.rms);
        }
    }

    #[test]
    fn steady_frame_reaches_fixed_point() {
        let mut engine = engine();
        let hop = sine_hop(300.0, 0.4, 0);
        let mut prev = FeatureFrame::default();
        for _ in 0..600 {
            prev = engine.update_mono(&hop).expect("hop");
        }
        let next = engine.update_mono(&hop).expect("hop");
        for ((name, a), (_, b)) in prev.iter().zip(next.iter()) {
            assert!((a - b).abs() < 1e-5, "{name} drifted: {a} -> {b}");
        }
        assert!(next.is_chorus);
        assert!(next.energy_density > 0.99);
    }

    #[test]
    fn section_flag_lags_the_rise() {
        // 2 s silence, 5 s linear rise, 5 s steady.
        let mut engine = engine();
        let hops_per_sec = (SR / HOP as f32) as usize;
        for _ in 0..2 * hops_per_sec {
            assert!(!engine.update_mono(&silence()).expect("hop").is_chorus);
        }

        let rise = 5 * hops_per_sec;
        let mut first_chorus = None;
        let mut densities = Vec::new();
        for k in 0..rise {
            let amp = 0.6 * (k + 1) as f32 / rise as f32;
            let f = engine.update_mono(&sine_hop(200.0, amp, k)).expect("hop");
            densities.push(f.energy_density);
            if f.is_chorus && first_chorus.is_none() {
                first_chorus = Some(k);
            }
        }
        let mut steady = FeatureFrame::default();
        for k in 0..5 * hops_per_sec {
            steady = engine
                .update_mono(&sine_hop(200.0, 0.6, rise + k))
                .expect("hop");
        }

        let first = first_chorus.expect("chorus during the rise");
        assert!(first > 0, "flag must not fire on the first rising hop");
        assert!(densities[first] > 0.55);
        assert!(densities[rise - 1] > densities[0]);
        assert!(steady.is_chorus);
        assert!(steady.energy_density > 0.9);
    }

    #[test]
    fn rejected_frames_leave_state_untouched() {
        let mut engine = engine();
        for k in 0..10 {
            engine.update_mono(&sine_hop(100.0, 0.5, k)).expect("hop");
        }
        let before = engine.last_output();

        assert!(matches!(
            engine.update(&[0.0; 10], 1),
            Err(AudioError::InvalidInputShape { .. })
        ));
        let mut bad = sine_hop(100.0, 0.5, 10);
        bad[17] = f32::NAN;
        assert_eq!(
            engine.update_mono(&bad),
            Err(AudioError::NumericDegenerate { index: 17 })
        );
        assert_eq!(engine.update_or_hold(&bad, 1), before);

        // Same next hop as a twin engine that never saw the bad frames.
        let mut twin = self::engine();
        for k in 0..10 {
            twin.update_mono(&sine_hop(100.0, 0.5, k)).expect("hop");
        }
        let hop = sine_hop(100.0, 0.5, 10);
        assert_eq!(engine.update_mono(&hop), twin.update_mono(&hop));
    }

    #[test]
    fn oversized_frame_does_not_latch_the_peaks() {
        let mut engine = engine();
        for k in 0..50 {
            engine.update_mono(&sine_hop(200.0, 0.5, k)).expect("hop");
        }
        let spike = engine.update_mono(&vec![1e20; HOP]).expect("finite samples are accepted");
        assert_in_range(&spike);
        assert!(engine.normalizer().rms_peak().is_finite());
        assert!(engine.normalizer().visual_peak(VisualBand::Bass).is_finite());

        let mut last = FeatureFrame::default();
        for k in 51..3051 {
            last = engine.update_mono(&sine_hop(200.0, 0.5, k)).expect("hop");
        }
        let norm = engine.normalizer();
        assert!(norm.rms_peak().is_finite());
        for b in VisualBand::ALL {
            assert!(norm.visual_peak(b).is_finite());
        }
        assert!(norm.density_peak().is_finite());
        assert!(last.loudness_rms > 0.5, "loudness_rms {}", last.loudness_rms);
        assert!(last.loudness_peak > 0.5);
        assert!(last.bass > 0.5, "bass {}", last.bass);
        assert!(last.energy_density > 0.5);
        assert!(last.is_chorus);
    }

    #[test]
    fn spectrum_has_half_window_plus_one_bins() {
        let mut engine = engine();
        assert_eq!(engine.spectrum().len(), 2048 / 2 + 1);
        engine.update_mono(&sine_hop(1000.0, 0.5, 0)).expect("hop");
        let peak_bin = engine
            .spectrum()
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (k, &m)| if m > best.1 { (k, m) } else { best })
            .0;
        // 1000 Hz / (48000 / 2048) ≈ bin 43
        assert!((42..=44).contains(&peak_bin), "peak at bin {peak_bin}");
    }

    #[test]
    fn stereo_and_duplicated_mono_agree() {
        let mut mono_engine = engine();
        let mut stereo_engine = engine();
        for k in 0..20 {
            let hop = sine_hop(1000.0, 0.3, k);
            let stereo: Vec<f32> = hop.iter().flat_map(|&s| [s, s]).collect();
            let a = mono_engine.update_mono(&hop).expect("hop");
            let b = stereo_engine.update(&stereo, 2).expect("hop");
            assert_eq!(a, b);
        }
    }

    #[test]
    fn reset_matches_fresh_engine() {
        let mut used = engine();
        for k in 0..30 {
            used.update_mono(&sine_hop(120.0, 0.8, k)).expect("hop");
        }
        used.reset();
        let mut fresh = engine();
        let hop = sine_hop(120.0, 0.8, 0);
        assert_eq!(used.update_mono(&hop), fresh.update_mono(&hop));
    }

    #[test]
    fn tempo_reported_when_enabled() {
        let mut config = EngineConfig::default();
        config.tempo.enabled = true;
        let mut engine = FeatureEngine::new(config).expect("config");
        let mut last = FeatureFrame::default();
        // Kick burst every 23 hops ≈ 122 BPM.
        for k in 0..23 * 12 {
            let hop = if k % 23 == 0 {
                sine_hop(80.0, 0.9, k)
            } else {
                silence()
            };
            last = engine.update_mono(&hop).expect("hop");
        }
        let expected = 60.0 * SR / HOP as f32 / 23.0;
        assert!((last.bpm - expected).abs() < 0.5, "bpm {}", last.bpm);
    }
}
