use std::path::Path;

use anyhow::{Context, Result};
use lk_core::config::EngineConfig;
use lk_core::timeline::FeatureTimeline;

use crate::decode::decode_file;
use crate::engine::FeatureEngine;
use crate::error::AudioError;

/// Analyseur offline : découpe un buffer complet en hops et le fait passer
/// dans un `FeatureEngine`, une frame de features par hop.
///
/// Le dernier hop incomplet est complété par des zéros.
///
/// # Example
/// ```
/// use lk_audio::batch::BatchAnalyzer;
/// use lk_core::config::EngineConfig;
///
/// let mut analyzer = BatchAnalyzer::new(EngineConfig::default()).unwrap();
/// let samples = vec![0.0f32; 48_000]; // 1 s mono
/// let timeline = analyzer.analyze(&samples, 1).unwrap();
/// assert_eq!(timeline.frames.len(), 47); // ceil(48000 / 1024)
/// ```
pub struct BatchAnalyzer {
    engine: FeatureEngine,
    /// Reused for the zero-padded tail.
    tail: Vec<f32>,
}

impl BatchAnalyzer {
    /// # Errors
    /// Returns `AudioError::Config` if the configuration is rejected.
    pub fn new(config: EngineConfig) -> Result<Self, AudioError> {
        Ok(Self {
            engine: FeatureEngine::new(config)?,
            tail: Vec::new(),
        })
    }

    /// Analyze a whole interleaved buffer from a fresh engine state.
    ///
    /// # Errors
    /// `InvalidInputShape` if `channels` is not 1 or 2 or the buffer length is
    /// not a multiple of `channels`; `NumericDegenerate` if a sample is not
    /// finite (the index is relative to the offending hop).
    pub fn analyze(
        &mut self,
        samples: &[f32],
        channels: usize,
    ) -> Result<FeatureTimeline, AudioError> {
        let hop = self.engine.hop_size();
        if !(channels == 1 || channels == 2) || samples.len() % channels != 0 {
            return Err(AudioError::InvalidInputShape {
                expected: hop,
                got: samples.len(),
                channels,
            });
        }
        self.engine.reset();

        let chunk = hop * channels;
        let mut frames = Vec::with_capacity(samples.len().div_ceil(chunk));
        let mut hops = samples.chunks_exact(chunk);
        for frame in hops.by_ref() {
            frames.push(self.engine.update(frame, channels)?);
        }
        let rest = hops.remainder();
        if !rest.is_empty() {
            self.tail.clear();
            self.tail.extend_from_slice(rest);
            self.tail.resize(chunk, 0.0);
            frames.push(self.engine.update(&self.tail, channels)?);
        }

        let config = self.engine.config();
        log::debug!(
            "Batch : {} frames ({} canal(aux), {} Hz)",
            frames.len(),
            channels,
            config.engine.sample_rate
        );
        Ok(FeatureTimeline {
            frames,
            hop_duration: hop as f32 / config.engine.sample_rate as f32,
            sample_rate: config.engine.sample_rate,
        })
    }

    #[must_use]
    pub fn engine(&self) -> &FeatureEngine {
        &self.engine
    }
}

/// Decode `path` and analyze it with `config`, whose sample rate is replaced
/// by the file's.
///
/// # Errors
/// Returns an error if decoding fails, the adjusted configuration is rejected,
/// or the decoded audio contains non-finite samples.
pub fn analyze_file(path: &Path, config: &EngineConfig) -> Result<FeatureTimeline> {
    let audio = decode_file(path)?;
    let mut config = config.clone();
    if config.engine.sample_rate != audio.sample_rate {
        log::info!(
            "{} : sample rate {} Hz (config {} Hz)",
            path.display(),
            audio.sample_rate,
            config.engine.sample_rate
        );
        config.engine.sample_rate = audio.sample_rate;
    }

    let mut analyzer = BatchAnalyzer::new(config)
        .with_context(|| format!("Configuration invalide pour {}", path.display()))?;
    analyzer
        .analyze(&audio.samples, audio.channels)
        .with_context(|| format!("Analyse impossible : {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lk_core::band::Percussion;

    use super::*;

    /// Kick-band burst every `period` hops, silence otherwise.
    fn pulse_train(hops: usize, period: usize, hop: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; hops * hop];
        for h in (0..hops).step_by(period) {
            for (i, s) in out[h * hop..(h + 1) * hop].iter_mut().enumerate() {
                *s = 0.9 * (2.0 * std::f32::consts::PI * 80.0 * i as f32 / 48_000.0).sin();
            }
        }
        out
    }

    #[test]
    fn tail_is_zero_padded() {
        let mut analyzer = BatchAnalyzer::new(EngineConfig::default()).expect("config");
        let timeline = analyzer.analyze(&vec![0.1f32; 2 * 1024 + 10], 2).expect("analyze");
        // 1034 stereo frames -> 1 full hop + 1 padded hop.
        assert_eq!(timeline.frames.len(), 2);
        assert!((timeline.hop_duration - 1024.0 / 48_000.0).abs() < 1e-9);
    }

    #[test]
    fn matches_streaming_engine() {
        let samples = pulse_train(40, 10, 1024);
        let mut analyzer = BatchAnalyzer::new(EngineConfig::default()).expect("config");
        let timeline = analyzer.analyze(&samples, 1).expect("analyze");

        let mut engine = FeatureEngine::new(EngineConfig::default()).expect("config");
        for (frame, hop) in timeline.frames.iter().zip(samples.chunks_exact(1024)) {
            assert_eq!(*frame, engine.update_mono(hop).expect("hop"));
        }
        assert_eq!(timeline.onset_count(Percussion::Kick), 4);
    }

    #[test]
    fn repeated_runs_are_independent() {
        let samples = pulse_train(20, 5, 1024);
        let mut analyzer = BatchAnalyzer::new(EngineConfig::default()).expect("config");
        let a = analyzer.analyze(&samples, 1).expect("analyze");
        let b = analyzer.analyze(&samples, 1).expect("analyze");
        assert_eq!(a.frames, b.frames);
    }

    #[test]
    fn odd_stereo_length_is_rejected() {
        let mut analyzer = BatchAnalyzer::new(EngineConfig::default()).expect("config");
        assert!(matches!(
            analyzer.analyze(&[0.0; 5], 2),
            Err(AudioError::InvalidInputShape { .. })
        ));
    }

    /// Minimal 16-bit PCM WAV.
    fn write_wav(file: &mut impl Write, samples: &[i16], channels: u16, rate: u32) {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * u32::from(block_align)).to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        file.write_all(&bytes).expect("write wav");
    }

    #[test]
    fn analyze_file_uses_the_file_sample_rate() {
        let mut file = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()
            .expect("tempfile");
        // 0.5 s stereo @ 22050 Hz.
        let pcm: Vec<i16> = (0..22_050)
            .map(|i| ((i as f32 * 0.05).sin() * 8000.0) as i16)
            .collect();
        write_wav(&mut file, &pcm, 2, 22_050);
        file.flush().expect("flush");

        let timeline = analyze_file(file.path(), &EngineConfig::default()).expect("analyze");
        assert_eq!(timeline.sample_rate, 22_050);
        // 11025 frames / 1024 -> 11 hops.
        assert_eq!(timeline.frames.len(), 11);
    }
}
