use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded PCM, interleaved, at the file's native sample rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples, `channels` values per frame.
    pub samples: Vec<f32>,
    /// 1 or 2.
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of sample frames (samples per channel).
    #[must_use]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Decode an audio file into interleaved f32 samples (mono or stereo).
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia. Files with more than two
/// channels keep only the first two (front left / front right). No resampling.
///
/// # Errors
/// Returns an error if the file cannot be opened, probed or decoded, or has
/// no audio track.
///
/// # Example
/// ```no_run
/// use lk_audio::decode::decode_file;
/// let audio = decode_file("track.wav").unwrap();
/// println!("{} Hz, {} ch, {:.1} s", audio.sample_rate, audio.channels, audio.duration_secs());
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<DecodedAudio> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Cannot open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(
        Box::new(file),
        symphonia::core::io::MediaSourceStreamOptions::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe audio format")?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .context("No default audio track found")?;

    let Some(sample_rate) = track.codec_params.sample_rate else {
        bail!("Unknown sample rate in {}", path.display());
    };
    let source_channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count)
        .max(1);
    let channels = source_channels.min(2);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut max_sample_frames: usize = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("Audio decode packet error: {e}");
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Audio decode frame error: {e}");
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.capacity();
        if sample_buf.is_none() || num_frames > max_sample_frames {
            sample_buf = Some(SampleBuffer::<f32>::new(num_frames as u64, spec));
            max_sample_frames = num_frames;
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        let packet_channels = spec.channels.count().max(1);
        if packet_channels == channels {
            samples.extend_from_slice(buf.samples());
        } else {
            for frame in buf.samples().chunks_exact(packet_channels) {
                samples.extend_from_slice(&frame[..channels.min(packet_channels)]);
                if packet_channels < channels {
                    // Mono packet in a stereo stream.
                    samples.push(frame[0]);
                }
            }
        }
    }

    if source_channels > 2 {
        log::warn!(
            "{} : {source_channels} canaux, seuls les deux premiers sont analysés",
            path.display()
        );
    }
    log::info!(
        "Decoded {} frames @ {}Hz, {} ch from {}",
        samples.len() / channels,
        sample_rate,
        channels,
        path.display()
    );

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}
