use crate::error::AudioError;

/// Les échantillons finis sont bornés à `±SAMPLE_LIMIT` avant d'entrer dans la
/// fenêtre : énergies et peaks restent finis quel que soit le niveau d'entrée.
pub const SAMPLE_LIMIT: f32 = 16.0;

/// Fenêtre glissante stéréo de `N` échantillons, avancée d'un hop `H` à la fois.
///
/// Contient toujours exactement les `N` derniers échantillons reçus ;
/// `N - H` sont conservés d'un appel à l'autre. Les deux canaux sont
/// pré-alloués et réécrits sur place.
///
/// # Example
/// ```
/// use lk_audio::ring::WindowedRingBuffer;
/// let mut ring = WindowedRingBuffer::new(8, 4);
/// ring.push(&[1.0, 1.0, 1.0, 1.0], 1).unwrap();
/// let mut mono = [0.0f32; 8];
/// ring.mix_mono(&mut mono);
/// assert_eq!(mono, [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
/// ```
pub struct WindowedRingBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    hop: usize,
}

impl WindowedRingBuffer {
    /// Create a zero-filled window of `window` frames advanced by `hop`.
    ///
    /// # Panics
    /// Panics if `hop` is 0 or larger than `window`.
    #[must_use]
    pub fn new(window: usize, hop: usize) -> Self {
        assert!(hop > 0 && hop <= window, "hop must be in [1, window]");
        Self {
            left: vec![0.0; window],
            right: vec![0.0; window],
            hop,
        }
    }

    /// Window length `N`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Always `false`: the window is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Hop length `H`.
    #[must_use]
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Check an interleaved frame without touching the buffer.
    ///
    /// # Errors
    /// `InvalidInputShape` if `channels` is not 1 or 2 or the frame does not
    /// hold exactly `hop` samples per channel; `NumericDegenerate` on the
    /// first NaN or infinite sample.
    pub fn check(&self, samples: &[f32], channels: usize) -> Result<(), AudioError> {
        if !(channels == 1 || channels == 2) || samples.len() != self.hop * channels {
            return Err(AudioError::InvalidInputShape {
                expected: self.hop,
                got: samples.len(),
                channels,
            });
        }
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AudioError::NumericDegenerate { index });
        }
        Ok(())
    }

    /// Shift the window left by one hop and append an interleaved frame.
    ///
    /// Mono input is written to both channels. Samples are clamped to
    /// `±SAMPLE_LIMIT`. On error the buffer is left unchanged.
    ///
    /// # Errors
    /// See [`WindowedRingBuffer::check`].
    pub fn push(&mut self, samples: &[f32], channels: usize) -> Result<(), AudioError> {
        self.check(samples, channels)?;

        let n = self.left.len();
        let h = self.hop;
        self.left.copy_within(h.., 0);
        self.right.copy_within(h.., 0);

        let (left_tail, right_tail) = (&mut self.left[n - h..], &mut self.right[n - h..]);
        if channels == 1 {
            for ((l, r), &s) in left_tail.iter_mut().zip(right_tail.iter_mut()).zip(samples) {
                *l = bound(s);
                *r = *l;
            }
        } else {
            for ((l, r), frame) in left_tail
                .iter_mut()
                .zip(right_tail.iter_mut())
                .zip(samples.chunks_exact(2))
            {
                *l = bound(frame[0]);
                *r = bound(frame[1]);
            }
        }
        Ok(())
    }

    /// Write the per-sample channel average of the whole window into `out`.
    ///
    /// `out` is expected to be `len()` long; extra slots are left untouched.
    #[inline]
    pub fn mix_mono(&self, out: &mut [f32]) {
        for ((slot, &l), &r) in out.iter_mut().zip(&self.left).zip(&self.right) {
            *slot = 0.5 * (l + r);
        }
    }

    /// Zero both channels.
    pub fn clear(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }
}

#[inline(always)]
fn bound(s: f32) -> f32 {
    s.clamp(-SAMPLE_LIMIT, SAMPLE_LIMIT)
}
