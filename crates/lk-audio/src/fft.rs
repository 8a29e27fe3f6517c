use std::ops::Range;
use std::sync::Arc;

use lk_core::band::{Aggregation, BandDef, Percussion, VisualBand};
use lk_core::config::EngineConfig;
use realfft::RealFftPlanner;
use realfft::num_complex::Complex;

/// Raw, unnormalized energies of one analysis window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnergies {
    /// Indexed by [`VisualBand::index`].
    pub visual: [f32; 3],
    /// Indexed by [`Percussion::index`].
    pub transient: [f32; 3],
    /// `sqrt(mean(windowed²)) + epsilon`.
    pub rms: f32,
}

impl BandEnergies {
    #[inline]
    #[must_use]
    pub fn visual(&self, band: VisualBand) -> f32 {
        self.visual[band.index()]
    }

    #[inline]
    #[must_use]
    pub fn transient(&self, band: Percussion) -> f32 {
        self.transient[band.index()]
    }
}

/// Bins selected by one band, resolved once at construction.
#[derive(Clone, Debug, PartialEq)]
struct BandBins {
    range: Range<usize>,
    aggregation: Aggregation,
}

impl BandBins {
    fn resolve(band: BandDef, bin_hz: f32, num_bins: usize) -> Self {
        let mut selected = (0..num_bins).filter(|&k| band.contains(k as f32 * bin_hz));
        let range = match selected.next() {
            Some(first) => {
                let last = selected.last().unwrap_or(first);
                first..last + 1
            }
            None => 0..0,
        };
        Self {
            range,
            aggregation: band.aggregation,
        }
    }
}

/// Front end spectral : fenêtre de Hann, FFT réelle (realfft), réduction par bande.
///
/// Pré-alloue le plan FFT, les buffers et le spectre de magnitudes :
/// `analyze` n'alloue rien.
///
/// # Example
/// ```
/// use lk_audio::fft::SpectralFrontEnd;
/// use lk_core::config::EngineConfig;
/// let mut front = SpectralFrontEnd::new(&EngineConfig::default());
/// let energies = front.analyze(&vec![0.0f32; 2048]);
/// assert_eq!(front.magnitudes().len(), 1025); // N/2 + 1
/// assert_eq!(energies.visual, [0.0; 3]);
/// ```
pub struct SpectralFrontEnd {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    plan: Arc<dyn realfft::RealToComplex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
    magnitudes: Vec<f32>,
    bin_hz: f32,
    visual_bins: [BandBins; 3],
    transient_bins: [BandBins; 3],
    visual_mean_weight: f32,
    rms_epsilon: f32,
}

impl SpectralFrontEnd {
    /// Build the front end from the stream geometry and band table.
    ///
    /// # Panics
    /// Panics if `config.engine.fft_size` is 0.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let size = config.engine.fft_size;
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();
        let num_bins = spectrum_buf.len();

        // Hann window
        let window: Vec<f32> = (0..size)
            .map(|i| {
                if size == 1 {
                    1.0
                } else {
                    0.5 * (1.0
                        - (2.0 * std::f32::consts::PI * i as f32 / (size as f32 - 1.0)).cos())
                }
            })
            .collect();

        let bin_hz = config.engine.sample_rate as f32 / size as f32;
        let bands = &config.bands;
        let visual_bins =
            VisualBand::ALL.map(|b| BandBins::resolve(bands.visual(b), bin_hz, num_bins));
        let transient_bins =
            Percussion::ALL.map(|b| BandBins::resolve(bands.percussion(b), bin_hz, num_bins));

        for (band, bins) in VisualBand::ALL.iter().zip(&visual_bins) {
            if bins.range.is_empty() {
                log::warn!("Bande {} : aucun bin FFT dans la plage", band.name());
            }
        }
        for (band, bins) in Percussion::ALL.iter().zip(&transient_bins) {
            if bins.range.is_empty() {
                log::warn!("Bande {} : aucun bin FFT dans la plage", band.name());
            }
        }

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
            magnitudes: vec![0.0; num_bins],
            bin_hz,
            visual_bins,
            transient_bins,
            visual_mean_weight: bands.visual_mean_weight,
            rms_epsilon: config.engine.rms_epsilon,
        }
    }

    /// Window `mono`, transform it, and reduce the spectrum to band energies.
    ///
    /// `mono` shorter than the FFT size is zero-padded.
    pub fn analyze(&mut self, mono: &[f32]) -> BandEnergies {
        let n = self.fft_size.min(mono.len());

        // Copy and window
        let mut sum_sq = 0.0f32;
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { mono[i] * self.window[i] } else { 0.0 };
            sum_sq += *slot * *slot;
        }
        let rms = (sum_sq / self.fft_size as f32).sqrt() + self.rms_epsilon;

        // Forward FFT (input_buf is used as scratch by realfft)
        if self
            .plan
            .process_with_scratch(
                &mut self.input_buf,
                &mut self.spectrum_buf,
                &mut self.scratch,
            )
            .is_err()
        {
            self.magnitudes.fill(0.0);
        } else {
            for (mag, c) in self.magnitudes.iter_mut().zip(&self.spectrum_buf) {
                *mag = (c.re * c.re + c.im * c.im).sqrt();
            }
        }

        let mut energies = BandEnergies {
            rms,
            ..BandEnergies::default()
        };
        for (out, bins) in energies.visual.iter_mut().zip(&self.visual_bins) {
            *out = self.aggregate(bins);
        }
        for (out, bins) in energies.transient.iter_mut().zip(&self.transient_bins) {
            *out = self.aggregate(bins);
        }
        energies
    }

    #[inline]
    fn aggregate(&self, bins: &BandBins) -> f32 {
        let slice = &self.magnitudes[bins.range.clone()];
        if slice.is_empty() {
            return 0.0;
        }
        let max = slice.iter().copied().fold(0.0f32, f32::max);
        match bins.aggregation {
            Aggregation::Transient => max,
            Aggregation::Visual => {
                let mean = slice.iter().sum::<f32>() / slice.len() as f32;
                self.visual_mean_weight * mean + (1.0 - self.visual_mean_weight) * max
            }
        }
    }

    /// Magnitude spectrum of the last analyzed window (N/2+1 bins).
    #[must_use]
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Spacing between bins, `sample_rate / N`.
    #[must_use]
    pub fn bin_hz(&self) -> f32 {
        self.bin_hz
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Hann coefficients.
    #[must_use]
    pub fn window(&self) -> &[f32] {
        &self.window
    }
}
