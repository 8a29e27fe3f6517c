use lk_core::config::EnvelopeParams;

/// Lissage exponentiel asymétrique attack/release (un pôle).
///
/// `attack` s'applique quand l'entrée monte, `release` quand elle descend ;
/// plus le coefficient est grand, plus la réponse est rapide.
///
/// # Example
/// ```
/// use lk_audio::envelope::EnvelopeFollower;
/// let mut env = EnvelopeFollower::new(1.0, 0.5);
/// assert_eq!(env.update(1.0), 1.0);
/// assert_eq!(env.update(0.0), 0.5);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvelopeFollower {
    value: f32,
    attack: f32,
    release: f32,
}

impl EnvelopeFollower {
    #[must_use]
    pub fn new(attack: f32, release: f32) -> Self {
        Self {
            value: 0.0,
            attack,
            release,
        }
    }

    #[must_use]
    pub fn from_params(params: EnvelopeParams) -> Self {
        Self::new(params.attack, params.release)
    }

    /// Feed one input and return the smoothed value.
    #[inline(always)]
    pub fn update(&mut self, x: f32) -> f32 {
        let alpha = if x > self.value {
            self.attack
        } else {
            self.release
        };
        self.value = alpha * x + (1.0 - alpha) * self.value;
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
    fn attack_and_release_use_their_own_coefficient() {
        let mut env = EnvelopeFollower::new(0.9, 0.25);
        let up = env.update(1.0);
        assert!((up - 0.9).abs() < 1e-6);
        let down = env.update(0.0);
        assert!((down - 0.9 * 0.75).abs() < 1e-6);
    }

    #[test]
    fn converges_to_constant_input() {
        let mut env = EnvelopeFollower::new(0.35, 0.06);
        let mut prev = 0.0;
        for _ in 0..200 {
            prev = env.update(0.7);
        }
        assert!((prev - 0.7).abs() < 1e-5);
        assert!((env.value() - prev).abs() < f32::EPSILON);
        // Already at the fixed point: no drift.
        assert!((env.update(0.7) - prev).abs() < 1e-6);
    }

    #[test]
    fn stays_within_input_hull() {
        let mut env = EnvelopeFollower::new(0.5, 0.2);
        for i in 0..100 {
            let x = if i % 3 == 0 { 1.0 } else { 0.0 };
            let v = env.update(x);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
