//! Compressor — stereo-linked feed-forward dynamics for the music bus.
//!
//! Threshold, ratio, knee, attack, and release follow the WebAudio
//! DynamicsCompressorNode parameters (soft knee of 30 dB by default).

#[derive(Debug, Clone)]
pub struct Compressor {
    /// Threshold in dB.
    pub threshold: f64,
    /// Compression ratio (3.0 = 3:1).
    pub ratio: f64,
    /// Knee width in dB (0 = hard knee).
    pub knee: f64,

    attack_coef: f64,
    release_coef: f64,
    envelope: f64, // linear peak level
}

impl Compressor {
    /// `attack` and `release` are time constants in seconds.
    pub fn new(sample_rate: f64, threshold: f64, ratio: f64, attack: f64, release: f64) -> Self {
        let attack = attack.clamp(0.0001, 1.0);
        let release = release.clamp(0.001, 5.0);
        Compressor {
            threshold: threshold.clamp(-100.0, 0.0),
            ratio: ratio.clamp(1.0, 20.0),
            knee: 30.0,
            attack_coef: (-1.0 / (attack * sample_rate)).exp(),
            release_coef: (-1.0 / (release * sample_rate)).exp(),
            envelope: 0.0,
        }
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain change in dB (≤ 0) for an input level in dB.
    #[inline]
    fn compute_gain(&self, input_db: f64) -> f64 {
        let slope = 1.0 - 1.0 / self.ratio;

        if self.knee <= 0.0 {
            return if input_db <= self.threshold {
                0.0
            } else {
                (self.threshold - input_db) * slope
            };
        }

        let half_knee = self.knee / 2.0;
        let knee_start = self.threshold - half_knee;
        let knee_end = self.threshold + half_knee;

        if input_db <= knee_start {
            0.0
        } else if input_db >= knee_end {
            (self.threshold - input_db) * slope
        } else {
            // Quadratic blend through the knee
            let x = input_db - knee_start;
            -slope * x * x / (2.0 * self.knee)
        }
    }

    /// Process one stereo frame; both channels share the detector.
    #[inline]
    pub fn process(&mut self, left: f64, right: f64) -> (f64, f64) {
        let level = left.abs().max(right.abs());

        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        let gain = Self::db_to_linear(self.compute_gain(Self::linear_to_db(self.envelope)));
        (left * gain, right * gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_signal_passes_through() {
        let mut comp = Compressor::new(48000.0, -24.0, 3.0, 0.03, 0.15);
        // -46 dB: below the knee start at -39 dB
        for _ in 0..10_000 {
            comp.process(0.005, 0.005);
        }
        let (l, r) = comp.process(0.005, 0.005);
        assert!((l - 0.005).abs() < 1e-6, "got {l}");
        assert_eq!(l, r);
    }

    #[test]
    fn loud_signal_is_reduced() {
        let mut comp = Compressor::new(48000.0, -24.0, 3.0, 0.03, 0.15);
        for _ in 0..48_000 {
            comp.process(1.0, 1.0);
        }
        let (l, _) = comp.process(1.0, 1.0);
        // 24 dB over threshold at 3:1 → -16 dB ≈ 0.158
        assert!((l - 0.158).abs() < 0.01, "expected ~0.158, got {l}");
    }

    #[test]
    fn knee_is_continuous() {
        let comp = Compressor::new(48000.0, -24.0, 3.0, 0.03, 0.15);
        let at_start = comp.compute_gain(-39.0);
        let at_end = comp.compute_gain(-9.0);
        assert!(at_start.abs() < 1e-12);
        assert!((at_end - (-24.0 - -9.0) * (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn attack_takes_time() {
        let mut comp = Compressor::new(48000.0, -24.0, 3.0, 0.03, 0.15);
        let (first, _) = comp.process(1.0, 1.0);
        for _ in 0..4800 {
            comp.process(1.0, 1.0);
        }
        let (later, _) = comp.process(1.0, 1.0);
        assert!(first > later, "first={first}, later={later}");
    }

    #[test]
    fn linked_channels_share_gain() {
        let mut comp = Compressor::new(48000.0, -24.0, 3.0, 0.03, 0.15);
        for _ in 0..4800 {
            comp.process(1.0, 0.0);
        }
        let (l, r) = comp.process(1.0, 0.5);
        assert!((r / l - 0.5).abs() < 1e-9);
    }
}
