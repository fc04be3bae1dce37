//! Biquad filter — WebAudio BiquadFilterNode response types.

use std::f64::consts::{PI, SQRT_2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
    Peaking,
    HighShelf,
}

/// A biquad IIR filter (2nd order).
///
/// Direct Form II Transposed; coefficients from the Audio EQ Cookbook
/// (Robert Bristow-Johnson). The shelf uses a slope of 1.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    pub frequency: f64,
    pub q: f64,
    pub gain_db: f64, // Peaking and HighShelf only

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 350.0,
            q: 1.0,
            gain_db: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            dirty: true,
        };
        f.update_coefficients();
        f
    }

    /// Construct with all parameters at once.
    pub fn with_params(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        q: f64,
        gain_db: f64,
    ) -> Self {
        let mut f = Self::new(filter_type, sample_rate);
        f.frequency = frequency;
        f.q = q;
        f.gain_db = gain_db;
        f.update_coefficients();
        f
    }

    pub fn update_coefficients(&mut self) {
        // Keep the cutoff below Nyquist so the coefficients stay stable
        let freq = self.frequency.clamp(1.0, self.sample_rate * 0.499);
        let w0 = 2.0 * PI * freq / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * self.q);
        let a_lin = (10.0_f64).powf(self.gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                let b0 = b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                let b1 = -(1.0 + cos_w0);
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Peaking => (
                1.0 + alpha * a_lin,
                -2.0 * cos_w0,
                1.0 - alpha * a_lin,
                1.0 + alpha / a_lin,
                -2.0 * cos_w0,
                1.0 - alpha / a_lin,
            ),
            FilterType::HighShelf => {
                let shelf_alpha = sin_w0 / 2.0 * SQRT_2;
                let two_sqrt_a_alpha = 2.0 * a_lin.sqrt() * shelf_alpha;
                let (ap1, am1) = (a_lin + 1.0, a_lin - 1.0);
                (
                    a_lin * (ap1 + am1 * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a_lin * (am1 + ap1 * cos_w0),
                    a_lin * (ap1 + am1 * cos_w0 - two_sqrt_a_alpha),
                    ap1 - am1 * cos_w0 + two_sqrt_a_alpha,
                    2.0 * (am1 - ap1 * cos_w0),
                    ap1 - am1 * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
        self.dirty = false;
    }

    pub fn process(&mut self, input: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Set frequency and mark coefficients dirty.
    pub fn set_frequency(&mut self, freq: f64) {
        if freq != self.frequency {
            self.frequency = freq;
            self.dirty = true;
        }
    }
}
