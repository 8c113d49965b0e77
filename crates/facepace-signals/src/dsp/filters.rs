//! Low-pass filters for pulse-signal conditioning
//!
//! The heart-rate cascade only decides *which* filter it wants (cutoff and
//! order, see [`crate::policy`]); construction goes through a
//! [`FilterFactory`] so callers can plug in their own design.
//!
//! The bundled [`ButterworthFactory`] builds a Butterworth low-pass as a
//! cascade of second-order sections (plus one first-order section for odd
//! orders), discretized with the bilinear transform.

use std::f64::consts::PI;

use ndarray::{Array1, ArrayView1};

use crate::error::{SignalError, SignalResult};

/// Streaming filter applied one sample at a time.
pub trait LowPassFilter: Send {
    fn process(&mut self, x: f64) -> f64;

    /// Clear internal state
    fn reset(&mut self);
}

/// Builds low-pass filters for a given cutoff, order and sample rate.
pub trait FilterFactory: Send + Sync {
    fn low_pass(
        &self,
        cutoff_hz: f64,
        order: usize,
        sample_rate: f64,
    ) -> SignalResult<Box<dyn LowPassFilter>>;
}

/// Run `filter` over `values` in sample order.
pub fn apply_filter(filter: &mut dyn LowPassFilter, values: ArrayView1<f64>) -> Array1<f64> {
    values.iter().map(|&x| filter.process(x)).collect()
}

/// Butterworth factory configuration
#[derive(Debug, Clone)]
pub struct ButterworthConfig {
    /// Cutoffs above this fraction of Nyquist are pulled down to it
    pub max_nyquist_fraction: f64,
}

impl Default for ButterworthConfig {
    fn default() -> Self {
        Self {
            max_nyquist_fraction: 0.95,
        }
    }
}

/// Default [`FilterFactory`] producing Butterworth low-pass filters.
#[derive(Debug, Clone, Default)]
pub struct ButterworthFactory {
    config: ButterworthConfig,
}

impl ButterworthFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ButterworthConfig) -> Self {
        Self { config }
    }
}

impl FilterFactory for ButterworthFactory {
    fn low_pass(
        &self,
        cutoff_hz: f64,
        order: usize,
        sample_rate: f64,
    ) -> SignalResult<Box<dyn LowPassFilter>> {
        if !(sample_rate > 0.0) || !(cutoff_hz > 0.0) || order == 0 {
            return Err(SignalError::InvalidWaveform(format!(
                "cannot build low-pass: cutoff={cutoff_hz} order={order} fs={sample_rate}"
            )));
        }

        let nyquist = sample_rate / 2.0;
        let limit = nyquist * self.config.max_nyquist_fraction;
        let cutoff = if cutoff_hz > limit {
            tracing::debug!(cutoff_hz, limit, "low-pass cutoff above Nyquist limit, clamping");
            limit
        } else {
            cutoff_hz
        };

        Ok(Box::new(ButterworthLowPass::new(cutoff, order, sample_rate)))
    }
}

/// Direct-form-I second-order section
#[derive(Debug, Clone)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl Biquad {
    /// Low-pass section with quality factor `q` (RBJ cookbook form,
    /// exact cutoff after bilinear pre-warping).
    fn low_pass(w0: f64, q: f64) -> Self {
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cos_w0) / 2.0 / a0;

        Self {
            b0,
            b1: (1.0 - cos_w0) / a0,
            b2: b0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// First-order low-pass section (b2 = a2 = 0).
    fn first_order(w0: f64) -> Self {
        let k = (w0 / 2.0).tan();
        let b0 = k / (1.0 + k);

        Self {
            b0,
            b1: b0,
            b2: 0.0,
            a1: (k - 1.0) / (k + 1.0),
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Butterworth low-pass of arbitrary order.
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    sections: Vec<Biquad>,
}

impl ButterworthLowPass {
    pub fn new(cutoff_hz: f64, order: usize, sample_rate: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let mut sections = Vec::with_capacity(order / 2 + 1);

        // Conjugate pole pairs: s^2 + 2 sin((2k+1)pi/2n) s + 1
        for k in 0..order / 2 {
            let theta = (2 * k + 1) as f64 * PI / (2 * order) as f64;
            let q = 1.0 / (2.0 * theta.sin());
            sections.push(Biquad::low_pass(w0, q));
        }
        if order % 2 == 1 {
            sections.push(Biquad::first_order(w0));
        }

        Self { sections }
    }

    pub fn order(&self) -> usize {
        self.sections
            .iter()
            .map(|s| if s.a2 == 0.0 && s.b2 == 0.0 { 1 } else { 2 })
            .sum()
    }
}

impl LowPassFilter for ButterworthLowPass {
    fn process(&mut self, x: f64) -> f64 {
        self.sections.iter_mut().fold(x, |acc, s| s.process(acc))
    }

    fn reset(&mut self) {
        for s in &mut self.sections {
            s.reset();
        }
    }
}
