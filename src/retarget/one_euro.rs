//! One Euro filter: adaptive low-pass filtering for landmark jitter.
//!
//! Smooth when slow (less jitter), responsive when fast (less lag). The cutoff
//! frequency rises with the filtered speed of the signal.

use std::f32::consts::PI;

use crate::config::FilterConfig;
use crate::tracking::Landmark;

/// Filter parameters shared by every instance in a bank
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneEuroParams {
    /// Minimum cutoff frequency (Hz)
    pub min_cutoff: f32,
    /// Speed coefficient
    pub beta: f32,
    /// Derivative cutoff frequency (Hz)
    pub d_cutoff: f32,
}

impl From<&FilterConfig> for OneEuroParams {
    fn from(config: &FilterConfig) -> Self {
        Self {
            min_cutoff: config.min_cutoff,
            beta: config.beta,
            d_cutoff: config.d_cutoff,
        }
    }
}

impl Default for OneEuroParams {
    fn default() -> Self {
        Self::from(&FilterConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct FilterMemory {
    x_prev: f32,
    dx_prev: f32,
    t_prev: f64,
}

/// Adaptive low-pass filter for one scalar
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    params: OneEuroParams,
    memory: Option<FilterMemory>,
}

/// alpha = r / (r + 1), r = 2π·cutoff·Te
fn smoothing_factor(t_e: f32, cutoff: f32) -> f32 {
    let r = 2.0 * PI * cutoff * t_e;
    r / (r + 1.0)
}

impl OneEuroFilter {
    pub fn new(params: OneEuroParams) -> Self {
        Self {
            params,
            memory: None,
        }
    }

    /// Filter `x` observed at time `t` (seconds).
    ///
    /// The first call returns `x` unchanged. A timestamp at or before the
    /// previous one returns the previous output and leaves state untouched.
    pub fn filter(&mut self, x: f32, t: f64) -> f32 {
        let mem = match self.memory {
            Some(mem) => mem,
            None => {
                self.memory = Some(FilterMemory {
                    x_prev: x,
                    dx_prev: 0.0,
                    t_prev: t,
                });
                return x;
            }
        };

        let t_e = (t - mem.t_prev) as f32;
        if !(t_e > 0.0) {
            return mem.x_prev;
        }

        // Derivative estimate
        let a_d = smoothing_factor(t_e, self.params.d_cutoff);
        let dx = (x - mem.x_prev) / t_e;
        let dx_hat = a_d * dx + (1.0 - a_d) * mem.dx_prev;

        // Adaptive cutoff
        let cutoff = self.params.min_cutoff + self.params.beta * dx_hat.abs();
        let a = smoothing_factor(t_e, cutoff);

        let x_hat = a * x + (1.0 - a) * mem.x_prev;

        self.memory = Some(FilterMemory {
            x_prev: x_hat,
            dx_prev: dx_hat,
            t_prev: t,
        });

        x_hat
    }

    /// Last filtered value, if any.
    pub fn last(&self) -> Option<f32> {
        self.memory.map(|m| m.x_prev)
    }

    pub fn reset(&mut self) {
        self.memory = None;
    }
}

/// Three independent scalar filters for a 3D landmark. Visibility passes
/// through unfiltered.
#[derive(Debug, Clone)]
pub struct PointFilter {
    axes: [OneEuroFilter; 3],
}

impl PointFilter {
    pub fn new(params: OneEuroParams) -> Self {
        Self {
            axes: std::array::from_fn(|_| OneEuroFilter::new(params)),
        }
    }

    pub fn filter(&mut self, landmark: &Landmark, t: f64) -> Landmark {
        Landmark {
            x: self.axes[0].filter(landmark.x, t),
            y: self.axes[1].filter(landmark.y, t),
            z: self.axes[2].filter(landmark.z, t),
            visibility: landmark.visibility,
        }
    }

    pub fn reset(&mut self) {
        for axis in &mut self.axes {
            axis.reset();
        }
    }
}

/// One point filter per tracked-point identity, sized once up front.
#[derive(Debug, Clone)]
pub struct FilterBank {
    filters: Vec<PointFilter>,
}

impl FilterBank {
    pub fn new(count: usize, params: OneEuroParams) -> Self {
        Self {
            filters: vec![PointFilter::new(params); count],
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Filter the landmark with identity `index`. Identities outside the bank
    /// pass through unfiltered.
    pub fn filter(&mut self, index: usize, landmark: &Landmark, t: f64) -> Landmark {
        match self.filters.get_mut(index) {
            Some(filter) => filter.filter(landmark, t),
            None => *landmark,
        }
    }

    /// Filter a whole landmark set in identity order.
    pub fn filter_all(&mut self, landmarks: &[Landmark], t: f64) -> Vec<Landmark> {
        landmarks
            .iter()
            .enumerate()
            .map(|(i, lm)| self.filter(i, lm, t))
            .collect()
    }

    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> OneEuroParams {
        OneEuroParams {
            min_cutoff: 1.0,
            beta: 0.5,
            d_cutoff: 1.0,
        }
    }

    #[test]
    fn test_first_call_returns_input_exactly() {
        let mut f = OneEuroFilter::new(params());
        assert_eq!(f.filter(0.123_456, 10.0), 0.123_456);
    }

    #[test]
    fn test_constant_input_converges_without_overshoot() {
        for min_cutoff in [0.05f32, 0.5, 1.0, 5.0] {
            let mut f = OneEuroFilter::new(OneEuroParams {
                min_cutoff,
                ..params()
            });
            f.filter(0.0, 0.0);

            let mut prev = 0.0f32;
            let mut t = 0.0f64;
            for _ in 0..2000 {
                t += 1.0 / 30.0;
                let y = f.filter(1.0, t);
                assert!(y <= 1.0, "overshoot at cutoff {min_cutoff}: {y}");
                assert!(y >= prev, "non-monotonic approach at cutoff {min_cutoff}");
                prev = y;
            }
            assert!((1.0 - prev).abs() < 1e-3, "cutoff {min_cutoff} ended at {prev}");
        }
    }

    #[test]
    fn test_non_increasing_timestamp_returns_previous_output() {
        let mut f = OneEuroFilter::new(params());
        f.filter(0.0, 1.0);
        let y = f.filter(1.0, 1.1);

        // Duplicate and out-of-order timestamps are absorbed
        assert_eq!(f.filter(5.0, 1.1), y);
        assert_eq!(f.filter(-5.0, 0.9), y);
        assert_eq!(f.last(), Some(y));

        // Normal operation resumes afterwards
        let z = f.filter(1.0, 1.2);
        assert!(z > y);
    }

    #[test]
    fn test_fast_motion_lags_less() {
        // Higher beta raises the cutoff with speed, so a step is tracked faster
        let mut slow = OneEuroFilter::new(OneEuroParams { beta: 0.0, ..params() });
        let mut fast = OneEuroFilter::new(OneEuroParams { beta: 5.0, ..params() });
        slow.filter(0.0, 0.0);
        fast.filter(0.0, 0.0);

        let a = slow.filter(1.0, 0.033);
        let b = fast.filter(1.0, 0.033);
        assert!(b > a);
    }

    #[test]
    fn test_reset_reinitializes() {
        let mut f = OneEuroFilter::new(params());
        f.filter(0.0, 0.0);
        f.filter(1.0, 0.1);
        f.reset();
        assert_eq!(f.last(), None);
        assert_eq!(f.filter(7.0, 0.0), 7.0);
    }

    #[test]
    fn test_point_filter_passes_visibility() {
        let mut f = PointFilter::new(params());
        let lm = Landmark::new(0.1, 0.2, 0.3).with_visibility(0.7);
        let out = f.filter(&lm, 0.0);
        assert_eq!(out, lm);

        let moved = Landmark::new(0.5, 0.2, 0.3).with_visibility(0.2);
        let out = f.filter(&moved, 0.1);
        assert_eq!(out.visibility, Some(0.2));
        assert!(out.x > 0.1 && out.x < 0.5);
        assert_eq!(out.y, 0.2);
    }

    #[test]
    fn test_bank_keeps_identities_separate() {
        let mut bank = FilterBank::new(2, params());
        assert_eq!(bank.len(), 2);

        bank.filter(0, &Landmark::new(0.0, 0.0, 0.0), 0.0);
        bank.filter(1, &Landmark::new(10.0, 0.0, 0.0), 0.0);

        let a = bank.filter(0, &Landmark::new(0.0, 0.0, 0.0), 0.1);
        let b = bank.filter(1, &Landmark::new(10.0, 0.0, 0.0), 0.1);
        assert_eq!(a.x, 0.0);
        assert_eq!(b.x, 10.0);
    }

    #[test]
    fn test_bank_out_of_range_passes_through() {
        let mut bank = FilterBank::new(1, params());
        let lm = Landmark::new(3.0, 2.0, 1.0);
        assert_eq!(bank.filter(5, &lm, 0.0), lm);
    }

    #[test]
    fn test_bank_filter_all_and_reset() {
        let mut bank = FilterBank::new(3, params());
        let first = vec![Landmark::new(0.0, 0.0, 0.0); 3];
        bank.filter_all(&first, 0.0);

        let second = vec![Landmark::new(1.0, 1.0, 1.0); 3];
        let out = bank.filter_all(&second, 0.05);
        assert!(out.iter().all(|lm| lm.x < 1.0));

        bank.reset();
        let out = bank.filter_all(&second, 0.1);
        assert!(out.iter().all(|lm| lm.x == 1.0));
    }
}
