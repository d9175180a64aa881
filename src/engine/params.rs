//! Knob curves and control-rate smoothing.
//!
//! The control surface reports raw 10-bit values; these functions map them
//! onto musical ranges. Out-of-range raw values are mapped as given, not
//! rejected; the curves themselves define the contract.

/// Full-scale raw knob value.
pub const KNOB_MAX: f32 = 1023.0;

/// Fixed per-sample smoothing coefficient for the live cutoff, resonance,
/// and volume values. Deliberately independent of the glide-time knob.
pub const SMOOTH_COEFF: f32 = 0.002;

/// K1: glide time, 0–500 ms linear. Also sets the PWM LFO period.
pub fn glide_ms(raw: i32) -> f32 {
    raw as f32 * (500.0 / KNOB_MAX)
}

/// K2: filter cutoff, 20 Hz – 18 kHz exponential.
pub fn cutoff_hz(raw: i32) -> f32 {
    20.0 * 900.0_f32.powf(raw as f32 / KNOB_MAX)
}

/// K3: filter resonance, 0–0.95 linear.
pub fn resonance(raw: i32) -> f32 {
    raw as f32 * (0.95 / KNOB_MAX)
}

/// K4: envelope release, 10–2000 ms exponential.
pub fn release_ms(raw: i32) -> f32 {
    10.0 * 200.0_f32.powf(raw as f32 / KNOB_MAX)
}

/// K5: master volume, 0–1 linear.
pub fn volume(raw: i32) -> f32 {
    raw as f32 / KNOB_MAX
}

/// A control value smoothed toward its target at the fixed rate, one step
/// per audio sample.
#[derive(Debug, Clone, Copy)]
pub struct Smoothed {
    target: f32,
    current: f32,
}

impl Smoothed {
    pub fn new(value: f32) -> Self {
        Self {
            target: value,
            current: value,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Advance one sample and return the live value.
    pub fn step(&mut self) -> f32 {
        self.current += SMOOTH_COEFF * (self.target - self.current);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knob_extremes_match_documented_ranges() {
        assert_eq!(glide_ms(0), 0.0);
        assert!((glide_ms(1023) - 500.0).abs() < 1e-3);

        assert!((cutoff_hz(0) - 20.0).abs() < 1e-3);
        assert!((cutoff_hz(1023) - 18_000.0).abs() < 1.0);

        assert_eq!(resonance(0), 0.0);
        assert!((resonance(1023) - 0.95).abs() < 1e-6);

        assert!((release_ms(0) - 10.0).abs() < 1e-3);
        assert!((release_ms(1023) - 2_000.0).abs() < 1.0);

        assert_eq!(volume(0), 0.0);
        assert!((volume(1023) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cutoff_curve_is_exponential() {
        // Halfway up the knob lands at the geometric midpoint, not the
        // arithmetic one.
        let mid = cutoff_hz(512);
        let geometric = (20.0f32 * 18_000.0).sqrt();
        assert!((mid - geometric).abs() / geometric < 0.02, "got {mid}");
    }

    #[test]
    fn out_of_range_raw_values_map_as_given() {
        assert!(glide_ms(2046) > 999.0);
        assert!(volume(-1023) < 0.0);
    }

    #[test]
    fn smoothed_value_approaches_target() {
        let mut v = Smoothed::new(0.0);
        v.set_target(1.0);
        let mut last = 0.0;
        for _ in 0..5_000 {
            last = v.step();
        }
        assert!(last > 0.99, "got {last}");
        assert_eq!(v.target(), 1.0);
    }
}
