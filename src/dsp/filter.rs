use std::f32::consts::PI;

/// Cutoff bounds enforced by [`SVFilter::set_params`].
pub const CUTOFF_MIN_HZ: f32 = 20.0;
pub const CUTOFF_MAX_HZ: f32 = 20_000.0;
/// Resonance ceiling; the trapezoidal topology stays stable below
/// self-oscillation with this margin.
pub const RESONANCE_MAX: f32 = 0.95;

/// Two-pole state-variable low-pass using trapezoidal (zero-delay feedback)
/// integration. Unconditionally stable over the whole parameter range, which
/// is what lets the engine sweep cutoff freely under modulation.
///
/// `set_params` is cheap enough to call once per sample, and the engine does
/// exactly that so the filter tracks the smoothed cutoff/resonance exactly
/// instead of stair-stepping per block.
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory
    g: f32,
    k: f32,
    a1: f32,
    a2: f32,
    a3: f32,
    sample_rate: f32,
}

impl SVFilter {
    pub fn new(sample_rate: f32) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 2.0,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            sample_rate,
        };
        filter.set_params(1_000.0, 0.0);
        filter
    }

    /// Recompute coefficients. Cutoff is clamped to [20, 20k] Hz and
    /// resonance to [0, 0.95] regardless of what the caller passes.
    pub fn set_params(&mut self, cutoff_hz: f32, resonance: f32) {
        let fc = cutoff_hz.clamp(CUTOFF_MIN_HZ, CUTOFF_MAX_HZ);
        let res = resonance.clamp(0.0, RESONANCE_MAX);
        self.g = (PI * fc / self.sample_rate).tan();
        self.k = 2.0 - 2.0 * res;
        self.a1 = 1.0 / (1.0 + self.g * (self.g + self.k));
        self.a2 = self.g * self.a1;
        self.a3 = self.g * self.a2;
    }

    /// Advance one sample and return the low-pass output.
    pub fn next_sample(&mut self, input: f32) -> f32 {
        let v3 = input - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;
        v2
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
