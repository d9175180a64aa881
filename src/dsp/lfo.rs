/// Triangle LFO with its rate given as a period in milliseconds.
///
/// A period under 1 ms disables the LFO entirely (constant 0 output). The
/// engine feeds it the same value as the glide time, so one knob sets both
/// the pitch glide and the pulse-width wobble rate.
pub struct TriangleLfo {
    phase: f32,
    frequency_hz: f32,
    sample_rate: f32,
}

impl TriangleLfo {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            frequency_hz: 0.0,
            sample_rate,
        }
    }

    pub fn set_period_ms(&mut self, ms: f32) {
        self.frequency_hz = if ms < 1.0 { 0.0 } else { 1000.0 / ms };
    }

    /// Bipolar output in [-1, 1]; 0 while disabled.
    pub fn next_sample(&mut self) -> f32 {
        if self.frequency_hz <= 0.0 {
            return 0.0;
        }
        self.phase += self.frequency_hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        if self.phase < 0.5 {
            4.0 * self.phase - 1.0
        } else {
            3.0 - 4.0 * self.phase
        }
    }
}
