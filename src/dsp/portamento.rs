use crate::dsp::approach_coeff;

/// One-pole pitch glide operating in log2-frequency space, so a glide over
/// an octave takes the same time regardless of register.
///
/// The convergence coefficient is exposed through [`coeff`](Self::coeff)
/// because the voice reuses it to pace waveform morphing: a faster glide
/// also means a faster timbre morph. That coupling is a sound-design
/// decision, not an accident.
pub struct Portamento {
    target: f32,  // log2(freq)
    current: f32, // log2(freq)
    coeff: f32,   // 1.0 = instantaneous
    sample_rate: f32,
}

impl Portamento {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            target: 0.0,
            current: 0.0,
            coeff: 1.0,
            sample_rate,
        }
    }

    /// Glide time in milliseconds; below 1 ms the glide is instantaneous.
    pub fn set_glide_ms(&mut self, ms: f32) {
        self.coeff = if ms < 1.0 {
            1.0
        } else {
            approach_coeff(ms, self.sample_rate)
        };
    }

    /// Start a glide toward `frequency_hz` from wherever we are now.
    pub fn set_target(&mut self, frequency_hz: f32) {
        self.target = frequency_hz.log2();
    }

    /// Jump to `frequency_hz` with no glide.
    pub fn snap(&mut self, frequency_hz: f32) {
        self.target = frequency_hz.log2();
        self.current = self.target;
    }

    /// Per-sample convergence coefficient.
    pub fn coeff(&self) -> f32 {
        self.coeff
    }

    /// Advance one sample and return the current frequency in Hz.
    pub fn next_sample(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current.exp2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44_100.0;

    #[test]
    fn instant_glide_reaches_target_next_tick() {
        let mut porta = Portamento::new(SAMPLE_RATE);
        porta.set_glide_ms(0.0);
        porta.snap(110.0);
        porta.set_target(880.0);
        assert!((porta.next_sample() - 880.0).abs() < 1e-2);
    }

    #[test]
    fn glide_converges_monotonically() {
        let mut porta = Portamento::new(SAMPLE_RATE);
        porta.set_glide_ms(50.0);
        porta.snap(220.0);
        porta.set_target(440.0);

        let mut prev = 220.0f32;
        let mut reached = None;
        // 8 time constants is ample for 0.1% convergence.
        let budget = (8.0 * 0.05 * SAMPLE_RATE) as usize;
        for n in 0..budget {
            let f = porta.next_sample();
            assert!(f >= prev - 1e-3, "glide went backwards at sample {n}");
            prev = f;
            if reached.is_none() && (f - 440.0).abs() / 440.0 < 0.001 {
                reached = Some(n);
            }
        }
        assert!(reached.is_some(), "never reached within 0.1% of target");
    }

    #[test]
    fn snap_does_not_glide() {
        let mut porta = Portamento::new(SAMPLE_RATE);
        porta.set_glide_ms(500.0);
        porta.snap(330.0);
        assert!((porta.next_sample() - 330.0).abs() < 1e-2);
    }

    #[test]
    fn downward_glide_also_converges() {
        let mut porta = Portamento::new(SAMPLE_RATE);
        porta.set_glide_ms(10.0);
        porta.snap(880.0);
        porta.set_target(110.0);
        let mut f = 880.0;
        for _ in 0..(SAMPLE_RATE as usize / 10) {
            f = porta.next_sample();
        }
        assert!((f - 110.0).abs() / 110.0 < 0.001);
    }
}
