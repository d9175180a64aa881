use crate::dsp::envelope::Envelope;
use crate::dsp::filter::SVFilter;
use crate::dsp::oscillator::{Oscillator, Waveform, NUM_WAVEFORMS};
use crate::dsp::portamento::Portamento;
use crate::synth::{midi_note_to_freq, NoteStack};

/// Morph positions closer than this to a whole index collapse to a single
/// waveform evaluation.
const MORPH_EPS: f32 = 1e-3;

/// The one playable signal path: oscillator → filter → envelope, with a
/// note stack for monophonic legato and a continuous morph position that
/// chases the selected waveform.
///
/// Legato rules: a note played while another is held glides to the new
/// pitch without retriggering the envelope; releasing back to a still-held
/// note glides likewise. Only the first note of a phrase snaps pitch and
/// fires the attack, and only releasing the last note starts the release.
pub struct Voice {
    stack: NoteStack,
    osc: Oscillator,
    porta: Portamento,
    filter: SVFilter,
    env: Envelope,
    gate: bool,
    target_waveform: usize,
    morph: f32,
}

impl Voice {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            stack: NoteStack::new(),
            osc: Oscillator::new(sample_rate),
            porta: Portamento::new(sample_rate),
            filter: SVFilter::new(sample_rate),
            env: Envelope::new(sample_rate),
            gate: false,
            target_waveform: 0,
            morph: 0.0,
        }
    }

    pub fn note_on(&mut self, note: u8) {
        let legato = self.gate;
        self.stack.push(note);
        let freq = midi_note_to_freq(note);
        if legato {
            self.porta.set_target(freq);
        } else {
            self.porta.snap(freq);
            self.env.gate(true);
        }
        self.gate = true;
    }

    pub fn note_off(&mut self, note: u8) {
        self.stack.remove(note);
        match self.stack.top() {
            None => {
                self.env.gate(false);
                self.gate = false;
            }
            // Fall back to the previous held note, gliding.
            Some(top) => self.porta.set_target(midi_note_to_freq(top)),
        }
    }

    /// Advance the target waveform index (wrapping) and return the new
    /// waveform so the caller can update the status indicator.
    pub fn cycle_waveform(&mut self) -> Waveform {
        self.target_waveform = (self.target_waveform + 1) % NUM_WAVEFORMS;
        Waveform::from_index(self.target_waveform)
    }

    /// Glide time in ms; also paces the waveform morph (same coefficient).
    pub fn set_glide_ms(&mut self, ms: f32) {
        self.porta.set_glide_ms(ms);
    }

    pub fn set_release_ms(&mut self, ms: f32) {
        self.env.set_release_ms(ms);
    }

    pub fn set_pulse_width(&mut self, pulse_width: f32) {
        self.osc.set_pulse_width(pulse_width);
    }

    pub fn set_filter_params(&mut self, cutoff_hz: f32, resonance: f32) {
        self.filter.set_params(cutoff_hz, resonance);
    }

    /// Render one sample: glide pitch, advance phase, morph-crossfade the
    /// oscillator, filter, then scale by the envelope.
    pub fn next_sample(&mut self) -> f32 {
        self.osc.set_frequency(self.porta.next_sample());
        self.osc.advance();

        // The morph chases the target at the portamento rate.
        let target = self.target_waveform as f32;
        self.morph += self.porta.coeff() * (target - self.morph);
        if (self.morph - target).abs() < MORPH_EPS {
            self.morph = target;
        }

        let lo = self.morph.floor();
        let frac = self.morph - lo;
        let lo_idx = (lo as i32).rem_euclid(NUM_WAVEFORMS as i32) as usize;
        let s = if frac < MORPH_EPS {
            self.osc.sample(Waveform::from_index(lo_idx))
        } else {
            let a = self.osc.sample(Waveform::from_index(lo_idx));
            let b = self.osc.sample(Waveform::from_index(lo_idx + 1));
            a * (1.0 - frac) + b * frac
        };

        self.filter.next_sample(s) * self.env.next_sample()
    }

    pub fn is_gated(&self) -> bool {
        self.gate
    }

    pub fn held_notes(&self) -> usize {
        self.stack.len()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.env
    }

    /// Waveform pair for the status display: the settled (or nearest-below)
    /// waveform, and the one being morphed toward when a morph is underway.
    pub fn morph_waveforms(&self) -> (Waveform, Option<Waveform>) {
        let lo = self.morph.floor();
        let frac = self.morph - lo;
        let lo_idx = (lo as i32).rem_euclid(NUM_WAVEFORMS as i32) as usize;
        let from = Waveform::from_index(lo_idx);
        if frac > MORPH_EPS {
            (from, Some(Waveform::from_index(lo_idx + 1)))
        } else {
            (from, None)
        }
    }

    #[cfg(test)]
    fn porta(&mut self) -> &mut Portamento {
        &mut self.porta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::EnvelopeStage;

    const SAMPLE_RATE: f32 = 44_100.0;

    #[test]
    fn first_note_snaps_pitch_and_triggers_attack() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.set_glide_ms(500.0);
        voice.note_on(64);
        assert!(voice.is_gated());
        assert_eq!(voice.envelope().stage(), EnvelopeStage::Attack);
        // Pitch arrives immediately despite the long glide setting.
        let freq = voice.porta().next_sample();
        assert!((freq - 329.63).abs() < 0.01, "got {freq}");
    }

    #[test]
    fn legato_glides_without_retrigger() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.set_glide_ms(100.0);
        voice.note_on(60);
        for _ in 0..2_000 {
            voice.next_sample();
        }
        let level_before = voice.envelope().value();

        voice.note_on(72); // second key while the first is held
        let s = voice.next_sample();
        assert!(s.is_finite());
        // Envelope did not restart from zero.
        assert!(voice.envelope().value() >= level_before - 1e-3);
        // Pitch is still near the old note, heading for the new one.
        let freq = voice.porta().next_sample();
        assert!(freq > midi_note_to_freq(60) && freq < midi_note_to_freq(72));
    }

    #[test]
    fn releasing_last_note_starts_release_and_clears_gate() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.note_on(64);
        for _ in 0..100 {
            voice.next_sample();
        }
        voice.note_off(64);
        assert!(!voice.is_gated());
        assert_eq!(voice.envelope().stage(), EnvelopeStage::Release);
        assert_eq!(voice.held_notes(), 0);
    }

    #[test]
    fn releasing_top_note_falls_back_to_previous() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.set_glide_ms(0.0);
        voice.note_on(60);
        voice.note_on(67);
        voice.note_off(67);
        assert!(voice.is_gated());
        assert_eq!(voice.envelope().stage(), EnvelopeStage::Attack);
        let freq = voice.porta().next_sample();
        assert!((freq - midi_note_to_freq(60)).abs() < 0.01);
    }

    #[test]
    fn waveform_cycle_wraps_after_four_steps() {
        let mut voice = Voice::new(SAMPLE_RATE);
        let start = voice.morph_waveforms().0;
        let mut last = start;
        for _ in 0..NUM_WAVEFORMS {
            last = voice.cycle_waveform();
        }
        assert_eq!(last, start);
    }

    #[test]
    fn morph_settles_on_target_waveform() {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.set_glide_ms(5.0);
        voice.note_on(69);
        let target = voice.cycle_waveform();
        for _ in 0..(SAMPLE_RATE as usize / 10) {
            voice.next_sample();
        }
        let (settled, morphing_to) = voice.morph_waveforms();
        assert_eq!(settled, target);
        assert_eq!(morphing_to, None);
    }

    #[test]
    fn instant_glide_completes_morph_in_one_sample() {
        // Glide 0 means coefficient 1.0: the morph completes in one sample.
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.set_glide_ms(0.0);
        voice.note_on(69);
        voice.cycle_waveform();
        voice.next_sample();
        let (settled, morphing_to) = voice.morph_waveforms();
        assert_eq!(settled, Waveform::Pulse);
        assert_eq!(morphing_to, None);
    }

    #[test]
    fn silent_when_idle() {
        let mut voice = Voice::new(SAMPLE_RATE);
        for _ in 0..64 {
            assert_eq!(voice.next_sample(), 0.0);
        }
    }
}
