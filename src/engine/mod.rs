//! The per-block real-time loop and its seams.
//!
//! Each block: drain every pending control datagram, render 128 frames with
//! per-sample parameter smoothing, write the block to the output device
//! (recovering once from an underrun), and push a status update to the
//! display collaborator roughly every 50 ms. Everything runs on one thread;
//! the only data shared with the outside is the termination flag.

pub mod device;
pub mod params;
pub mod status;

use std::fmt;
use std::io;
use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::dsp::lfo::TriangleLfo;
use crate::dsp::Waveform;
use crate::osc::{self, Command};
use crate::synth::Voice;
use crate::{BLOCK_FRAMES, CHANNELS, SAMPLE_RATE};

use self::device::{OutputDevice, WriteError};
use self::params::Smoothed;
use self::status::{Status, StatusReporter, StatusSink};

/// Samples between status updates, ~50 ms of audio.
const STATUS_INTERVAL: usize = 2205;
/// Multiplicative peak decay applied after every status tick, giving the
/// meter its falling-peak behavior.
const PEAK_DECAY: f32 = 0.95;

const BLOCK_SAMPLES: usize = BLOCK_FRAMES * CHANNELS;

/// Process failure classes, each with its own exit code so the wrapper
/// scripts can tell what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    ControlSocket,
    DeviceOpen,
    DeviceConfig,
    OutputFatal,
}

impl FailureClass {
    pub fn exit_code(self) -> i32 {
        match self {
            FailureClass::ControlSocket => 2,
            FailureClass::DeviceOpen => 3,
            FailureClass::DeviceConfig => 4,
            FailureClass::OutputFatal => 5,
        }
    }
}

/// Non-blocking source of control datagrams.
pub trait ControlSource {
    /// Copy the next pending datagram into `buf` and return its length,
    /// or `None` when nothing is waiting. Must never block.
    fn poll(&mut self, buf: &mut [u8]) -> Option<usize>;
}

/// Control socket: connectionless datagram listener on a fixed port.
pub struct UdpControl {
    socket: UdpSocket,
}

impl UdpControl {
    pub fn bind(port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket })
    }
}

impl ControlSource for UdpControl {
    fn poll(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.socket.recv(buf) {
            Ok(len) => Some(len),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => None,
            Err(err) => {
                log::debug!("control socket recv error: {err}");
                None
            }
        }
    }
}

/// Bounded resource acquisition: up to 10 attempts with a fixed delay,
/// each retry reported to the display and the log. The final attempt's
/// error is returned to the caller for classification.
pub fn with_retries<T, E: fmt::Display>(
    what: &str,
    delay: Duration,
    sink: &mut dyn StatusSink,
    mut attempt: impl FnMut() -> Result<T, E>,
) -> Result<T, E> {
    const MAX_ATTEMPTS: u32 = 10;
    for n in 1..MAX_ATTEMPTS {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) => {
                log::warn!("{what}: attempt {n}/{MAX_ATTEMPTS} failed: {err}");
                sink.set_line(2, &format!("{what} retry {n}/{MAX_ATTEMPTS}"));
                thread::sleep(delay);
            }
        }
    }
    attempt()
}

/// The synthesizer proper: one voice, the modulation LFO, smoothed control
/// targets, and the per-block loop state.
pub struct Engine {
    voice: Voice,
    lfo: TriangleLfo,
    cutoff: Smoothed,
    resonance: Smoothed,
    volume: Smoothed,
    glide_ms: f32,
    release_ms: f32,
    peak: f32,
    samples_since_status: usize,
    reporter: StatusReporter,
    running: Arc<AtomicBool>,
    block: [i16; BLOCK_SAMPLES],
}

impl Engine {
    pub fn new(running: Arc<AtomicBool>) -> Self {
        Self {
            voice: Voice::new(SAMPLE_RATE),
            lfo: TriangleLfo::new(SAMPLE_RATE),
            cutoff: Smoothed::new(8_000.0),
            resonance: Smoothed::new(0.0),
            volume: Smoothed::new(0.5),
            glide_ms: 0.0,
            release_ms: crate::dsp::envelope::DEFAULT_RELEASE_MS,
            peak: 0.0,
            // Trigger a status push on the very first block.
            samples_since_status: STATUS_INTERVAL,
            reporter: StatusReporter::new(),
            running,
            block: [0; BLOCK_SAMPLES],
        }
    }

    /// Waveform currently selected (or settled on), for the startup LED.
    pub fn waveform(&self) -> Waveform {
        self.voice.morph_waveforms().0
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    /// Apply one decoded control command. Called between blocks only, so
    /// every effect lands on the next rendered sample.
    fn apply(&mut self, command: Command, sink: &mut dyn StatusSink) {
        match command {
            Command::Key { index, velocity } => {
                if (1..=24).contains(&index) {
                    let note = (index + 59) as u8;
                    if velocity > 0 {
                        self.voice.note_on(note);
                    } else {
                        self.voice.note_off(note);
                    }
                } else if index == 0 && velocity > 0 {
                    let wave = self.voice.cycle_waveform();
                    sink.set_led(wave.color());
                }
            }
            Command::Knobs { values } => {
                let [k1, k2, k3, k4, k5] = values;
                // One knob, three consumers: glide time also paces the PWM
                // LFO and (through the portamento coefficient) the morph.
                let glide = params::glide_ms(k1);
                self.voice.set_glide_ms(glide);
                self.lfo.set_period_ms(glide);
                self.glide_ms = glide;

                self.cutoff.set_target(params::cutoff_hz(k2));
                self.resonance.set_target(params::resonance(k3));

                let release = params::release_ms(k4);
                self.voice.set_release_ms(release);
                self.release_ms = release;

                self.volume.set_target(params::volume(k5));
            }
            Command::Aux { value } => {
                if value > 0 {
                    let wave = self.voice.cycle_waveform();
                    sink.set_led(wave.color());
                }
            }
            Command::Quit => {
                log::info!("quit requested over control socket");
                self.running.store(false, Ordering::Relaxed);
            }
        }
    }

    /// Render one block into the interleaved buffer, tracking the peak.
    fn render_block(&mut self) {
        for frame in 0..BLOCK_FRAMES {
            let cutoff = self.cutoff.step();
            let resonance = self.resonance.step();
            let volume = self.volume.step();

            self.voice
                .set_pulse_width(0.5 + 0.4 * self.lfo.next_sample());
            self.voice.set_filter_params(cutoff, resonance);

            let s = (self.voice.next_sample() * volume).clamp(-1.0, 1.0);
            self.peak = self.peak.max(s.abs());

            let sample = (s * 32767.0) as i16;
            self.block[frame * CHANNELS] = sample;
            self.block[frame * CHANNELS + 1] = sample;
        }
    }

    fn status_tick(&mut self, sink: &mut dyn StatusSink) {
        self.samples_since_status += BLOCK_FRAMES;
        if self.samples_since_status < STATUS_INTERVAL {
            return;
        }
        self.samples_since_status -= STATUS_INTERVAL;

        let (waveform, morphing_to) = self.voice.morph_waveforms();
        let status = Status {
            glide_ms: self.glide_ms,
            cutoff_hz: self.cutoff.target(),
            resonance: self.resonance.target(),
            release_ms: self.release_ms,
            waveform,
            morphing_to,
            peak: self.peak,
        };
        self.reporter.report(sink, &status);
        self.peak *= PEAK_DECAY;
    }

    /// Run until the termination flag drops or the output dies. Control
    /// datagrams received before a block affect that block; an underrun
    /// gets one recovery attempt, a second failure aborts the run.
    pub fn run(
        &mut self,
        control: &mut dyn ControlSource,
        device: &mut dyn OutputDevice,
        sink: &mut dyn StatusSink,
    ) -> Result<(), FailureClass> {
        let mut buf = [0u8; osc::MAX_DATAGRAM];
        while self.running.load(Ordering::Relaxed) {
            while let Some(len) = control.poll(&mut buf) {
                if let Some(command) = osc::decode(&buf[..len]) {
                    self.apply(command, sink);
                }
            }

            self.render_block();

            if let Err(err) = device.write_block(&self.block) {
                let recovered = err == WriteError::Underrun && device.recover().is_ok();
                if recovered {
                    log::warn!("output underrun, recovered");
                } else {
                    log::error!("output error: {err}");
                    sink.set_line(2, "audio write ERR");
                    return Err(FailureClass::OutputFatal);
                }
            }

            self.status_tick(sink);
        }

        device.drain();
        Ok(())
    }
}
