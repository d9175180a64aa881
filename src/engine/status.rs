use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use crate::dsp::Waveform;
use crate::osc::encoder;

/// Display geometry: the peak meter bar sits along the bottom of the
/// 128x64 screen.
const METER_X: i32 = 3;
const METER_Y_TOP: i32 = 55;
const METER_Y_BOTTOM: i32 = 62;
const METER_MAX_WIDTH: i32 = 122;

/// The display collaborator as the engine sees it: named text lines, a
/// scalar indicator, and rectangle drawing. Sends are fire-and-forget.
pub trait StatusSink {
    fn set_line(&mut self, line: u8, text: &str);
    fn set_led(&mut self, color: i32);
    fn draw_box(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, fill: bool);
}

/// Datagram sink speaking the display protocol over loopback UDP.
pub struct UdpDisplay {
    socket: UdpSocket,
    addr: SocketAddr,
}

impl UdpDisplay {
    pub fn connect(port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        Ok(Self {
            socket,
            addr: (Ipv4Addr::LOCALHOST, port).into(),
        })
    }

    fn send(&self, datagram: &[u8]) {
        // Status traffic is best effort; a missing display must never
        // stall the render loop.
        let _ = self.socket.send_to(datagram, self.addr);
    }
}

impl StatusSink for UdpDisplay {
    fn set_line(&mut self, line: u8, text: &str) {
        let address = format!("/oled/line/{line}");
        self.send(&encoder::string_message(&address, text));
    }

    fn set_led(&mut self, color: i32) {
        self.send(&encoder::int_message("/led", color));
    }

    fn draw_box(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, fill: bool) {
        self.send(&encoder::ints_message(
            "/oled/gBox",
            &[x1, y1, x2, y2, fill as i32],
        ));
    }
}

/// Everything one status tick shows.
pub struct Status {
    pub glide_ms: f32,
    pub cutoff_hz: f32,
    pub resonance: f32,
    pub release_ms: f32,
    pub waveform: Waveform,
    pub morphing_to: Option<Waveform>,
    pub peak: f32,
}

/// Renders [`Status`] into display lines and suppresses sends whose value
/// has not changed since the previous tick, keeping the display link quiet
/// while the panel is idle.
pub struct StatusReporter {
    lines: [String; 5],
    meter_width: i32,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self {
            lines: Default::default(),
            meter_width: -1,
        }
    }

    pub fn report(&mut self, sink: &mut dyn StatusSink, status: &Status) {
        let glide = format!("Porto: {}ms", status.glide_ms as i32);
        self.set_if_changed(sink, 0, glide);

        let cutoff = if status.cutoff_hz >= 1000.0 {
            format!("Cutoff: {:.1}kHz", status.cutoff_hz / 1000.0)
        } else {
            format!("Cutoff: {}Hz", status.cutoff_hz as i32)
        };
        self.set_if_changed(sink, 1, cutoff);

        self.set_if_changed(sink, 2, format!("Reso: {:.2}", status.resonance));

        let release = if status.release_ms >= 1000.0 {
            format!("Release: {:.1}s", status.release_ms / 1000.0)
        } else {
            format!("Release: {}ms", status.release_ms as i32)
        };
        self.set_if_changed(sink, 3, release);

        let wave = match status.morphing_to {
            Some(to) => format!("{} > {}", status.waveform.name(), to.name()),
            None => status.waveform.name().to_string(),
        };
        self.set_if_changed(sink, 4, wave);

        let width = ((status.peak * METER_MAX_WIDTH as f32) as i32).min(METER_MAX_WIDTH);
        if width != self.meter_width {
            sink.draw_box(
                METER_X,
                METER_Y_TOP,
                METER_X + METER_MAX_WIDTH,
                METER_Y_BOTTOM,
                false,
            );
            if width > 0 {
                sink.draw_box(METER_X, METER_Y_TOP, METER_X + width, METER_Y_BOTTOM, true);
            }
            self.meter_width = width;
        }
    }

    fn set_if_changed(&mut self, sink: &mut dyn StatusSink, index: usize, text: String) {
        if self.lines[index] != text {
            sink.set_line(index as u8 + 1, &text);
            self.lines[index] = text;
        }
    }
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new()
    }
}
