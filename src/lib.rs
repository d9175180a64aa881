pub mod dsp;
pub mod engine; // Per-block render loop, device and display seams
pub mod osc; // Control/display datagram codecs
pub mod synth; // Note handling and the monophonic voice

/// Engine sample rate in Hz. The whole signal path is tuned to this.
pub const SAMPLE_RATE: f32 = 44_100.0;
/// Frames rendered per block.
pub const BLOCK_FRAMES: usize = 128;
/// Interleaved output channels.
pub const CHANNELS: usize = 2;

/// UDP port the control socket listens on.
pub const CONTROL_PORT: u16 = 4000;
/// UDP port of the display collaborator.
pub const DISPLAY_PORT: u16 = 4001;
