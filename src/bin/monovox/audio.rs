//! cpal wiring: open the default output device, negotiate the fixed
//! stream shape, and feed the callback from the block-queue consumer.

use std::fmt;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use monovox::engine::device::{block_queue, BlockQueue};
use monovox::engine::FailureClass;
use monovox::{BLOCK_FRAMES, CHANNELS, SAMPLE_RATE};

/// Queue depth in samples: four periods of cushion against scheduling
/// jitter without adding noticeable latency.
const QUEUE_SAMPLES: usize = BLOCK_FRAMES * CHANNELS * 4;

/// Setup failure split by class so the process can exit with the right
/// code: the device itself was missing vs. it refused our stream shape.
#[derive(Debug)]
pub enum AudioError {
    Open(String),
    Config(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Open(msg) => write!(f, "device open: {msg}"),
            AudioError::Config(msg) => write!(f, "device config: {msg}"),
        }
    }
}

impl AudioError {
    pub fn class(&self) -> FailureClass {
        match self {
            AudioError::Open(_) => FailureClass::DeviceOpen,
            AudioError::Config(_) => FailureClass::DeviceConfig,
        }
    }
}

/// A running output stream and the producer half the engine writes into.
pub struct AudioOutput {
    pub queue: BlockQueue,
    _stream: cpal::Stream,
}

pub fn open() -> Result<AudioOutput, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::Open("no default output device".into()))?;
    if let Ok(name) = device.name() {
        log::info!("output device: {name}");
    }

    let config = cpal::StreamConfig {
        channels: CHANNELS as u16,
        sample_rate: cpal::SampleRate(SAMPLE_RATE as u32),
        buffer_size: cpal::BufferSize::Fixed(BLOCK_FRAMES as u32),
    };

    let (queue, mut consumer) = block_queue(QUEUE_SAMPLES);
    let fault = consumer.fault_handle();

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for slot in data.iter_mut() {
                    *slot = consumer.next_sample() as f32 / 32_768.0;
                }
            },
            move |err| {
                log::error!("audio stream error: {err}");
                fault.mark_fatal();
            },
            None,
        )
        .map_err(|err| match err {
            cpal::BuildStreamError::DeviceNotAvailable => AudioError::Open(err.to_string()),
            other => AudioError::Config(other.to_string()),
        })?;

    stream
        .play()
        .map_err(|err| AudioError::Config(err.to_string()))?;

    Ok(AudioOutput {
        queue,
        _stream: stream,
    })
}
