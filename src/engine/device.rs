use std::fmt;

/// A block write that did not complete normally.
///
/// `Underrun` is expected control flow: the consumer ran dry since the last
/// write and the caller gets exactly one [`OutputDevice::recover`] attempt.
/// `Fatal` means the stream is gone and the run must stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    Underrun,
    Fatal,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::Underrun => write!(f, "output underrun"),
            WriteError::Fatal => write!(f, "output stream failed"),
        }
    }
}

/// The render loop's view of the audio output: something that accepts
/// fixed-size interleaved i16 blocks, can report a recoverable underrun
/// distinctly from a fatal fault, and can be drained on shutdown.
pub trait OutputDevice {
    /// Write one interleaved block, blocking until the device accepts it.
    fn write_block(&mut self, block: &[i16]) -> Result<(), WriteError>;

    /// Attempt to recover from an underrun. Errors are fatal.
    fn recover(&mut self) -> Result<(), WriteError>;

    /// Bounded wait for queued audio to play out before shutdown.
    fn drain(&mut self);
}

#[cfg(feature = "rtrb")]
pub use queue::{block_queue, BlockQueue, FaultHandle, QueueConsumer};

#[cfg(feature = "rtrb")]
mod queue {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::{OutputDevice, WriteError};

    /// Sleep granularity while waiting for the consumer; well under one
    /// 128-frame period at 44.1 kHz (~2.9 ms).
    const WAIT_STEP: Duration = Duration::from_micros(250);
    const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

    struct Shared {
        underrun: AtomicBool,
        fatal: AtomicBool,
    }

    /// Clonable handle the stream's error callback uses to mark the queue
    /// dead from another thread.
    #[derive(Clone)]
    pub struct FaultHandle(Arc<Shared>);

    impl FaultHandle {
        pub fn mark_fatal(&self) {
            self.0.fatal.store(true, Ordering::Relaxed);
        }
    }

    /// Producer half of the sample queue between the render loop and the
    /// audio callback. Implements [`OutputDevice`]: writes block until the
    /// callback frees space, an underrun flagged by the consumer surfaces
    /// on the next write, and recovery re-primes the queue with silence.
    pub struct BlockQueue {
        producer: rtrb::Producer<i16>,
        shared: Arc<Shared>,
        capacity: usize,
    }

    /// Consumer half, owned by the audio callback.
    pub struct QueueConsumer {
        consumer: rtrb::Consumer<i16>,
        shared: Arc<Shared>,
    }

    /// Create a connected producer/consumer pair holding up to
    /// `capacity_samples` interleaved samples. The queue starts primed
    /// with silence so the callback has headroom before the first write.
    pub fn block_queue(capacity_samples: usize) -> (BlockQueue, QueueConsumer) {
        let (producer, consumer) = rtrb::RingBuffer::new(capacity_samples);
        let shared = Arc::new(Shared {
            underrun: AtomicBool::new(false),
            fatal: AtomicBool::new(false),
        });
        let mut queue = BlockQueue {
            producer,
            shared: shared.clone(),
            capacity: capacity_samples,
        };
        queue.prime();
        (queue, QueueConsumer { consumer, shared })
    }

    impl BlockQueue {
        fn prime(&mut self) {
            while self.producer.push(0).is_ok() {}
        }
    }

    impl OutputDevice for BlockQueue {
        fn write_block(&mut self, block: &[i16]) -> Result<(), WriteError> {
            if self.shared.fatal.load(Ordering::Relaxed) {
                return Err(WriteError::Fatal);
            }
            if self.shared.underrun.swap(false, Ordering::Relaxed) {
                return Err(WriteError::Underrun);
            }
            for &sample in block {
                loop {
                    if self.shared.fatal.load(Ordering::Relaxed) {
                        return Err(WriteError::Fatal);
                    }
                    match self.producer.push(sample) {
                        Ok(()) => break,
                        Err(rtrb::PushError::Full(_)) => thread::sleep(WAIT_STEP),
                    }
                }
            }
            Ok(())
        }

        fn recover(&mut self) -> Result<(), WriteError> {
            if self.shared.fatal.load(Ordering::Relaxed) {
                return Err(WriteError::Fatal);
            }
            self.shared.underrun.store(false, Ordering::Relaxed);
            self.prime();
            Ok(())
        }

        fn drain(&mut self) {
            let deadline = Instant::now() + DRAIN_TIMEOUT;
            while self.producer.slots() < self.capacity && Instant::now() < deadline {
                if self.shared.fatal.load(Ordering::Relaxed) {
                    return;
                }
                thread::sleep(WAIT_STEP);
            }
        }
    }

    impl QueueConsumer {
        /// Next queued sample, or silence (flagging an underrun) when the
        /// queue is dry. Called from the audio callback.
        pub fn next_sample(&mut self) -> i16 {
            match self.consumer.pop() {
                Ok(sample) => sample,
                Err(_) => {
                    self.shared.underrun.store(true, Ordering::Relaxed);
                    0
                }
            }
        }

        pub fn fault_handle(&self) -> FaultHandle {
            FaultHandle(self.shared.clone())
        }
    }

}
