//! Benchmarks for the monovox signal path.
//!
//! Run with: cargo bench
//!
//! The render loop has a hard deadline of ~2.9 ms per 128-frame block at
//! 44.1 kHz; these benchmarks confirm the primitives and the full voice
//! stay far inside it.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use monovox::dsp::envelope::Envelope;
use monovox::dsp::filter::SVFilter;
use monovox::dsp::oscillator::{Oscillator, Waveform};
use monovox::synth::Voice;
use monovox::SAMPLE_RATE;

/// Common block sizes used in audio applications.
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        for waveform in [
            Waveform::Saw,
            Waveform::Pulse,
            Waveform::Triangle,
            Waveform::Sine,
        ] {
            let mut osc = Oscillator::new(SAMPLE_RATE);
            osc.set_frequency(440.0);
            group.bench_with_input(
                BenchmarkId::new(waveform.name(), size),
                &size,
                |b, &size| {
                    b.iter(|| {
                        let mut acc = 0.0f32;
                        for _ in 0..size {
                            osc.advance();
                            acc += osc.sample(black_box(waveform));
                        }
                        black_box(acc)
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Coefficients recomputed every sample, as the engine does.
        let mut filter = SVFilter::new(SAMPLE_RATE);
        group.bench_with_input(
            BenchmarkId::new("per_sample_params", size),
            &size,
            |b, &size| {
                b.iter(|| {
                    let mut acc = 0.0f32;
                    for n in 0..size {
                        filter.set_params(black_box(1_000.0 + n as f32), 0.5);
                        acc += filter.next_sample(black_box(0.25));
                    }
                    black_box(acc)
                })
            },
        );
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut env = Envelope::new(SAMPLE_RATE);
        env.gate(true);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, &size| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for _ in 0..size {
                    acc += env.next_sample();
                }
                black_box(acc)
            })
        });
    }

    group.finish();
}

fn bench_voice(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/voice");

    for &size in BLOCK_SIZES {
        let mut voice = Voice::new(SAMPLE_RATE);
        voice.note_on(57);
        voice.set_glide_ms(50.0);
        voice.note_on(69); // keep the glide and morph paths warm
        voice.cycle_waveform();
        group.bench_with_input(BenchmarkId::new("full_path", size), &size, |b, &size| {
            b.iter(|| {
                let mut acc = 0.0f32;
                for _ in 0..size {
                    voice.set_filter_params(black_box(4_000.0), 0.4);
                    voice.set_pulse_width(0.5);
                    acc += voice.next_sample();
                }
                black_box(acc)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_oscillator, bench_filter, bench_envelope, bench_voice);
criterion_main!(benches);
