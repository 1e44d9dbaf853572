//! Encoder benchmark: Measure frame serialization for both wire formats.
//!
//! Target: < 2µs per 768-byte frame

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use superled::buffer::{encode_into, zigzag, EncodeFlags, FRAME_BYTES};
use superled::{encode_frame, FrameBuffer, Protocol, Rgb};

/// Create a frame with varied content, zeros included.
fn create_test_frame(seed: u8) -> FrameBuffer {
    let mut frame = FrameBuffer::new();
    for y in 0..16 {
        for x in 0..16 {
            frame.set(
                x,
                y,
                Rgb::new(
                    (x as u8).wrapping_mul(16).wrapping_add(seed),
                    (y as u8).wrapping_mul(16),
                    ((x + y) as u8).wrapping_mul(8) & 0xF0,
                ),
            );
        }
    }
    frame
}

fn encode_protocols(c: &mut Criterion) {
    let frame = create_test_frame(0);
    let mut group = c.benchmark_group("encode_frame");

    for protocol in [Protocol::Serial, Protocol::Socket] {
        let flags = protocol.encode_flags();
        group.bench_with_input(BenchmarkId::from_parameter(format!("{flags:?}")), &flags, |b, &flags| {
            b.iter(|| encode_frame(black_box(&frame), flags));
        });
    }

    group.finish();
}

fn encode_into_reused_buffer(c: &mut Criterion) {
    let frame = create_test_frame(7);
    let mut out = [0u8; FRAME_BYTES];

    c.bench_function("encode_into_socket", |b| {
        b.iter(|| encode_into(black_box(&frame), Protocol::Socket.encode_flags(), &mut out));
    });
}

fn encode_plain(c: &mut Criterion) {
    let frame = create_test_frame(3);

    c.bench_function("encode_no_flags", |b| {
        b.iter(|| encode_frame(black_box(&frame), EncodeFlags::empty()));
    });
}

fn zigzag_in_place(c: &mut Criterion) {
    let mut frame = create_test_frame(9);

    c.bench_function("zigzag_in_place", |b| {
        b.iter(|| zigzag(black_box(&mut frame)));
    });
}

criterion_group!(
    benches,
    encode_protocols,
    encode_into_reused_buffer,
    encode_plain,
    zigzag_in_place,
);
criterion_main!(benches);
