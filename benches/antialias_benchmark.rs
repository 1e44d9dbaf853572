//! Scroll benchmark: Measure anti-alias blending and window extraction.
//!
//! Target: one full pass of blended frames well under the 2ms sub-step
//! pause at top speed

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use superled::scroll::{antialias_step, STEPS};
use superled::{render_text, FrameBuffer, Rgb, ScrollSpeed, Scroller};

fn text_frame() -> FrameBuffer {
    let strip = render_text("W", Rgb::new(255, 128, 0));
    Scroller::new(strip, ScrollSpeed::default(), true).frame_at(8)
}

fn antialias_all_steps(c: &mut Criterion) {
    let original = text_frame();

    c.bench_function("antialias_10_steps", |b| {
        b.iter(|| {
            let mut working = original.clone();
            for step in 0..STEPS {
                antialias_step(&mut working, black_box(&original), step);
            }
            working
        })
    });
}

fn antialias_blank_frame(c: &mut Criterion) {
    let original = FrameBuffer::filled(Rgb::BLACK);
    let mut working = original.clone();

    c.bench_function("antialias_blank", |b| {
        b.iter(|| antialias_step(&mut working, black_box(&original), 0))
    });
}

fn scroll_window(c: &mut Criterion) {
    let scroller = Scroller::new(
        render_text("Hello, world!", Rgb::WHITE),
        ScrollSpeed::default(),
        false,
    );

    c.bench_function("scroll_frame_at", |b| {
        b.iter(|| scroller.frame_at(black_box(37)))
    });
}

fn scroll_full_pass(c: &mut Criterion) {
    let scroller = Scroller::new(render_text("Hi!", Rgb::WHITE), ScrollSpeed::default(), true);

    c.bench_function("scroll_pass_antialiased", |b| {
        b.iter(|| scroller.pass_frames().count())
    });
}

criterion_group!(
    benches,
    antialias_all_steps,
    antialias_blank_frame,
    scroll_window,
    scroll_full_pass,
);
criterion_main!(benches);
