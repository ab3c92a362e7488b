use criterion::{criterion_group, criterion_main, Criterion};
use glprobe_core::{gl, GraphicsContext};
use glprobe_infra::HeadlessContext;
use glprobe_telemetry::{InstrumentedContext, WrapOptions};
use std::hint::black_box;

fn headless() -> HeadlessContext {
    let ctx = HeadlessContext::webgl2();
    // Keep the call log from growing across iterations.
    ctx.set_recording(false);
    ctx
}

fn bench_draw_interception(c: &mut Criterion) {
    let raw = headless();
    let wrapped = InstrumentedContext::new(headless(), false);
    wrapped.wrap(WrapOptions::all());
    let unwrapped = InstrumentedContext::new(headless(), false);

    let mut group = c.benchmark_group("Draw Interception");

    group.bench_function("Raw context", |b| {
        b.iter(|| raw.draw_arrays(black_box(gl::TRIANGLES), 0, black_box(36)));
    });

    group.bench_function("Instrumented (counting)", |b| {
        b.iter(|| wrapped.draw_arrays(black_box(gl::TRIANGLES), 0, black_box(36)));
    });

    group.bench_function("Instrumented (off)", |b| {
        b.iter(|| unwrapped.draw_arrays(black_box(gl::TRIANGLES), 0, black_box(36)));
    });

    group.finish();
}

fn bench_resource_churn(c: &mut Criterion) {
    let ctx = InstrumentedContext::new(headless(), false);

    c.bench_function("Texture create/delete", |b| {
        b.iter(|| {
            let texture = ctx.create_texture();
            ctx.delete_texture(black_box(texture));
        });
    });
}

criterion_group!(benches, bench_draw_interception, bench_resource_churn);
criterion_main!(benches);
