//! Hybrid object dispatch benchmarks
//!
//! Measures method reads through the function cache and typed call overhead.
//!
//! Run with: cargo bench -p otter-hybrid

use criterion::{Criterion, criterion_group, criterion_main};
use otter_hybrid::prelude::*;
use std::hint::black_box;

struct Point {
    core: HybridCore,
    x: f64,
    y: f64,
}

impl Point {
    fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    fn translate(&self, dx: f64, dy: f64) -> Vec<f64> {
        vec![self.x + dx, self.y + dy]
    }

    fn x(&self) -> f64 {
        self.x
    }
}

impl HybridObject for Point {
    fn hybrid_core(&self) -> &HybridCore {
        &self.core
    }

    fn load_hybrid_methods(&self, reg: &mut Registrar<'_, Self>) -> HybridResult<()> {
        reg.register_method("length", Point::length)?
            .register_method("translate", Point::translate)?
            .register_getter("x", Point::x)?;
        Ok(())
    }
}

fn point() -> std::sync::Arc<Point> {
    make_hybrid(Point {
        core: HybridCore::new("Point"),
        x: 3.0,
        y: 4.0,
    })
}

/// Benchmark: repeated method reads from one runtime (cache hits)
fn bench_method_read(c: &mut Criterion) {
    let rt = Runtime::new(&RuntimeRegistry::new(), "bench");
    let obj = point();
    obj.get(&rt, "length").unwrap();

    c.bench_function("hybrid_method_read_cached", |b| {
        b.iter(|| black_box(obj.get(&rt, black_box("length")).unwrap()))
    });
}

/// Benchmark: getter read, which runs the native body every time
fn bench_getter_read(c: &mut Criterion) {
    let rt = Runtime::new(&RuntimeRegistry::new(), "bench");
    let obj = point();

    c.bench_function("hybrid_getter_read", |b| {
        b.iter(|| black_box(obj.get(&rt, black_box("x")).unwrap()))
    });
}

/// Benchmark: typed call with argument conversion
fn bench_typed_call(c: &mut Criterion) {
    let rt = Runtime::new(&RuntimeRegistry::new(), "bench");
    let obj = point();
    let translate = obj.get(&rt, "translate").unwrap();
    let translate = translate.as_function().unwrap().clone();
    let args = [Value::Number(1.0), Value::Number(2.0)];

    c.bench_function("hybrid_typed_call_2_args", |b| {
        b.iter(|| black_box(translate.call(&rt, &Value::Undefined, black_box(&args)).unwrap()))
    });
}

/// Benchmark: first read from many runtimes (cache misses)
fn bench_runtime_fan_out(c: &mut Criterion) {
    let registry = RuntimeRegistry::new();
    let obj = point();

    c.bench_function("hybrid_method_read_new_runtime", |b| {
        b.iter(|| {
            let rt = Runtime::new(&registry, "worker");
            black_box(obj.get(&rt, "length").unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_method_read,
    bench_getter_read,
    bench_typed_call,
    bench_runtime_fan_out
);
criterion_main!(benches);
