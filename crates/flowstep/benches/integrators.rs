//! Integrator benchmarks
//!
//! - Throughput of a full PECE step across population sizes and backends
//! - Cost of the predicate-filtered path against the all-active fast path
//! - Accuracy of every registered method on y' = -y, reported as a duration
//!   (error scaled by 1e9) so Criterion can chart it. Lower is better.

use criterion::{
    BenchmarkId, Criterion, PlotConfiguration, Throughput, criterion_group, criterion_main,
};
use std::hint::black_box;

extern crate flowstep;
use flowstep::derivatives::{self, DerivativeField, LinearDecay, Rotation};
use flowstep::fields::FieldRepository;
use flowstep::integration::{self, IntegrationMethod, IntegratorRegistry, MethodContext};
use flowstep::math::{Scalar, Vector};
use flowstep::parallel::{Backend, ParallelKernel};
use flowstep::population::{ActivePredicate, AllActive, IndexContainer, PointStructure};

// =============================================================================
// Helpers
// =============================================================================

struct Population {
    method: Box<dyn IntegrationMethod>,
    y: Vec<Vector>,
    dy: Vec<Vector>,
}

impl Population {
    fn new(name: &str, count: usize, kernel: ParallelKernel) -> Self {
        let mut method = IntegratorRegistry::global()
            .create(
                name,
                &MethodContext::new("position", count, kernel),
                &mut FieldRepository::new(),
            )
            .unwrap();
        let y: Vec<Vector> = (0..count)
            .map(|i| Vector::new((i as Scalar).sin(), (i as Scalar).cos(), 0.1))
            .collect();
        let indices = PointStructure::with_capacity(count).insert(count);
        method.set_initial_vals(&indices, &y).unwrap();

        Self {
            method,
            dy: vec![Vector::ZERO; count],
            y,
        }
    }

    fn step(
        &mut self,
        field: &dyn DerivativeField,
        kernel: &ParallelKernel,
        active: &dyn ActivePredicate,
        dt: Scalar,
    ) {
        integration::step(
            &mut *self.method,
            dt,
            &mut self.y,
            &mut self.dy,
            active,
            |y, dy| derivatives::evaluate(field, kernel, active, y, dy),
        )
        .unwrap();
    }
}

fn backends() -> [(&'static str, ParallelKernel); 2] {
    [
        ("serial", ParallelKernel::serial()),
        ("task_pool", ParallelKernel::task_pool()),
    ]
}

// =============================================================================
// Performance Benchmarks
// =============================================================================

fn bench_step_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("am5_step");
    group
        .plot_config(PlotConfiguration::default().summary_scale(criterion::AxisScale::Logarithmic));

    let field = Rotation { omega: Vector::Z };
    for count in [1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));
        for (backend, kernel) in backends() {
            let mut population = Population::new("adams_moulton5", count, kernel);
            let active = AllActive::first(count);

            group.bench_with_input(BenchmarkId::new(backend, count), &count, |b, _| {
                b.iter(|| {
                    population.step(&field, &kernel, &active, black_box(0.01));
                    black_box(&population.y);
                });
            });
        }
    }

    group.finish();
}

fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("method_step");
    let count = 10_000;
    let kernel = ParallelKernel::serial();
    let field = LinearDecay { rate: 1.0 };
    let active = AllActive::first(count);

    for name in IntegratorRegistry::global().list_available() {
        let mut population = Population::new(&name, count, kernel);
        group.bench_function(name.as_str(), |b| {
            b.iter(|| population.step(&field, &kernel, &active, black_box(0.01)));
        });
    }

    group.finish();
}

fn bench_sparse_population(c: &mut Criterion) {
    // Every fourth slot free: the kernel has to consult the predicate per index
    let mut group = c.benchmark_group("sparse_population");
    let count = 100_000;
    let field = LinearDecay { rate: 1.0 };

    let mut dense = PointStructure::with_capacity(count);
    dense.insert(count);
    let mut sparse = dense.clone();
    let freed: Vec<usize> = (1..count).step_by(4).collect();
    sparse.remove(&freed);

    for (backend, kernel) in backends() {
        for (label, points) in [("dense", &dense), ("sparse", &sparse)] {
            let mut population = Population::new("adams_moulton5", count, kernel);
            group.bench_function(BenchmarkId::new(backend, label), |b| {
                b.iter(|| population.step(&field, &kernel, points, black_box(0.01)));
            });
        }
    }

    group.finish();
}

// =============================================================================
// Accuracy Benchmarks
// =============================================================================

fn bench_accuracy(c: &mut Criterion) {
    let mut group = c.benchmark_group("accuracy");
    group
        .plot_config(PlotConfiguration::default().summary_scale(criterion::AxisScale::Logarithmic));

    let field = LinearDecay { rate: 1.0 };
    let kernel = ParallelKernel::new(Backend::Serial, 1);
    let active = AllActive::first(1);
    let dt = 0.01;
    let steps = 100;

    for name in IntegratorRegistry::global().list_available() {
        group.bench_function(BenchmarkId::new("decay", name.as_str()), |b| {
            b.iter_custom(|iters| {
                let mut total_error = 0.0;

                for _ in 0..iters {
                    let mut population = Population::new(&name, 1, kernel);
                    population.y[0] = Vector::X;
                    population
                        .method
                        .set_initial_vals(&IndexContainer::new(vec![0]), &[Vector::X])
                        .unwrap();
                    population.dy[0] = field.at(Vector::X);

                    for _ in 0..steps {
                        population.step(&field, &kernel, &active, dt);
                    }

                    let exact = Vector::X * (-(dt * steps as Scalar)).exp();
                    total_error += (population.y[0] - exact).length();
                }

                let avg_error = total_error / iters as f64;
                std::time::Duration::from_nanos((avg_error * 1e9) as u64)
            });
        });
    }

    group.finish();
}

// =============================================================================
// Benchmark Groups
// =============================================================================

criterion_group!(performance, bench_step_throughput, bench_methods, bench_sparse_population);

criterion_group!(accuracy, bench_accuracy);

criterion_main!(performance, accuracy);
