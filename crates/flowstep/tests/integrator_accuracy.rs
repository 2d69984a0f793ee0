//! Accuracy tests for the integration methods
//!
//! Every method integrates y' = -y from y(0) = 1 and is compared with the
//! analytical solution exp(-t). Multistep methods start from exact history so
//! their asymptotic convergence order is visible.

use flowstep::derivatives::{self, LinearDecay, Rotation};
use flowstep::fields::FieldRepository;
use flowstep::integration::{
    self, AdamsMoulton3, AdamsMoulton4, AdamsMoulton5, ExplicitEuler, HistorySlot,
    IntegrationMethod, MultistepHistory,
};
use flowstep::math::{Scalar, Vector};
use flowstep::parallel::ParallelKernel;
use flowstep::population::{AllActive, IndexContainer};

const DECAY: LinearDecay = LinearDecay { rate: 1.0 };

fn exact(t: Scalar) -> Vector {
    Vector::new((-t).exp(), 0.0, 0.0)
}

/// Places the history one would have after integrating exactly up to t = 0.
fn seed_exact<const D: usize>(history: &mut MultistepHistory<D>, dt: Scalar) {
    let dy = std::array::from_fn(|k| -exact(-(k as Scalar) * dt));
    history
        .set_slot(0, HistorySlot { y0: exact(0.0), dy })
        .unwrap();
}

/// Runs PECE steps until `t_end` and returns |y - exact|.
fn run(method: &mut dyn IntegrationMethod, dt: Scalar, t_end: Scalar) -> Scalar {
    let steps = (t_end / dt).round() as usize;
    let kernel = ParallelKernel::serial();
    let active = AllActive::first(1);

    let mut y = vec![exact(0.0)];
    let mut dy = vec![-exact(0.0)];
    for _ in 0..steps {
        integration::step(method, dt, &mut y, &mut dy, &active, |y, dy| {
            derivatives::evaluate(&DECAY, &kernel, &active, y, dy)
        })
        .unwrap();
    }

    (y[0] - exact(steps as Scalar * dt)).length()
}

fn am5(dt: Scalar) -> AdamsMoulton5 {
    let mut method =
        AdamsMoulton5::new(&mut FieldRepository::new(), "y", 1, ParallelKernel::serial()).unwrap();
    seed_exact(method.history_mut(), dt);
    method
}

fn am4(dt: Scalar) -> AdamsMoulton4 {
    let mut method =
        AdamsMoulton4::new(&mut FieldRepository::new(), "y", 1, ParallelKernel::serial()).unwrap();
    seed_exact(method.history_mut(), dt);
    method
}

fn am3(dt: Scalar) -> AdamsMoulton3 {
    let mut method =
        AdamsMoulton3::new(&mut FieldRepository::new(), "y", 1, ParallelKernel::serial()).unwrap();
    seed_exact(method.history_mut(), dt);
    method
}

fn convergence_ratio<M, F>(build: F, dt: Scalar) -> (Scalar, Scalar)
where
    M: IntegrationMethod,
    F: Fn(Scalar) -> M,
{
    let coarse = run(&mut build(dt), dt, 1.0);
    let fine = run(&mut build(dt / 2.0), dt / 2.0, 1.0);
    (coarse, coarse / fine)
}

#[test]
fn test_adams_moulton5_accuracy() {
    let error = run(&mut am5(0.1), 0.1, 1.0);
    assert!(error < 1e-5, "AM5 error too large: {error:e}");
}

#[test]
fn test_adams_moulton5_convergence_order() {
    let (coarse, ratio) = convergence_ratio(am5, 0.1);
    assert!(coarse > 0.0);
    // Fifth order: halving dt should cut the error by about 32
    assert!(ratio > 16.0, "AM5 error ratio {ratio:.2}");
}

#[test]
fn test_adams_moulton4_convergence_order() {
    let (_, ratio) = convergence_ratio(am4, 0.1);
    assert!(ratio > 8.0, "AM4 error ratio {ratio:.2}");
}

#[test]
fn test_adams_moulton3_convergence_order() {
    let (_, ratio) = convergence_ratio(am3, 0.1);
    assert!(ratio > 4.0, "AM3 error ratio {ratio:.2}");
}

#[test]
fn test_explicit_euler_convergence_order() {
    let build = |_: Scalar| ExplicitEuler::new(ParallelKernel::serial());
    let (_, ratio) = convergence_ratio(build, 0.01);
    assert!((1.8..2.2).contains(&ratio), "Euler error ratio {ratio:.2}");
}

#[test]
fn test_higher_order_is_more_accurate() {
    let dt = 0.05;
    let euler = run(&mut ExplicitEuler::new(ParallelKernel::serial()), dt, 1.0);
    let third = run(&mut am3(dt), dt, 1.0);
    let fifth = run(&mut am5(dt), dt, 1.0);

    assert!(third < euler);
    assert!(fifth < third);
}

#[test]
fn test_cold_start_stays_bounded() {
    // Zero-seeded history costs accuracy during the first steps but must not
    // destabilise the method
    let mut method =
        AdamsMoulton5::new(&mut FieldRepository::new(), "y", 1, ParallelKernel::serial()).unwrap();
    method
        .set_initial_vals(&IndexContainer::new(vec![0]), &[exact(0.0)])
        .unwrap();

    let error = run(&mut method, 0.01, 1.0);
    assert!(error < 0.02, "cold start error {error:e}");
}

#[test]
fn test_rotation_preserves_radius() {
    let field = Rotation { omega: Vector::Z };
    let kernel = ParallelKernel::serial();
    let active = AllActive::first(1);
    let dt = 0.01;

    let mut method =
        AdamsMoulton5::new(&mut FieldRepository::new(), "y", 1, ParallelKernel::serial()).unwrap();
    let start = Vector::X;
    let dy = std::array::from_fn(|k| {
        let angle = -(k as Scalar) * dt;
        Vector::new(-angle.sin(), angle.cos(), 0.0)
    });
    method
        .history_mut()
        .set_slot(0, HistorySlot { y0: start, dy })
        .unwrap();

    let mut y = vec![start];
    let mut dy = vec![field.omega.cross(start)];
    // One full revolution
    let steps = (std::f64::consts::TAU / dt).round() as usize;
    for _ in 0..steps {
        integration::step(&mut method, dt, &mut y, &mut dy, &active, |y, dy| {
            derivatives::evaluate(&field, &kernel, &active, y, dy)
        })
        .unwrap();
    }

    assert!((y[0].length() - 1.0).abs() < 1e-6);
    assert!(y[0].z.abs() < 1e-12);
}
