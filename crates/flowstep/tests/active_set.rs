//! Behaviour of the integrators under a changing active set
//!
//! These scenarios drive methods through a `PointStructure` population whose
//! membership changes between steps, on both execution backends.

use flowstep::derivatives::{self, DerivativeField, LinearDecay, UniformDrift};
use flowstep::fields::FieldRepository;
use flowstep::integration::{
    self, AdamsMoulton5, IntegrationMethod, IntegratorRegistry, MethodContext,
};
use flowstep::math::{Scalar, Vector};
use flowstep::parallel::{Backend, ParallelKernel};
use flowstep::population::{ActivePredicate, PointStructure};

const DT: Scalar = 0.01;

fn kernels() -> [ParallelKernel; 2] {
    [
        ParallelKernel::serial(),
        // Tiny chunks so that a few thousand particles span many tasks
        ParallelKernel::new(Backend::TaskPool, 16),
    ]
}

fn initial_positions(count: usize) -> Vec<Vector> {
    (0..count)
        .map(|i| Vector::new(i as Scalar, 1.0, -(i as Scalar) * 0.5))
        .collect()
}

struct Driver {
    method: Box<dyn IntegrationMethod>,
    points: PointStructure,
    y: Vec<Vector>,
    dy: Vec<Vector>,
    kernel: ParallelKernel,
}

impl Driver {
    fn new(name: &str, count: usize, kernel: ParallelKernel) -> Self {
        let mut method = IntegratorRegistry::global()
            .create(
                name,
                &MethodContext::new("position", count, kernel),
                &mut FieldRepository::new(),
            )
            .unwrap();
        let mut points = PointStructure::with_capacity(count);
        let y = initial_positions(count);

        let indices = points.insert(count);
        method.set_initial_vals(&indices, &y).unwrap();

        Self {
            method,
            points,
            dy: vec![Vector::ZERO; count],
            y,
            kernel,
        }
    }

    fn step(&mut self, field: &dyn DerivativeField) {
        let Self {
            method,
            points,
            y,
            dy,
            kernel,
        } = self;
        let active: &PointStructure = points;
        let kernel: &ParallelKernel = kernel;

        derivatives::evaluate(field, kernel, active, y, dy).unwrap();
        let outcome = integration::step(&mut **method, DT, y, dy, active, |y, dy| {
            derivatives::evaluate(field, kernel, active, y, dy)
        })
        .unwrap();
        assert!(outcome.is_applied());
    }
}

#[test]
fn test_backends_agree_bit_for_bit() {
    let field = LinearDecay { rate: 0.7 };
    let [serial, parallel] = kernels().map(|kernel| {
        let mut driver = Driver::new("adams_moulton5", 3000, kernel);
        driver.points.remove(&[0, 17, 1500, 2999]);
        for _ in 0..20 {
            driver.step(&field);
        }
        driver.y
    });

    assert_eq!(serial, parallel);
}

#[test]
fn test_removed_particles_are_frozen() {
    let field = UniformDrift {
        velocity: Vector::X,
    };
    for kernel in kernels() {
        let mut driver = Driver::new("am5", 100, kernel);
        let before = driver.y[42];
        driver.points.remove(&[42]);

        for _ in 0..10 {
            driver.step(&field);
        }

        assert_eq!(driver.y[42], before);
        assert!((driver.y[41].x - (41.0 + 10.0 * DT)).abs() < 1e-2);
    }
}

#[test]
fn test_uniform_drift_is_exact_after_warm_up() {
    // With constant dy every multistep method becomes exact once its history
    // holds nothing but that constant
    let field = UniformDrift {
        velocity: Vector::Y,
    };
    for name in ["am3", "am4", "am5", "ab2", "euler"] {
        let mut driver = Driver::new(name, 4, ParallelKernel::serial());
        for _ in 0..5 {
            driver.step(&field);
        }
        let warm = driver.y.clone();
        for _ in 0..10 {
            driver.step(&field);
        }

        for (now, then) in driver.y.iter().zip(&warm) {
            let moved = *now - *then;
            assert!(
                (moved - Vector::Y * (10.0 * DT)).length() < 1e-12,
                "{name} moved by {moved}"
            );
        }
    }
}

#[test]
fn test_reused_slot_starts_from_fresh_history() {
    let field = LinearDecay { rate: 1.0 };
    let mut driver = Driver::new("am5", 8, ParallelKernel::serial());
    for _ in 0..5 {
        driver.step(&field);
    }

    driver.points.remove(&[3]);
    for _ in 0..3 {
        driver.step(&field);
    }

    let reborn = driver.points.insert(1);
    assert_eq!(reborn.as_slice(), &[3]);
    driver.y[3] = Vector::splat(5.0);
    driver
        .method
        .set_initial_vals(&reborn, &[Vector::splat(5.0)])
        .unwrap();

    let history = driver
        .method
        .as_any()
        .downcast_ref::<AdamsMoulton5>()
        .unwrap()
        .history();
    let slot = history.slot(3).unwrap();
    assert_eq!(slot.y0, Vector::splat(5.0));
    assert_eq!(slot.dy, [Vector::ZERO; 4]);

    driver.step(&field);
    assert!(driver.y[3].x < 5.0);
}

#[test]
fn test_growth_resizes_history() {
    let field = LinearDecay { rate: 1.0 };
    let mut driver = Driver::new("am4", 4, ParallelKernel::serial());
    driver.step(&field);

    let new = driver.points.insert(4);
    assert_eq!(driver.points.capacity(), 8);
    driver.y.resize(8, Vector::ONE);
    driver.dy.resize(8, Vector::ZERO);

    let values: Vec<Vector> = new.iter().map(|i| driver.y[i]).collect();
    assert!(driver.method.set_initial_vals(&new, &values).is_err());

    driver.method.resize(8);
    driver.method.set_initial_vals(&new, &values).unwrap();
    assert_eq!(driver.method.capacity(), Some(8));

    driver.step(&field);
    assert!(driver.y[7].x < 1.0);
}

#[test]
fn test_empty_population_is_a_no_op() {
    let field = LinearDecay { rate: 1.0 };
    for kernel in kernels() {
        let mut driver = Driver::new("am5", 3, kernel);
        driver.points.remove(&[0, 1, 2]);
        assert!(driver.points.active_range().is_empty());

        let before = driver.y.clone();
        driver.step(&field);
        assert_eq!(driver.y, before);
    }
}
