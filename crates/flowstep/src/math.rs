/// Scalar type for integration (f64 for precision)
pub type Scalar = f64;

/// 3D vector type for integrated quantities and their derivatives
pub type Vector = bevy::math::DVec3;

/// Weighted sum `Σ wₖ·vₖ` over paired weights and vectors.
///
/// Multistep formulas are all of this shape; keeping the accumulation in one
/// place keeps the evaluation order identical across every variant.
#[inline]
pub fn weighted_sum<const N: usize>(weights: &[Scalar; N], values: [Vector; N]) -> Vector {
    weights
        .iter()
        .zip(values)
        .fold(Vector::ZERO, |acc, (w, v)| acc + v * *w)
}
