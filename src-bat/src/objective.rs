use crate::params::Position;

/// Fitness of a position; higher is better
///
/// Negated sphere: f(x) = -(x0^2 + x1^2), maximum 0 at the origin.
/// Total and side-effect free, so it is safe to call from any worker.
#[inline]
pub fn objective(x: &Position) -> f64 {
	-x.iter().map(|&xi| xi * xi).sum::<f64>()
}
