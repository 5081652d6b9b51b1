//! Embedding-matrix reduction to 3D scatter coordinates.
//!
//! Two strategies, picked by sample count:
//!
//! - **Stochastic neighbor embedding** for 4+ rows. Exact (no tree
//!   approximation — token sequences are short), three output dimensions
//!   directly, perplexity clamped to `[5, 30]` preferring `n - 1`, and a
//!   fixed seed so the same text always lands in the same shape.
//! - **Principal projection** for 1-3 rows, where a neighborhood graph is
//!   meaningless. Variance-maximizing components via the Gram matrix of
//!   the centered rows, zero-padded so callers always get 3 columns.
//!
//! The sigma search in the stochastic path saturates toward uniform
//! affinities when the requested perplexity exceeds the available
//! neighbors, so the 4-row boundary case is well-defined.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ProjectionError;

/// One reduced coordinate row.
pub type Point3 = [f64; 3];

/// Below this many rows the neighbor embedding has no usable neighborhood
/// structure and we fall back to the linear projection.
const SNE_MIN_SAMPLES: usize = 4;

const MIN_PERPLEXITY: f64 = 5.0;
const MAX_PERPLEXITY: f64 = 30.0;

const SNE_ITERATIONS: usize = 500;
const EXAGGERATION_ITERATIONS: usize = 100;
const EXAGGERATION: f64 = 12.0;
const LEARNING_RATE: f64 = 200.0;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MOMENTUM_SWITCH_ITERATION: usize = 250;
const MIN_GAIN: f64 = 0.01;
const PROB_FLOOR: f64 = 1e-12;

const EIGENVALUE_TOLERANCE: f64 = 1e-12;

/// Perplexity used for `n_samples` rows: `n - 1`, clamped to `[5, 30]`.
pub fn perplexity_for(n_samples: usize) -> f64 {
    (n_samples.saturating_sub(1) as f64).clamp(MIN_PERPLEXITY, MAX_PERPLEXITY)
}

/// Reduce an `n x h` embedding matrix to `n` 3D points.
///
/// Strategy selection is by row count; see the module docs. `seed` drives
/// the stochastic path's initialization only — the linear fallback is
/// fully deterministic on its own.
pub fn reduce_to_3d(rows: &[Vec<f32>], seed: u64) -> Result<Vec<Point3>, ProjectionError> {
    let n = rows.len();
    if n == 0 {
        return Err(ProjectionError::EmptyInput);
    }
    let width = rows[0].len();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(ProjectionError::RaggedInput {
                row: i,
                got: row.len(),
                expected: width,
            });
        }
    }

    if n >= SNE_MIN_SAMPLES {
        let perplexity = perplexity_for(n);
        tracing::debug!(rows = n, perplexity, "reducing via neighbor embedding");
        Ok(neighbor_embedding_3d(rows, perplexity, seed))
    } else {
        tracing::debug!(rows = n, "reducing via principal projection");
        Ok(principal_projection(rows))
    }
}

// --- Stochastic neighbor embedding -------------------------------------

fn neighbor_embedding_3d(rows: &[Vec<f32>], perplexity: f64, seed: u64) -> Vec<Point3> {
    let n = rows.len();
    let distances = pairwise_sq_distances(rows);
    let mut affinities = joint_affinities(&distances, n, perplexity);

    // Early exaggeration pulls clusters together before fine placement.
    for p in &mut affinities {
        *p *= EXAGGERATION;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut points: Vec<Point3> = (0..n)
        .map(|_| {
            [
                gaussian(&mut rng) * 1e-4,
                gaussian(&mut rng) * 1e-4,
                gaussian(&mut rng) * 1e-4,
            ]
        })
        .collect();
    let mut velocity = vec![[0.0f64; 3]; n];
    let mut gains = vec![[1.0f64; 3]; n];
    let mut weights = vec![0.0f64; n * n];
    let mut gradient = vec![[0.0f64; 3]; n];

    for iteration in 0..SNE_ITERATIONS {
        if iteration == EXAGGERATION_ITERATIONS {
            for p in &mut affinities {
                *p /= EXAGGERATION;
            }
        }

        // Student-t kernel over the current layout.
        let mut weight_sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let w = 1.0 / (1.0 + sq_dist3(&points[i], &points[j]));
                weights[i * n + j] = w;
                weights[j * n + i] = w;
                weight_sum += 2.0 * w;
            }
        }

        for (i, grad) in gradient.iter_mut().enumerate() {
            *grad = [0.0; 3];
            for j in 0..n {
                if i == j {
                    continue;
                }
                let w = weights[i * n + j];
                let q = (w / weight_sum).max(PROB_FLOOR);
                let coeff = 4.0 * (affinities[i * n + j] - q) * w;
                for axis in 0..3 {
                    grad[axis] += coeff * (points[i][axis] - points[j][axis]);
                }
            }
        }

        let momentum = if iteration < MOMENTUM_SWITCH_ITERATION {
            INITIAL_MOMENTUM
        } else {
            FINAL_MOMENTUM
        };
        for i in 0..n {
            for axis in 0..3 {
                let same_direction = gradient[i][axis].signum() == velocity[i][axis].signum();
                gains[i][axis] = if same_direction {
                    (gains[i][axis] * 0.8).max(MIN_GAIN)
                } else {
                    gains[i][axis] + 0.2
                };
                velocity[i][axis] = momentum * velocity[i][axis]
                    - LEARNING_RATE * gains[i][axis] * gradient[i][axis];
                points[i][axis] += velocity[i][axis];
            }
        }
        recenter(&mut points);
    }

    points
}

/// Symmetrized joint affinities with per-row sigma matched to the target
/// perplexity by bisection on the precision.
fn joint_affinities(distances: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    let target_entropy = perplexity.ln();
    let mut conditional = vec![0.0f64; n * n];
    for i in 0..n {
        let row = conditional_row(distances, n, i, target_entropy);
        conditional[i * n..(i + 1) * n].copy_from_slice(&row);
    }

    let mut joint = vec![0.0f64; n * n];
    let scale = 2.0 * n as f64;
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            joint[i * n + j] =
                ((conditional[i * n + j] + conditional[j * n + i]) / scale).max(PROB_FLOOR);
        }
    }
    joint
}

fn conditional_row(distances: &[f64], n: usize, i: usize, target_entropy: f64) -> Vec<f64> {
    let mut beta = 1.0f64;
    let mut beta_low = f64::NEG_INFINITY;
    let mut beta_high = f64::INFINITY;
    let mut row = vec![0.0f64; n];

    for _ in 0..50 {
        let mut sum = 0.0;
        let mut weighted = 0.0;
        for j in 0..n {
            if j == i {
                row[j] = 0.0;
                continue;
            }
            let p = (-beta * distances[i * n + j]).exp();
            row[j] = p;
            sum += p;
            weighted += distances[i * n + j] * p;
        }
        if sum <= 0.0 {
            sum = PROB_FLOOR;
        }
        let entropy = sum.ln() + beta * weighted / sum;
        let diff = entropy - target_entropy;
        if diff.abs() < 1e-5 {
            break;
        }
        if diff > 0.0 {
            beta_low = beta;
            beta = if beta_high.is_finite() {
                (beta + beta_high) / 2.0
            } else {
                beta * 2.0
            };
        } else {
            beta_high = beta;
            beta = if beta_low.is_finite() {
                (beta + beta_low) / 2.0
            } else {
                beta / 2.0
            };
        }
    }

    let sum: f64 = row.iter().sum();
    if sum > 0.0 {
        for p in &mut row {
            *p /= sum;
        }
    }
    row
}

fn pairwise_sq_distances(rows: &[Vec<f32>]) -> Vec<f64> {
    let n = rows.len();
    let mut distances = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = rows[i]
                .iter()
                .zip(rows[j].iter())
                .map(|(a, b)| {
                    let diff = f64::from(*a) - f64::from(*b);
                    diff * diff
                })
                .sum();
            distances[i * n + j] = d;
            distances[j * n + i] = d;
        }
    }
    distances
}

fn sq_dist3(a: &Point3, b: &Point3) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

fn recenter(points: &mut [Point3]) {
    let n = points.len() as f64;
    let mut mean = [0.0f64; 3];
    for p in points.iter() {
        for axis in 0..3 {
            mean[axis] += p[axis];
        }
    }
    for m in &mut mean {
        *m /= n;
    }
    for p in points.iter_mut() {
        for axis in 0..3 {
            p[axis] -= mean[axis];
        }
    }
}

/// Standard normal via Box-Muller, so the crate needs no distribution
/// dependency on top of `rand`.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

// --- Linear fallback ----------------------------------------------------

/// Variance-maximizing projection for 1-3 rows, padded to 3 columns.
///
/// Works on the `n x n` Gram matrix of the centered rows (the hidden
/// dimension is large, the row count here never exceeds 3): each dominant
/// eigenpair of the Gram matrix yields one score column, extracted by
/// power iteration and removed by deflation.
fn principal_projection(rows: &[Vec<f32>]) -> Vec<Point3> {
    let n = rows.len();
    let width = rows[0].len();

    let mut mean = vec![0.0f64; width];
    for row in rows {
        for (m, v) in mean.iter_mut().zip(row.iter()) {
            *m += f64::from(*v);
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }
    let centered: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(mean.iter())
                .map(|(v, m)| f64::from(*v) - m)
                .collect()
        })
        .collect();

    let mut gram = vec![0.0f64; n * n];
    for i in 0..n {
        for j in i..n {
            let dot: f64 = centered[i]
                .iter()
                .zip(centered[j].iter())
                .map(|(a, b)| a * b)
                .sum();
            gram[i * n + j] = dot;
            gram[j * n + i] = dot;
        }
    }

    let components = n.min(3);
    let mut coords = vec![[0.0f64; 3]; n];
    for component in 0..components {
        let (eigenvalue, eigenvector) = dominant_eigenpair(&gram, n);
        if eigenvalue <= EIGENVALUE_TOLERANCE {
            break;
        }
        let sigma = eigenvalue.sqrt();
        for i in 0..n {
            coords[i][component] = eigenvector[i] * sigma;
        }
        for i in 0..n {
            for j in 0..n {
                gram[i * n + j] -= eigenvalue * eigenvector[i] * eigenvector[j];
            }
        }
    }
    coords
}

/// Power iteration on a small symmetric PSD matrix.
fn dominant_eigenpair(matrix: &[f64], n: usize) -> (f64, Vec<f64>) {
    // Start from a slightly tilted vector so we never begin orthogonal to
    // the dominant direction.
    let mut v: Vec<f64> = (0..n).map(|i| 1.0 + 0.01 * i as f64).collect();
    normalize_vec(&mut v);

    for _ in 0..100 {
        let mut next = vec![0.0f64; n];
        for i in 0..n {
            for j in 0..n {
                next[i] += matrix[i * n + j] * v[j];
            }
        }
        let norm = normalize_vec(&mut next);
        if norm <= EIGENVALUE_TOLERANCE {
            return (0.0, next);
        }
        let delta: f64 = next
            .iter()
            .zip(v.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        v = next;
        if delta < 1e-12 {
            break;
        }
    }

    // Rayleigh quotient (v is unit length).
    let mut eigenvalue = 0.0;
    for i in 0..n {
        for j in 0..n {
            eigenvalue += v[i] * matrix[i * n + j] * v[j];
        }
    }
    (eigenvalue, v)
}

fn normalize_vec(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[f32]) -> Vec<f32> {
        values.to_vec()
    }

    #[test]
    fn perplexity_prefers_n_minus_one_within_band() {
        assert_eq!(perplexity_for(10), 9.0);
        assert_eq!(perplexity_for(21), 20.0);
    }

    #[test]
    fn perplexity_clamps_at_band_edges() {
        assert_eq!(perplexity_for(50), 30.0);
        assert_eq!(perplexity_for(100), 30.0);
        assert_eq!(perplexity_for(4), 5.0);
        assert_eq!(perplexity_for(2), 5.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        let rows: Vec<Vec<f32>> = vec![];
        assert_eq!(reduce_to_3d(&rows, 42), Err(ProjectionError::EmptyInput));
    }

    #[test]
    fn ragged_input_is_rejected() {
        let rows = vec![row(&[1.0, 2.0]), row(&[1.0, 2.0, 3.0])];
        assert_eq!(
            reduce_to_3d(&rows, 42),
            Err(ProjectionError::RaggedInput {
                row: 1,
                got: 3,
                expected: 2
            })
        );
    }

    #[test]
    fn single_row_reduces_to_origin() {
        let rows = vec![row(&[5.0, -2.0, 7.0, 1.0])];
        let coords = reduce_to_3d(&rows, 42).unwrap();
        assert_eq!(coords.len(), 1);
        assert_eq!(coords[0], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn two_rows_project_symmetrically_on_first_axis() {
        let rows = vec![row(&[0.0, 0.0]), row(&[4.0, 0.0])];
        let coords = reduce_to_3d(&rows, 42).unwrap();
        assert_eq!(coords.len(), 2);

        // One variance-carrying component: +-2 on the first axis, zero
        // padding on the other two.
        assert!((coords[0][0].abs() - 2.0).abs() < 1e-9);
        assert!((coords[1][0].abs() - 2.0).abs() < 1e-9);
        assert!((coords[0][0] + coords[1][0]).abs() < 1e-9);
        for point in &coords {
            assert_eq!(point[1], 0.0);
            assert_eq!(point[2], 0.0);
        }
    }

    #[test]
    fn three_rows_keep_pairwise_distances() {
        // A right triangle in the plane: the projection is a rotation, so
        // distances survive exactly.
        let rows = vec![
            row(&[0.0, 0.0, 0.0]),
            row(&[3.0, 0.0, 0.0]),
            row(&[0.0, 4.0, 0.0]),
        ];
        let coords = reduce_to_3d(&rows, 42).unwrap();
        assert_eq!(coords.len(), 3);

        let dist = |a: &Point3, b: &Point3| sq_dist3(a, b).sqrt();
        assert!((dist(&coords[0], &coords[1]) - 3.0).abs() < 1e-6);
        assert!((dist(&coords[0], &coords[2]) - 4.0).abs() < 1e-6);
        assert!((dist(&coords[1], &coords[2]) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn identical_rows_do_not_produce_non_finite_values() {
        let rows = vec![row(&[1.0, 1.0]); 3];
        let coords = reduce_to_3d(&rows, 42).unwrap();
        for point in &coords {
            for value in point {
                assert!(value.is_finite());
            }
        }
    }

    #[test]
    fn four_rows_take_the_stochastic_path_and_stay_finite() {
        let rows = vec![
            row(&[0.0, 0.0]),
            row(&[10.0, 0.0]),
            row(&[0.0, 10.0]),
            row(&[10.0, 10.0]),
        ];
        let coords = reduce_to_3d(&rows, 42).unwrap();
        assert_eq!(coords.len(), 4);
        for point in &coords {
            for value in point {
                assert!(value.is_finite());
            }
        }
        // The stochastic path spreads points out; the linear fallback for
        // these rows would leave the third column all zero. Seeing any
        // depth confirms which branch ran.
        assert!(coords.iter().any(|p| p[2].abs() > 1e-6));
    }

    #[test]
    fn same_seed_is_reproducible() {
        let rows: Vec<Vec<f32>> = (0..6)
            .map(|i| row(&[i as f32, (i * i) as f32, 1.0]))
            .collect();
        let a = reduce_to_3d(&rows, 42).unwrap();
        let b = reduce_to_3d(&rows, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_give_different_layouts() {
        let rows: Vec<Vec<f32>> = (0..6)
            .map(|i| row(&[i as f32, (i * i) as f32, 1.0]))
            .collect();
        let a = reduce_to_3d(&rows, 42).unwrap();
        let b = reduce_to_3d(&rows, 7).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn stochastic_layout_spreads_instead_of_collapsing() {
        let rows: Vec<Vec<f32>> = (0..12)
            .map(|i| row(&[(i % 4) as f32, (i / 4) as f32, i as f32 * 0.5]))
            .collect();
        let coords = reduce_to_3d(&rows, 42).unwrap();
        assert_eq!(coords.len(), 12);

        // Points start within 1e-4 of the origin; the descent must have
        // pushed them well apart.
        let mut max_dist = 0.0f64;
        for i in 0..coords.len() {
            for j in (i + 1)..coords.len() {
                max_dist = max_dist.max(sq_dist3(&coords[i], &coords[j]).sqrt());
            }
        }
        assert!(max_dist > 1e-2, "layout collapsed: max distance {max_dist}");
    }
}
