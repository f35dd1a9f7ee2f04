use crate::config::RansacConfig;
use nalgebra::{DMatrix, Matrix3};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// A 3x3 projective transform mapping secondary-image coordinates onto the
/// reference frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Project a point through the transform. `None` when the point maps to
    /// the plane at infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.matrix;
        let w = m[(2, 0)] * x + m[(2, 1)] * y + m[(2, 2)];
        if w.abs() < 1e-12 {
            return None;
        }
        let px = (m[(0, 0)] * x + m[(0, 1)] * y + m[(0, 2)]) / w;
        let py = (m[(1, 0)] * x + m[(1, 1)] * y + m[(1, 2)]) / w;
        Some((px, py))
    }

    /// Row-major coefficients as `f32`, the layout the warp stage consumes.
    pub fn to_row_major_f32(&self) -> [f32; 9] {
        let m = &self.matrix;
        [
            m[(0, 0)] as f32,
            m[(0, 1)] as f32,
            m[(0, 2)] as f32,
            m[(1, 0)] as f32,
            m[(1, 1)] as f32,
            m[(1, 2)] as f32,
            m[(2, 0)] as f32,
            m[(2, 1)] as f32,
            m[(2, 2)] as f32,
        ]
    }
}

/// Estimate a homography from `src` to `dst` with a seeded RANSAC loop over
/// 4-point samples, then refit on the full inlier set.
///
/// Model selection keeps the candidate with strictly more inliers; equal
/// support keeps the earlier candidate. Together with the fixed seed this
/// makes estimation deterministic for identical inputs.
pub fn estimate_homography(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
    config: &RansacConfig,
) -> Option<Homography> {
    if src.len() != dst.len() || src.len() < 4 || src.len() < config.min_inliers {
        return None;
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best_matrix: Option<Matrix3<f64>> = None;
    let mut best_inliers = 0usize;

    for _ in 0..config.max_iterations {
        let sample = rand::seq::index::sample(&mut rng, src.len(), 4);
        let sample_src: Vec<(f64, f64)> = sample.iter().map(|i| src[i]).collect();
        let sample_dst: Vec<(f64, f64)> = sample.iter().map(|i| dst[i]).collect();

        if is_degenerate(&sample_src) || is_degenerate(&sample_dst) {
            continue;
        }

        let Some(candidate) = solve_dlt(&sample_src, &sample_dst) else {
            continue;
        };

        let inliers = count_inliers(&candidate, src, dst, config.inlier_threshold);
        if inliers > best_inliers {
            best_inliers = inliers;
            best_matrix = Some(candidate);

            let inlier_ratio = inliers as f64 / src.len() as f64;
            if inlier_ratio >= config.early_exit_ratio {
                break;
            }
        }
    }

    let best = best_matrix?;
    if best_inliers < config.min_inliers {
        return None;
    }

    // Refit on every inlier of the winning sample model.
    let (inlier_src, inlier_dst): (Vec<_>, Vec<_>) = src
        .iter()
        .zip(dst.iter())
        .filter(|&(&s, &d)| reprojection_error(&best, s, d) < config.inlier_threshold)
        .map(|(&s, &d)| (s, d))
        .unzip();

    let refined = solve_dlt(&inlier_src, &inlier_dst).unwrap_or(best);

    Some(Homography::from_matrix(refined))
}

fn count_inliers(matrix: &Matrix3<f64>, src: &[(f64, f64)], dst: &[(f64, f64)], threshold: f64) -> usize {
    src.iter()
        .zip(dst.iter())
        .filter(|&(&s, &d)| reprojection_error(matrix, s, d) < threshold)
        .count()
}

fn reprojection_error(matrix: &Matrix3<f64>, src: (f64, f64), dst: (f64, f64)) -> f64 {
    let w = matrix[(2, 0)] * src.0 + matrix[(2, 1)] * src.1 + matrix[(2, 2)];
    if w.abs() < 1e-12 {
        return f64::INFINITY;
    }
    let px = (matrix[(0, 0)] * src.0 + matrix[(0, 1)] * src.1 + matrix[(0, 2)]) / w;
    let py = (matrix[(1, 0)] * src.0 + matrix[(1, 1)] * src.1 + matrix[(1, 2)]) / w;
    let dx = px - dst.0;
    let dy = py - dst.1;
    (dx * dx + dy * dy).sqrt()
}

/// A 4-point sample is unusable when any three points are (nearly) collinear.
fn is_degenerate(points: &[(f64, f64)]) -> bool {
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            for k in (j + 1)..points.len() {
                let (ax, ay) = points[i];
                let (bx, by) = points[j];
                let (cx, cy) = points[k];
                let cross = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
                if cross.abs() < 1e-6 {
                    return true;
                }
            }
        }
    }
    false
}

/// Direct linear transform with Hartley normalization. The null vector of the
/// stacked constraint matrix is taken from the eigen-decomposition of AᵀA.
fn solve_dlt(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Matrix3<f64>> {
    if src.len() < 4 {
        return None;
    }

    let (src_normalized, src_transform) = normalize_points(src)?;
    let (dst_normalized, dst_transform) = normalize_points(dst)?;

    let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
    for (row, (&(sx, sy), &(dx, dy))) in src_normalized
        .iter()
        .zip(dst_normalized.iter())
        .enumerate()
        .map(|(i, pair)| (2 * i, pair))
    {
        a[(row, 0)] = -sx;
        a[(row, 1)] = -sy;
        a[(row, 2)] = -1.0;
        a[(row, 6)] = dx * sx;
        a[(row, 7)] = dx * sy;
        a[(row, 8)] = dx;

        a[(row + 1, 3)] = -sx;
        a[(row + 1, 4)] = -sy;
        a[(row + 1, 5)] = -1.0;
        a[(row + 1, 6)] = dy * sx;
        a[(row + 1, 7)] = dy * sy;
        a[(row + 1, 8)] = dy;
    }

    let ata = a.transpose() * &a;
    let eigen = ata.symmetric_eigen();

    let mut min_idx = 0;
    for i in 1..eigen.eigenvalues.len() {
        if eigen.eigenvalues[i] < eigen.eigenvalues[min_idx] {
            min_idx = i;
        }
    }
    let h = eigen.eigenvectors.column(min_idx);

    let normalized = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let dst_inverse = dst_transform.try_inverse()?;
    let mut matrix = dst_inverse * normalized * src_transform;

    let w = matrix[(2, 2)];
    if w.abs() < 1e-12 {
        return None;
    }
    matrix /= w;

    Some(matrix)
}

/// Translate the centroid to the origin and scale the mean distance to √2.
fn normalize_points(points: &[(f64, f64)]) -> Option<(Vec<(f64, f64)>, Matrix3<f64>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.1).sum::<f64>() / n;

    let mean_distance = points
        .iter()
        .map(|&(x, y)| ((x - cx).powi(2) + (y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    if mean_distance < 1e-12 {
        return None;
    }

    let scale = std::f64::consts::SQRT_2 / mean_distance;
    let transform = Matrix3::new(scale, 0.0, -scale * cx, 0.0, scale, -scale * cy, 0.0, 0.0, 1.0);

    let normalized = points
        .iter()
        .map(|&(x, y)| (scale * (x - cx), scale * (y - cy)))
        .collect();

    Some((normalized, transform))
}
