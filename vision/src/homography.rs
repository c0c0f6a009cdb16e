//! Planar homography estimation from noisy point correspondences.
//!
//! RANSAC over minimal 4-point samples, each solved by a normalized direct
//! linear transform, then a final fit over all inliers. Seeded sampling
//! keeps results reproducible for a given set of correspondences.

use crate::prelude::*;
use nalgebra::{DMatrix, Matrix3, SymmetricEigen};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub type Homography = Matrix3<f64>;

pub const REPROJECTION_THRESHOLD: f64 = 2.0;
const MAX_ITERATIONS: usize = 1000;
const TARGET_CONFIDENCE: f64 = 0.999;
const RANSAC_SEED: u64 = 0xAC5EED;

/// Applies the homography to a point. `None` if the point maps to the line
/// at infinity.
pub fn project(h: &Homography, p: Point<f64>) -> Option<Point<f64>> {
	let w = h[(2, 0)] * p.x + h[(2, 1)] * p.y + h[(2, 2)];
	if w.abs() < 1e-12 {
		return None;
	}
	Some(Point::new(
		(h[(0, 0)] * p.x + h[(0, 1)] * p.y + h[(0, 2)]) / w,
		(h[(1, 0)] * p.x + h[(1, 1)] * p.y + h[(1, 2)]) / w,
	))
}

/// Estimates the homography mapping `src` points onto `dst` points,
/// tolerating outlier correspondences. `None` if no model explains at least
/// four correspondences.
pub fn estimate(src: &[Point<f64>], dst: &[Point<f64>]) -> Option<Homography> {
	debug_assert_eq!(src.len(), dst.len());
	let n = src.len().min(dst.len());
	if n < 4 {
		return None;
	}

	let mut rng = StdRng::seed_from_u64(RANSAC_SEED);
	let mut best_inliers: Vec<usize> = Vec::new();

	let mut iterations = MAX_ITERATIONS;
	let mut iteration = 0;
	while iteration < iterations {
		iteration += 1;

		let mut sample = [0usize; 4];
		for slot in 0..4 {
			loop {
				let candidate = rng.gen_range(0..n);
				if !sample[..slot].contains(&candidate) {
					sample[slot] = candidate;
					break;
				}
			}
		}

		let sample_src = sample.map(|i| src[i]);
		let sample_dst = sample.map(|i| dst[i]);
		let h = match dlt(&sample_src, &sample_dst) {
			Some(h) => h,
			None => continue,
		};

		let inliers = (0..n)
			.filter(|&i| matches!(project(&h, src[i]), Some(p) if p.distance(&dst[i]) <= REPROJECTION_THRESHOLD))
			.collect::<Vec<_>>();

		if inliers.len() > best_inliers.len() {
			best_inliers = inliers;

			// enough iterations to hit an all-inlier sample with the
			// target confidence, given the inlier ratio seen so far
			let w = best_inliers.len() as f64 / n as f64;
			let miss = (1.0 - w.powi(4)).max(f64::EPSILON).ln();
			if miss < 0.0 {
				let needed = ((1.0 - TARGET_CONFIDENCE).ln() / miss).ceil() as usize;
				iterations = iterations.min(needed.max(iteration));
			}
		}
	}

	if best_inliers.len() < 4 {
		return None;
	}
	let inlier_src = best_inliers.iter().map(|&i| src[i]).collect::<Vec<_>>();
	let inlier_dst = best_inliers.iter().map(|&i| dst[i]).collect::<Vec<_>>();
	dlt(&inlier_src, &inlier_dst)
}

/// Direct linear transform over normalized coordinates.
fn dlt(src: &[Point<f64>], dst: &[Point<f64>]) -> Option<Homography> {
	let (t_src, src) = normalize(src)?;
	let (t_dst, dst) = normalize(dst)?;

	let mut a = DMatrix::<f64>::zeros(2 * src.len(), 9);
	for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
		let r = 2 * i;
		a[(r, 0)] = -s.x;
		a[(r, 1)] = -s.y;
		a[(r, 2)] = -1.0;
		a[(r, 6)] = d.x * s.x;
		a[(r, 7)] = d.x * s.y;
		a[(r, 8)] = d.x;
		a[(r + 1, 3)] = -s.x;
		a[(r + 1, 4)] = -s.y;
		a[(r + 1, 5)] = -1.0;
		a[(r + 1, 6)] = d.y * s.x;
		a[(r + 1, 7)] = d.y * s.y;
		a[(r + 1, 8)] = d.y;
	}

	// the solution is the null vector of A, i.e. the eigenvector of AᵀA
	// with the smallest eigenvalue
	let eigen = SymmetricEigen::new(a.transpose() * &a);
	let mut min_index = 0;
	for i in 1..9 {
		if eigen.eigenvalues[i] < eigen.eigenvalues[min_index] {
			min_index = i;
		}
	}
	let h = eigen.eigenvectors.column(min_index);

	#[rustfmt::skip]
	let h_normalized = Matrix3::new(
		h[0], h[1], h[2],
		h[3], h[4], h[5],
		h[6], h[7], h[8],
	);

	let h = t_dst.try_inverse()? * h_normalized * t_src;
	if h[(2, 2)].abs() < 1e-12 {
		return None;
	}
	Some(h / h[(2, 2)])
}

/// Hartley normalization: centroid to the origin, mean distance to sqrt(2).
fn normalize(points: &[Point<f64>]) -> Option<(Matrix3<f64>, Vec<Point<f64>>)> {
	let n = points.len() as f64;
	let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
	let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

	let mean_distance = points.iter().map(|p| (p.x - cx).hypot(p.y - cy)).sum::<f64>() / n;
	if mean_distance < 1e-12 {
		return None;
	}
	let s = core::f64::consts::SQRT_2 / mean_distance;

	#[rustfmt::skip]
	let t = Matrix3::new(
		s, 0.0, -s * cx,
		0.0, s, -s * cy,
		0.0, 0.0, 1.0,
	);
	Some((t, points.iter().map(|p| Point::new((p.x - cx) * s, (p.y - cy) * s)).collect()))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn grid() -> Vec<Point<f64>> {
		let mut points = Vec::new();
		for y in 0..3 {
			for x in 0..4 {
				points.push(Point::new(20.0 + x as f64 * 35.0, 15.0 + y as f64 * 41.0));
			}
		}
		points
	}

	fn rotate_translate(points: &[Point<f64>], angle: f64, tx: f64, ty: f64) -> Vec<Point<f64>> {
		let (sin, cos) = angle.sin_cos();
		points
			.iter()
			.map(|p| Point::new(cos * p.x - sin * p.y + tx, sin * p.x + cos * p.y + ty))
			.collect()
	}

	#[test]
	fn recovers_exact_similarity() {
		let src = grid();
		let dst = rotate_translate(&src, 0.3, 10.0, -4.0);

		let h = estimate(&src, &dst).unwrap();
		for (s, d) in src.iter().zip(dst.iter()) {
			assert!(project(&h, *s).unwrap().distance(d) < 1e-4);
		}

		// for a rotation, the angle can be read straight off the homography
		let heading = -f64::atan2(h[(0, 1)], h[(0, 0)]);
		assert!((heading - 0.3).abs() < 1e-4, "{heading}");
	}

	#[test]
	fn survives_outlier_correspondences() {
		let src = grid();
		let mut dst = rotate_translate(&src, -0.7, -25.0, 60.0);
		dst[2] = dst[2] + Point::new(50.0, -70.0);
		dst[5] = dst[5] + Point::new(-120.0, 15.0);
		dst[9] = dst[9] + Point::new(33.0, 44.0);

		let h = estimate(&src, &dst).unwrap();
		for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
			if matches!(i, 2 | 5 | 9) {
				continue;
			}
			assert!(project(&h, *s).unwrap().distance(d) <= REPROJECTION_THRESHOLD);
		}
	}

	#[test]
	fn too_few_points() {
		let src = grid();
		let dst = rotate_translate(&src, 0.1, 0.0, 0.0);
		assert!(estimate(&src[..3], &dst[..3]).is_none());
		assert!(estimate(&[], &[]).is_none());
	}

	#[test]
	fn degenerate_projection() {
		#[rustfmt::skip]
		let h = Matrix3::new(
			1.0, 0.0, 0.0,
			0.0, 1.0, 0.0,
			0.0, 0.0, 0.0,
		);
		assert_eq!(project(&h, Point::new(1.0, 2.0)), None);
	}
}
