//! Contour extraction and polygon simplification over binary masks.

use crate::prelude::*;
use imageproc::contours::{find_contours, BorderType, Contour};

/// Outer contours of a binary mask, simplified to polygons.
pub fn outer_polygons(mask: &GrayImage, epsilon: f64) -> Vec<Vec<Point<f64>>> {
	polygons(mask, epsilon, Some(BorderType::Outer))
}

/// All contours of a binary mask (outer borders and holes), simplified.
pub fn all_polygons(mask: &GrayImage, epsilon: f64) -> Vec<Vec<Point<f64>>> {
	polygons(mask, epsilon, None)
}

fn polygons(mask: &GrayImage, epsilon: f64, border: Option<BorderType>) -> Vec<Vec<Point<f64>>> {
	find_contours::<i32>(mask)
		.into_iter()
		.filter(|contour| border.map_or(true, |border| contour.border_type == border))
		.map(|contour| approx_polygon(&ring_points(&contour), epsilon))
		.collect()
}

fn ring_points(contour: &Contour<i32>) -> Vec<Point<f64>> {
	contour.points.iter().map(|p| Point::new(p.x as f64, p.y as f64)).collect()
}

/// Douglas-Peucker simplification of a closed contour.
///
/// The ring is split at the point furthest from its start and each half is
/// simplified independently, so the result does not depend on an arbitrary
/// choice of "endpoints" on the closed curve.
pub fn approx_polygon(ring: &[Point<f64>], epsilon: f64) -> Vec<Point<f64>> {
	if ring.len() <= 3 {
		return ring.to_vec();
	}

	let split = ring
		.iter()
		.enumerate()
		.max_by(|(_, a), (_, b)| ring[0].distance(a).partial_cmp(&ring[0].distance(b)).unwrap())
		.map(|(i, _)| i)
		.unwrap();

	let mut out = vec![ring[0]];
	simplify(&ring[..=split], epsilon, &mut out);
	let mut tail = ring[split..].to_vec();
	tail.push(ring[0]);
	simplify(&tail, epsilon, &mut out);
	out.pop(); // drop the duplicated closing point
	out
}

/// Emits every kept vertex after `points[0]` (the caller emitted that one).
fn simplify(points: &[Point<f64>], epsilon: f64, out: &mut Vec<Point<f64>>) {
	let (first, last) = (points[0], points[points.len() - 1]);

	let mut max_distance = 0.0;
	let mut index = 0;
	for (i, point) in points.iter().enumerate().take(points.len() - 1).skip(1) {
		let distance = segment_distance(*point, first, last);
		if distance > max_distance {
			max_distance = distance;
			index = i;
		}
	}

	if max_distance > epsilon {
		simplify(&points[..=index], epsilon, out);
		simplify(&points[index..], epsilon, out);
	} else {
		out.push(last);
	}
}

fn segment_distance(p: Point<f64>, a: Point<f64>, b: Point<f64>) -> f64 {
	let ab = b - a;
	let len_sqr = ab.x * ab.x + ab.y * ab.y;
	if len_sqr == 0.0 {
		return p.distance(&a);
	}
	let t = (((p.x - a.x) * ab.x + (p.y - a.y) * ab.y) / len_sqr).clamp(0.0, 1.0);
	p.distance(&Point::new(a.x + ab.x * t, a.y + ab.y * t))
}

#[cfg(test)]
mod tests {
	use super::*;
	use imageproc::drawing::draw_filled_rect_mut;
	use imageproc::rect::Rect as ProcRect;

	#[test]
	fn square_simplifies_to_four_vertices() {
		let mut mask = GrayImage::new(40, 40);
		draw_filled_rect_mut(&mut mask, ProcRect::at(5, 5).of_size(20, 20), image::Luma([255]));

		let polys = outer_polygons(&mask, 2.0);
		assert_eq!(polys.len(), 1);
		assert_eq!(polys[0].len(), 4, "{:?}", polys[0]);

		for corner in [(5.0, 5.0), (24.0, 5.0), (24.0, 24.0), (5.0, 24.0)] {
			let corner = Point::from(corner);
			assert!(
				polys[0].iter().any(|p| p.distance(&corner) < 1.5),
				"no vertex near {corner:?} in {:?}",
				polys[0]
			);
		}
	}

	#[test]
	fn collinear_points_collapse() {
		let ring = [
			Point::new(0.0, 0.0),
			Point::new(5.0, 0.1),
			Point::new(10.0, 0.0),
			Point::new(10.0, 10.0),
			Point::new(0.0, 10.0),
		];
		let poly = approx_polygon(&ring, 1.0);
		assert_eq!(poly.len(), 4);
	}

	#[test]
	fn tiny_rings_are_untouched() {
		let ring = [Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 3.0)];
		assert_eq!(approx_polygon(&ring, 2.0), ring.to_vec());
	}
}
