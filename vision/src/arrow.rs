//! Direct player-arrow detection on a full-map capture.
//!
//! The arrow is drawn in a distinctive teal-blue on top of the map. It is
//! isolated by hue, its outline approximated to a quadrilateral, and the
//! quadrilateral's edge structure tells apart stem (tip) and stern (tail).

use crate::prelude::*;

const POLY_EPSILON: f64 = 2.0;

/// Expected edge lengths in pixels. Violations don't reject a candidate,
/// they only shave confidence.
const LONG_EDGE_PX: (f64, f64) = (15.0, 23.0);
const SHORT_EDGE_PX: (f64, f64) = (7.0, 14.0);
const SOFT_VIOLATION_FACTOR: f64 = 0.9;

const ARROW_HUE: u16 = 200;
const ARROW_HUE_TOLERANCE: u16 = 4;
const ARROW_MIN_SAT: u8 = 95;
const ARROW_VAL: (u8, u8) = (50, 95);

/// Pixel rectangle of the on-screen map for each supported capture
/// resolution.
fn area_of_interest(width: u32, height: u32) -> Result<Rect<u32>, VisionError> {
	match (width, height) {
		(1920, 1080) => Ok(Rect { left: 475, top: 208, right: 1490, bottom: 888 }),
		_ => Err(VisionError::UnsupportedResolution { width, height }),
	}
}

#[inline]
fn is_arrow_color(pixel: image::Rgb<u8>) -> bool {
	let (h, s, v) = pixel.to_hsv();
	ARROW_HUE.abs_diff(h) <= ARROW_HUE_TOLERANCE && s >= ARROW_MIN_SAT && v >= ARROW_VAL.0 && v <= ARROW_VAL.1
}

/// Finds the player arrow on a full-map capture.
///
/// Returns `None` when the capture isn't showing the map, the arrow isn't
/// visible, or more than one candidate matched (never guesses between
/// ambiguous candidates). The returned frame is tagged with the crop's
/// dimensions so calibration picks the matching reference points.
pub fn detect(frame: &RgbImage, sink: &DebugSink) -> Result<Option<RelativePosition>, VisionError> {
	let aoi = area_of_interest(frame.width(), frame.height())?;
	let (w, h) = (aoi.width(), aoi.height());
	let cropped = image::imageops::crop_imm(frame, aoi.left, aoi.top, w, h).to_image();

	let mut mask = GrayImage::new(w, h);
	for (x, y, pixel) in cropped.enumerate_pixels() {
		if is_arrow_color(*pixel) {
			mask.put_pixel_fast(x, y, image::Luma([255]));
		}
	}

	sink.image("arrow_mask", || DynamicImage::ImageLuma8(mask.clone()));

	let arrows = contour::outer_polygons(&mask, POLY_EPSILON)
		.into_iter()
		.filter_map(|poly| arrow_from_polygon(&poly))
		.collect::<Vec<_>>();

	let (stern, heading, certainty) = match arrows.as_slice() {
		[arrow] => *arrow,
		[] => {
			log::debug!("not a map, or the arrow is not visible");
			return Ok(None);
		}
		ambiguous => {
			log::warn!("ambiguous detection, {} arrow candidates: {ambiguous:?}", ambiguous.len());
			return Ok(None);
		}
	};

	Ok(Some(RelativePosition::new(stern.x, stern.y, heading, certainty, &format!("crop{w}x{h}"))))
}

/// Interprets a 4-vertex polygon as the player arrow.
///
/// The two longest edges must share a vertex (the stem, i.e. the tip) and
/// the two shortest must share a vertex (the stern); a polygon where either
/// pair is not edge-connected is no arrow. Returns stern, heading and
/// confidence.
pub fn arrow_from_polygon(poly: &[Point<f64>]) -> Option<(Point<f64>, f64, f64)> {
	if poly.len() != 4 {
		return None;
	}

	// edge i joins vertex i and vertex i-1
	let mut edges = (0..4)
		.map(|i| {
			let j = (i + 3) % 4;
			(poly[i].distance(&poly[j]), i, j)
		})
		.collect::<Vec<_>>();
	edges.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
	let [short1, short2, long1, long2]: [(f64, usize, usize); 4] = edges.try_into().unwrap();

	let stem = match shared_vertex(long1, long2) {
		Some(stem) => stem,
		None => {
			log::debug!("arrow long edges are not connected start to end: {long1:?} {long2:?}");
			return None;
		}
	};
	let stern = match shared_vertex(short1, short2) {
		Some(stern) => stern,
		None => {
			log::debug!("arrow short edges are not connected start to end: {short1:?} {short2:?}");
			return None;
		}
	};

	let mut certainty = 1.0;
	for (length, (min, max)) in [
		(long1.0, LONG_EDGE_PX),
		(long2.0, LONG_EDGE_PX),
		(short1.0, SHORT_EDGE_PX),
		(short2.0, SHORT_EDGE_PX),
	] {
		if length < min || length > max {
			log::debug!("arrow edge length {length:.1} outside [{min}, {max}]");
			certainty *= SOFT_VIOLATION_FACTOR;
		}
	}

	let (stem, stern) = (poly[stem], poly[stern]);
	let direction = stem - stern;
	let heading = f64::atan2(direction.x, -direction.y);

	Some((stern, heading, certainty))
}

/// The vertex two edges chain through, if they do.
fn shared_vertex(a: (f64, usize, usize), b: (f64, usize, usize)) -> Option<usize> {
	if a.1 == b.2 {
		Some(a.1)
	} else if a.2 == b.1 {
		Some(a.2)
	} else {
		None
	}
}
