//! Indirect localization from the minimap inset while the full map is
//! closed.
//!
//! The circular minimap inset is cropped, reduced to edges and matched
//! against a cached block of the precomputed map edge image around the last
//! known position. A homography over the matched features yields position
//! and heading.

use crate::prelude::*;
use imageproc::edges::canny;

pub const MAP_FRAME: &str = "map8192x8192";

/// A minimap fix never carries full confidence; the validating caller holds
/// it to a tighter plausibility bound than a direct full-map detection.
pub const MINIMAP_CERTAINTY: f64 = 0.5;

const CANNY_THRESHOLDS: (f32, f32) = (100.0, 200.0);
const MIN_MATCHES: usize = 6;

/// The player marker on the minimap is a bright triangle pointing up,
/// horizontally centered.
const PRESENCE_THRESHOLD: u8 = 0xDA;
const PRESENCE_EPSILON: f64 = 4.0;
const PRESENCE_TIP_BAND: (f64, f64) = (0.4, 0.6);

/// Square crop of the minimap inset for each supported capture resolution:
/// circle center and radius.
fn inset_geometry(width: u32, height: u32) -> Result<(Point<u32>, u32), VisionError> {
	match (width, height) {
		(1920, 1080) => Ok((Point::new(209, 918), 80)),
		_ => Err(VisionError::UnsupportedResolution { width, height }),
	}
}

/// Outcome of a minimap localization attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum MinimapFix {
	/// A position in [`MAP_FRAME`] coordinates.
	Detected(RelativePosition),
	/// No player marker on the minimap; the capture is probably showing the
	/// full map or a menu, so a direct detection should be tried instead.
	NotApplicable,
	/// The marker is there but matching against the map failed. Trying the
	/// full-map detector would be pointless.
	Failed,
}

pub struct MinimapLocalizer {
	extractor: FeatureExtractor,
	cache: MapFeatureCache,
}
impl MinimapLocalizer {
	pub fn new(map_edges: GrayImage) -> Self {
		Self {
			extractor: FeatureExtractor::new(),
			cache: MapFeatureCache::new(map_edges),
		}
	}

	/// Attempts a fix from the minimap inset of `frame`, searching the map
	/// around `last` (the last accepted position in [`MAP_FRAME`] pixels).
	pub fn localize(&mut self, frame: &RgbImage, last: Point<f64>, sink: &DebugSink) -> Result<MinimapFix, VisionError> {
		let (center, radius) = inset_geometry(frame.width(), frame.height())?;
		let size = radius * 2;
		let crop = image::imageops::crop_imm(frame, center.x - radius, center.y - radius, size, size).to_image();
		let gray = image::imageops::grayscale(&crop);

		if !arrow_present(&gray) {
			return Ok(MinimapFix::NotApplicable);
		}

		let edges = canny(&gray, CANNY_THRESHOLDS.0, CANNY_THRESHOLDS.1);
		let query = self.extractor.extract(&edges);
		if query.is_empty() {
			log::debug!("no features on the minimap inset");
			return Ok(MinimapFix::Failed);
		}

		let block = self.cache.lookup(&self.extractor, last);
		let matches = features::match_descriptors(&query.descriptors, &block.features.descriptors);

		sink.image("minimap_matches", || render_matches(&edges, self.cache.edges(), &block, &query, &matches));

		if matches.len() < MIN_MATCHES {
			log::debug!("only {} of {MIN_MATCHES} required feature matches", matches.len());
			return Ok(MinimapFix::Failed);
		}

		let src = matches.iter().map(|m| Point::new(query.keypoints[m.query].x as f64, query.keypoints[m.query].y as f64)).collect::<Vec<_>>();
		let dst = matches
			.iter()
			.map(|m| Point::new(block.features.keypoints[m.train].x as f64, block.features.keypoints[m.train].y as f64))
			.collect::<Vec<_>>();

		let h = match homography::estimate(&src, &dst) {
			Some(h) => h,
			None => {
				log::info!("no consistent homography over {} feature matches", matches.len());
				return Ok(MinimapFix::Failed);
			}
		};

		// the player sits at the inset center; its map heading is the
		// rotation the homography applies to the upward-pointing marker
		let projected = match homography::project(&h, Point::new(radius as f64, radius as f64)) {
			Some(projected) => projected,
			None => return Ok(MinimapFix::Failed),
		};
		let position = projected + block.offset;
		let heading = -f64::atan2(h[(0, 1)], h[(0, 0)]);

		Ok(MinimapFix::Detected(RelativePosition::new(
			position.x,
			position.y,
			heading,
			MINIMAP_CERTAINTY,
			MAP_FRAME,
		)))
	}
}

/// Whether the bright triangular player marker sits near the middle of the
/// inset crop.
fn arrow_present(gray: &GrayImage) -> bool {
	let mut mask = GrayImage::new(gray.width(), gray.height());
	for (x, y, pixel) in gray.enumerate_pixels() {
		if pixel.0[0] >= PRESENCE_THRESHOLD {
			mask.put_pixel_fast(x, y, image::Luma([255]));
		}
	}

	let band_x = (
		PRESENCE_TIP_BAND.0 * gray.width() as f64,
		PRESENCE_TIP_BAND.1 * gray.width() as f64,
	);
	let band_y = (
		PRESENCE_TIP_BAND.0 * gray.height() as f64,
		PRESENCE_TIP_BAND.1 * gray.height() as f64,
	);
	contour::all_polygons(&mask, PRESENCE_EPSILON).iter().any(|poly| {
		if poly.len() != 3 {
			return false;
		}
		// border following starts at the topmost border pixel, so the
		// first vertex is the marker's tip
		let tip = poly[0];
		tip.x >= band_x.0 && tip.x <= band_x.1 && tip.y >= band_y.0 && tip.y <= band_y.1
	})
}

/// Query edges and the matched map block side by side, matches drawn as
/// green lines.
fn render_matches(
	query_edges: &GrayImage,
	map_edges: &GrayImage,
	block: &features::MapBlock,
	query: &FeatureSet,
	matches: &[features::FeatureMatch],
) -> DynamicImage {
	let offset = Point::new(block.offset.x as u32, block.offset.y as u32);
	let block_size = 512u32.min(map_edges.width() - offset.x).min(map_edges.height() - offset.y);

	let qw = query_edges.width();
	let mut canvas = RgbImage::new(qw + block_size, query_edges.height().max(block_size));
	for (x, y, pixel) in query_edges.enumerate_pixels() {
		let v = pixel.0[0];
		canvas.put_pixel_fast(x, y, image::Rgb([v, v, v]));
	}
	for y in 0..block_size {
		for x in 0..block_size {
			let v = map_edges.get_pixel_fast(offset.x + x, offset.y + y).0[0];
			canvas.put_pixel_fast(qw + x, y, image::Rgb([v, v, v]));
		}
	}

	for m in matches {
		let q = query.keypoints[m.query];
		let t = block.features.keypoints[m.train];
		plot_line(
			&mut canvas,
			image::Rgb([0, 255, 0]),
			[q.x as u32, q.y as u32],
			[qw + t.x as u32, t.y as u32],
		);
	}

	DynamicImage::ImageRgb8(canvas)
}
