//! Oriented binary features for matching minimap captures against the map.
//!
//! FAST corners over a small image pyramid, orientation from the intensity
//! centroid, and a rotated 256-bit binary descriptor sampled from a fixed
//! random pattern. The pattern is seeded, so descriptors are stable across
//! runs and the cached map features stay comparable.

use crate::prelude::*;
use imageproc::corners::corners_fast9;
use rand::{rngs::StdRng, Rng, SeedableRng};

const FAST_THRESHOLD: u8 = 20;
const MAX_FEATURES: usize = 800;
const PYRAMID_LEVELS: u32 = 3;
const PYRAMID_SCALE: f32 = 1.2;

/// Sampling offsets must stay inside the image for every keypoint, even
/// after rotation.
const PATCH_MARGIN: u32 = 16;
const ORIENTATION_RADIUS: i32 = 15;
const PATTERN_RADIUS: i32 = 13;
const PATTERN_SEED: u64 = 0x5EED;

pub const MATCH_RATIO: f32 = 0.8;

pub type Descriptor = [u8; 32];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keypoint {
	pub x: f32,
	pub y: f32,
	pub angle: f32,
	pub response: f32,
}

#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
	pub keypoints: Vec<Keypoint>,
	pub descriptors: Vec<Descriptor>,
}
impl FeatureSet {
	#[inline]
	pub fn len(&self) -> usize {
		self.keypoints.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.keypoints.is_empty()
	}
}

pub struct FeatureExtractor {
	/// 256 precomputed point pairs `[x0, y0, x1, y1]` inside the patch disc.
	pattern: Box<[[i32; 4]]>,
}
impl FeatureExtractor {
	pub fn new() -> Self {
		let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
		let mut disc_point = move || loop {
			let x = rng.gen_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
			let y = rng.gen_range(-PATTERN_RADIUS..=PATTERN_RADIUS);
			if x * x + y * y <= PATTERN_RADIUS * PATTERN_RADIUS {
				return (x, y);
			}
		};

		let pattern = (0..256)
			.map(|_| {
				let (x0, y0) = disc_point();
				let (x1, y1) = disc_point();
				[x0, y0, x1, y1]
			})
			.collect();

		Self { pattern }
	}

	/// Detects and describes up to [`MAX_FEATURES`] keypoints, strongest
	/// first. Coordinates are in the coordinate space of `image` no matter
	/// which pyramid level a keypoint came from.
	pub fn extract(&self, image: &GrayImage) -> FeatureSet {
		let mut scored: Vec<(Keypoint, Descriptor)> = Vec::new();

		let mut scale = 1.0f32;
		for level in 0..PYRAMID_LEVELS {
			let level_image = if level == 0 {
				Cow::Borrowed(image)
			} else {
				let w = (image.width() as f32 / scale) as u32;
				let h = (image.height() as f32 / scale) as u32;
				Cow::Owned(image::imageops::resize(image, w, h, image::imageops::FilterType::Triangle))
			};
			if level_image.width() <= PATCH_MARGIN * 2 || level_image.height() <= PATCH_MARGIN * 2 {
				break;
			}

			scored.par_extend(corners_fast9(&level_image, FAST_THRESHOLD).into_par_iter().filter_map(|corner| {
				if corner.x < PATCH_MARGIN
					|| corner.y < PATCH_MARGIN
					|| corner.x >= level_image.width() - PATCH_MARGIN
					|| corner.y >= level_image.height() - PATCH_MARGIN
				{
					return None;
				}

				let angle = orientation(&level_image, corner.x, corner.y);
				let descriptor = self.describe(&level_image, corner.x, corner.y, angle);
				let keypoint = Keypoint {
					x: corner.x as f32 * scale,
					y: corner.y as f32 * scale,
					angle,
					response: corner.score,
				};
				Some((keypoint, descriptor))
			}));

			scale *= PYRAMID_SCALE;
		}

		scored.sort_by(|a, b| b.0.response.partial_cmp(&a.0.response).unwrap());
		scored.truncate(MAX_FEATURES);

		let mut features = FeatureSet {
			keypoints: Vec::with_capacity(scored.len()),
			descriptors: Vec::with_capacity(scored.len()),
		};
		for (keypoint, descriptor) in scored {
			features.keypoints.push(keypoint);
			features.descriptors.push(descriptor);
		}
		features
	}

	fn describe(&self, image: &GrayImage, x: u32, y: u32, angle: f32) -> Descriptor {
		let (sin, cos) = angle.sin_cos();
		let rotate = |px: i32, py: i32| {
			let rx = (cos * px as f32 - sin * py as f32).round() as i32;
			let ry = (sin * px as f32 + cos * py as f32).round() as i32;
			((x as i32 + rx) as u32, (y as i32 + ry) as u32)
		};

		let mut descriptor = [0u8; 32];
		for (bit, [x0, y0, x1, y1]) in self.pattern.iter().enumerate() {
			let (ax, ay) = rotate(*x0, *y0);
			let (bx, by) = rotate(*x1, *y1);
			if image.get_pixel_fast(ax, ay).0[0] < image.get_pixel_fast(bx, by).0[0] {
				descriptor[bit >> 3] |= 1 << (bit & 7);
			}
		}
		descriptor
	}
}
impl Default for FeatureExtractor {
	fn default() -> Self {
		Self::new()
	}
}

/// Intensity centroid angle of the patch around (x, y).
fn orientation(image: &GrayImage, x: u32, y: u32) -> f32 {
	let mut m10 = 0i64;
	let mut m01 = 0i64;
	for dy in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
		for dx in -ORIENTATION_RADIUS..=ORIENTATION_RADIUS {
			if dx * dx + dy * dy > ORIENTATION_RADIUS * ORIENTATION_RADIUS {
				continue;
			}
			let intensity = image.get_pixel_fast((x as i32 + dx) as u32, (y as i32 + dy) as u32).0[0] as i64;
			m10 += dx as i64 * intensity;
			m01 += dy as i64 * intensity;
		}
	}
	(m01 as f32).atan2(m10 as f32)
}

#[inline]
pub fn hamming(a: &Descriptor, b: &Descriptor) -> u32 {
	a.iter().zip(b.iter()).map(|(a, b)| (a ^ b).count_ones()).sum()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureMatch {
	pub query: usize,
	pub train: usize,
	pub distance: u32,
}

/// Brute-force 2-NN Hamming matching with a ratio test: a match only counts
/// if its best candidate beats the runner-up decisively. Fewer than two
/// train descriptors can't pass the test, so the result is empty.
pub fn match_descriptors(query: &[Descriptor], train: &[Descriptor]) -> Vec<FeatureMatch> {
	if train.len() < 2 {
		return Vec::new();
	}

	query
		.par_iter()
		.enumerate()
		.filter_map(|(query_index, descriptor)| {
			let mut best = FeatureMatch { query: query_index, train: 0, distance: u32::MAX };
			let mut second = u32::MAX;
			for (train_index, candidate) in train.iter().enumerate() {
				let distance = hamming(descriptor, candidate);
				if distance < best.distance {
					second = best.distance;
					best = FeatureMatch { query: query_index, train: train_index, distance };
				} else if distance < second {
					second = distance;
				}
			}
			if (best.distance as f32) < MATCH_RATIO * second as f32 {
				Some(best)
			} else {
				None
			}
		})
		.collect()
}

const BLOCK_SIZE: u32 = 512;
const BLOCK_LEAD: u32 = 288;
const CACHE_CAPACITY: usize = 32;

/// A cached 512x512 map block: its features and the pixel offset of the
/// block's top-left corner in the full map.
pub struct MapBlock {
	pub features: Arc<FeatureSet>,
	pub offset: Point<f64>,
}

/// Feature cache over the precomputed map edge image.
///
/// Block keys quantize the queried position so that small movements reuse
/// the same block; a slot is only extracted once and evicted least recently
/// used.
pub struct MapFeatureCache {
	edges: GrayImage,
	blocks: HashMap<(u32, u32), Arc<FeatureSet>>,
	order: VecDeque<(u32, u32)>,
}
impl MapFeatureCache {
	pub fn new(edges: GrayImage) -> Self {
		assert!(
			edges.width() >= BLOCK_SIZE && edges.height() >= BLOCK_SIZE,
			"map edge image is smaller than a single {BLOCK_SIZE}x{BLOCK_SIZE} block"
		);
		Self {
			edges,
			blocks: HashMap::new(),
			order: VecDeque::new(),
		}
	}

	#[inline]
	pub fn edges(&self) -> &GrayImage {
		&self.edges
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	/// The map block containing `pos` (full-map pixel coordinates),
	/// extracting and caching its features on first use.
	pub fn lookup(&mut self, extractor: &FeatureExtractor, pos: Point<f64>) -> MapBlock {
		let key = block_key(pos);
		let origin = self.block_origin(key);

		let features = match self.blocks.get(&key) {
			Some(features) => {
				let features = features.clone();
				self.touch(key);
				features
			}
			None => {
				let block = image::imageops::crop_imm(&self.edges, origin.x, origin.y, BLOCK_SIZE, BLOCK_SIZE).to_image();
				let features = Arc::new(extractor.extract(&block));
				log::debug!("extracted {} map features around block key {key:?}", features.len());

				self.blocks.insert(key, features.clone());
				self.order.push_back(key);
				if self.order.len() > CACHE_CAPACITY {
					if let Some(evicted) = self.order.pop_front() {
						self.blocks.remove(&evicted);
					}
				}

				features
			}
		};

		MapBlock {
			features,
			offset: Point::new(origin.x as f64, origin.y as f64),
		}
	}

	fn touch(&mut self, key: (u32, u32)) {
		if let Some(index) = self.order.iter().position(|k| *k == key) {
			self.order.remove(index);
			self.order.push_back(key);
		}
	}

	/// Top-left corner of the block for `key`, placed so the key sits past
	/// the block's center and clamped to the map bounds.
	fn block_origin(&self, key: (u32, u32)) -> Point<u32> {
		Point::new(
			key.0.saturating_sub(BLOCK_LEAD).min(self.edges.width() - BLOCK_SIZE),
			key.1.saturating_sub(BLOCK_LEAD).min(self.edges.height() - BLOCK_SIZE),
		)
	}
}

/// Quantizes a position so every point in a 64x64 tile shares one key.
fn block_key(pos: Point<f64>) -> (u32, u32) {
	let pos = pos.round();
	(pos.x.max(0) as u32 | 63, pos.y.max(0) as u32 | 63)
}

#[cfg(test)]
mod tests {
	use super::*;
	use imageproc::drawing::draw_filled_rect_mut;
	use imageproc::rect::Rect as ProcRect;

	fn textured_image() -> GrayImage {
		let mut image = GrayImage::new(160, 160);
		draw_filled_rect_mut(&mut image, ProcRect::at(40, 40).of_size(30, 30), image::Luma([255]));
		draw_filled_rect_mut(&mut image, ProcRect::at(90, 90).of_size(30, 30), image::Luma([255]));
		image
	}

	#[test]
	fn hamming_counts_differing_bits() {
		let a = [0u8; 32];
		let mut b = [0u8; 32];
		assert_eq!(hamming(&a, &b), 0);
		b[0] = 0xFF;
		assert_eq!(hamming(&a, &b), 8);
		b[31] = 0b101;
		assert_eq!(hamming(&a, &b), 10);
	}

	#[test]
	fn extracts_keypoints_inside_bounds() {
		let image = textured_image();
		let features = FeatureExtractor::new().extract(&image);

		assert!(!features.is_empty());
		assert_eq!(features.keypoints.len(), features.descriptors.len());
		for keypoint in &features.keypoints {
			assert!(keypoint.x >= 0.0 && keypoint.x < 160.0);
			assert!(keypoint.y >= 0.0 && keypoint.y < 160.0);
		}
	}

	#[test]
	fn extraction_is_deterministic() {
		let image = textured_image();
		let a = FeatureExtractor::new().extract(&image);
		let b = FeatureExtractor::new().extract(&image);
		assert_eq!(a.descriptors, b.descriptors);
	}

	#[test]
	fn ratio_test_rejects_indecisive_matches() {
		let zeros = [0u8; 32];
		let ones = [0xFFu8; 32];
		let mut half = [0u8; 32];
		half[..16].fill(0xFF);

		// zeros matches its identical twin decisively
		let matches = match_descriptors(&[zeros], &[zeros, ones]);
		assert_eq!(matches, vec![FeatureMatch { query: 0, train: 0, distance: 0 }]);

		// half is 128 bits from both candidates, no decisive winner
		assert!(match_descriptors(&[half], &[zeros, ones]).is_empty());
	}

	#[test]
	fn too_few_train_descriptors_match_nothing() {
		let zeros = [0u8; 32];
		assert!(match_descriptors(&[zeros], &[zeros]).is_empty());
		assert!(match_descriptors(&[zeros], &[]).is_empty());
	}

	#[test]
	fn block_keys_quantize() {
		assert_eq!(block_key(Point::new(3100.0, 2600.0)), (3135, 2623));
		assert_eq!(block_key(Point::new(0.0, 0.0)), (63, 63));
		assert_eq!(block_key(Point::new(-5.0, 63.0)), (63, 63));
	}

	#[test]
	fn nearby_lookups_share_a_block() {
		let extractor = FeatureExtractor::new();
		let mut cache = MapFeatureCache::new(GrayImage::new(1024, 1024));

		let a = cache.lookup(&extractor, Point::new(500.0, 500.0));
		let b = cache.lookup(&extractor, Point::new(480.0, 505.0));

		assert!(Arc::ptr_eq(&a.features, &b.features));
		assert_eq!(cache.len(), 1);
		assert_eq!(a.offset, Point::new(223.0, 223.0));
	}

	#[test]
	fn cache_evicts_least_recently_used() {
		let extractor = FeatureExtractor::new();
		let mut cache = MapFeatureCache::new(GrayImage::new(1024, 1024));

		for i in 0..40u32 {
			cache.lookup(&extractor, Point::new((i * 64) as f64, 0.0));
		}
		assert_eq!(cache.len(), CACHE_CAPACITY);
	}
}
