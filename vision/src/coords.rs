//! Positions in different image resolutions and cropped areas.
//!
//! Every named frame is an axis-aligned crop or rescale of the same base
//! map, calibrated by two reference points: the most north-western grey
//! pixel of the parking lot and the most south-eastern one on the pier.

use crate::prelude::*;
use core::fmt;
use std::str::FromStr;

/// Calibration table mapping a frame name to its two reference points.
///
/// Built once at startup and passed by reference wherever conversions
/// happen; there is deliberately no process-wide table.
pub struct FrameTable {
	frames: BTreeMap<Box<str>, (Point<f64>, Point<f64>)>,
}
impl FrameTable {
	pub fn builtin() -> Self {
		let mut frames = BTreeMap::new();
		for (name, ref1, ref2) in [
			("map8192x8192", (1793.0, 1991.0), (5809.0, 6223.0)),
			("map4096x4096", (896.0, 995.0), (2904.0, 3111.0)),
			("map2048x2048", (448.0, 498.0), (1451.0, 1555.0)),
			("crop1015x680", (196.0, 70.0), (717.0, 618.0)),
		] {
			frames.insert(Box::from(name), (Point::from(ref1), Point::from(ref2)));
		}
		Self { frames }
	}

	/// A missing calibration entry is a configuration error, not a
	/// recoverable condition.
	fn reference_points(&self, frame: &str) -> (Point<f64>, Point<f64>) {
		match self.frames.get(frame) {
			Some(refs) => *refs,
			None => panic!("no calibration reference points for frame {frame:?}"),
		}
	}
}

/// Normalized position on the base map, resolution independent.
///
/// Only ever created as an intermediate while converting between frames.
#[derive(Clone, Debug, PartialEq)]
pub struct AbsolutePosition {
	pub x: f64,
	pub y: f64,
	pub heading: f64,
	pub certainty: f64,
}
impl AbsolutePosition {
	#[inline]
	pub fn new(x: f64, y: f64, heading: f64) -> Self {
		Self { x, y, heading, certainty: 1.0 }
	}

	pub fn to_frame(&self, frames: &FrameTable, frame: &str) -> RelativePosition {
		let (ref1, ref2) = frames.reference_points(frame);
		let scale = ref2 - ref1;

		RelativePosition {
			x: self.x * scale.x + ref1.x,
			y: self.y * scale.y + ref1.y,
			heading: self.heading,
			certainty: self.certainty,
			frame: Box::from(frame),
		}
	}
}

/// Position as pixel coordinates in the image space named by `frame`.
#[derive(Clone, Debug, PartialEq)]
pub struct RelativePosition {
	pub x: f64,
	pub y: f64,
	/// Radians; `0` is straight up on the map
	pub heading: f64,
	/// `1.0` for the direct full-map detection, lower for indirect fixes
	pub certainty: f64,
	pub frame: Box<str>,
}
impl RelativePosition {
	#[inline]
	pub fn new(x: f64, y: f64, heading: f64, certainty: f64, frame: &str) -> Self {
		Self { x, y, heading, certainty, frame: Box::from(frame) }
	}

	pub fn to_absolute(&self, frames: &FrameTable) -> AbsolutePosition {
		let (ref1, ref2) = frames.reference_points(&self.frame);
		let scale = ref2 - ref1;

		AbsolutePosition {
			x: (self.x - ref1.x) / scale.x,
			y: (self.y - ref1.y) / scale.y,
			heading: self.heading,
			certainty: self.certainty,
		}
	}

	pub fn to_frame(&self, frames: &FrameTable, frame: &str) -> RelativePosition {
		if *self.frame == *frame {
			return self.clone();
		}
		self.to_absolute(frames).to_frame(frames, frame)
	}

	#[inline]
	pub fn point(&self) -> Point<f64> {
		Point::new(self.x, self.y)
	}
}
impl fmt::Display for RelativePosition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}:{}", self.frame, self.x, self.y, self.heading)
	}
}
impl FromStr for RelativePosition {
	type Err = AnyError;

	/// `frame:x:y` or `frame:x:y:heading`
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let parts = s.split(':').collect::<Vec<_>>();
		let (frame, x, y, heading) = match parts.as_slice() {
			[frame, x, y] => (frame, x, y, None),
			[frame, x, y, heading] => (frame, x, y, Some(heading)),
			_ => anyhow::bail!("expected frame:x:y or frame:x:y:heading, got {s:?}"),
		};
		Ok(Self {
			x: x.parse()?,
			y: y.parse()?,
			heading: heading.map(|h| h.parse()).transpose()?.unwrap_or(0.0),
			certainty: 1.0,
			frame: Box::from(*frame),
		})
	}
}

/// The subject a position fix belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subject {
	Player,
}

/// The one artifact handed to the display collaborator.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionUpdate {
	pub position: RelativePosition,
	pub subject: Subject,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn approx(a: f64, b: f64) {
		assert!((a - b).abs() < 1e-6, "{a} != {b}");
	}

	#[test]
	fn to_relative() {
		let frames = FrameTable::builtin();
		let rel2048 = AbsolutePosition::new(1.1, 0.3, 0.1).to_frame(&frames, "map2048x2048");

		approx(rel2048.x, 1551.3);
		approx(rel2048.y, 815.1);
		assert_eq!(rel2048.heading, 0.1);
		assert_eq!(&*rel2048.frame, "map2048x2048");
	}

	#[test]
	fn to_abs() {
		let frames = FrameTable::builtin();

		let abs = RelativePosition::new(717.0, 70.0, 0.25, 1.0, "crop1015x680").to_absolute(&frames);
		approx(abs.x, 1.0);
		approx(abs.y, 0.0);
		assert_eq!(abs.heading, 0.25);

		let abs = RelativePosition::new(196.0, 618.0, 0.0, 1.0, "crop1015x680").to_absolute(&frames);
		approx(abs.x, 0.0);
		approx(abs.y, 1.0);
	}

	#[test]
	fn chain_through_frames_is_identity() {
		let frames = FrameTable::builtin();
		let a = AbsolutePosition::new(0.37, 0.62, 1.5);

		let a2 = a
			.to_frame(&frames, "crop1015x680")
			.to_absolute(&frames)
			.to_frame(&frames, "map2048x2048")
			.to_absolute(&frames);

		approx(a2.x, a.x);
		approx(a2.y, a.y);
		assert_eq!(a2.heading, a.heading);
	}

	#[test]
	fn round_trip_through_frame() {
		let frames = FrameTable::builtin();
		let rel = AbsolutePosition::new(0.12, 0.93, -0.4).to_frame(&frames, "map4096x4096");
		let back = rel.to_absolute(&frames).to_frame(&frames, "map4096x4096");
		approx(back.x, rel.x);
		approx(back.y, rel.y);
	}

	#[test]
	fn same_frame_is_short_circuited() {
		let frames = FrameTable::builtin();
		// "somewhere" has no calibration entry, so any actual conversion
		// would panic; converting into the frame it already has must not.
		let rel = RelativePosition::new(12.0, 34.0, 0.5, 0.5, "somewhere");
		assert_eq!(rel.to_frame(&frames, "somewhere"), rel);
	}

	#[test]
	#[should_panic(expected = "no calibration reference points")]
	fn unknown_frame_is_fatal() {
		let frames = FrameTable::builtin();
		AbsolutePosition::new(0.5, 0.5, 0.0).to_frame(&frames, "map1x1");
	}

	#[test]
	fn parse_and_format() {
		let pos = "map8192x8192:3100:2600:0.5".parse::<RelativePosition>().unwrap();
		assert_eq!(pos, RelativePosition::new(3100.0, 2600.0, 0.5, 1.0, "map8192x8192"));
		assert_eq!(pos.to_string().parse::<RelativePosition>().unwrap(), pos);

		let pos = "map8192x8192:3100:2600".parse::<RelativePosition>().unwrap();
		assert_eq!(pos.heading, 0.0);

		assert!("map8192x8192:3100".parse::<RelativePosition>().is_err());
		assert!("map8192x8192:x:y".parse::<RelativePosition>().is_err());
	}
}
