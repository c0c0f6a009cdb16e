pub use ovm_util::*;

pub mod prelude {
	pub use crate::{
		arrow, contour,
		coords::{AbsolutePosition, FrameTable, PositionUpdate, RelativePosition, Subject},
		features::{self, FeatureExtractor, FeatureSet, MapFeatureCache},
		homography,
		minimap::{self, MinimapFix, MinimapLocalizer},
		VisionError,
	};
	pub use ovm_util::*;
}

pub mod arrow;
pub mod contour;
pub mod coords;
pub mod features;
pub mod homography;
pub mod minimap;

/// Fatal configuration errors. Everything recoverable (no detection,
/// geometry rejects, failed matching) is expressed in return types instead.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
	#[error("no calibration entry for capture resolution {width}x{height}")]
	UnsupportedResolution { width: u32, height: u32 },
}
