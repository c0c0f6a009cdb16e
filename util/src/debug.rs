use crate::*;

/// Named diagnostic image hooks.
///
/// Each hook maps a name to a path template from the settings file. A hook
/// that isn't configured costs nothing: the render closure is never run.
/// Saving diagnostics never feeds back into detection.
pub struct DebugSink {
	hooks: BTreeMap<String, String>,
}
impl DebugSink {
	#[inline]
	pub fn disabled() -> Self {
		Self { hooks: BTreeMap::new() }
	}

	#[inline]
	pub fn new(hooks: BTreeMap<String, String>) -> Self {
		Self { hooks }
	}

	#[inline]
	pub fn enabled(&self, name: &str) -> bool {
		self.hooks.contains_key(name)
	}

	pub fn image(&self, name: &str, render: impl FnOnce() -> DynamicImage) {
		let template = match self.hooks.get(name) {
			Some(template) => template,
			None => return,
		};

		let path = expand_template(template);
		if let Err(err) = render().save(&path) {
			log::warn!("failed to save debug image {name} to {path}: {err}");
		}
	}
}

fn expand_template(template: &str) -> String {
	template.replace("{time}", &chrono::Local::now().format("%Y%m%d-%H%M%S%.3f").to_string())
}

/// Bresenham, for the match visualizations
pub fn plot_line<I: GenericImage>(img: &mut I, px: I::Pixel, p0: [u32; 2], p1: [u32; 2]) {
	let (mut x0, mut y0) = (p0[0] as i64, p0[1] as i64);
	let (x1, y1) = (p1[0] as i64, p1[1] as i64);
	let dx = (x1 - x0).abs();
	let sx = if x0 < x1 { 1 } else { -1 };
	let dy = -(y1 - y0).abs();
	let sy = if y0 < y1 { 1 } else { -1 };
	let mut error = dx + dy;

	loop {
		if x0 >= 0 && y0 >= 0 && (x0 as u32) < img.width() && (y0 as u32) < img.height() {
			img.put_pixel(x0 as u32, y0 as u32, px);
		}
		if x0 == x1 && y0 == y1 {
			break;
		}
		let e2 = 2 * error;
		if e2 >= dy {
			if x0 == x1 {
				break;
			}
			error += dy;
			x0 += sx;
		}
		if e2 <= dx {
			if y0 == y1 {
				break;
			}
			error += dx;
			y0 += sy;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn disabled_hook_never_renders() {
		let sink = DebugSink::disabled();
		sink.image("arrow_mask", || unreachable!("render closure ran for a disabled hook"));
	}

	#[test]
	fn template_expansion() {
		assert!(!expand_template("debug/arrow_{time}.png").contains("{time}"));
		assert_eq!(expand_template("debug/arrow.png"), "debug/arrow.png");
	}

	#[test]
	fn line_endpoints() {
		let mut img = GrayImage::new(16, 16);
		plot_line(&mut img, image::Luma([255]), [2, 3], [12, 9]);
		assert_eq!(img.get_pixel(2, 3).0[0], 255);
		assert_eq!(img.get_pixel(12, 9).0[0], 255);
	}
}
